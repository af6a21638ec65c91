//! Job file configuration
//!
//! A job is a TOML file describing the curve, the caps, their market quotes
//! and the stripping strategy. Settings are resolved from, in priority order:
//! 1. CLI arguments
//! 2. Environment variables (`CAPLET_LOG_LEVEL`)
//! 3. The job file
//! 4. Default values

use std::path::{Path, PathBuf};
use std::str::FromStr;

use caplet_core::math::interpolators::InterpolationMethod;
use caplet_models::market_data::CurveInterpolation;
use caplet_stripping::{MarketDataType, StripperConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the job's log level.
pub const LOG_LEVEL_ENV: &str = "CAPLET_LOG_LEVEL";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Job file error: {0}")]
    FileError(String),

    #[error("Invalid job: {0}")]
    Invalid(String),
}

/// Log levels accepted in the job file and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

/// Zero-rate curve pillars
#[derive(Debug, Clone, Deserialize)]
pub struct CurveConfig {
    /// Pillar times in years
    pub tenors: Vec<f64>,
    /// Continuously compounded zero rates
    pub rates: Vec<f64>,
    /// Interpolation between pillars
    #[serde(default)]
    pub interpolation: CurveInterpolation,
}

/// Floating-rate index
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Index name, e.g. `EUR-EURIBOR-6M`
    pub name: String,
    /// Accrual tenor in years
    pub tenor: f64,
}

/// Cap or floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapKind {
    #[default]
    Cap,
    Floor,
}

/// One quoted cap or floor
#[derive(Debug, Clone, Deserialize)]
pub struct CapConfig {
    /// Strike rate
    pub strike: f64,
    /// First accrual start in years
    pub start: f64,
    /// Last accrual end in years
    pub end: f64,
    /// Cap or floor
    #[serde(default)]
    pub kind: CapKind,
}

/// Market quotes, one per cap
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Whether `values` are prices or vols
    #[serde(rename = "type")]
    pub data_type: MarketDataType,
    /// The quotes
    pub values: Vec<f64>,
    /// Optional per-quote errors
    #[serde(default)]
    pub errors: Option<Vec<f64>>,
}

/// Stripping strategy selection
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// One parameter per caplet
    #[default]
    Direct,
    /// Strike-independent log vols at knots
    TermStructure {
        #[serde(default)]
        knots: Option<Vec<f64>>,
        #[serde(default)]
        interpolation: InterpolationMethod,
    },
    /// Penalised B-splines in expiry, or expiry and strike
    Pspline {
        #[serde(default)]
        surface: bool,
    },
    /// SABR with constant parameters across expiries
    Sabr {
        /// Starting `[alpha, beta, rho, nu]`
        guess: Vec<f64>,
    },
}

impl StrategyConfig {
    /// Short name for logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::Direct => "direct",
            StrategyConfig::TermStructure { .. } => "term_structure",
            StrategyConfig::Pspline { .. } => "pspline",
            StrategyConfig::Sabr { .. } => "sabr",
        }
    }
}

/// A stripping job
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Log level
    #[serde(default, deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Discount curve, also used for projection unless `projection` is set
    pub discount: CurveConfig,
    /// Optional separate projection curve for the index
    #[serde(default)]
    pub projection: Option<CurveConfig>,
    /// Floating-rate index
    pub index: IndexConfig,
    /// Quoted instruments
    pub caps: Vec<CapConfig>,
    /// Quotes
    pub market: MarketConfig,
    /// Strategy
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Solver and penalty settings
    #[serde(default)]
    pub stripper: StripperConfig,
    /// Report path; stdout when absent
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl FromStr for JobConfig {
    type Err = ConfigError;

    /// Parse and validate a TOML job.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let job: JobConfig =
            toml::from_str(content).map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        job.validate()?;
        Ok(job)
    }
}

impl JobConfig {
    /// Load a job from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read {}: {}", path.display(), e)))?;
        content.parse()
    }

    /// Validate the job
    ///
    /// Checks shapes only; the stripping library rejects inadmissible values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, curve) in [("discount", Some(&self.discount)), ("projection", self.projection.as_ref())] {
            if let Some(curve) = curve {
                if curve.tenors.len() != curve.rates.len() {
                    return Err(ConfigError::Invalid(format!(
                        "{name} curve has {} tenors but {} rates",
                        curve.tenors.len(),
                        curve.rates.len()
                    )));
                }
            }
        }
        if self.caps.is_empty() {
            return Err(ConfigError::Invalid("no caps given".to_string()));
        }
        if let Some((i, cap)) = self.caps.iter().enumerate().find(|(_, c)| c.end <= c.start) {
            return Err(ConfigError::Invalid(format!(
                "cap {i} ends at {} before its start {}",
                cap.end, cap.start
            )));
        }
        if self.market.values.len() != self.caps.len() {
            return Err(ConfigError::Invalid(format!(
                "{} market values for {} caps",
                self.market.values.len(),
                self.caps.len()
            )));
        }
        if let Some(errors) = &self.market.errors {
            if errors.len() != self.caps.len() {
                return Err(ConfigError::Invalid(format!(
                    "{} market errors for {} caps",
                    errors.len(),
                    self.caps.len()
                )));
            }
        }
        if let StrategyConfig::Sabr { guess } = &self.strategy {
            if guess.len() != 4 {
                return Err(ConfigError::Invalid(format!(
                    "SABR guess needs 4 values (alpha, beta, rho, nu), got {}",
                    guess.len()
                )));
            }
        }
        Ok(())
    }

    /// Apply environment overrides
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        Ok(())
    }

    /// Apply CLI overrides (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        if let Some(output) = &cli.output {
            self.output = Some(output.clone());
        }
        Ok(())
    }
}

/// CLI overrides
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Log level override
    pub log_level: Option<String>,
    /// Report path override
    pub output: Option<PathBuf>,
}

/// Build the job from all sources
pub fn build_config(job: &Path, cli: &CliArgs) -> Result<JobConfig, ConfigError> {
    let mut config = JobConfig::from_file(job)?;
    config.merge_with_env()?;
    config.merge_with_cli(cli)?;
    Ok(config)
}
