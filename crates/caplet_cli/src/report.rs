//! JSON stripping report.

use caplet_stripping::{
    CapletStrippingResult, CapletVolatilityPoint, CombinedCapletStrippingResults, MarketDataType, StrippingError,
    StrippingMethod, VolatilitySurfaceGrid,
};
use serde::Serialize;

use crate::config::{CapKind, JobConfig};

/// Market against model for one quoted cap.
#[derive(Debug, Clone, Serialize)]
pub struct CapFit {
    pub strike: f64,
    pub start: f64,
    pub end: f64,
    pub kind: CapKind,
    /// Quote in the job's units
    pub market: f64,
    /// Model value in the job's units
    pub model: f64,
    /// Model cap-implied volatility
    pub model_vol: f64,
}

/// Everything a strip produces.
#[derive(Debug, Clone, Serialize)]
pub struct StrippingReport {
    pub strategy: String,
    pub data_type: MarketDataType,
    pub method: StrippingMethod,
    pub chi_square: f64,
    pub iterations: usize,
    pub fit_parameters: Vec<f64>,
    pub caps: Vec<CapFit>,
    pub caplets: Vec<CapletVolatilityPoint>,
    pub surface: VolatilitySurfaceGrid,
}

impl StrippingReport {
    /// Collect the report for `result`, fitted to `job`.
    pub fn new(job: &JobConfig, result: &CapletStrippingResult) -> Result<Self, StrippingError> {
        let model_vols = result.model_cap_vols()?;
        let model = match job.market.data_type {
            MarketDataType::Price => result.model_cap_prices()?,
            MarketDataType::Vol => model_vols.clone(),
        };
        let caps = job
            .caps
            .iter()
            .zip(&job.market.values)
            .zip(model.iter().zip(&model_vols))
            .map(|((cap, &market), (&model, &model_vol))| CapFit {
                strike: cap.strike,
                start: cap.start,
                end: cap.end,
                kind: cap.kind,
                market,
                model,
                model_vol,
            })
            .collect();
        let surface = CombinedCapletStrippingResults::new(std::slice::from_ref(result))?;

        Ok(Self {
            strategy: job.strategy.name().to_string(),
            data_type: job.market.data_type,
            method: result.method(),
            chi_square: result.chi_square(),
            iterations: result.iterations(),
            fit_parameters: result.fit_parameters().to_vec(),
            caps,
            caplets: surface.points().to_vec(),
            surface: surface.surface_grid().clone(),
        })
    }

    /// Largest absolute market-model difference in the job's units.
    pub fn max_abs_error(&self) -> f64 {
        self.caps
            .iter()
            .map(|c| (c.model - c.market).abs())
            .fold(0.0, f64::max)
    }
}
