//! Caplet stripping error types.
//!
//! Solver failures are split by remedy: [`StrippingError::NotConverged`]
//! (more iterations or a looser tolerance), [`StrippingError::SingularJacobianAtStart`]
//! (a better guess or another parameterisation) and
//! [`StrippingError::InfeasibleStart`] (a guess satisfying the constraint).

use caplet_core::types::{FunctionError, SolverError, ValidationError};
use caplet_models::analytical::AnalyticalError;
use caplet_models::instruments::InstrumentError;
use caplet_models::models::ModelError;
use thiserror::Error;

/// Errors raised while building or solving a stripping problem.
///
/// # Examples
///
/// ```
/// use caplet_core::types::SolverError;
/// use caplet_stripping::StrippingError;
///
/// let err: StrippingError = SolverError::MaxIterationsExceeded {
///     iterations: 200,
///     residual_ss: 1e-3,
/// }
/// .into();
/// assert!(err.is_not_converged());
/// assert!(!err.is_singular_start());
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrippingError {
    /// Array-shape or ordering violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid cap or caplet definition.
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    /// Black pricing or implied-volatility failure.
    #[error(transparent)]
    Analytical(#[from] AnalyticalError),

    /// Volatility function evaluation failure.
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Smile model failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Other numerical solver failure.
    #[error("Solver failure: {0}")]
    Solver(SolverError),

    /// The optimiser hit its iteration bound.
    #[error("Stripping did not converge after {iterations} iterations (chi-square: {chi_square:.6e})")]
    NotConverged {
        /// Iterations performed
        iterations: usize,
        /// Objective at the last iterate
        chi_square: f64,
    },

    /// The linearisation at the starting point is degenerate.
    #[error("Singular Jacobian at the starting point: {0}")]
    SingularJacobianAtStart(String),

    /// The starting point violates the constraint.
    #[error("Starting point violates the constraint")]
    InfeasibleStart,

    /// Market data vector of the wrong length.
    #[error("Market data length mismatch: expected {expected} values (one per cap), got {got}")]
    MarketDataMismatch {
        /// Number of caps
        expected: usize,
        /// Values supplied
        got: usize,
    },

    /// Caps in one batch reference different floating-rate indices.
    #[error("Cap {position} is on index {got}, expected {expected}")]
    MixedIndices {
        /// Index of the first cap
        expected: String,
        /// Index of the offending cap
        got: String,
        /// Position of the offending cap
        position: usize,
    },

    /// A market value fails its admissibility check.
    #[error("Invalid market value for cap {cap}: {message}")]
    InvalidMarketData {
        /// Cap position
        cap: usize,
        /// What is wrong
        message: String,
    },

    /// Unsupported combination of strategy and inputs.
    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl StrippingError {
    /// Create a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    /// Create an invalid market data error.
    pub fn invalid_market_data(cap: usize, message: impl Into<String>) -> Self {
        Self::InvalidMarketData {
            cap,
            message: message.into(),
        }
    }

    /// True if the optimiser ran out of iterations.
    pub fn is_not_converged(&self) -> bool {
        matches!(self, Self::NotConverged { .. })
    }

    /// True if the starting linearisation was degenerate.
    pub fn is_singular_start(&self) -> bool {
        matches!(self, Self::SingularJacobianAtStart(_))
    }

    /// True for failures of the numerics rather than of the inputs.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NotConverged { .. }
                | Self::SingularJacobianAtStart(_)
                | Self::InfeasibleStart
                | Self::Solver(_)
                | Self::Analytical(_)
        )
    }
}

impl From<SolverError> for StrippingError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::MaxIterationsExceeded {
                iterations,
                residual_ss,
            } => Self::NotConverged {
                iterations,
                chi_square: residual_ss,
            },
            SolverError::SingularJacobian { context } => Self::SingularJacobianAtStart(context),
            SolverError::InfeasibleStart => Self::InfeasibleStart,
            other => Self::Solver(other),
        }
    }
}
