//! Market data error types.

use caplet_core::types::InterpolationError;
use thiserror::Error;

/// Market data operation errors.
///
/// # Variants
///
/// - `InvalidMaturity`: Negative time, or an empty forward period
/// - `InvalidDiscountFactor`: Curve produced a non-positive or non-finite discount factor
/// - `Interpolation`: Wrapped interpolation error
/// - `InsufficientData`: Not enough data points for construction
///
/// # Examples
///
/// ```
/// use caplet_models::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidMaturity { t: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Invalid maturity (negative time).
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value
        t: f64,
    },

    /// Discount factor is not a positive finite number.
    #[error("Invalid discount factor {df} at t = {t}")]
    InvalidDiscountFactor {
        /// Maturity queried
        t: f64,
        /// Value produced
        df: f64,
    },

    /// Interpolation error.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },
}
