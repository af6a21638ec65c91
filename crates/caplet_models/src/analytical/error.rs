//! Error types for analytical pricing operations.
//!
//! This module provides:
//! - `AnalyticalError`: Errors from the closed-form Black formula and its inversion

use thiserror::Error;

/// Analytical pricing errors.
///
/// # Variants
/// - `InvalidVolatility`: Negative or non-finite volatility
/// - `InvalidForward`: Non-positive forward rate
/// - `InvalidStrike`: Non-positive strike
/// - `PriceOutOfBounds`: Price outside the no-arbitrage range, so no implied volatility exists
/// - `NumericalInstability`: Computation encountered numerical issues
///
/// # Examples
/// ```
/// use caplet_models::analytical::AnalyticalError;
///
/// let err = AnalyticalError::InvalidVolatility { volatility: -0.2 };
/// assert!(format!("{}", err).contains("volatility"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticalError {
    /// Invalid volatility (negative or non-finite).
    #[error("Invalid volatility: σ = {volatility}")]
    InvalidVolatility {
        /// The invalid volatility value
        volatility: f64,
    },

    /// Invalid forward rate (non-positive for the lognormal formula).
    #[error("Invalid forward: F = {forward}")]
    InvalidForward {
        /// The invalid forward value
        forward: f64,
    },

    /// Invalid strike (non-positive for the lognormal formula).
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Price outside `[intrinsic, upper bound]`.
    #[error("Price {price} outside no-arbitrage bounds [{lower}, {upper}]")]
    PriceOutOfBounds {
        /// Observed price
        price: f64,
        /// Intrinsic value
        lower: f64,
        /// Zero-strike (call) or strike (put) bound
        upper: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {message}")]
    NumericalInstability {
        /// Description of the numerical issue
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_out_of_bounds_display() {
        let err = AnalyticalError::PriceOutOfBounds {
            price: 2.0,
            lower: 0.0,
            upper: 1.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2"));
        assert!(msg.contains("[0, 1]"));
    }

    #[test]
    fn test_clone_and_eq() {
        let err = AnalyticalError::InvalidForward { forward: -0.01 };
        assert_eq!(err.clone(), err);
    }
}
