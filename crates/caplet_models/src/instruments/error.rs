//! Instrument error types.

use caplet_core::types::ValidationError;
use thiserror::Error;

use crate::market_data::MarketDataError;

/// Instrument construction errors.
///
/// # Variants
/// - `InvalidStrike`: Strike is non-positive or non-finite
/// - `InvalidPeriod`: Caplet period dates are inconsistent
/// - `InvalidForward`: Projected forward is not usable by the lognormal formula
/// - `EmptyCapletList`: A cap/floor needs at least one caplet
/// - `MixedStrikes` / `MixedCallPut`: Caplets of one cap must agree
/// - `MarketData`: Curve lookup failed during decomposition
///
/// # Examples
/// ```
/// use caplet_models::instruments::InstrumentError;
///
/// let err = InstrumentError::InvalidStrike { strike: -0.01 };
/// assert!(format!("{}", err).contains("-0.01"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    /// Invalid strike (non-positive).
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Inconsistent caplet period.
    #[error("Invalid caplet period: {message}")]
    InvalidPeriod {
        /// What is wrong with the period
        message: String,
    },

    /// Forward rate unusable by the lognormal formula.
    #[error("Invalid forward rate {forward} for fixing at t = {fixing_time}")]
    InvalidForward {
        /// Projected forward
        forward: f64,
        /// Fixing time of the caplet
        fixing_time: f64,
    },

    /// Cap/floor without caplets.
    #[error("A cap/floor requires at least one caplet")]
    EmptyCapletList,

    /// Caplets with different strikes in one cap.
    #[error("Caplet {index} has strike {got}, expected {expected}")]
    MixedStrikes {
        /// Index of the offending caplet
        index: usize,
        /// Strike of the first caplet
        expected: f64,
        /// Strike of the offending caplet
        got: f64,
    },

    /// Caplets and floorlets mixed in one cap.
    #[error("Caplet {index} mixes calls and puts")]
    MixedCallPut {
        /// Index of the offending caplet
        index: usize,
    },

    /// Input array validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Curve lookup failure.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}

impl InstrumentError {
    /// Create an invalid period error.
    pub fn invalid_period(message: impl Into<String>) -> Self {
        Self::InvalidPeriod {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_strikes_display() {
        let err = InstrumentError::MixedStrikes {
            index: 2,
            expected: 0.03,
            got: 0.04,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Caplet 2"));
        assert!(msg.contains("0.04"));
    }

    #[test]
    fn test_from_market_data() {
        let err: InstrumentError = MarketDataError::InvalidMaturity { t: -1.0 }.into();
        assert!(matches!(err, InstrumentError::MarketData(_)));
    }
}
