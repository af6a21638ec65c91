//! Error types for smile and term-structure models.

use caplet_core::types::ValidationError;
use thiserror::Error;

/// Smile model errors.
///
/// # Examples
///
/// ```
/// use caplet_models::models::ModelError;
///
/// let err = ModelError::InvalidParameter { name: "rho".to_string(), value: 1.2 };
/// assert!(format!("{}", err).contains("rho = 1.2"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A model parameter lies outside its admissible range.
    #[error("Invalid model parameter: {name} = {value}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Offending value
        value: f64,
    },

    /// Forward, strike or expiry unusable by the formula.
    #[error("Invalid market input: {name} = {value}")]
    InvalidInput {
        /// Input name
        name: String,
        /// Offending value
        value: f64,
    },

    /// Parameter vector of the wrong length.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The formula produced NaN or infinity.
    #[error("Non-finite volatility at strike {strike}")]
    NonFinite {
        /// Strike where evaluation failed
        strike: f64,
    },
}

impl ModelError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, value: f64) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value,
        }
    }
}
