//! Floating-rate index definition.

use std::fmt;

use super::error::InstrumentError;

/// A floating-rate (IBOR-style) index: a name and the tenor of its fixings.
///
/// Two indices are the same when both name and tenor agree; caps calibrated
/// jointly must reference the same index.
///
/// # Example
///
/// ```
/// use caplet_models::instruments::IborIndex;
///
/// let index = IborIndex::new("USD-LIBOR", 0.25).unwrap();
/// assert_eq!(index.to_string(), "USD-LIBOR-3M");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IborIndex {
    name: String,
    tenor: f64,
}

impl IborIndex {
    /// Create an index with a tenor in years.
    ///
    /// # Errors
    ///
    /// * `InstrumentError::InvalidPeriod` - tenor is not positive and finite
    pub fn new(name: impl Into<String>, tenor: f64) -> Result<Self, InstrumentError> {
        if !(tenor > 0.0 && tenor.is_finite()) {
            return Err(InstrumentError::invalid_period(format!(
                "index tenor {tenor} must be positive"
            )));
        }
        Ok(Self {
            name: name.into(),
            tenor,
        })
    }

    /// Index name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixing tenor in years.
    #[inline]
    pub fn tenor(&self) -> f64 {
        self.tenor
    }

    /// Tenor rounded to whole months.
    pub fn tenor_months(&self) -> u32 {
        (self.tenor * 12.0).round() as u32
    }
}

impl fmt::Display for IborIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}M", self.name, self.tenor_months())
    }
}
