//! Input validation helpers.
//!
//! Shared checks for every expiry, strike and weight array in the system.
//! `!is_finite()` rejects NaN, +Inf and -Inf uniformly; errors carry the
//! array name and the first offending index.

use crate::types::ValidationError;

/// Require a non-empty slice.
pub fn ensure_non_empty<T>(values: &[T], name: &str) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::Empty {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Require `values.len() == expected`.
pub fn ensure_length<T>(values: &[T], expected: usize, name: &str) -> Result<(), ValidationError> {
    if values.len() != expected {
        return Err(ValidationError::length_mismatch(name, expected, values.len()));
    }
    Ok(())
}

/// Require every element to be finite.
pub fn ensure_finite(values: &[f64], name: &str) -> Result<(), ValidationError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ValidationError::NonFinite {
            name: name.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

/// Require every element to be finite and strictly positive.
pub fn ensure_positive(values: &[f64], name: &str) -> Result<(), ValidationError> {
    ensure_finite(values, name)?;
    match values.iter().position(|&v| v <= 0.0) {
        Some(index) => Err(ValidationError::NonPositive {
            name: name.to_string(),
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// Require every element to be finite and non-negative.
pub fn ensure_non_negative(values: &[f64], name: &str) -> Result<(), ValidationError> {
    ensure_finite(values, name)?;
    match values.iter().position(|&v| v < 0.0) {
        Some(index) => Err(ValidationError::Invalid(format!(
            "{name}[{index}] = {} is negative",
            values[index]
        ))),
        None => Ok(()),
    }
}

/// Require a non-empty, finite and strictly ascending slice.
pub fn ensure_ascending(values: &[f64], name: &str) -> Result<(), ValidationError> {
    ensure_non_empty(values, name)?;
    ensure_finite(values, name)?;
    match values.windows(2).position(|w| w[1] <= w[0]) {
        Some(i) => Err(ValidationError::NotAscending {
            name: name.to_string(),
            index: i + 1,
        }),
        None => Ok(()),
    }
}

/// Require a non-empty, strictly ascending slice of positive values.
///
/// This is the check applied to every expiry and strike array.
///
/// ```
/// use caplet_core::validation::ensure_ascending_positive;
///
/// assert!(ensure_ascending_positive(&[0.25, 0.5, 1.0], "expiries").is_ok());
/// assert!(ensure_ascending_positive(&[0.5, 0.25], "expiries").is_err());
/// assert!(ensure_ascending_positive(&[0.0, 0.25], "expiries").is_err());
/// ```
pub fn ensure_ascending_positive(values: &[f64], name: &str) -> Result<(), ValidationError> {
    ensure_ascending(values, name)?;
    ensure_positive(values, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rejected() {
        let err = ensure_ascending_positive(&[], "strikes").unwrap_err();
        assert_eq!(
            err,
            ValidationError::Empty {
                name: "strikes".to_string()
            }
        );
    }

    #[test]
    fn test_not_ascending_reports_index() {
        let err = ensure_ascending(&[1.0, 2.0, 2.0, 3.0], "times").unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAscending {
                name: "times".to_string(),
                index: 2
            }
        );
    }

    #[test]
    fn test_non_positive_reports_value() {
        let err = ensure_positive(&[1.0, -2.0], "vols").unwrap_err();
        match err {
            ValidationError::NonPositive { index, value, .. } => {
                assert_eq!(index, 1);
                assert_eq!(value, -2.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nan_rejected() {
        assert!(matches!(
            ensure_finite(&[0.1, f64::NAN], "x"),
            Err(ValidationError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn test_length() {
        assert!(ensure_length(&[1.0, 2.0], 2, "x").is_ok());
        assert!(ensure_length(&[1.0, 2.0], 3, "x").is_err());
    }

    #[test]
    fn test_non_negative_allows_zero() {
        assert!(ensure_non_negative(&[0.0, 0.2], "vols").is_ok());
        assert!(ensure_non_negative(&[0.0, -0.2], "vols").is_err());
    }
}
