//! Error types for structured error handling.
//!
//! This module provides:
//! - `ValidationError`: Errors from eager input validation (which array, which index)
//! - `InterpolationError`: Errors from interpolation operations
//! - `SolverError`: Errors from root-finding and least-squares solvers
//! - `FunctionError`: Errors from evaluating a vector function

use thiserror::Error;

/// Input validation errors.
///
/// Every variant names the offending array so callers can diagnose the
/// failing input without re-running the validation.
///
/// # Examples
/// ```
/// use caplet_core::types::ValidationError;
///
/// let err = ValidationError::NotAscending { name: "fixing_times".to_string(), index: 3 };
/// assert!(format!("{}", err).contains("fixing_times"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    /// Array must contain at least one element.
    #[error("{name} is empty")]
    Empty {
        /// Name of the array
        name: String,
    },

    /// Array length differs from the expected length.
    #[error("{name} has length {got}, expected {expected}")]
    LengthMismatch {
        /// Name of the array
        name: String,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Array is not strictly ascending.
    #[error("{name} is not strictly ascending at index {index}")]
    NotAscending {
        /// Name of the array
        name: String,
        /// First index violating the ordering
        index: usize,
    },

    /// Value must be strictly positive.
    #[error("{name}[{index}] = {value} is not positive")]
    NonPositive {
        /// Name of the array
        name: String,
        /// Offending index
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Value is NaN or infinite.
    #[error("{name}[{index}] is not finite")]
    NonFinite {
        /// Name of the array
        name: String,
        /// Offending index
        index: usize,
    },

    /// Any other invalid input.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

impl ValidationError {
    /// Create a length mismatch error.
    pub fn length_mismatch(name: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::LengthMismatch {
            name: name.into(),
            expected,
            got,
        }
    }

    /// Create a generic invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Interpolation-related errors.
///
/// # Variants
/// - `OutOfBounds`: Query point outside valid interpolation domain
/// - `InsufficientData`: Not enough data points for interpolation
/// - `NonMonotonicData`: Data violates monotonicity requirement
/// - `InvalidInput`: General invalid input error
///
/// # Examples
/// ```
/// use caplet_core::types::InterpolationError;
///
/// let err = InterpolationError::OutOfBounds { x: 5.0, min: 0.0, max: 3.0 };
/// assert!(format!("{}", err).contains("outside valid domain"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationError {
    /// Query point outside valid interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// The query point that was out of bounds
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Insufficient data points for interpolation.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Data is not monotonic when monotonicity is required.
    #[error("Data is not monotonic at index {index}")]
    NonMonotonicData {
        /// Index where monotonicity violation was detected
        index: usize,
    },

    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Root-finding and least-squares solver errors.
///
/// Non-convergence, a degenerate starting linearisation and an infeasible
/// starting point are separate variants: they call for different remedies
/// (more iterations, a better guess or parameterisation, a feasible guess).
///
/// # Examples
/// ```
/// use caplet_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100, residual_ss: 0.5 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// assert!(err.is_not_converged());
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations (residual_ss = {residual_ss:.6e})")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
        /// Objective value when the iteration bound was hit
        residual_ss: f64,
    },

    /// The Jacobian is singular or non-finite at the starting point.
    #[error("Singular Jacobian at start: {context}")]
    SingularJacobian {
        /// What made the linearisation degenerate
        context: String,
    },

    /// The starting point violates the feasibility constraint.
    #[error("Starting point violates the constraint")]
    InfeasibleStart,

    /// Starting point has the wrong number of parameters.
    #[error("Dimension mismatch: expected {expected} parameters, got {got}")]
    DimensionMismatch {
        /// Expected number of parameters
        expected: usize,
        /// Number supplied
        got: usize,
    },

    /// Derivative near zero (division by zero risk in Newton-Raphson).
    #[error("Derivative near zero at x = {x}")]
    DerivativeNearZero {
        /// The x value where derivative was near zero
        x: f64,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl SolverError {
    /// Create a singular Jacobian error.
    pub fn singular(context: impl Into<String>) -> Self {
        Self::SingularJacobian {
            context: context.into(),
        }
    }

    /// Check if this is a non-convergence error.
    pub fn is_not_converged(&self) -> bool {
        matches!(self, Self::MaxIterationsExceeded { .. })
    }

    /// Check if this is a degenerate-start error.
    pub fn is_singular_start(&self) -> bool {
        matches!(self, Self::SingularJacobian { .. })
    }
}

/// Errors raised while evaluating a vector function or its Jacobian.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Input failed validation (typically a domain size mismatch).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Interpolation failed.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// The function is undefined at the requested point.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

impl FunctionError {
    /// Create an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::NonPositive {
            name: "strikes".to_string(),
            index: 2,
            value: -0.01,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("strikes[2]"));
        assert!(msg.contains("-0.01"));
    }

    #[test]
    fn test_length_mismatch_constructor() {
        let err = ValidationError::length_mismatch("errors", 4, 3);
        assert_eq!(
            err,
            ValidationError::LengthMismatch {
                name: "errors".to_string(),
                expected: 4,
                got: 3
            }
        );
    }

    #[test]
    fn test_solver_error_predicates() {
        assert!(SolverError::singular("zero column").is_singular_start());
        assert!(!SolverError::InfeasibleStart.is_not_converged());
        assert!(SolverError::MaxIterationsExceeded {
            iterations: 5,
            residual_ss: 1.0
        }
        .is_not_converged());
    }

    #[test]
    fn test_function_error_from_validation() {
        let err: FunctionError = ValidationError::invalid("bad").into();
        assert!(matches!(err, FunctionError::Validation(_)));
    }
}
