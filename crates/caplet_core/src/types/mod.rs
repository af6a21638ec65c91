//! Core numeric and error types.
//!
//! This module provides:
//! - `dual`: The [`AdScalar`](dual::AdScalar) abstraction over `f64` and dual numbers
//! - `error`: Structured error types for validation, interpolation, solver and function evaluation
//!
//! # Re-exports
//!
//! [`ValidationError`], [`InterpolationError`], [`SolverError`] and [`FunctionError`]
//! are re-exported at this module level.

pub mod dual;
pub mod error;

pub use error::{FunctionError, InterpolationError, SolverError, ValidationError};
