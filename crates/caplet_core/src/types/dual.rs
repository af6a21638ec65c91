//! Scalar abstraction shared by `f64` and dual numbers.
//!
//! `Dual64` does not implement `num_traits::Float`, so closed-form model
//! formulas that must be differentiated with respect to their parameters are
//! written against the small [`AdScalar`] trait instead. Every operation a
//! formula needs is listed explicitly; `f64` and (with `num-dual-mode`)
//! [`DualNumber`] implement it.
//!
//! ```
//! use caplet_core::types::dual::AdScalar;
//!
//! fn square_plus_log<S: AdScalar>(x: S) -> S {
//!     x * x + x.ln()
//! }
//!
//! assert!((square_plus_log(1.0_f64) - 1.0).abs() < 1e-15);
//! ```

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Type alias for num-dual's Dual64 (f64-based dual numbers).
///
/// - `re`: Real part (function value)
/// - `eps`: Dual part (directional derivative)
#[cfg(feature = "num-dual-mode")]
pub type DualNumber = num_dual::Dual64;

/// Minimal scalar interface for differentiable closed-form formulas.
pub trait AdScalar:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Lift a constant.
    fn constant(value: f64) -> Self;
    /// Real part.
    fn value(self) -> f64;
    /// Natural logarithm.
    fn ln(self) -> Self;
    /// Exponential.
    fn exp(self) -> Self;
    /// Square root.
    fn sqrt(self) -> Self;

    /// `self^exponent` for positive `self`, differentiable in both arguments.
    fn pow(self, exponent: Self) -> Self {
        (exponent * self.ln()).exp()
    }
}

impl AdScalar for f64 {
    #[inline]
    fn constant(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(self) -> f64 {
        self
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        self.powf(exponent)
    }
}

#[cfg(feature = "num-dual-mode")]
impl AdScalar for DualNumber {
    #[inline]
    fn constant(value: f64) -> Self {
        DualNumber::from(value)
    }

    #[inline]
    fn value(self) -> f64 {
        self.re
    }

    #[inline]
    fn ln(self) -> Self {
        num_dual::DualNum::ln(&self)
    }

    #[inline]
    fn exp(self) -> Self {
        num_dual::DualNum::exp(&self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        num_dual::DualNum::sqrt(&self)
    }
}
