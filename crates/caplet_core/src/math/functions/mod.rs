//! Differentiable vector functions.
//!
//! A [`VectorFunction`] maps a parameter vector of fixed length
//! (`size_of_domain`) to an output vector of fixed length (`size_of_range`)
//! and provides its Jacobian, `size_of_range × size_of_domain`. Functions are
//! pure: `evaluate` and `evaluate_jacobian` depend only on their input.
//!
//! Implementors that cannot supply an analytic Jacobian inherit the default
//! central finite-difference one. Analytic Jacobians are checked against
//! [`finite_difference_jacobian`] in tests.
//!
//! ## Building Blocks
//!
//! - [`LinearVectorFunction`], [`IdentityFunction`]: constant-Jacobian maps
//! - [`InterpolatedCurveFunction`]: knot values sampled through 1-D interpolation
//! - [`ParameterizedCurveFunction`]: a closed-form curve sampled at fixed times
//! - [`BasisSplineFunction`]: B-spline coefficients evaluated on a fixed grid
//! - [`TransformFunction`]: element-wise parameter transform (e.g. `exp`)
//!
//! ## Combinators
//!
//! - [`ComposedVectorFunction`]: `outer(inner(x))`, Jacobian by the chain rule
//! - [`ConcatenatedVectorFunction`]: independent functions stacked block-diagonally
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use caplet_core::math::functions::{
//!     ComposedVectorFunction, InterpolatedCurveFunction, ParameterTransform, TransformFunction,
//!     VectorFunction,
//! };
//! use caplet_core::math::interpolators::{Extrapolation, InterpolationMethod};
//!
//! // exp(log-vols at knots 1y, 2y) sampled at 1.5y
//! let curve = InterpolatedCurveFunction::new(
//!     &[1.0, 2.0],
//!     &[1.5],
//!     InterpolationMethod::Linear,
//!     Extrapolation::Flat,
//! )
//! .unwrap();
//! let f = ComposedVectorFunction::new(
//!     Arc::new(curve),
//!     Arc::new(TransformFunction::new(ParameterTransform::Exp, 2)),
//! )
//! .unwrap();
//!
//! let x = [0.2_f64.ln(), 0.3_f64.ln()];
//! let y = f.evaluate(&x).unwrap();
//! assert!((y[0] - 0.25).abs() < 1e-12);
//! ```

mod basis;
mod combinators;
mod curves;

pub use basis::BasisSplineFunction;
pub use combinators::{
    ComposedVectorFunction, ConcatenatedVectorFunction, IdentityFunction, LinearVectorFunction,
    ParameterTransform, TransformFunction,
};
pub use curves::{InterpolatedCurveFunction, ParameterizedCurve, ParameterizedCurveFunction};

use std::fmt;

use crate::math::linalg::{zeros, Matrix};
use crate::types::{FunctionError, ValidationError};

/// Relative bump used by the default finite-difference Jacobian.
pub const DEFAULT_FD_STEP: f64 = 1e-6;

/// A differentiable map from a parameter vector to an output vector.
pub trait VectorFunction: Send + Sync + fmt::Debug {
    /// Length of the input vector.
    fn size_of_domain(&self) -> usize;

    /// Length of the output vector.
    fn size_of_range(&self) -> usize;

    /// Evaluate the function at `x`.
    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError>;

    /// Jacobian at `x`, `size_of_range × size_of_domain`.
    ///
    /// Defaults to a central finite difference of [`evaluate`](Self::evaluate).
    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        finite_difference_jacobian(self, x, DEFAULT_FD_STEP)
    }

    /// Reject inputs whose length differs from `size_of_domain`.
    fn check_domain(&self, x: &[f64]) -> Result<(), FunctionError> {
        if x.len() != self.size_of_domain() {
            return Err(ValidationError::length_mismatch(
                "parameters",
                self.size_of_domain(),
                x.len(),
            )
            .into());
        }
        Ok(())
    }
}

/// Central finite-difference Jacobian with relative step `eps·max(|xⱼ|, 1)`.
pub fn finite_difference_jacobian<F>(f: &F, x: &[f64], eps: f64) -> Result<Matrix, FunctionError>
where
    F: VectorFunction + ?Sized,
{
    f.check_domain(x)?;
    let n = x.len();
    let mut jac = zeros(f.size_of_range(), n);
    let mut bumped = x.to_vec();
    for j in 0..n {
        let h = eps * x[j].abs().max(1.0);
        bumped[j] = x[j] + h;
        let up = f.evaluate(&bumped)?;
        bumped[j] = x[j] - h;
        let down = f.evaluate(&bumped)?;
        bumped[j] = x[j];
        for (row, (u, d)) in jac.iter_mut().zip(up.iter().zip(&down)) {
            row[j] = (u - d) / (2.0 * h);
        }
    }
    Ok(jac)
}
