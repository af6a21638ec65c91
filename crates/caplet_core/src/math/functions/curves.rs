//! Curves sampled at fixed points.

use std::fmt;
use std::sync::Arc;

use super::VectorFunction;
use crate::math::interpolators::{Extrapolation, InterpolationMethod};
use crate::math::linalg::{mat_vec, Matrix};
use crate::types::{FunctionError, ValidationError};
use crate::validation::{ensure_ascending, ensure_finite};

/// Knot values of an interpolated curve mapped to the curve sampled at fixed points.
///
/// The interpolant is linear in the knot values, so the node-sensitivity
/// matrix is computed once at construction and serves as the Jacobian.
#[derive(Debug, Clone)]
pub struct InterpolatedCurveFunction {
    knots: Vec<f64>,
    sample_points: Vec<f64>,
    weights: Matrix,
}

impl InterpolatedCurveFunction {
    /// Build the sampler.
    ///
    /// # Errors
    ///
    /// `knots` must be non-empty and strictly ascending and `sample_points`
    /// finite; with [`Extrapolation::Error`] every sample point must lie
    /// inside the knot range.
    pub fn new(
        knots: &[f64],
        sample_points: &[f64],
        method: InterpolationMethod,
        extrapolation: Extrapolation,
    ) -> Result<Self, FunctionError> {
        ensure_ascending(knots, "knots")?;
        ensure_finite(sample_points, "sample_points")?;
        let weights = method.weight_matrix(knots, sample_points, extrapolation)?;
        Ok(Self {
            knots: knots.to_vec(),
            sample_points: sample_points.to_vec(),
            weights,
        })
    }

    /// Curve knots.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Points at which the curve is sampled.
    pub fn sample_points(&self) -> &[f64] {
        &self.sample_points
    }
}

impl VectorFunction for InterpolatedCurveFunction {
    fn size_of_domain(&self) -> usize {
        self.knots.len()
    }

    fn size_of_range(&self) -> usize {
        self.sample_points.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(mat_vec(&self.weights, x))
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        Ok(self.weights.clone())
    }
}

/// A closed-form curve `t ↦ c(t; p)` with its parameter sensitivity.
pub trait ParameterizedCurve: Send + Sync + fmt::Debug {
    /// Number of curve parameters.
    fn num_parameters(&self) -> usize;

    /// Curve value at `t`.
    fn value(&self, t: f64, params: &[f64]) -> f64;

    /// `∂c(t; p)/∂pₖ` for every parameter.
    fn parameter_sensitivity(&self, t: f64, params: &[f64]) -> Vec<f64>;
}

/// Curve parameters mapped to the curve sampled at fixed points.
#[derive(Debug, Clone)]
pub struct ParameterizedCurveFunction {
    curve: Arc<dyn ParameterizedCurve>,
    sample_points: Vec<f64>,
}

impl ParameterizedCurveFunction {
    /// Sample `curve` at `sample_points`.
    pub fn new(
        curve: Arc<dyn ParameterizedCurve>,
        sample_points: &[f64],
    ) -> Result<Self, ValidationError> {
        ensure_finite(sample_points, "sample_points")?;
        Ok(Self {
            curve,
            sample_points: sample_points.to_vec(),
        })
    }
}

impl VectorFunction for ParameterizedCurveFunction {
    fn size_of_domain(&self) -> usize {
        self.curve.num_parameters()
    }

    fn size_of_range(&self) -> usize {
        self.sample_points.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(self
            .sample_points
            .iter()
            .map(|&t| self.curve.value(t, x))
            .collect())
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        Ok(self
            .sample_points
            .iter()
            .map(|&t| self.curve.parameter_sensitivity(t, x))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::finite_difference_jacobian;
    use super::*;
    use approx::assert_relative_eq;

    /// `a + b·t²`
    #[derive(Debug)]
    struct Parabola;

    impl ParameterizedCurve for Parabola {
        fn num_parameters(&self) -> usize {
            2
        }

        fn value(&self, t: f64, params: &[f64]) -> f64 {
            params[0] + params[1] * t * t
        }

        fn parameter_sensitivity(&self, t: f64, _params: &[f64]) -> Vec<f64> {
            vec![1.0, t * t]
        }
    }

    #[test]
    fn test_interpolated_curve_linear() {
        let f = InterpolatedCurveFunction::new(
            &[1.0, 2.0, 4.0],
            &[0.5, 1.5, 3.0, 5.0],
            InterpolationMethod::Linear,
            Extrapolation::Flat,
        )
        .unwrap();
        let y = f.evaluate(&[0.2, 0.4, 0.3]).unwrap();
        assert_relative_eq!(y[0], 0.2);
        assert_relative_eq!(y[1], 0.3, epsilon = 1e-14);
        assert_relative_eq!(y[2], 0.35, epsilon = 1e-14);
        assert_relative_eq!(y[3], 0.3);
    }

    #[test]
    fn test_interpolated_curve_cubic_jacobian() {
        let f = InterpolatedCurveFunction::new(
            &[0.5, 1.0, 2.0, 3.0, 5.0],
            &[0.25, 0.75, 1.1, 2.9, 4.0, 7.0],
            InterpolationMethod::NaturalCubic,
            Extrapolation::Flat,
        )
        .unwrap();
        let x = [0.2, 0.25, 0.22, 0.19, 0.18];
        let analytic = f.evaluate_jacobian(&x).unwrap();
        let fd = finite_difference_jacobian(&f, &x, 1e-6).unwrap();
        for (ra, rf) in analytic.iter().zip(&fd) {
            for (a, b) in ra.iter().zip(rf) {
                assert_relative_eq!(*a, *b, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_interpolated_curve_rejects_unsorted_knots() {
        let result = InterpolatedCurveFunction::new(
            &[2.0, 1.0],
            &[1.5],
            InterpolationMethod::Linear,
            Extrapolation::Flat,
        );
        assert!(matches!(result, Err(FunctionError::Validation(_))));
    }

    #[test]
    fn test_parameterized_curve_function() {
        let f = ParameterizedCurveFunction::new(Arc::new(Parabola), &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(f.evaluate(&[1.0, 0.5]).unwrap(), vec![1.0, 1.5, 3.0]);
        assert_eq!(
            f.evaluate_jacobian(&[1.0, 0.5]).unwrap(),
            vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 4.0]]
        );
        assert!(f.evaluate(&[1.0]).is_err());
    }
}
