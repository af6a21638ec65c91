//! Continuous surface models sampled on the caplet grid.

use std::fmt;
use std::sync::Arc;

use caplet_core::math::functions::{finite_difference_jacobian, VectorFunction, DEFAULT_FD_STEP};
use caplet_core::math::interpolators::{BilinearInterpolator, Extrapolation};
use caplet_core::math::linalg::Matrix;
use caplet_core::types::{FunctionError, ValidationError};
use caplet_core::validation::ensure_ascending_positive;

use super::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid};
use crate::error::StrippingError;

/// A volatility surface `σ(expiry, strike; p)` with a fixed parameter count.
pub trait VolatilitySurfaceModel: Send + Sync + fmt::Debug {
    /// Number of parameters.
    fn num_parameters(&self) -> usize;

    /// Volatility at one point.
    fn volatility(&self, expiry: f64, strike: f64, params: &[f64]) -> Result<f64, FunctionError>;

    /// `∂σ(expiry, strike)/∂p`, when the model has it in closed form.
    fn parameter_adjoint(
        &self,
        _expiry: f64,
        _strike: f64,
        _params: &[f64],
    ) -> Option<Result<Vec<f64>, FunctionError>> {
        None
    }
}

/// Bilinear surface through node volatilities on an expiry × strike grid.
///
/// Parameter `i·n_strikes + j` is the volatility at `(expiries[i], strikes[j])`;
/// queries outside the nodes are extrapolated flat.
#[derive(Debug, Clone)]
pub struct InterpolatedVolatilitySurface {
    expiries: Vec<f64>,
    strikes: Vec<f64>,
    weights: BilinearInterpolator,
}

impl InterpolatedVolatilitySurface {
    /// Surface on the given node axes.
    pub fn new(expiries: Vec<f64>, strikes: Vec<f64>) -> Result<Self, StrippingError> {
        ensure_ascending_positive(&expiries, "surface expiries")?;
        ensure_ascending_positive(&strikes, "surface strikes")?;
        let zeros = vec![vec![0.0; strikes.len()]; expiries.len()];
        let rows: Vec<&[f64]> = zeros.iter().map(Vec::as_slice).collect();
        let weights = BilinearInterpolator::new(&expiries, &strikes, &rows)
            .map_err(FunctionError::from)?
            .with_extrapolation(Extrapolation::Flat);
        Ok(Self {
            expiries,
            strikes,
            weights,
        })
    }

    /// Expiry nodes.
    pub fn expiries(&self) -> &[f64] {
        &self.expiries
    }

    /// Strike nodes.
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    fn check_params(&self, params: &[f64]) -> Result<(), FunctionError> {
        let expected = self.num_parameters();
        if params.len() != expected {
            return Err(ValidationError::length_mismatch(
                "surface parameters",
                expected,
                params.len(),
            )
            .into());
        }
        Ok(())
    }
}

impl VolatilitySurfaceModel for InterpolatedVolatilitySurface {
    fn num_parameters(&self) -> usize {
        self.expiries.len() * self.strikes.len()
    }

    fn volatility(&self, expiry: f64, strike: f64, params: &[f64]) -> Result<f64, FunctionError> {
        self.check_params(params)?;
        let n_k = self.strikes.len();
        Ok(self
            .weights
            .node_weights(expiry, strike)?
            .into_iter()
            .map(|(i, j, w)| w * params[i * n_k + j])
            .sum())
    }

    fn parameter_adjoint(
        &self,
        expiry: f64,
        strike: f64,
        params: &[f64],
    ) -> Option<Result<Vec<f64>, FunctionError>> {
        let n_k = self.strikes.len();
        Some(self.check_params(params).and_then(|()| {
            let mut row = vec![0.0; self.num_parameters()];
            for (i, j, w) in self.weights.node_weights(expiry, strike)? {
                row[i * n_k + j] += w;
            }
            Ok(row)
        }))
    }
}

/// A surface model sampled at the grid points.
#[derive(Debug, Clone)]
struct SampledSurface {
    surface: Arc<dyn VolatilitySurfaceModel>,
    points: Vec<(f64, f64)>,
}

impl VectorFunction for SampledSurface {
    fn size_of_domain(&self) -> usize {
        self.surface.num_parameters()
    }

    fn size_of_range(&self) -> usize {
        self.points.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        self.points
            .iter()
            .map(|&(t, k)| self.surface.volatility(t, k, x))
            .collect()
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        let mut rows = Vec::with_capacity(self.points.len());
        for &(t, k) in &self.points {
            match self.surface.parameter_adjoint(t, k, x) {
                Some(row) => rows.push(row?),
                None => return finite_difference_jacobian(self, x, DEFAULT_FD_STEP),
            }
        }
        Ok(rows)
    }
}

/// Parameters of an external continuous surface; its adjoint supplies the
/// Jacobian when available, central differences otherwise.
#[derive(Debug, Clone)]
pub struct InterpolatedSurfaceProvider {
    surface: Arc<dyn VolatilitySurfaceModel>,
}

impl InterpolatedSurfaceProvider {
    /// Wrap a surface model.
    pub fn new(surface: Arc<dyn VolatilitySurfaceModel>) -> Self {
        Self { surface }
    }

    /// Number of model parameters.
    pub fn num_parameters(&self) -> usize {
        self.surface.num_parameters()
    }
}

impl DiscreteVolatilityFunctionProvider for InterpolatedSurfaceProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        let sampled = SampledSurface {
            surface: Arc::clone(&self.surface),
            points: grid.points().to_vec(),
        };
        Ok(DiscreteVolatilityFunction::new(grid.clone(), Arc::new(sampled))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vol_function::test_support::assert_jacobian_consistent;
    use approx::assert_relative_eq;

    /// `σ = a + b·ln(K) + c·t`, with no closed-form adjoint.
    #[derive(Debug)]
    struct LogStrikeSurface;

    impl VolatilitySurfaceModel for LogStrikeSurface {
        fn num_parameters(&self) -> usize {
            3
        }

        fn volatility(&self, expiry: f64, strike: f64, p: &[f64]) -> Result<f64, FunctionError> {
            Ok(p[0] + p[1] * strike.ln() + p[2] * expiry)
        }
    }

    fn grid() -> EvaluationGrid {
        EvaluationGrid::new(vec![
            (0.5, 0.02),
            (1.0, 0.02),
            (3.0, 0.02),
            (0.5, 0.035),
            (2.0, 0.035),
            (6.0, 0.05),
        ])
        .unwrap()
    }

    #[test]
    fn test_node_surface_reproduces_nodes() {
        let surface = InterpolatedVolatilitySurface::new(vec![1.0, 2.0], vec![0.02, 0.04]).unwrap();
        let params = [0.3, 0.2, 0.25, 0.15];
        assert_relative_eq!(surface.volatility(2.0, 0.02, &params).unwrap(), 0.25);
        assert_relative_eq!(surface.volatility(1.5, 0.03, &params).unwrap(), 0.225, epsilon = 1e-15);
        // Flat outside
        assert_relative_eq!(surface.volatility(9.0, 0.09, &params).unwrap(), 0.15);
    }

    #[test]
    fn test_node_surface_adjoint_matches_fd() {
        let surface = InterpolatedVolatilitySurface::new(vec![0.5, 2.0, 5.0], vec![0.02, 0.04]).unwrap();
        let provider = InterpolatedSurfaceProvider::new(Arc::new(surface));
        let f = provider.from_grid(&grid()).unwrap();
        let x: Vec<f64> = (0..6).map(|i| 0.2 + 0.03 * i as f64).collect();
        assert_jacobian_consistent(&f, &x, 1e-8);
    }

    #[test]
    fn test_fd_fallback_without_adjoint() {
        let provider = InterpolatedSurfaceProvider::new(Arc::new(LogStrikeSurface));
        let f = provider.from_grid(&grid()).unwrap();
        let jac = f.evaluate_jacobian(&[0.5, 0.05, 0.01]).unwrap();
        assert_relative_eq!(jac[1][1], 0.02_f64.ln(), epsilon = 1e-8);
        assert_relative_eq!(jac[5][2], 6.0, epsilon = 1e-8);
    }

    #[test]
    fn test_parameter_count_checked() {
        let surface = InterpolatedVolatilitySurface::new(vec![1.0], vec![0.03]).unwrap();
        assert!(surface.volatility(1.0, 0.03, &[0.2, 0.3]).is_err());
    }
}
