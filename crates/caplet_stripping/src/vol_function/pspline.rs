//! Penalised B-spline (P-spline) parameterisations.

use std::sync::Arc;

use caplet_core::math::bspline::{BSplineBasis, TensorBSplineBasis};
use caplet_core::math::functions::BasisSplineFunction;
use caplet_core::math::linalg::Matrix;
use caplet_core::math::penalty::{difference_matrix, penalty_matrix_sized, tensor_penalty_matrix};

use super::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid};
use crate::error::StrippingError;

#[derive(Debug, Clone, PartialEq)]
enum SplineBasis {
    Curve(BSplineBasis),
    Surface(TensorBSplineBasis),
}

/// Parameters are B-spline coefficients, over expiry alone or over
/// (expiry, strike).
///
/// The bases form a partition of unity, so equal coefficients give a flat
/// surface at that level.
///
/// # Example
///
/// ```
/// use caplet_core::math::bspline::BSplineBasis;
/// use caplet_core::math::functions::VectorFunction;
/// use caplet_stripping::vol_function::{
///     DiscreteVolatilityFunctionProvider, EvaluationGrid, PSplineProvider,
/// };
///
/// let basis = BSplineBasis::uniform(0.0, 5.0, 6, 3).unwrap();
/// let provider = PSplineProvider::term_structure(basis);
/// let grid = EvaluationGrid::new(vec![(0.5, 0.03), (2.5, 0.03), (4.5, 0.03)]).unwrap();
/// let vols = provider.from_grid(&grid).unwrap().evaluate(&[0.3; 6]).unwrap();
/// assert!(vols.iter().all(|v| (v - 0.3).abs() < 1e-12));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PSplineProvider {
    basis: SplineBasis,
}

impl PSplineProvider {
    /// Spline in expiry only.
    pub fn term_structure(basis: BSplineBasis) -> Self {
        Self {
            basis: SplineBasis::Curve(basis),
        }
    }

    /// Tensor-product spline in (expiry, strike).
    pub fn surface(basis: TensorBSplineBasis) -> Self {
        Self {
            basis: SplineBasis::Surface(basis),
        }
    }

    /// Number of coefficients.
    pub fn num_parameters(&self) -> usize {
        match &self.basis {
            SplineBasis::Curve(b) => b.num_functions(),
            SplineBasis::Surface(b) => b.num_functions(),
        }
    }

    /// `λ·DᵀD` on the coefficients with `order`-th differences; for a
    /// surface each direction is penalised with the same weight.
    pub fn penalty_matrix(&self, order: usize, lambda: f64) -> Matrix {
        let one_dim = |n: usize| penalty_matrix_sized(&difference_matrix(n, order), lambda, n);
        match &self.basis {
            SplineBasis::Curve(b) => one_dim(b.num_functions()),
            SplineBasis::Surface(b) => tensor_penalty_matrix(
                &one_dim(b.x_basis().num_functions()),
                &one_dim(b.y_basis().num_functions()),
            ),
        }
    }
}

impl DiscreteVolatilityFunctionProvider for PSplineProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        let function = match &self.basis {
            SplineBasis::Curve(b) => BasisSplineFunction::curve(b, &grid.expiries()),
            SplineBasis::Surface(b) => BasisSplineFunction::surface(b, grid.points()),
        };
        Ok(DiscreteVolatilityFunction::new(grid.clone(), Arc::new(function))?)
    }
}
