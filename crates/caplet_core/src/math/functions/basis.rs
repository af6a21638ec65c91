//! B-spline coefficients evaluated on a fixed grid.

use super::VectorFunction;
use crate::math::bspline::{BSplineBasis, TensorBSplineBasis};
use crate::math::linalg::{mat_vec, Matrix};
use crate::types::FunctionError;

/// Basis coefficients mapped to `Σ wₖ·Bₖ(point)` at each grid point.
///
/// Linear in the coefficients: the Jacobian is the basis matrix.
#[derive(Debug, Clone)]
pub struct BasisSplineFunction {
    basis_matrix: Matrix,
    num_coefficients: usize,
}

impl BasisSplineFunction {
    /// One-dimensional spline sampled at `points`.
    pub fn curve(basis: &BSplineBasis, points: &[f64]) -> Self {
        Self {
            basis_matrix: basis.basis_matrix(points),
            num_coefficients: basis.num_functions(),
        }
    }

    /// Tensor-product spline surface sampled at `(x, y)` points.
    pub fn surface(basis: &TensorBSplineBasis, points: &[(f64, f64)]) -> Self {
        Self {
            basis_matrix: basis.basis_matrix(points),
            num_coefficients: basis.num_functions(),
        }
    }

    /// The basis matrix, one row per grid point.
    pub fn basis_matrix(&self) -> &Matrix {
        &self.basis_matrix
    }
}

impl VectorFunction for BasisSplineFunction {
    fn size_of_domain(&self) -> usize {
        self.num_coefficients
    }

    fn size_of_range(&self) -> usize {
        self.basis_matrix.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(mat_vec(&self.basis_matrix, x))
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        Ok(self.basis_matrix.clone())
    }
}
