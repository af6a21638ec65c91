//! Discrete volatility functions: model parameters to caplet volatilities.
//!
//! A [`DiscreteVolatilityFunctionProvider`] describes a parameterisation of
//! the caplet volatility surface. Given an [`EvaluationGrid`] it produces a
//! [`DiscreteVolatilityFunction`], a [`VectorFunction`] from the model
//! parameters to one volatility per grid point, with its Jacobian.
//!
//! ## Providers
//!
//! | Provider | Parameters |
//! |----------|------------|
//! | [`DirectVolatilityProvider`] | the caplet volatilities themselves |
//! | [`InterpolatedTermStructureProvider`] | volatilities at expiry knots |
//! | [`TransformedVolatilityProvider`] | any provider's parameters through `exp` |
//! | [`InterpolatedSurfaceProvider`] | parameters of a continuous surface model |
//! | [`PSplineProvider`] | B-spline coefficients in expiry (and strike) |
//! | [`SmileModelVolatilityProvider`] | smile parameters mapped per expiry |

pub mod direct;
pub mod grid;
pub mod pspline;
pub mod smile;
pub mod surface;
pub mod term_structure;
pub mod transformed;

pub use direct::DirectVolatilityProvider;
pub use grid::EvaluationGrid;
pub use pspline::PSplineProvider;
pub use smile::{SmileModelVolatilityProvider, SmileParameterCurve, SmileParameterTermStructure};
pub use surface::{InterpolatedSurfaceProvider, InterpolatedVolatilitySurface, VolatilitySurfaceModel};
pub use term_structure::InterpolatedTermStructureProvider;
pub use transformed::TransformedVolatilityProvider;

use std::fmt;
use std::sync::Arc;

use caplet_core::math::functions::VectorFunction;
use caplet_core::math::linalg::Matrix;
use caplet_core::types::{FunctionError, ValidationError};

use crate::error::StrippingError;

/// Parameters to caplet volatilities at a fixed grid.
///
/// The grid is fixed for the function's lifetime; the range size is the
/// number of grid points.
#[derive(Debug, Clone)]
pub struct DiscreteVolatilityFunction {
    grid: EvaluationGrid,
    function: Arc<dyn VectorFunction>,
}

impl DiscreteVolatilityFunction {
    /// Attach `function` to `grid`.
    ///
    /// # Errors
    ///
    /// `ValidationError::LengthMismatch` if the function's range differs from the grid size.
    pub fn new(grid: EvaluationGrid, function: Arc<dyn VectorFunction>) -> Result<Self, ValidationError> {
        if function.size_of_range() != grid.len() {
            return Err(ValidationError::length_mismatch(
                "volatility function range",
                grid.len(),
                function.size_of_range(),
            ));
        }
        Ok(Self { grid, function })
    }

    /// The evaluation grid.
    pub fn grid(&self) -> &EvaluationGrid {
        &self.grid
    }

    /// Number of model parameters.
    pub fn num_parameters(&self) -> usize {
        self.function.size_of_domain()
    }
}

impl VectorFunction for DiscreteVolatilityFunction {
    fn size_of_domain(&self) -> usize {
        self.function.size_of_domain()
    }

    fn size_of_range(&self) -> usize {
        self.grid.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.function.evaluate(x)
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.function.evaluate_jacobian(x)
    }
}

/// A caplet volatility parameterisation.
pub trait DiscreteVolatilityFunctionProvider: Send + Sync + fmt::Debug {
    /// The volatility function at `grid`.
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError>;
}

/// Builds a vector function sampled at a set of points, e.g. smile
/// parameters as functions of expiry.
pub trait VectorFunctionProvider: Send + Sync + fmt::Debug {
    /// The function sampled at `points`.
    fn from_points(&self, points: &[f64]) -> Result<Arc<dyn VectorFunction>, StrippingError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use caplet_core::math::functions::{finite_difference_jacobian, VectorFunction};

    /// Assert the analytic Jacobian agrees with central differences at `x`.
    pub fn assert_jacobian_consistent<F: VectorFunction + ?Sized>(f: &F, x: &[f64], tol: f64) {
        let analytic = f.evaluate_jacobian(x).unwrap();
        let numeric = finite_difference_jacobian(f, x, 1e-6).unwrap();
        assert_eq!(analytic.len(), numeric.len());
        for (i, (a, n)) in analytic.iter().zip(&numeric).enumerate() {
            assert_eq!(a.len(), n.len());
            for (j, (av, nv)) in a.iter().zip(n).enumerate() {
                assert!(
                    (av - nv).abs() <= tol * nv.abs().max(1.0),
                    "J[{i}][{j}]: analytic {av} vs numeric {nv}"
                );
            }
        }
    }
}
