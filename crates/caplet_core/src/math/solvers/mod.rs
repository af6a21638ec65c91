//! Root-finding and optimisation solvers.
//!
//! ## Available Solvers
//!
//! ### Scalar Root-Finding
//!
//! - [`NewtonRaphsonSolver`]: Fast quadratic convergence using derivatives
//! - [`BrentSolver`]: Robust bracketing method without derivative requirement
//!
//! ### Vector Problems
//!
//! - [`LevenbergMarquardtSolver`]: Penalised, constrained nonlinear least squares
//! - [`NewtonVectorRootFinder`]: Square systems driven to an exact zero
//!
//! Both vector solvers consume a [`NonLinearProblem`], which supplies
//! residuals and their analytic Jacobian and optionally a quadratic
//! penalty matrix and a feasibility predicate.
//!
//! ## Failure Modes
//!
//! The vector solvers distinguish:
//! - `SolverError::SingularJacobian`: the linearisation at the start is degenerate
//! - `SolverError::InfeasibleStart`: the start violates the feasibility predicate
//! - `SolverError::MaxIterationsExceeded`: the iteration bound was hit
//!
//! ## Example
//!
//! ```
//! use caplet_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//!
//! // Minimize (p[0] - 2)² + (p[1] - 3)²
//! let residuals = |params: &[f64]| -> Vec<f64> {
//!     vec![params[0] - 2.0, params[1] - 3.0]
//! };
//!
//! let solver = LevenbergMarquardtSolver::with_defaults();
//! let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! ```

mod brent;
mod config;
mod levenberg_marquardt;
mod newton_raphson;
mod newton_vector;

pub use brent::BrentSolver;
pub use config::SolverConfig;
pub use levenberg_marquardt::{LMConfig, LMResult, LevenbergMarquardtSolver};
pub use newton_raphson::NewtonRaphsonSolver;
pub use newton_vector::{NewtonConfig, NewtonVectorRootFinder, RootFindResult};

use crate::math::linalg::Matrix;
use crate::types::SolverError;

/// A residual vector with an analytic Jacobian.
///
/// The objective minimised by [`LevenbergMarquardtSolver`] is
/// `‖r(x)‖² + xᵀPx`, where `P` is [`penalty`](Self::penalty) (zero if absent).
pub trait NonLinearProblem {
    /// Error type of the residual evaluation.
    type Error: From<SolverError> + std::fmt::Display;

    /// Number of parameters.
    fn num_parameters(&self) -> usize;

    /// Residual vector at `params`.
    fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, Self::Error>;

    /// Jacobian of the residuals at `params`, `num_residuals × num_parameters`.
    fn jacobian(&self, params: &[f64]) -> Result<Matrix, Self::Error>;

    /// Symmetric positive semi-definite penalty matrix.
    fn penalty(&self) -> Option<&Matrix> {
        None
    }

    /// Whether `params` is acceptable. Trial steps failing this are rejected.
    fn is_feasible(&self, _params: &[f64]) -> bool {
        true
    }
}

/// Jacobian at the starting point. Failing to produce one there is a
/// degenerate linearisation.
pub(crate) fn starting_jacobian<P>(problem: &P, start: &[f64]) -> Result<Matrix, P::Error>
where
    P: NonLinearProblem + ?Sized,
{
    problem.jacobian(start).map_err(|err| {
        SolverError::singular(format!("no Jacobian at the starting point: {err}")).into()
    })
}

pub(crate) fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

pub(crate) fn matrix_is_finite(m: &[Vec<f64>], rows: usize, cols: usize) -> bool {
    m.len() == rows && m.iter().all(|row| row.len() == cols && all_finite(row))
}
