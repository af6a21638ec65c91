//! Newton's method for square nonlinear systems `r(x) = 0`.
//!
//! Each step solves `J δ = −r` by LU decomposition and halves the step until
//! the residual norm decreases and the trial point is feasible.

use tracing::trace;

use super::{all_finite, matrix_is_finite, starting_jacobian, NonLinearProblem};
use crate::math::linalg::{solve_lu, sum_of_squares};
use crate::types::SolverError;

/// Configuration for [`NewtonVectorRootFinder`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NewtonConfig {
    /// Infinity-norm tolerance on the residuals.
    pub tolerance: f64,
    /// Relative step size below which iteration stops.
    pub step_tolerance: f64,
    /// Maximum number of Newton steps.
    pub max_iterations: usize,
    /// Maximum number of step halvings per iteration.
    pub max_backtracks: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            step_tolerance: 1e-12,
            max_iterations: 100,
            max_backtracks: 30,
        }
    }
}

/// Result of a vector root find.
#[derive(Debug, Clone, PartialEq)]
pub struct RootFindResult {
    /// Root.
    pub params: Vec<f64>,
    /// Infinity norm of the residuals at the root.
    pub residual_norm: f64,
    /// Number of Newton steps taken.
    pub iterations: usize,
}

/// Damped Newton solver for square systems.
///
/// # Example
///
/// ```
/// use caplet_core::math::linalg::Matrix;
/// use caplet_core::math::solvers::{NewtonVectorRootFinder, NonLinearProblem};
/// use caplet_core::types::SolverError;
///
/// // x² = 4, x·y = 6
/// struct System;
///
/// impl NonLinearProblem for System {
///     type Error = SolverError;
///     fn num_parameters(&self) -> usize { 2 }
///     fn residuals(&self, p: &[f64]) -> Result<Vec<f64>, SolverError> {
///         Ok(vec![p[0] * p[0] - 4.0, p[0] * p[1] - 6.0])
///     }
///     fn jacobian(&self, p: &[f64]) -> Result<Matrix, SolverError> {
///         Ok(vec![vec![2.0 * p[0], 0.0], vec![p[1], p[0]]])
///     }
/// }
///
/// let root = NewtonVectorRootFinder::with_defaults()
///     .find_root(&System, vec![1.0, 1.0])
///     .unwrap();
/// assert!((root.params[0] - 2.0).abs() < 1e-10);
/// assert!((root.params[1] - 3.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewtonVectorRootFinder {
    config: NewtonConfig,
}

impl NewtonVectorRootFinder {
    /// Create a root finder with the given configuration.
    pub fn new(config: NewtonConfig) -> Self {
        Self { config }
    }

    /// Create a root finder with default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Get the configuration.
    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    /// Drive the residuals of a square `problem` to zero from `start`.
    ///
    /// Any penalty supplied by the problem is ignored.
    ///
    /// # Errors
    ///
    /// * `SolverError::DimensionMismatch` - the system is not square or `start`
    ///   has the wrong length
    /// * `SolverError::InfeasibleStart` - `start` fails the feasibility predicate
    /// * `SolverError::SingularJacobian` - the Jacobian at `start` is singular,
    ///   non-finite or unavailable
    /// * `SolverError::NumericalInstability` - no step along the Newton
    ///   direction reduced the residuals
    /// * `SolverError::MaxIterationsExceeded` - no convergence within the bound
    pub fn find_root<P>(&self, problem: &P, start: Vec<f64>) -> Result<RootFindResult, P::Error>
    where
        P: NonLinearProblem + ?Sized,
    {
        let n = problem.num_parameters();
        if start.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: start.len(),
            }
            .into());
        }
        if n == 0 {
            return Err(
                SolverError::NumericalInstability("Empty parameter vector".to_string()).into(),
            );
        }
        if !problem.is_feasible(&start) {
            return Err(SolverError::InfeasibleStart.into());
        }

        let cfg = &self.config;
        let mut x = start;
        let mut r = problem.residuals(&x)?;
        if r.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: r.len(),
            }
            .into());
        }
        if !all_finite(&r) {
            return Err(SolverError::singular("non-finite residuals at the starting point").into());
        }

        for iteration in 0..cfg.max_iterations {
            let norm = inf_norm(&r);
            trace!(iteration, residual_norm = norm, "newton iteration");
            if norm < cfg.tolerance {
                return Ok(RootFindResult {
                    params: x,
                    residual_norm: norm,
                    iterations: iteration,
                });
            }

            let jac = if iteration == 0 {
                starting_jacobian(problem, &x)?
            } else {
                problem.jacobian(&x)?
            };
            let neg_r: Vec<f64> = r.iter().map(|v| -v).collect();
            let delta = if matrix_is_finite(&jac, n, n) {
                solve_lu(&jac, &neg_r)
            } else {
                None
            };
            let delta = match delta {
                Some(d) => d,
                None if iteration == 0 => {
                    return Err(SolverError::singular("Jacobian is singular at the starting point")
                        .into());
                }
                None => {
                    return Err(SolverError::NumericalInstability(format!(
                        "Jacobian became singular at iteration {iteration}"
                    ))
                    .into());
                }
            };

            let current = sum_of_squares(&r);
            let mut t = 1.0;
            let mut accepted = None;
            for _ in 0..=cfg.max_backtracks {
                let trial: Vec<f64> = x.iter().zip(&delta).map(|(p, d)| p + t * d).collect();
                if problem.is_feasible(&trial) {
                    if let Ok(tr) = problem.residuals(&trial) {
                        if all_finite(&tr) && sum_of_squares(&tr) < current {
                            accepted = Some((trial, tr));
                            break;
                        }
                    }
                }
                t *= 0.5;
            }

            let Some((trial, tr)) = accepted else {
                return Err(SolverError::NumericalInstability(format!(
                    "line search failed at iteration {iteration} (residual norm {norm:.3e})"
                ))
                .into());
            };

            let step = t * sum_of_squares(&delta).sqrt();
            let scale = sum_of_squares(&x).sqrt().max(1.0);
            x = trial;
            r = tr;
            if step / scale < cfg.step_tolerance {
                return Ok(RootFindResult {
                    residual_norm: inf_norm(&r),
                    params: x,
                    iterations: iteration + 1,
                });
            }
        }

        let norm = inf_norm(&r);
        if norm < cfg.tolerance {
            return Ok(RootFindResult {
                params: x,
                residual_norm: norm,
                iterations: cfg.max_iterations,
            });
        }
        Err(SolverError::MaxIterationsExceeded {
            iterations: cfg.max_iterations,
            residual_ss: sum_of_squares(&r),
        }
        .into())
    }
}

fn inf_norm(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}
