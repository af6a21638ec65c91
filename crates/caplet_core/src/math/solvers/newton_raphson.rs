//! Newton-Raphson root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;

/// Newton-Raphson root finder with an explicit derivative.
///
/// # Example
///
/// ```
/// use caplet_core::math::solvers::NewtonRaphsonSolver;
///
/// let solver = NewtonRaphsonSolver::with_defaults();
/// let root = solver.find_root(|x| x * x - 2.0, |x| 2.0 * x, 1.0).unwrap();
/// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct NewtonRaphsonSolver {
    config: SolverConfig,
}

impl NewtonRaphsonSolver {
    /// Create a new Newton-Raphson solver.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    /// Returns a reference to the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find a root of `f` starting from `x0`.
    ///
    /// # Errors
    ///
    /// * `SolverError::DerivativeNearZero` - `|f'(x)| < 1e-30`
    /// * `SolverError::NumericalInstability` - Iterate became non-finite
    /// * `SolverError::MaxIterationsExceeded` - Failed to converge
    pub fn find_root<F, G>(&self, f: F, f_prime: G, x0: f64) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
        G: Fn(f64) -> f64,
    {
        let mut x = x0;
        let mut f_val = f(x);

        for _iteration in 0..self.config.max_iterations {
            if f_val.abs() < self.config.tolerance {
                return Ok(x);
            }

            let f_prime_val = f_prime(x);
            if f_prime_val.abs() < 1e-30 || !f_prime_val.is_finite() {
                return Err(SolverError::DerivativeNearZero { x });
            }

            x -= f_val / f_prime_val;
            if !x.is_finite() {
                return Err(SolverError::NumericalInstability(
                    "Newton iteration produced non-finite value".to_string(),
                ));
            }
            f_val = f(x);
        }

        if f_val.abs() < self.config.tolerance {
            return Ok(x);
        }
        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
            residual_ss: f_val * f_val,
        })
    }
}
