//! Brent's method root-finding solver.

use super::SolverConfig;
use crate::types::SolverError;

/// Brent's method root finder.
///
/// Combines bisection, secant and inverse quadratic interpolation. Converges
/// for any continuous function given a valid bracket.
///
/// # Example
///
/// ```
/// use caplet_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
///
/// // Solve x³ - x - 2 = 0 in bracket [1, 2]
/// let f = |x: f64| x * x * x - x - 2.0;
///
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!(f(root).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct BrentSolver {
    config: SolverConfig,
}

impl BrentSolver {
    /// Create a new Brent solver with the given configuration.
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

    /// Find a root of `f` in the bracket `[a, b]`.
    ///
    /// # Errors
    ///
    /// * `SolverError::NoBracket` - `f(a)` and `f(b)` have the same sign
    /// * `SolverError::MaxIterationsExceeded` - Failed to converge
    pub fn find_root<F>(&self, f: F, a: f64, b: f64) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
    {
        let (mut a, mut b) = (a, b);
        let (mut fa, mut fb) = (f(a), f(b));

        if fa == 0.0 {
            return Ok(a);
        }
        if fb == 0.0 {
            return Ok(b);
        }
        if fa * fb > 0.0 || !(fa.is_finite() && fb.is_finite()) {
            return Err(SolverError::NoBracket { a, b });
        }

        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for _iteration in 0..self.config.max_iterations {
            // Keep the root between b and c
            if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            // b is the best estimate so far
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * self.config.tolerance;
            let m = 0.5 * (c - b);
            if m.abs() <= tol || fb.abs() < self.config.tolerance {
                return Ok(b);
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    // Secant
                    (2.0 * m * s, 1.0 - s)
                } else {
                    // Inverse quadratic interpolation
                    let q = fa / fc;
                    let r = fb / fc;
                    (
                        s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                        (q - 1.0) * (r - 1.0) * (s - 1.0),
                    )
                };
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                    e = d;
                    d = p / q;
                } else {
                    d = m;
                    e = m;
                }
            } else {
                d = m;
                e = m;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol { d } else { tol.copysign(m) };
            fb = f(b);
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
            residual_ss: fb * fb,
        })
    }
}
