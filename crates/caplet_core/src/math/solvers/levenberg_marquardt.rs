//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! Minimises `‖r(x)‖² + xᵀPx` over `x`, optionally restricted to a feasible
//! set. Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + P + λ·D) δ = −(Jᵀr + Px),    D = diag(JᵀJ + P)
//! ```
//!
//! and accepts `x + δ` only if it is feasible and lowers the objective;
//! otherwise `λ` grows and the step shortens towards steepest descent.

use tracing::trace;

use super::{all_finite, matrix_is_finite, starting_jacobian, NonLinearProblem};
use crate::math::linalg::{
    gram, mat_vec, quadratic_form, solve_cholesky, sum_of_squares, transpose_mat_vec,
    zeros, Matrix,
};
use crate::types::SolverError;

/// Configuration for Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LMConfig {
    /// Absolute tolerance on `sqrt(objective)`.
    pub tolerance: f64,
    /// Relative objective improvement below which an accepted step ends the solve.
    pub improvement_tolerance: f64,
    /// Relative step size below which the solve ends.
    pub param_tolerance: f64,
    /// Infinity norm of the gradient below which the solve ends.
    pub gradient_tolerance: f64,
    /// Maximum number of iterations, rejected steps included.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor; reaching it means no descent step exists.
    pub max_lambda: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            improvement_tolerance: 1e-12,
            param_tolerance: 1e-12,
            gradient_tolerance: 1e-15,
            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            improvement_tolerance: 1e-8,
            param_tolerance: 1e-8,
            max_iterations: 50,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            improvement_tolerance: 1e-15,
            param_tolerance: 1e-15,
            max_iterations: 1000,
            ..Default::default()
        }
    }
}

/// Result of Levenberg-Marquardt optimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final optimised parameters.
    pub params: Vec<f64>,
    /// Final objective `‖r‖² + xᵀPx`.
    pub residual_ss: f64,
    /// Penalty part of the objective.
    pub penalty: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Sum of squared residuals without the penalty term.
    pub fn chi_square(&self) -> f64 {
        self.residual_ss - self.penalty
    }

    /// Get the root mean square error of the residuals.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.chi_square().max(0.0) / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// # Example
///
/// ```
/// use caplet_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
///
/// // Fit y = a * exp(-b * x)
/// let x_data = [0.0, 1.0, 2.0, 3.0];
/// let y_data: Vec<f64> = x_data.iter().map(|x: &f64| 2.0 * (-0.5 * x).exp()).collect();
///
/// let solver = LevenbergMarquardtSolver::new(LMConfig::default());
/// let residuals = |p: &[f64]| -> Vec<f64> {
///     x_data.iter().zip(&y_data).map(|(&x, &y)| p[0] * (-p[1] * x).exp() - y).collect()
/// };
/// let result = solver.solve(residuals, vec![1.0, 1.0]).unwrap();
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// assert!((result.params[1] - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LMConfig::default())
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Minimise a residual closure, differentiating it by forward differences.
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let problem = ResidualFn {
            f: residuals,
            n: initial_params.len(),
        };
        self.minimise(&problem, initial_params)
    }

    /// Minimise `‖r(x)‖² + xᵀPx` for `problem` starting at `start`.
    ///
    /// # Errors
    ///
    /// * `SolverError::DimensionMismatch` - `start` or the penalty has the wrong size
    /// * `SolverError::InfeasibleStart` - `start` fails the feasibility predicate
    /// * `SolverError::SingularJacobian` - residuals or Jacobian are non-finite or
    ///   unavailable at `start`, or some parameter affects neither residuals nor penalty
    /// * `SolverError::MaxIterationsExceeded` - no convergence within the bound
    /// * any error returned by the problem's residual or Jacobian evaluation at
    ///   an accepted point
    pub fn minimise<P>(&self, problem: &P, start: Vec<f64>) -> Result<LMResult, P::Error>
    where
        P: NonLinearProblem + ?Sized,
    {
        let n = problem.num_parameters();
        if n == 0 {
            return Err(
                SolverError::NumericalInstability("Empty parameter vector".to_string()).into(),
            );
        }
        if start.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                got: start.len(),
            }
            .into());
        }
        let penalty = problem.penalty();
        if let Some(p) = penalty {
            if p.len() != n || p.iter().any(|row| row.len() != n) {
                return Err(SolverError::DimensionMismatch {
                    expected: n,
                    got: p.len(),
                }
                .into());
            }
        }
        if !problem.is_feasible(&start) {
            return Err(SolverError::InfeasibleStart.into());
        }

        let cfg = &self.config;
        let mut x = start;
        let mut r = problem.residuals(&x)?;
        if r.is_empty() {
            return Err(
                SolverError::NumericalInstability("Empty residual vector".to_string()).into(),
            );
        }
        if !all_finite(&r) {
            return Err(SolverError::singular("non-finite residuals at the starting point").into());
        }
        let jac = starting_jacobian(problem, &x)?;
        if !matrix_is_finite(&jac, r.len(), n) {
            return Err(SolverError::singular(
                "non-finite or mis-shaped Jacobian at the starting point",
            )
            .into());
        }

        let (mut a, mut g) = normal_equations(&jac, &r, &x, penalty);
        if let Some(i) = (0..n).find(|&i| !(a[i][i] > 0.0)) {
            return Err(SolverError::singular(format!(
                "parameter {i} affects neither the residuals nor the penalty"
            ))
            .into());
        }

        let mut pen = penalty.map_or(0.0, |p| quadratic_form(p, &x));
        let mut objective = sum_of_squares(&r) + pen;
        let mut lambda = cfg.initial_lambda;

        for iteration in 0..cfg.max_iterations {
            trace!(iteration, objective, lambda, "levenberg-marquardt iteration");

            let grad_norm = g.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            if objective.sqrt() < cfg.tolerance || grad_norm < cfg.gradient_tolerance {
                return Ok(self.finish(x, objective, pen, iteration, lambda));
            }

            let max_diag = (0..n).map(|i| a[i][i]).fold(0.0_f64, f64::max);
            let mut damped = a.clone();
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += lambda * a[i][i].max(1e-12 * max_diag);
            }
            let neg_g: Vec<f64> = g.iter().map(|v| -v).collect();

            let delta = match solve_cholesky(&damped, &neg_g) {
                Some(d) if all_finite(&d) => d,
                _ => {
                    lambda = (lambda * cfg.lambda_up).min(cfg.max_lambda);
                    continue;
                }
            };

            let step = sum_of_squares(&delta).sqrt();
            let scale = sum_of_squares(&x).sqrt().max(1.0);
            if step / scale < cfg.param_tolerance {
                return Ok(self.finish(x, objective, pen, iteration, lambda));
            }

            let trial: Vec<f64> = x.iter().zip(&delta).map(|(p, d)| p + d).collect();
            let trial_eval = if problem.is_feasible(&trial) {
                problem.residuals(&trial).ok().filter(|tr| all_finite(tr))
            } else {
                None
            };

            let accepted = trial_eval.and_then(|tr| {
                let trial_pen = penalty.map_or(0.0, |p| quadratic_form(p, &trial));
                let trial_objective = sum_of_squares(&tr) + trial_pen;
                (trial_objective < objective).then_some((tr, trial_pen, trial_objective))
            });

            match accepted {
                Some((tr, trial_pen, trial_objective)) => {
                    let improvement = objective - trial_objective;
                    x = trial;
                    r = tr;
                    pen = trial_pen;
                    objective = trial_objective;
                    let jac = problem.jacobian(&x)?;
                    (a, g) = normal_equations(&jac, &r, &x, penalty);
                    lambda = (lambda * cfg.lambda_down).max(cfg.min_lambda);
                    if improvement <= cfg.improvement_tolerance * objective {
                        return Ok(self.finish(x, objective, pen, iteration + 1, lambda));
                    }
                }
                None => {
                    if lambda >= cfg.max_lambda {
                        // No descent direction left at machine precision
                        return Ok(self.finish(x, objective, pen, iteration + 1, lambda));
                    }
                    lambda = (lambda * cfg.lambda_up).min(cfg.max_lambda);
                }
            }
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: cfg.max_iterations,
            residual_ss: objective,
        }
        .into())
    }

    fn finish(
        &self,
        params: Vec<f64>,
        objective: f64,
        penalty: f64,
        iterations: usize,
        lambda: f64,
    ) -> LMResult {
        LMResult {
            params,
            residual_ss: objective,
            penalty,
            iterations,
            final_lambda: lambda,
        }
    }
}

/// `(JᵀJ + P, Jᵀr + Px)`
fn normal_equations(
    jac: &[Vec<f64>],
    r: &[f64],
    x: &[f64],
    penalty: Option<&Matrix>,
) -> (Matrix, Vec<f64>) {
    let mut a = gram(jac);
    let mut g = transpose_mat_vec(jac, r);
    if a.is_empty() {
        a = zeros(x.len(), x.len());
    }
    if let Some(p) = penalty {
        for (arow, prow) in a.iter_mut().zip(p) {
            for (aij, pij) in arow.iter_mut().zip(prow) {
                *aij += pij;
            }
        }
        for (gi, pxi) in g.iter_mut().zip(mat_vec(p, x)) {
            *gi += pxi;
        }
    }
    (a, g)
}

/// Closure residuals with a forward-difference Jacobian.
struct ResidualFn<F> {
    f: F,
    n: usize,
}

impl<F> NonLinearProblem for ResidualFn<F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    type Error = SolverError;

    fn num_parameters(&self) -> usize {
        self.n
    }

    fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, SolverError> {
        Ok((self.f)(params))
    }

    fn jacobian(&self, params: &[f64]) -> Result<Matrix, SolverError> {
        let r0 = (self.f)(params);
        let mut jac = zeros(r0.len(), params.len());
        let mut bumped = params.to_vec();
        for j in 0..params.len() {
            let h = 1e-8 * params[j].abs().max(1.0);
            bumped[j] = params[j] + h;
            let r_plus = (self.f)(&bumped);
            bumped[j] = params[j];
            for (row, (rp, r)) in jac.iter_mut().zip(r_plus.iter().zip(&r0)) {
                row[j] = (rp - r) / h;
            }
        }
        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Linear least squares `A x ≈ b` with analytic Jacobian.
    struct LinearProblem {
        a: Matrix,
        b: Vec<f64>,
        penalty: Option<Matrix>,
        lower_bound: Option<f64>,
    }

    impl NonLinearProblem for LinearProblem {
        type Error = SolverError;

        fn num_parameters(&self) -> usize {
            self.a[0].len()
        }

        fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, SolverError> {
            Ok(mat_vec(&self.a, params)
                .iter()
                .zip(&self.b)
                .map(|(ax, b)| ax - b)
                .collect())
        }

        fn jacobian(&self, _params: &[f64]) -> Result<Matrix, SolverError> {
            Ok(self.a.clone())
        }

        fn penalty(&self) -> Option<&Matrix> {
            self.penalty.as_ref()
        }

        fn is_feasible(&self, params: &[f64]) -> bool {
            self.lower_bound
                .map_or(true, |lb| params.iter().all(|&p| p >= lb))
        }
    }

    fn problem(a: Matrix, b: Vec<f64>) -> LinearProblem {
        LinearProblem {
            a,
            b,
            penalty: None,
            lower_bound: None,
        }
    }

    // ========================================
    // LMConfig Tests
    // ========================================

    #[test]
    fn test_config_presets() {
        assert!(LMConfig::fast().tolerance > LMConfig::default().tolerance);
        assert!(LMConfig::high_precision().max_iterations >= 500);
        let config = LMConfig::new(1e-8, 50);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn test_result_rmse() {
        let result = LMResult {
            params: vec![1.0],
            residual_ss: 5.0,
            penalty: 1.0,
            iterations: 10,
            final_lambda: 1e-5,
        };
        assert_relative_eq!(result.chi_square(), 4.0);
        assert_relative_eq!(result.rmse(4), 1.0);
        assert_eq!(result.rmse(0), 0.0);
    }

    // ========================================
    // Closure Interface Tests
    // ========================================

    #[test]
    fn test_solve_simple_linear() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] - 2.0, p[1] - 3.0] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![0.0, 0.0])
            .unwrap();
        assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_rosenbrock() {
        let residuals =
            |p: &[f64]| -> Vec<f64> { vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]] };
        let result = LevenbergMarquardtSolver::with_defaults()
            .solve(residuals, vec![-1.2, 1.0])
            .unwrap();
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_solve_empty_params() {
        let result = LevenbergMarquardtSolver::with_defaults().solve(|_p| vec![1.0], vec![]);
        assert!(result.is_err());
    }

    // ========================================
    // Problem Interface Tests
    // ========================================

    #[test]
    fn test_overdetermined_linear_fit() {
        // y = 1 + 2t fitted through 4 exact points
        let ts = [0.0, 1.0, 2.0, 3.0];
        let a: Matrix = ts.iter().map(|&t| vec![1.0, t]).collect();
        let b: Vec<f64> = ts.iter().map(|t| 1.0 + 2.0 * t).collect();
        let result = LevenbergMarquardtSolver::with_defaults()
            .minimise(&problem(a, b), vec![0.0, 0.0])
            .unwrap();
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(result.params[1], 2.0, epsilon = 1e-8);
        assert!(result.chi_square() < 1e-16);
    }

    #[test]
    fn test_penalty_shrinks_solution() {
        // Minimise (x - 1)² + λx²  =>  x = 1 / (1 + λ)
        let mut p = problem(vec![vec![1.0]], vec![1.0]);
        p.penalty = Some(vec![vec![3.0]]);
        let result = LevenbergMarquardtSolver::with_defaults()
            .minimise(&p, vec![0.0])
            .unwrap();
        assert_relative_eq!(result.params[0], 0.25, epsilon = 1e-8);
        assert_relative_eq!(result.penalty, 3.0 * 0.0625, epsilon = 1e-8);
        assert_relative_eq!(result.chi_square(), 0.5625, epsilon = 1e-8);
    }

    #[test]
    fn test_constraint_keeps_iterates_feasible() {
        // Unconstrained optimum at x = -1; feasible set x >= 0
        let mut p = problem(vec![vec![1.0]], vec![-1.0]);
        p.lower_bound = Some(0.0);
        let config = LMConfig {
            max_iterations: 2000,
            ..Default::default()
        };
        let result = LevenbergMarquardtSolver::new(config)
            .minimise(&p, vec![2.0])
            .unwrap();
        assert!(result.params[0] >= 0.0);
        assert!(result.params[0] < 1e-3);
    }

    #[test]
    fn test_infeasible_start() {
        let mut p = problem(vec![vec![1.0]], vec![1.0]);
        p.lower_bound = Some(0.0);
        let err = LevenbergMarquardtSolver::with_defaults()
            .minimise(&p, vec![-1.0])
            .unwrap_err();
        assert_eq!(err, SolverError::InfeasibleStart);
    }

    #[test]
    fn test_singular_start_zero_column() {
        // Second parameter never enters the residuals and is not penalised
        let p = problem(vec![vec![1.0, 0.0], vec![2.0, 0.0]], vec![1.0, 2.0]);
        let err = LevenbergMarquardtSolver::with_defaults()
            .minimise(&p, vec![0.0, 0.0])
            .unwrap_err();
        assert!(err.is_singular_start());
    }

    /// Residuals are fine but the Jacobian cannot be formed at zero.
    struct VanishingSlope;

    impl NonLinearProblem for VanishingSlope {
        type Error = SolverError;

        fn num_parameters(&self) -> usize {
            1
        }

        fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, SolverError> {
            Ok(vec![params[0] - 1.0])
        }

        fn jacobian(&self, params: &[f64]) -> Result<Matrix, SolverError> {
            if params[0] == 0.0 {
                return Err(SolverError::NumericalInstability("zero slope".to_string()));
            }
            Ok(vec![vec![1.0]])
        }
    }

    #[test]
    fn test_singular_start_when_jacobian_fails() {
        let err = LevenbergMarquardtSolver::with_defaults()
            .minimise(&VanishingSlope, vec![0.0])
            .unwrap_err();
        assert!(err.is_singular_start());
        assert!(err.to_string().contains("zero slope"));

        let result = LevenbergMarquardtSolver::with_defaults()
            .minimise(&VanishingSlope, vec![0.5])
            .unwrap();
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_penalty_regularises_zero_column() {
        let mut p = problem(vec![vec![1.0, 0.0], vec![2.0, 0.0]], vec![1.0, 2.0]);
        p.penalty = Some(vec![vec![0.0, 0.0], vec![0.0, 1.0]]);
        let result = LevenbergMarquardtSolver::with_defaults()
            .minimise(&p, vec![0.0, 1.0])
            .unwrap();
        assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(result.params[1], 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_max_iterations_is_distinct_error() {
        let residuals =
            |p: &[f64]| -> Vec<f64> { vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]] };
        let solver = LevenbergMarquardtSolver::new(LMConfig::new(1e-14, 2));
        let err = solver.solve(residuals, vec![-1.2, 1.0]).unwrap_err();
        assert!(err.is_not_converged());
    }

    #[test]
    fn test_dimension_mismatch() {
        let p = problem(vec![vec![1.0, 0.0]], vec![1.0]);
        let err = LevenbergMarquardtSolver::with_defaults()
            .minimise(&p, vec![0.0])
            .unwrap_err();
        assert_eq!(err, SolverError::DimensionMismatch { expected: 2, got: 1 });
    }
}
