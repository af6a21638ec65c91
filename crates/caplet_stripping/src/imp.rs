//! The calibration engine shared by every stripping strategy.
//!
//! [`CapletStrippingImp`] chains a [`DiscreteVolatilityFunction`] (model
//! parameters to caplet volatilities) with a [`MultiCapFloorPricer`] (caplet
//! volatilities to cap prices or cap-implied volatilities) and fits the model
//! parameters to market data:
//!
//! ```text
//! minimise  Σᵢ ((model(x)ᵢ − marketᵢ) / errorᵢ)²  +  xᵀPx   subject to  feasible(x)
//! ```
//!
//! The Jacobian is assembled analytically by the chain rule,
//! `∂(cap)/∂x = ∂(cap)/∂σ · ∂σ/∂x`, from the pricer's caplet vegas and the
//! volatility function's Jacobian.
//!
//! Square problems (one parameter per cap, no penalty) may instead be solved
//! by driving the residuals to zero with a damped Newton iteration.

use std::fmt;
use std::sync::Arc;

use caplet_core::math::functions::VectorFunction;
use caplet_core::math::linalg::{mat_mul, Matrix};
use caplet_core::math::solvers::{
    LMConfig, LevenbergMarquardtSolver, NewtonConfig, NewtonVectorRootFinder, NonLinearProblem,
};
use caplet_core::types::ValidationError;
use caplet_core::validation::{ensure_length, ensure_positive};
use tracing::{debug, info, warn};

use crate::error::StrippingError;
use crate::pricer::MultiCapFloorPricer;
use crate::result::CapletStrippingResult;
use crate::vol_function::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider};

/// Whether market values are cap prices or cap-implied volatilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MarketDataType {
    /// Cap (or floor) present values.
    Price,
    /// Flat cap-implied Black volatilities.
    Vol,
}

impl fmt::Display for MarketDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price => write!(f, "price"),
            Self::Vol => write!(f, "vol"),
        }
    }
}

/// Feasibility predicate on the model parameters.
///
/// Trial steps that violate the constraint are rejected by the optimiser; a
/// starting point that violates it is an error.
#[derive(Clone)]
pub enum Constraint {
    /// Every caplet volatility produced by the parameters is non-negative.
    NonNegativeVolatilities,
    /// Arbitrary predicate on the parameter vector.
    Custom(Arc<dyn Fn(&[f64]) -> bool + Send + Sync>),
}

impl Constraint {
    /// Wrap a closure as a constraint.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&[f64]) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether `params` satisfies the constraint under `vol_function`.
    pub fn is_satisfied(&self, vol_function: &DiscreteVolatilityFunction, params: &[f64]) -> bool {
        match self {
            Self::NonNegativeVolatilities => vol_function
                .evaluate(params)
                .map_or(false, |vols| vols.iter().all(|&v| v >= 0.0)),
            Self::Custom(predicate) => predicate(params),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonNegativeVolatilities => write!(f, "NonNegativeVolatilities"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Fits a volatility parameterisation to a batch of cap quotes.
///
/// Immutable after construction; one engine may serve many solves with
/// different market data.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::instruments::{CapFloor, IborIndex};
/// use caplet_models::market_data::{FlatCurve, MultiCurve};
/// use caplet_stripping::{CapletStrippingImp, DirectVolatilityProvider, MultiCapFloorPricer};
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
/// let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
/// let caps = [1.0, 1.5, 2.0]
///     .iter()
///     .map(|&end| CapFloor::from_schedule(index.clone(), 0.03, true, 0.5, end, &curves).unwrap())
///     .collect();
/// let pricer = Arc::new(MultiCapFloorPricer::new(caps).unwrap());
/// let imp = CapletStrippingImp::new(pricer, &DirectVolatilityProvider::new()).unwrap();
///
/// let market_vols = [0.22, 0.24, 0.25];
/// let result = imp.solve_for_cap_vols(&market_vols, None, &[0.2; 3]).unwrap();
/// let model_vols = result.model_cap_vols().unwrap();
/// for (m, v) in model_vols.iter().zip(&market_vols) {
///     assert!((m - v).abs() < 1e-8);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CapletStrippingImp {
    pricer: Arc<MultiCapFloorPricer>,
    vol_function: Arc<DiscreteVolatilityFunction>,
    lm_config: LMConfig,
    newton_config: NewtonConfig,
}

impl CapletStrippingImp {
    /// Build the engine, evaluating `provider` at the pricer's caplet grid.
    pub fn new(
        pricer: Arc<MultiCapFloorPricer>,
        provider: &dyn DiscreteVolatilityFunctionProvider,
    ) -> Result<Self, StrippingError> {
        let vol_function = provider.from_grid(pricer.expiry_strike_grid())?;
        Ok(Self {
            pricer,
            vol_function: Arc::new(vol_function),
            lm_config: LMConfig::default(),
            newton_config: NewtonConfig::default(),
        })
    }

    /// Replace the least-squares configuration.
    pub fn with_lm_config(mut self, config: LMConfig) -> Self {
        self.lm_config = config;
        self
    }

    /// Replace the root-finder configuration.
    pub fn with_newton_config(mut self, config: NewtonConfig) -> Self {
        self.newton_config = config;
        self
    }

    /// Number of caps.
    pub fn num_caps(&self) -> usize {
        self.pricer.num_caps()
    }

    /// Number of model parameters.
    pub fn num_model_parameters(&self) -> usize {
        self.vol_function.num_parameters()
    }

    /// The pricer.
    pub fn pricer(&self) -> &Arc<MultiCapFloorPricer> {
        &self.pricer
    }

    /// The volatility function at the pricer's caplet grid.
    pub fn vol_function(&self) -> &Arc<DiscreteVolatilityFunction> {
        &self.vol_function
    }

    // ------------------------------------------------------------------
    // Model functions
    // ------------------------------------------------------------------

    /// Cap prices produced by the model parameters.
    pub fn cap_prices(&self, params: &[f64]) -> Result<Vec<f64>, StrippingError> {
        let vols = self.vol_function.evaluate(params)?;
        self.pricer.price(&vols)
    }

    /// `∂(cap price)/∂(params)`, `num_caps × num_model_parameters`.
    pub fn cap_price_jacobian(&self, params: &[f64]) -> Result<Matrix, StrippingError> {
        let vols = self.vol_function.evaluate(params)?;
        let vega = self.pricer.vega_from_caplet_vols(&vols)?;
        let vol_jac = self.vol_function.evaluate_jacobian(params)?;
        Ok(mat_mul(&vega, &vol_jac))
    }

    /// Cap-implied volatilities produced by the model parameters.
    pub fn cap_vols(&self, params: &[f64]) -> Result<Vec<f64>, StrippingError> {
        let vols = self.vol_function.evaluate(params)?;
        self.pricer.cap_vols_from_caplet_vols(&vols)
    }

    /// `∂(cap vol)/∂(params)`, `num_caps × num_model_parameters`.
    pub fn cap_vol_jacobian(&self, params: &[f64]) -> Result<Matrix, StrippingError> {
        let vols = self.vol_function.evaluate(params)?;
        let vol_vega = self.pricer.cap_vol_vega(&vols)?;
        let vol_jac = self.vol_function.evaluate_jacobian(params)?;
        Ok(mat_mul(&vol_vega, &vol_jac))
    }

    // ------------------------------------------------------------------
    // Solves
    // ------------------------------------------------------------------

    /// Fit to cap prices, trying a root find first when the problem is square.
    ///
    /// A numerical failure of the root find is logged and followed by least
    /// squares; invalid inputs are returned as errors straight away.
    pub fn solve_for_cap_prices(
        &self,
        prices: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.solve(MarketDataType::Price, prices, errors, start)
    }

    /// Fit to cap vols, trying a root find first when the problem is square.
    pub fn solve_for_cap_vols(
        &self,
        vols: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.solve(MarketDataType::Vol, vols, errors, start)
    }

    /// Weighted least squares on cap prices.
    ///
    /// # Errors
    ///
    /// `ValidationError::Invalid` if there are fewer caps than parameters; use
    /// [`penalised_solve_for_cap_prices`](Self::penalised_solve_for_cap_prices).
    pub fn least_squares_for_cap_prices(
        &self,
        prices: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.least_squares(MarketDataType::Price, prices, errors, start, None, None)
    }

    /// Weighted least squares on cap vols.
    pub fn least_squares_for_cap_vols(
        &self,
        vols: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.least_squares(MarketDataType::Vol, vols, errors, start, None, None)
    }

    /// Solve `model(x) = prices` exactly.
    ///
    /// # Errors
    ///
    /// `ValidationError::Invalid` unless there is exactly one parameter per cap.
    pub fn root_find_for_cap_prices(
        &self,
        prices: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.root_find(MarketDataType::Price, prices, errors, start)
    }

    /// Solve `model(x) = vols` exactly.
    pub fn root_find_for_cap_vols(
        &self,
        vols: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.root_find(MarketDataType::Vol, vols, errors, start)
    }

    /// Penalised, optionally constrained least squares on cap prices.
    ///
    /// Any number of parameters is allowed; `penalty` must be
    /// `num_model_parameters × num_model_parameters`.
    pub fn penalised_solve_for_cap_prices(
        &self,
        prices: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
        penalty: &Matrix,
        constraint: Option<&Constraint>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.least_squares(MarketDataType::Price, prices, errors, start, Some(penalty), constraint)
    }

    /// Penalised, optionally constrained least squares on cap vols.
    pub fn penalised_solve_for_cap_vols(
        &self,
        vols: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
        penalty: &Matrix,
        constraint: Option<&Constraint>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.least_squares(MarketDataType::Vol, vols, errors, start, Some(penalty), constraint)
    }

    /// Dispatch on `data_type` to the matching unpenalised solve.
    pub(crate) fn solve(
        &self,
        data_type: MarketDataType,
        values: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        if self.num_model_parameters() == self.num_caps() {
            // Bad inputs fail here rather than in the fallback
            self.problem(data_type, values, errors, start, None, None)?;
            match self.root_find(data_type, values, errors, start) {
                Ok(result) => return Ok(result),
                Err(err) if err.is_numerical() => warn!(
                    error = %err,
                    data_type = %data_type,
                    "root find failed, falling back to least squares"
                ),
                Err(err) => return Err(err),
            }
        }
        self.least_squares(data_type, values, errors, start, None, None)
    }

    /// Penalised least squares dispatched on `data_type`.
    pub(crate) fn penalised_solve(
        &self,
        data_type: MarketDataType,
        values: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
        penalty: &Matrix,
        constraint: Option<&Constraint>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.least_squares(data_type, values, errors, start, Some(penalty), constraint)
    }

    fn least_squares(
        &self,
        data_type: MarketDataType,
        values: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
        penalty: Option<&Matrix>,
        constraint: Option<&Constraint>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        let n = self.num_model_parameters();
        match penalty {
            Some(p) => self.check_penalty(p)?,
            None if self.num_caps() < n => {
                return Err(ValidationError::invalid(format!(
                    "least squares needs at least as many caps as parameters ({} caps, {n} parameters); \
                     use a penalised solve",
                    self.num_caps()
                ))
                .into());
            }
            None => {}
        }
        let problem = self.problem(data_type, values, errors, start, penalty, constraint)?;
        debug!(
            method = "least_squares",
            data_type = %data_type,
            num_caps = self.num_caps(),
            num_parameters = n,
            penalised = penalty.is_some(),
            "stripping caplet volatilities"
        );

        let fit = LevenbergMarquardtSolver::new(self.lm_config).minimise(&problem, start.to_vec())?;
        let chi_square = fit.chi_square();
        info!(
            method = "least_squares",
            chi_square,
            iterations = fit.iterations,
            "caplet stripping complete"
        );
        Ok(CapletStrippingResult::least_squares(
            fit.params,
            chi_square,
            fit.iterations,
            Arc::clone(&self.pricer),
            Arc::clone(&self.vol_function),
        ))
    }

    fn root_find(
        &self,
        data_type: MarketDataType,
        values: &[f64],
        errors: Option<&[f64]>,
        start: &[f64],
    ) -> Result<CapletStrippingResult, StrippingError> {
        let n = self.num_model_parameters();
        if self.num_caps() != n {
            return Err(ValidationError::invalid(format!(
                "root finding needs exactly one parameter per cap ({} caps, {n} parameters)",
                self.num_caps()
            ))
            .into());
        }
        let problem = self.problem(data_type, values, errors, start, None, None)?;
        debug!(
            method = "root_find",
            data_type = %data_type,
            num_caps = self.num_caps(),
            num_parameters = n,
            "stripping caplet volatilities"
        );

        let root = NewtonVectorRootFinder::new(self.newton_config).find_root(&problem, start.to_vec())?;
        info!(
            method = "root_find",
            residual_norm = root.residual_norm,
            iterations = root.iterations,
            "caplet stripping complete"
        );
        Ok(CapletStrippingResult::root_find(
            root.params,
            root.iterations,
            Arc::clone(&self.pricer),
            Arc::clone(&self.vol_function),
        ))
    }

    fn problem<'a>(
        &'a self,
        data_type: MarketDataType,
        values: &'a [f64],
        errors: Option<&[f64]>,
        start: &[f64],
        penalty: Option<&'a Matrix>,
        constraint: Option<&'a Constraint>,
    ) -> Result<StrippingProblem<'a>, StrippingError> {
        self.check_market_values(data_type, values)?;
        ensure_length(start, self.num_model_parameters(), "start")?;
        let weights = match errors {
            Some(errors) => {
                ensure_length(errors, self.num_caps(), "errors")?;
                ensure_positive(errors, "errors")?;
                errors.iter().map(|e| 1.0 / e).collect()
            }
            None => vec![1.0; self.num_caps()],
        };
        Ok(StrippingProblem {
            imp: self,
            data_type,
            values,
            weights,
            penalty,
            constraint,
        })
    }

    pub(crate) fn check_market_values(&self, data_type: MarketDataType, values: &[f64]) -> Result<(), StrippingError> {
        if values.len() != self.num_caps() {
            return Err(StrippingError::MarketDataMismatch {
                expected: self.num_caps(),
                got: values.len(),
            });
        }
        for (cap, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(StrippingError::invalid_market_data(cap, format!("{value} is not finite")));
            }
            match data_type {
                MarketDataType::Price => {
                    let intrinsic = self.pricer.intrinsic_cap_values()[cap];
                    if value < intrinsic {
                        return Err(StrippingError::invalid_market_data(
                            cap,
                            format!("price {value} is below intrinsic value {intrinsic}"),
                        ));
                    }
                }
                MarketDataType::Vol => {
                    if value < 0.0 {
                        return Err(StrippingError::invalid_market_data(
                            cap,
                            format!("volatility {value} is negative"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_penalty(&self, penalty: &Matrix) -> Result<(), ValidationError> {
        let n = self.num_model_parameters();
        ensure_length(penalty, n, "penalty rows")?;
        for row in penalty {
            ensure_length(row, n, "penalty columns")?;
        }
        Ok(())
    }
}

/// Weighted residuals `(model − market) / error` for one solve.
struct StrippingProblem<'a> {
    imp: &'a CapletStrippingImp,
    data_type: MarketDataType,
    values: &'a [f64],
    weights: Vec<f64>,
    penalty: Option<&'a Matrix>,
    constraint: Option<&'a Constraint>,
}

impl NonLinearProblem for StrippingProblem<'_> {
    type Error = StrippingError;

    fn num_parameters(&self) -> usize {
        self.imp.num_model_parameters()
    }

    fn residuals(&self, params: &[f64]) -> Result<Vec<f64>, StrippingError> {
        let model = match self.data_type {
            MarketDataType::Price => self.imp.cap_prices(params)?,
            MarketDataType::Vol => self.imp.cap_vols(params)?,
        };
        Ok(model
            .iter()
            .zip(self.values)
            .zip(&self.weights)
            .map(|((m, v), w)| (m - v) * w)
            .collect())
    }

    fn jacobian(&self, params: &[f64]) -> Result<Matrix, StrippingError> {
        let mut jac = match self.data_type {
            MarketDataType::Price => self.imp.cap_price_jacobian(params)?,
            MarketDataType::Vol => self.imp.cap_vol_jacobian(params)?,
        };
        for (row, w) in jac.iter_mut().zip(&self.weights) {
            row.iter_mut().for_each(|v| *v *= w);
        }
        Ok(jac)
    }

    fn penalty(&self) -> Option<&Matrix> {
        self.penalty
    }

    fn is_feasible(&self, params: &[f64]) -> bool {
        self.constraint
            .map_or(true, |c| c.is_satisfied(&self.imp.vol_function, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StrippingMethod;
    use crate::vol_function::DirectVolatilityProvider;
    use approx::assert_relative_eq;
    use caplet_core::math::penalty::{difference_matrix, penalty_matrix};
    use caplet_models::instruments::{CapFloor, IborIndex};
    use caplet_models::market_data::{FlatCurve, MultiCurve};

    fn pricer(ends: &[f64]) -> Arc<MultiCapFloorPricer> {
        let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
        let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
        let caps = ends
            .iter()
            .map(|&end| CapFloor::from_schedule(index.clone(), 0.03, true, 0.5, end, &curves).unwrap())
            .collect();
        Arc::new(MultiCapFloorPricer::new(caps).unwrap())
    }

    fn square_imp() -> CapletStrippingImp {
        CapletStrippingImp::new(pricer(&[1.0, 1.5, 2.0]), &DirectVolatilityProvider::new()).unwrap()
    }

    fn assert_matrix_close(a: &Matrix, b: &Matrix, tol: f64) {
        for (ra, rb) in a.iter().zip(b) {
            for (x, y) in ra.iter().zip(rb) {
                assert!((x - y).abs() <= tol * y.abs().max(1e-3), "{x} vs {y}");
            }
        }
    }

    fn fd_jacobian<F>(f: F, x: &[f64]) -> Matrix
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let h = 1e-6;
        let cols: Vec<Vec<f64>> = (0..x.len())
            .map(|j| {
                let mut up = x.to_vec();
                let mut dn = x.to_vec();
                up[j] += h;
                dn[j] -= h;
                f(&up)
                    .iter()
                    .zip(f(&dn))
                    .map(|(u, d)| (u - d) / (2.0 * h))
                    .collect()
            })
            .collect();
        (0..cols[0].len())
            .map(|i| cols.iter().map(|c| c[i]).collect())
            .collect()
    }

    // ========================================
    // Model Function Tests
    // ========================================

    #[test]
    fn test_cap_price_jacobian_matches_fd() {
        let imp = square_imp();
        let x = [0.2, 0.25, 0.3];
        let analytic = imp.cap_price_jacobian(&x).unwrap();
        let numeric = fd_jacobian(|p| imp.cap_prices(p).unwrap(), &x);
        assert_matrix_close(&analytic, &numeric, 1e-5);
        // The 1y cap has one caplet
        assert_eq!(analytic[0][1], 0.0);
        assert_eq!(analytic[0][2], 0.0);
    }

    #[test]
    fn test_cap_vol_jacobian_matches_fd() {
        let imp = square_imp();
        let x = [0.2, 0.25, 0.3];
        let analytic = imp.cap_vol_jacobian(&x).unwrap();
        let numeric = fd_jacobian(|p| imp.cap_vols(p).unwrap(), &x);
        assert_matrix_close(&analytic, &numeric, 1e-5);
        // A single-caplet cap's vol is its caplet's vol
        assert_relative_eq!(analytic[0][0], 1.0, epsilon = 1e-10);
    }

    // ========================================
    // Solve Tests
    // ========================================

    #[test]
    fn test_square_price_solve_uses_root_find() {
        let imp = square_imp();
        let truth = [0.2, 0.25, 0.3];
        let prices = imp.cap_prices(&truth).unwrap();
        let result = imp.solve_for_cap_prices(&prices, None, &[0.3; 3]).unwrap();
        assert_eq!(result.method(), StrippingMethod::RootFind);
        assert_eq!(result.chi_square(), 0.0);
        for (p, t) in result.fit_parameters().iter().zip(&truth) {
            assert_relative_eq!(p, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_least_squares_for_cap_vols_recovers_vols() {
        let imp = square_imp();
        let market = [0.21, 0.23, 0.26];
        let result = imp.least_squares_for_cap_vols(&market, None, &[0.2; 3]).unwrap();
        assert_eq!(result.method(), StrippingMethod::LeastSquares);
        assert!(result.chi_square() < 1e-16);
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert_relative_eq!(m, v, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_larger_errors_weaken_the_fit() {
        // A curvature penalty fights the kinked quotes; larger errors give it more weight
        let imp = square_imp();
        let market = [0.20, 0.30, 0.22];
        let penalty = penalty_matrix(&difference_matrix(3, 2), 1.0);
        let unit = imp
            .penalised_solve_for_cap_vols(&market, None, &[0.25; 3], &penalty, None)
            .unwrap();
        let loose = imp
            .penalised_solve_for_cap_vols(&market, Some(&[10.0; 3]), &[0.25; 3], &penalty, None)
            .unwrap();
        assert!(unit.chi_square() > 0.0);
        let misfit = |r: &CapletStrippingResult| -> f64 {
            r.cap_vol_errors(&market).unwrap().iter().map(|e| e * e).sum()
        };
        assert!(misfit(&loose) >= misfit(&unit) - 1e-12);
    }

    #[test]
    fn test_penalised_under_determined_solve() {
        let imp = CapletStrippingImp::new(pricer(&[1.0, 2.5]), &DirectVolatilityProvider::new()).unwrap();
        assert_eq!(imp.num_caps(), 2);
        assert_eq!(imp.num_model_parameters(), 4);
        let market = [0.2, 0.24];
        let penalty = penalty_matrix(&difference_matrix(4, 2), 1e-4);
        let result = imp
            .penalised_solve_for_cap_vols(
                &market,
                None,
                &[0.2; 4],
                &penalty,
                Some(&Constraint::NonNegativeVolatilities),
            )
            .unwrap();
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert!((m - v).abs() < 1e-3);
        }
    }

    #[test]
    fn test_non_negativity_binds() {
        // Quotes from linear caplet vols ending below zero; priced by |σ|
        let imp = square_imp();
        let truth = [0.5, 0.15, -0.2];
        let market = imp.cap_vols(&truth).unwrap();
        let penalty = penalty_matrix(&difference_matrix(3, 2), 100.0);

        let free = imp
            .penalised_solve_for_cap_vols(&market, None, &[0.3; 3], &penalty, None)
            .unwrap();
        let free_vols = free.caplet_volatilities().unwrap();
        assert!(free_vols.iter().any(|&v| v < -0.05), "{free_vols:?}");

        let constrained = imp
            .penalised_solve_for_cap_vols(
                &market,
                None,
                &[0.3; 3],
                &penalty,
                Some(&Constraint::NonNegativeVolatilities),
            )
            .unwrap();
        let vols = constrained.caplet_volatilities().unwrap();
        assert!(vols.iter().all(|&v| v >= 0.0), "{vols:?}");
        assert!(constrained.chi_square() > free.chi_square());
    }

    // ========================================
    // Validation Tests
    // ========================================

    #[test]
    fn test_market_data_length_mismatch() {
        let err = square_imp().solve_for_cap_vols(&[0.2, 0.2], None, &[0.2; 3]).unwrap_err();
        assert_eq!(err, StrippingError::MarketDataMismatch { expected: 3, got: 2 });
    }

    #[test]
    fn test_square_solve_returns_input_errors_directly() {
        let imp = square_imp();
        let err = imp.solve_for_cap_vols(&[0.2, -0.1, 0.2], None, &[0.2; 3]).unwrap_err();
        assert!(matches!(err, StrippingError::InvalidMarketData { cap: 1, .. }));
        assert!(!err.is_numerical());
        let err = imp.solve_for_cap_vols(&[0.2; 3], None, &[0.2; 2]).unwrap_err();
        assert!(matches!(err, StrippingError::Validation(ValidationError::LengthMismatch { .. })));
    }

    #[test]
    fn test_price_below_intrinsic_rejected() {
        let imp = square_imp();
        let mut prices = imp.cap_prices(&[0.2; 3]).unwrap();
        prices[1] = imp.pricer().intrinsic_cap_values()[1] - 1e-6;
        let err = imp.solve_for_cap_prices(&prices, None, &[0.2; 3]).unwrap_err();
        assert!(matches!(err, StrippingError::InvalidMarketData { cap: 1, .. }));
    }

    #[test]
    fn test_negative_vol_and_bad_errors_rejected() {
        let imp = square_imp();
        assert!(matches!(
            imp.least_squares_for_cap_vols(&[0.2, -0.1, 0.2], None, &[0.2; 3]),
            Err(StrippingError::InvalidMarketData { cap: 1, .. })
        ));
        assert!(matches!(
            imp.least_squares_for_cap_vols(&[0.2; 3], Some(&[1.0, 0.0, 1.0]), &[0.2; 3]),
            Err(StrippingError::Validation(ValidationError::NonPositive { index: 1, .. }))
        ));
    }

    #[test]
    fn test_least_squares_needs_enough_caps() {
        let imp = CapletStrippingImp::new(pricer(&[1.0, 2.5]), &DirectVolatilityProvider::new()).unwrap();
        let err = imp.least_squares_for_cap_vols(&[0.2, 0.2], None, &[0.2; 4]).unwrap_err();
        assert!(matches!(err, StrippingError::Validation(ValidationError::Invalid(_))));
        let err = imp.root_find_for_cap_vols(&[0.2, 0.2], None, &[0.2; 4]).unwrap_err();
        assert!(matches!(err, StrippingError::Validation(ValidationError::Invalid(_))));
    }

    #[test]
    fn test_start_and_penalty_shape_checked() {
        let imp = square_imp();
        assert!(matches!(
            imp.least_squares_for_cap_vols(&[0.2; 3], None, &[0.2; 2]),
            Err(StrippingError::Validation(ValidationError::LengthMismatch { .. }))
        ));
        let penalty = penalty_matrix(&difference_matrix(4, 2), 1.0);
        assert!(matches!(
            imp.penalised_solve_for_cap_vols(&[0.2; 3], None, &[0.2; 3], &penalty, None),
            Err(StrippingError::Validation(ValidationError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_infeasible_start() {
        let imp = square_imp();
        let penalty = penalty_matrix(&difference_matrix(3, 2), 1.0);
        let err = imp
            .penalised_solve_for_cap_vols(
                &[0.2; 3],
                None,
                &[0.2, -0.1, 0.2],
                &penalty,
                Some(&Constraint::NonNegativeVolatilities),
            )
            .unwrap_err();
        assert_eq!(err, StrippingError::InfeasibleStart);
    }

    #[test]
    fn test_custom_constraint() {
        let imp = square_imp();
        let below_half = Constraint::custom(|p| p.iter().all(|&v| v < 0.5));
        assert!(below_half.is_satisfied(imp.vol_function(), &[0.2; 3]));
        assert!(!below_half.is_satisfied(imp.vol_function(), &[0.2, 0.6, 0.2]));
        assert_eq!(format!("{below_half:?}"), "Custom(..)");
    }
}
