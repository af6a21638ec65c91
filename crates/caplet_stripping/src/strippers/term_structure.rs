//! Strike-independent caplet volatility curve interpolated between knots.

use std::sync::Arc;

use caplet_core::math::functions::ParameterTransform;
use caplet_core::math::interpolators::InterpolationMethod;
use caplet_core::math::linalg::Matrix;
use caplet_core::math::penalty::{difference_matrix, penalty_matrix_sized};
use tracing::debug;

use super::{errors_or_default, market_cap_vols, CapletStripper, StripperConfig};
use crate::error::StrippingError;
use crate::imp::{CapletStrippingImp, MarketDataType};
use crate::pricer::MultiCapFloorPricer;
use crate::result::CapletStrippingResult;
use crate::vol_function::grid::distinct_sorted;
use crate::vol_function::{InterpolatedTermStructureProvider, TransformedVolatilityProvider};

/// Floor on cap volatilities before taking logs for the starting guess.
const MIN_GUESS_VOL: f64 = 1e-4;

/// Fits log volatilities at expiry knots.
///
/// The curve is `σ(t) = interp(t; exp(x))`, so the knot volatilities stay
/// positive for any parameters. Without explicit knots, the distinct first
/// and last caplet fixing times of the caps are used, dropping the earliest
/// until there are no more knots than caps (keeping at least two). With more knots than caps
/// the fit is penalised.
#[derive(Debug, Clone)]
pub struct TermStructureStripper {
    imp: CapletStrippingImp,
    knots: Vec<f64>,
    penalty: Option<Matrix>,
}

impl TermStructureStripper {
    /// Build the stripper; `knots` default to the caps' fixing windows.
    pub fn new(
        pricer: Arc<MultiCapFloorPricer>,
        knots: Option<Vec<f64>>,
        method: InterpolationMethod,
        config: StripperConfig,
    ) -> Result<Self, StrippingError> {
        let knots = match knots {
            Some(knots) => knots,
            None => default_knots(&pricer),
        };
        let inner = InterpolatedTermStructureProvider::new(knots.clone(), method)?;
        let provider = TransformedVolatilityProvider::new(Arc::new(inner), ParameterTransform::Exp);
        let imp = CapletStrippingImp::new(pricer, &provider)?
            .with_lm_config(config.lm)
            .with_newton_config(config.newton);

        let n = knots.len();
        let penalty = (n > imp.num_caps()).then(|| {
            penalty_matrix_sized(&difference_matrix(n, config.penalty_order), config.lambda_time, n)
        });
        debug!(
            num_knots = n,
            num_caps = imp.num_caps(),
            penalised = penalty.is_some(),
            "term structure knots"
        );
        Ok(Self { imp, knots, penalty })
    }

    /// Linear interpolation on the default knots.
    pub fn with_defaults(pricer: Arc<MultiCapFloorPricer>) -> Result<Self, StrippingError> {
        Self::new(pricer, None, InterpolationMethod::Linear, StripperConfig::default())
    }

    /// Expiry knots.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Penalty on the log volatilities, when the knots outnumber the caps.
    pub fn penalty(&self) -> Option<&Matrix> {
        self.penalty.as_ref()
    }
}

impl CapletStripper for TermStructureStripper {
    fn solve(
        &self,
        market_values: &[f64],
        data_type: MarketDataType,
        errors: Option<&[f64]>,
        guess: Option<&[f64]>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        self.imp.check_market_values(data_type, market_values)?;
        let errors = errors_or_default(&self.imp, market_values, data_type, errors)?;
        let start = match guess {
            Some(guess) => guess.to_vec(),
            None => {
                let vols = market_cap_vols(&self.imp, market_values, data_type)?;
                log_guess(&vols, self.knots.len())
            }
        };
        match &self.penalty {
            Some(penalty) => self.imp.penalised_solve(
                data_type,
                market_values,
                errors.as_deref(),
                &start,
                penalty,
                None,
            ),
            None => self.imp.solve(data_type, market_values, errors.as_deref(), &start),
        }
    }

    fn imp(&self) -> &CapletStrippingImp {
        &self.imp
    }
}

/// Distinct first and last fixing times of the caps, earliest dropped until
/// no more than one per cap.
fn default_knots(pricer: &MultiCapFloorPricer) -> Vec<f64> {
    let times = pricer.caps().iter().flat_map(|cap| {
        let caplets = cap.caplets();
        caplets
            .first()
            .into_iter()
            .chain(caplets.last())
            .map(|caplet| caplet.fixing_time())
    });
    let mut knots = distinct_sorted(times);
    let excess = knots.len().saturating_sub(pricer.num_caps().max(2));
    knots.drain(..excess);
    knots
}

/// Cap vols cut or padded (repeating the last) to `n`, then logged.
fn log_guess(cap_vols: &[f64], n: usize) -> Vec<f64> {
    let last = cap_vols.last().copied().unwrap_or(MIN_GUESS_VOL);
    (0..n)
        .map(|i| cap_vols.get(i).copied().unwrap_or(last).max(MIN_GUESS_VOL).ln())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{humped_vol, pricer};
    use super::*;
    use crate::result::StrippingMethod;
    use approx::assert_relative_eq;

    // ========================================
    // Knot and Guess Tests
    // ========================================

    #[test]
    fn test_default_knots() {
        // First fixing 0.5, last fixings 1.5, 2.5, 4.5: four candidates for three caps
        let three = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 5.0)]);
        assert_eq!(default_knots(&three), vec![1.5, 2.5, 4.5]);

        let single = pricer(&[(0.03, 2.0)]);
        assert_eq!(default_knots(&single), vec![0.5, 1.5]);
    }

    #[test]
    fn test_default_knots_cover_every_fixing_window() {
        let ladder = pricer(&[(0.03, 1.0), (0.03, 1.5), (0.03, 2.0), (0.03, 2.5), (0.03, 3.0)]);
        let knots = default_knots(&ladder);
        assert_eq!(knots, vec![0.5, 1.0, 1.5, 2.0, 2.5]);
        let last_fixing = ladder.caplets().iter().map(|c| c.fixing_time()).fold(0.0, f64::max);
        assert_eq!(knots.last().copied(), Some(last_fixing));
    }

    #[test]
    fn test_log_guess_pads_and_truncates() {
        let g = log_guess(&[0.2, 0.3], 3);
        assert_relative_eq!(g[2], 0.3_f64.ln());
        assert_eq!(log_guess(&[0.2, 0.3, 0.4], 2).len(), 2);
        assert!(log_guess(&[0.0], 1)[0].is_finite());
    }

    // ========================================
    // Solve Tests
    // ========================================

    #[test]
    fn test_square_term_structure_fit() {
        let pricer = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 5.0)]);
        let stripper = TermStructureStripper::with_defaults(pricer.clone()).unwrap();
        assert!(stripper.penalty().is_none());

        let market = [0.26, 0.25, 0.22];
        let result = stripper.solve(&market, MarketDataType::Vol, None, None).unwrap();
        assert_eq!(result.method(), StrippingMethod::RootFind);
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert_relative_eq!(m, v, epsilon = 1e-8);
        }
        assert!(result.caplet_volatilities().unwrap().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_adjacent_maturities_strip() {
        // The longer cap adds one caplet
        let pair = pricer(&[(0.03, 2.0), (0.03, 2.5)]);
        let stripper = TermStructureStripper::with_defaults(pair).unwrap();
        assert_eq!(stripper.knots(), &[1.5, 2.0]);
        let market = [0.25, 0.24];
        let result = stripper.solve(&market, MarketDataType::Vol, None, None).unwrap();
        assert_eq!(result.method(), StrippingMethod::RootFind);
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert_relative_eq!(m, v, epsilon = 1e-8);
        }

        let ladder = pricer(&[(0.03, 1.0), (0.03, 1.5), (0.03, 2.0), (0.03, 2.5), (0.03, 3.0)]);
        let stripper = TermStructureStripper::with_defaults(ladder).unwrap();
        let market = [0.20, 0.22, 0.23, 0.225, 0.22];
        let result = stripper.solve(&market, MarketDataType::Vol, None, None).unwrap();
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert_relative_eq!(m, v, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_explicit_knots_are_penalised() {
        let pricer = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 5.0)]);
        let knots = vec![0.5, 1.5, 2.5, 3.5, 4.5];
        let config = StripperConfig {
            lambda_time: 1e-8,
            ..StripperConfig::default()
        };
        let stripper =
            TermStructureStripper::new(pricer.clone(), Some(knots), InterpolationMethod::NaturalCubic, config)
                .unwrap();
        assert!(stripper.penalty().is_some());

        let vols: Vec<f64> = pricer
            .expiry_strike_grid()
            .points()
            .iter()
            .map(|&(t, _)| humped_vol(t))
            .collect();
        let prices = pricer.price(&vols).unwrap();
        let result = stripper.solve(&prices, MarketDataType::Price, None, None).unwrap();
        assert_eq!(result.method(), StrippingMethod::LeastSquares);
        for (m, p) in result.model_cap_prices().unwrap().iter().zip(&prices) {
            assert_relative_eq!(m, p, max_relative = 1e-4);
        }
    }
}
