//! One free volatility per caplet, regularised along expiry and strike.

use std::sync::Arc;

use caplet_core::math::linalg::{add, Matrix};
use caplet_core::math::penalty::grouped_penalty_matrix;
use tracing::debug;

use super::{errors_or_default, market_cap_vols, CapletStripper, StripperConfig};
use crate::error::StrippingError;
use crate::imp::{CapletStrippingImp, MarketDataType};
use crate::pricer::MultiCapFloorPricer;
use crate::result::CapletStrippingResult;
use crate::vol_function::grid::coincide;
use crate::vol_function::{DirectVolatilityProvider, EvaluationGrid};

/// Strikes enter the strike-direction penalty in percent.
const STRIKE_SCALE: f64 = 100.0;

/// Strips every caplet volatility directly.
///
/// There are usually more caplets than caps, so the fit is always
/// penalised: differences of the chosen order are taken along expiry within
/// each strike and along strike within each expiry, and the two penalties
/// are added.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::instruments::{CapFloor, IborIndex};
/// use caplet_models::market_data::{FlatCurve, MultiCurve};
/// use caplet_stripping::{CapletStripper, DirectStripper, MarketDataType, MultiCapFloorPricer};
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
/// let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
/// let caps = [2.0, 3.0, 5.0]
///     .iter()
///     .map(|&end| CapFloor::from_schedule(index.clone(), 0.03, true, 0.5, end, &curves).unwrap())
///     .collect();
/// let pricer = Arc::new(MultiCapFloorPricer::new(caps).unwrap());
/// let stripper = DirectStripper::with_defaults(pricer).unwrap();
///
/// let result = stripper.solve(&[0.25, 0.24, 0.22], MarketDataType::Vol, None, None).unwrap();
/// assert_eq!(result.fit_parameters().len(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct DirectStripper {
    imp: CapletStrippingImp,
    penalty: Matrix,
}

impl DirectStripper {
    /// Build the stripper for `pricer`.
    pub fn new(pricer: Arc<MultiCapFloorPricer>, config: StripperConfig) -> Result<Self, StrippingError> {
        let imp = CapletStrippingImp::new(pricer, &DirectVolatilityProvider::new())?
            .with_lm_config(config.lm)
            .with_newton_config(config.newton);
        let penalty = roughness_penalty(
            imp.pricer().expiry_strike_grid(),
            config.penalty_order,
            config.lambda_time,
            config.lambda_strike,
        )?;
        Ok(Self { imp, penalty })
    }

    /// Build the stripper with default settings.
    pub fn with_defaults(pricer: Arc<MultiCapFloorPricer>) -> Result<Self, StrippingError> {
        Self::new(pricer, StripperConfig::default())
    }

    /// The penalty matrix on the caplet volatilities.
    pub fn penalty(&self) -> &Matrix {
        &self.penalty
    }
}

impl CapletStripper for DirectStripper {
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
                let mean = vols.iter().sum::<f64>() / vols.len() as f64;
                debug!(mean, "flat starting guess from the mean cap volatility");
                vec![mean; self.imp.num_model_parameters()]
            }
        };
        self.imp.penalised_solve(
            data_type,
            market_values,
            errors.as_deref(),
            &start,
            &self.penalty,
            None,
        )
    }

    fn imp(&self) -> &CapletStrippingImp {
        &self.imp
    }
}

/// Roughness penalty over grid points along expiry (per strike) plus along
/// strike (per expiry).
fn roughness_penalty(
    grid: &EvaluationGrid,
    order: usize,
    lambda_time: f64,
    lambda_strike: f64,
) -> Result<Matrix, StrippingError> {
    let points = grid.points();
    let time_groups = groups(points, &grid.distinct_strikes(), |p| p.1, |p| p.0);
    let strike_groups = groups(points, &grid.distinct_expiries(), |p| p.0, |p| p.1 * STRIKE_SCALE);

    let n = grid.len();
    let time = grouped_penalty_matrix(n, &time_groups, order, lambda_time)?;
    let strike = grouped_penalty_matrix(n, &strike_groups, order, lambda_strike)?;
    Ok(add(&time, &strike))
}

/// For each key, the `(index, coordinate)` of the points sharing it, sorted by coordinate.
fn groups(
    points: &[(f64, f64)],
    keys: &[f64],
    key: impl Fn(&(f64, f64)) -> f64,
    coord: impl Fn(&(f64, f64)) -> f64,
) -> Vec<Vec<(usize, f64)>> {
    keys.iter()
        .map(|&k| {
            let mut group: Vec<(usize, f64)> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| coincide(key(p), k))
                .map(|(i, p)| (i, coord(p)))
                .collect();
            group.sort_by(|a, b| a.1.total_cmp(&b.1));
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{humped_vol, pricer};
    use super::*;
    use caplet_core::math::linalg::quadratic_form;
    use caplet_core::math::penalty::roughness;

    // ========================================
    // Penalty Tests
    // ========================================

    #[test]
    fn test_penalty_is_separable() {
        let pricer = pricer(&[(0.02, 2.0), (0.03, 2.0)]);
        let stripper = DirectStripper::new(
            pricer,
            StripperConfig {
                lambda_strike: 0.0,
                ..StripperConfig::default()
            },
        )
        .unwrap();
        // Vols linear in expiry but jumping across strikes cost nothing along expiry
        let vols: Vec<f64> = stripper
            .imp()
            .pricer()
            .expiry_strike_grid()
            .points()
            .iter()
            .map(|&(t, k)| 0.2 + 0.01 * t + if k > 0.025 { 0.1 } else { 0.0 })
            .collect();
        assert!(quadratic_form(stripper.penalty(), &vols).abs() < 1e-14);
        assert_eq!(stripper.penalty().len(), 6);
    }

    #[test]
    fn test_strike_penalty_sees_smile() {
        let pricer = pricer(&[(0.02, 2.0), (0.03, 2.0), (0.04, 2.0)]);
        let stripper = DirectStripper::new(
            pricer,
            StripperConfig {
                lambda_time: 0.0,
                ..StripperConfig::default()
            },
        )
        .unwrap();
        let smile: Vec<f64> = stripper
            .imp()
            .pricer()
            .expiry_strike_grid()
            .points()
            .iter()
            .map(|&(_, k)| 0.2 + 100.0 * (k - 0.03).powi(2))
            .collect();
        assert!(quadratic_form(stripper.penalty(), &smile) > 0.0);
    }

    // ========================================
    // Solve Tests
    // ========================================

    #[test]
    fn test_direct_fit_and_smoothing() {
        let pricer = pricer(&[(0.03, 1.5), (0.03, 2.5), (0.03, 3.5), (0.03, 5.0)]);
        let vols: Vec<f64> = pricer
            .expiry_strike_grid()
            .points()
            .iter()
            .map(|&(t, _)| humped_vol(t))
            .collect();
        let market = pricer.cap_vols_from_caplet_vols(&vols).unwrap();

        let fit = |lambda: f64| {
            let config = StripperConfig {
                lambda_time: lambda,
                ..StripperConfig::default()
            };
            DirectStripper::new(pricer.clone(), config)
                .unwrap()
                .solve(&market, MarketDataType::Vol, None, None)
                .unwrap()
        };
        let tight = fit(1e-8);
        let smooth = fit(1.0);
        assert!(tight.chi_square() < 1e-8);
        assert!(smooth.chi_square() >= tight.chi_square());
        let rough = |r: &CapletStrippingResult| roughness(&r.caplet_volatilities().unwrap(), 2);
        assert!(rough(&smooth) < rough(&tight));
    }

    #[test]
    fn test_price_quotes_use_vega_weights() {
        let pricer = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 4.0)]);
        let market_vols = [0.26, 0.25, 0.23];
        let prices = pricer.price_from_cap_vols(&market_vols).unwrap();
        let config = StripperConfig {
            lambda_time: 1e-6,
            ..StripperConfig::default()
        };
        let stripper = DirectStripper::new(pricer, config).unwrap();
        let by_price = stripper.solve(&prices, MarketDataType::Price, None, None).unwrap();
        for (m, v) in by_price.model_cap_vols().unwrap().iter().zip(&market_vols) {
            assert!((m - v).abs() < 1e-3, "{m} vs {v}");
        }
    }

    #[test]
    fn test_zero_vol_start_is_singular() {
        // Zero caplet vols leave every cap without vega
        let pricer = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 5.0)]);
        let start = vec![0.0; pricer.num_caplets()];
        let stripper = DirectStripper::with_defaults(pricer).unwrap();
        let err = stripper
            .solve(&[0.25, 0.24, 0.22], MarketDataType::Vol, None, Some(&start))
            .unwrap_err();
        assert!(err.is_singular_start(), "{err}");
    }

    #[test]
    fn test_wrong_length_rejected() {
        let stripper = DirectStripper::with_defaults(pricer(&[(0.03, 2.0), (0.03, 3.0)])).unwrap();
        let err = stripper.solve(&[0.2], MarketDataType::Vol, None, None).unwrap_err();
        assert_eq!(err, StrippingError::MarketDataMismatch { expected: 2, got: 1 });
    }
}
