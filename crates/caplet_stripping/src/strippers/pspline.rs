//! Penalised B-spline caplet volatilities.

use std::sync::Arc;

use caplet_core::math::bspline::{BSplineBasis, TensorBSplineBasis};
use caplet_core::math::linalg::Matrix;

use super::{errors_or_default, CapletStripper, StripperConfig};
use crate::error::StrippingError;
use crate::imp::{CapletStrippingImp, Constraint, MarketDataType};
use crate::pricer::MultiCapFloorPricer;
use crate::result::CapletStrippingResult;
use crate::vol_function::PSplineProvider;

/// Fits B-spline coefficients in expiry, or in expiry and strike.
///
/// Always penalised with one weight in every direction, and constrained to
/// non-negative caplet volatilities. The default guess is the flat
/// [`StripperConfig::default_vol`], which the basis reproduces exactly.
#[derive(Debug, Clone)]
pub struct PSplineStripper {
    imp: CapletStrippingImp,
    penalty: Matrix,
    constraint: Constraint,
    default_vol: f64,
}

impl PSplineStripper {
    /// Spline in expiry over the caplet fixing range.
    pub fn term_structure(pricer: Arc<MultiCapFloorPricer>, config: StripperConfig) -> Result<Self, StrippingError> {
        let (lo, hi) = span(&pricer.expiry_strike_grid().distinct_expiries());
        let basis = BSplineBasis::uniform(lo, hi, config.spline_functions_time, config.spline_degree)?;
        Self::build(pricer, PSplineProvider::term_structure(basis), config)
    }

    /// Tensor spline over the caplet fixing and strike ranges.
    pub fn surface(pricer: Arc<MultiCapFloorPricer>, config: StripperConfig) -> Result<Self, StrippingError> {
        let grid = pricer.expiry_strike_grid();
        let (t_lo, t_hi) = span(&grid.distinct_expiries());
        let (k_lo, k_hi) = span(&grid.distinct_strikes());
        let basis = TensorBSplineBasis::new(
            BSplineBasis::uniform(t_lo, t_hi, config.spline_functions_time, config.spline_degree)?,
            BSplineBasis::uniform(k_lo, k_hi, config.spline_functions_strike, config.spline_degree)?,
        );
        Self::build(pricer, PSplineProvider::surface(basis), config)
    }

    fn build(
        pricer: Arc<MultiCapFloorPricer>,
        provider: PSplineProvider,
        config: StripperConfig,
    ) -> Result<Self, StrippingError> {
        let imp = CapletStrippingImp::new(pricer, &provider)?
            .with_lm_config(config.lm)
            .with_newton_config(config.newton);
        Ok(Self {
            imp,
            penalty: provider.penalty_matrix(config.penalty_order, config.spline_lambda),
            constraint: Constraint::NonNegativeVolatilities,
            default_vol: config.default_vol,
        })
    }

    /// Penalty on the coefficients.
    pub fn penalty(&self) -> &Matrix {
        &self.penalty
    }
}

impl CapletStripper for PSplineStripper {
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
            None => vec![self.default_vol; self.imp.num_model_parameters()],
        };
        self.imp.penalised_solve(
            data_type,
            market_values,
            errors.as_deref(),
            &start,
            &self.penalty,
            Some(&self.constraint),
        )
    }

    fn imp(&self) -> &CapletStrippingImp {
        &self.imp
    }
}

/// Range of sorted values, widened to unit length when degenerate.
fn span(values: &[f64]) -> (f64, f64) {
    match (values.first(), values.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        (Some(&lo), _) => (lo, lo + 1.0),
        _ => (0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{humped_vol, pricer};
    use super::*;

    #[test]
    fn test_span() {
        assert_eq!(span(&[0.5, 2.0, 4.5]), (0.5, 4.5));
        assert_eq!(span(&[0.03]), (0.03, 1.03));
    }

    #[test]
    fn test_term_structure_fit() {
        let pricer = pricer(&[(0.03, 2.0), (0.03, 3.0), (0.03, 4.0), (0.03, 5.0)]);
        let vols: Vec<f64> = pricer
            .expiry_strike_grid()
            .points()
            .iter()
            .map(|&(t, _)| humped_vol(t))
            .collect();
        let market = pricer.cap_vols_from_caplet_vols(&vols).unwrap();
        let config = StripperConfig {
            spline_functions_time: 6,
            spline_lambda: 1e-6,
            ..StripperConfig::default()
        };
        let stripper = PSplineStripper::term_structure(pricer, config).unwrap();
        assert_eq!(stripper.imp().num_model_parameters(), 6);

        let result = stripper.solve(&market, MarketDataType::Vol, None, None).unwrap();
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert!((m - v).abs() < 1e-3, "{m} vs {v}");
        }
    }

    #[test]
    fn test_constraint_keeps_vols_non_negative() {
        // A steep drop pushes an unconstrained fit below zero
        let pricer = pricer(&[(0.03, 1.5), (0.03, 2.0), (0.03, 5.0)]);
        let stripper = PSplineStripper::term_structure(pricer, StripperConfig::default()).unwrap();
        let result = stripper
            .solve(&[0.60, 0.55, 0.08], MarketDataType::Vol, None, None)
            .unwrap();
        assert!(result.caplet_volatilities().unwrap().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_surface_dimensions() {
        let pricer = pricer(&[(0.02, 3.0), (0.03, 3.0), (0.04, 3.0)]);
        let config = StripperConfig {
            spline_functions_time: 5,
            spline_functions_strike: 4,
            ..StripperConfig::default()
        };
        let stripper = PSplineStripper::surface(pricer, config).unwrap();
        assert_eq!(stripper.imp().num_model_parameters(), 20);
        assert_eq!(stripper.penalty().len(), 20);
    }
}
