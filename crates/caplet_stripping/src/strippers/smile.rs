//! Caplet volatilities from a parametric smile with expiry-dependent parameters.

use std::sync::Arc;

use caplet_models::models::SmileModel;

use super::{CapletStripper, StripperConfig};
use crate::error::StrippingError;
use crate::imp::{CapletStrippingImp, MarketDataType};
use crate::pricer::MultiCapFloorPricer;
use crate::result::CapletStrippingResult;
use crate::vol_function::{SmileModelVolatilityProvider, VectorFunctionProvider};

/// Fits the parameters of a smile-parameter term structure.
///
/// Forwards come from the pricer's caplets. No sensible starting point can
/// be derived for smile parameters, so a guess is required; missing errors
/// mean unit weights.
#[derive(Debug, Clone)]
pub struct SmileModelStripper {
    imp: CapletStrippingImp,
}

impl SmileModelStripper {
    /// Build the stripper.
    pub fn new(
        pricer: Arc<MultiCapFloorPricer>,
        model: Arc<dyn SmileModel>,
        parameter_map: Arc<dyn VectorFunctionProvider>,
        config: StripperConfig,
    ) -> Result<Self, StrippingError> {
        let (expiries, forwards) = pricer.forward_curve();
        let provider = SmileModelVolatilityProvider::new(model, parameter_map, expiries, forwards)?;
        let imp = CapletStrippingImp::new(pricer, &provider)?
            .with_lm_config(config.lm)
            .with_newton_config(config.newton);
        Ok(Self { imp })
    }
}

impl CapletStripper for SmileModelStripper {
    fn solve(
        &self,
        market_values: &[f64],
        data_type: MarketDataType,
        errors: Option<&[f64]>,
        guess: Option<&[f64]>,
    ) -> Result<CapletStrippingResult, StrippingError> {
        let guess = guess.ok_or_else(|| {
            StrippingError::not_supported("smile model stripping without a starting guess")
        })?;
        self.imp.solve(data_type, market_values, errors, guess)
    }

    fn imp(&self) -> &CapletStrippingImp {
        &self.imp
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::pricer;
    use super::*;
    use crate::vol_function::{SmileParameterCurve, SmileParameterTermStructure};
    use caplet_models::models::SabrHaganSmile;

    fn stripper() -> SmileModelStripper {
        let pricer = pricer(&[
            (0.02, 2.0),
            (0.03, 2.0),
            (0.04, 2.0),
            (0.02, 4.0),
            (0.03, 4.0),
            (0.04, 4.0),
        ]);
        let map = SmileParameterTermStructure::new(vec![SmileParameterCurve::Constant; 4]);
        SmileModelStripper::new(
            pricer,
            Arc::new(SabrHaganSmile::new()),
            Arc::new(map),
            StripperConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_guess_required() {
        let err = stripper()
            .solve(&[0.2; 6], MarketDataType::Vol, None, None)
            .unwrap_err();
        assert!(matches!(err, StrippingError::NotSupported(_)));
    }

    #[test]
    fn test_recovers_generated_smile() {
        let stripper = stripper();
        let truth = [0.04, 0.5, -0.2, 0.3];
        let market = stripper.imp().cap_vols(&truth).unwrap();
        let result = stripper
            .solve(&market, MarketDataType::Vol, None, Some(&[0.045, 0.5, -0.1, 0.4]))
            .unwrap();
        assert!(result.chi_square() < 1e-10);
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&market) {
            assert!((m - v).abs() < 1e-5, "{m} vs {v}");
        }
    }
}
