//! Builds curves, caps and the stripper a job describes.

use std::sync::Arc;

use anyhow::{Context, Result};
use caplet_models::instruments::{CapFloor, IborIndex};
use caplet_models::market_data::{InterpolatedCurve, MultiCurve, YieldCurve};
use caplet_models::models::SabrHaganSmile;
use caplet_stripping::vol_function::{SmileParameterCurve, SmileParameterTermStructure};
use caplet_stripping::{
    CapletStripper, CapletStrippingResult, DirectStripper, MultiCapFloorPricer, PSplineStripper, SmileModelStripper,
    TermStructureStripper,
};
use tracing::{debug, info};

use crate::config::{CapKind, CurveConfig, JobConfig, StrategyConfig};

fn build_curve(config: &CurveConfig) -> Result<Arc<dyn YieldCurve>> {
    let curve = InterpolatedCurve::new(&config.tenors, &config.rates, config.interpolation)?;
    Ok(Arc::new(curve))
}

/// Discount curve, plus the projection curve for the job's index if given.
pub fn build_curves(job: &JobConfig) -> Result<MultiCurve> {
    let discount = build_curve(&job.discount).context("building discount curve")?;
    let mut curves = MultiCurve::new(discount);
    if let Some(projection) = &job.projection {
        let curve = build_curve(projection).context("building projection curve")?;
        curves = curves.with_projection(job.index.name.clone(), curve);
    }
    Ok(curves)
}

/// The job's caps on a shared caplet universe.
pub fn build_pricer(job: &JobConfig) -> Result<Arc<MultiCapFloorPricer>> {
    let curves = build_curves(job)?;
    let index = IborIndex::new(job.index.name.clone(), job.index.tenor)?;
    let caps = job
        .caps
        .iter()
        .enumerate()
        .map(|(i, cap)| {
            CapFloor::from_schedule(
                index.clone(),
                cap.strike,
                cap.kind == CapKind::Cap,
                cap.start,
                cap.end,
                &curves,
            )
            .with_context(|| format!("building cap {i}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let pricer = MultiCapFloorPricer::new(caps)?;
    debug!(
        num_caps = pricer.num_caps(),
        num_caplets = pricer.num_caplets(),
        "caplet universe built"
    );
    Ok(Arc::new(pricer))
}

/// The stripper selected by the job.
pub fn build_stripper(job: &JobConfig, pricer: Arc<MultiCapFloorPricer>) -> Result<Box<dyn CapletStripper>> {
    let config = job.stripper;
    let stripper: Box<dyn CapletStripper> = match &job.strategy {
        StrategyConfig::Direct => Box::new(DirectStripper::new(pricer, config)?),
        StrategyConfig::TermStructure { knots, interpolation } => Box::new(TermStructureStripper::new(
            pricer,
            knots.clone(),
            *interpolation,
            config,
        )?),
        StrategyConfig::Pspline { surface: false } => Box::new(PSplineStripper::term_structure(pricer, config)?),
        StrategyConfig::Pspline { surface: true } => Box::new(PSplineStripper::surface(pricer, config)?),
        StrategyConfig::Sabr { .. } => {
            let map = SmileParameterTermStructure::new(vec![SmileParameterCurve::Constant; 4]);
            Box::new(SmileModelStripper::new(
                pricer,
                Arc::new(SabrHaganSmile::new()),
                Arc::new(map),
                config,
            )?)
        }
    };
    Ok(stripper)
}

/// Run the job's stripper on its market data.
pub fn strip(job: &JobConfig, stripper: &dyn CapletStripper) -> Result<CapletStrippingResult> {
    let guess = match &job.strategy {
        StrategyConfig::Sabr { guess } => Some(guess.as_slice()),
        _ => None,
    };
    info!(
        strategy = job.strategy.name(),
        data_type = %job.market.data_type,
        num_caps = job.caps.len(),
        "Stripping"
    );
    let result = stripper
        .solve(
            &job.market.values,
            job.market.data_type,
            job.market.errors.as_deref(),
            guess,
        )
        .with_context(|| format!("{} stripping failed", job.strategy.name()))?;
    Ok(result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use caplet_stripping::{MarketDataType, StrippingMethod};

    pub(crate) const JOB: &str = r#"
        [discount]
        tenors = [0.5, 1.0, 3.0, 5.0]
        rates = [0.02, 0.022, 0.026, 0.03]

        [index]
        name = "EUR-EURIBOR-6M"
        tenor = 0.5

        [[caps]]
        strike = 0.03
        start = 0.5
        end = 2.0

        [[caps]]
        strike = 0.03
        start = 0.5
        end = 3.0

        [[caps]]
        strike = 0.03
        start = 0.5
        end = 4.0

        [market]
        type = "vol"
        values = [0.26, 0.25, 0.235]

        [strategy]
        type = "term_structure"
    "#;

    #[test]
    fn test_build_pricer() {
        let job: JobConfig = JOB.parse().unwrap();
        let pricer = build_pricer(&job).unwrap();
        assert_eq!(pricer.num_caps(), 3);
        assert_eq!(pricer.num_caplets(), 7);
    }

    #[test]
    fn test_projection_curve_moves_prices() {
        let job: JobConfig = JOB.parse().unwrap();
        let with_projection = format!(
            "{}\n[projection]\ntenors = [0.5, 5.0]\nrates = [0.04, 0.045]\n",
            JOB
        );
        let projected: JobConfig = with_projection.parse().unwrap();
        let vols = vec![0.2; 7];
        let base = build_pricer(&job).unwrap().price(&vols).unwrap();
        let higher = build_pricer(&projected).unwrap().price(&vols).unwrap();
        assert!(higher[0] > base[0]);
    }

    #[test]
    fn test_strip_term_structure_job() {
        let job: JobConfig = JOB.parse().unwrap();
        let pricer = build_pricer(&job).unwrap();
        let stripper = build_stripper(&job, pricer).unwrap();
        let result = strip(&job, stripper.as_ref()).unwrap();
        assert_eq!(result.method(), StrippingMethod::RootFind);
        for (m, v) in result.model_cap_vols().unwrap().iter().zip(&job.market.values) {
            assert!((m - v).abs() < 1e-8);
        }
    }

    #[test]
    fn test_every_strategy_builds() {
        for strategy in [
            "type = \"direct\"",
            "type = \"pspline\"",
            "type = \"pspline\"\n        surface = true",
            "type = \"sabr\"\n        guess = [0.03, 0.5, -0.2, 0.3]",
        ] {
            let job: JobConfig = JOB.replace("type = \"term_structure\"", strategy).parse().unwrap();
            let pricer = build_pricer(&job).unwrap();
            let stripper = build_stripper(&job, pricer).unwrap();
            assert!(stripper.imp().num_model_parameters() > 0, "{strategy}");
        }
    }

    #[test]
    fn test_strip_error_carries_strategy_context() {
        let job: JobConfig = JOB
            .replace("type = \"vol\"", "type = \"price\"")
            .replace("values = [0.26, 0.25, 0.235]", "values = [-1.0, -1.0, -1.0]")
            .parse()
            .unwrap();
        assert_eq!(job.market.data_type, MarketDataType::Price);
        let pricer = build_pricer(&job).unwrap();
        let stripper = build_stripper(&job, pricer).unwrap();
        let err = strip(&job, stripper.as_ref()).unwrap_err();
        assert!(err.to_string().contains("term_structure stripping failed"));
    }
}
