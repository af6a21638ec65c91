//! Ready-made stripping strategies.
//!
//! Each [`CapletStripper`] wires a volatility parameterisation, a penalty,
//! an optional constraint and a default starting guess around one
//! [`CapletStrippingImp`], and exposes the same `solve` contract:
//!
//! | Strategy | Parameters | Penalty | Constraint | Default guess |
//! |----------|------------|---------|------------|---------------|
//! | [`DirectStripper`] | caplet vols | expiry and strike roughness | none | mean cap vol |
//! | [`TermStructureStripper`] | log vols at knots | when knots exceed caps | none | cap vols per knot |
//! | [`PSplineStripper`] | B-spline coefficients | coefficient roughness | vols ≥ 0 | flat |
//! | [`SmileModelStripper`] | smile parameter map | none | none | required |
//!
//! Price quotes without errors are weighted by the inverse cap vega at the
//! market implied volatility, so price and volatility fits are on the same
//! scale. The smile strategy uses unit weights.

mod direct;
mod pspline;
mod smile;
mod term_structure;

pub use direct::DirectStripper;
pub use pspline::PSplineStripper;
pub use smile::SmileModelStripper;
pub use term_structure::TermStructureStripper;

use std::fmt;

use caplet_core::math::solvers::{LMConfig, NewtonConfig};

use crate::error::StrippingError;
use crate::imp::{CapletStrippingImp, MarketDataType};
use crate::result::CapletStrippingResult;

/// Smallest price error derived from a cap vega.
const MIN_PRICE_ERROR: f64 = 1e-12;

/// A calibrator with a uniform solve contract.
pub trait CapletStripper: Send + Sync + fmt::Debug {
    /// Fit to `market_values`, one per cap, of the given type.
    ///
    /// # Errors
    ///
    /// * `StrippingError::MarketDataMismatch` - wrong number of values
    /// * `StrippingError::NotSupported` - the strategy cannot run with these inputs
    /// * any validation or solver error from [`CapletStrippingImp`]
    fn solve(
        &self,
        market_values: &[f64],
        data_type: MarketDataType,
        errors: Option<&[f64]>,
        guess: Option<&[f64]>,
    ) -> Result<CapletStrippingResult, StrippingError>;

    /// The underlying engine.
    fn imp(&self) -> &CapletStrippingImp;
}

/// Shared strategy settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StripperConfig {
    /// Least-squares solver settings.
    pub lm: LMConfig,
    /// Root-finder settings.
    pub newton: NewtonConfig,
    /// Difference order of the roughness penalties.
    pub penalty_order: usize,
    /// Penalty weight along expiry.
    pub lambda_time: f64,
    /// Penalty weight along strike.
    pub lambda_strike: f64,
    /// Degree of the P-spline bases.
    pub spline_degree: usize,
    /// Number of P-spline functions along expiry.
    pub spline_functions_time: usize,
    /// Number of P-spline functions along strike.
    pub spline_functions_strike: usize,
    /// Penalty weight on P-spline coefficients, the same in every direction.
    pub spline_lambda: f64,
    /// Flat volatility used as a starting guess.
    pub default_vol: f64,
}

impl Default for StripperConfig {
    fn default() -> Self {
        Self {
            lm: LMConfig::default(),
            newton: NewtonConfig::default(),
            penalty_order: 2,
            lambda_time: 1e-3,
            lambda_strike: 1e-3,
            spline_degree: 3,
            spline_functions_time: 8,
            spline_functions_strike: 6,
            spline_lambda: 1e-3,
            default_vol: 0.3,
        }
    }
}

/// Flat cap volatilities implied by the market values.
pub(crate) fn market_cap_vols(
    imp: &CapletStrippingImp,
    values: &[f64],
    data_type: MarketDataType,
) -> Result<Vec<f64>, StrippingError> {
    match data_type {
        MarketDataType::Vol => Ok(values.to_vec()),
        MarketDataType::Price => imp.pricer().implied_vols(values),
    }
}

/// Caller errors, or vega-scaled errors for price quotes.
pub(crate) fn errors_or_default(
    imp: &CapletStrippingImp,
    values: &[f64],
    data_type: MarketDataType,
    errors: Option<&[f64]>,
) -> Result<Option<Vec<f64>>, StrippingError> {
    match (errors, data_type) {
        (Some(errors), _) => Ok(Some(errors.to_vec())),
        (None, MarketDataType::Vol) => Ok(None),
        (None, MarketDataType::Price) => {
            let vols = imp.pricer().implied_vols(values)?;
            let vegas = imp.pricer().cap_vega(&vols)?;
            Ok(Some(vegas.into_iter().map(|v| v.max(MIN_PRICE_ERROR)).collect()))
        }
    }
}
