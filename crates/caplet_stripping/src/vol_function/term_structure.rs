//! Volatility as an interpolated curve in expiry.

use std::sync::Arc;

use caplet_core::math::functions::InterpolatedCurveFunction;
use caplet_core::math::interpolators::{Extrapolation, InterpolationMethod};
use caplet_core::validation::ensure_ascending_positive;

use super::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid};
use crate::error::StrippingError;

/// Parameters are curve values at fixed expiry knots; every grid point takes
/// the curve value at its expiry, whatever its strike.
///
/// # Example
///
/// ```
/// use caplet_core::math::functions::VectorFunction;
/// use caplet_core::math::interpolators::InterpolationMethod;
/// use caplet_stripping::vol_function::{
///     DiscreteVolatilityFunctionProvider, EvaluationGrid, InterpolatedTermStructureProvider,
/// };
///
/// let provider =
///     InterpolatedTermStructureProvider::new(vec![1.0, 3.0], InterpolationMethod::Linear).unwrap();
/// let grid = EvaluationGrid::new(vec![(2.0, 0.03), (2.0, 0.05)]).unwrap();
/// let f = provider.from_grid(&grid).unwrap();
/// assert_eq!(f.evaluate(&[0.2, 0.3]).unwrap(), vec![0.25, 0.25]);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedTermStructureProvider {
    knots: Vec<f64>,
    method: InterpolationMethod,
    extrapolation: Extrapolation,
}

impl InterpolatedTermStructureProvider {
    /// Curve on `knots` with flat extrapolation.
    ///
    /// # Errors
    ///
    /// `knots` must be non-empty, positive and strictly ascending.
    pub fn new(knots: Vec<f64>, method: InterpolationMethod) -> Result<Self, StrippingError> {
        ensure_ascending_positive(&knots, "knots")?;
        Ok(Self {
            knots,
            method,
            extrapolation: Extrapolation::Flat,
        })
    }

    /// Set the behaviour for expiries outside the knots.
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// The knots.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Number of model parameters.
    pub fn num_parameters(&self) -> usize {
        self.knots.len()
    }
}

impl DiscreteVolatilityFunctionProvider for InterpolatedTermStructureProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        let curve = InterpolatedCurveFunction::new(
            &self.knots,
            &grid.expiries(),
            self.method,
            self.extrapolation,
        )?;
        Ok(DiscreteVolatilityFunction::new(grid.clone(), Arc::new(curve))?)
    }
}
