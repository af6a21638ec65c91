//! Stripping results.
//!
//! A result stores the fitted parameters and the achieved chi-square. Every
//! other quantity is recomputed on access from the parameters, the volatility
//! function and the pricer the fit was made with.

use std::sync::Arc;

use caplet_core::math::functions::VectorFunction;

use crate::error::StrippingError;
use crate::pricer::MultiCapFloorPricer;
use crate::vol_function::DiscreteVolatilityFunction;

/// How the parameters were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StrippingMethod {
    /// Weighted (possibly penalised) least squares.
    LeastSquares,
    /// Exact root of the residuals.
    RootFind,
}

/// One caplet volatility at its `(expiry, strike)` point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapletVolatilityPoint {
    /// Caplet fixing time
    pub expiry: f64,
    /// Caplet strike
    pub strike: f64,
    /// Fitted volatility
    pub volatility: f64,
}

/// Outcome of a stripping solve.
#[derive(Debug, Clone)]
pub struct CapletStrippingResult {
    method: StrippingMethod,
    fit_parameters: Vec<f64>,
    chi_square: f64,
    iterations: usize,
    pricer: Arc<MultiCapFloorPricer>,
    vol_function: Arc<DiscreteVolatilityFunction>,
}

impl CapletStrippingResult {
    /// Result of a least-squares fit.
    pub fn least_squares(
        fit_parameters: Vec<f64>,
        chi_square: f64,
        iterations: usize,
        pricer: Arc<MultiCapFloorPricer>,
        vol_function: Arc<DiscreteVolatilityFunction>,
    ) -> Self {
        Self {
            method: StrippingMethod::LeastSquares,
            fit_parameters,
            chi_square,
            iterations,
            pricer,
            vol_function,
        }
    }

    /// Result of a root find; its chi-square is zero.
    pub fn root_find(
        fit_parameters: Vec<f64>,
        iterations: usize,
        pricer: Arc<MultiCapFloorPricer>,
        vol_function: Arc<DiscreteVolatilityFunction>,
    ) -> Self {
        Self {
            method: StrippingMethod::RootFind,
            fit_parameters,
            chi_square: 0.0,
            iterations,
            pricer,
            vol_function,
        }
    }

    /// Solver used.
    pub fn method(&self) -> StrippingMethod {
        self.method
    }

    /// Fitted model parameters.
    pub fn fit_parameters(&self) -> &[f64] {
        &self.fit_parameters
    }

    /// Weighted sum of squared residuals, excluding any penalty.
    pub fn chi_square(&self) -> f64 {
        self.chi_square
    }

    /// Solver iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of caps fitted.
    pub fn num_caps(&self) -> usize {
        self.pricer.num_caps()
    }

    /// Pricer the fit was made with.
    pub fn pricer(&self) -> &Arc<MultiCapFloorPricer> {
        &self.pricer
    }

    /// Volatility function the fit was made with.
    pub fn vol_function(&self) -> &Arc<DiscreteVolatilityFunction> {
        &self.vol_function
    }

    /// Volatility of every universe caplet.
    pub fn caplet_volatilities(&self) -> Result<Vec<f64>, StrippingError> {
        Ok(self.vol_function.evaluate(&self.fit_parameters)?)
    }

    /// Caplet volatilities with their grid points.
    pub fn caplet_volatility_points(&self) -> Result<Vec<CapletVolatilityPoint>, StrippingError> {
        let vols = self.caplet_volatilities()?;
        Ok(self
            .vol_function
            .grid()
            .points()
            .iter()
            .zip(vols)
            .map(|(&(expiry, strike), volatility)| CapletVolatilityPoint {
                expiry,
                strike,
                volatility,
            })
            .collect())
    }

    /// Model cap values.
    pub fn model_cap_prices(&self) -> Result<Vec<f64>, StrippingError> {
        self.pricer.price(&self.caplet_volatilities()?)
    }

    /// Model cap-implied volatilities.
    pub fn model_cap_vols(&self) -> Result<Vec<f64>, StrippingError> {
        self.pricer.implied_vols(&self.model_cap_prices()?)
    }

    /// Model minus market cap volatility, per cap.
    pub fn cap_vol_errors(&self, market_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        if market_vols.len() != self.num_caps() {
            return Err(StrippingError::MarketDataMismatch {
                expected: self.num_caps(),
                got: market_vols.len(),
            });
        }
        Ok(self
            .model_cap_vols()?
            .into_iter()
            .zip(market_vols)
            .map(|(model, market)| model - market)
            .collect())
    }
}
