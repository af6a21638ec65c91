//! Discount and forward-rate projection for caplet decomposition.

use std::collections::HashMap;
use std::sync::Arc;

use super::curves::YieldCurve;
use super::error::MarketDataError;

/// Supplies what a caplet needs from the market: its forward rate and the
/// discount factor to its payment date.
pub trait ForwardRateProvider: Send + Sync + std::fmt::Debug {
    /// Discount factor to `t`.
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Simply compounded forward rate of `index` over `[start, end]`.
    fn forward_rate(
        &self,
        index: &str,
        start: f64,
        end: f64,
        accrual: f64,
    ) -> Result<f64, MarketDataError>;
}

/// A discount curve plus optional per-index projection curves.
///
/// Indices without a projection curve are projected off the discount curve
/// (single-curve setup).
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::market_data::{FlatCurve, ForwardRateProvider, MultiCurve};
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.02)))
///     .with_projection("USD-LIBOR-3M", Arc::new(FlatCurve::new(0.025)));
///
/// let df = curves.discount_factor(1.0).unwrap();
/// let fwd = curves.forward_rate("USD-LIBOR-3M", 1.0, 1.25, 0.25).unwrap();
/// assert!((df - (-0.02_f64).exp()).abs() < 1e-15);
/// assert!(fwd > 0.025);
/// ```
#[derive(Debug, Clone)]
pub struct MultiCurve {
    discount: Arc<dyn YieldCurve>,
    projection: HashMap<String, Arc<dyn YieldCurve>>,
}

impl MultiCurve {
    /// Single-curve setup on `discount`.
    pub fn new(discount: Arc<dyn YieldCurve>) -> Self {
        Self {
            discount,
            projection: HashMap::new(),
        }
    }

    /// Project `index` off `curve`.
    pub fn with_projection(mut self, index: impl Into<String>, curve: Arc<dyn YieldCurve>) -> Self {
        self.projection.insert(index.into(), curve);
        self
    }

    /// The discount curve.
    pub fn discount_curve(&self) -> &Arc<dyn YieldCurve> {
        &self.discount
    }

    fn projection_curve(&self, index: &str) -> &Arc<dyn YieldCurve> {
        self.projection.get(index).unwrap_or(&self.discount)
    }
}

impl ForwardRateProvider for MultiCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        let df = self.discount.discount_factor(t)?;
        if !(df > 0.0 && df.is_finite()) {
            return Err(MarketDataError::InvalidDiscountFactor { t, df });
        }
        Ok(df)
    }

    fn forward_rate(
        &self,
        index: &str,
        start: f64,
        end: f64,
        accrual: f64,
    ) -> Result<f64, MarketDataError> {
        self.projection_curve(index)
            .simple_forward_rate(start, end, accrual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::FlatCurve;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_curve_projection() {
        let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
        let fwd = curves.forward_rate("ANY", 0.5, 1.0, 0.5).unwrap();
        assert_relative_eq!(fwd, ((0.015_f64).exp() - 1.0) / 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_projection_curve_is_used() {
        let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.01)))
            .with_projection("EUR-6M", Arc::new(FlatCurve::new(0.04)));
        let projected = curves.forward_rate("EUR-6M", 1.0, 1.5, 0.5).unwrap();
        let discounted = curves.forward_rate("OTHER", 1.0, 1.5, 0.5).unwrap();
        assert!(projected > discounted);
    }
}
