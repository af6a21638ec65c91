//! Yield curves for discounting and forward-rate projection.

use caplet_core::math::interpolators::{Interpolator, LinearInterpolator};

use super::error::MarketDataError;

/// Yield curve interface for discount factor and rate calculations.
///
/// # Invariants
///
/// - D(0) = 1
/// - D(t) > 0 for all t >= 0
///
/// # Example
///
/// ```
/// use caplet_models::market_data::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.05);
///
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - 0.951229).abs() < 1e-5);
///
/// // Simply compounded forward over [1, 1.5]
/// let fwd = curve.simple_forward_rate(1.0, 1.5, 0.5).unwrap();
/// assert!((fwd - ((0.025_f64).exp() - 1.0) / 0.5).abs() < 1e-12);
/// ```
pub trait YieldCurve: Send + Sync + std::fmt::Debug {
    /// Discount factor `D(t)`.
    ///
    /// # Errors
    ///
    /// * `MarketDataError::InvalidMaturity` - If t < 0
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Continuously compounded zero rate, `r(t) = −ln D(t) / t`.
    fn zero_rate(&self, t: f64) -> Result<f64, MarketDataError> {
        if t <= 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Simply compounded forward rate over `[t1, t2]` with year fraction `accrual`.
    ///
    /// ```text
    /// L(t1, t2) = (D(t1) / D(t2) − 1) / τ
    /// ```
    fn simple_forward_rate(&self, t1: f64, t2: f64, accrual: f64) -> Result<f64, MarketDataError> {
        if t2 <= t1 || accrual <= 0.0 {
            return Err(MarketDataError::InvalidMaturity { t: t2 });
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok((df1 / df2 - 1.0) / accrual)
    }
}

/// Flat yield curve with a constant continuously compounded rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve {
    rate: f64,
}

impl FlatCurve {
    /// Construct a flat curve with the given constant rate.
    #[inline]
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Return the constant rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl YieldCurve for FlatCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok((-self.rate * t).exp())
    }

    fn zero_rate(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok(self.rate)
    }
}

/// Interpolation method for yield curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CurveInterpolation {
    /// Linear interpolation on zero rates.
    #[default]
    Linear,

    /// Linear interpolation on `ln D(t)`, i.e. piecewise constant forwards.
    LogLinear,
}

/// Yield curve interpolated between (tenor, zero rate) pillars.
///
/// Queries beyond the last pillar hold the zero rate flat; queries before the
/// first pillar hold it flat back to `t = 0`.
///
/// # Example
///
/// ```
/// use caplet_models::market_data::{CurveInterpolation, InterpolatedCurve, YieldCurve};
///
/// let curve = InterpolatedCurve::new(
///     &[0.5, 1.0, 2.0, 5.0],
///     &[0.02, 0.025, 0.03, 0.035],
///     CurveInterpolation::Linear,
/// ).unwrap();
///
/// assert!((curve.zero_rate(1.5).unwrap() - 0.0275).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedCurve {
    zero_rates: LinearInterpolator,
    log_discount: LinearInterpolator,
    method: CurveInterpolation,
}

impl InterpolatedCurve {
    /// Construct an interpolated curve from pillar points.
    ///
    /// # Errors
    ///
    /// * `MarketDataError::InsufficientData` - Fewer than 2 pillars
    /// * `MarketDataError::Interpolation` - Unsorted or mismatched pillars
    pub fn new(
        tenors: &[f64],
        rates: &[f64],
        method: CurveInterpolation,
    ) -> Result<Self, MarketDataError> {
        if tenors.len() < 2 {
            return Err(MarketDataError::InsufficientData {
                got: tenors.len(),
                need: 2,
            });
        }
        if let Some(&t) = tenors.iter().find(|&&t| t <= 0.0) {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        let zero_rates = LinearInterpolator::new(tenors, rates)?;
        let log_dfs: Vec<f64> = tenors.iter().zip(rates).map(|(t, r)| -r * t).collect();
        let log_discount = LinearInterpolator::new(tenors, &log_dfs)?;
        Ok(Self {
            zero_rates,
            log_discount,
            method,
        })
    }

    /// Pillar tenors.
    pub fn tenors(&self) -> &[f64] {
        self.zero_rates.xs()
    }

    /// Interpolation method.
    pub fn method(&self) -> CurveInterpolation {
        self.method
    }
}

impl YieldCurve for InterpolatedCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        let (t_min, t_max) = self.zero_rates.domain();
        let log_df = match self.method {
            CurveInterpolation::LogLinear if (t_min..=t_max).contains(&t) => {
                self.log_discount.interpolate(t)?
            }
            _ => -self.zero_rates.interpolate_flat(t) * t,
        };
        Ok(log_df.exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // FlatCurve Tests
    // ========================================

    #[test]
    fn test_flat_discount_factor() {
        let curve = FlatCurve::new(0.03);
        assert_relative_eq!(curve.discount_factor(0.0).unwrap(), 1.0);
        assert_relative_eq!(curve.discount_factor(2.0).unwrap(), (-0.06_f64).exp());
        assert!(curve.discount_factor(-1.0).is_err());
    }

    #[test]
    fn test_simple_forward_rejects_empty_period() {
        let curve = FlatCurve::new(0.03);
        assert!(curve.simple_forward_rate(1.0, 1.0, 0.25).is_err());
    }

    // ========================================
    // InterpolatedCurve Tests
    // ========================================

    #[test]
    fn test_interpolated_recovers_pillars() {
        let tenors = [1.0, 2.0, 3.0];
        let rates = [0.01, 0.02, 0.025];
        for method in [CurveInterpolation::Linear, CurveInterpolation::LogLinear] {
            let curve = InterpolatedCurve::new(&tenors, &rates, method).unwrap();
            for (t, r) in tenors.iter().zip(&rates) {
                assert_relative_eq!(curve.zero_rate(*t).unwrap(), *r, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_log_linear_constant_forward() {
        let curve =
            InterpolatedCurve::new(&[1.0, 2.0], &[0.02, 0.03], CurveInterpolation::LogLinear)
                .unwrap();
        // Forward between pillars is 0.04 continuously compounded
        let f1 = -(curve.discount_factor(1.5).unwrap() / curve.discount_factor(1.0).unwrap()).ln() / 0.5;
        let f2 = -(curve.discount_factor(2.0).unwrap() / curve.discount_factor(1.5).unwrap()).ln() / 0.5;
        assert_relative_eq!(f1, 0.04, epsilon = 1e-12);
        assert_relative_eq!(f2, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_extrapolation_of_zero_rate() {
        let curve =
            InterpolatedCurve::new(&[1.0, 2.0], &[0.02, 0.03], CurveInterpolation::Linear).unwrap();
        assert_relative_eq!(curve.zero_rate(10.0).unwrap(), 0.03, epsilon = 1e-14);
        assert_relative_eq!(curve.zero_rate(0.25).unwrap(), 0.02, epsilon = 1e-14);
    }

    #[test]
    fn test_insufficient_pillars() {
        assert!(matches!(
            InterpolatedCurve::new(&[1.0], &[0.02], CurveInterpolation::Linear),
            Err(MarketDataError::InsufficientData { got: 1, need: 2 })
        ));
    }
}
