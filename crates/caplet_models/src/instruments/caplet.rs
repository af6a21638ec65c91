//! Single caplets and floorlets.
//!
//! A caplet pays `τ · max(L − K, 0)` at its payment date, where `L` is the
//! forward rate fixed at the fixing date for the accrual period `[start, end]`
//! and `τ` is the year fraction. Its value under Black is
//!
//! ```text
//! V = D(t_pay) · τ · Black(L, K, t_fix, σ)
//! ```

use crate::analytical::{black_intrinsic, black_price, black_vega};
use crate::market_data::ForwardRateProvider;

use super::error::InstrumentError;
use super::index::IborIndex;

/// Times (in years from valuation) describing one caplet period.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapletPeriod {
    fixing_time: f64,
    start_time: f64,
    end_time: f64,
    payment_time: f64,
    accrual: f64,
}

impl CapletPeriod {
    /// Create a period.
    ///
    /// # Errors
    ///
    /// `InstrumentError::InvalidPeriod` unless all times are finite and
    /// `0 < fixing_time <= start_time < end_time <= payment_time` with a
    /// positive accrual.
    pub fn new(
        fixing_time: f64,
        start_time: f64,
        end_time: f64,
        payment_time: f64,
        accrual: f64,
    ) -> Result<Self, InstrumentError> {
        let all = [fixing_time, start_time, end_time, payment_time, accrual];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(InstrumentError::invalid_period("times must be finite"));
        }
        if fixing_time <= 0.0 {
            return Err(InstrumentError::invalid_period(format!(
                "fixing time {fixing_time} must be positive"
            )));
        }
        if !(fixing_time <= start_time && start_time < end_time && end_time <= payment_time) {
            return Err(InstrumentError::invalid_period(format!(
                "require fixing <= start < end <= payment, got {fixing_time}, {start_time}, {end_time}, {payment_time}"
            )));
        }
        if accrual <= 0.0 {
            return Err(InstrumentError::invalid_period(format!(
                "accrual {accrual} must be positive"
            )));
        }
        Ok(Self {
            fixing_time,
            start_time,
            end_time,
            payment_time,
            accrual,
        })
    }

    /// Period fixing at its start and paying at its end, accruing `end − start`.
    pub fn from_start_end(start_time: f64, end_time: f64) -> Result<Self, InstrumentError> {
        Self::new(start_time, start_time, end_time, end_time, end_time - start_time)
    }

    /// Fixing (expiry) time.
    #[inline]
    pub fn fixing_time(&self) -> f64 {
        self.fixing_time
    }

    /// Accrual start.
    #[inline]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Accrual end.
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Payment time.
    #[inline]
    pub fn payment_time(&self) -> f64 {
        self.payment_time
    }

    /// Year fraction.
    #[inline]
    pub fn accrual(&self) -> f64 {
        self.accrual
    }
}

/// A caplet (call) or floorlet (put) with its market inputs resolved.
///
/// Immutable once built: the forward rate and discount factor are fixed at
/// construction.
///
/// # Example
///
/// ```
/// use caplet_models::instruments::{Caplet, CapletPeriod};
///
/// let period = CapletPeriod::from_start_end(1.0, 1.25).unwrap();
/// let caplet = Caplet::new(period, 0.03, true, 0.035, 0.97).unwrap();
///
/// assert!((caplet.intrinsic_value() - 0.97 * 0.25 * 0.005).abs() < 1e-15);
/// assert!(caplet.price(0.2) > caplet.intrinsic_value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Caplet {
    period: CapletPeriod,
    strike: f64,
    is_call: bool,
    forward: f64,
    discount_factor: f64,
}

impl Caplet {
    /// Create a caplet from explicit market inputs.
    ///
    /// # Errors
    ///
    /// * `InstrumentError::InvalidStrike` - strike not positive and finite
    /// * `InstrumentError::InvalidForward` - forward not positive and finite
    /// * `InstrumentError::InvalidPeriod` - discount factor not positive and finite
    pub fn new(
        period: CapletPeriod,
        strike: f64,
        is_call: bool,
        forward: f64,
        discount_factor: f64,
    ) -> Result<Self, InstrumentError> {
        if !(strike > 0.0 && strike.is_finite()) {
            return Err(InstrumentError::InvalidStrike { strike });
        }
        if !(forward > 0.0 && forward.is_finite()) {
            return Err(InstrumentError::InvalidForward {
                forward,
                fixing_time: period.fixing_time(),
            });
        }
        if !(discount_factor > 0.0 && discount_factor.is_finite()) {
            return Err(InstrumentError::invalid_period(format!(
                "discount factor {discount_factor} must be positive"
            )));
        }
        Ok(Self {
            period,
            strike,
            is_call,
            forward,
            discount_factor,
        })
    }

    /// Create a caplet on `index`, resolving forward and discount factor from `curves`.
    pub fn from_curves(
        period: CapletPeriod,
        strike: f64,
        is_call: bool,
        index: &IborIndex,
        curves: &dyn ForwardRateProvider,
    ) -> Result<Self, InstrumentError> {
        let forward = curves.forward_rate(
            index.name(),
            period.start_time(),
            period.end_time(),
            period.accrual(),
        )?;
        let discount_factor = curves.discount_factor(period.payment_time())?;
        Self::new(period, strike, is_call, forward, discount_factor)
    }

    /// Period times.
    #[inline]
    pub fn period(&self) -> &CapletPeriod {
        &self.period
    }

    /// Fixing time, the option expiry.
    #[inline]
    pub fn fixing_time(&self) -> f64 {
        self.period.fixing_time
    }

    /// Strike rate.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// `true` for a caplet, `false` for a floorlet.
    #[inline]
    pub fn is_call(&self) -> bool {
        self.is_call
    }

    /// Forward rate.
    #[inline]
    pub fn forward(&self) -> f64 {
        self.forward
    }

    /// Discount factor to payment.
    #[inline]
    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    /// `D(t_pay) · τ`, the scale turning an undiscounted Black price into value.
    #[inline]
    pub fn annuity(&self) -> f64 {
        self.discount_factor * self.period.accrual
    }

    /// Value at zero volatility.
    pub fn intrinsic_value(&self) -> f64 {
        self.annuity() * black_intrinsic(self.forward, self.strike, self.is_call)
    }

    /// Black value at volatility `vol`.
    pub fn price(&self, vol: f64) -> f64 {
        self.price_as(vol, self.is_call)
    }

    /// Black value as a caplet (`is_call`) or floorlet, regardless of this caplet's own type.
    pub fn price_as(&self, vol: f64, is_call: bool) -> f64 {
        self.annuity() * black_price(self.forward, self.strike, self.fixing_time(), vol, is_call)
    }

    /// Black vega `∂value/∂σ`.
    pub fn vega(&self, vol: f64) -> f64 {
        self.annuity() * black_vega(self.forward, self.strike, self.fixing_time(), vol)
    }

    /// Same period and strike with the opposite call/put flag.
    pub fn with_call(&self, is_call: bool) -> Self {
        Self { is_call, ..*self }
    }
}
