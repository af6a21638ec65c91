//! Interest rate caps and floors as strips of caplets.
//!
//! # Payoff
//!
//! For each period i:
//! - **Caplet**: max(ForwardRate_i - Strike, 0) × YearFraction
//! - **Floorlet**: max(Strike - ForwardRate_i, 0) × YearFraction
//!
//! A cap's flat (cap-implied) volatility is the single σ that, applied to
//! every caplet, reproduces the cap's value.

use caplet_core::math::solvers::{BrentSolver, NewtonRaphsonSolver, SolverConfig};
use caplet_core::validation::ensure_ascending_positive;

use crate::analytical::AnalyticalError;
use crate::market_data::ForwardRateProvider;

use super::caplet::{Caplet, CapletPeriod};
use super::error::InstrumentError;
use super::index::IborIndex;

/// Largest flat volatility searched by [`CapFloor::implied_volatility`].
const MAX_IMPLIED_VOL: f64 = 1024.0;

/// An ordered, non-empty strip of caplets sharing one strike and call/put flag.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::instruments::{CapFloor, IborIndex};
/// use caplet_models::market_data::{FlatCurve, MultiCurve};
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
/// let index = IborIndex::new("USD-LIBOR", 0.25).unwrap();
///
/// // 2y cap starting in 3 months: 7 quarterly caplets
/// let cap = CapFloor::from_schedule(index, 0.03, true, 0.25, 2.0, &curves).unwrap();
/// assert_eq!(cap.num_caplets(), 7);
/// assert_eq!(cap.start_time(), 0.25);
/// assert_eq!(cap.end_time(), 2.0);
///
/// let price = cap.price(0.25);
/// let vol = cap.implied_volatility(price).unwrap();
/// assert!((vol - 0.25).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CapFloor {
    index: IborIndex,
    strike: f64,
    is_call: bool,
    caplets: Vec<Caplet>,
}

impl CapFloor {
    /// Build a cap/floor from its caplets.
    ///
    /// # Errors
    ///
    /// * `InstrumentError::EmptyCapletList` - no caplets
    /// * `InstrumentError::MixedStrikes` - caplets with different strikes
    /// * `InstrumentError::MixedCallPut` - caplets mixed with floorlets
    /// * `InstrumentError::Validation` - fixing times not positive and strictly ascending
    pub fn new(index: IborIndex, caplets: Vec<Caplet>) -> Result<Self, InstrumentError> {
        let first = caplets.first().ok_or(InstrumentError::EmptyCapletList)?;
        let (strike, is_call) = (first.strike(), first.is_call());
        for (i, caplet) in caplets.iter().enumerate().skip(1) {
            if caplet.strike() != strike {
                return Err(InstrumentError::MixedStrikes {
                    index: i,
                    expected: strike,
                    got: caplet.strike(),
                });
            }
            if caplet.is_call() != is_call {
                return Err(InstrumentError::MixedCallPut { index: i });
            }
        }
        let fixing_times: Vec<f64> = caplets.iter().map(Caplet::fixing_time).collect();
        ensure_ascending_positive(&fixing_times, "fixing_times")?;
        Ok(Self {
            index,
            strike,
            is_call,
            caplets,
        })
    }

    /// Build a spot- or forward-starting cap/floor with one caplet per index
    /// tenor between `start` and `end`.
    ///
    /// Each caplet fixes at its period start and pays at its period end.
    ///
    /// # Errors
    ///
    /// * `InstrumentError::InvalidPeriod` - `end − start` is not a whole number of tenors
    /// * any error from [`Caplet::from_curves`]
    pub fn from_schedule(
        index: IborIndex,
        strike: f64,
        is_call: bool,
        start: f64,
        end: f64,
        curves: &dyn ForwardRateProvider,
    ) -> Result<Self, InstrumentError> {
        let tenor = index.tenor();
        let periods = (end - start) / tenor;
        let n = periods.round();
        if !(n >= 1.0 && (periods - n).abs() < 1e-6) {
            return Err(InstrumentError::invalid_period(format!(
                "[{start}, {end}] is not a whole number of {tenor}y periods"
            )));
        }
        let n = n as usize;
        let caplets = (0..n)
            .map(|i| {
                let s = start + i as f64 * tenor;
                let e = if i + 1 == n { end } else { s + tenor };
                let period = CapletPeriod::from_start_end(s, e)?;
                Caplet::from_curves(period, strike, is_call, &index, curves)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(index, caplets)
    }

    /// Floating-rate index.
    #[inline]
    pub fn index(&self) -> &IborIndex {
        &self.index
    }

    /// Strike shared by every caplet.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// `true` for a cap, `false` for a floor.
    #[inline]
    pub fn is_call(&self) -> bool {
        self.is_call
    }

    /// Caplets in fixing order.
    #[inline]
    pub fn caplets(&self) -> &[Caplet] {
        &self.caplets
    }

    /// Number of caplets.
    #[inline]
    pub fn num_caplets(&self) -> usize {
        self.caplets.len()
    }

    /// Accrual start of the first caplet.
    pub fn start_time(&self) -> f64 {
        self.caplets[0].period().start_time()
    }

    /// Accrual end of the last caplet.
    pub fn end_time(&self) -> f64 {
        self.caplets[self.caplets.len() - 1].period().end_time()
    }

    /// Sum of caplet values at zero volatility.
    pub fn intrinsic_value(&self) -> f64 {
        self.caplets.iter().map(Caplet::intrinsic_value).sum()
    }

    /// Value with every caplet at the flat volatility `vol`.
    pub fn price(&self, vol: f64) -> f64 {
        self.caplets.iter().map(|c| c.price(vol)).sum()
    }

    /// Flat-volatility vega.
    pub fn vega(&self, vol: f64) -> f64 {
        self.caplets.iter().map(|c| c.vega(vol)).sum()
    }

    /// Value approached as volatility grows without bound.
    fn upper_bound(&self) -> f64 {
        self.caplets
            .iter()
            .map(|c| c.annuity() * if self.is_call { c.forward() } else { c.strike() })
            .sum()
    }

    /// Flat volatility reproducing `price`.
    ///
    /// Newton-Raphson on the flat vega inside an expanding bracket, with
    /// Brent as fallback. A price equal to intrinsic value returns zero.
    ///
    /// # Errors
    ///
    /// * `AnalyticalError::PriceOutOfBounds` - price below intrinsic or above the
    ///   infinite-volatility limit
    /// * `AnalyticalError::NumericalInstability` - both root finders failed
    pub fn implied_volatility(&self, price: f64) -> Result<f64, AnalyticalError> {
        let lower = self.intrinsic_value();
        let upper = self.upper_bound();
        let out_of_bounds = || AnalyticalError::PriceOutOfBounds {
            price,
            lower,
            upper,
        };
        let tiny = 1e-15 * upper;
        if !price.is_finite() || price < lower - tiny || price >= upper {
            return Err(out_of_bounds());
        }
        if price - lower <= tiny {
            return Ok(0.0);
        }

        let objective = |vol: f64| (self.price(vol) - price) / upper;
        let derivative = |vol: f64| self.vega(vol) / upper;

        let mut hi = 1.0;
        while objective(hi) < 0.0 {
            hi *= 2.0;
            if hi > MAX_IMPLIED_VOL {
                return Err(out_of_bounds());
            }
        }

        let newton = NewtonRaphsonSolver::new(SolverConfig::new(1e-15, 50))
            .find_root(objective, derivative, 0.5 * hi);
        if let Ok(vol) = newton {
            if vol.is_finite() && vol > 0.0 && vol <= hi {
                return Ok(vol);
            }
        }
        BrentSolver::new(SolverConfig::new(1e-15, 200))
            .find_root(objective, 0.0, hi)
            .map_err(|err| AnalyticalError::NumericalInstability {
                message: format!("cap implied volatility search failed: {err}"),
            })
    }
}
