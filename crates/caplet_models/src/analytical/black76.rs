//! Black (1976) lognormal formula for options on a forward rate.
//!
//! ## Mathematical Formulas
//!
//! **Call**: C = F·N(d₁) − K·N(d₂)
//! **Put**: P = K·N(−d₂) − F·N(−d₁)
//!
//! Where:
//! - d₁ = (ln(F/K) + σ²T/2) / (σ√T)
//! - d₂ = d₁ − σ√T
//!
//! Prices here are undiscounted and per unit notional and accrual; callers
//! multiply by discount factor and year fraction.
//!
//! The price depends on `|σ|`, and [`black_vega`] carries the sign of `σ`, so
//! the pair stays a consistent value/derivative for iterates that wander below
//! zero during an unconstrained fit.

use caplet_core::math::solvers::{BrentSolver, NewtonRaphsonSolver, SolverConfig};

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;

/// Standard deviations below this are treated as zero.
const MIN_STD_DEV: f64 = 1e-16;

/// Largest volatility searched by [`black_implied_vol`].
const MAX_IMPLIED_VOL: f64 = 1024.0;

/// Payoff at zero volatility, `max(F − K, 0)` or `max(K − F, 0)`.
#[inline]
pub fn black_intrinsic(forward: f64, strike: f64, is_call: bool) -> f64 {
    if is_call {
        (forward - strike).max(0.0)
    } else {
        (strike - forward).max(0.0)
    }
}

/// Undiscounted Black price.
///
/// # Examples
/// ```
/// use caplet_models::analytical::black76::black_price;
///
/// let call = black_price(0.03, 0.03, 2.0, 0.2, true);
/// let put = black_price(0.03, 0.03, 2.0, 0.2, false);
/// // ATM call and put have equal value
/// assert!((call - put).abs() < 1e-15);
/// assert!(call > 0.0);
/// ```
pub fn black_price(forward: f64, strike: f64, expiry: f64, volatility: f64, is_call: bool) -> f64 {
    let sd = volatility.abs() * expiry.max(0.0).sqrt();
    if !(sd > MIN_STD_DEV) {
        return black_intrinsic(forward, strike, is_call);
    }
    let d1 = ((forward / strike).ln() + 0.5 * sd * sd) / sd;
    let d2 = d1 - sd;
    if is_call {
        forward * norm_cdf(d1) - strike * norm_cdf(d2)
    } else {
        strike * norm_cdf(-d2) - forward * norm_cdf(-d1)
    }
}

/// Undiscounted Black vega `∂price/∂σ`, identical for calls and puts.
///
/// # Examples
/// ```
/// use caplet_models::analytical::black76::{black_price, black_vega};
///
/// let (f, k, t, v) = (0.03, 0.035, 1.5, 0.25);
/// let h = 1e-6;
/// let fd = (black_price(f, k, t, v + h, true) - black_price(f, k, t, v - h, true)) / (2.0 * h);
/// assert!((black_vega(f, k, t, v) - fd).abs() < 1e-9);
/// ```
pub fn black_vega(forward: f64, strike: f64, expiry: f64, volatility: f64) -> f64 {
    if expiry <= 0.0 {
        return 0.0;
    }
    let sqrt_t = expiry.sqrt();
    let sd = volatility.abs() * sqrt_t;
    if !(sd > MIN_STD_DEV) {
        return if forward == strike {
            forward * norm_pdf(0.0) * sqrt_t
        } else {
            0.0
        };
    }
    let d1 = ((forward / strike).ln() + 0.5 * sd * sd) / sd;
    let vega = forward * norm_pdf(d1) * sqrt_t;
    if volatility < 0.0 {
        -vega
    } else {
        vega
    }
}

/// Black implied volatility of an undiscounted price.
///
/// Newton-Raphson on vega starting from the inflection point
/// `σ₀ = sqrt(2|ln(F/K)|/T)`, falling back to Brent on a bracket when Newton
/// fails or leaves the admissible range. A price equal to intrinsic value
/// returns zero.
///
/// # Errors
/// - `AnalyticalError::InvalidForward` / `InvalidStrike` for non-positive inputs
/// - `AnalyticalError::PriceOutOfBounds` if no volatility reproduces `price`
/// - `AnalyticalError::NumericalInstability` if both root finders fail
///
/// # Examples
/// ```
/// use caplet_models::analytical::black76::{black_implied_vol, black_price};
///
/// let price = black_price(0.04, 0.05, 3.0, 0.31, true);
/// let vol = black_implied_vol(price, 0.04, 0.05, 3.0, true).unwrap();
/// assert!((vol - 0.31).abs() < 1e-10);
/// ```
pub fn black_implied_vol(
    price: f64,
    forward: f64,
    strike: f64,
    expiry: f64,
    is_call: bool,
) -> Result<f64, AnalyticalError> {
    if !(forward > 0.0 && forward.is_finite()) {
        return Err(AnalyticalError::InvalidForward { forward });
    }
    if !(strike > 0.0 && strike.is_finite()) {
        return Err(AnalyticalError::InvalidStrike { strike });
    }

    let lower = black_intrinsic(forward, strike, is_call);
    let upper = if is_call { forward } else { strike };
    let out_of_bounds = || AnalyticalError::PriceOutOfBounds {
        price,
        lower,
        upper,
    };

    let tiny = 1e-15 * upper;
    if !price.is_finite() || price < lower - tiny {
        return Err(out_of_bounds());
    }
    if price - lower <= tiny {
        return Ok(0.0);
    }
    if expiry <= 0.0 || price >= upper {
        return Err(out_of_bounds());
    }

    // Normalised by the forward so the tolerance is relative to the rate level
    let objective = |vol: f64| (black_price(forward, strike, expiry, vol, is_call) - price) / forward;
    let derivative = |vol: f64| black_vega(forward, strike, expiry, vol) / forward;
    let config = SolverConfig::new(1e-15, 100);

    let guess = (2.0 * (forward / strike).ln().abs() / expiry).sqrt();
    let newton = NewtonRaphsonSolver::new(config).find_root(objective, derivative, guess);
    if let Ok(vol) = newton {
        if vol.is_finite() && vol > 0.0 && vol <= MAX_IMPLIED_VOL {
            return Ok(vol);
        }
    }

    let mut hi = 1.0;
    while objective(hi) < 0.0 {
        hi *= 2.0;
        if hi > MAX_IMPLIED_VOL {
            return Err(out_of_bounds());
        }
    }
    BrentSolver::new(SolverConfig::new(1e-15, 200))
        .find_root(objective, 0.0, hi)
        .map_err(|err| AnalyticalError::NumericalInstability {
            message: format!("implied volatility search failed: {err}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    // ========================================
    // Price Tests
    // ========================================

    #[test]
    fn test_put_call_parity() {
        let (f, k, t, v) = (0.025, 0.03, 4.0, 0.35);
        let call = black_price(f, k, t, v, true);
        let put = black_price(f, k, t, v, false);
        assert_relative_eq!(call - put, f - k, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_vol_is_intrinsic() {
        assert_relative_eq!(black_price(0.05, 0.03, 1.0, 0.0, true), 0.02);
        assert_eq!(black_price(0.05, 0.03, 1.0, 0.0, false), 0.0);
        assert_eq!(black_price(0.05, 0.03, 0.0, 0.2, false), 0.0);
    }

    #[test]
    fn test_price_is_even_in_vol() {
        let p = black_price(0.03, 0.04, 2.0, 0.3, true);
        assert_eq!(p, black_price(0.03, 0.04, 2.0, -0.3, true));
        assert_relative_eq!(
            black_vega(0.03, 0.04, 2.0, -0.3),
            -black_vega(0.03, 0.04, 2.0, 0.3)
        );
    }

    #[test]
    fn test_known_value() {
        // F = K = 0.05, σ√T = 0.2: C = F·(2N(0.1) − 1)
        let expected = 0.05 * (2.0 * norm_cdf(0.1) - 1.0);
        assert_relative_eq!(black_price(0.05, 0.05, 1.0, 0.2, true), expected, epsilon = 1e-16);
    }

    #[test]
    fn test_atm_vega_at_zero_vol() {
        let v = black_vega(0.03, 0.03, 4.0, 0.0);
        assert_relative_eq!(v, 0.03 * norm_pdf(0.0) * 2.0, epsilon = 1e-15);
        assert_eq!(black_vega(0.03, 0.04, 4.0, 0.0), 0.0);
    }

    // ========================================
    // Implied Volatility Tests
    // ========================================

    #[test]
    fn test_implied_vol_far_otm() {
        let price = black_price(0.02, 0.08, 0.5, 0.4, true);
        let vol = black_implied_vol(price, 0.02, 0.08, 0.5, true).unwrap();
        assert_relative_eq!(vol, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_implied_vol_put_itm() {
        let price = black_price(0.02, 0.05, 2.0, 0.6, false);
        let vol = black_implied_vol(price, 0.02, 0.05, 2.0, false).unwrap();
        assert_relative_eq!(vol, 0.6, epsilon = 1e-10);
    }

    #[test]
    fn test_implied_vol_intrinsic_is_zero() {
        assert_eq!(black_implied_vol(0.01, 0.04, 0.03, 1.0, true).unwrap(), 0.0);
    }

    #[test]
    fn test_implied_vol_bounds() {
        assert!(matches!(
            black_implied_vol(0.005, 0.04, 0.03, 1.0, true),
            Err(AnalyticalError::PriceOutOfBounds { .. })
        ));
        assert!(matches!(
            black_implied_vol(0.05, 0.04, 0.03, 1.0, true),
            Err(AnalyticalError::PriceOutOfBounds { .. })
        ));
        assert!(matches!(
            black_implied_vol(0.01, -0.04, 0.03, 1.0, true),
            Err(AnalyticalError::InvalidForward { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_implied_vol_round_trip(
            vol in 0.05f64..1.5,
            moneyness in 0.5f64..2.0,
            expiry in 0.25f64..10.0,
            is_call in any::<bool>(),
        ) {
            let forward = 0.03;
            let strike = forward * moneyness;
            let price = black_price(forward, strike, expiry, vol, is_call);
            let time_value = price - black_intrinsic(forward, strike, is_call);
            // Skip prices indistinguishable from intrinsic in double precision
            prop_assume!(time_value > 1e-10 * forward);
            let implied = black_implied_vol(price, forward, strike, expiry, is_call).unwrap();
            prop_assert!((implied - vol).abs() < 1e-6);
        }
    }
}
