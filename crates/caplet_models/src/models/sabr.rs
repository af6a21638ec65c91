//! SABR smile via the Hagan et al. (2002) lognormal expansion.
//!
//! The SABR dynamics
//! ```text
//! dF = α F^β dW_F
//! dα = ν α dW_α
//! E[dW_F dW_α] = ρ dt
//! ```
//! give, to first order in `T`, the Black volatility
//! ```text
//! σ(K) = α / [(FK)^((1−β)/2) D] · z/x(z) · [1 + ((1−β)²α²/(24(FK)^(1−β)) + ρβνα/(4(FK)^((1−β)/2)) + (2−3ρ²)ν²/24) T]
//! D    = 1 + (1−β)² ln²(F/K)/24 + (1−β)⁴ ln⁴(F/K)/1920
//! z    = (ν/α) (FK)^((1−β)/2) ln(F/K)
//! x(z) = ln[(√(1−2ρz+z²) + z − ρ) / (1−ρ)]
//! ```
//!
//! Near the money `z/x(z)` is replaced by its series
//! `1 − ρz/2 + (2−3ρ²)z²/12`, which is smooth through `z = 0` and keeps the
//! parameter derivatives well defined there.

use caplet_core::math::linalg::{zeros, Matrix};
use caplet_core::types::dual::AdScalar;
use caplet_core::validation::ensure_length;

use super::error::ModelError;
use super::smile::SmileModel;

/// Below this `|z|` the series for `z/x(z)` is used.
const SERIES_THRESHOLD: f64 = 1e-4;

/// Parameter order: `[alpha, beta, rho, nu]`.
const PARAMETER_NAMES: [&str; 4] = ["alpha", "beta", "rho", "nu"];

/// SABR smile with the Hagan lognormal volatility formula.
///
/// Parameters are `[alpha, beta, rho, nu]` with `alpha > 0`, `0 ≤ beta ≤ 1`,
/// `−1 < rho < 1` and `nu ≥ 0`.
///
/// # Example
///
/// ```
/// use caplet_models::models::{SabrHaganSmile, SmileModel};
///
/// let sabr = SabrHaganSmile::new();
/// let params = [0.03, 0.5, -0.2, 0.4];
/// let vols = sabr.volatilities(0.03, &[0.02, 0.03, 0.04], 2.0, &params).unwrap();
///
/// // Negative correlation skews volatility towards low strikes
/// assert!(vols[0] > vols[1] && vols[1] > vols[2]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SabrHaganSmile;

impl SabrHaganSmile {
    /// Create the smile.
    pub fn new() -> Self {
        Self
    }

    /// Check a parameter vector against the admissible region.
    pub fn validate(params: &[f64]) -> Result<(), ModelError> {
        ensure_length(params, PARAMETER_NAMES.len(), "SABR parameters")?;
        let (alpha, beta, rho, nu) = (params[0], params[1], params[2], params[3]);
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(ModelError::invalid_parameter("alpha", alpha));
        }
        if !(0.0..=1.0).contains(&beta) {
            return Err(ModelError::invalid_parameter("beta", beta));
        }
        if !(rho > -1.0 && rho < 1.0) {
            return Err(ModelError::invalid_parameter("rho", rho));
        }
        if !(nu >= 0.0 && nu.is_finite()) {
            return Err(ModelError::invalid_parameter("nu", nu));
        }
        Ok(())
    }

    fn check_inputs(forward: f64, expiry: f64) -> Result<(), ModelError> {
        if !(forward > 0.0 && forward.is_finite()) {
            return Err(ModelError::InvalidInput {
                name: "forward".to_string(),
                value: forward,
            });
        }
        if !(expiry >= 0.0 && expiry.is_finite()) {
            return Err(ModelError::InvalidInput {
                name: "expiry".to_string(),
                value: expiry,
            });
        }
        Ok(())
    }

    fn check_strike(strike: f64) -> Result<(), ModelError> {
        if !(strike > 0.0 && strike.is_finite()) {
            return Err(ModelError::InvalidInput {
                name: "strike".to_string(),
                value: strike,
            });
        }
        Ok(())
    }

    #[cfg(feature = "num-dual-mode")]
    fn dual_adjoint(
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        params: &[f64],
    ) -> Result<Matrix, ModelError> {
        use caplet_core::types::dual::DualNumber;

        let mut adjoint = zeros(strikes.len(), params.len());
        for j in 0..params.len() {
            let seeded: Vec<DualNumber> = params
                .iter()
                .enumerate()
                .map(|(i, &p)| DualNumber::new(p, if i == j { 1.0 } else { 0.0 }))
                .collect();
            for (row, &strike) in adjoint.iter_mut().zip(strikes) {
                let vol = hagan_volatility(
                    forward, strike, expiry, seeded[0], seeded[1], seeded[2], seeded[3],
                );
                if !(vol.re.is_finite() && vol.eps.is_finite()) {
                    return Err(ModelError::NonFinite { strike });
                }
                row[j] = vol.eps;
            }
        }
        Ok(adjoint)
    }
}

impl SmileModel for SabrHaganSmile {
    fn num_parameters(&self) -> usize {
        PARAMETER_NAMES.len()
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &PARAMETER_NAMES
    }

    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        params: &[f64],
    ) -> Result<f64, ModelError> {
        Self::validate(params)?;
        Self::check_inputs(forward, expiry)?;
        Self::check_strike(strike)?;
        let vol = hagan_volatility(
            forward, strike, expiry, params[0], params[1], params[2], params[3],
        );
        if vol.is_finite() {
            Ok(vol)
        } else {
            Err(ModelError::NonFinite { strike })
        }
    }

    /// Exact parameter derivatives by forward-mode dual numbers when
    /// `num-dual-mode` is enabled, otherwise central finite differences.
    fn model_adjoint(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        params: &[f64],
    ) -> Result<Matrix, ModelError> {
        Self::validate(params)?;
        Self::check_inputs(forward, expiry)?;
        for &k in strikes {
            Self::check_strike(k)?;
        }

        #[cfg(feature = "num-dual-mode")]
        {
            Self::dual_adjoint(forward, strikes, expiry, params)
        }

        #[cfg(not(feature = "num-dual-mode"))]
        {
            let mut adjoint = zeros(strikes.len(), params.len());
            let mut bumped = params.to_vec();
            for j in 0..params.len() {
                let h = 1e-7 * params[j].abs().max(1e-2);
                bumped[j] = params[j] + h;
                let up: Vec<f64> = strikes
                    .iter()
                    .map(|&k| {
                        hagan_volatility(forward, k, expiry, bumped[0], bumped[1], bumped[2], bumped[3])
                    })
                    .collect();
                bumped[j] = params[j] - h;
                for (row, (&k, u)) in adjoint.iter_mut().zip(strikes.iter().zip(&up)) {
                    let d = hagan_volatility(
                        forward, k, expiry, bumped[0], bumped[1], bumped[2], bumped[3],
                    );
                    row[j] = (u - d) / (2.0 * h);
                    if !row[j].is_finite() {
                        return Err(ModelError::NonFinite { strike: k });
                    }
                }
                bumped[j] = params[j];
            }
            Ok(adjoint)
        }
    }
}

/// Hagan lognormal volatility, generic over the parameter scalar.
#[allow(clippy::too_many_arguments)]
fn hagan_volatility<S: AdScalar>(
    forward: f64,
    strike: f64,
    expiry: f64,
    alpha: S,
    beta: S,
    rho: S,
    nu: S,
) -> S {
    let one = S::constant(1.0);
    let c = S::constant;

    let one_minus_beta = one - beta;
    let log_fk = c((forward / strike).ln());
    let fk = c(forward * strike);

    // (FK)^((1-β)/2)
    let fk_pow_half = fk.pow(one_minus_beta * c(0.5));

    let log_fk_2 = log_fk * log_fk;
    let omb_2 = one_minus_beta * one_minus_beta;
    let d = one + omb_2 / c(24.0) * log_fk_2 + omb_2 * omb_2 / c(1920.0) * log_fk_2 * log_fk_2;

    let z = nu / alpha * fk_pow_half * log_fk;
    let base = alpha / (fk_pow_half * d);

    let term1 = omb_2 / c(24.0) * alpha * alpha / (fk_pow_half * fk_pow_half);
    let term2 = rho * beta * nu * alpha / (c(4.0) * fk_pow_half);
    let term3 = (c(2.0) - c(3.0) * rho * rho) / c(24.0) * nu * nu;
    let expansion = one + (term1 + term2 + term3) * c(expiry);

    base * z_over_x(z, rho) * expansion
}

/// `z / x(z)` with the near-the-money series.
fn z_over_x<S: AdScalar>(z: S, rho: S) -> S {
    let one = S::constant(1.0);
    if z.value().abs() < SERIES_THRESHOLD {
        return one - rho * z * S::constant(0.5)
            + (S::constant(2.0) - S::constant(3.0) * rho * rho) * z * z / S::constant(12.0);
    }
    let root = (one - S::constant(2.0) * rho * z + z * z).sqrt();
    let x = ((root + z - rho) / (one - rho)).ln();
    z / x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: [f64; 4] = [0.035, 0.6, -0.3, 0.5];

    // ========================================
    // Validation Tests
    // ========================================

    #[test]
    fn test_parameter_validation() {
        assert!(SabrHaganSmile::validate(&PARAMS).is_ok());
        assert!(matches!(
            SabrHaganSmile::validate(&[0.0, 0.5, 0.0, 0.3]),
            Err(ModelError::InvalidParameter { .. })
        ));
        assert!(SabrHaganSmile::validate(&[0.03, 1.1, 0.0, 0.3]).is_err());
        assert!(SabrHaganSmile::validate(&[0.03, 0.5, 1.0, 0.3]).is_err());
        assert!(SabrHaganSmile::validate(&[0.03, 0.5, 0.0, -0.1]).is_err());
        assert!(matches!(
            SabrHaganSmile::validate(&[0.03, 0.5, 0.0]),
            Err(ModelError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_strike_rejected() {
        let sabr = SabrHaganSmile::new();
        assert!(sabr.volatility(0.03, -0.01, 1.0, &PARAMS).is_err());
    }

    // ========================================
    // Formula Tests
    // ========================================

    #[test]
    fn test_lognormal_no_volvol_is_flat() {
        // β = 1, ν = 0 reduces to Black with σ = α
        let sabr = SabrHaganSmile::new();
        let params = [0.25, 1.0, 0.0, 0.0];
        for k in [0.01, 0.03, 0.09] {
            let vol = sabr.volatility(0.03, k, 5.0, &params).unwrap();
            assert_relative_eq!(vol, 0.25, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_atm_matches_closed_form() {
        let sabr = SabrHaganSmile::new();
        let (f, t) = (0.03_f64, 2.0);
        let (alpha, beta, rho, nu) = (PARAMS[0], PARAMS[1], PARAMS[2], PARAMS[3]);
        let fb = f.powf(1.0 - beta);
        let expected = alpha / fb
            * (1.0
                + ((1.0 - beta).powi(2) / 24.0 * alpha * alpha / (fb * fb)
                    + rho * beta * nu * alpha / (4.0 * fb)
                    + (2.0 - 3.0 * rho * rho) / 24.0 * nu * nu)
                    * t);
        let vol = sabr.volatility(f, f, t, &PARAMS).unwrap();
        assert_relative_eq!(vol, expected, epsilon = 1e-14);
    }

    #[test]
    fn test_continuous_through_series_threshold() {
        // ln(F/K) sweeps across the |z| = 1e-4 switch in steps of 1e-6
        let sabr = SabrHaganSmile::new();
        let f = 0.03_f64;
        let vols: Vec<f64> = (0..100)
            .map(|i| {
                let k = f * (-(1e-5 + i as f64 * 1e-6)).exp();
                sabr.volatility(f, k, 1.0, &PARAMS).unwrap()
            })
            .collect();
        for pair in vols.windows(2) {
            assert!((pair[1] - pair[0]).abs() < 1e-6);
        }
        let atm = sabr.volatility(f, f, 1.0, &PARAMS).unwrap();
        assert!((vols[0] - atm).abs() < 1e-5);
    }

    // ========================================
    // Adjoint Tests
    // ========================================

    #[test]
    fn test_adjoint_matches_finite_difference() {
        let sabr = SabrHaganSmile::new();
        let strikes = [0.015, 0.025, 0.03, 0.04, 0.06];
        let (f, t) = (0.03, 3.0);
        let adjoint = sabr.model_adjoint(f, &strikes, t, &PARAMS).unwrap();
        assert_eq!(adjoint.len(), strikes.len());
        assert_eq!(adjoint[0].len(), 4);

        let h = 1e-6;
        for j in 0..4 {
            let mut up = PARAMS;
            let mut down = PARAMS;
            up[j] += h;
            down[j] -= h;
            let vu = sabr.volatilities(f, &strikes, t, &up).unwrap();
            let vd = sabr.volatilities(f, &strikes, t, &down).unwrap();
            for i in 0..strikes.len() {
                let fd = (vu[i] - vd[i]) / (2.0 * h);
                assert!(
                    (adjoint[i][j] - fd).abs() < 1e-5 * fd.abs().max(1.0),
                    "strike {} param {}: {} vs {}",
                    strikes[i],
                    PARAMETER_NAMES[j],
                    adjoint[i][j],
                    fd
                );
            }
        }
    }

    #[test]
    fn test_names_match_count() {
        let sabr = SabrHaganSmile::new();
        assert_eq!(sabr.parameter_names().len(), sabr.num_parameters());
    }
}
