//! Standard normal distribution functions.
//!
//! `norm_cdf` is computed from the complementary error function, which keeps
//! full relative precision deep in the lower tail. Implied volatility
//! inversion relies on that accuracy for far out-of-the-money caplets.

use statrs::function::erf::erfc;

/// 1 / sqrt(2 * pi)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal cumulative distribution function.
///
/// # Mathematical Definition
/// Φ(x) = (1/2) * erfc(-x / sqrt(2))
///
/// # Examples
/// ```
/// use caplet_models::analytical::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0) - 0.5).abs() < 1e-15);
/// assert!((norm_cdf(1.96) - 0.975_002_104_851_780).abs() < 1e-12);
/// ```
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal probability density function.
///
/// # Mathematical Definition
/// φ(x) = (1 / sqrt(2π)) * exp(-x² / 2)
///
/// # Examples
/// ```
/// use caplet_models::analytical::distributions::norm_pdf;
///
/// assert!((norm_pdf(0.0) - 0.398_942_280_401_432_7).abs() < 1e-15);
/// ```
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cdf_symmetry() {
        for &x in &[0.1, 0.7, 1.5, 3.0, 6.0] {
            assert_relative_eq!(norm_cdf(x) + norm_cdf(-x), 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_cdf_lower_tail_precision() {
        // Φ(-10) ≈ 7.6198530241605e-24
        assert_relative_eq!(norm_cdf(-10.0), 7.619_853_024_160_5e-24, max_relative = 1e-10);
    }

    #[test]
    fn test_pdf_is_derivative_of_cdf() {
        let h = 1e-6;
        for &x in &[-2.0, -0.3, 0.0, 1.1] {
            let fd = (norm_cdf(x + h) - norm_cdf(x - h)) / (2.0 * h);
            assert_relative_eq!(norm_pdf(x), fd, epsilon = 1e-9);
        }
    }
}
