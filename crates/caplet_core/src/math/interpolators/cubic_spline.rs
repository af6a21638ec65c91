//! Natural cubic spline interpolation.

use super::{check_bounds, find_segment, validate_nodes, Interpolator};
use crate::math::linalg::{mat_vec, zeros, Matrix};
use crate::types::InterpolationError;

/// Natural cubic spline interpolator (zero second derivative at both ends).
///
/// Second derivatives are a linear map of the node values, `M = K·y`. `K` is
/// kept alongside `M` so node sensitivities cost one row combination.
///
/// # Example
///
/// ```
/// use caplet_core::math::interpolators::{Interpolator, NaturalCubicSplineInterpolator};
///
/// let xs = [0.0, 1.0, 2.0, 3.0];
/// let ys = [0.0, 1.0, 0.0, 1.0];
/// let spline = NaturalCubicSplineInterpolator::new(&xs, &ys).unwrap();
/// assert!((spline.interpolate(1.0).unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct NaturalCubicSplineInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the nodes
    second_derivatives: Vec<f64>,
    /// `∂M/∂y`, n × n
    sensitivity: Matrix,
}

impl NaturalCubicSplineInterpolator {
    /// Construct a natural cubic spline. Requires at least 3 strictly ascending nodes.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, InterpolationError> {
        validate_nodes(xs, ys, 3)?;
        let sensitivity = second_derivative_map(xs);
        let second_derivatives = mat_vec(&sensitivity, ys);
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second_derivatives,
            sensitivity,
        })
    }

    /// Second derivatives at the nodes.
    pub fn second_derivatives(&self) -> &[f64] {
        &self.second_derivatives
    }

    #[inline]
    fn segment_weights(&self, x: f64) -> (usize, f64, f64, f64, f64) {
        let i = find_segment(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = 1.0 - a;
        let h2 = h * h / 6.0;
        (i, a, b, (a * a * a - a) * h2, (b * b * b - b) * h2)
    }
}

impl Interpolator for NaturalCubicSplineInterpolator {
    fn interpolate(&self, x: f64) -> Result<f64, InterpolationError> {
        check_bounds(&self.xs, x)?;
        let (i, a, b, c, d) = self.segment_weights(x);
        let m = &self.second_derivatives;
        Ok(a * self.ys[i] + b * self.ys[i + 1] + c * m[i] + d * m[i + 1])
    }

    fn node_sensitivity(&self, x: f64) -> Result<Vec<f64>, InterpolationError> {
        check_bounds(&self.xs, x)?;
        let (i, a, b, c, d) = self.segment_weights(x);
        let mut w: Vec<f64> = self.sensitivity[i]
            .iter()
            .zip(&self.sensitivity[i + 1])
            .map(|(ki, kj)| c * ki + d * kj)
            .collect();
        w[i] += a;
        w[i + 1] += b;
        Ok(w)
    }

    #[inline]
    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// `K` such that the natural-spline second derivatives are `M = K·y`.
///
/// Interior rows solve the tridiagonal system
/// `h[i-1]·M[i-1] + 2(h[i-1]+h[i])·M[i] + h[i]·M[i+1] = 6(Δy[i]/h[i] − Δy[i-1]/h[i-1])`
/// column by column with the Thomas algorithm; the boundary rows are zero.
fn second_derivative_map(xs: &[f64]) -> Matrix {
    let n = xs.len();
    let interior = n - 2;
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let diag: Vec<f64> = (1..n - 1).map(|i| 2.0 * (h[i - 1] + h[i])).collect();
    // sub[k] couples interior row k to row k-1; sup[k] couples row k to k+1
    let sub: Vec<f64> = (1..n - 1).map(|i| h[i - 1]).collect();
    let sup: Vec<f64> = (1..n - 1).map(|i| h[i]).collect();

    let mut k = zeros(n, n);
    for col in 0..n {
        let rhs: Vec<f64> = (1..n - 1)
            .map(|i| {
                let mut r = 0.0;
                if col == i - 1 {
                    r += 6.0 / h[i - 1];
                }
                if col == i {
                    r -= 6.0 / h[i - 1] + 6.0 / h[i];
                }
                if col == i + 1 {
                    r += 6.0 / h[i];
                }
                r
            })
            .collect();
        let m = solve_tridiagonal(&sub, &diag, &sup, &rhs);
        for row in 0..interior {
            k[row + 1][col] = m[row];
        }
    }
    k
}

/// Thomas algorithm for a diagonally dominant tridiagonal system.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    c_prime[0] = sup[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - sub[i] * c_prime[i - 1];
        c_prime[i] = sup[i] / denom;
        d_prime[i] = (rhs[i] - sub[i] * d_prime[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_insufficient_data() {
        let result = NaturalCubicSplineInterpolator::new(&[0.0, 1.0], &[0.0, 1.0]);
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { got: 2, need: 3 })
        ));
    }

    #[test]
    fn test_reproduces_linear_data() {
        // A natural spline through collinear points is the line itself
        let xs = [0.0, 1.0, 2.5, 4.0];
        let ys = [1.0, 3.0, 6.0, 9.0];
        let spline = NaturalCubicSplineInterpolator::new(&xs, &ys).unwrap();
        for m in spline.second_derivatives() {
            assert_relative_eq!(*m, 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(spline.interpolate(3.2).unwrap(), 7.4, epsilon = 1e-12);
    }

    #[test]
    fn test_three_point_second_derivative() {
        // One interior node: 2(h0+h1) M1 = 6((y2-y1)/h1 - (y1-y0)/h0)
        let spline = NaturalCubicSplineInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(spline.second_derivatives()[1], -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_node_sensitivity_matches_bumped_values() {
        let xs = [0.0, 0.7, 1.5, 2.0, 3.1];
        let ys = [0.2, 0.3, 0.25, 0.22, 0.28];
        let spline = NaturalCubicSplineInterpolator::new(&xs, &ys).unwrap();
        let x = 1.8;
        let w = spline.node_sensitivity(x).unwrap();
        let base = spline.interpolate(x).unwrap();
        for j in 0..xs.len() {
            let mut bumped = ys;
            bumped[j] += 1.0;
            let up = NaturalCubicSplineInterpolator::new(&xs, &bumped)
                .unwrap()
                .interpolate(x)
                .unwrap();
            assert_relative_eq!(up - base, w[j], epsilon = 1e-12);
        }
    }
}
