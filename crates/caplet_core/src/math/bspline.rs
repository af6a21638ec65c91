//! Uniform B-spline bases in one and two dimensions.
//!
//! A basis of `n` functions of degree `p` on `[a, b]` uses the extended
//! uniform knot vector `tₖ = a + (k − p)·Δ`, `Δ = (b − a)/(n − p)`, so the
//! functions form a partition of unity on `[a, b]`. Points outside `[a, b]`
//! are clamped to the nearest end.

use crate::math::linalg::Matrix;
use crate::types::ValidationError;

/// One-dimensional uniform B-spline basis.
///
/// # Example
///
/// ```
/// use caplet_core::math::bspline::BSplineBasis;
///
/// let basis = BSplineBasis::uniform(0.0, 10.0, 8, 3).unwrap();
/// let values = basis.evaluate(4.2);
/// assert_eq!(values.len(), 8);
/// assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    knots: Vec<f64>,
    degree: usize,
    num_functions: usize,
}

impl BSplineBasis {
    /// Build `num_functions` uniform B-splines of the given degree on `[x_min, x_max]`.
    ///
    /// Requires `x_min < x_max` and `num_functions > degree`.
    pub fn uniform(
        x_min: f64,
        x_max: f64,
        num_functions: usize,
        degree: usize,
    ) -> Result<Self, ValidationError> {
        if !(x_min.is_finite() && x_max.is_finite() && x_min < x_max) {
            return Err(ValidationError::invalid(format!(
                "B-spline range [{x_min}, {x_max}] is empty"
            )));
        }
        if num_functions <= degree {
            return Err(ValidationError::invalid(format!(
                "{num_functions} basis functions cannot support degree {degree}"
            )));
        }
        let dx = (x_max - x_min) / (num_functions - degree) as f64;
        let knots = (0..num_functions + degree + 1)
            .map(|k| x_min + (k as f64 - degree as f64) * dx)
            .collect();
        Ok(Self {
            knots,
            degree,
            num_functions,
        })
    }

    /// Number of basis functions.
    #[inline]
    pub fn num_functions(&self) -> usize {
        self.num_functions
    }

    /// Polynomial degree.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Covered range `[a, b]`.
    #[inline]
    pub fn range(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.num_functions])
    }

    /// Values of all basis functions at `x`.
    pub fn evaluate(&self, x: f64) -> Vec<f64> {
        let mut out = vec![0.0; self.num_functions];
        let (first, local) = self.local_basis(x);
        out[first..first + local.len()].copy_from_slice(&local);
        out
    }

    /// Basis matrix with one row per point.
    pub fn basis_matrix(&self, points: &[f64]) -> Matrix {
        points.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Index of the first non-zero function and the `degree + 1` non-zero values.
    fn local_basis(&self, x: f64) -> (usize, Vec<f64>) {
        let p = self.degree;
        let (a, b) = self.range();
        let x = x.clamp(a, b);

        // span s with t_s <= x < t_{s+1}, restricted to [p, n-1]
        let span = (self.knots.partition_point(|&t| t <= x).saturating_sub(1))
            .clamp(p, self.num_functions - 1);

        let mut n = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        n[0] = 1.0;
        for j in 1..=p {
            left[j] = x - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        (span - p, n)
    }
}

/// Tensor-product B-spline basis in `(x, y)`.
///
/// Function `(i, j)` is stored at flat index `i·n_y + j`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBSplineBasis {
    x_basis: BSplineBasis,
    y_basis: BSplineBasis,
}

impl TensorBSplineBasis {
    /// Combine two 1-D bases.
    pub fn new(x_basis: BSplineBasis, y_basis: BSplineBasis) -> Self {
        Self { x_basis, y_basis }
    }

    /// Basis along x.
    pub fn x_basis(&self) -> &BSplineBasis {
        &self.x_basis
    }

    /// Basis along y.
    pub fn y_basis(&self) -> &BSplineBasis {
        &self.y_basis
    }

    /// Total number of basis functions.
    pub fn num_functions(&self) -> usize {
        self.x_basis.num_functions() * self.y_basis.num_functions()
    }

    /// Values of all basis functions at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> Vec<f64> {
        let ny = self.y_basis.num_functions();
        let mut out = vec![0.0; self.num_functions()];
        let (fx, bx) = self.x_basis.local_basis(x);
        let (fy, by) = self.y_basis.local_basis(y);
        for (di, &vx) in bx.iter().enumerate() {
            for (dj, &vy) in by.iter().enumerate() {
                out[(fx + di) * ny + fy + dj] = vx * vy;
            }
        }
        out
    }

    /// Basis matrix with one row per `(x, y)` point.
    pub fn basis_matrix(&self, points: &[(f64, f64)]) -> Matrix {
        points.iter().map(|&(x, y)| self.evaluate(x, y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_uniform_rejects_bad_inputs() {
        assert!(BSplineBasis::uniform(1.0, 1.0, 5, 3).is_err());
        assert!(BSplineBasis::uniform(0.0, 1.0, 3, 3).is_err());
    }

    #[test]
    fn test_linear_basis_is_hat_functions() {
        // Degree 1 with 3 functions on [0, 2]: hats centred at 0, 1, 2
        let basis = BSplineBasis::uniform(0.0, 2.0, 3, 1).unwrap();
        let v = basis.evaluate(0.5);
        assert_relative_eq!(v[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(v[1], 0.5, epsilon = 1e-14);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-14);
        let end = basis.evaluate(2.0);
        assert_relative_eq!(end[2], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_cubic_values_at_knot() {
        // Uniform cubic B-spline at a knot: 1/6, 4/6, 1/6
        let basis = BSplineBasis::uniform(0.0, 4.0, 7, 3).unwrap();
        let v = basis.evaluate(2.0);
        let nonzero: Vec<f64> = v.into_iter().filter(|x| x.abs() > 1e-14).collect();
        assert_eq!(nonzero.len(), 3);
        assert_relative_eq!(nonzero[0], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(nonzero[1], 4.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(nonzero[2], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clamped_outside_range() {
        let basis = BSplineBasis::uniform(0.0, 1.0, 5, 2).unwrap();
        assert_eq!(basis.evaluate(-3.0), basis.evaluate(0.0));
        assert_eq!(basis.evaluate(7.0), basis.evaluate(1.0));
    }

    #[test]
    fn test_tensor_basis_partition_of_unity() {
        let basis = TensorBSplineBasis::new(
            BSplineBasis::uniform(0.0, 5.0, 6, 3).unwrap(),
            BSplineBasis::uniform(0.01, 0.06, 5, 2).unwrap(),
        );
        let v = basis.evaluate(2.3, 0.031);
        assert_eq!(v.len(), 30);
        assert_relative_eq!(v.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_partition_of_unity(x in -1.0f64..11.0, n in 4usize..12) {
            let basis = BSplineBasis::uniform(0.0, 10.0, n, 3).unwrap();
            let v = basis.evaluate(x);
            prop_assert!((v.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            prop_assert!(v.iter().all(|&b| b >= -1e-15));
        }
    }
}
