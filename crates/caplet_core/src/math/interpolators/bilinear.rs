//! Bilinear 2D interpolation for surfaces.

use super::{find_segment, Extrapolation};
use crate::types::InterpolationError;

/// Bilinear interpolator on a rectangular grid.
///
/// `zs[i][j]` is the value at `(xs[i], ys[j])`. An axis with a single node
/// is treated as constant along that direction.
///
/// # Example
///
/// ```
/// use caplet_core::math::interpolators::BilinearInterpolator;
///
/// let xs = [0.0, 1.0];
/// let ys = [0.0, 1.0];
/// let zs = [&[0.0, 1.0][..], &[2.0, 3.0][..]];
/// let interp = BilinearInterpolator::new(&xs, &ys, &zs).unwrap();
/// assert!((interp.interpolate(0.5, 0.5).unwrap() - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct BilinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    zs: Vec<Vec<f64>>,
    extrapolation: Extrapolation,
}

impl BilinearInterpolator {
    /// Construct a bilinear interpolator that rejects out-of-range queries.
    pub fn new(xs: &[f64], ys: &[f64], zs: &[&[f64]]) -> Result<Self, InterpolationError> {
        validate_axis(xs)?;
        validate_axis(ys)?;

        if zs.len() != xs.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "Grid rows ({}) must match x-axis length ({})",
                zs.len(),
                xs.len()
            )));
        }
        for (i, row) in zs.iter().enumerate() {
            if row.len() != ys.len() {
                return Err(InterpolationError::InvalidInput(format!(
                    "Grid row {} length ({}) must match y-axis length ({})",
                    i,
                    row.len(),
                    ys.len()
                )));
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            zs: zs.iter().map(|row| row.to_vec()).collect(),
            extrapolation: Extrapolation::Error,
        })
    }

    /// Set the out-of-range behaviour.
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Interpolated value at `(x, y)`.
    pub fn interpolate(&self, x: f64, y: f64) -> Result<f64, InterpolationError> {
        Ok(self
            .node_weights(x, y)?
            .into_iter()
            .map(|(i, j, w)| w * self.zs[i][j])
            .sum())
    }

    /// Non-zero node weights `(i, j, ∂z(x,y)/∂zs[i][j])` at `(x, y)`.
    pub fn node_weights(&self, x: f64, y: f64) -> Result<Vec<(usize, usize, f64)>, InterpolationError> {
        let (i, u) = self.axis_weight(&self.xs, x)?;
        let (j, v) = self.axis_weight(&self.ys, y)?;
        let mut weights = Vec::with_capacity(4);
        let corners = [
            (i, j, (1.0 - u) * (1.0 - v)),
            (i + 1, j, u * (1.0 - v)),
            (i, j + 1, (1.0 - u) * v),
            (i + 1, j + 1, u * v),
        ];
        for (ci, cj, w) in corners {
            if w != 0.0 {
                weights.push((ci, cj, w));
            }
        }
        if weights.is_empty() {
            weights.push((i, j, 1.0));
        }
        Ok(weights)
    }

    /// Segment index and fractional position along one axis.
    fn axis_weight(&self, axis: &[f64], t: f64) -> Result<(usize, f64), InterpolationError> {
        let (min, max) = (axis[0], axis[axis.len() - 1]);
        let t = match self.extrapolation {
            Extrapolation::Flat => t.clamp(min, max),
            Extrapolation::Error => {
                if !(t >= min && t <= max) {
                    return Err(InterpolationError::OutOfBounds { x: t, min, max });
                }
                t
            }
        };
        if axis.len() == 1 {
            return Ok((0, 0.0));
        }
        let i = find_segment(axis, t);
        Ok((i, (t - axis[i]) / (axis[i + 1] - axis[i])))
    }

    /// Range of the x axis.
    #[inline]
    pub fn domain_x(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Range of the y axis.
    #[inline]
    pub fn domain_y(&self) -> (f64, f64) {
        (self.ys[0], self.ys[self.ys.len() - 1])
    }

    /// X-axis nodes.
    #[inline]
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Y-axis nodes.
    #[inline]
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Grid values.
    #[inline]
    pub fn zs(&self) -> &[Vec<f64>] {
        &self.zs
    }
}

fn validate_axis(axis: &[f64]) -> Result<(), InterpolationError> {
    if axis.is_empty() {
        return Err(InterpolationError::InsufficientData { got: 0, need: 1 });
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(InterpolationError::InvalidInput(
            "axis nodes must be finite".to_string(),
        ));
    }
    if let Some(i) = axis.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NonMonotonicData { index: i + 1 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> BilinearInterpolator {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 1.0];
        let zs = [&[0.0, 1.0][..], &[2.0, 3.0][..], &[4.0, 5.0][..]];
        BilinearInterpolator::new(&xs, &ys, &zs).unwrap()
    }

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_new_row_mismatch() {
        let zs = [&[0.0, 1.0][..]];
        assert!(BilinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0], &zs).is_err());
    }

    #[test]
    fn test_new_rejects_unsorted_axis() {
        let zs = [&[0.0][..], &[1.0][..]];
        assert!(matches!(
            BilinearInterpolator::new(&[1.0, 0.0], &[0.0], &zs),
            Err(InterpolationError::NonMonotonicData { index: 1 })
        ));
    }

    // ========================================
    // Interpolation Tests
    // ========================================

    #[test]
    fn test_interpolate_corners_and_centre() {
        let interp = grid();
        assert_relative_eq!(interp.interpolate(2.0, 1.0).unwrap(), 5.0);
        assert_relative_eq!(interp.interpolate(1.5, 0.5).unwrap(), 3.5);
    }

    #[test]
    fn test_out_of_bounds_errors_by_default() {
        assert!(grid().interpolate(3.0, 0.5).is_err());
    }

    #[test]
    fn test_flat_extrapolation() {
        let interp = grid().with_extrapolation(Extrapolation::Flat);
        assert_relative_eq!(interp.interpolate(3.0, 2.0).unwrap(), 5.0);
        assert_relative_eq!(interp.interpolate(-1.0, 0.5).unwrap(), 0.5);
    }

    #[test]
    fn test_single_node_axis_is_constant() {
        let zs = [&[1.0][..], &[3.0][..]];
        let interp = BilinearInterpolator::new(&[0.0, 1.0], &[0.5], &zs)
            .unwrap()
            .with_extrapolation(Extrapolation::Flat);
        assert_relative_eq!(interp.interpolate(0.5, 10.0).unwrap(), 2.0);
    }

    #[test]
    fn test_node_weights_sum_to_one() {
        let interp = grid();
        let total: f64 = interp
            .node_weights(0.3, 0.8)
            .unwrap()
            .iter()
            .map(|(_, _, w)| w)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-14);
    }
}
