//! Linear interpolation implementation.

use super::{check_bounds, find_segment, validate_nodes, Interpolator};
use crate::types::InterpolationError;

/// Piecewise linear interpolator.
///
/// Nodes must be strictly ascending; at least 2 are required.
///
/// # Example
///
/// ```
/// use caplet_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 2.0, 4.0, 6.0]).unwrap();
/// assert_eq!(interp.domain(), (0.0, 3.0));
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    /// Ascending x-coordinates
    xs: Vec<f64>,
    /// Node values
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Construct a linear interpolator from nodes.
    ///
    /// # Errors
    ///
    /// * `InterpolationError::InsufficientData` - Fewer than 2 nodes
    /// * `InterpolationError::NonMonotonicData` - `xs` not strictly ascending
    /// * `InterpolationError::InvalidInput` - Mismatched lengths or non-finite nodes
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, InterpolationError> {
        validate_nodes(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    /// Node x-coordinates.
    #[inline]
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Node values.
    #[inline]
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Interpolate with flat extrapolation outside the node range.
    pub fn interpolate_flat(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain();
        let x = x.clamp(lo, hi);
        let i = find_segment(&self.xs, x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        self.ys[i] + (self.ys[i + 1] - self.ys[i]) * t
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, x: f64) -> Result<f64, InterpolationError> {
        check_bounds(&self.xs, x)?;
        Ok(self.interpolate_flat(x))
    }

    fn node_sensitivity(&self, x: f64) -> Result<Vec<f64>, InterpolationError> {
        check_bounds(&self.xs, x)?;
        let i = find_segment(&self.xs, x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        let mut w = vec![0.0; self.xs.len()];
        w[i] = 1.0 - t;
        w[i + 1] = t;
        Ok(w)
    }

    #[inline]
    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}
