//! Interpolation with node sensitivities.
//!
//! Every 1-D interpolator here is linear in its node values, so the value at
//! `x` is `Σ wⱼ(x)·yⱼ` and the node sensitivity `∂y(x)/∂yⱼ = wⱼ(x)` does not
//! depend on the node values. That is what makes an interpolated curve a
//! differentiable [`VectorFunction`](crate::math::functions::VectorFunction)
//! with a constant Jacobian.
//!
//! ## Available Interpolators
//!
//! - [`LinearInterpolator`]: Piecewise linear interpolation between nodes
//! - [`NaturalCubicSplineInterpolator`]: Natural cubic spline with C² continuity
//! - [`BilinearInterpolator`]: 2-D grid interpolation for surfaces
//!
//! Both 1-D interpolators extrapolate flat when built through
//! [`InterpolationMethod`] with [`Extrapolation::Flat`].
//!
//! ## Example
//!
//! ```
//! use caplet_core::math::interpolators::{Interpolator, LinearInterpolator};
//!
//! let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).unwrap();
//! assert!((interp.interpolate(1.5).unwrap() - 2.5).abs() < 1e-12);
//!
//! let w = interp.node_sensitivity(1.5).unwrap();
//! assert_eq!(w, vec![0.0, 0.5, 0.5]);
//! ```

mod bilinear;
mod cubic_spline;
mod linear;

pub use bilinear::BilinearInterpolator;
pub use cubic_spline::NaturalCubicSplineInterpolator;
pub use linear::LinearInterpolator;

use crate::math::linalg::Matrix;
use crate::types::InterpolationError;

/// One-dimensional interpolator over sorted nodes.
pub trait Interpolator: Send + Sync {
    /// Interpolated value at `x`.
    fn interpolate(&self, x: f64) -> Result<f64, InterpolationError>;

    /// `∂value(x)/∂yⱼ` for every node `j`.
    fn node_sensitivity(&self, x: f64) -> Result<Vec<f64>, InterpolationError>;

    /// Valid interpolation range `(x_min, x_max)`.
    fn domain(&self) -> (f64, f64);
}

/// Behaviour outside the node range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extrapolation {
    /// Out-of-range queries are an error.
    Error,
    /// Hold the end node values constant.
    #[default]
    Flat,
}

/// Selects a 1-D interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InterpolationMethod {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Natural cubic spline.
    NaturalCubic,
}

impl InterpolationMethod {
    /// Minimum number of nodes the scheme accepts.
    pub fn min_nodes(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::NaturalCubic => 3,
        }
    }

    /// Build an interpolator for the given nodes.
    pub fn build(
        &self,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<Box<dyn Interpolator>, InterpolationError> {
        Ok(match self {
            Self::Linear => Box::new(LinearInterpolator::new(xs, ys)?),
            Self::NaturalCubic => Box::new(NaturalCubicSplineInterpolator::new(xs, ys)?),
        })
    }

    /// Node-sensitivity matrix of the interpolant on `knots`, sampled at `points`.
    ///
    /// Row `i` holds `∂y(pointsᵢ)/∂yⱼ`. With a single knot every row is `[1.0]`.
    pub fn weight_matrix(
        &self,
        knots: &[f64],
        points: &[f64],
        extrapolation: Extrapolation,
    ) -> Result<Matrix, InterpolationError> {
        if knots.len() == 1 {
            return Ok(vec![vec![1.0]; points.len()]);
        }
        let method = if knots.len() < self.min_nodes() {
            Self::Linear
        } else {
            *self
        };
        let interp = method.build(knots, &vec![0.0; knots.len()])?;
        let (lo, hi) = interp.domain();
        points
            .iter()
            .map(|&x| {
                let x = match extrapolation {
                    Extrapolation::Flat => x.clamp(lo, hi),
                    Extrapolation::Error => x,
                };
                interp.node_sensitivity(x)
            })
            .collect()
    }
}

/// Validate `(xs, ys)` node arrays.
pub(crate) fn validate_nodes(
    xs: &[f64],
    ys: &[f64],
    need: usize,
) -> Result<(), InterpolationError> {
    if xs.len() != ys.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "xs and ys must have same length: got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < need {
        return Err(InterpolationError::InsufficientData {
            got: xs.len(),
            need,
        });
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(InterpolationError::InvalidInput(
            "nodes must be finite".to_string(),
        ));
    }
    if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NonMonotonicData { index: i + 1 });
    }
    Ok(())
}

/// Index `i` of the segment `[xs[i], xs[i+1]]` containing `x`, clamped to `[0, n-2]`.
#[inline]
pub(crate) fn find_segment(xs: &[f64], x: f64) -> usize {
    let pos = xs.partition_point(|&xi| xi <= x);
    if pos == 0 {
        0
    } else if pos >= xs.len() {
        xs.len() - 2
    } else {
        pos - 1
    }
}

#[inline]
pub(crate) fn check_bounds(xs: &[f64], x: f64) -> Result<(), InterpolationError> {
    let (min, max) = (xs[0], xs[xs.len() - 1]);
    if !(x >= min && x <= max) {
        return Err(InterpolationError::OutOfBounds { x, min, max });
    }
    Ok(())
}
