//! Fixed (expiry, strike) evaluation grids.

use caplet_core::types::ValidationError;
use caplet_core::validation::{ensure_ascending_positive, ensure_non_empty, ensure_positive};
use caplet_models::instruments::Caplet;

/// Relative tolerance under which two expiries or strikes are the same point.
const COINCIDENCE_TOLERANCE: f64 = 1e-12;

/// True if `a` and `b` coincide up to [`COINCIDENCE_TOLERANCE`].
pub(crate) fn coincide(a: f64, b: f64) -> bool {
    (a - b).abs() <= COINCIDENCE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Sorted values with coincident entries removed.
pub(crate) fn distinct_sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| coincide(*a, *b));
    sorted
}

/// The `(expiry, strike)` points a volatility function is evaluated at.
///
/// Set once at construction. Points keep the order they were given in; a
/// grid built from a pricer's caplet universe is ordered by strike, then
/// expiry.
///
/// # Example
///
/// ```
/// use caplet_stripping::vol_function::EvaluationGrid;
///
/// let grid = EvaluationGrid::new(vec![(0.5, 0.03), (1.0, 0.03), (0.5, 0.04)]).unwrap();
/// assert_eq!(grid.len(), 3);
/// assert_eq!(grid.distinct_expiries(), vec![0.5, 1.0]);
/// assert_eq!(grid.distinct_strikes(), vec![0.03, 0.04]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationGrid {
    points: Vec<(f64, f64)>,
}

impl EvaluationGrid {
    /// Build a grid.
    ///
    /// # Errors
    ///
    /// The grid must be non-empty, with positive finite expiries and strikes,
    /// and expiries strictly ascending within each run of equal strikes.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, ValidationError> {
        ensure_non_empty(&points, "grid")?;
        let expiries: Vec<f64> = points.iter().map(|p| p.0).collect();
        let strikes: Vec<f64> = points.iter().map(|p| p.1).collect();
        ensure_positive(&expiries, "grid expiries")?;
        ensure_positive(&strikes, "grid strikes")?;

        let mut start = 0;
        while start < points.len() {
            let mut end = start + 1;
            while end < points.len() && coincide(points[end].1, points[start].1) {
                end += 1;
            }
            ensure_ascending_positive(&expiries[start..end], "grid expiries per strike")?;
            start = end;
        }
        Ok(Self { points })
    }

    /// Grid of caplet `(fixing time, strike)` points.
    pub fn from_caplets(caplets: &[Caplet]) -> Result<Self, ValidationError> {
        Self::new(
            caplets
                .iter()
                .map(|c| (c.fixing_time(), c.strike()))
                .collect(),
        )
    }

    /// The `(expiry, strike)` points.
    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed grid.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Expiry of every point.
    pub fn expiries(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.0).collect()
    }

    /// Strike of every point.
    pub fn strikes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }

    /// Sorted distinct expiries.
    pub fn distinct_expiries(&self) -> Vec<f64> {
        distinct_sorted(self.points.iter().map(|p| p.0))
    }

    /// Sorted distinct strikes.
    pub fn distinct_strikes(&self) -> Vec<f64> {
        distinct_sorted(self.points.iter().map(|p| p.1))
    }
}
