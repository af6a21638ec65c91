//! Merging independent stripping results into one caplet volatility surface.
//!
//! Results stripped separately (one per strike bucket or maturity bucket,
//! each with its own pricer) are pooled into a single set of
//! `(expiry, strike) → vol` observations. Repeated observations are averaged.
//! The pooled set is completed to a rectangular grid over the union of
//! expiries and strikes by linear interpolation along expiry within each
//! strike, held flat beyond the observed expiries, and queried bilinearly.
//!
//! Nothing is re-optimised.

use caplet_core::math::interpolators::{BilinearInterpolator, Extrapolation, LinearInterpolator};
use caplet_core::types::{FunctionError, ValidationError};

use crate::error::StrippingError;
use crate::imp::MarketDataType;
use crate::result::{CapletStrippingResult, CapletVolatilityPoint};
use crate::strippers::CapletStripper;
use crate::vol_function::grid::{coincide, distinct_sorted};

/// Completed caplet volatility grid, `vols[i][j]` at `(expiries[i], strikes[j])`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolatilitySurfaceGrid {
    /// Ascending expiries
    pub expiries: Vec<f64>,
    /// Ascending strikes
    pub strikes: Vec<f64>,
    /// One row per expiry
    pub vols: Vec<Vec<f64>>,
}

/// A caplet volatility surface pooled from several stripping results.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::instruments::{CapFloor, IborIndex};
/// use caplet_models::market_data::{FlatCurve, MultiCurve};
/// use caplet_stripping::{
///     CapletStripper, CombinedCapletStrippingResults, MarketDataType, MultiCapFloorPricer,
///     TermStructureStripper,
/// };
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
/// let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
/// let bucket = |strike: f64| {
///     let caps = [1.5, 2.5]
///         .iter()
///         .map(|&end| CapFloor::from_schedule(index.clone(), strike, true, 0.5, end, &curves).unwrap())
///         .collect();
///     let pricer = Arc::new(MultiCapFloorPricer::new(caps).unwrap());
///     TermStructureStripper::with_defaults(pricer).unwrap()
/// };
///
/// let low = bucket(0.02).solve(&[0.30, 0.28], MarketDataType::Vol, None, None).unwrap();
/// let high = bucket(0.04).solve(&[0.24, 0.22], MarketDataType::Vol, None, None).unwrap();
/// let surface = CombinedCapletStrippingResults::new(&[low, high]).unwrap();
///
/// assert_eq!(surface.surface_grid().strikes, vec![0.02, 0.04]);
/// let mid = surface.volatility(1.0, 0.03).unwrap();
/// assert!(mid > 0.2 && mid < 0.3);
/// ```
#[derive(Debug, Clone)]
pub struct CombinedCapletStrippingResults {
    points: Vec<CapletVolatilityPoint>,
    grid: VolatilitySurfaceGrid,
    surface: BilinearInterpolator,
}

impl CombinedCapletStrippingResults {
    /// Pool `results` and build the surface.
    ///
    /// # Errors
    ///
    /// * `ValidationError::Empty` - no results
    /// * any error recomputing a result's caplet volatilities
    pub fn new(results: &[CapletStrippingResult]) -> Result<Self, StrippingError> {
        if results.is_empty() {
            return Err(ValidationError::Empty {
                name: "stripping results".to_string(),
            }
            .into());
        }
        let mut raw = Vec::new();
        for result in results {
            raw.extend(result.caplet_volatility_points()?);
        }
        let points = merge_points(raw);

        let expiries = distinct_sorted(points.iter().map(|p| p.expiry));
        let strikes = distinct_sorted(points.iter().map(|p| p.strike));
        let columns = strikes
            .iter()
            .map(|&k| fill_column(&points, k, &expiries))
            .collect::<Result<Vec<_>, _>>()?;
        let vols: Vec<Vec<f64>> = (0..expiries.len())
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect();

        let rows: Vec<&[f64]> = vols.iter().map(Vec::as_slice).collect();
        let surface = BilinearInterpolator::new(&expiries, &strikes, &rows)
            .map_err(FunctionError::from)?
            .with_extrapolation(Extrapolation::Flat);

        Ok(Self {
            points,
            grid: VolatilitySurfaceGrid {
                expiries,
                strikes,
                vols,
            },
            surface,
        })
    }

    /// Pooled observations, sorted by expiry then strike.
    pub fn points(&self) -> &[CapletVolatilityPoint] {
        &self.points
    }

    /// The completed grid.
    pub fn surface_grid(&self) -> &VolatilitySurfaceGrid {
        &self.grid
    }

    /// Bilinear caplet volatility, flat outside the grid.
    pub fn volatility(&self, expiry: f64, strike: f64) -> Result<f64, StrippingError> {
        Ok(self
            .surface
            .interpolate(expiry, strike)
            .map_err(FunctionError::from)?)
    }
}

/// Sort by (expiry, strike) and average coinciding observations.
fn merge_points(mut raw: Vec<CapletVolatilityPoint>) -> Vec<CapletVolatilityPoint> {
    raw.sort_by(|a, b| a.expiry.total_cmp(&b.expiry).then(a.strike.total_cmp(&b.strike)));
    let mut merged: Vec<(CapletVolatilityPoint, usize)> = Vec::with_capacity(raw.len());
    for point in raw {
        match merged.last_mut() {
            Some((last, count)) if coincide(last.expiry, point.expiry) && coincide(last.strike, point.strike) => {
                last.volatility += point.volatility;
                *count += 1;
            }
            _ => merged.push((point, 1)),
        }
    }
    merged
        .into_iter()
        .map(|(mut p, count)| {
            p.volatility /= count as f64;
            p
        })
        .collect()
}

/// Volatilities at `expiries` for one strike from that strike's observations.
fn fill_column(
    points: &[CapletVolatilityPoint],
    strike: f64,
    expiries: &[f64],
) -> Result<Vec<f64>, StrippingError> {
    let (ts, vs): (Vec<f64>, Vec<f64>) = points
        .iter()
        .filter(|p| coincide(p.strike, strike))
        .map(|p| (p.expiry, p.volatility))
        .unzip();
    if ts.len() == 1 {
        return Ok(vec![vs[0]; expiries.len()]);
    }
    let line = LinearInterpolator::new(&ts, &vs).map_err(FunctionError::from)?;
    Ok(expiries.iter().map(|&t| line.interpolate_flat(t)).collect())
}

/// One independent stripping problem.
#[derive(Debug, Clone, Copy)]
pub struct BucketJob<'a> {
    /// Strategy to run
    pub stripper: &'a dyn CapletStripper,
    /// One value per cap of the stripper's pricer
    pub market_values: &'a [f64],
    /// Whether the values are prices or vols
    pub data_type: MarketDataType,
    /// Optional per-cap errors
    pub errors: Option<&'a [f64]>,
    /// Optional starting parameters
    pub guess: Option<&'a [f64]>,
}

impl BucketJob<'_> {
    fn run(&self) -> Result<CapletStrippingResult, StrippingError> {
        self.stripper
            .solve(self.market_values, self.data_type, self.errors, self.guess)
    }
}

/// Solve independent buckets in parallel; results keep the input order.
#[cfg(feature = "parallel")]
pub fn strip_buckets(jobs: &[BucketJob<'_>]) -> Vec<Result<CapletStrippingResult, StrippingError>> {
    use rayon::prelude::*;

    jobs.par_iter().map(BucketJob::run).collect()
}

/// Sequential fallback when the `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn strip_buckets(jobs: &[BucketJob<'_>]) -> Vec<Result<CapletStrippingResult, StrippingError>> {
    jobs.iter().map(BucketJob::run).collect()
}
