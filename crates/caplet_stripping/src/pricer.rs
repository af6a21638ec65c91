//! Joint pricing of a batch of caps and floors over a shared caplet universe.
//!
//! Caps in a batch overlap heavily: a 5y and a 10y cap at the same strike
//! share their first 19 quarterly caplets. The pricer collects the distinct
//! caplets once, ordered by strike then fixing time, and keeps for every cap
//! an index array into that universe. Per-caplet work (pricing, vega) is done
//! once per universe caplet and aggregated per cap.
//!
//! Universe caplets are held as calls; floors are priced from the call
//! values by put-call parity, `floorlet = caplet − D·τ·(F − K)`.

use caplet_core::math::linalg::{zeros, Matrix};
use caplet_core::types::ValidationError;
use caplet_core::validation::ensure_length;
use caplet_models::analytical::AnalyticalError;
use caplet_models::instruments::{CapFloor, Caplet, IborIndex};

use crate::error::StrippingError;
use crate::vol_function::grid::{coincide, distinct_sorted};
use crate::vol_function::EvaluationGrid;

/// Prices a batch of caps/floors on one index from per-caplet or per-cap volatilities.
///
/// Immutable after construction and safe to share across threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_models::instruments::{CapFloor, IborIndex};
/// use caplet_models::market_data::{FlatCurve, MultiCurve};
/// use caplet_stripping::MultiCapFloorPricer;
///
/// let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
/// let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
/// let caps = vec![
///     CapFloor::from_schedule(index.clone(), 0.03, true, 0.5, 2.0, &curves).unwrap(),
///     CapFloor::from_schedule(index, 0.03, true, 0.5, 3.0, &curves).unwrap(),
/// ];
/// let pricer = MultiCapFloorPricer::new(caps).unwrap();
///
/// // 3 + 5 caplets, the first 3 shared
/// assert_eq!(pricer.num_caplets(), 5);
/// let prices = pricer.price(&[0.2; 5]).unwrap();
/// assert!(prices[1] > prices[0]);
/// ```
#[derive(Debug, Clone)]
pub struct MultiCapFloorPricer {
    index: IborIndex,
    caps: Vec<CapFloor>,
    caplets: Vec<Caplet>,
    cap_caplet_indices: Vec<Vec<usize>>,
    intrinsic_values: Vec<f64>,
    parity_adjustments: Vec<f64>,
    grid: EvaluationGrid,
}

impl MultiCapFloorPricer {
    /// Build the caplet universe for `caps`.
    ///
    /// # Errors
    ///
    /// * `ValidationError::Empty` - no caps
    /// * `StrippingError::MixedIndices` - caps on different floating-rate indices
    pub fn new(caps: Vec<CapFloor>) -> Result<Self, StrippingError> {
        let first = caps.first().ok_or_else(|| ValidationError::Empty {
            name: "caps".to_string(),
        })?;
        let index = first.index().clone();
        for (position, cap) in caps.iter().enumerate().skip(1) {
            if cap.index() != &index {
                return Err(StrippingError::MixedIndices {
                    expected: index.to_string(),
                    got: cap.index().to_string(),
                    position,
                });
            }
        }

        // (strike, fixing, cap, position within cap)
        let mut entries: Vec<(f64, f64, usize, usize)> = caps
            .iter()
            .enumerate()
            .flat_map(|(c, cap)| {
                cap.caplets()
                    .iter()
                    .enumerate()
                    .map(move |(p, caplet)| (caplet.strike(), caplet.fixing_time(), c, p))
            })
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut caplets: Vec<Caplet> = Vec::with_capacity(entries.len());
        let mut cap_caplet_indices: Vec<Vec<usize>> =
            caps.iter().map(|cap| vec![0; cap.num_caplets()]).collect();
        for (strike, fixing, c, p) in entries {
            let is_new = caplets
                .last()
                .map_or(true, |u| !(coincide(u.strike(), strike) && coincide(u.fixing_time(), fixing)));
            if is_new {
                caplets.push(caps[c].caplets()[p].with_call(true));
            }
            cap_caplet_indices[c][p] = caplets.len() - 1;
        }

        let intrinsic_values = caps.iter().map(CapFloor::intrinsic_value).collect();
        let parity_adjustments = caps
            .iter()
            .map(|cap| {
                if cap.is_call() {
                    0.0
                } else {
                    cap.caplets()
                        .iter()
                        .map(|c| c.annuity() * (c.forward() - c.strike()))
                        .sum()
                }
            })
            .collect();
        let grid = EvaluationGrid::from_caplets(&caplets)?;

        Ok(Self {
            index,
            caps,
            caplets,
            cap_caplet_indices,
            intrinsic_values,
            parity_adjustments,
            grid,
        })
    }

    /// Floating-rate index shared by every cap.
    pub fn index(&self) -> &IborIndex {
        &self.index
    }

    /// The caps, in input order.
    pub fn caps(&self) -> &[CapFloor] {
        &self.caps
    }

    /// Number of caps.
    pub fn num_caps(&self) -> usize {
        self.caps.len()
    }

    /// Distinct caplets, ordered by strike then fixing time.
    pub fn caplets(&self) -> &[Caplet] {
        &self.caplets
    }

    /// Number of distinct caplets.
    pub fn num_caplets(&self) -> usize {
        self.caplets.len()
    }

    /// For each cap, the universe position of each of its caplets.
    pub fn cap_caplet_indices(&self) -> &[Vec<usize>] {
        &self.cap_caplet_indices
    }

    /// `(fixing time, strike)` of each universe caplet.
    pub fn expiry_strike_grid(&self) -> &EvaluationGrid {
        &self.grid
    }

    /// Strike of each cap.
    pub fn strikes(&self) -> Vec<f64> {
        self.caps.iter().map(CapFloor::strike).collect()
    }

    /// Accrual start of each cap.
    pub fn cap_start_times(&self) -> Vec<f64> {
        self.caps.iter().map(CapFloor::start_time).collect()
    }

    /// Accrual end of each cap.
    pub fn cap_end_times(&self) -> Vec<f64> {
        self.caps.iter().map(CapFloor::end_time).collect()
    }

    /// Zero-volatility value of each cap.
    pub fn intrinsic_cap_values(&self) -> &[f64] {
        &self.intrinsic_values
    }

    /// Distinct fixing times with the forward rate fixing at each.
    pub fn forward_curve(&self) -> (Vec<f64>, Vec<f64>) {
        let expiries = distinct_sorted(self.caplets.iter().map(Caplet::fixing_time));
        let forwards = expiries
            .iter()
            .map(|&t| {
                self.caplets
                    .iter()
                    .find(|c| coincide(c.fixing_time(), t))
                    .map_or(f64::NAN, Caplet::forward)
            })
            .collect();
        (expiries, forwards)
    }

    /// Call value of every universe caplet.
    pub fn caplet_prices(&self, caplet_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        ensure_length(caplet_vols, self.num_caplets(), "caplet volatilities")?;
        Ok(self
            .caplets
            .iter()
            .zip(caplet_vols)
            .map(|(caplet, &vol)| caplet.price(vol))
            .collect())
    }

    /// Cap values from one volatility per universe caplet.
    ///
    /// Each universe caplet is priced once.
    pub fn price(&self, caplet_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        let caplet_prices = self.caplet_prices(caplet_vols)?;
        Ok(self
            .cap_caplet_indices
            .iter()
            .zip(&self.parity_adjustments)
            .map(|(indices, adj)| indices.iter().map(|&i| caplet_prices[i]).sum::<f64>() - adj)
            .collect())
    }

    /// Cap values, each at its own flat volatility.
    ///
    /// A caplet shared by two caps is priced at each cap's volatility.
    pub fn price_from_cap_vols(&self, cap_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        ensure_length(cap_vols, self.num_caps(), "cap volatilities")?;
        Ok(self
            .caps
            .iter()
            .zip(cap_vols)
            .map(|(cap, &vol)| cap.price(vol))
            .collect())
    }

    /// Flat (cap-implied) volatility of each cap price.
    pub fn implied_vols(&self, cap_prices: &[f64]) -> Result<Vec<f64>, StrippingError> {
        ensure_length(cap_prices, self.num_caps(), "cap prices")?;
        self.caps
            .iter()
            .zip(cap_prices)
            .map(|(cap, &price)| Ok(cap.implied_volatility(price)?))
            .collect()
    }

    /// Flat volatility of each cap when its caplets carry `caplet_vols`.
    pub fn cap_vols_from_caplet_vols(&self, caplet_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        self.implied_vols(&self.price(caplet_vols)?)
    }

    /// `∂(cap price)/∂(caplet vol)`, `num_caps × num_caplets`.
    ///
    /// Row `i` is non-zero only at cap `i`'s own caplets.
    pub fn vega_from_caplet_vols(&self, caplet_vols: &[f64]) -> Result<Matrix, StrippingError> {
        ensure_length(caplet_vols, self.num_caplets(), "caplet volatilities")?;
        let vegas: Vec<f64> = self
            .caplets
            .iter()
            .zip(caplet_vols)
            .map(|(caplet, &vol)| caplet.vega(vol))
            .collect();
        let mut jac = zeros(self.num_caps(), self.num_caplets());
        for (row, indices) in jac.iter_mut().zip(&self.cap_caplet_indices) {
            for &i in indices {
                row[i] = vegas[i];
            }
        }
        Ok(jac)
    }

    /// Flat vega of each cap at its own volatility.
    pub fn cap_vega(&self, cap_vols: &[f64]) -> Result<Vec<f64>, StrippingError> {
        ensure_length(cap_vols, self.num_caps(), "cap volatilities")?;
        Ok(self
            .caps
            .iter()
            .zip(cap_vols)
            .map(|(cap, &vol)| cap.vega(vol))
            .collect())
    }

    /// `∂(cap vol)/∂(caplet vol)`, `num_caps × num_caplets`.
    ///
    /// The price sensitivity divided by each cap's flat vega at its implied
    /// volatility.
    pub fn cap_vol_vega(&self, caplet_vols: &[f64]) -> Result<Matrix, StrippingError> {
        let cap_vols = self.cap_vols_from_caplet_vols(caplet_vols)?;
        let cap_vegas = self.cap_vega(&cap_vols)?;
        let mut jac = self.vega_from_caplet_vols(caplet_vols)?;
        for (c, (row, &vega)) in jac.iter_mut().zip(&cap_vegas).enumerate() {
            if !(vega.abs() > 0.0) {
                return Err(AnalyticalError::NumericalInstability {
                    message: format!("cap {c} has zero vega at volatility {}", cap_vols[c]),
                }
                .into());
            }
            for v in row.iter_mut() {
                *v /= vega;
            }
        }
        Ok(jac)
    }
}
