//! Smile-model parameterisation: model parameters → per-expiry smile
//! parameters → caplet volatilities.
//!
//! The requested grid is regrouped into distinct expiries, each with its
//! sorted distinct strikes. The outer map sends the model parameters to one
//! block of smile parameters per expiry; the smile formula turns each block
//! into volatilities at that expiry's strikes; a reverse index built once
//! per grid scatters them back to the requested point order.
//!
//! The Jacobian is the two-stage chain rule
//! `∂σᵢ/∂x = Σₖ ∂σᵢ/∂pₑₖ · ∂pₑₖ/∂x`, assembled row by row from the smile
//! adjoint and the outer Jacobian.

use std::sync::Arc;

use caplet_core::math::functions::{
    InterpolatedCurveFunction, ParameterizedCurve, ParameterizedCurveFunction, VectorFunction,
};
use caplet_core::math::interpolators::{Extrapolation, InterpolationMethod, LinearInterpolator};
use caplet_core::math::linalg::{zeros, Matrix};
use caplet_core::types::{FunctionError, ValidationError};
use caplet_core::validation::{ensure_ascending_positive, ensure_length, ensure_positive};
use caplet_models::models::{ConstantCurve, ModelError, SmileModel};

use super::grid::{coincide, distinct_sorted};
use super::{
    DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid,
    VectorFunctionProvider,
};
use crate::error::StrippingError;

fn model_failure(err: ModelError) -> FunctionError {
    FunctionError::evaluation(err.to_string())
}

/// Functional form of one smile parameter across expiries.
#[derive(Debug, Clone)]
pub enum SmileParameterCurve {
    /// Values at expiry knots, interpolated with flat extrapolation.
    Interpolated {
        /// Expiry knots
        knots: Vec<f64>,
        /// Interpolation scheme
        method: InterpolationMethod,
    },
    /// A closed-form curve such as ABCD.
    Parametric(Arc<dyn ParameterizedCurve>),
    /// One value for every expiry.
    Constant,
}

impl SmileParameterCurve {
    /// Number of model parameters this curve consumes.
    pub fn num_parameters(&self) -> usize {
        match self {
            Self::Interpolated { knots, .. } => knots.len(),
            Self::Parametric(curve) => curve.num_parameters(),
            Self::Constant => 1,
        }
    }

    fn sampled(&self, expiries: &[f64]) -> Result<Arc<dyn VectorFunction>, StrippingError> {
        Ok(match self {
            Self::Interpolated { knots, method } => Arc::new(InterpolatedCurveFunction::new(
                knots,
                expiries,
                *method,
                Extrapolation::Flat,
            )?),
            Self::Parametric(curve) => {
                Arc::new(ParameterizedCurveFunction::new(Arc::clone(curve), expiries)?)
            }
            Self::Constant => {
                Arc::new(ParameterizedCurveFunction::new(Arc::new(ConstantCurve), expiries)?)
            }
        })
    }
}

/// Each smile parameter as its own curve in expiry.
///
/// Model parameters are the concatenation of each curve's parameters, in
/// smile-parameter order. Sampled at `n` expiries the output holds
/// `n` blocks of smile parameters, one per expiry.
///
/// # Example
///
/// ```
/// use caplet_core::math::functions::VectorFunction;
/// use caplet_core::math::interpolators::InterpolationMethod;
/// use caplet_stripping::vol_function::{SmileParameterCurve, SmileParameterTermStructure, VectorFunctionProvider};
///
/// let map = SmileParameterTermStructure::new(vec![
///     SmileParameterCurve::Interpolated { knots: vec![1.0, 5.0], method: InterpolationMethod::Linear },
///     SmileParameterCurve::Constant,
/// ]);
/// assert_eq!(map.num_parameters(), 3);
///
/// let f = map.from_points(&[1.0, 3.0]).unwrap();
/// // [p0(1), p1(1), p0(3), p1(3)]
/// assert_eq!(f.evaluate(&[0.1, 0.3, 0.7]).unwrap(), vec![0.1, 0.7, 0.2, 0.7]);
/// ```
#[derive(Debug, Clone)]
pub struct SmileParameterTermStructure {
    curves: Vec<SmileParameterCurve>,
}

impl SmileParameterTermStructure {
    /// One curve per smile parameter.
    pub fn new(curves: Vec<SmileParameterCurve>) -> Self {
        Self { curves }
    }

    /// Number of smile parameters per expiry.
    pub fn num_smile_parameters(&self) -> usize {
        self.curves.len()
    }

    /// Total number of model parameters.
    pub fn num_parameters(&self) -> usize {
        self.curves.iter().map(SmileParameterCurve::num_parameters).sum()
    }
}

impl VectorFunctionProvider for SmileParameterTermStructure {
    fn from_points(&self, points: &[f64]) -> Result<Arc<dyn VectorFunction>, StrippingError> {
        if self.curves.is_empty() {
            return Err(ValidationError::Empty {
                name: "smile parameter curves".to_string(),
            }
            .into());
        }
        let blocks = self
            .curves
            .iter()
            .map(|c| c.sampled(points))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(PerExpiryParameters::new(blocks, points.len())))
    }
}

/// Parameter curves interleaved so that the output is grouped by expiry.
#[derive(Debug)]
struct PerExpiryParameters {
    blocks: Vec<Arc<dyn VectorFunction>>,
    offsets: Vec<usize>,
    num_points: usize,
    domain: usize,
}

impl PerExpiryParameters {
    fn new(blocks: Vec<Arc<dyn VectorFunction>>, num_points: usize) -> Self {
        let mut offsets = Vec::with_capacity(blocks.len());
        let mut domain = 0;
        for block in &blocks {
            offsets.push(domain);
            domain += block.size_of_domain();
        }
        Self {
            blocks,
            offsets,
            num_points,
            domain,
        }
    }

    fn slice<'a>(&self, k: usize, x: &'a [f64]) -> &'a [f64] {
        &x[self.offsets[k]..self.offsets[k] + self.blocks[k].size_of_domain()]
    }
}

impl VectorFunction for PerExpiryParameters {
    fn size_of_domain(&self) -> usize {
        self.domain
    }

    fn size_of_range(&self) -> usize {
        self.num_points * self.blocks.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        let width = self.blocks.len();
        let mut out = vec![0.0; self.size_of_range()];
        for (k, block) in self.blocks.iter().enumerate() {
            for (e, v) in block.evaluate(self.slice(k, x))?.into_iter().enumerate() {
                out[e * width + k] = v;
            }
        }
        Ok(out)
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        let width = self.blocks.len();
        let mut jac = zeros(self.size_of_range(), self.domain);
        for (k, block) in self.blocks.iter().enumerate() {
            let local = block.evaluate_jacobian(self.slice(k, x))?;
            for (e, row) in local.iter().enumerate() {
                let target = &mut jac[e * width + k][self.offsets[k]..self.offsets[k] + row.len()];
                target.copy_from_slice(row);
            }
        }
        Ok(jac)
    }
}

/// Caplet volatilities from a smile model whose parameters vary with expiry.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use caplet_core::math::functions::VectorFunction;
/// use caplet_models::models::SabrHaganSmile;
/// use caplet_stripping::vol_function::{
///     DiscreteVolatilityFunctionProvider, EvaluationGrid, SmileModelVolatilityProvider,
///     SmileParameterCurve, SmileParameterTermStructure,
/// };
///
/// let map = SmileParameterTermStructure::new(vec![SmileParameterCurve::Constant; 4]);
/// let provider = SmileModelVolatilityProvider::new(
///     Arc::new(SabrHaganSmile::new()),
///     Arc::new(map),
///     vec![1.0, 2.0],
///     vec![0.03, 0.032],
/// )
/// .unwrap();
/// let grid = EvaluationGrid::new(vec![(1.0, 0.02), (2.0, 0.02), (1.0, 0.04)]).unwrap();
/// let vols = provider.from_grid(&grid).unwrap().evaluate(&[0.03, 0.5, -0.2, 0.4]).unwrap();
/// assert_eq!(vols.len(), 3);
/// assert!(vols[0] > vols[2]);
/// ```
#[derive(Debug, Clone)]
pub struct SmileModelVolatilityProvider {
    model: Arc<dyn SmileModel>,
    parameter_map: Arc<dyn VectorFunctionProvider>,
    expiries: Vec<f64>,
    forwards: Vec<f64>,
    forward_curve: Option<LinearInterpolator>,
}

impl SmileModelVolatilityProvider {
    /// Build the provider.
    ///
    /// `expiries` and `forwards` describe the forward rate fixing at each
    /// expiry; grid expiries between them are interpolated linearly, and
    /// held flat outside.
    ///
    /// # Errors
    ///
    /// `expiries` must be positive and strictly ascending, and `forwards`
    /// positive with the same length.
    pub fn new(
        model: Arc<dyn SmileModel>,
        parameter_map: Arc<dyn VectorFunctionProvider>,
        expiries: Vec<f64>,
        forwards: Vec<f64>,
    ) -> Result<Self, StrippingError> {
        ensure_ascending_positive(&expiries, "forward expiries")?;
        ensure_length(&forwards, expiries.len(), "forwards")?;
        ensure_positive(&forwards, "forwards")?;
        let forward_curve = if expiries.len() > 1 {
            Some(LinearInterpolator::new(&expiries, &forwards).map_err(FunctionError::from)?)
        } else {
            None
        };
        Ok(Self {
            model,
            parameter_map,
            expiries,
            forwards,
            forward_curve,
        })
    }

    /// The smile model.
    pub fn model(&self) -> &Arc<dyn SmileModel> {
        &self.model
    }

    fn forward_at(&self, expiry: f64) -> f64 {
        if let Some(i) = self.expiries.iter().position(|&t| coincide(t, expiry)) {
            return self.forwards[i];
        }
        match &self.forward_curve {
            Some(curve) => curve.interpolate_flat(expiry),
            None => self.forwards[0],
        }
    }
}

impl DiscreteVolatilityFunctionProvider for SmileModelVolatilityProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        let expiries = grid.distinct_expiries();
        let strikes: Vec<Vec<f64>> = expiries
            .iter()
            .map(|&t| {
                distinct_sorted(
                    grid.points()
                        .iter()
                        .filter(|p| coincide(p.0, t))
                        .map(|p| p.1),
                )
            })
            .collect();

        let point_index = grid
            .points()
            .iter()
            .map(|&(t, k)| {
                let e = expiries.iter().position(|&x| coincide(x, t));
                let s = e.and_then(|e| strikes[e].iter().position(|&x| coincide(x, k)));
                e.zip(s).ok_or_else(|| {
                    ValidationError::invalid(format!("grid point ({t}, {k}) lost while grouping"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parameter_map = self.parameter_map.from_points(&expiries)?;
        let width = self.model.num_parameters();
        if parameter_map.size_of_range() != expiries.len() * width {
            return Err(ValidationError::length_mismatch(
                "smile parameter map range",
                expiries.len() * width,
                parameter_map.size_of_range(),
            )
            .into());
        }

        let forwards = expiries.iter().map(|&t| self.forward_at(t)).collect();
        let function = SmileVolatilityFunction {
            model: Arc::clone(&self.model),
            parameter_map,
            expiries,
            forwards,
            strikes,
            point_index,
            width,
        };
        Ok(DiscreteVolatilityFunction::new(grid.clone(), Arc::new(function))?)
    }
}

#[derive(Debug)]
struct SmileVolatilityFunction {
    model: Arc<dyn SmileModel>,
    parameter_map: Arc<dyn VectorFunction>,
    expiries: Vec<f64>,
    forwards: Vec<f64>,
    strikes: Vec<Vec<f64>>,
    /// (expiry index, strike index) of every grid point
    point_index: Vec<(usize, usize)>,
    width: usize,
}

impl SmileVolatilityFunction {
    fn block<'a>(&self, e: usize, params: &'a [f64]) -> &'a [f64] {
        &params[e * self.width..(e + 1) * self.width]
    }
}

impl VectorFunction for SmileVolatilityFunction {
    fn size_of_domain(&self) -> usize {
        self.parameter_map.size_of_domain()
    }

    fn size_of_range(&self) -> usize {
        self.point_index.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        let params = self.parameter_map.evaluate(x)?;
        let smiles = (0..self.expiries.len())
            .map(|e| {
                self.model
                    .volatilities(
                        self.forwards[e],
                        &self.strikes[e],
                        self.expiries[e],
                        self.block(e, &params),
                    )
                    .map_err(model_failure)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.point_index.iter().map(|&(e, s)| smiles[e][s]).collect())
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        let params = self.parameter_map.evaluate(x)?;
        let map_jac = self.parameter_map.evaluate_jacobian(x)?;
        let adjoints = (0..self.expiries.len())
            .map(|e| {
                self.model
                    .model_adjoint(
                        self.forwards[e],
                        &self.strikes[e],
                        self.expiries[e],
                        self.block(e, &params),
                    )
                    .map_err(model_failure)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let n = self.size_of_domain();
        let mut jac = zeros(self.point_index.len(), n);
        for (row, &(e, s)) in jac.iter_mut().zip(&self.point_index) {
            for (k, &a) in adjoints[e][s].iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                for (r, m) in row.iter_mut().zip(&map_jac[e * self.width + k]) {
                    *r += a * m;
                }
            }
        }
        Ok(jac)
    }
}
