//! Parametric volatility term structures.
//!
//! Both curves implement [`ParameterizedCurve`], so they plug into
//! [`ParameterizedCurveFunction`](caplet_core::math::functions::ParameterizedCurveFunction)
//! when a smile parameter is given a functional form in expiry.

use caplet_core::math::functions::ParameterizedCurve;

/// The ABCD curve `σ(t) = (a + b·t)·e^{−c·t} + d`.
///
/// Parameters are `[a, b, c, d]`. The hump sits at `t* = 1/c − a/b` when
/// `b > 0` and `c > 0`.
///
/// # Example
///
/// ```
/// use caplet_core::math::functions::ParameterizedCurve;
/// use caplet_models::models::AbcdCurve;
///
/// let curve = AbcdCurve;
/// let params = [0.1, 0.2, 0.8, 0.12];
/// // Short end: a + d
/// assert!((curve.value(0.0, &params) - 0.22).abs() < 1e-15);
/// // Long end tends to d
/// assert!((curve.value(100.0, &params) - 0.12).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AbcdCurve;

impl ParameterizedCurve for AbcdCurve {
    fn num_parameters(&self) -> usize {
        4
    }

    fn value(&self, t: f64, params: &[f64]) -> f64 {
        let (a, b, c, d) = (params[0], params[1], params[2], params[3]);
        (a + b * t) * (-c * t).exp() + d
    }

    fn parameter_sensitivity(&self, t: f64, params: &[f64]) -> Vec<f64> {
        let (a, b, c) = (params[0], params[1], params[2]);
        let decay = (-c * t).exp();
        vec![decay, t * decay, -t * (a + b * t) * decay, 1.0]
    }
}

/// A single level, `σ(t) = p₀`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantCurve;

impl ParameterizedCurve for ConstantCurve {
    fn num_parameters(&self) -> usize {
        1
    }

    fn value(&self, _t: f64, params: &[f64]) -> f64 {
        params[0]
    }

    fn parameter_sensitivity(&self, _t: f64, _params: &[f64]) -> Vec<f64> {
        vec![1.0]
    }
}
