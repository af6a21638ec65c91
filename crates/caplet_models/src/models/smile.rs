//! Parametric smile interface.

use std::fmt;

use caplet_core::math::linalg::{zeros, Matrix};
use caplet_core::validation::ensure_length;

use super::error::ModelError;

/// A closed-form smile: volatilities across strikes at one expiry from a
/// small parameter vector, with the parameter adjoint.
pub trait SmileModel: Send + Sync + fmt::Debug {
    /// Number of model parameters.
    fn num_parameters(&self) -> usize;

    /// Parameter names, in parameter-vector order.
    fn parameter_names(&self) -> &'static [&'static str];

    /// Volatility at a single strike.
    fn volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
        params: &[f64],
    ) -> Result<f64, ModelError>;

    /// Volatilities at each strike.
    fn volatilities(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        params: &[f64],
    ) -> Result<Vec<f64>, ModelError> {
        strikes
            .iter()
            .map(|&k| self.volatility(forward, k, expiry, params))
            .collect()
    }

    /// `∂σ(Kᵢ)/∂pⱼ`, `strikes.len() × num_parameters`.
    ///
    /// Defaults to a central finite difference of [`volatilities`](Self::volatilities).
    fn model_adjoint(
        &self,
        forward: f64,
        strikes: &[f64],
        expiry: f64,
        params: &[f64],
    ) -> Result<Matrix, ModelError> {
        ensure_length(params, self.num_parameters(), "smile parameters")?;
        let mut adjoint = zeros(strikes.len(), params.len());
        let mut bumped = params.to_vec();
        for j in 0..params.len() {
            let h = 1e-6 * params[j].abs().max(1e-2);
            bumped[j] = params[j] + h;
            let up = self.volatilities(forward, strikes, expiry, &bumped)?;
            bumped[j] = params[j] - h;
            let down = self.volatilities(forward, strikes, expiry, &bumped)?;
            bumped[j] = params[j];
            for (row, (u, d)) in adjoint.iter_mut().zip(up.iter().zip(&down)) {
                row[j] = (u - d) / (2.0 * h);
            }
        }
        Ok(adjoint)
    }
}
