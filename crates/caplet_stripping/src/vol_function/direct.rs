//! One parameter per caplet.

use std::sync::Arc;

use caplet_core::math::functions::IdentityFunction;

use super::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid};
use crate::error::StrippingError;

/// The parameters are the caplet volatilities; the Jacobian is the identity.
///
/// There are as many parameters as grid points, usually more than caps, so
/// fits with this provider need a penalty to be well posed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectVolatilityProvider;

impl DirectVolatilityProvider {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

impl DiscreteVolatilityFunctionProvider for DirectVolatilityProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        Ok(DiscreteVolatilityFunction::new(
            grid.clone(),
            Arc::new(IdentityFunction::new(grid.len())),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caplet_core::math::functions::VectorFunction;
    use caplet_core::math::linalg::identity;

    #[test]
    fn test_identity_map() {
        let grid = EvaluationGrid::new(vec![(0.5, 0.03), (1.0, 0.03), (1.5, 0.03)]).unwrap();
        let f = DirectVolatilityProvider::new().from_grid(&grid).unwrap();
        assert_eq!(f.num_parameters(), 3);
        let x = [0.2, 0.25, 0.22];
        assert_eq!(f.evaluate(&x).unwrap(), x.to_vec());
        assert_eq!(f.evaluate_jacobian(&x).unwrap(), identity(3));
    }
}
