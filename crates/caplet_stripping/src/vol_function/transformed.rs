//! Element-wise parameter transforms over another provider.

use std::sync::Arc;

use caplet_core::math::functions::{ComposedVectorFunction, ParameterTransform, TransformFunction};

use super::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid};
use crate::error::StrippingError;

/// `inner(T(x))` for an element-wise transform `T`.
///
/// With [`ParameterTransform::Exp`] the inner provider only ever sees
/// positive parameters, so an interpolated term structure stays positive
/// without a constraint.
#[derive(Debug, Clone)]
pub struct TransformedVolatilityProvider {
    inner: Arc<dyn DiscreteVolatilityFunctionProvider>,
    transform: ParameterTransform,
}

impl TransformedVolatilityProvider {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn DiscreteVolatilityFunctionProvider>, transform: ParameterTransform) -> Self {
        Self { inner, transform }
    }

    /// The transform applied to the parameters.
    pub fn transform(&self) -> ParameterTransform {
        self.transform
    }
}

impl DiscreteVolatilityFunctionProvider for TransformedVolatilityProvider {
    fn from_grid(&self, grid: &EvaluationGrid) -> Result<DiscreteVolatilityFunction, StrippingError> {
        let inner = self.inner.from_grid(grid)?;
        let n = inner.num_parameters();
        let composed = ComposedVectorFunction::new(
            Arc::new(inner),
            Arc::new(TransformFunction::new(self.transform, n)),
        )?;
        Ok(DiscreteVolatilityFunction::new(grid.clone(), Arc::new(composed))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vol_function::test_support::assert_jacobian_consistent;
    use crate::vol_function::InterpolatedTermStructureProvider;
    use approx::assert_relative_eq;
    use caplet_core::math::functions::VectorFunction;
    use caplet_core::math::interpolators::InterpolationMethod;

    #[test]
    fn test_exp_transform_keeps_vols_positive() {
        let inner =
            InterpolatedTermStructureProvider::new(vec![1.0, 2.0], InterpolationMethod::Linear).unwrap();
        let provider = TransformedVolatilityProvider::new(Arc::new(inner), ParameterTransform::Exp);
        let grid = EvaluationGrid::new(vec![(0.5, 0.03), (1.5, 0.03), (3.0, 0.03)]).unwrap();
        let f = provider.from_grid(&grid).unwrap();

        let x = [(-5.0_f64), 0.2_f64.ln()];
        let vols = f.evaluate(&x).unwrap();
        assert!(vols.iter().all(|&v| v > 0.0));
        assert_relative_eq!(vols[2], 0.2, epsilon = 1e-14);
        assert_jacobian_consistent(&f, &x, 1e-7);
    }
}
