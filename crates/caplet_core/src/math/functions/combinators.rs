//! Elementary vector functions and their combinators.

use std::sync::Arc;

use super::VectorFunction;
use crate::math::linalg::{identity, mat_mul, mat_vec, zeros, Matrix};
use crate::types::{FunctionError, ValidationError};

/// `x ↦ A·x` with constant Jacobian `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearVectorFunction {
    matrix: Matrix,
    domain: usize,
}

impl LinearVectorFunction {
    /// Wrap a matrix. Every row must have `domain` entries.
    pub fn new(matrix: Matrix, domain: usize) -> Result<Self, ValidationError> {
        if let Some(i) = matrix.iter().position(|row| row.len() != domain) {
            return Err(ValidationError::length_mismatch(
                format!("matrix row {i}"),
                domain,
                matrix[i].len(),
            ));
        }
        Ok(Self { matrix, domain })
    }

    /// The constant Jacobian.
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }
}

impl VectorFunction for LinearVectorFunction {
    fn size_of_domain(&self) -> usize {
        self.domain
    }

    fn size_of_range(&self) -> usize {
        self.matrix.len()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(mat_vec(&self.matrix, x))
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        Ok(self.matrix.clone())
    }
}

/// Identity map on `n` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityFunction {
    n: usize,
}

impl IdentityFunction {
    /// Identity on `n` parameters.
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl VectorFunction for IdentityFunction {
    fn size_of_domain(&self) -> usize {
        self.n
    }

    fn size_of_range(&self) -> usize {
        self.n
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(x.to_vec())
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        Ok(identity(self.n))
    }
}

/// `outer(inner(x))` with Jacobian `J_outer(inner(x))·J_inner(x)`.
#[derive(Debug, Clone)]
pub struct ComposedVectorFunction {
    outer: Arc<dyn VectorFunction>,
    inner: Arc<dyn VectorFunction>,
}

impl ComposedVectorFunction {
    /// Compose two functions. The inner range must equal the outer domain.
    pub fn new(
        outer: Arc<dyn VectorFunction>,
        inner: Arc<dyn VectorFunction>,
    ) -> Result<Self, ValidationError> {
        if outer.size_of_domain() != inner.size_of_range() {
            return Err(ValidationError::length_mismatch(
                "inner function range",
                outer.size_of_domain(),
                inner.size_of_range(),
            ));
        }
        Ok(Self { outer, inner })
    }
}

impl VectorFunction for ComposedVectorFunction {
    fn size_of_domain(&self) -> usize {
        self.inner.size_of_domain()
    }

    fn size_of_range(&self) -> usize {
        self.outer.size_of_range()
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.outer.evaluate(&self.inner.evaluate(x)?)
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        let y = self.inner.evaluate(x)?;
        let j_outer = self.outer.evaluate_jacobian(&y)?;
        let j_inner = self.inner.evaluate_jacobian(x)?;
        Ok(mat_mul(&j_outer, &j_inner))
    }
}

/// Several independent functions side by side.
///
/// The input is split into consecutive blocks, one per function, and the
/// outputs are concatenated in the same order. The Jacobian is block diagonal.
#[derive(Debug, Clone)]
pub struct ConcatenatedVectorFunction {
    functions: Vec<Arc<dyn VectorFunction>>,
    domain: usize,
    range: usize,
}

impl ConcatenatedVectorFunction {
    /// Concatenate a non-empty list of functions.
    pub fn new(functions: Vec<Arc<dyn VectorFunction>>) -> Result<Self, ValidationError> {
        if functions.is_empty() {
            return Err(ValidationError::Empty {
                name: "functions".to_string(),
            });
        }
        let domain = functions.iter().map(|f| f.size_of_domain()).sum();
        let range = functions.iter().map(|f| f.size_of_range()).sum();
        Ok(Self {
            functions,
            domain,
            range,
        })
    }
}

impl VectorFunction for ConcatenatedVectorFunction {
    fn size_of_domain(&self) -> usize {
        self.domain
    }

    fn size_of_range(&self) -> usize {
        self.range
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        let mut out = Vec::with_capacity(self.range);
        let mut start = 0;
        for f in &self.functions {
            let end = start + f.size_of_domain();
            out.extend(f.evaluate(&x[start..end])?);
            start = end;
        }
        Ok(out)
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        let mut jac = zeros(self.range, self.domain);
        let (mut row0, mut col0) = (0, 0);
        for f in &self.functions {
            let block = f.evaluate_jacobian(&x[col0..col0 + f.size_of_domain()])?;
            for (i, row) in block.iter().enumerate() {
                jac[row0 + i][col0..col0 + row.len()].copy_from_slice(row);
            }
            row0 += f.size_of_range();
            col0 += f.size_of_domain();
        }
        Ok(jac)
    }
}

/// Element-wise parameter transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParameterTransform {
    /// No transform.
    #[default]
    Identity,
    /// `y = exp(x)`: any real parameter maps to a positive value.
    Exp,
}

impl ParameterTransform {
    /// Forward transform.
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Exp => x.exp(),
        }
    }

    /// `dy/dx`.
    #[inline]
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Self::Identity => 1.0,
            Self::Exp => x.exp(),
        }
    }

    /// Inverse transform, used to map a guess in model space back to parameter space.
    pub fn inverse(&self, y: f64) -> Result<f64, ValidationError> {
        match self {
            Self::Identity => Ok(y),
            Self::Exp if y > 0.0 => Ok(y.ln()),
            Self::Exp => Err(ValidationError::invalid(format!(
                "cannot invert exp transform at non-positive value {y}"
            ))),
        }
    }
}

/// [`ParameterTransform`] applied to each of `n` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformFunction {
    transform: ParameterTransform,
    n: usize,
}

impl TransformFunction {
    /// Transform on `n` parameters.
    pub fn new(transform: ParameterTransform, n: usize) -> Self {
        Self { transform, n }
    }

    /// The element-wise transform.
    pub fn transform(&self) -> ParameterTransform {
        self.transform
    }
}

impl VectorFunction for TransformFunction {
    fn size_of_domain(&self) -> usize {
        self.n
    }

    fn size_of_range(&self) -> usize {
        self.n
    }

    fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FunctionError> {
        self.check_domain(x)?;
        Ok(x.iter().map(|&v| self.transform.apply(v)).collect())
    }

    fn evaluate_jacobian(&self, x: &[f64]) -> Result<Matrix, FunctionError> {
        self.check_domain(x)?;
        let mut jac = zeros(self.n, self.n);
        for (i, &v) in x.iter().enumerate() {
            jac[i][i] = self.transform.derivative(v);
        }
        Ok(jac)
    }
}
