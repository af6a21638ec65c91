//! Solver configuration types.

/// Configuration for scalar root-finding algorithms.
///
/// # Example
///
/// ```
/// use caplet_core::math::solvers::SolverConfig;
///
/// let config = SolverConfig::default();
/// assert!(config.tolerance < 1e-8);
///
/// let custom = SolverConfig::new(1e-12, 200);
/// assert_eq!(custom.max_iterations, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Convergence tolerance: the solver stops when `|f(x)| < tolerance`
    /// or the bracket is narrower than it.
    pub tolerance: f64,

    /// Maximum number of iterations before giving up.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    /// Default values: `tolerance = 1e-10`, `max_iterations = 100`.
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with specified values.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert!((config.tolerance - 1e-10).abs() < 1e-20);
    }
}
