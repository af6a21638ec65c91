//! # caplet_core: Numerical Foundation for Caplet Stripping
//!
//! ## Layer 1 (Foundation) Role
//!
//! caplet_core is the bottom layer of the workspace, providing:
//! - Dense linear algebra and difference penalties (`math::linalg`, `math::penalty`)
//! - Interpolators with node sensitivities (`math::interpolators`)
//! - Uniform B-spline bases (`math::bspline`)
//! - Differentiable vector functions (`math::functions`)
//! - Scalar and vector solvers, including penalised Levenberg-Marquardt (`math::solvers`)
//! - Dual number integration (`types::dual`)
//! - Error types: `ValidationError`, `InterpolationError`, `SolverError`, `FunctionError` (`types::error`)
//! - Eager input validation (`validation`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other caplet_* crates, with minimal external dependencies:
//! - num-dual: Dual number types and automatic differentiation (optional)
//! - thiserror: Error derivation
//! - tracing: Solver iteration traces
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use caplet_core::math::interpolators::{Interpolator, LinearInterpolator};
//! use caplet_core::math::solvers::LevenbergMarquardtSolver;
//!
//! let curve = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.20, 0.25, 0.22]).unwrap();
//! assert!((curve.interpolate(0.5).unwrap() - 0.225).abs() < 1e-12);
//!
//! let fit = LevenbergMarquardtSolver::with_defaults()
//!     .solve(|p: &[f64]| vec![p[0] - 0.2], vec![0.1])
//!     .unwrap();
//! assert!((fit.params[0] - 0.2).abs() < 1e-8);
//! ```
//!
//! ## Feature Flags
//!
//! - `num-dual-mode` (default): Use num-dual for automatic differentiation
//! - `serde`: Enable serialisation for error and configuration types

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod math;
pub mod types;
pub mod validation;
