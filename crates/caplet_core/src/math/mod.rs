//! Numerical building blocks for calibration.
//!
//! - `linalg`: dense matrix helpers and linear solves
//! - `interpolators`: 1-D and 2-D interpolation with node sensitivities
//! - `bspline`: uniform B-spline bases
//! - `penalty`: difference operators and roughness penalty matrices
//! - `functions`: differentiable vector functions and their combinators
//! - `solvers`: scalar root finders, Levenberg-Marquardt and vector Newton

pub mod bspline;
pub mod functions;
pub mod interpolators;
pub mod linalg;
pub mod penalty;
pub mod solvers;
