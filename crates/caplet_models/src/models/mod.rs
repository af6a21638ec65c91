//! Smile and term-structure models used to parameterise caplet volatilities.
//!
//! This module provides:
//! - [`SmileModel`]: closed-form volatility smile with parameter adjoint
//! - [`SabrHaganSmile`]: SABR with the Hagan lognormal expansion
//! - [`AbcdCurve`], [`ConstantCurve`]: parametric curves in expiry

pub mod error;
pub mod sabr;
pub mod smile;
pub mod term_structure;

pub use error::ModelError;
pub use sabr::SabrHaganSmile;
pub use smile::SmileModel;
pub use term_structure::{AbcdCurve, ConstantCurve};
