//! Closed-form pricing of single caplets and floorlets.
//!
//! This module provides:
//! - Standard normal CDF and PDF (`distributions`)
//! - Black (1976) price, vega and implied volatility (`black76`)
//!
//! ## Design Principles
//!
//! - **Pure functions**: No state is held between calls, so the formulas are
//!   shared freely across threads and pricers
//! - **Numerical Stability**: Uses erfc-based CDF for accuracy in the tails

pub mod black76;
pub mod distributions;
pub mod error;

// Re-export main types at module level
pub use black76::{black_implied_vol, black_intrinsic, black_price, black_vega};
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
