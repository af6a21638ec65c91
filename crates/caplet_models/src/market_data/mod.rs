//! Market data for caplet decomposition.
//!
//! # Components
//!
//! - [`curves`]: Yield curve trait and implementations (FlatCurve, InterpolatedCurve)
//! - [`provider`]: Forward-rate and discount provider consumed when caps are decomposed
//! - [`error`]: Market data error types (MarketDataError)

pub mod curves;
pub mod error;
pub mod provider;

// Re-export commonly used types
pub use curves::{CurveInterpolation, FlatCurve, InterpolatedCurve, YieldCurve};
pub use error::MarketDataError;
pub use provider::{ForwardRateProvider, MultiCurve};
