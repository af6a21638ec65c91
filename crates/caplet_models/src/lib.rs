//! # Caplet Models (L2: Business Logic)
//!
//! Instruments, market data and volatility models for caplet stripping.
//!
//! This crate provides:
//! - Caplets, floorlets and caps/floors on an IBOR index
//! - Black (1976) pricing, vega and implied volatility
//! - Discount and projection curves behind a forward-rate provider
//! - Smile models (SABR) and parametric term structures (ABCD)
//!
//! ## Design Principles
//!
//! - **Immutable instruments**: forwards and discount factors are resolved
//!   once, at construction
//! - **Adjoint-ready models**: smile formulas are generic over
//!   [`AdScalar`](caplet_core::types::dual::AdScalar) so parameter
//!   derivatives come from dual numbers under `num-dual-mode`
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use caplet_models::instruments::{CapFloor, IborIndex};
//! use caplet_models::market_data::{FlatCurve, MultiCurve};
//!
//! let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.025)));
//! let index = IborIndex::new("EURIBOR", 0.5).unwrap();
//! let cap = CapFloor::from_schedule(index, 0.03, true, 0.5, 5.0, &curves).unwrap();
//!
//! let price = cap.price(0.3);
//! assert!(price > cap.intrinsic_value());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod instruments;
pub mod market_data;
pub mod models;
