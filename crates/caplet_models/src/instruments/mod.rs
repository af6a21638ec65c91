//! Cap/floor instruments and their decomposition into caplets.
//!
//! This module provides:
//! - [`IborIndex`]: The floating-rate index a cap references
//! - [`CapletPeriod`] and [`Caplet`]: One option on one forward fixing
//! - [`CapFloor`]: A strip of caplets sharing one strike and call/put flag
//! - [`InstrumentError`]: Construction errors

pub mod capfloor;
pub mod caplet;
pub mod error;
pub mod index;

pub use capfloor::CapFloor;
pub use caplet::{Caplet, CapletPeriod};
pub use error::InstrumentError;
pub use index::IborIndex;
