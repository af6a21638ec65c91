//! # Caplet Stripping (L2.5: Calibration)
//!
//! Recovers caplet volatilities from market quotes on caps and floors.
//!
//! A cap is a strip of caplets, so its quote constrains an aggregate of the
//! caplet volatilities rather than any one of them. This crate fits a
//! parameterised caplet volatility model to a batch of cap quotes by
//! weighted (optionally penalised and constrained) least squares, or by
//! root finding when the problem is square.
//!
//! ## Layers
//!
//! - [`MultiCapFloorPricer`]: joint pricing of a cap batch over its shared
//!   caplet universe
//! - [`vol_function`]: parameterisations from model parameters to caplet
//!   volatilities at the caplet `(expiry, strike)` points
//! - [`CapletStrippingImp`]: the calibration engine chaining the two
//! - [`strippers`]: ready-made strategies behind the [`CapletStripper`] trait
//! - [`combined`]: pooling of independently stripped buckets into one surface
//!
//! ## Feature Flags
//!
//! - `parallel` (default): solve independent buckets on the rayon pool
//! - `num-dual-mode` (default): smile parameter sensitivities by dual numbers
//! - `serde`: serialisation of configurations and results
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use caplet_models::instruments::{CapFloor, IborIndex};
//! use caplet_models::market_data::{FlatCurve, MultiCurve};
//! use caplet_stripping::{CapletStripper, DirectStripper, MarketDataType, MultiCapFloorPricer};
//!
//! let curves = MultiCurve::new(Arc::new(FlatCurve::new(0.03)));
//! let index = IborIndex::new("USD-LIBOR", 0.5).unwrap();
//! let caps = [2.0, 3.0, 4.0]
//!     .iter()
//!     .map(|&end| CapFloor::from_schedule(index.clone(), 0.03, true, 0.5, end, &curves).unwrap())
//!     .collect();
//! let pricer = Arc::new(MultiCapFloorPricer::new(caps).unwrap());
//!
//! let stripper = DirectStripper::with_defaults(pricer).unwrap();
//! let result = stripper
//!     .solve(&[0.25, 0.24, 0.23], MarketDataType::Vol, None, None)
//!     .unwrap();
//!
//! assert_eq!(result.caplet_volatilities().unwrap().len(), 7);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod combined;
pub mod error;
pub mod imp;
pub mod pricer;
pub mod result;
pub mod strippers;
pub mod vol_function;

pub use combined::{strip_buckets, BucketJob, CombinedCapletStrippingResults, VolatilitySurfaceGrid};
pub use error::StrippingError;
pub use imp::{CapletStrippingImp, Constraint, MarketDataType};
pub use pricer::MultiCapFloorPricer;
pub use result::{CapletStrippingResult, CapletVolatilityPoint, StrippingMethod};
pub use strippers::{
    CapletStripper, DirectStripper, PSplineStripper, SmileModelStripper, StripperConfig, TermStructureStripper,
};
pub use vol_function::{
    DirectVolatilityProvider, DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider, EvaluationGrid,
    InterpolatedSurfaceProvider, InterpolatedTermStructureProvider, PSplineProvider, SmileModelVolatilityProvider,
    TransformedVolatilityProvider,
};
