//! Irrigation geometry, zone and prescription engine for the VRI planner
//!
//! This crate contains the pure core shared by the backend service and the
//! browser (via WASM). Nothing here performs I/O or logs; every operation
//! returns a typed result and leaves presentation to the caller.

pub mod error;
pub mod geometry;
pub mod models;
pub mod prescription;
pub mod registry;
pub mod sprinkler;
pub mod types;
pub mod units;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
