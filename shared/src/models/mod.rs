//! Domain models for the VRI planner

mod cell;
mod prescription;
mod system;
mod zone;

pub use cell::*;
pub use prescription::*;
pub use system::*;
pub use zone::*;
