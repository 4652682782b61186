//! HTTP handlers

mod geometry;
mod health;
mod prescriptions;
mod systems;
mod workspaces;

pub use geometry::*;
pub use health::*;
pub use prescriptions::*;
pub use systems::*;
pub use workspaces::*;

use validator::ValidationError;

/// Adapt a core validation rule to a validator field error
fn field_rule(code: &'static str, result: Result<(), &'static str>) -> Result<(), ValidationError> {
    result.map_err(|reason| {
        let mut error = ValidationError::new(code);
        error.message = Some(reason.into());
        error
    })
}
