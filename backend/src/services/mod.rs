//! Business logic services for the VRI planner

pub mod prescription;
pub mod workspace;

pub use prescription::PrescriptionService;
pub use workspace::{WorkspaceKey, WorkspaceService, WorkspaceStore};
