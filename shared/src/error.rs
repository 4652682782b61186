//! Typed errors for the irrigation geometry and zone engine
//!
//! Every error here is recoverable and user-correctable; callers decide how to
//! present them. Conflict errors always carry the complete set of offending
//! ids so they can be reported in one message.

use serde::Serialize;
use thiserror::Error;

use crate::models::{FeatureId, RateKey};

/// Bad numeric input to the geometry functions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid geometry: {field} {reason}")]
    InvalidGeometry { field: &'static str, reason: String },
}

impl GeometryError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        GeometryError::InvalidGeometry {
            field,
            reason: reason.into(),
        }
    }
}

/// Inconsistent sprinkler zone configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneChainError {
    #[error("Sprinkler zone {index}: {side} bound must be greater than zero")]
    NonPositiveBound { index: usize, side: BoundSide },

    #[error("Sprinkler zone {index}: {side} bound is not set")]
    MissingBound { index: usize, side: BoundSide },

    #[error("Sprinkler zone {index}: inner bound {inner} is larger than outer bound {outer}")]
    InvertedBound { index: usize, inner: f64, outer: f64 },

    #[error("Sprinkler zone {index}: bound {bound} exceeds the shape's outer measurement {envelope}")]
    BoundExceedsEnvelope {
        index: usize,
        bound: f64,
        envelope: f64,
    },

    #[error("Sprinkler zone {index}: inner bound {inner} does not match previous outer bound {previous_outer}")]
    Discontinuous {
        index: usize,
        inner: f64,
        previous_outer: f64,
    },

    #[error("A sprinkler chain needs at least one zone")]
    InvalidZoneCount,

    #[error("The last zone's outer bound follows the shape and cannot be edited")]
    EnvelopeLocked,

    #[error("Sprinkler zone {index} does not exist (chain has {count} zones)")]
    ZoneIndexOutOfRange { index: usize, count: usize },
}

/// Which end of a sprinkler zone a bound refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    Inner,
    Outer,
}

impl std::fmt::Display for BoundSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundSide::Inner => write!(f, "inner"),
            BoundSide::Outer => write!(f, "outer"),
        }
    }
}

/// A cell that could not be selected because a zone already owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneConflict {
    pub feature_id: FeatureId,
    pub zone_name: String,
}

/// Management zone registry conflicts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Cells already belong to a zone: {}", describe_conflicts(.conflicts))]
    CellAlreadyZoned { conflicts: Vec<ZoneConflict> },

    #[error("Management zone name must be unique: {0}")]
    DuplicateZoneName(String),

    #[error("No cells are selected")]
    EmptySelection,

    #[error("Management zone name cannot be empty")]
    EmptyZoneName,

    #[error("Management zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Unknown cell: {0}")]
    UnknownCell(FeatureId),
}

fn describe_conflicts(conflicts: &[ZoneConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{} ({})", c.feature_id, c.zone_name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prescription document and merge failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrescriptionError {
    #[error("Rate keys not found in prescription: {} ({updated} updated)", join_keys(.missing))]
    RateKeyNotFound { missing: Vec<RateKey>, updated: usize },

    #[error("Malformed prescription document: {0}")]
    Xml(String),

    #[error("No known namespace contains MapZoneRate elements")]
    NamespaceNotFound,

    #[error("Prescription payload could not be decoded: {0}")]
    Encoding(String),

    #[error("Invalid watering rate: {0}")]
    InvalidRate(String),
}

/// Cell collection parsing failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    #[error("Cell collection has no features array")]
    MissingFeatures,

    #[error("Feature {index} is invalid: {reason}")]
    InvalidFeature { index: usize, reason: String },

    #[error("Feature id {0} appears more than once in the cell collection")]
    DuplicateFeatureId(FeatureId),
}

fn join_keys(keys: &[RateKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unit conversion and application rate input errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("Irrigation efficiency must be a fraction between 0 and 1, got {0}")]
    EfficiencyOutOfRange(f64),
}

/// An irrigation-system draft that cannot be submitted yet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Chain(#[from] ZoneChainError),

    #[error(transparent)]
    Units(#[from] UnitError),

    #[error("{field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Choose a start and end angle for the pivot")]
    MissingSector,

    #[error("Choose a start point on the map")]
    MissingStartPoint,
}
