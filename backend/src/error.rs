//! Error handling for the VRI planner service
//!
//! Wraps the core's typed errors and maps them onto consistent JSON responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    CollectionError, DraftError, GeometryError, PrescriptionError, RegistryError, UnitError,
    ZoneChainError,
};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Input errors
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    ZoneChain(#[from] ZoneChainError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Units(#[from] UnitError),

    // Zone and prescription editing
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Prescription(#[from] PrescriptionError),

    #[error("Workspace not loaded: {0}")]
    WorkspaceNotFound(String),

    #[error("No prescription generated for {0}")]
    PrescriptionNotLoaded(String),

    // Upstream errors
    #[error("Upstream returned an unusable cell collection: {0}")]
    InvalidCells(#[from] CollectionError),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        let message = self.to_string();
        match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message)
                    .with_details(json!(errors.field_errors())),
            ),
            AppError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("BAD_REQUEST", message),
            ),
            AppError::Geometry(GeometryError::InvalidGeometry { field, .. }) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_GEOMETRY", message).with_details(json!({ "field": field })),
            ),
            AppError::ZoneChain(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_SPRINKLER_ZONES", message),
            ),
            AppError::Draft(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_DRAFT", message),
            ),
            AppError::Units(_) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_UNITS", message),
            ),
            AppError::Registry(err) => registry_status(err, message),
            AppError::Prescription(err) => prescription_status(err, message),
            AppError::WorkspaceNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("WORKSPACE_NOT_FOUND", message),
            ),
            AppError::PrescriptionNotLoaded(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("PRESCRIPTION_NOT_FOUND", message),
            ),
            AppError::InvalidCells(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("INVALID_CELL_COLLECTION", message),
            ),
            AppError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("UPSTREAM_ERROR", message),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred".to_string()),
            ),
        }
    }
}

fn registry_status(err: &RegistryError, message: String) -> (StatusCode, ErrorDetail) {
    match err {
        RegistryError::CellAlreadyZoned { conflicts } => (
            StatusCode::CONFLICT,
            ErrorDetail::new("CELL_ALREADY_ZONED", message)
                .with_details(json!({ "conflicts": conflicts })),
        ),
        RegistryError::DuplicateZoneName(name) => (
            StatusCode::CONFLICT,
            ErrorDetail::new("DUPLICATE_ZONE_NAME", message).with_details(json!({ "name": name })),
        ),
        RegistryError::EmptySelection => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("EMPTY_SELECTION", message),
        ),
        RegistryError::EmptyZoneName => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("EMPTY_ZONE_NAME", message),
        ),
        RegistryError::ZoneNotFound(_) => (
            StatusCode::NOT_FOUND,
            ErrorDetail::new("ZONE_NOT_FOUND", message),
        ),
        RegistryError::UnknownCell(id) => (
            StatusCode::NOT_FOUND,
            ErrorDetail::new("UNKNOWN_CELL", message).with_details(json!({ "feature_id": id })),
        ),
    }
}

fn prescription_status(err: &PrescriptionError, message: String) -> (StatusCode, ErrorDetail) {
    match err {
        PrescriptionError::RateKeyNotFound { missing, updated } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("RATE_KEY_NOT_FOUND", message)
                .with_details(json!({ "missing": missing, "updated": updated })),
        ),
        PrescriptionError::InvalidRate(_) => (
            StatusCode::BAD_REQUEST,
            ErrorDetail::new("INVALID_RATE", message),
        ),
        // The document itself came from upstream
        PrescriptionError::Xml(_)
        | PrescriptionError::NamespaceNotFound
        | PrescriptionError::Encoding(_) => (
            StatusCode::BAD_GATEWAY,
            ErrorDetail::new("INVALID_PRESCRIPTION", message),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
