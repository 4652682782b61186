//! HTTP handlers for creating irrigation systems
//!
//! Drafts are validated here and only then forwarded to the upstream
//! generators, so the upstream never sees a broken sprinkler chain.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::sprinkler::{ChainKind, ResolvedZone, SprinklerZoneChain};
use shared::{CenterPivotDraft, LinearMoveDraft, MicroIrrigationDraft};
use validator::Validate;

use crate::error::AppResult;
use crate::AppState;

/// A center pivot submitted for creation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCenterPivotInput {
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    pub draft: CenterPivotDraft,
}

/// A linear move submitted for grid generation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinearMoveInput {
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    pub draft: LinearMoveDraft,
}

/// A micro-irrigation block submitted for grid generation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMicroIrrigationInput {
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    pub draft: MicroIrrigationDraft,
}

/// The payload that was sent and what the upstream answered
#[derive(Debug, Serialize)]
pub struct SystemCreated<T> {
    pub request: T,
    pub result: Value,
}

/// Create a center pivot
pub async fn create_center_pivot(
    State(state): State<AppState>,
    Json(input): Json<CreateCenterPivotInput>,
) -> AppResult<Json<SystemCreated<shared::CenterPivotRequest>>> {
    input.validate()?;
    let request = input.draft.to_request(&input.user_id)?;
    let result = state.upstream.create_center_pivot(&request).await?;
    tracing::info!(
        "Created center pivot {} on {} with {} sprinkler zones",
        request.pivot_name,
        request.farm_name,
        request.sprinkler_zones.len()
    );
    Ok(Json(SystemCreated { request, result }))
}

/// Create a linear move and generate its cell grid
pub async fn create_linear_move(
    State(state): State<AppState>,
    Json(input): Json<CreateLinearMoveInput>,
) -> AppResult<Json<SystemCreated<shared::LinearMoveRequest>>> {
    input.validate()?;
    let request = input.draft.to_request(&input.user_id)?;
    let result = state.upstream.generate_linear_grid(&request).await?;
    tracing::info!(
        "Created linear move {} on {} with {} sprinkler zones",
        request.irrigation_system_name,
        request.farmname,
        request.sprinklerzones.len()
    );
    Ok(Json(SystemCreated { request, result }))
}

/// Create a micro-irrigation block and generate its cell grid
pub async fn create_micro_irrigation(
    State(state): State<AppState>,
    Json(input): Json<CreateMicroIrrigationInput>,
) -> AppResult<Json<SystemCreated<shared::MicroIrrigationRequest>>> {
    input.validate()?;
    let request = input.draft.to_request(&input.user_id)?;
    let result = state.upstream.generate_micro_grid(&request).await?;
    tracing::info!(
        "Created micro-irrigation block {} on {} ({} by {} grid, {} per hour)",
        request.irrigation_system_name,
        request.farmname,
        request.length_split,
        request.width_split,
        request.application_rate
    );
    Ok(Json(SystemCreated { request, result }))
}

/// Sprinkler zone bounds as typed into the form
#[derive(Debug, Deserialize, Validate)]
pub struct SprinklerZonesInput {
    pub kind: ChainKind,
    #[validate(range(min = 0.0))]
    pub envelope: f64,
    #[validate(length(min = 1))]
    pub bounds: Vec<(Option<f64>, Option<f64>)>,
}

/// Check a sprinkler chain without submitting anything
pub async fn validate_sprinkler_zones(
    Json(input): Json<SprinklerZonesInput>,
) -> AppResult<Json<Vec<ResolvedZone>>> {
    input.validate()?;
    let chain = SprinklerZoneChain::from_bounds(input.kind, input.envelope, &input.bounds)?;
    Ok(Json(chain.validate()?))
}
