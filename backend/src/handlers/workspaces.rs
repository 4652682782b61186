//! HTTP handlers for cell selection and management zones

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_treatment_percent, validate_zone_color, validate_zone_name, Bounds, FeatureId,
    TreatmentMetadata,
};
use validator::{Validate, ValidationError};

use super::field_rule;
use crate::error::{AppError, AppResult};
use crate::services::workspace::{NewZone, SelectionView, WorkspaceView, ZoneSummary};
use crate::services::WorkspaceKey;
use crate::AppState;

/// `/:user_id/:farm_name/:system_name`
pub type SystemPath = Path<(String, String, String)>;

fn key((user_id, farm_name, system_name): (String, String, String)) -> WorkspaceKey {
    WorkspaceKey::new(user_id, farm_name, system_name)
}

/// Input for loading a workspace
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoadWorkspaceInput {
    #[validate(length(min = 1, max = 100))]
    pub gateway: Option<String>,
}

/// Load cells and saved zones from upstream
pub async fn load_workspace(
    State(state): State<AppState>,
    Path(path): SystemPath,
    Json(input): Json<LoadWorkspaceInput>,
) -> AppResult<Json<WorkspaceView>> {
    input.validate()?;
    let view = state
        .workspace_service()
        .load(key(path), input.gateway)
        .await?;
    Ok(Json(view))
}

/// Get the cells, styles, zones and selection of a loaded workspace
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(path): SystemPath,
) -> AppResult<Json<WorkspaceView>> {
    let view = state.workspace_service().view(&key(path)).await?;
    Ok(Json(view))
}

/// Add one cell to the selection
pub async fn select_cell(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name, feature_id)): Path<(String, String, String, String)>,
) -> AppResult<Json<SelectionView>> {
    let view = state
        .workspace_service()
        .select_cell(
            &key((user_id, farm_name, system_name)),
            FeatureId::new(feature_id),
        )
        .await?;
    Ok(Json(view))
}

/// Select a cell, or deselect it if already selected (map click)
pub async fn toggle_cell(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name, feature_id)): Path<(String, String, String, String)>,
) -> AppResult<Json<SelectionView>> {
    let view = state
        .workspace_service()
        .toggle_cell(
            &key((user_id, farm_name, system_name)),
            FeatureId::new(feature_id),
        )
        .await?;
    Ok(Json(view))
}

/// Remove one cell from the selection
pub async fn deselect_cell(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name, feature_id)): Path<(String, String, String, String)>,
) -> AppResult<Json<SelectionView>> {
    let view = state
        .workspace_service()
        .deselect_cell(
            &key((user_id, farm_name, system_name)),
            FeatureId::new(feature_id),
        )
        .await?;
    Ok(Json(view))
}

/// Input for a rectangle drawn over the cells
#[derive(Debug, Deserialize)]
pub struct SelectRegionInput {
    pub bounds: Bounds,
}

/// Select every unzoned cell touching a rectangle
pub async fn select_region(
    State(state): State<AppState>,
    Path(path): SystemPath,
    Json(input): Json<SelectRegionInput>,
) -> AppResult<Json<SelectionView>> {
    let bounds = input.bounds;
    if !bounds.south_west.is_finite() || !bounds.north_east.is_finite() {
        return Err(AppError::BadRequest("region bounds must be finite".to_string()));
    }
    let view = state
        .workspace_service()
        .select_region(&key(path), bounds)
        .await?;
    Ok(Json(view))
}

/// Clear the selection
pub async fn clear_selection(
    State(state): State<AppState>,
    Path(path): SystemPath,
) -> AppResult<Json<SelectionView>> {
    let view = state.workspace_service().clear_selection(&key(path)).await?;
    Ok(Json(view))
}

fn zone_name(name: &str) -> Result<(), ValidationError> {
    field_rule("zone_name", validate_zone_name(name))
}

fn zone_color(color: &str) -> Result<(), ValidationError> {
    field_rule("zone_color", validate_zone_color(color))
}

fn treatment_percent(percent: &Decimal) -> Result<(), ValidationError> {
    field_rule("irrigation_treatment", validate_treatment_percent(*percent))
}

/// Input for creating a zone from the selection
#[derive(Debug, Deserialize, Validate)]
pub struct CreateZoneInput {
    #[validate(custom = "zone_name")]
    pub name: String,
    #[validate(custom = "zone_color")]
    pub color: String,
    #[validate(custom = "treatment_percent")]
    pub irrigation_treatment: Option<Decimal>,
    pub irrigation_schedule_method: Option<String>,
    pub nodeid: Option<String>,
}

/// Create a management zone from the selected cells
pub async fn create_zone(
    State(state): State<AppState>,
    Path(path): SystemPath,
    Json(input): Json<CreateZoneInput>,
) -> AppResult<Json<ZoneSummary>> {
    input.validate()?;
    let zone = NewZone {
        name: input.name,
        color: input.color,
        treatment: TreatmentMetadata {
            treatment_percent: input.irrigation_treatment,
            schedule_method: input.irrigation_schedule_method,
            node_id: input.nodeid,
        },
    };
    let summary = state
        .workspace_service()
        .create_zone(&key(path), zone)
        .await?;
    Ok(Json(summary))
}

/// Delete a management zone; its cells become unassigned
pub async fn delete_zone(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name, zone_name)): Path<(String, String, String, String)>,
) -> AppResult<Json<ZoneSummary>> {
    let summary = state
        .workspace_service()
        .delete_zone(&key((user_id, farm_name, system_name)), &zone_name)
        .await?;
    Ok(Json(summary))
}
