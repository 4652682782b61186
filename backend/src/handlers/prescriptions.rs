//! HTTP handlers for prescription maps

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{validate_watering_rate, RateKey};
use validator::{Validate, ValidationError};

use super::field_rule;
use super::workspaces::SystemPath;
use crate::error::AppResult;
use crate::services::prescription::{PrescriptionExport, PrescriptionView, RateUpdate};
use crate::services::WorkspaceKey;
use crate::AppState;

/// Query parameters for prescription generation
#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub date: NaiveDate,
}

/// Generate the prescription map for a day
pub async fn generate_prescription(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name)): SystemPath,
    Query(query): Query<GenerateQuery>,
) -> AppResult<Json<PrescriptionView>> {
    let key = WorkspaceKey::new(user_id, farm_name, system_name);
    let view = state
        .prescription_service()
        .generate(&key, query.date)
        .await?;
    Ok(Json(view))
}

/// Get the current prescription map
pub async fn get_prescription(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name)): SystemPath,
) -> AppResult<Json<PrescriptionView>> {
    let key = WorkspaceKey::new(user_id, farm_name, system_name);
    let view = state.prescription_service().view(&key).await?;
    Ok(Json(view))
}

fn watering_rate(rate: &Decimal) -> Result<(), ValidationError> {
    field_rule("rate", validate_watering_rate(*rate))
}

/// Input for setting the watering rate of selected cells
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRatesInput {
    /// `bearing-distance` keys
    #[validate(length(min = 1))]
    pub keys: Vec<RateKey>,
    #[validate(custom = "watering_rate")]
    pub rate: Decimal,
}

/// Set the watering rate of the listed cells
pub async fn update_rates(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name)): SystemPath,
    Json(input): Json<UpdateRatesInput>,
) -> AppResult<Json<RateUpdate>> {
    input.validate()?;
    let key = WorkspaceKey::new(user_id, farm_name, system_name);
    let update = state
        .prescription_service()
        .update_rates(&key, &input.keys, input.rate)
        .await?;
    Ok(Json(update))
}

/// Export the edited prescription as base64
pub async fn export_prescription(
    State(state): State<AppState>,
    Path((user_id, farm_name, system_name)): SystemPath,
) -> AppResult<Json<PrescriptionExport>> {
    let key = WorkspaceKey::new(user_id, farm_name, system_name);
    let export = state.prescription_service().export(&key).await?;
    Ok(Json(export))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rates_input() {
        let input: UpdateRatesInput =
            serde_json::from_str(r#"{"keys": ["1-2", "3-4"], "rate": "85.5"}"#).unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.keys[1], RateKey::new("3", "4"));

        let negative: UpdateRatesInput =
            serde_json::from_str(r#"{"keys": ["1-2"], "rate": "-1"}"#).unwrap();
        assert!(negative.validate().is_err());

        let empty: UpdateRatesInput = serde_json::from_str(r#"{"keys": [], "rate": 10}"#).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_bad_rate_key_rejected() {
        let parsed = serde_json::from_str::<UpdateRatesInput>(r#"{"keys": ["12"], "rate": 1}"#);
        assert!(parsed.is_err());
    }
}
