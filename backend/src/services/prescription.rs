//! Prescription map generation and rate editing

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use shared::prescription::{merge_rates, update_rate, RateDocument};
use shared::{PrescriptionError, PrescriptionSummary, RateKey};

use crate::error::{AppError, AppResult};
use crate::external::UpstreamClient;
use crate::services::workspace::{
    CellStyleEntry, PrescriptionState, WorkspaceKey, WorkspaceService,
};

/// A prescription map ready to draw
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionView {
    pub date: NaiveDate,
    pub summary: PrescriptionSummary,
    pub cells: Value,
    pub styles: Vec<CellStyleEntry>,
    pub modified: bool,
}

impl PrescriptionView {
    fn from_state(state: &PrescriptionState) -> Self {
        Self {
            date: state.date,
            summary: summarize(state),
            cells: state.cells.to_geojson(|_| None),
            styles: state.styles(),
            modified: state.document.is_modified(),
        }
    }
}

/// Result of a rate edit
#[derive(Debug, Clone, Serialize)]
pub struct RateUpdate {
    pub updated: usize,
    pub rate: Decimal,
    pub styles: Vec<CellStyleEntry>,
}

/// The edited prescription, re-encoded for upload to the controller
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionExport {
    pub date: NaiveDate,
    pub encoded_vri: String,
    pub modified: bool,
}

/// Prescription service for generating and editing watering rates
#[derive(Clone)]
pub struct PrescriptionService {
    workspaces: WorkspaceService,
    upstream: UpstreamClient,
}

impl PrescriptionService {
    /// Create a new PrescriptionService instance
    pub fn new(workspaces: WorkspaceService, upstream: UpstreamClient) -> Self {
        Self {
            workspaces,
            upstream,
        }
    }

    /// Generate the prescription for `date` and merge it into the cells
    pub async fn generate(&self, key: &WorkspaceKey, date: NaiveDate) -> AppResult<PrescriptionView> {
        let workspace = self.workspaces.ensure_loaded(key).await?;
        let mut guard = workspace.lock().await;

        let response = self
            .upstream
            .generate_prescription(&guard.context, date)
            .await?;
        let encoded = response
            .encoded_vri
            .as_deref()
            .ok_or_else(|| AppError::Upstream("prescription response has no encoded_vri".into()))?;
        let document = RateDocument::from_base64(encoded)?;

        let mut cells = guard.registry.cells().clone();
        let rated_cells = merge_rates(&mut cells, &document);
        tracing::info!(
            "Generated prescription for {} on {}: {} rates, {} of {} cells rated",
            key,
            date,
            document.node_count(),
            rated_cells,
            cells.len()
        );

        let state = PrescriptionState {
            date,
            response,
            document,
            cells,
            rated_cells,
        };
        let view = PrescriptionView::from_state(&state);
        guard.prescription = Some(state);
        Ok(view)
    }

    pub async fn view(&self, key: &WorkspaceKey) -> AppResult<PrescriptionView> {
        let workspace = self.workspaces.store().get(key).await?;
        let guard = workspace.lock().await;
        let state = guard
            .prescription
            .as_ref()
            .ok_or_else(|| AppError::PrescriptionNotLoaded(key.to_string()))?;
        Ok(PrescriptionView::from_state(state))
    }

    /// Set the watering rate of every listed cell
    ///
    /// Keys found in the document are updated even when others are missing;
    /// the missing ones are reported in the error.
    pub async fn update_rates(
        &self,
        key: &WorkspaceKey,
        keys: &[RateKey],
        rate: Decimal,
    ) -> AppResult<RateUpdate> {
        let workspace = self.workspaces.store().get(key).await?;
        let mut guard = workspace.lock().await;
        let state = guard
            .prescription
            .as_mut()
            .ok_or_else(|| AppError::PrescriptionNotLoaded(key.to_string()))?;

        match update_rate(&mut state.cells, &mut state.document, keys, rate) {
            Ok(updated) => {
                state.rated_cells = count_rated(state);
                tracing::info!("Set {} rates to {}% in {}", updated, rate, key);
                Ok(RateUpdate {
                    updated,
                    rate,
                    styles: state.styles(),
                })
            }
            Err(err @ PrescriptionError::RateKeyNotFound { .. }) => {
                state.rated_cells = count_rated(state);
                tracing::warn!("Partial rate update in {}: {}", key, err);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Re-encode the (possibly edited) prescription document
    pub async fn export(&self, key: &WorkspaceKey) -> AppResult<PrescriptionExport> {
        let workspace = self.workspaces.store().get(key).await?;
        let guard = workspace.lock().await;
        let state = guard
            .prescription
            .as_ref()
            .ok_or_else(|| AppError::PrescriptionNotLoaded(key.to_string()))?;
        Ok(PrescriptionExport {
            date: state.date,
            encoded_vri: state.document.to_base64(),
            modified: state.document.is_modified(),
        })
    }
}

fn count_rated(state: &PrescriptionState) -> usize {
    state
        .cells
        .iter()
        .filter(|c| c.rate_percent.is_some())
        .count()
}

fn summarize(state: &PrescriptionState) -> PrescriptionSummary {
    PrescriptionSummary {
        speed: state.response.rounded_speed(),
        max_irrigation_amount: state.response.rounded_max_irrigation_amount(),
        rate_count: state.document.node_count(),
        rated_cells: state.rated_cells,
        legend: state.document.legend().clone(),
    }
}
