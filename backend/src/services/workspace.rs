//! Per-irrigation-system editing workspaces
//!
//! A workspace holds the cell grid and zone registry of one irrigation system
//! while it is being edited. Workspaces live in memory; every registry
//! mutation runs under that workspace's lock, and a zone change is only kept
//! once the upstream service has accepted it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::prescription::{prescription_style, RateDocument};
use shared::registry::{BoundaryMode, CellZoneRegistry};
use shared::{
    Bounds, CellCollection, CellStyle, FeatureId, GeoPoint, ManagementZone, PrescriptionResponse,
    SystemContext, TreatmentMetadata,
};
use tokio::sync::{Mutex, RwLock};

use crate::error::{AppError, AppResult};
use crate::external::UpstreamClient;

/// Identifies one irrigation system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceKey {
    pub user_id: String,
    pub farm_name: String,
    pub irrigation_system_name: String,
}

impl WorkspaceKey {
    pub fn new(
        user_id: impl Into<String>,
        farm_name: impl Into<String>,
        irrigation_system_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            farm_name: farm_name.into(),
            irrigation_system_name: irrigation_system_name.into(),
        }
    }

    pub fn context(&self, gateway: Option<String>) -> SystemContext {
        SystemContext {
            user_id: self.user_id.clone(),
            farm_name: self.farm_name.clone(),
            irrigation_system_name: self.irrigation_system_name.clone(),
            gateway,
        }
    }
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.user_id, self.farm_name, self.irrigation_system_name
        )
    }
}

/// A prescription map generated for a workspace
#[derive(Debug, Clone)]
pub struct PrescriptionState {
    pub date: NaiveDate,
    pub response: PrescriptionResponse,
    pub document: RateDocument,
    /// Copy of the workspace cells with rates merged in
    pub cells: CellCollection,
    pub rated_cells: usize,
}

impl PrescriptionState {
    pub fn styles(&self) -> Vec<CellStyleEntry> {
        self.cells
            .iter()
            .map(|cell| CellStyleEntry {
                feature_id: cell.feature_id.clone(),
                style: prescription_style(cell.rate_percent, self.document.legend()),
            })
            .collect()
    }
}

/// Editing state of one irrigation system
#[derive(Debug, Clone)]
pub struct Workspace {
    pub context: SystemContext,
    pub registry: CellZoneRegistry,
    pub prescription: Option<PrescriptionState>,
}

/// All loaded workspaces
#[derive(Default)]
pub struct WorkspaceStore {
    workspaces: RwLock<HashMap<WorkspaceKey, Arc<Mutex<Workspace>>>>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &WorkspaceKey) -> AppResult<Arc<Mutex<Workspace>>> {
        self.workspaces
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::WorkspaceNotFound(key.to_string()))
    }

    /// Insert or replace a workspace
    pub async fn insert(&self, key: WorkspaceKey, workspace: Workspace) -> Arc<Mutex<Workspace>> {
        let entry = Arc::new(Mutex::new(workspace));
        self.workspaces.write().await.insert(key, entry.clone());
        entry
    }

    pub async fn len(&self) -> usize {
        self.workspaces.read().await.len()
    }
}

/// Render style of one cell
#[derive(Debug, Clone, Serialize)]
pub struct CellStyleEntry {
    pub feature_id: FeatureId,
    pub style: CellStyle,
}

/// A zone as shown in the legend
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSummary {
    pub name: String,
    pub color: String,
    pub cell_count: usize,
    pub label_position: Option<GeoPoint>,
    pub treatment: TreatmentMetadata,
}

/// Everything the map needs to draw a workspace
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub context: SystemContext,
    pub cells: Value,
    pub styles: Vec<CellStyleEntry>,
    pub zones: Vec<ZoneSummary>,
    pub selection: Vec<FeatureId>,
    pub center: Option<GeoPoint>,
    pub boundary_mode: BoundaryMode,
    /// Some cells had no id and were numbered by position
    pub positional_ids: bool,
}

impl WorkspaceView {
    fn from_workspace(workspace: &Workspace) -> Self {
        let registry = &workspace.registry;
        Self {
            context: workspace.context.clone(),
            cells: registry.annotated_geojson(),
            styles: registry
                .styles()
                .into_iter()
                .map(|(feature_id, style)| CellStyleEntry { feature_id, style })
                .collect(),
            zones: zone_summaries(registry),
            selection: registry.selection().to_vec(),
            center: registry.collection_center(),
            boundary_mode: registry.boundary_mode(),
            positional_ids: registry.cells().has_positional_ids(),
        }
    }
}

fn zone_summaries(registry: &CellZoneRegistry) -> Vec<ZoneSummary> {
    registry
        .zones_sorted_by_name()
        .into_iter()
        .map(|zone| ZoneSummary {
            name: zone.name.clone(),
            color: zone.color.clone(),
            cell_count: zone.cell_count(),
            label_position: registry.zone_centroid(&zone.name),
            treatment: zone.treatment.clone(),
        })
        .collect()
}

/// Current selection
#[derive(Debug, Clone, Serialize)]
pub struct SelectionView {
    pub selection: Vec<FeatureId>,
    pub count: usize,
}

impl SelectionView {
    fn from_registry(registry: &CellZoneRegistry) -> Self {
        let selection = registry.selection().to_vec();
        Self {
            count: selection.len(),
            selection,
        }
    }
}

/// Input for creating a zone from the current selection
#[derive(Debug, Clone)]
pub struct NewZone {
    pub name: String,
    pub color: String,
    pub treatment: TreatmentMetadata,
}

/// Workspace service for cell selection and management zones
#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<WorkspaceStore>,
    upstream: UpstreamClient,
    boundary_mode: BoundaryMode,
}

impl WorkspaceService {
    /// Create a new WorkspaceService instance
    pub fn new(
        store: Arc<WorkspaceStore>,
        upstream: UpstreamClient,
        boundary_mode: BoundaryMode,
    ) -> Self {
        Self {
            store,
            upstream,
            boundary_mode,
        }
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    /// Fetch cells and saved zones from upstream, replacing any loaded copy
    pub async fn load(&self, key: WorkspaceKey, gateway: Option<String>) -> AppResult<WorkspaceView> {
        let context = key.context(gateway);
        let grid = self.upstream.get_cell_grid(&context).await?;
        let saved = self.upstream.get_zones(&context).await?;

        let cells = CellCollection::from_geojson(&grid.geojson)?;
        let mut registry = CellZoneRegistry::with_boundary_mode(cells, self.boundary_mode);
        let restored = registry.restore_zones(&saved.zones)?;

        tracing::info!(
            "Loaded workspace {} with {} cells and {} zones",
            key,
            registry.cells().len(),
            restored
        );
        if registry.cells().has_positional_ids() {
            tracing::debug!("Workspace {} has cells without ids", key);
        }

        let workspace = Workspace {
            context,
            registry,
            prescription: None,
        };
        let view = WorkspaceView::from_workspace(&workspace);
        self.store.insert(key, workspace).await;
        Ok(view)
    }

    /// The loaded workspace, loading it from upstream first when needed
    pub async fn ensure_loaded(&self, key: &WorkspaceKey) -> AppResult<Arc<Mutex<Workspace>>> {
        match self.store.get(key).await {
            Ok(workspace) => Ok(workspace),
            Err(AppError::WorkspaceNotFound(_)) => {
                self.load(key.clone(), None).await?;
                self.store.get(key).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn view(&self, key: &WorkspaceKey) -> AppResult<WorkspaceView> {
        let workspace = self.store.get(key).await?;
        let guard = workspace.lock().await;
        Ok(WorkspaceView::from_workspace(&guard))
    }

    /// Add a cell to the selection
    pub async fn select_cell(&self, key: &WorkspaceKey, id: FeatureId) -> AppResult<SelectionView> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        guard.registry.select_cell(&id)?;
        tracing::debug!("Selected cell {} in {}", id, key);
        Ok(SelectionView::from_registry(&guard.registry))
    }

    /// Select the cell, or deselect it when already selected
    pub async fn toggle_cell(&self, key: &WorkspaceKey, id: FeatureId) -> AppResult<SelectionView> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        let selected = guard.registry.toggle_cell(&id)?;
        tracing::debug!("Toggled cell {} in {} (selected: {})", id, key, selected);
        Ok(SelectionView::from_registry(&guard.registry))
    }

    pub async fn deselect_cell(&self, key: &WorkspaceKey, id: FeatureId) -> AppResult<SelectionView> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        guard.registry.deselect_cell(&id);
        Ok(SelectionView::from_registry(&guard.registry))
    }

    /// Select every unzoned cell touching `bounds`
    ///
    /// Conflicting cells are reported as an error; the others stay selected.
    pub async fn select_region(&self, key: &WorkspaceKey, bounds: Bounds) -> AppResult<SelectionView> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        let added = guard.registry.select_region(&bounds)?;
        tracing::debug!("Region selection added {} cells in {}", added, key);
        Ok(SelectionView::from_registry(&guard.registry))
    }

    pub async fn clear_selection(&self, key: &WorkspaceKey) -> AppResult<SelectionView> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        guard.registry.clear_selection();
        Ok(SelectionView::from_registry(&guard.registry))
    }

    /// Create a zone from the selection and save it upstream
    pub async fn create_zone(&self, key: &WorkspaceKey, input: NewZone) -> AppResult<ZoneSummary> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        let snapshot = guard.registry.clone();

        let zone = guard
            .registry
            .create_zone(&input.name, &input.color, input.treatment)?
            .clone();
        let definition = zone.to_definition(&guard.context);

        if let Err(e) = self.upstream.save_zone(&definition).await {
            tracing::warn!("Rolling back zone {} in {}: {}", zone.name, key, e);
            guard.registry = snapshot;
            return Err(e);
        }

        tracing::info!(
            "Created management zone {} with {} cells in {}",
            zone.name,
            zone.cell_count(),
            key
        );
        Ok(summary(&guard.registry, &zone))
    }

    /// Delete a zone locally and upstream; its cells become unassigned
    pub async fn delete_zone(&self, key: &WorkspaceKey, name: &str) -> AppResult<ZoneSummary> {
        let workspace = self.store.get(key).await?;
        let mut guard = workspace.lock().await;
        let snapshot = guard.registry.clone();

        let zone_summary = match guard.registry.zone(name) {
            Some(zone) => summary(&guard.registry, zone),
            None => return Err(shared::RegistryError::ZoneNotFound(name.to_string()).into()),
        };
        let removed = guard.registry.delete_zone(name)?;

        if let Err(e) = self.upstream.delete_zone(&guard.context, &removed.name).await {
            tracing::warn!("Restoring zone {} in {}: {}", removed.name, key, e);
            guard.registry = snapshot;
            return Err(e);
        }

        tracing::info!("Deleted management zone {} in {}", removed.name, key);
        Ok(zone_summary)
    }
}

fn summary(registry: &CellZoneRegistry, zone: &ManagementZone) -> ZoneSummary {
    ZoneSummary {
        name: zone.name.clone(),
        color: zone.color.clone(),
        cell_count: zone.cell_count(),
        label_position: registry.zone_centroid(&zone.name),
        treatment: zone.treatment.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace() -> Workspace {
        let features: Vec<Value> = (0..3)
            .map(|i| {
                let x = i as f64 * 0.001;
                json!({
                    "type": "Feature",
                    "id": i,
                    "properties": { "BearingSeqNum": 1, "DistanceSeqNum": i + 1 },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[x, 0.0], [x + 0.001, 0.0], [x + 0.001, 0.001], [x, 0.001], [x, 0.0]]]
                    }
                })
            })
            .collect();
        let cells = CellCollection::from_geojson(&json!({
            "type": "FeatureCollection",
            "features": features
        }))
        .unwrap();
        Workspace {
            context: WorkspaceKey::new("u1", "farm", "pivot").context(None),
            registry: CellZoneRegistry::new(cells),
            prescription: None,
        }
    }

    #[test]
    fn test_workspace_key_display() {
        let key = WorkspaceKey::new("u1", "farm", "pivot");
        assert_eq!(key.to_string(), "u1/farm/pivot");
        assert_eq!(key.context(Some("gw".into())).gateway.as_deref(), Some("gw"));
    }

    #[test]
    fn test_view_lists_zones_and_selection() {
        let mut ws = workspace();
        ws.registry.select_cell(&FeatureId::new("0")).unwrap();
        ws.registry
            .create_zone("West", "#ff0000", TreatmentMetadata::default())
            .unwrap();
        ws.registry.select_cell(&FeatureId::new("2")).unwrap();

        let view = WorkspaceView::from_workspace(&ws);
        assert_eq!(view.zones.len(), 1);
        assert_eq!(view.zones[0].cell_count, 1);
        assert!(view.zones[0].label_position.is_some());
        assert_eq!(view.selection, vec![FeatureId::new("2")]);
        assert_eq!(view.styles.len(), 3);
        assert_eq!(view.cells["features"][0]["properties"]["zone"], "West");
    }

    #[tokio::test]
    async fn test_store_get_missing_workspace() {
        let store = WorkspaceStore::new();
        let key = WorkspaceKey::new("u1", "farm", "pivot");
        assert!(matches!(
            store.get(&key).await,
            Err(AppError::WorkspaceNotFound(_))
        ));
        store.insert(key.clone(), workspace()).await;
        assert!(store.get(&key).await.is_ok());
        assert_eq!(store.len().await, 1);
    }
}
