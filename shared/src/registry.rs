//! Cell to management zone assignment
//!
//! A cell is in one of three states: unassigned, selected (a transient
//! working set used to build the next zone), or zoned. A zoned cell returns
//! to unassigned only when its whole zone is deleted. At most one zone owns a
//! cell at any time; every mutation that could break this checks all cells
//! first and only then changes state, so a failed call leaves the registry
//! untouched.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, ZoneConflict};
use crate::models::{
    zone_name_key, CellCollection, CellStyle, FeatureId, ManagementZone, TreatmentMetadata,
    ZoneDefinition, ZoneMember,
};
use crate::types::{Bounds, GeoPoint, SystemContext};

/// Slack, in degrees, when testing whether two cell boxes touch
const ADJACENCY_EPSILON: f64 = 1e-9;

/// How boundary cells are detected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Matches the planner's historical outlines: a zoned cell is a boundary
    /// cell when a touching cell lies outside its zone, or when its same-zone
    /// neighbour count is below the collection size. The second test holds
    /// for every zoned cell, so all zoned cells are outlined.
    #[default]
    Compatible,
    /// Only touching cells outside the zone make a boundary cell
    Adjacency,
}

/// Where a cell sits in the selection workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "zone", rename_all = "snake_case")]
pub enum CellState {
    Unassigned,
    Selected,
    Zoned(String),
}

#[derive(Debug, Clone)]
pub struct CellZoneRegistry {
    cells: CellCollection,
    zones: Vec<ManagementZone>,
    /// Cell id to owning zone's name key
    owners: HashMap<FeatureId, String>,
    selection: Vec<FeatureId>,
    /// Cells whose bounding boxes touch
    neighbours: HashMap<FeatureId, Vec<FeatureId>>,
    boundary_mode: BoundaryMode,
}

impl CellZoneRegistry {
    pub fn new(cells: CellCollection) -> Self {
        Self::with_boundary_mode(cells, BoundaryMode::default())
    }

    pub fn with_boundary_mode(cells: CellCollection, boundary_mode: BoundaryMode) -> Self {
        let neighbours = touching_cells(&cells);
        Self {
            cells,
            zones: Vec::new(),
            owners: HashMap::new(),
            selection: Vec::new(),
            neighbours,
            boundary_mode,
        }
    }

    pub fn cells(&self) -> &CellCollection {
        &self.cells
    }

    pub fn boundary_mode(&self) -> BoundaryMode {
        self.boundary_mode
    }

    pub fn set_boundary_mode(&mut self, mode: BoundaryMode) {
        self.boundary_mode = mode;
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selection(&self) -> &[FeatureId] {
        &self.selection
    }

    pub fn is_selected(&self, id: &FeatureId) -> bool {
        self.selection.contains(id)
    }

    fn check_selectable(&self, id: &FeatureId) -> Result<(), RegistryError> {
        if !self.cells.contains(id) {
            return Err(RegistryError::UnknownCell(id.clone()));
        }
        if let Some(zone) = self.zone_of(id) {
            return Err(RegistryError::CellAlreadyZoned {
                conflicts: vec![ZoneConflict {
                    feature_id: id.clone(),
                    zone_name: zone.name.clone(),
                }],
            });
        }
        Ok(())
    }

    /// Add one unassigned cell to the selection; selecting twice is a no-op
    pub fn select_cell(&mut self, id: &FeatureId) -> Result<(), RegistryError> {
        self.check_selectable(id)?;
        if !self.is_selected(id) {
            self.selection.push(id.clone());
        }
        Ok(())
    }

    /// Click behaviour: select, or deselect an already selected cell
    ///
    /// Returns whether the cell is selected afterwards.
    pub fn toggle_cell(&mut self, id: &FeatureId) -> Result<bool, RegistryError> {
        if self.deselect_cell(id) {
            return Ok(false);
        }
        self.select_cell(id)?;
        Ok(true)
    }

    /// Returns false when the cell was not selected
    pub fn deselect_cell(&mut self, id: &FeatureId) -> bool {
        let before = self.selection.len();
        self.selection.retain(|s| s != id);
        self.selection.len() != before
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select every unassigned cell whose box intersects `bounds`
    ///
    /// Zoned cells in the region are all reported in one error; the
    /// unassigned ones stay selected. Returns how many cells were added.
    pub fn select_region(&mut self, bounds: &Bounds) -> Result<usize, RegistryError> {
        let mut conflicts = Vec::new();
        let mut added = Vec::new();
        for cell in self.cells.iter() {
            let Some(cell_bounds) = cell.bounds else {
                continue;
            };
            if !cell_bounds.intersects(bounds) {
                continue;
            }
            match self.zone_of(&cell.feature_id) {
                Some(zone) => conflicts.push(ZoneConflict {
                    feature_id: cell.feature_id.clone(),
                    zone_name: zone.name.clone(),
                }),
                None if !self.is_selected(&cell.feature_id) => added.push(cell.feature_id.clone()),
                None => {}
            }
        }
        let count = added.len();
        self.selection.extend(added);
        if conflicts.is_empty() {
            Ok(count)
        } else {
            Err(RegistryError::CellAlreadyZoned { conflicts })
        }
    }

    // ------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------

    pub fn zones(&self) -> &[ManagementZone] {
        &self.zones
    }

    /// Zones ordered by name, case-insensitively
    pub fn zones_sorted_by_name(&self) -> Vec<&ManagementZone> {
        let mut zones: Vec<_> = self.zones.iter().collect();
        zones.sort_by_key(|z| z.name_key());
        zones
    }

    /// Case-insensitive lookup
    pub fn zone(&self, name: &str) -> Option<&ManagementZone> {
        let key = zone_name_key(name);
        self.zones.iter().find(|z| z.name_key() == key)
    }

    pub fn zone_of(&self, id: &FeatureId) -> Option<&ManagementZone> {
        let key = self.owners.get(id)?;
        self.zones.iter().find(|z| &z.name_key() == key)
    }

    /// Number of zones listing the cell as a member
    pub fn zones_containing(&self, id: &FeatureId) -> usize {
        self.zones.iter().filter(|z| z.contains(id)).count()
    }

    pub fn cell_state(&self, id: &FeatureId) -> Option<CellState> {
        if !self.cells.contains(id) {
            return None;
        }
        Some(match self.zone_of(id) {
            Some(zone) => CellState::Zoned(zone.name.clone()),
            None if self.is_selected(id) => CellState::Selected,
            None => CellState::Unassigned,
        })
    }

    /// Turn the current selection into a new zone
    pub fn create_zone(
        &mut self,
        name: &str,
        color: &str,
        treatment: TreatmentMetadata,
    ) -> Result<&ManagementZone, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyZoneName);
        }
        if self.zone(name).is_some() {
            return Err(RegistryError::DuplicateZoneName(name.to_string()));
        }
        if self.selection.is_empty() {
            return Err(RegistryError::EmptySelection);
        }

        let members = self
            .selection
            .iter()
            .map(|id| {
                self.cells
                    .get(id)
                    .map(ZoneMember::from)
                    .ok_or_else(|| RegistryError::UnknownCell(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let zone = ManagementZone {
            name: name.to_string(),
            color: color.to_string(),
            members,
            treatment,
            created_at: Utc::now(),
        };
        self.insert_zone(zone)?;
        self.selection.clear();
        Ok(&self.zones[self.zones.len() - 1])
    }

    /// Add a complete zone, checking name uniqueness and cell exclusivity
    ///
    /// Used to restore saved zones and to undo a deletion. Nothing changes
    /// on error. Member cells are removed from the selection.
    pub fn insert_zone(&mut self, zone: ManagementZone) -> Result<(), RegistryError> {
        if zone.name.trim().is_empty() {
            return Err(RegistryError::EmptyZoneName);
        }
        if self.zone(&zone.name).is_some() {
            return Err(RegistryError::DuplicateZoneName(zone.name.trim().to_string()));
        }
        if let Some(member) = zone
            .members
            .iter()
            .find(|m| !self.cells.contains(&m.feature_id))
        {
            return Err(RegistryError::UnknownCell(member.feature_id.clone()));
        }
        let conflicts: Vec<_> = zone
            .members
            .iter()
            .filter_map(|m| {
                self.zone_of(&m.feature_id).map(|owner| ZoneConflict {
                    feature_id: m.feature_id.clone(),
                    zone_name: owner.name.clone(),
                })
            })
            .collect();
        if !conflicts.is_empty() {
            return Err(RegistryError::CellAlreadyZoned { conflicts });
        }
        let mut seen = HashSet::new();
        let duplicates: Vec<_> = zone
            .members
            .iter()
            .filter(|m| !seen.insert(&m.feature_id))
            .map(|m| ZoneConflict {
                feature_id: m.feature_id.clone(),
                zone_name: zone.name.clone(),
            })
            .collect();
        if !duplicates.is_empty() {
            return Err(RegistryError::CellAlreadyZoned {
                conflicts: duplicates,
            });
        }

        let key = zone.name_key();
        for member in &zone.members {
            self.owners.insert(member.feature_id.clone(), key.clone());
        }
        self.selection
            .retain(|id| !zone.members.iter().any(|m| &m.feature_id == id));
        self.zones.push(zone);
        Ok(())
    }

    /// Remove a zone and release its cells; returns the removed zone
    pub fn delete_zone(&mut self, name: &str) -> Result<ManagementZone, RegistryError> {
        let key = zone_name_key(name);
        let position = self
            .zones
            .iter()
            .position(|z| z.name_key() == key)
            .ok_or_else(|| RegistryError::ZoneNotFound(name.trim().to_string()))?;
        let zone = self.zones.remove(position);
        for member in &zone.members {
            self.owners.remove(&member.feature_id);
        }
        Ok(zone)
    }

    /// Load zones saved upstream; all or nothing
    pub fn restore_zones(&mut self, definitions: &[ZoneDefinition]) -> Result<usize, RegistryError> {
        let mut staged = self.clone();
        for definition in definitions {
            staged.insert_zone(ManagementZone {
                name: definition.mz_name.trim().to_string(),
                color: definition.color.clone(),
                members: definition.features.clone(),
                treatment: definition.treatment.clone(),
                created_at: Utc::now(),
            })?;
        }
        *self = staged;
        Ok(definitions.len())
    }

    /// Upstream payload for a zone
    pub fn zone_definition(
        &self,
        name: &str,
        context: &SystemContext,
    ) -> Result<ZoneDefinition, RegistryError> {
        self.zone(name)
            .map(|z| z.to_definition(context))
            .ok_or_else(|| RegistryError::ZoneNotFound(name.trim().to_string()))
    }

    // ------------------------------------------------------------------
    // Rendering support
    // ------------------------------------------------------------------

    /// Whether a zoned cell is drawn with the heavy boundary outline
    pub fn is_boundary_cell(&self, id: &FeatureId) -> bool {
        let Some(zone) = self.zone_of(id) else {
            return false;
        };
        let key = zone.name_key();
        let touches_outside = self
            .neighbours
            .get(id)
            .map(|ns| ns.iter().any(|n| self.owners.get(n) != Some(&key)))
            .unwrap_or(false);
        match self.boundary_mode {
            BoundaryMode::Adjacency => touches_outside,
            BoundaryMode::Compatible => {
                let same_zone_neighbours = zone.cell_count().saturating_sub(1);
                touches_outside || same_zone_neighbours < self.cells.len()
            }
        }
    }

    pub fn style_for_cell(&self, id: &FeatureId) -> Result<CellStyle, RegistryError> {
        if !self.cells.contains(id) {
            return Err(RegistryError::UnknownCell(id.clone()));
        }
        Ok(match self.zone_of(id) {
            Some(zone) => CellStyle::zoned(&zone.color, self.is_boundary_cell(id)),
            None if self.is_selected(id) => CellStyle::selected(),
            None => CellStyle::unzoned(),
        })
    }

    /// Styles for every cell, in collection order
    pub fn styles(&self) -> Vec<(FeatureId, CellStyle)> {
        self.cells
            .iter()
            .filter_map(|c| {
                self.style_for_cell(&c.feature_id)
                    .ok()
                    .map(|s| (c.feature_id.clone(), s))
            })
            .collect()
    }

    /// Label position for a zone: mean centre of its cells' boxes
    pub fn zone_centroid(&self, name: &str) -> Option<GeoPoint> {
        let zone = self.zone(name)?;
        mean_point(
            zone.members
                .iter()
                .filter_map(|m| self.cells.get(&m.feature_id)?.bounds)
                .map(|b| b.center()),
        )
    }

    /// Centre of the whole collection, for the farm label
    pub fn collection_center(&self) -> Option<GeoPoint> {
        self.cells.bounds().map(|b| b.center())
    }

    /// The cell collection with each zoned cell's `zone` property set
    pub fn annotated_geojson(&self) -> Value {
        self.cells
            .to_geojson(|id| self.zone_of(id).map(|z| z.name.clone()))
    }
}

fn mean_point(points: impl Iterator<Item = GeoPoint>) -> Option<GeoPoint> {
    let (count, lat, lng) = points.fold((0usize, 0.0, 0.0), |(n, lat, lng), p| {
        (n + 1, lat + p.latitude, lng + p.longitude)
    });
    (count > 0).then(|| GeoPoint::new(lat / count as f64, lng / count as f64))
}

/// Pairs of cells whose boxes touch, found with a sweep along longitude
fn touching_cells(cells: &CellCollection) -> HashMap<FeatureId, Vec<FeatureId>> {
    let mut boxed: Vec<_> = cells
        .iter()
        .filter_map(|c| c.bounds.map(|b| (&c.feature_id, b.expanded(ADJACENCY_EPSILON))))
        .collect();
    boxed.sort_by(|a, b| a.1.south_west.longitude.total_cmp(&b.1.south_west.longitude));

    let mut neighbours: HashMap<FeatureId, Vec<FeatureId>> = HashMap::new();
    for (i, (id, bounds)) in boxed.iter().enumerate() {
        for (other_id, other) in boxed[i + 1..].iter() {
            if other.south_west.longitude > bounds.north_east.longitude {
                break;
            }
            if bounds.intersects(other) {
                neighbours
                    .entry((*id).clone())
                    .or_default()
                    .push((*other_id).clone());
                neighbours
                    .entry((*other_id).clone())
                    .or_default()
                    .push((*id).clone());
            }
        }
    }
    neighbours
}
