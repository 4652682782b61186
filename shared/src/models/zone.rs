//! Management zone models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, FeatureId};
use crate::types::SystemContext;

/// Irrigation treatment settings attached to a management zone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TreatmentMetadata {
    /// Share of the base prescription applied to the zone, in percent
    #[serde(rename = "irrigation_treatment", default)]
    pub treatment_percent: Option<Decimal>,
    #[serde(rename = "irrigation_schedule_method", default)]
    pub schedule_method: Option<String>,
    /// Soil-moisture node that drives scheduling for the zone
    #[serde(rename = "nodeid", default)]
    pub node_id: Option<String>,
}

/// A cell reference as stored on a zone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneMember {
    pub feature_id: FeatureId,
    #[serde(rename = "bearingSeqNum", default)]
    pub bearing_seq: Option<String>,
    #[serde(rename = "distanceSeqNum", default)]
    pub distance_seq: Option<String>,
}

impl From<&Cell> for ZoneMember {
    fn from(cell: &Cell) -> Self {
        Self {
            feature_id: cell.feature_id.clone(),
            bearing_seq: cell.bearing_seq.clone(),
            distance_seq: cell.distance_seq.clone(),
        }
    }
}

/// A named, coloured, non-overlapping group of cells
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagementZone {
    pub name: String,
    pub color: String,
    pub members: Vec<ZoneMember>,
    pub treatment: TreatmentMetadata,
    pub created_at: DateTime<Utc>,
}

impl ManagementZone {
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.members.iter().any(|m| &m.feature_id == id)
    }

    pub fn cell_count(&self) -> usize {
        self.members.len()
    }

    /// Key used for uniqueness checks
    pub fn name_key(&self) -> String {
        zone_name_key(&self.name)
    }

    /// Payload sent upstream when the zone is created
    pub fn to_definition(&self, context: &SystemContext) -> ZoneDefinition {
        ZoneDefinition {
            mz_name: self.name.clone(),
            features: self.members.clone(),
            color: self.color.clone(),
            user_id: context.user_id.clone(),
            farmname: context.farm_name.clone(),
            gateway: context.gateway.clone(),
            irrigation_system_name: context.irrigation_system_name.clone(),
            treatment: self.treatment.clone(),
        }
    }
}

/// Zone names compare trimmed and case-insensitively
pub fn zone_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Zone definition exchanged with the upstream pivot service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneDefinition {
    pub mz_name: String,
    #[serde(default)]
    pub features: Vec<ZoneMember>,
    pub color: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub farmname: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub irrigation_system_name: String,
    #[serde(flatten)]
    pub treatment: TreatmentMetadata,
}

/// Render style for one cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_weight: u32,
    pub stroke_opacity: f64,
}

pub const SELECTION_COLOR: &str = "blue";
pub const BOUNDARY_STROKE_COLOR: &str = "black";

impl CellStyle {
    /// Unassigned, unselected cell
    pub fn unzoned() -> Self {
        Self {
            fill_color: SELECTION_COLOR.to_string(),
            fill_opacity: 0.2,
            stroke_color: SELECTION_COLOR.to_string(),
            stroke_weight: 1,
            stroke_opacity: 1.0,
        }
    }

    pub fn selected() -> Self {
        Self {
            fill_color: SELECTION_COLOR.to_string(),
            fill_opacity: 0.7,
            stroke_color: SELECTION_COLOR.to_string(),
            stroke_weight: 3,
            stroke_opacity: 1.0,
        }
    }

    pub fn zoned(zone_color: &str, boundary: bool) -> Self {
        let (stroke_color, stroke_weight) = if boundary {
            (BOUNDARY_STROKE_COLOR.to_string(), 3)
        } else {
            (zone_color.to_string(), 1)
        };
        Self {
            fill_color: zone_color.to_string(),
            fill_opacity: 0.7,
            stroke_color,
            stroke_weight,
            stroke_opacity: 1.0,
        }
    }

    /// Prescription overlay style for a rate colour
    pub fn prescription(fill_color: String) -> Self {
        Self {
            stroke_color: fill_color.clone(),
            fill_color,
            fill_opacity: 0.8,
            stroke_weight: 2,
            stroke_opacity: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name_key_trims_and_lowercases() {
        assert_eq!(zone_name_key("  North Field "), "north field");
        assert_eq!(zone_name_key("NORTH"), zone_name_key("north"));
    }

    #[test]
    fn test_definition_uses_upstream_field_names() {
        let zone = ManagementZone {
            name: "North".to_string(),
            color: "#ff0000".to_string(),
            members: vec![ZoneMember {
                feature_id: FeatureId::from("3"),
                bearing_seq: Some("1".to_string()),
                distance_seq: Some("2".to_string()),
            }],
            treatment: TreatmentMetadata {
                treatment_percent: Some(Decimal::from(80)),
                schedule_method: Some("soil moisture".to_string()),
                node_id: Some("n-1".to_string()),
            },
            created_at: Utc::now(),
        };
        let context = SystemContext {
            user_id: "u1".to_string(),
            farm_name: "Home".to_string(),
            irrigation_system_name: "Pivot A".to_string(),
            gateway: Some("gw".to_string()),
        };
        let json = serde_json::to_value(zone.to_definition(&context)).unwrap();
        assert_eq!(json["mz_name"], "North");
        assert_eq!(json["farmname"], "Home");
        assert_eq!(json["nodeid"], "n-1");
        assert_eq!(json["irrigation_schedule_method"], "soil moisture");
        assert_eq!(json["features"][0]["bearingSeqNum"], "1");
    }
}
