//! Map cells: one GeoJSON feature per subdivision of an irrigated area
//!
//! # Parsing contract
//!
//! Feature id, first defined of:
//! 1. the feature's top-level `id`
//! 2. `properties.id`
//! 3. `properties.polygon_id`
//! 4. `properties.feature_id`
//! 5. the feature's position in the collection (not stable across reloads)
//!
//! Bearing sequence number, first defined of:
//! 1. `properties.linear_zone_bearing.BearingSeqNum`
//! 2. `properties.linear_zone_bearing.SeqNum`
//! 3. `properties.linear_zone_bearing.bearingSeqNum`
//! 4. `properties.BearingSeqNum`
//! 5. `properties.bearingSeqNum`
//!
//! The distance sequence number mirrors this with `linear_zone_distance` and
//! `DistanceSeqNum`. Zero is a valid sequence number.

use std::collections::HashMap;

use geo::BoundingRect;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CollectionError;
use crate::types::{Bounds, GeoPoint};

/// Property written on exported features that carry a watering rate
pub const RATE_PROPERTY: &str = "wateringratepercent";

/// Property written on exported features that belong to a management zone
pub const ZONE_PROPERTY: &str = "zone";

/// Stable identifier of a cell within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<usize> for FeatureId {
    fn from(index: usize) -> Self {
        Self(index.to_string())
    }
}

/// Where a cell's feature id came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureIdSource {
    Explicit,
    Property,
    /// Fallback index; changes if upstream reorders features
    Positional,
}

/// Composite join key between a cell and a prescription rate, `"{bearing}-{distance}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RateKey {
    pub bearing_seq: String,
    pub distance_seq: String,
}

impl RateKey {
    pub fn new(bearing_seq: impl Into<String>, distance_seq: impl Into<String>) -> Self {
        Self {
            bearing_seq: bearing_seq.into(),
            distance_seq: distance_seq.into(),
        }
    }
}

impl std::fmt::Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.bearing_seq, self.distance_seq)
    }
}

impl std::str::FromStr for RateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((b, d)) if !b.trim().is_empty() && !d.trim().is_empty() => {
                Ok(RateKey::new(b.trim(), d.trim()))
            }
            _ => Err(format!("rate key must look like BEARING-DISTANCE, got {:?}", s)),
        }
    }
}

impl TryFrom<String> for RateKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RateKey> for String {
    fn from(key: RateKey) -> Self {
        key.to_string()
    }
}

/// One step of a property lookup: `properties[parent][key]` or `properties[key]`
#[derive(Debug, Clone, Copy)]
struct PropertyPath {
    parent: Option<&'static str>,
    key: &'static str,
}

impl PropertyPath {
    const fn nested(parent: &'static str, key: &'static str) -> Self {
        Self {
            parent: Some(parent),
            key,
        }
    }

    const fn flat(key: &'static str) -> Self {
        Self { parent: None, key }
    }

    fn lookup<'a>(&self, properties: &'a Map<String, Value>) -> Option<&'a Value> {
        let value = match self.parent {
            Some(parent) => properties.get(parent)?.as_object()?.get(self.key)?,
            None => properties.get(self.key)?,
        };
        (!value.is_null()).then_some(value)
    }
}

const FEATURE_ID_PATHS: &[PropertyPath] = &[
    PropertyPath::flat("id"),
    PropertyPath::flat("polygon_id"),
    PropertyPath::flat("feature_id"),
];

const BEARING_PATHS: &[PropertyPath] = &[
    PropertyPath::nested("linear_zone_bearing", "BearingSeqNum"),
    PropertyPath::nested("linear_zone_bearing", "SeqNum"),
    PropertyPath::nested("linear_zone_bearing", "bearingSeqNum"),
    PropertyPath::flat("BearingSeqNum"),
    PropertyPath::flat("bearingSeqNum"),
];

const DISTANCE_PATHS: &[PropertyPath] = &[
    PropertyPath::nested("linear_zone_distance", "DistanceSeqNum"),
    PropertyPath::nested("linear_zone_distance", "SeqNum"),
    PropertyPath::nested("linear_zone_distance", "distanceSeqNum"),
    PropertyPath::flat("DistanceSeqNum"),
    PropertyPath::flat("distanceSeqNum"),
];

fn first_defined(paths: &[PropertyPath], properties: &Map<String, Value>) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| path.lookup(properties))
        .find_map(scalar_text)
}

/// Text form of a JSON id or sequence number; integral floats print without a fraction
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

/// Geometry types a cell may carry; anything else has no bounds
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum CellGeometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

fn ring(positions: &[Vec<f64>]) -> LineString<f64> {
    positions
        .iter()
        .filter(|p| p.len() >= 2 && p[0].is_finite() && p[1].is_finite())
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect::<Vec<_>>()
        .into()
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        ring(exterior),
        interiors.iter().map(|r| ring(r)).collect(),
    ))
}

fn geometry_bounds(geometry: Option<&Value>) -> Option<Bounds> {
    let parsed: CellGeometry = serde_json::from_value(geometry?.clone()).ok()?;
    let shape = match parsed {
        CellGeometry::Polygon { coordinates } => MultiPolygon(vec![polygon(&coordinates)?]),
        CellGeometry::MultiPolygon { coordinates } => {
            MultiPolygon(coordinates.iter().filter_map(|p| polygon(p)).collect())
        }
        CellGeometry::Unsupported => return None,
    };
    shape.bounding_rect().map(Bounds::from_rect)
}

/// A single map cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub feature_id: FeatureId,
    pub id_source: FeatureIdSource,
    pub bearing_seq: Option<String>,
    pub distance_seq: Option<String>,
    /// Bounding box of the cell geometry, if it has a polygonal one
    pub bounds: Option<Bounds>,
    /// Watering rate merged from a prescription; `None` means no data
    pub rate_percent: Option<Decimal>,
    feature: Map<String, Value>,
}

impl Cell {
    /// Parse one feature; `index` is its position in the collection
    pub fn from_feature(index: usize, feature: &Value) -> Result<Self, CollectionError> {
        let object = feature
            .as_object()
            .ok_or_else(|| CollectionError::InvalidFeature {
                index,
                reason: "feature must be a JSON object".to_string(),
            })?;
        let empty = Map::new();
        let properties = object
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let (feature_id, id_source) = if let Some(id) = object.get("id").and_then(scalar_text) {
            (FeatureId::new(id), FeatureIdSource::Explicit)
        } else if let Some(id) = first_defined(FEATURE_ID_PATHS, properties) {
            (FeatureId::new(id), FeatureIdSource::Property)
        } else {
            (FeatureId::from(index), FeatureIdSource::Positional)
        };

        Ok(Self {
            feature_id,
            id_source,
            bearing_seq: first_defined(BEARING_PATHS, properties),
            distance_seq: first_defined(DISTANCE_PATHS, properties),
            bounds: geometry_bounds(object.get("geometry")),
            rate_percent: None,
            feature: object.clone(),
        })
    }

    /// Join key against prescription rates; needs both sequence numbers
    pub fn rate_key(&self) -> Option<RateKey> {
        match (&self.bearing_seq, &self.distance_seq) {
            (Some(b), Some(d)) => Some(RateKey::new(b.clone(), d.clone())),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.feature.get("properties").and_then(Value::as_object)
    }

    /// The feature as GeoJSON, with the id filled in and optional zone annotation
    pub fn to_feature(&self, zone: Option<&str>) -> Value {
        let mut feature = self.feature.clone();
        if !feature.contains_key("id") {
            feature.insert("id".to_string(), Value::String(self.feature_id.to_string()));
        }
        let properties = feature
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if !properties.is_object() {
            *properties = Value::Object(Map::new());
        }
        if let Value::Object(props) = properties {
            props.remove(ZONE_PROPERTY);
            if let Some(zone) = zone {
                props.insert(ZONE_PROPERTY.to_string(), Value::String(zone.to_string()));
            }
            props.remove(RATE_PROPERTY);
            if let Some(rate) = self.rate_percent.and_then(|r| r.to_f64()) {
                if let Some(n) = serde_json::Number::from_f64(rate) {
                    props.insert(RATE_PROPERTY.to_string(), Value::Number(n));
                }
            }
        }
        Value::Object(feature)
    }
}

/// An ordered cell collection with id lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellCollection {
    cells: Vec<Cell>,
    index: HashMap<FeatureId, usize>,
}

impl CellCollection {
    /// Parse a GeoJSON `FeatureCollection`
    pub fn from_geojson(collection: &Value) -> Result<Self, CollectionError> {
        let features = collection
            .get("features")
            .and_then(Value::as_array)
            .ok_or(CollectionError::MissingFeatures)?;
        let cells = features
            .iter()
            .enumerate()
            .map(|(i, f)| Cell::from_feature(i, f))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cells(cells)
    }

    pub fn from_cells(cells: Vec<Cell>) -> Result<Self, CollectionError> {
        let mut index = HashMap::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            if index.insert(cell.feature_id.clone(), i).is_some() {
                return Err(CollectionError::DuplicateFeatureId(cell.feature_id.clone()));
            }
        }
        Ok(Self { cells, index })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Cell> {
        self.index.get(id).map(|&i| &self.cells[i])
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.index.contains_key(id)
    }

    /// True when any cell fell back to a positional id
    pub fn has_positional_ids(&self) -> bool {
        self.cells
            .iter()
            .any(|c| c.id_source == FeatureIdSource::Positional)
    }

    /// Union of all cell bounds
    pub fn bounds(&self) -> Option<Bounds> {
        self.cells
            .iter()
            .filter_map(|c| c.bounds)
            .reduce(|a, b| {
                Bounds::from_corners(
                    GeoPoint::new(
                        a.south_west.latitude.min(b.south_west.latitude),
                        a.south_west.longitude.min(b.south_west.longitude),
                    ),
                    GeoPoint::new(
                        a.north_east.latitude.max(b.north_east.latitude),
                        a.north_east.longitude.max(b.north_east.longitude),
                    ),
                )
            })
    }

    /// GeoJSON `FeatureCollection` with zone annotations from `zone_of`
    pub fn to_geojson<F>(&self, zone_of: F) -> Value
    where
        F: Fn(&FeatureId) -> Option<String>,
    {
        let features = self
            .cells
            .iter()
            .map(|c| c.to_feature(zone_of(&c.feature_id).as_deref()))
            .collect();
        let mut out = Map::new();
        out.insert("type".to_string(), Value::String("FeatureCollection".to_string()));
        out.insert("features".to_string(), Value::Array(features));
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(lng: f64, lat: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[lng, lat], [lng + 1.0, lat], [lng + 1.0, lat + 1.0], [lng, lat + 1.0], [lng, lat]]]
        })
    }

    #[test]
    fn test_feature_id_priority() {
        let explicit = json!({"id": 7, "properties": {"id": "x"}});
        let property = json!({"properties": {"polygon_id": "p-1", "feature_id": "f"}});
        let positional = json!({"properties": {}});
        assert_eq!(Cell::from_feature(0, &explicit).unwrap().feature_id, FeatureId::from("7"));
        let c = Cell::from_feature(0, &property).unwrap();
        assert_eq!(c.feature_id, FeatureId::from("p-1"));
        assert_eq!(c.id_source, FeatureIdSource::Property);
        let c = Cell::from_feature(4, &positional).unwrap();
        assert_eq!(c.feature_id, FeatureId::from("4"));
        assert_eq!(c.id_source, FeatureIdSource::Positional);
    }

    #[test]
    fn test_nested_keys_win_over_flat() {
        let f = json!({
            "id": 1,
            "properties": {
                "linear_zone_bearing": {"BearingSeqNum": 3},
                "linear_zone_distance": {"SeqNum": "5"},
                "BearingSeqNum": 99,
                "DistanceSeqNum": 98
            }
        });
        let cell = Cell::from_feature(0, &f).unwrap();
        assert_eq!(cell.rate_key(), Some(RateKey::new("3", "5")));
    }

    #[test]
    fn test_zero_sequence_number_is_defined() {
        let f = json!({"id": 1, "properties": {"BearingSeqNum": 0, "DistanceSeqNum": 2.0}});
        let cell = Cell::from_feature(0, &f).unwrap();
        assert_eq!(cell.rate_key(), Some(RateKey::new("0", "2")));
    }

    #[test]
    fn test_missing_key_gives_no_rate_key() {
        let f = json!({"id": 1, "properties": {"BearingSeqNum": 1}});
        assert_eq!(Cell::from_feature(0, &f).unwrap().rate_key(), None);
    }

    #[test]
    fn test_bounds_from_polygon() {
        let f = json!({"id": 1, "geometry": square(-119.0, 39.0), "properties": {}});
        let b = Cell::from_feature(0, &f).unwrap().bounds.unwrap();
        assert_eq!(b.south_west, GeoPoint::new(39.0, -119.0));
        assert_eq!(b.north_east, GeoPoint::new(40.0, -118.0));
    }

    #[test]
    fn test_point_geometry_has_no_bounds() {
        let f = json!({"id": 1, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}});
        assert!(Cell::from_feature(0, &f).unwrap().bounds.is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let fc = json!({"type": "FeatureCollection", "features": [{"id": 1}, {"id": "1"}]});
        assert!(matches!(
            CellCollection::from_geojson(&fc),
            Err(CollectionError::DuplicateFeatureId(_))
        ));
    }

    #[test]
    fn test_rate_key_parse_and_display() {
        let key: RateKey = "12-4".parse().unwrap();
        assert_eq!(key, RateKey::new("12", "4"));
        assert_eq!(key.to_string(), "12-4");
        assert!("12".parse::<RateKey>().is_err());
    }

    #[test]
    fn test_to_feature_preserves_properties() {
        let f = json!({"id": 1, "properties": {"farmname": "North", "zone": "stale"}});
        let mut cell = Cell::from_feature(0, &f).unwrap();
        cell.rate_percent = Some(Decimal::new(555, 1));
        let out = cell.to_feature(None);
        assert_eq!(out["properties"]["farmname"], "North");
        assert!(out["properties"].get("zone").is_none());
        assert_eq!(out["properties"][RATE_PROPERTY], 55.5);
    }
}
