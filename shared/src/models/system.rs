//! Irrigation system shapes, drafts and upstream requests

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DraftError, GeometryError};
use crate::geometry::{
    dimensions_from_bounds, point_from_angle, rectangle_from_center, sector_polygon, sector_sweep,
};
use crate::sprinkler::{PivotSprinklerZone, SprinklerZoneChain};
use crate::types::{Bounds, GeoPoint, Orientation};
use crate::units::{application_rate, Measurement, Quantity, UnitSystem};
use crate::validation::{validate_positive, validate_system_name};

/// Cell size, in metres, requested for linear move grids
pub const LINEAR_GRID_SPACING: u32 = 2;

/// The drawn outline of an irrigated area
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle {
        center: GeoPoint,
        radius_m: f64,
    },
    Rectangle {
        center: GeoPoint,
        length_m: f64,
        width_m: f64,
        #[serde(default)]
        orientation: Orientation,
    },
    Polygon {
        vertices: Vec<GeoPoint>,
    },
}

impl Shape {
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.bounds().map(|_| ())
    }

    /// Radius for circles, machine width for rectangles
    pub fn outer_measurement(&self) -> Option<f64> {
        match self {
            Shape::Circle { radius_m, .. } => Some(*radius_m),
            Shape::Rectangle { width_m, .. } => Some(*width_m),
            Shape::Polygon { .. } => None,
        }
    }

    pub fn bounds(&self) -> Result<Bounds, GeometryError> {
        match self {
            Shape::Circle { center, radius_m } => {
                let north = point_from_angle(center, 0.0, *radius_m)?;
                let east = point_from_angle(center, 90.0, *radius_m)?;
                let south = point_from_angle(center, 180.0, *radius_m)?;
                let west = point_from_angle(center, 270.0, *radius_m)?;
                Ok(Bounds::from_corners(
                    GeoPoint::new(south.latitude, west.longitude),
                    GeoPoint::new(north.latitude, east.longitude),
                ))
            }
            Shape::Rectangle {
                center,
                length_m,
                width_m,
                orientation,
            } => rectangle_from_center(
                center,
                *length_m,
                *width_m,
                orientation.length_is_horizontal(),
            ),
            Shape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(GeometryError::invalid(
                        "vertices",
                        "a polygon needs at least three vertices",
                    ));
                }
                if vertices.iter().any(|v| !v.is_finite()) {
                    return Err(GeometryError::invalid(
                        "vertices",
                        "must have finite coordinates",
                    ));
                }
                let first = vertices[0];
                Ok(vertices.iter().skip(1).fold(
                    Bounds::from_corners(first, first),
                    |b, v| {
                        Bounds::from_corners(
                            GeoPoint::new(
                                b.south_west.latitude.min(v.latitude),
                                b.south_west.longitude.min(v.longitude),
                            ),
                            GeoPoint::new(
                                b.north_east.latitude.max(v.latitude),
                                b.north_east.longitude.max(v.longitude),
                            ),
                        )
                    },
                ))
            }
        }
    }
}

/// Angular wedge of a pivot, clockwise from `start_angle` to `end_angle`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sector {
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Sector {
    pub fn new(start_angle: f64, end_angle: f64) -> Self {
        Self {
            start_angle,
            end_angle,
        }
    }

    /// Swept angle in degrees; 0 for a degenerate sector
    pub fn sweep(&self) -> f64 {
        sector_sweep(self.start_angle, self.end_angle)
    }

    pub fn polygon(&self, center: &GeoPoint, radius_m: f64) -> Result<Vec<GeoPoint>, GeometryError> {
        sector_polygon(center, self.start_angle, self.end_angle, radius_m)
    }
}

fn positive_field(field: &'static str, value: f64) -> Result<f64, DraftError> {
    validate_positive(value).map_err(|reason| DraftError::InvalidField { field, reason })?;
    Ok(value)
}

fn system_name(field: &'static str, name: &str) -> Result<String, DraftError> {
    validate_system_name(name).map_err(|reason| DraftError::InvalidField { field, reason })?;
    Ok(name.trim().to_string())
}

/// A center pivot being drawn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CenterPivotDraft {
    pub name: String,
    pub farm_name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    #[serde(default)]
    pub sector: Option<Sector>,
    pub maximum_speed: f64,
    /// Water applied at maximum speed
    pub water_application: f64,
    pub nozzle_spacing: f64,
    pub chain: SprinklerZoneChain,
}

/// Center pivot creation payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CenterPivotRequest {
    pub user_id: String,
    pub farm_name: String,
    pub pivot_name: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub maximum_speed: f64,
    pub water_application: f64,
    pub sprinkler_zones: Vec<PivotSprinklerZone>,
    pub space_between_nozzles: f64,
}

impl CenterPivotDraft {
    pub fn to_request(&self, user_id: &str) -> Result<CenterPivotRequest, DraftError> {
        let pivot_name = system_name("name", &self.name)?;
        let farm_name = system_name("farm_name", &self.farm_name)?;
        let shape = Shape::Circle {
            center: self.center,
            radius_m: self.radius_m,
        };
        shape.validate()?;
        let sector = self.sector.ok_or(DraftError::MissingSector)?;
        sector.polygon(&self.center, self.radius_m)?;

        let mut chain = self.chain.clone();
        chain.set_envelope(self.radius_m);

        Ok(CenterPivotRequest {
            user_id: user_id.to_string(),
            farm_name,
            pivot_name,
            center_lat: self.center.latitude,
            center_lng: self.center.longitude,
            radius: self.radius_m,
            start_angle: sector.start_angle,
            end_angle: sector.end_angle,
            maximum_speed: positive_field("maximum_speed", self.maximum_speed)?,
            water_application: positive_field("water_application", self.water_application)?,
            sprinkler_zones: chain.pivot_zones()?,
            space_between_nozzles: positive_field("nozzle_spacing", self.nozzle_spacing)?,
        })
    }
}

/// A linear move being drawn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearMoveDraft {
    pub name: String,
    pub farm_name: String,
    pub center: GeoPoint,
    pub length_m: f64,
    pub width_m: f64,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub start_point: Option<GeoPoint>,
    pub chain: SprinklerZoneChain,
}

/// Linear move grid generation payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearMoveRequest {
    pub user_id: String,
    pub farmname: String,
    pub irrigation_system_name: String,
    pub center: GeoPoint,
    pub width: f64,
    pub length: f64,
    pub gridspacing: u32,
    pub sprinklerzones: BTreeMap<String, [f64; 2]>,
    pub bbox: [[f64; 2]; 2],
    pub startpoint: [f64; 2],
    #[serde(rename = "isLengthHorizontal")]
    pub is_length_horizontal: bool,
}

impl LinearMoveDraft {
    pub fn to_request(&self, user_id: &str) -> Result<LinearMoveRequest, DraftError> {
        let irrigation_system_name = system_name("name", &self.name)?;
        let farmname = system_name("farm_name", &self.farm_name)?;
        let bounds = Shape::Rectangle {
            center: self.center,
            length_m: self.length_m,
            width_m: self.width_m,
            orientation: self.orientation,
        }
        .bounds()?;
        let start_point = self.start_point.ok_or(DraftError::MissingStartPoint)?;

        let mut chain = self.chain.clone();
        chain.set_envelope(self.width_m);

        Ok(LinearMoveRequest {
            user_id: user_id.to_string(),
            farmname,
            irrigation_system_name,
            center: self.center,
            width: self.width_m,
            length: self.length_m,
            gridspacing: LINEAR_GRID_SPACING,
            sprinklerzones: chain.banded_zones()?,
            bbox: bounds.as_bbox(),
            startpoint: start_point.as_lat_lng(),
            is_length_horizontal: self.orientation.length_is_horizontal(),
        })
    }
}

/// A drip or micro-sprinkler block drawn as a rectangle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MicroIrrigationDraft {
    pub name: String,
    pub farm_name: String,
    pub emitter_flow: Measurement,
    pub emitter_spacing: Measurement,
    pub drip_line_distance: Measurement,
    pub irrigation_efficiency: f64,
    #[serde(default)]
    pub application_rate_unit: UnitSystem,
    pub bounds: Bounds,
    #[serde(default)]
    pub start_point: Option<GeoPoint>,
    /// Grid divisions along the east-west side
    pub length_split: u32,
    /// Grid divisions along the north-south side
    pub width_split: u32,
}

/// Micro-irrigation grid generation payload; flows in l/h, spacings in m
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MicroIrrigationRequest {
    pub user_id: String,
    pub farmname: String,
    pub irrigation_system_name: String,
    #[serde(rename = "emitterFlow")]
    pub emitter_flow: f64,
    #[serde(rename = "emitterSpacing")]
    pub emitter_spacing: f64,
    #[serde(rename = "dripLineDistance")]
    pub drip_line_distance: f64,
    #[serde(rename = "irrigationEfficiency")]
    pub irrigation_efficiency: f64,
    #[serde(rename = "applicationRate")]
    pub application_rate: f64,
    /// Square metres
    pub area: f64,
    pub startpoint: [f64; 2],
    pub center: GeoPoint,
    pub bbox: [[f64; 2]; 2],
    /// East-west span in degrees of longitude
    pub length: f64,
    /// North-south span in degrees of latitude
    pub width: f64,
    pub length_split: u32,
    pub width_split: u32,
}

impl MicroIrrigationDraft {
    pub fn application_rate(&self) -> Result<f64, DraftError> {
        Ok(application_rate(
            self.emitter_flow,
            self.drip_line_distance,
            self.emitter_spacing,
            self.irrigation_efficiency,
            self.application_rate_unit,
        )?)
    }

    pub fn to_request(&self, user_id: &str) -> Result<MicroIrrigationRequest, DraftError> {
        let irrigation_system_name = system_name("name", &self.name)?;
        let farmname = system_name("farm_name", &self.farm_name)?;
        let application_rate = self.application_rate()?;
        let (east_west_m, north_south_m) = dimensions_from_bounds(&self.bounds)?;
        let start_point = self.start_point.ok_or(DraftError::MissingStartPoint)?;
        if self.length_split == 0 || self.width_split == 0 {
            return Err(DraftError::InvalidField {
                field: "grid_split",
                reason: "must be at least 1",
            });
        }

        Ok(MicroIrrigationRequest {
            user_id: user_id.to_string(),
            farmname,
            irrigation_system_name,
            emitter_flow: self.emitter_flow.to(Quantity::Flow, UnitSystem::Si),
            emitter_spacing: self.emitter_spacing.to(Quantity::Distance, UnitSystem::Si),
            drip_line_distance: self.drip_line_distance.to(Quantity::Distance, UnitSystem::Si),
            irrigation_efficiency: self.irrigation_efficiency,
            application_rate,
            area: east_west_m * north_south_m,
            startpoint: start_point.as_lat_lng(),
            center: self.bounds.center(),
            bbox: self.bounds.as_bbox(),
            length: self.bounds.north_east.longitude - self.bounds.south_west.longitude,
            width: self.bounds.north_east.latitude - self.bounds.south_west.latitude,
            length_split: self.length_split,
            width_split: self.width_split,
        })
    }
}
