//! Common types used across the platform

use geo::Intersects;
use geo_types::{coord, Rect};
use serde::{Deserialize, Serialize};

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// `[lat, lng]` pair, the order the map front-end uses
    pub fn as_lat_lng(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Axis-aligned latitude/longitude box
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    /// Build bounds from any two opposite corners
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            south_west: GeoPoint::new(a.latitude.min(b.latitude), a.longitude.min(b.longitude)),
            north_east: GeoPoint::new(a.latitude.max(b.latitude), a.longitude.max(b.longitude)),
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }

    /// Inclusive intersection test; touching edges count
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.to_rect().intersects(&other.to_rect())
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude
            && point.longitude >= self.south_west.longitude
            && point.longitude <= self.north_east.longitude
    }

    /// Grow the box by `margin` degrees on every side
    pub fn expanded(&self, margin: f64) -> Bounds {
        Bounds {
            south_west: GeoPoint::new(
                self.south_west.latitude - margin,
                self.south_west.longitude - margin,
            ),
            north_east: GeoPoint::new(
                self.north_east.latitude + margin,
                self.north_east.longitude + margin,
            ),
        }
    }

    /// `[[sw_lat, sw_lng], [ne_lat, ne_lng]]`
    pub fn as_bbox(&self) -> [[f64; 2]; 2] {
        [self.south_west.as_lat_lng(), self.north_east.as_lat_lng()]
    }

    pub(crate) fn to_rect(self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.south_west.longitude, y: self.south_west.latitude },
            coord! { x: self.north_east.longitude, y: self.north_east.latitude },
        )
    }

    pub(crate) fn from_rect(rect: Rect<f64>) -> Self {
        Self {
            south_west: GeoPoint::new(rect.min().y, rect.min().x),
            north_east: GeoPoint::new(rect.max().y, rect.max().x),
        }
    }
}

/// Orientation of a rectangular (linear move) field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The machine's length runs east-west
    #[default]
    LengthHorizontal,
    /// The machine's length runs north-south
    LengthVertical,
}

impl Orientation {
    pub fn from_length_is_horizontal(length_is_horizontal: bool) -> Self {
        if length_is_horizontal {
            Orientation::LengthHorizontal
        } else {
            Orientation::LengthVertical
        }
    }

    pub fn length_is_horizontal(&self) -> bool {
        matches!(self, Orientation::LengthHorizontal)
    }
}

/// Explicit identifiers of the irrigation system an operation works on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SystemContext {
    pub user_id: String,
    pub farm_name: String,
    pub irrigation_system_name: String,
    /// Sensor gateway attached to the farm, when one is configured
    #[serde(default)]
    pub gateway: Option<String>,
}
