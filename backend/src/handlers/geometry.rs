//! HTTP handlers for the drawing helpers used while sketching a system

use axum::Json;
use serde::{Deserialize, Serialize};
use shared::geometry::{
    angle_from_point, dimensions_from_bounds, distance_m, rectangle_from_center, sector_polygon,
    sector_sweep,
};
use shared::units::{application_rate, Measurement, UnitSystem, DEFAULT_IRRIGATION_EFFICIENCY};
use shared::{Bounds, GeoPoint, Orientation};
use validator::Validate;

use crate::error::AppResult;

/// Input for a pivot sector outline
#[derive(Debug, Deserialize, Validate)]
pub struct SectorInput {
    pub center: GeoPoint,
    pub start_angle: f64,
    pub end_angle: f64,
    #[validate(range(min = 0.0))]
    pub radius_m: f64,
}

#[derive(Debug, Serialize)]
pub struct SectorResponse {
    pub points: Vec<GeoPoint>,
    pub sweep_degrees: f64,
}

/// Outline of a pivot sector, closed at the centre
pub async fn sector_outline(Json(input): Json<SectorInput>) -> AppResult<Json<SectorResponse>> {
    input.validate()?;
    let points = sector_polygon(&input.center, input.start_angle, input.end_angle, input.radius_m)?;
    Ok(Json(SectorResponse {
        points,
        sweep_degrees: sector_sweep(input.start_angle, input.end_angle),
    }))
}

/// Input for a linear move field
#[derive(Debug, Deserialize, Validate)]
pub struct RectangleInput {
    pub center: GeoPoint,
    #[validate(range(min = 0.0))]
    pub length_m: f64,
    #[validate(range(min = 0.0))]
    pub width_m: f64,
    #[serde(default)]
    pub orientation: Orientation,
}

#[derive(Debug, Serialize)]
pub struct RectangleResponse {
    pub bounds: Bounds,
    pub bbox: [[f64; 2]; 2],
}

/// Bounding box of a linear move field around its centre
pub async fn rectangle_bounds(
    Json(input): Json<RectangleInput>,
) -> AppResult<Json<RectangleResponse>> {
    input.validate()?;
    let bounds = rectangle_from_center(
        &input.center,
        input.length_m,
        input.width_m,
        input.orientation.length_is_horizontal(),
    )?;
    Ok(Json(RectangleResponse {
        bbox: bounds.as_bbox(),
        bounds,
    }))
}

/// Input for reading back a dragged pivot handle
#[derive(Debug, Deserialize)]
pub struct BearingInput {
    pub center: GeoPoint,
    pub point: GeoPoint,
}

#[derive(Debug, Serialize)]
pub struct BearingResponse {
    pub bearing: f64,
    pub distance_m: f64,
}

/// Bearing and distance from a pivot centre to a point
pub async fn bearing_to_point(Json(input): Json<BearingInput>) -> AppResult<Json<BearingResponse>> {
    let bearing = angle_from_point(&input.center, &input.point)?;
    Ok(Json(BearingResponse {
        bearing,
        distance_m: distance_m(&input.center, &input.point),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DimensionsInput {
    pub bounds: Bounds,
}

#[derive(Debug, Serialize)]
pub struct DimensionsResponse {
    pub east_west_m: f64,
    pub north_south_m: f64,
}

/// Side lengths of a rectangle drawn on the map
pub async fn rectangle_dimensions(
    Json(input): Json<DimensionsInput>,
) -> AppResult<Json<DimensionsResponse>> {
    let (east_west_m, north_south_m) = dimensions_from_bounds(&input.bounds)?;
    Ok(Json(DimensionsResponse {
        east_west_m,
        north_south_m,
    }))
}

/// Input for a drip system application rate
#[derive(Debug, Deserialize, Validate)]
pub struct ApplicationRateInput {
    pub emitter_flow: Measurement,
    pub drip_line_distance: Measurement,
    pub emitter_spacing: Measurement,
    #[validate(range(min = 0.0, max = 1.0))]
    pub irrigation_efficiency: Option<f64>,
    #[serde(default)]
    pub output_unit: UnitSystem,
}

#[derive(Debug, Serialize)]
pub struct ApplicationRateResponse {
    pub application_rate: f64,
    /// `in/h` or `mm/h`
    pub unit: &'static str,
}

/// Precipitation rate of a drip system
pub async fn drip_application_rate(
    Json(input): Json<ApplicationRateInput>,
) -> AppResult<Json<ApplicationRateResponse>> {
    input.validate()?;
    let rate = application_rate(
        input.emitter_flow,
        input.drip_line_distance,
        input.emitter_spacing,
        input
            .irrigation_efficiency
            .unwrap_or(DEFAULT_IRRIGATION_EFFICIENCY),
        input.output_unit,
    )?;
    Ok(Json(ApplicationRateResponse {
        application_rate: rate,
        unit: match input.output_unit {
            UnitSystem::Imperial => "in/h",
            UnitSystem::Si => "mm/h",
        },
    }))
}
