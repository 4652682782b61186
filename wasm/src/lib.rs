//! WebAssembly module for the VRI planner map
//!
//! Provides client-side computation for:
//! - Pivot sector outlines and handle bearings while drawing
//! - Linear move field rectangles
//! - Prescription legend colours
//! - Drip application rates
//! - Form validation of names and sprinkler zones

use rust_decimal::Decimal;
use shared::geometry::{
    angle_from_point, point_from_angle, rectangle_from_center, sector_polygon, sector_sweep,
};
use shared::prescription::{color_for_rate, convert_color, rate_from_f64};
use shared::sprinkler::{ChainKind, SprinklerZoneChain};
use shared::units::{application_rate, Measurement, UnitSystem};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("vri planner module ready"));
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

/// Outline of a pivot sector as `[[lat, lng], ...]` JSON, closed at the centre
#[wasm_bindgen]
pub fn sector_outline(
    center_lat: f64,
    center_lng: f64,
    start_angle: f64,
    end_angle: f64,
    radius_m: f64,
) -> Result<String, JsValue> {
    let center = GeoPoint::new(center_lat, center_lng);
    let points = sector_polygon(&center, start_angle, end_angle, radius_m).map_err(js_error)?;
    let pairs: Vec<[f64; 2]> = points.iter().map(GeoPoint::as_lat_lng).collect();
    serde_json::to_string(&pairs).map_err(js_error)
}

/// Clockwise width of a sector in degrees
#[wasm_bindgen]
pub fn sector_width(start_angle: f64, end_angle: f64) -> f64 {
    sector_sweep(start_angle, end_angle)
}

/// `[lat, lng]` of a handle placed on the pivot's edge
#[wasm_bindgen]
pub fn point_at_bearing(
    center_lat: f64,
    center_lng: f64,
    angle: f64,
    radius_m: f64,
) -> Result<Vec<f64>, JsValue> {
    let point = point_from_angle(&GeoPoint::new(center_lat, center_lng), angle, radius_m)
        .map_err(js_error)?;
    Ok(point.as_lat_lng().to_vec())
}

/// Bearing from the pivot centre to a dragged handle
#[wasm_bindgen]
pub fn bearing_from_center(
    center_lat: f64,
    center_lng: f64,
    lat: f64,
    lng: f64,
) -> Result<f64, JsValue> {
    angle_from_point(
        &GeoPoint::new(center_lat, center_lng),
        &GeoPoint::new(lat, lng),
    )
    .map_err(js_error)
}

/// `[sw_lat, sw_lng, ne_lat, ne_lng]` of a linear move field
#[wasm_bindgen]
pub fn linear_field_bounds(
    center_lat: f64,
    center_lng: f64,
    length_m: f64,
    width_m: f64,
    length_is_horizontal: bool,
) -> Result<Vec<f64>, JsValue> {
    let bounds = rectangle_from_center(
        &GeoPoint::new(center_lat, center_lng),
        length_m,
        width_m,
        length_is_horizontal,
    )
    .map_err(js_error)?;
    Ok(vec![
        bounds.south_west.latitude,
        bounds.south_west.longitude,
        bounds.north_east.latitude,
        bounds.north_east.longitude,
    ])
}

/// Convert a prescription `#AARRGGBB` colour for the map
#[wasm_bindgen]
pub fn convert_argb_color(argb: &str) -> String {
    convert_color(argb)
}

/// Legend colour for a rate; pass `undefined` for cells without data
#[wasm_bindgen]
pub fn legend_color(rate: Option<f64>, legend_json: &str) -> Result<String, JsValue> {
    let legend: Legend = serde_json::from_str(legend_json)
        .map_err(|e| js_error(format!("Invalid legend JSON: {}", e)))?;
    let rate = match rate {
        Some(r) => Some(rate_from_f64(r).map_err(js_error)?),
        None => None,
    };
    Ok(color_for_rate(rate, &Legend::new(legend.entries().to_vec())))
}

fn unit_system(unit: &str) -> Option<UnitSystem> {
    serde_json::from_value(serde_json::Value::String(unit.to_string())).ok()
}

/// Drip application rate; units are `"imperial"` or `"SI"`
#[wasm_bindgen]
pub fn drip_application_rate(
    emitter_flow: f64,
    drip_line_distance: f64,
    emitter_spacing: f64,
    input_unit: &str,
    efficiency: f64,
    output_unit: &str,
) -> Result<f64, JsValue> {
    let input = unit_system(input_unit).ok_or_else(|| js_error("Unknown input unit"))?;
    let output = unit_system(output_unit).ok_or_else(|| js_error("Unknown output unit"))?;
    application_rate(
        Measurement::new(emitter_flow, input),
        Measurement::new(drip_line_distance, input),
        Measurement::new(emitter_spacing, input),
        efficiency,
        output,
    )
    .map_err(js_error)
}

/// Check sprinkler zone bounds as typed into the form
///
/// `bounds_json` is `[[inner, outer], ...]` with `null` for blank fields.
/// Returns `None` when the chain is valid, otherwise the first problem.
#[wasm_bindgen]
pub fn check_sprinkler_zones(radial: bool, envelope: f64, bounds_json: &str) -> Option<String> {
    let bounds: Vec<(Option<f64>, Option<f64>)> = match serde_json::from_str(bounds_json) {
        Ok(bounds) => bounds,
        Err(e) => return Some(format!("Invalid zone bounds: {}", e)),
    };
    let kind = if radial {
        ChainKind::Radial
    } else {
        ChainKind::Banded
    };
    SprinklerZoneChain::from_bounds(kind, envelope, &bounds)
        .and_then(|chain| chain.validate())
        .err()
        .map(|e| e.to_string())
}

/// Check a management zone name; `None` when valid
#[wasm_bindgen]
pub fn check_zone_name(name: &str) -> Option<String> {
    validate_zone_name(name).err().map(str::to_string)
}

/// Check a watering rate typed into the rate editor; `None` when valid
#[wasm_bindgen]
pub fn check_watering_rate(rate: f64) -> Option<String> {
    match Decimal::try_from(rate) {
        Ok(d) => validate_watering_rate(d).err().map(str::to_string),
        Err(_) => Some("Watering rate must be a number".to_string()),
    }
}
