//! Field-scale geometry for drawing irrigation systems
//!
//! Bearings are degrees clockwise from north. Offsets use an equirectangular
//! approximation (1° latitude ≈ 111,320 m, longitude scaled by the cosine of
//! the centre latitude), which is accurate enough at the scale of a single
//! field but not for geodesic work over long distances.

use crate::error::GeometryError;
use crate::types::{Bounds, GeoPoint};

/// Metres per degree of latitude
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Mean Earth radius used for measured distances (haversine)
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Decimal places kept on computed coordinates
pub const COORDINATE_PRECISION: i32 = 6;

/// Angular step used when tracing a sector arc
pub const SECTOR_STEP_DEGREES: f64 = 1.0;

/// Offset applied to a zero-width sector so it still renders as a wedge
pub const DEGENERATE_SECTOR_EPSILON: f64 = 0.1;

fn round_coordinate(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_PRECISION);
    (value * factor).round() / factor
}

fn check_center(center: &GeoPoint) -> Result<(), GeometryError> {
    if !center.is_finite() {
        return Err(GeometryError::invalid("center", "must have finite coordinates"));
    }
    if center.latitude.abs() >= 90.0 {
        return Err(GeometryError::invalid("center", "latitude must be between -90 and 90"));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::invalid(field, "must be a finite number"));
    }
    if value <= 0.0 {
        return Err(GeometryError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn check_angle(field: &'static str, value: f64) -> Result<f64, GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::invalid(field, "must be a finite number"));
    }
    Ok(normalize_bearing(value))
}

/// Fold any finite bearing into [0, 360)
pub fn normalize_bearing(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

fn meters_per_degree_longitude(latitude: f64) -> f64 {
    METERS_PER_DEGREE * latitude.to_radians().cos()
}

/// Point at `radius_meters` from `center` along `angle_degrees`
pub fn point_from_angle(
    center: &GeoPoint,
    angle_degrees: f64,
    radius_meters: f64,
) -> Result<GeoPoint, GeometryError> {
    check_center(center)?;
    check_positive("radius", radius_meters)?;
    let angle = check_angle("angle", angle_degrees)?;
    Ok(offset_point(center, angle, radius_meters))
}

// Inputs already validated
fn offset_point(center: &GeoPoint, angle_degrees: f64, radius_meters: f64) -> GeoPoint {
    let radians = angle_degrees.to_radians();
    let lat_offset = radius_meters * radians.cos() / METERS_PER_DEGREE;
    let lng_offset = radius_meters * radians.sin() / meters_per_degree_longitude(center.latitude);
    GeoPoint::new(
        round_coordinate(center.latitude + lat_offset),
        round_coordinate(center.longitude + lng_offset),
    )
}

/// Bearing from `center` to `point`, in [0, 360)
///
/// The longitude delta is scaled the same way `point_from_angle` scales it,
/// so the two functions invert each other up to coordinate rounding.
pub fn angle_from_point(center: &GeoPoint, point: &GeoPoint) -> Result<f64, GeometryError> {
    check_center(center)?;
    if !point.is_finite() {
        return Err(GeometryError::invalid("point", "must have finite coordinates"));
    }
    let d_lat = point.latitude - center.latitude;
    let d_lng = (point.longitude - center.longitude) * center.latitude.to_radians().cos();
    Ok(normalize_bearing(d_lng.atan2(d_lat).to_degrees()))
}

/// Closed outline of a pivot sector: the arc from `start` to `end`, then the centre
///
/// The arc is walked clockwise in 1° steps and wraps through north when
/// `end < start`. The exact end bearing is always included. When the bearings
/// are equal the result is two arc points a small angle apart plus the centre,
/// all three distinct after coordinate rounding.
pub fn sector_polygon(
    center: &GeoPoint,
    start_degrees: f64,
    end_degrees: f64,
    radius_meters: f64,
) -> Result<Vec<GeoPoint>, GeometryError> {
    check_center(center)?;
    check_positive("radius", radius_meters)?;
    let start = check_angle("start_angle", start_degrees)?;
    let end = check_angle("end_angle", end_degrees)?;

    let mut points = Vec::new();
    if start == end {
        // Small radii can round arc points onto each other or onto the
        // centre: widen the wedge first, then lengthen it
        let mut radius = radius_meters;
        let mut epsilon = DEGENERATE_SECTOR_EPSILON;
        let mut first = offset_point(center, start, radius);
        let mut second = offset_point(center, end + epsilon, radius);
        while first == *center || second == *center || second == first {
            if epsilon < 45.0 && first != *center {
                epsilon *= 2.0;
            } else {
                radius *= 2.0;
                first = offset_point(center, start, radius);
            }
            second = offset_point(center, end + epsilon, radius);
        }
        points.push(first);
        points.push(second);
    } else {
        let sweep_end = if end < start { end + 360.0 } else { end };
        let mut angle = start;
        while angle < sweep_end {
            points.push(offset_point(center, normalize_bearing(angle), radius_meters));
            angle += SECTOR_STEP_DEGREES;
        }
        points.push(offset_point(center, end, radius_meters));
    }
    points.push(*center);
    Ok(points)
}

/// Angular width of a sector, clockwise from start to end
pub fn sector_sweep(start_degrees: f64, end_degrees: f64) -> f64 {
    let start = normalize_bearing(start_degrees);
    let end = normalize_bearing(end_degrees);
    if end >= start {
        end - start
    } else {
        end + 360.0 - start
    }
}

/// Bounding box of a linear-move field centred on `center`
///
/// With `length_is_horizontal` the length runs east-west and the width
/// north-south; otherwise the two are swapped.
pub fn rectangle_from_center(
    center: &GeoPoint,
    length_meters: f64,
    width_meters: f64,
    length_is_horizontal: bool,
) -> Result<Bounds, GeometryError> {
    check_center(center)?;
    check_positive("length", length_meters)?;
    check_positive("width", width_meters)?;

    let (north_south, east_west) = if length_is_horizontal {
        (width_meters, length_meters)
    } else {
        (length_meters, width_meters)
    };
    let lat_delta = north_south / METERS_PER_DEGREE;
    let lng_delta = east_west / meters_per_degree_longitude(center.latitude);

    Ok(Bounds {
        south_west: GeoPoint::new(
            center.latitude - lat_delta / 2.0,
            center.longitude - lng_delta / 2.0,
        ),
        north_east: GeoPoint::new(
            center.latitude + lat_delta / 2.0,
            center.longitude + lng_delta / 2.0,
        ),
    })
}

/// Great-circle distance in metres
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Measured (east-west, north-south) extent of a drawn box, in metres
///
/// Both sides are measured along the southern and western edges.
pub fn dimensions_from_bounds(bounds: &Bounds) -> Result<(f64, f64), GeometryError> {
    if !bounds.south_west.is_finite() || !bounds.north_east.is_finite() {
        return Err(GeometryError::invalid("bounds", "must have finite coordinates"));
    }
    let sw = bounds.south_west;
    let south_east = GeoPoint::new(sw.latitude, bounds.north_east.longitude);
    let north_west = GeoPoint::new(bounds.north_east.latitude, sw.longitude);
    let east_west = distance_m(&sw, &south_east);
    let north_south = distance_m(&sw, &north_west);
    if east_west <= 0.0 || north_south <= 0.0 {
        return Err(GeometryError::invalid("bounds", "must enclose a non-empty area"));
    }
    Ok((east_west, north_south))
}
