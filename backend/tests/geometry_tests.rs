//! Tests for pivot and linear move geometry
//! Verifies the bearing round trip and non-degenerate sector outlines

use proptest::prelude::*;
use shared::geometry::{
    angle_from_point, dimensions_from_bounds, point_from_angle, rectangle_from_center,
    sector_polygon, sector_sweep, METERS_PER_DEGREE,
};
use shared::{GeoPoint, GeometryError};

/// Smallest angle between two bearings
fn bearing_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

// =============================================================================
// Bearings
// =============================================================================

mod bearings {
    use super::*;

    #[test]
    fn cardinal_directions() {
        let center = GeoPoint::new(10.0, 20.0);
        for angle in [0.0, 90.0, 180.0, 270.0] {
            let p = point_from_angle(&center, angle, 1000.0).unwrap();
            let back = angle_from_point(&center, &p).unwrap();
            assert!(bearing_gap(back, angle) < 0.01, "{} came back as {}", angle, back);
        }
    }

    #[test]
    fn negative_and_large_angles_fold() {
        let center = GeoPoint::new(10.0, 20.0);
        let a = point_from_angle(&center, -90.0, 500.0).unwrap();
        let b = point_from_angle(&center, 270.0, 500.0).unwrap();
        let c = point_from_angle(&center, 630.0, 500.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn rejects_bad_input() {
        let center = GeoPoint::new(10.0, 20.0);
        assert!(matches!(
            point_from_angle(&center, 10.0, 0.0),
            Err(GeometryError::InvalidGeometry { field: "radius", .. })
        ));
        assert!(point_from_angle(&center, f64::NAN, 10.0).is_err());
        assert!(point_from_angle(&GeoPoint::new(f64::INFINITY, 0.0), 10.0, 10.0).is_err());
        assert!(angle_from_point(&center, &GeoPoint::new(f64::NAN, 0.0)).is_err());
    }
}

// =============================================================================
// Sectors
// =============================================================================

mod sectors {
    use super::*;

    #[test]
    fn full_quarter_includes_end_and_center() {
        let center = GeoPoint::new(39.5, -119.8);
        let points = sector_polygon(&center, 0.0, 90.0, 400.0).unwrap();
        // 0..=89 in 1 degree steps, the exact end bearing, then the centre
        assert_eq!(points.len(), 92);
        assert_eq!(points.last(), Some(&center));
        let end = point_from_angle(&center, 90.0, 400.0).unwrap();
        assert_eq!(points[points.len() - 2], end);
    }

    #[test]
    fn wraps_through_north() {
        let center = GeoPoint::new(39.5, -119.8);
        let points = sector_polygon(&center, 350.0, 10.0, 400.0).unwrap();
        assert_eq!(points.len(), 22);
        assert_eq!(sector_sweep(350.0, 10.0), 20.0);
    }

    #[test]
    fn fractional_end_is_emitted_exactly() {
        let center = GeoPoint::new(0.0, 0.0);
        let points = sector_polygon(&center, 0.0, 2.5, 1000.0).unwrap();
        // 0, 1, 2, 2.5, centre
        assert_eq!(points.len(), 5);
        assert_eq!(points[3], point_from_angle(&center, 2.5, 1000.0).unwrap());
    }
}

// =============================================================================
// Rectangles
// =============================================================================

mod rectangles {
    use super::*;

    #[test]
    fn length_runs_east_west_when_horizontal() {
        let center = GeoPoint::new(0.0, 0.0);
        let bounds = rectangle_from_center(&center, 400.0, 100.0, true).unwrap();
        let lat_span = bounds.north_east.latitude - bounds.south_west.latitude;
        let lng_span = bounds.north_east.longitude - bounds.south_west.longitude;
        assert!((lat_span * METERS_PER_DEGREE - 100.0).abs() < 1e-6);
        assert!((lng_span * METERS_PER_DEGREE - 400.0).abs() < 1e-6);
        assert_eq!(bounds.center(), center);
    }

    #[test]
    fn measured_dimensions_match_drawn_box() {
        let center = GeoPoint::new(0.0, 0.0);
        let bounds = rectangle_from_center(&center, 400.0, 100.0, false).unwrap();
        let (east_west, north_south) = dimensions_from_bounds(&bounds).unwrap();
        assert!((east_west - 100.0).abs() < 1.0);
        assert!((north_south - 400.0).abs() < 2.0);
    }

    #[test]
    fn empty_box_rejected() {
        let p = GeoPoint::new(1.0, 1.0);
        let bounds = shared::Bounds::from_corners(p, p);
        assert!(dimensions_from_bounds(&bounds).is_err());
    }
}

// =============================================================================
// Property tests
// =============================================================================

mod properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// point_from_angle and angle_from_point invert each other up to
        /// coordinate rounding
        #[test]
        fn prop_bearing_round_trip(
            lat in -60.0f64..60.0,
            lng in -170.0f64..170.0,
            radius in 50.0f64..5000.0,
            angle in 0.0f64..360.0,
        ) {
            let center = GeoPoint::new(lat, lng);
            let point = point_from_angle(&center, angle, radius).unwrap();
            let back = angle_from_point(&center, &point).unwrap();
            // Six-decimal rounding moves a point by under 0.08 m
            let tolerance = (0.1 / radius).to_degrees();
            prop_assert!(
                bearing_gap(back, angle) <= tolerance,
                "angle {} came back as {} (tolerance {})", angle, back, tolerance
            );
        }

        /// Equal start and end never collapse to a point, even below the
        /// coordinate precision
        #[test]
        fn prop_degenerate_sector_has_two_distinct_points(
            lat in -60.0f64..60.0,
            lng in -170.0f64..170.0,
            radius in 0.001f64..5000.0,
            angle in 0.0f64..360.0,
        ) {
            // on the six-decimal grid, so rounding can land an arc point on it
            let center = GeoPoint::new((lat * 1e6).round() / 1e6, (lng * 1e6).round() / 1e6);
            let points = sector_polygon(&center, angle, angle, radius).unwrap();
            prop_assert_eq!(points.len(), 3);
            prop_assert_ne!(points[0], points[1]);
            prop_assert_ne!(points[0], center);
            prop_assert_ne!(points[1], center);
            prop_assert_eq!(points[2], center);
        }

        /// Every sector ends at its centre and stays within one degree steps
        #[test]
        fn prop_sector_point_count(
            start in 0.0f64..360.0,
            end in 0.0f64..360.0,
        ) {
            prop_assume!((start - end).abs() > 1e-9);
            let center = GeoPoint::new(20.0, 30.0);
            let points = sector_polygon(&center, start, end, 500.0).unwrap();
            let sweep = sector_sweep(start, end);
            let arc = points.len() - 1;
            prop_assert!(arc as f64 >= sweep.ceil());
            prop_assert!(arc as f64 <= sweep.ceil() + 1.0);
            prop_assert_eq!(points[arc], center);
        }
    }
}
