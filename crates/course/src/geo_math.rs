//! Geodesic helpers on (latitude, longitude) pairs in degrees.
//!
//! Great-circle math goes through `geo`'s haversine implementation; the
//! nearest-point projection uses a local equirectangular plane centred on
//! the query point, which is accurate enough for segments under ~1 km.

use geo::{Bearing as _, Destination as _, Distance as _, Haversine, Point};

use crate::models::GeoPoint;

/// Mean earth radius in meters, matching `geo`'s haversine radius.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Great-circle distance in meters.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Initial bearing from `a` to `b` in degrees, normalised to [0, 360).
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    normalize_bearing(Haversine.bearing(Point::from(a), Point::from(b)))
}

/// Point reached by travelling `distance_m` from `origin` along `bearing_deg`.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    Haversine
        .destination(Point::from(origin), bearing_deg, distance_m)
        .into()
}

pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if b >= 360.0 { 0.0 } else { b }
}

/// Smallest angle between two bearings, in [0, 180].
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// True when `other` runs within `tolerance_deg` of the exact reverse of `heading`.
pub fn is_antiparallel(heading: f64, other: f64, tolerance_deg: f64) -> bool {
    bearing_difference(normalize_bearing(heading + 180.0), other) <= tolerance_deg
}

/// Closest point on a finite segment to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    pub point: GeoPoint,
    /// Distance from the query point to `point`, in meters.
    pub distance: f64,
    /// Position of `point` along the segment, 0 at the start and 1 at the end.
    pub fraction: f64,
}

/// Project `p` onto the segment `start`-`end`.
pub fn nearest_point_on_segment(p: GeoPoint, start: GeoPoint, end: GeoPoint) -> SegmentProjection {
    let cos_lat = p.lat.to_radians().cos().max(1e-12);
    let to_plane = |q: GeoPoint| {
        let dlon = wrap_longitude_delta(q.lon - p.lon);
        (
            dlon * cos_lat * METERS_PER_DEGREE,
            (q.lat - p.lat) * METERS_PER_DEGREE,
        )
    };

    let (ax, ay) = to_plane(start);
    let (bx, by) = to_plane(end);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    let fraction = if len_sq == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (ax + fraction * dx, ay + fraction * dy);
    let point = GeoPoint::new(
        p.lat + cy / METERS_PER_DEGREE,
        p.lon + cx / (METERS_PER_DEGREE * cos_lat),
    );

    SegmentProjection {
        point,
        distance: cx.hypot(cy),
        fraction,
    }
}

fn wrap_longitude_delta(dlon: f64) -> f64 {
    if dlon > 180.0 {
        dlon - 360.0
    } else if dlon < -180.0 {
        dlon + 360.0
    } else {
        dlon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn east_of_origin(meters: f64) -> GeoPoint {
        GeoPoint::new(0.0, meters / METERS_PER_DEGREE)
    }

    #[test]
    fn test_distance_one_degree() {
        // ~111km for 1 degree of latitude
        let dist = distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((dist - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_distance_short_span() {
        let dist = distance(GeoPoint::new(0.0, 0.0), east_of_origin(500.0));
        assert!((dist - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_cardinals() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((bearing(origin, GeoPoint::new(0.001, 0.0)) - 0.0).abs() < 1e-6);
        assert!((bearing(origin, GeoPoint::new(0.0, 0.001)) - 90.0).abs() < 1e-6);
        assert!((bearing(origin, GeoPoint::new(-0.001, 0.0)) - 180.0).abs() < 1e-6);
        assert!((bearing(origin, GeoPoint::new(0.0, -0.001)) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_range() {
        let b = bearing(GeoPoint::new(10.0, 10.0), GeoPoint::new(10.001, 9.999));
        assert!((0.0..360.0).contains(&b));
        assert!(b > 270.0);
    }

    #[test]
    fn test_destination_matches_distance_and_bearing() {
        let origin = GeoPoint::new(45.0, 7.0);
        let dest = destination(origin, 60.0, 300.0);
        assert!((distance(origin, dest) - 300.0).abs() < 0.01);
        assert!((bearing(origin, dest) - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_bearing_difference_wraps() {
        assert_eq!(bearing_difference(350.0, 10.0), 20.0);
        assert_eq!(bearing_difference(10.0, 350.0), 20.0);
        assert_eq!(bearing_difference(90.0, 270.0), 180.0);
        assert!(is_antiparallel(90.0, 265.0, 20.0));
        assert!(is_antiparallel(10.0, 175.0, 20.0));
        assert!(!is_antiparallel(90.0, 180.0, 20.0));
    }

    #[test]
    fn test_nearest_point_perpendicular() {
        // Segment runs east along lat = -1 m, query point sits 1 m north of it
        let south = -1.0 / METERS_PER_DEGREE;
        let start = GeoPoint::new(south, 0.0);
        let end = GeoPoint::new(south, 200.0 / METERS_PER_DEGREE);
        let p = east_of_origin(50.0);

        let proj = nearest_point_on_segment(p, start, end);
        assert!((proj.distance - 1.0).abs() < 1e-6);
        assert!((proj.fraction - 0.25).abs() < 1e-6);
        assert!((proj.point.lat - south).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_point_clamps_to_endpoint() {
        let start = east_of_origin(100.0);
        let end = east_of_origin(200.0);
        let proj = nearest_point_on_segment(GeoPoint::new(0.0, 0.0), start, end);
        assert_eq!(proj.fraction, 0.0);
        assert!((proj.distance - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_point_degenerate_segment() {
        let start = east_of_origin(10.0);
        let proj = nearest_point_on_segment(GeoPoint::new(0.0, 0.0), start, start);
        assert!((proj.distance - 10.0).abs() < 1e-6);
    }
}
