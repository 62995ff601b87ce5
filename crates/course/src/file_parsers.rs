//! GPX import/export for course geometry.
//!
//! Only coordinates cross this boundary: elevation, timestamps and sensor
//! extensions are ignored on import and never written on export.

use std::io::Cursor;

use geo::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use tracing::warn;

use crate::course::Course;
use crate::errors::{CourseError, Result};
use crate::models::{GeoPoint, LapDetectionParams};

/// Extract the point sequence of a GPX document.
///
/// Track points from every track and segment are concatenated in file
/// order; when the file has no tracks, route points are used instead.
pub fn parse_gpx(bytes: &[u8]) -> Result<Vec<GeoPoint>> {
    let gpx = gpx::read(Cursor::new(bytes)).map_err(|e| CourseError::GpxParsing(e.to_string()))?;

    let mut points: Vec<GeoPoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|seg| &seg.points)
        .map(|wpt| GeoPoint::from(wpt.point()))
        .collect();

    if points.is_empty() {
        points = gpx
            .routes
            .iter()
            .flat_map(|route| &route.points)
            .map(|wpt| GeoPoint::from(wpt.point()))
            .collect();
    }

    if points.is_empty() {
        return Err(CourseError::GpxParsing(
            "No track or route points found in GPX file".to_string(),
        ));
    }

    let before = points.len();
    points.retain(GeoPoint::is_valid);
    if points.len() < before {
        warn!(
            dropped = before - points.len(),
            "Ignoring GPX points with out-of-range coordinates"
        );
    }

    Ok(points)
}

/// Parse a GPX document straight into a course.
pub fn course_from_gpx(bytes: &[u8], params: Option<LapDetectionParams>) -> Result<Course> {
    let points = parse_gpx(bytes)?;
    Course::with_lap_detection(points, params.unwrap_or_default())
}

/// A named waypoint written alongside the course track, e.g. a congestion hotspot.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: GeoPoint,
    pub name: String,
}

impl Marker {
    pub fn new(position: GeoPoint, name: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
        }
    }
}

fn to_waypoint(p: GeoPoint) -> Waypoint {
    Waypoint::new(Point::new(p.lon, p.lat))
}

/// Serialise a point sequence as a single-track GPX 1.1 document, with one
/// waypoint per marker.
pub fn write_gpx(points: &[GeoPoint], name: Option<&str>, markers: &[Marker]) -> Result<Vec<u8>> {
    let mut track = Track::new();
    track.name = name.map(String::from);
    track.segments = vec![TrackSegment {
        points: points.iter().copied().map(to_waypoint).collect(),
    }];

    let waypoints = markers
        .iter()
        .map(|m| {
            let mut wpt = to_waypoint(m.position);
            wpt.name = Some(m.name.clone());
            wpt
        })
        .collect();

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("course-sim".to_string()),
        waypoints,
        tracks: vec![track],
        ..Default::default()
    };

    let mut out = Vec::new();
    gpx::write(&gpx, &mut out).map_err(|e| CourseError::GpxParsing(e.to_string()))?;
    Ok(out)
}
