use serde::{Deserialize, Serialize};

use crate::errors::{CourseError, Result};

/// Latitude in degrees, validated to lie within [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Latitude(f64);

impl Latitude {
    pub fn new(degrees: f64) -> Option<Self> {
        (degrees.is_finite() && (-90.0..=90.0).contains(&degrees)).then_some(Self(degrees))
    }

    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Latitude {
    type Error = CourseError;

    fn try_from(degrees: f64) -> Result<Self> {
        Self::new(degrees).ok_or(CourseError::InvalidPoint {
            lat: degrees,
            lon: 0.0,
        })
    }
}

impl From<Latitude> for f64 {
    fn from(lat: Latitude) -> f64 {
        lat.0
    }
}

/// Longitude in degrees, validated to lie within [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Longitude(f64);

impl Longitude {
    pub fn new(degrees: f64) -> Option<Self> {
        (degrees.is_finite() && (-180.0..=180.0).contains(&degrees)).then_some(Self(degrees))
    }

    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Longitude {
    type Error = CourseError;

    fn try_from(degrees: f64) -> Result<Self> {
        Self::new(degrees).ok_or(CourseError::InvalidPoint {
            lat: 0.0,
            lon: degrees,
        })
    }
}

impl From<Longitude> for f64 {
    fn from(lon: Longitude) -> f64 {
        lon.0
    }
}

/// A WGS84 coordinate in degrees.
///
/// Construction is unchecked so that raw importer output can be carried
/// around; [`GeoPoint::validated`] and the course mutation API reject
/// anything outside the valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point from already-validated coordinate newtypes.
    pub fn from_parts(lat: Latitude, lon: Longitude) -> Self {
        Self {
            lat: lat.degrees(),
            lon: lon.degrees(),
        }
    }

    pub fn validated(lat: f64, lon: f64) -> Result<Self> {
        let point = Self::new(lat, lon);
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<()> {
        match (Latitude::new(self.lat), Longitude::new(self.lon)) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(CourseError::InvalidPoint {
                lat: self.lat,
                lon: self.lon,
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.lon, p.lat)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        GeoPoint::new(p.y(), p.x())
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        GeoPoint::new(lat, lon)
    }
}

/// Parameters controlling lap crossing detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapDetectionParams {
    /// Sampling interval along the course in meters.
    pub step_meters: f64,
    /// Maximum heading difference from the start bearing, in degrees.
    pub bearing_tolerance_deg: f64,
    /// Maximum distance from the start point for a sample to count.
    pub crossing_tolerance_meters: f64,
}

impl Default for LapDetectionParams {
    fn default() -> Self {
        Self {
            step_meters: 10.0,
            bearing_tolerance_deg: 45.0,
            crossing_tolerance_meters: 20.0,
        }
    }
}

impl LapDetectionParams {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("step_meters", self.step_meters),
            ("bearing_tolerance_deg", self.bearing_tolerance_deg),
            ("crossing_tolerance_meters", self.crossing_tolerance_meters),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(CourseError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A width reading together with where on the course it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthSample {
    pub distance: f64,
    pub width: f64,
    pub position: GeoPoint,
}

/// Narrowest and widest points of a course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseWidthInfo {
    pub min: WidthSample,
    pub max: WidthSample,
}

/// Bounding box of a course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(points.iter().fold(init, |b, p| Self {
            min_lat: b.min_lat.min(p.lat),
            max_lat: b.max_lat.max(p.lat),
            min_lon: b.min_lon.min(p.lon),
            max_lon: b.max_lon.max(p.lon),
        }))
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}
