//! GPX file loading utilities.

use std::path::Path;

use course::file_parsers::{parse_gpx, write_gpx};
use course::{Course, CourseError, GeoPoint, LapDetectionParams, Marker};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Course(#[from] CourseError),
}

/// Loads course geometry from GPX files.
pub struct GpxLoader;

impl GpxLoader {
    /// Loads the point sequence of a GPX file.
    ///
    /// Returns all points from all tracks and segments in the file,
    /// flattened into a single vector (route points if there are no tracks).
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<GeoPoint>, GpxError> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Loads the point sequence of GPX data in memory.
    pub fn load_bytes(data: &[u8]) -> Result<Vec<GeoPoint>, GpxError> {
        Ok(parse_gpx(data)?)
    }

    /// Loads a GPX file as a course.
    pub fn load_course(
        path: impl AsRef<Path>,
        params: LapDetectionParams,
    ) -> Result<Course, GpxError> {
        let path = path.as_ref();
        let points = Self::load_file(path)?;
        let course = Course::with_lap_detection(points, params)?;
        info!(
            path = %path.display(),
            points = course.point_count(),
            length_m = course.total_length(),
            laps = course.lap_count(),
            "Loaded course from GPX"
        );
        Ok(course)
    }

    /// Writes a point sequence and its markers to a GPX file.
    ///
    /// Useful for exporting generated courses for visualization in other tools.
    pub fn write_file(
        path: impl AsRef<Path>,
        points: &[GeoPoint],
        name: Option<&str>,
        markers: &[Marker],
    ) -> Result<(), GpxError> {
        let bytes = write_gpx(points, name, markers)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
