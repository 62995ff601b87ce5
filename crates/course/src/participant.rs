//! Participant - a single simulated entrant moving along a course.

use serde::Serialize;

use crate::course::Course;
use crate::errors::{CourseError, Result};
use crate::models::GeoPoint;

/// Default lateral footprint of a participant in meters.
pub const DEFAULT_PARTICIPANT_WIDTH_M: f64 = 0.5;

/// State of one entrant. Borrows the course it runs on; geometry is never copied.
#[derive(Debug, Clone)]
pub struct ParticipantState<'c> {
    id: u32,
    /// Seconds per kilometer
    pace: f64,
    /// Lateral footprint in meters
    width: f64,
    cumulative_distance: f64,
    course: &'c Course,
}

impl<'c> ParticipantState<'c> {
    pub fn new(id: u32, course: &'c Course, pace: f64, width: f64) -> Result<Self> {
        if !pace.is_finite() || pace <= 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "pace must be positive seconds per km, got {pace}"
            )));
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "participant width must be positive, got {width}"
            )));
        }

        Ok(Self {
            id,
            pace,
            width,
            cumulative_distance: 0.0,
            course,
        })
    }

    /// Participant with the default 0.5 m footprint.
    pub fn with_pace(id: u32, course: &'c Course, pace: f64) -> Result<Self> {
        Self::new(id, course, pace, DEFAULT_PARTICIPANT_WIDTH_M)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pace(&self) -> f64 {
        self.pace
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn course(&self) -> &'c Course {
        self.course
    }

    /// Speed in meters per second implied by the pace.
    pub fn speed_mps(&self) -> f64 {
        1000.0 / self.pace
    }

    /// Distance covered over `seconds` at this pace, scaled by `factor`.
    pub fn distance_for(&self, seconds: f64, factor: f64) -> f64 {
        (seconds / self.pace) * 1000.0 * factor
    }

    pub fn cumulative_distance(&self) -> f64 {
        self.cumulative_distance
    }

    pub fn position(&self) -> GeoPoint {
        self.course.position_at_distance(self.cumulative_distance)
    }

    pub fn lap_index(&self) -> usize {
        self.course.lap_index_at_distance(self.cumulative_distance)
    }

    pub fn finished(&self) -> bool {
        self.cumulative_distance >= self.course.total_length()
    }

    pub fn reset(&mut self) {
        self.cumulative_distance = 0.0;
    }

    /// Set the distance travelled, clamped to the course.
    pub fn set_cumulative_distance(&mut self, d: f64) {
        self.cumulative_distance = if d.is_nan() {
            0.0
        } else {
            d.clamp(0.0, self.course.total_length())
        };
    }

    /// Advance by `meters` (negative values are ignored); returns the distance actually moved.
    pub fn move_by(&mut self, meters: f64) -> f64 {
        let before = self.cumulative_distance;
        self.set_cumulative_distance(before + meters.max(0.0));
        self.cumulative_distance - before
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id,
            distance: self.cumulative_distance,
            position: self.position(),
            lap: self.lap_index(),
            finished: self.finished(),
        }
    }
}

/// Plain copy of a participant's observable state, for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSnapshot {
    pub id: u32,
    pub distance: f64,
    pub position: GeoPoint,
    pub lap: usize,
    pub finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_math::METERS_PER_DEGREE;

    fn course(len: f64) -> Course {
        Course::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, len / METERS_PER_DEGREE),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let c = course(100.0);
        assert!(ParticipantState::new(1, &c, 0.0, 0.5).is_err());
        assert!(ParticipantState::new(1, &c, 300.0, -0.5).is_err());
        assert!(ParticipantState::new(1, &c, f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_defaults() {
        let c = course(100.0);
        let p = ParticipantState::with_pace(7, &c, 300.0).unwrap();
        assert_eq!(p.id(), 7);
        assert_eq!(p.width(), DEFAULT_PARTICIPANT_WIDTH_M);
        assert_eq!(p.cumulative_distance(), 0.0);
        assert_eq!(p.position(), c.start());
        assert_eq!(p.lap_index(), 1);
        assert!(!p.finished());
    }

    #[test]
    fn test_distance_for_pace() {
        let c = course(100.0);
        // 5:00/km covers 1000 m in 300 s
        let p = ParticipantState::with_pace(1, &c, 300.0).unwrap();
        assert!((p.distance_for(300.0, 1.0) - 1000.0).abs() < 1e-9);
        assert!((p.distance_for(3.0, 0.5) - 5.0).abs() < 1e-9);
        assert!((p.speed_mps() - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_clamps_to_course() {
        let c = course(100.0);
        let mut p = ParticipantState::with_pace(1, &c, 300.0).unwrap();
        assert_eq!(p.move_by(40.0), 40.0);
        let moved = p.move_by(500.0);
        assert!((moved - (c.total_length() - 40.0)).abs() < 1e-9);
        assert!(p.finished());
        assert_eq!(p.position(), c.finish());
        assert_eq!(p.move_by(10.0), 0.0);
    }

    #[test]
    fn test_set_distance_and_reset() {
        let c = course(100.0);
        let mut p = ParticipantState::with_pace(1, &c, 300.0).unwrap();
        p.set_cumulative_distance(-10.0);
        assert_eq!(p.cumulative_distance(), 0.0);
        p.set_cumulative_distance(60.0);
        assert_eq!(p.snapshot().distance, 60.0);
        p.reset();
        assert_eq!(p.cumulative_distance(), 0.0);
    }
}
