//! # Course
//!
//! Geometry engine and participant simulation for race course congestion.
//!
//! - [`Course`]: arc-length parameterised polyline with width inference,
//!   per-segment width overrides and lap detection
//! - [`ParticipantState`]: one entrant moving along a borrowed course
//! - [`Simulation`]: tick engine enforcing no-collision / overtake-if-wide-enough
//! - [`geo_math`]: haversine distance, bearing, destination and segment projection
//!
//! ```rust
//! use course::{Course, GeoPoint, Simulation, SimulationConfig};
//!
//! let course = Course::new(vec![
//!     GeoPoint::new(51.5000, -0.1200),
//!     GeoPoint::new(51.5045, -0.1200),
//! ])?;
//! assert_eq!(course.width_at(100.0), 2.0);
//!
//! let mut sim = Simulation::new(&course, SimulationConfig::default())?;
//! sim.add_participant(300.0, 0.5)?;
//! sim.tick(60.0, &[]);
//! assert!((sim.participants()[0].cumulative_distance() - 200.0).abs() < 1e-6);
//! # Ok::<(), course::CourseError>(())
//! ```

pub mod course;
pub mod errors;
pub mod file_parsers;
pub mod geo_math;
pub mod models;
pub mod participant;
pub mod simulation;

pub use course::{
    ANTIPARALLEL_TOLERANCE_DEG, Course, DEFAULT_WIDTH_M, MAX_WIDTH_M, PARALLEL_SEARCH_RADIUS_M,
    WIDTH_SAMPLE_INTERVAL_M,
};
pub use errors::{CourseError, Result};
pub use file_parsers::Marker;
pub use models::{
    Bounds, CourseWidthInfo, GeoPoint, LapDetectionParams, Latitude, Longitude, WidthSample,
};
pub use participant::{DEFAULT_PARTICIPANT_WIDTH_M, ParticipantSnapshot, ParticipantState};
pub use simulation::{
    BlockEvent, CongestionStats, FinishRecord, Hotspot, Movement, OvertakeEvent, RunSummary,
    Simulation, SimulationConfig, TickReport,
};
