//! Scenario generation for course congestion studies.
//!
//! This crate provides procedural and GPX-sourced courses, pace profiles for
//! generating a field of participants, and a builder that runs the tick
//! engine from the `course` crate to completion.
//!
//! # Quick Start
//!
//! ```rust
//! use race_data::prelude::*;
//!
//! let result = ScenarioBuilder::new()
//!     .with_shape(CourseShape::OutAndBack { length_m: 400.0, offset_m: 1.0 })
//!     .with_participants(6)
//!     .with_pace_profile(PaceProfile::Runner { pace_min_per_km: 5.0 })
//!     .build()?;
//!
//! assert!(result.run.all_finished);
//! assert_eq!(result.course.min_width_m, 1.0);
//! # Ok::<(), race_data::builders::ScenarioError>(())
//! ```

pub mod builders;
pub mod config;
pub mod profiles;
pub mod sources;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::builders::{ScenarioBuilder, ScenarioError, ScenarioMetrics, ScenarioResult};
    pub use crate::config::{
        BoundingBox, ConfigError, CourseShape, PaceProfile, Region, ScenarioConfig,
    };
    pub use crate::profiles::{
        AthleteProfile, RunnerProfile, WalkerProfile, sample_pace, sample_variance,
    };
    pub use crate::sources::{GpxError, GpxLoader, ProceduralGenerator};
    pub use course::{Course, GeoPoint, Marker, SimulationConfig};
}
