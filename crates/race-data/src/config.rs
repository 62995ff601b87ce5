//! Configuration types for scenario generation.
//!
//! A [`ScenarioConfig`] is plain serde data: it can be loaded from a JSON
//! file and then selectively overridden from the environment.

use std::path::{Path, PathBuf};

use course::{GeoPoint, LapDetectionParams, SimulationConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the participant count.
pub const ENV_PARTICIPANTS: &str = "SIM_PARTICIPANTS";
/// Environment variable overriding the tick length in seconds.
pub const ENV_TICK_SECONDS: &str = "SIM_TICK_SECONDS";
/// Environment variable overriding the random seed.
pub const ENV_SEED: &str = "SIM_SEED";
/// Environment variable pointing at a GPX file to use as the course.
pub const ENV_GPX: &str = "SIM_GPX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value {value:?} for {name}")]
    InvalidOverride { name: &'static str, value: String },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (south)
    pub min_lat: f64,
    /// Minimum longitude (west)
    pub min_lon: f64,
    /// Maximum latitude (north)
    pub max_lat: f64,
    /// Maximum longitude (east)
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> GeoPoint {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        GeoPoint::new(lat, lon)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&p.lat)
            && (self.min_lon..=self.max_lon).contains(&p.lon)
    }
}

/// Pre-defined geographic regions for course generation.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Reno/Tahoe area - mountain trails.
    pub const RENO_TAHOE: BoundingBox = BoundingBox::new(39.0, -120.5, 39.6, -119.5);

    /// Boulder, CO area - popular running trails.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);
}

/// Geometry of the course a scenario runs on.
///
/// Lengths and offsets are in meters. Procedural shapes start at the
/// configured origin and head east.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CourseShape {
    /// Single straight line.
    Straight { length_m: f64 },
    /// Out along one line, back along a parallel line `offset_m` to the side.
    OutAndBack { length_m: f64, offset_m: f64 },
    /// Square lap repeated `laps` times, finishing where it started.
    Loop { lap_length_m: f64, laps: u32 },
    /// Legs in the same direction, each shifted `step_m` sideways from the last.
    ZigZag {
        leg_length_m: f64,
        legs: u32,
        step_m: f64,
    },
    /// Momentum random walk inside `region`.
    RandomWalk {
        distance_m: f64,
        region: BoundingBox,
    },
    /// Track or route read from a GPX file.
    Gpx { path: PathBuf },
}

impl Default for CourseShape {
    fn default() -> Self {
        Self::Loop {
            lap_length_m: 1000.0,
            laps: 3,
        }
    }
}

impl CourseShape {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };

        match self {
            Self::Straight { length_m } => positive("length_m", *length_m),
            Self::OutAndBack { length_m, offset_m } => {
                positive("length_m", *length_m)?;
                positive("offset_m", *offset_m)
            }
            Self::Loop { lap_length_m, laps } => {
                positive("lap_length_m", *lap_length_m)?;
                positive("laps", *laps as f64)
            }
            Self::ZigZag {
                leg_length_m,
                legs,
                step_m,
            } => {
                positive("leg_length_m", *leg_length_m)?;
                positive("legs", *legs as f64)?;
                positive("step_m", *step_m)
            }
            Self::RandomWalk { distance_m, .. } => positive("distance_m", *distance_m),
            Self::Gpx { .. } => Ok(()),
        }
    }
}

/// Which athlete profile participant paces are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaceProfile {
    /// Runners around the given pace in minutes per kilometer.
    Runner { pace_min_per_km: f64 },
    #[default]
    RecreationalRunner,
    EliteRunner,
    /// Walkers around the given speed in km/h.
    Walker { speed_kmh: f64 },
    /// Even mix of runners and walkers.
    Mixed,
}

/// Everything needed to build and run one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub course: CourseShape,
    /// Where procedural shapes start.
    pub origin: GeoPoint,
    pub participant_count: usize,
    pub pace_profile: PaceProfile,
    pub participant_width_m: f64,
    /// Per-tick speed jitter as a coefficient of variation; 0 disables it.
    pub tick_jitter: f64,
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub lap_detection: LapDetectionParams,
    /// Segment index -> width override in meters.
    pub segment_widths: Vec<(usize, f64)>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            course: CourseShape::default(),
            origin: Region::BOULDER.center(),
            participant_count: 50,
            pace_profile: PaceProfile::default(),
            participant_width_m: course::DEFAULT_PARTICIPANT_WIDTH_M,
            tick_jitter: 0.0,
            seed: 42,
            simulation: SimulationConfig::default(),
            lap_detection: LapDetectionParams::default(),
            segment_widths: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading scenario config");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Apply `SIM_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { name, value })
        }

        if let Some(v) = lookup(ENV_PARTICIPANTS) {
            self.participant_count = parse(ENV_PARTICIPANTS, v)?;
        }
        if let Some(v) = lookup(ENV_TICK_SECONDS) {
            self.simulation.tick_seconds = parse(ENV_TICK_SECONDS, v)?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            self.seed = parse(ENV_SEED, v)?;
        }
        if let Some(v) = lookup(ENV_GPX).filter(|v| !v.trim().is_empty()) {
            self.course = CourseShape::Gpx {
                path: PathBuf::from(v.trim()),
            };
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.course.validate()?;
        if !self.origin.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "origin {:?} is not a valid coordinate",
                self.origin
            )));
        }
        if self.participant_count == 0 {
            return Err(ConfigError::Invalid(
                "participant_count must be at least 1".to_string(),
            ));
        }
        if !self.participant_width_m.is_finite() || self.participant_width_m <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "participant_width_m must be positive, got {}",
                self.participant_width_m
            )));
        }
        if !self.tick_jitter.is_finite() || self.tick_jitter < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tick_jitter must not be negative, got {}",
                self.tick_jitter
            )));
        }
        self.simulation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.lap_detection
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
