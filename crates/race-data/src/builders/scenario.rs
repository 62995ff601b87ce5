//! Fluent builder for constructing and running race scenarios.

use std::time::Instant;

use course::{
    Course, CourseError, CongestionStats, FinishRecord, GeoPoint, Hotspot, LapDetectionParams,
    ParticipantSnapshot, RunSummary, Simulation, SimulationConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, CourseShape, PaceProfile, ScenarioConfig};
use crate::profiles::{self, AthleteProfile, RunnerProfile, WalkerProfile};
use crate::sources::{GpxError, GpxLoader, ProceduralGenerator};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gpx(#[from] GpxError),
    #[error(transparent)]
    Course(#[from] CourseError),
}

/// Shape facts about the course a scenario ran on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub point_count: usize,
    pub total_length_m: f64,
    pub lap_count: usize,
    pub min_width_m: f64,
    pub max_width_m: f64,
    /// Where the course is narrowest.
    pub narrowest: GeoPoint,
}

impl CourseSummary {
    pub fn of(course: &Course) -> Self {
        let widths = course.course_width_info();
        Self {
            point_count: course.point_count(),
            total_length_m: course.total_length(),
            lap_count: course.lap_count(),
            min_width_m: widths.min.width,
            max_width_m: widths.max.width,
            narrowest: widths.min.position,
        }
    }
}

/// One generated participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entrant {
    pub id: u32,
    /// Seconds per kilometer.
    pub pace: f64,
    pub width: f64,
}

/// Result of building and running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub course: CourseSummary,
    pub course_points: Vec<GeoPoint>,
    pub entrants: Vec<Entrant>,
    pub run: RunSummary,
    pub finish_order: Vec<FinishRecord>,
    pub stats: CongestionStats,
    pub hotspots: Vec<Hotspot>,
    /// Final participant states.
    pub participants: Vec<ParticipantSnapshot>,
    /// Metrics from scenario generation (populated if metrics tracking enabled).
    pub metrics: Option<ScenarioMetrics>,
}

/// Performance metrics from a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioMetrics {
    /// Time spent building the course (milliseconds).
    pub course_time_ms: u64,
    /// Time spent simulating (milliseconds).
    pub simulation_time_ms: u64,
    pub participant_count: usize,
    pub ticks: u64,
}

/// Builder for creating complete race scenarios.
///
/// # Example
///
/// ```rust
/// use race_data::prelude::*;
///
/// let result = ScenarioBuilder::new()
///     .with_shape(CourseShape::Straight { length_m: 500.0 })
///     .with_participants(5)
///     .with_seed(7)
///     .build()?;
/// assert_eq!(result.finish_order.len(), 5);
/// # Ok::<(), race_data::builders::ScenarioError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    // Course configuration
    shape: CourseShape,
    origin: GeoPoint,
    lap_detection: LapDetectionParams,
    segment_widths: Vec<(usize, f64)>,

    // Field configuration
    participant_count: usize,
    pace_profile: PaceProfile,
    participant_width: Option<f64>,

    // Run configuration
    simulation: SimulationConfig,
    tick_jitter: f64,
    hotspot_limit: usize,

    // Misc
    seed: u64,
    track_metrics: bool,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    /// Creates a new scenario builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ScenarioConfig::default())
    }

    /// Creates a builder from a loaded configuration.
    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self {
            shape: config.course.clone(),
            origin: config.origin,
            lap_detection: config.lap_detection,
            segment_widths: config.segment_widths.clone(),
            participant_count: config.participant_count,
            pace_profile: config.pace_profile,
            participant_width: Some(config.participant_width_m),
            simulation: config.simulation,
            tick_jitter: config.tick_jitter,
            hotspot_limit: 5,
            seed: config.seed,
            track_metrics: false,
        }
    }

    pub fn with_shape(mut self, shape: CourseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets where procedural shapes start.
    pub fn with_origin(mut self, origin: GeoPoint) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_lap_detection(mut self, params: LapDetectionParams) -> Self {
        self.lap_detection = params;
        self
    }

    /// Pins the width of one course segment.
    pub fn with_segment_width(mut self, segment: usize, width: f64) -> Self {
        self.segment_widths.push((segment, width));
        self
    }

    /// Sets the number of participants to generate.
    pub fn with_participants(mut self, count: usize) -> Self {
        self.participant_count = count;
        self
    }

    pub fn with_pace_profile(mut self, profile: PaceProfile) -> Self {
        self.pace_profile = profile;
        self
    }

    /// Fixes every participant's width; `None` uses each profile's own.
    pub fn with_participant_width(mut self, width: Option<f64>) -> Self {
        self.participant_width = width;
        self
    }

    pub fn with_simulation(mut self, config: SimulationConfig) -> Self {
        self.simulation = config;
        self
    }

    /// Sets per-tick speed jitter (coefficient of variation, 0 disables).
    pub fn with_tick_jitter(mut self, jitter: f64) -> Self {
        self.tick_jitter = jitter;
        self
    }

    pub fn with_hotspot_limit(mut self, limit: usize) -> Self {
        self.hotspot_limit = limit;
        self
    }

    /// Sets the random seed for reproducible scenarios.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables timing metrics in the result.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.track_metrics = enabled;
        self
    }

    /// Builds the course, including any segment width overrides.
    pub fn build_course(&self, rng: &mut impl Rng) -> Result<Course, ScenarioError> {
        let mut course = match &self.shape {
            CourseShape::Gpx { path } => GpxLoader::load_course(path, self.lap_detection)?,
            shape => {
                let points = ProceduralGenerator::new(self.origin)
                    .generate(shape, rng)
                    .unwrap_or_default();
                Course::with_lap_detection(points, self.lap_detection)?
            }
        };

        for &(segment, width) in &self.segment_widths {
            course.set_segment_width(segment, width)?;
        }

        debug!(
            points = course.point_count(),
            length_m = course.total_length(),
            laps = course.lap_count(),
            overrides = self.segment_widths.len(),
            "Built scenario course"
        );
        Ok(course)
    }

    /// Generates the field: one pace and width per participant.
    pub fn build_entrants(&self, rng: &mut impl Rng) -> Vec<Entrant> {
        (0..self.participant_count)
            .map(|i| {
                let profile = self.profile_for(i);
                Entrant {
                    id: i as u32,
                    pace: profiles::sample_pace(profile.as_ref(), rng),
                    width: self.participant_width.unwrap_or_else(|| profile.width_m()),
                }
            })
            .collect()
    }

    /// Builds and runs the scenario with an RNG seeded from the builder's seed.
    pub fn build(&self) -> Result<ScenarioResult, ScenarioError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.build_with_rng(&mut rng)
    }

    /// Builds and runs the scenario.
    pub fn build_with_rng(&self, rng: &mut impl Rng) -> Result<ScenarioResult, ScenarioError> {
        if self.participant_count == 0 {
            return Err(ConfigError::Invalid("participant_count must be at least 1".to_string()).into());
        }

        let start_time = Instant::now();
        let course = self.build_course(rng)?;
        let course_time_ms = start_time.elapsed().as_millis() as u64;

        let entrants = self.build_entrants(rng);
        let mut sim = Simulation::new(&course, self.simulation)?;
        for entrant in &entrants {
            sim.add_participant(entrant.pace, entrant.width)?;
        }

        info!(
            participants = entrants.len(),
            length_m = course.total_length(),
            "Running scenario"
        );

        let sim_start = Instant::now();
        let run = if self.tick_jitter > 0.0 {
            self.run_with_jitter(&mut sim, rng)
        } else {
            sim.run(&[])
        };
        let simulation_time_ms = sim_start.elapsed().as_millis() as u64;

        info!(
            ticks = run.ticks,
            elapsed_s = run.elapsed_seconds,
            finished = sim.finish_order().len(),
            blocked_ticks = sim.stats().total_blocked_ticks(),
            overtakes = sim.stats().overtakes,
            "Scenario complete"
        );

        let metrics = self.track_metrics.then(|| ScenarioMetrics {
            course_time_ms,
            simulation_time_ms,
            participant_count: entrants.len(),
            ticks: run.ticks,
        });

        Ok(ScenarioResult {
            course: CourseSummary::of(&course),
            course_points: course.points(),
            finish_order: sim.finish_order().to_vec(),
            stats: sim.stats().clone(),
            hotspots: sim.hotspots(self.hotspot_limit),
            participants: sim.snapshot(),
            entrants,
            run,
            metrics,
        })
    }

    /// Ticks to completion with a fresh speed factor per participant per tick.
    fn run_with_jitter(&self, sim: &mut Simulation<'_>, rng: &mut impl Rng) -> RunSummary {
        let start_ticks = sim.ticks();
        let n = sim.participants().len();
        while !sim.all_finished() && sim.ticks() - start_ticks < self.simulation.max_ticks {
            let factors: Vec<f64> = (0..n)
                .map(|_| profiles::sample_factor(self.tick_jitter, rng))
                .collect();
            sim.tick(self.simulation.tick_seconds, &factors);
        }

        RunSummary {
            ticks: sim.ticks() - start_ticks,
            elapsed_seconds: sim.elapsed_seconds(),
            all_finished: sim.all_finished(),
        }
    }

    /// Gets the athletic profile for the `index`th participant.
    fn profile_for(&self, index: usize) -> Box<dyn AthleteProfile> {
        match self.pace_profile {
            PaceProfile::Runner { pace_min_per_km } => {
                Box::new(RunnerProfile::with_pace(pace_min_per_km))
            }
            PaceProfile::RecreationalRunner => Box::new(RunnerProfile::recreational()),
            PaceProfile::EliteRunner => Box::new(RunnerProfile::elite()),
            PaceProfile::Walker { speed_kmh } => Box::new(WalkerProfile::with_speed(speed_kmh)),
            PaceProfile::Mixed if index % 2 == 0 => Box::new(RunnerProfile::recreational()),
            PaceProfile::Mixed => Box::new(WalkerProfile::default()),
        }
    }
}

/// Preset scenarios for common congestion studies.
impl ScenarioBuilder {
    /// Looped course with a single-track side on every lap.
    ///
    /// - 3 laps of a 1 km square
    /// - The second side of each lap is pinned to 0.8 m
    /// - 60 recreational runners
    pub fn single_track_loop() -> Self {
        Self::new()
            .with_shape(CourseShape::Loop {
                lap_length_m: 1000.0,
                laps: 3,
            })
            .with_segment_width(1, 0.8)
            .with_segment_width(5, 0.8)
            .with_segment_width(9, 0.8)
            .with_participants(60)
            .with_pace_profile(PaceProfile::RecreationalRunner)
    }

    /// Out-and-back race on a path with both directions 3 m apart.
    pub fn out_and_back_race() -> Self {
        Self::new()
            .with_shape(CourseShape::OutAndBack {
                length_m: 2500.0,
                offset_m: 3.0,
            })
            .with_participants(100)
            .with_pace_profile(PaceProfile::Runner {
                pace_min_per_km: 5.0,
            })
    }

    /// Runners and walkers sharing a wandering trail.
    pub fn mixed_trail() -> Self {
        Self::new()
            .with_shape(CourseShape::RandomWalk {
                distance_m: 3000.0,
                region: crate::config::Region::BOULDER,
            })
            .with_participants(40)
            .with_pace_profile(PaceProfile::Mixed)
            .with_participant_width(None)
            .with_tick_jitter(0.05)
            .with_metrics(true)
    }
}
