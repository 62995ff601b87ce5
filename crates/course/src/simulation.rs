//! Simulation - tick engine advancing participants along a course.
//!
//! Each tick orders the field by distance travelled, then moves participants
//! front to back. A follower that would reach the participant ahead of it may
//! only carry on past if the course is wide enough for both side by side at
//! that point; otherwise it tucks in behind with a small following gap.
//! Eligibility is evaluated afresh on every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::course::Course;
use crate::errors::{CourseError, Result};
use crate::models::GeoPoint;
use crate::participant::{ParticipantSnapshot, ParticipantState};

/// Simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated seconds per tick.
    pub tick_seconds: f64,
    /// Spacing a blocked follower keeps behind its leader, in meters.
    pub following_gap_m: f64,
    /// Upper bound on ticks for [`Simulation::run`].
    pub max_ticks: u64,
    /// Bucket size for the congestion histogram, in meters.
    pub congestion_bucket_m: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0,
            following_gap_m: 0.1,
            max_ticks: 100_000,
            congestion_bucket_m: 100.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "tick_seconds must be positive, got {}",
                self.tick_seconds
            )));
        }
        if !self.following_gap_m.is_finite() || self.following_gap_m < 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "following_gap_m must not be negative, got {}",
                self.following_gap_m
            )));
        }
        if !self.congestion_bucket_m.is_finite() || self.congestion_bucket_m <= 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "congestion_bucket_m must be positive, got {}",
                self.congestion_bucket_m
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub id: u32,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockEvent {
    pub follower: u32,
    pub leader: u32,
    /// Leader's distance where the pass was refused.
    pub distance: f64,
    pub width_available: f64,
    pub width_needed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OvertakeEvent {
    pub overtaker: u32,
    pub overtaken: u32,
    pub distance: f64,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub movements: Vec<Movement>,
    pub blocked: Vec<BlockEvent>,
    pub overtakes: Vec<OvertakeEvent>,
    pub finished_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishRecord {
    pub id: u32,
    pub finish_time: f64,
    pub position: u32,
}

/// A stretch of course where followers were held up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub start_distance: f64,
    pub end_distance: f64,
    pub blocked_ticks: u64,
    pub position: GeoPoint,
}

/// Blocking counts accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CongestionStats {
    /// Participant id -> ticks spent blocked.
    pub blocked_ticks: BTreeMap<u32, u64>,
    /// Bucket index -> blocked participant-ticks in that stretch.
    pub blocked_by_bucket: BTreeMap<u64, u64>,
    pub overtakes: u64,
}

impl CongestionStats {
    fn record_block(&mut self, id: u32, distance: f64, bucket_m: f64) {
        *self.blocked_ticks.entry(id).or_default() += 1;
        let bucket = (distance.max(0.0) / bucket_m).floor() as u64;
        *self.blocked_by_bucket.entry(bucket).or_default() += 1;
    }

    pub fn total_blocked_ticks(&self) -> u64 {
        self.blocked_ticks.values().sum()
    }
}

/// Summary of a run to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed_seconds: f64,
    pub all_finished: bool,
}

pub struct Simulation<'c> {
    course: &'c Course,
    config: SimulationConfig,
    participants: Vec<ParticipantState<'c>>,
    elapsed_seconds: f64,
    ticks: u64,
    finish_order: Vec<FinishRecord>,
    stats: CongestionStats,
}

impl<'c> Simulation<'c> {
    pub fn new(course: &'c Course, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            course,
            config,
            participants: Vec::new(),
            elapsed_seconds: 0.0,
            ticks: 0,
            finish_order: Vec::new(),
            stats: CongestionStats::default(),
        })
    }

    /// Add a participant; ids follow input order.
    pub fn add_participant(&mut self, pace: f64, width: f64) -> Result<u32> {
        let id = self.participants.len() as u32;
        self.participants
            .push(ParticipantState::new(id, self.course, pace, width)?);
        Ok(id)
    }

    pub fn course(&self) -> &'c Course {
        self.course
    }

    pub fn config(&self) -> SimulationConfig {
        self.config
    }

    pub fn participants(&self) -> &[ParticipantState<'c>] {
        &self.participants
    }

    pub fn participant(&self, id: u32) -> Option<&ParticipantState<'c>> {
        self.participants.get(id as usize)
    }

    /// Place a participant directly, e.g. to stage a scenario.
    pub fn set_cumulative_distance(&mut self, id: u32, d: f64) -> Result<()> {
        let len = self.participants.len();
        let p = self
            .participants
            .get_mut(id as usize)
            .ok_or_else(|| CourseError::index(id as usize, len, "no such participant"))?;
        p.set_cumulative_distance(d);
        Ok(())
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn finish_order(&self) -> &[FinishRecord] {
        &self.finish_order
    }

    pub fn stats(&self) -> &CongestionStats {
        &self.stats
    }

    pub fn all_finished(&self) -> bool {
        self.participants.iter().all(|p| p.finished())
    }

    pub fn snapshot(&self) -> Vec<ParticipantSnapshot> {
        self.participants.iter().map(|p| p.snapshot()).collect()
    }

    pub fn reset(&mut self) {
        for p in &mut self.participants {
            p.reset();
        }
        self.elapsed_seconds = 0.0;
        self.ticks = 0;
        self.finish_order.clear();
        self.stats = CongestionStats::default();
    }

    /// Indices leader first; equal distances keep input order.
    fn running_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.participants.len()).collect();
        order.sort_by(|&a, &b| {
            let da = self.participants[a].cumulative_distance();
            let db = self.participants[b].cumulative_distance();
            db.total_cmp(&da)
        });
        order
    }

    /// Advance every unfinished participant by `duration_seconds`.
    ///
    /// `external_factors[i]` scales participant `i`'s speed; missing or
    /// invalid entries count as 1.0.
    pub fn tick(&mut self, duration_seconds: f64, external_factors: &[f64]) -> TickReport {
        let duration = duration_seconds.max(0.0);
        let total = self.course.total_length();
        let gap = self.config.following_gap_m;
        let order = self.running_order();

        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };
        let mut finishers = Vec::new();

        // Unfinished participants already moved this tick, by distance.
        // Equal distances keep processing order.
        let mut committed: Vec<(f64, usize)> = Vec::with_capacity(order.len());

        for &idx in &order {
            let follower = &self.participants[idx];
            if follower.finished() {
                continue;
            }

            let factor = external_factors
                .get(idx)
                .copied()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .unwrap_or(1.0);
            let current = follower.cumulative_distance();
            let proposed = (current + follower.distance_for(duration, factor)).min(total);
            let mut target = proposed;

            // Those ahead, nearest first, at their already-committed positions
            let first_ahead = committed.partition_point(|&(d, _)| d < current);
            let mut passed = Vec::new();
            for &(leader_d, a) in &committed[first_ahead..] {
                let leader = &self.participants[a];
                if target <= leader_d - gap {
                    break;
                }

                let needed = follower.width() + leader.width();
                let available = self.course.width_at(leader_d);
                if available >= needed {
                    if target > leader_d {
                        passed.push((leader.id(), leader_d));
                    }
                    continue;
                }

                trace!(
                    follower = follower.id(),
                    leader = leader.id(),
                    distance = leader_d,
                    available,
                    needed,
                    "Overtake refused"
                );
                target = (leader_d - gap).max(current);
                report.blocked.push(BlockEvent {
                    follower: follower.id(),
                    leader: leader.id(),
                    distance: leader_d,
                    width_available: available,
                    width_needed: needed,
                });
                passed.retain(|&(_, d)| d < target);
                break;
            }

            let id = follower.id();
            let step = proposed - current;
            let p = &mut self.participants[idx];
            p.set_cumulative_distance(target);
            let to = p.cumulative_distance();

            if report.blocked.last().is_some_and(|b| b.follower == id) {
                self.stats
                    .record_block(id, to, self.config.congestion_bucket_m);
            }
            for (overtaken, distance) in passed {
                self.stats.overtakes += 1;
                report.overtakes.push(OvertakeEvent {
                    overtaker: id,
                    overtaken,
                    distance,
                });
            }
            report.movements.push(Movement {
                id,
                from: current,
                to,
            });
            if to < total {
                let at = committed.partition_point(|&(d, _)| d <= to);
                committed.insert(at, (to, idx));
            }

            if to >= total {
                let fraction = if step > 0.0 {
                    ((total - current) / step).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                finishers.push((id, self.elapsed_seconds + duration * fraction));
            }
        }

        // Same-tick finishers rank by when they crossed the line
        finishers.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (id, finish_time) in finishers {
            let position = self.finish_order.len() as u32 + 1;
            debug!(id, finish_time, position, "Participant finished");
            self.finish_order.push(FinishRecord {
                id,
                finish_time,
                position,
            });
        }

        self.elapsed_seconds += duration;
        report.elapsed_seconds = self.elapsed_seconds;
        report.finished_count = self.participants.iter().filter(|p| p.finished()).count();
        report
    }

    /// Tick by `duration_seconds` until everyone finishes or `max_ticks` elapse.
    pub fn run_until_finished(&mut self, duration_seconds: f64, max_ticks: u64) -> RunSummary {
        self.run_ticks(duration_seconds, max_ticks, &[])
    }

    /// [`Self::run_until_finished`] with the configured tick length and limit.
    pub fn run(&mut self, external_factors: &[f64]) -> RunSummary {
        self.run_ticks(self.config.tick_seconds, self.config.max_ticks, external_factors)
    }

    fn run_ticks(
        &mut self,
        duration_seconds: f64,
        max_ticks: u64,
        external_factors: &[f64],
    ) -> RunSummary {
        let start_ticks = self.ticks;
        while !self.all_finished() && self.ticks - start_ticks < max_ticks {
            self.tick(duration_seconds, external_factors);
        }

        let summary = RunSummary {
            ticks: self.ticks - start_ticks,
            elapsed_seconds: self.elapsed_seconds,
            all_finished: self.all_finished(),
        };
        debug!(
            ticks = summary.ticks,
            elapsed = summary.elapsed_seconds,
            all_finished = summary.all_finished,
            "Run complete"
        );
        summary
    }

    /// Most congested stretches, worst first.
    pub fn hotspots(&self, limit: usize) -> Vec<Hotspot> {
        let bucket_m = self.config.congestion_bucket_m;
        let mut buckets: Vec<(u64, u64)> = self
            .stats
            .blocked_by_bucket
            .iter()
            .map(|(&b, &n)| (b, n))
            .collect();
        buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        buckets
            .into_iter()
            .take(limit)
            .map(|(bucket, blocked_ticks)| {
                let start_distance = bucket as f64 * bucket_m;
                let end_distance = (start_distance + bucket_m).min(self.course.total_length());
                Hotspot {
                    start_distance,
                    end_distance,
                    blocked_ticks,
                    position: self
                        .course
                        .position_at_distance((start_distance + end_distance) / 2.0),
                }
            })
            .collect()
    }

    /// The single most congested stretch so far.
    pub fn worst_congestion(&self) -> Option<Hotspot> {
        self.hotspots(1).into_iter().next()
    }
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
    fn test_config_validation() {
        assert!(SimulationConfig::default().validate().is_ok());
        let bad = SimulationConfig {
            tick_seconds: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"tick_seconds": 2.0}"#).unwrap();
        assert_eq!(config.tick_seconds, 2.0);
        assert_eq!(config.following_gap_m, SimulationConfig::default().following_gap_m);
    }

    #[test]
    fn test_single_participant_advances_by_pace() {
        let c = course(1000.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(300.0, 0.5).unwrap();

        let report = sim.tick(30.0, &[]);
        assert!((sim.participants()[0].cumulative_distance() - 100.0).abs() < 1e-9);
        assert_eq!(report.movements.len(), 1);
        assert_eq!(report.elapsed_seconds, 30.0);
    }

    #[test]
    fn test_external_factor_scales_advance() {
        let c = course(1000.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(300.0, 0.5).unwrap();
        sim.add_participant(300.0, 0.5).unwrap();
        sim.set_cumulative_distance(1, 500.0).unwrap();

        sim.tick(30.0, &[0.5, f64::NAN]);
        assert!((sim.participants()[0].cumulative_distance() - 50.0).abs() < 1e-9);
        assert!((sim.participants()[1].cumulative_distance() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_clamps_and_records() {
        let c = course(100.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(300.0, 0.5).unwrap();

        let summary = sim.run(&[]);
        assert!(summary.all_finished);
        assert_eq!(sim.participants()[0].cumulative_distance(), c.total_length());
        assert_eq!(sim.finish_order().len(), 1);
        // 100 m at 5:00/km is 30 s
        assert!((sim.finish_order()[0].finish_time - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_same_tick_finishers_ranked_by_time() {
        let c = course(100.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(600.0, 0.5).unwrap();
        sim.add_participant(100.0, 0.5).unwrap();
        sim.set_cumulative_distance(0, 95.0).unwrap();
        sim.set_cumulative_distance(1, 90.0).unwrap();

        sim.tick(5.0, &[]);
        let order = sim.finish_order();
        assert_eq!(order.len(), 2);
        assert_eq!((order[0].id, order[0].position), (1, 1));
        assert_eq!((order[1].id, order[1].position), (0, 2));
        assert!(order[0].finish_time < order[1].finish_time);
    }

    #[test]
    fn test_tied_start_keeps_input_order() {
        let c = course(1000.0);
        assert_eq!(c.width_at(0.0), crate::course::DEFAULT_WIDTH_M);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(300.0, 1.5).unwrap();
        sim.add_participant(200.0, 1.5).unwrap();

        // Default width 2 m < 3 m needed: the faster second starter stays behind
        let report = sim.tick(3.0, &[]);
        assert_eq!(report.blocked.len(), 1);
        assert_eq!(report.blocked[0].follower, 1);
        assert!(
            sim.participants()[1].cumulative_distance()
                <= sim.participants()[0].cumulative_distance()
        );
    }

    #[test]
    fn test_long_queue_keeps_running_order() {
        let c = course(1000.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        // Slowest at the front, each one behind a little quicker
        for i in 0..40u32 {
            let id = sim.add_participant(600.0 - 10.0 * i as f64, 1.5).unwrap();
            sim.set_cumulative_distance(id, 400.0 - 5.0 * i as f64).unwrap();
        }

        for _ in 0..20 {
            sim.tick(5.0, &[]);
            let d: Vec<f64> = sim
                .participants()
                .iter()
                .map(|p| p.cumulative_distance())
                .collect();
            assert!(d.windows(2).all(|w| w[1] < w[0]), "order broken: {d:?}");
        }
        assert_eq!(sim.stats().overtakes, 0);
        assert!(sim.stats().total_blocked_ticks() > 0);
    }

    #[test]
    fn test_leader_not_blocked_by_follower() {
        let c = course(1000.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(600.0, 1.5).unwrap();
        sim.add_participant(200.0, 1.5).unwrap();
        sim.set_cumulative_distance(1, 10.0).unwrap();

        sim.tick(10.0, &[]);
        // Participant 1 is ahead and fast; participant 0 is slow behind it
        assert!((sim.participants()[1].cumulative_distance() - 60.0).abs() < 1e-9);
        assert!(sim.stats().blocked_ticks.is_empty());
    }

    #[test]
    fn test_reset_clears_state() {
        let c = course(100.0);
        let mut sim = Simulation::new(&c, SimulationConfig::default()).unwrap();
        sim.add_participant(300.0, 0.5).unwrap();
        sim.run(&[]);
        sim.reset();
        assert_eq!(sim.ticks(), 0);
        assert!(sim.finish_order().is_empty());
        assert_eq!(sim.participants()[0].cumulative_distance(), 0.0);
    }
}
