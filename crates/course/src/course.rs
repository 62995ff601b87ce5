//! Course geometry: arc-length parameterisation, width inference and lap detection.
//!
//! A [`Course`] owns its point buffer and every structure derived from it.
//! All structural changes go through one rebuild path that computes the new
//! geometry, caches and lap crossings before anything is committed, so a
//! failed mutation leaves the course exactly as it was.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::errors::{CourseError, Result};
use crate::geo_math;
use crate::models::{Bounds, CourseWidthInfo, GeoPoint, LapDetectionParams, WidthSample};

/// Width used wherever no parallel leg of the course is close enough.
pub const DEFAULT_WIDTH_M: f64 = 2.0;
/// Widest corridor that is inferred from a returning leg.
pub const MAX_WIDTH_M: f64 = 4.0;
/// Spacing of the width cache grid.
pub const WIDTH_SAMPLE_INTERVAL_M: f64 = 10.0;
/// How far along the course (either way) to look for a returning leg.
pub const PARALLEL_SEARCH_RADIUS_M: f64 = 1000.0;
/// Allowed deviation from an exactly reversed heading.
pub const ANTIPARALLEL_TOLERANCE_DEG: f64 = 20.0;

/// Float slack on the maximum inferred width.
const MAX_WIDTH_ALLOWANCE: f64 = 1.01;
/// Slack on strict distance checks, absorbs rounding in the summed lengths.
const DISTANCE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct Course {
    points: Vec<GeoPoint>,
    cumulative_distances: Vec<f64>,
    segment_bearings: Vec<f64>,
    total_length: f64,
    width_cache: RefCell<BTreeMap<u64, f64>>,
    /// Segment of the most recent lookup; queries mostly walk forward.
    segment_cache: Cell<usize>,
    segment_width_overrides: BTreeMap<usize, f64>,
    lap_crossings: Vec<f64>,
    lap_detection_params: LapDetectionParams,
}

impl Course {
    /// Build a course with default lap detection parameters.
    pub fn new(points: impl Into<Vec<GeoPoint>>) -> Result<Self> {
        Self::with_lap_detection(points, LapDetectionParams::default())
    }

    pub fn with_lap_detection(
        points: impl Into<Vec<GeoPoint>>,
        params: LapDetectionParams,
    ) -> Result<Self> {
        params.validate()?;
        let points = points.into();
        for p in &points {
            p.validate()?;
        }
        Self::build(points, params)
    }

    /// Single construction path for every geometry change.
    fn build(mut points: Vec<GeoPoint>, params: LapDetectionParams) -> Result<Self> {
        let raw_len = points.len();
        points.dedup();
        if points.len() < raw_len {
            debug!(
                removed = raw_len - points.len(),
                "Dropped consecutive duplicate points"
            );
        }

        if points.len() < 2 {
            return Err(CourseError::InvalidCourse(format!(
                "need at least 2 distinct points, got {}",
                points.len()
            )));
        }

        let mut cumulative_distances = Vec::with_capacity(points.len());
        let mut segment_bearings = Vec::with_capacity(points.len() - 1);
        let mut total = 0.0;
        cumulative_distances.push(0.0);
        for pair in points.windows(2) {
            total += geo_math::distance(pair[0], pair[1]);
            cumulative_distances.push(total);
            segment_bearings.push(geo_math::bearing(pair[0], pair[1]));
        }

        if total <= 0.0 {
            return Err(CourseError::InvalidCourse(
                "course has zero length".to_string(),
            ));
        }

        let mut course = Self {
            points,
            cumulative_distances,
            segment_bearings,
            total_length: total,
            width_cache: RefCell::new(BTreeMap::new()),
            segment_cache: Cell::new(0),
            segment_width_overrides: BTreeMap::new(),
            lap_crossings: Vec::new(),
            lap_detection_params: params,
        };
        course.populate_width_cache();
        course.lap_crossings = course.compute_lap_crossings();

        debug!(
            points = course.points.len(),
            total_length = course.total_length,
            cached_widths = course.width_cache_len(),
            laps = course.lap_count(),
            "Built course geometry"
        );

        Ok(course)
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Copy of the point sequence.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.points.clone()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn cumulative_distances(&self) -> Vec<f64> {
        self.cumulative_distances.clone()
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn finish(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    pub fn lap_detection_params(&self) -> LapDetectionParams {
        self.lap_detection_params
    }

    pub fn lap_crossings(&self) -> Vec<f64> {
        self.lap_crossings.clone()
    }

    pub fn lap_count(&self) -> usize {
        self.lap_crossings.len() + 1
    }

    pub fn width_cache_len(&self) -> usize {
        self.width_cache.borrow().len()
    }

    pub fn segment_width_overrides(&self) -> BTreeMap<usize, f64> {
        self.segment_width_overrides.clone()
    }

    // ------------------------------------------------------------------
    // Distance queries
    // ------------------------------------------------------------------

    fn clamp_distance(&self, d: f64) -> f64 {
        if d.is_nan() {
            return 0.0;
        }
        d.clamp(0.0, self.total_length)
    }

    fn check_distance(&self, d: f64) -> Result<f64> {
        if !d.is_finite() || d < -DISTANCE_EPSILON || d > self.total_length + DISTANCE_EPSILON {
            return Err(CourseError::OutOfBounds {
                value: d,
                min: 0.0,
                max: self.total_length,
            });
        }
        Ok(self.clamp_distance(d))
    }

    /// Index of the segment containing `d` (already clamped).
    fn segment_index(&self, d: f64) -> usize {
        let count = self.cumulative_distances.partition_point(|&c| c <= d);
        count.saturating_sub(1).min(self.segment_count() - 1)
    }

    fn segment_index_cached(&self, d: f64) -> usize {
        let last = self.segment_cache.get();
        for idx in [last, last + 1] {
            if idx < self.segment_count() && self.segment_contains(idx, d) {
                self.segment_cache.set(idx);
                return idx;
            }
        }
        let idx = self.segment_index(d);
        self.segment_cache.set(idx);
        idx
    }

    /// Same boundary rule as [`Self::segment_index`]: a shared vertex belongs
    /// to the later segment, the finish to the last one.
    fn segment_contains(&self, idx: usize, d: f64) -> bool {
        let lo = self.cumulative_distances[idx];
        let hi = self.cumulative_distances[idx + 1];
        d >= lo && (d < hi || idx == self.segment_count() - 1)
    }

    /// Point at distance `d` along the course; out-of-range values are clamped.
    pub fn position_at_distance(&self, d: f64) -> GeoPoint {
        let d = self.clamp_distance(d);
        let i = self.segment_index(d);
        let start = self.points[i];
        let seg_len = self.cumulative_distances[i + 1] - self.cumulative_distances[i];
        let offset = d - self.cumulative_distances[i];

        if offset <= 0.0 || seg_len <= 0.0 {
            start
        } else if offset >= seg_len {
            self.points[i + 1]
        } else {
            geo_math::destination(start, self.segment_bearings[i], offset)
        }
    }

    pub fn position_at_distance_strict(&self, d: f64) -> Result<GeoPoint> {
        Ok(self.position_at_distance(self.check_distance(d)?))
    }

    /// Bearing of the segment containing `d`, in [0, 360).
    pub fn bearing_at_distance(&self, d: f64) -> f64 {
        self.segment_bearings[self.segment_index(self.clamp_distance(d))]
    }

    /// Distance along the course of the closest point to `p`.
    pub fn distance_at_position(&self, p: GeoPoint) -> f64 {
        self.locate(p).1
    }

    /// Closest segment to `p` and the course distance of the projection onto it.
    fn locate(&self, p: GeoPoint) -> (usize, f64) {
        let mut best: Option<(usize, f64, GeoPoint)> = None;
        for (i, pair) in self.points.windows(2).enumerate() {
            let proj = geo_math::nearest_point_on_segment(p, pair[0], pair[1]);
            if best.is_none_or(|(_, dist, _)| proj.distance < dist) {
                best = Some((i, proj.distance, proj.point));
            }
        }

        match best {
            Some((i, _, projected)) => {
                let along = geo_math::distance(self.points[i], projected);
                let d = (self.cumulative_distances[i] + along).min(self.cumulative_distances[i + 1]);
                (i, d)
            }
            None => (0, 0.0),
        }
    }

    // ------------------------------------------------------------------
    // Width
    // ------------------------------------------------------------------

    fn width_key(d: f64) -> u64 {
        (d / WIDTH_SAMPLE_INTERVAL_M).round() as u64
    }

    fn key_distance(&self, key: u64) -> f64 {
        (key as f64 * WIDTH_SAMPLE_INTERVAL_M).min(self.total_length)
    }

    /// Course width at `d` in meters; out-of-range values are clamped.
    pub fn width_at(&self, d: f64) -> f64 {
        let d = self.clamp_distance(d);

        let segment = self.segment_index_cached(d);
        if let Some(&w) = self.segment_width_overrides.get(&segment) {
            return w;
        }

        let key = Self::width_key(d);
        if let Some(&w) = self.width_cache.borrow().get(&key) {
            return w;
        }

        trace!(distance = d, key, "Width cache miss");
        let w = self.infer_width(self.key_distance(key));
        self.width_cache.borrow_mut().insert(key, w);
        w
    }

    pub fn width_at_strict(&self, d: f64) -> Result<f64> {
        Ok(self.width_at(self.check_distance(d)?))
    }

    fn infer_width(&self, d: f64) -> f64 {
        let position = self.position_at_distance(d);
        let segment = self.segment_index(d);
        self.parallel_path_distance(position, self.segment_bearings[segment], segment)
            .unwrap_or(DEFAULT_WIDTH_M)
    }

    /// Distance to the nearest stretch of this course running the opposite
    /// way near `position`, if one lies within the maximum width.
    pub fn find_closest_parallel_path(&self, position: GeoPoint, bearing: f64) -> Option<f64> {
        let (_, d) = self.locate(position);
        let segment = self.segment_index_cached(d);
        self.parallel_path_distance(position, bearing, segment)
    }

    fn parallel_path_distance(
        &self,
        position: GeoPoint,
        bearing: f64,
        current: usize,
    ) -> Option<f64> {
        let segments = self.segment_count();
        let avg_len = self.total_length / segments as f64;
        let window = ((PARALLEL_SEARCH_RADIUS_M / avg_len).ceil() as usize).max(1);
        let lo = current.saturating_sub(window);
        let hi = (current + window).min(segments - 1);
        let limit = MAX_WIDTH_M * MAX_WIDTH_ALLOWANCE;

        let mut best: Option<f64> = None;
        for j in lo..=hi {
            if j == current
                || !geo_math::is_antiparallel(
                    bearing,
                    self.segment_bearings[j],
                    ANTIPARALLEL_TOLERANCE_DEG,
                )
            {
                continue;
            }

            let proj =
                geo_math::nearest_point_on_segment(position, self.points[j], self.points[j + 1]);
            if proj.distance > limit {
                continue;
            }
            if best.is_none_or(|b| proj.distance < b) {
                best = Some(proj.distance);
            }
        }

        best.map(f64::round)
    }

    fn populate_width_cache(&mut self) {
        let last_key = Self::width_key(self.total_length);
        let mut cache = BTreeMap::new();
        for key in 0..=last_key {
            let d = self.key_distance(key);
            cache.insert(key, self.infer_width(d));
        }
        self.width_cache = RefCell::new(cache);
        self.segment_cache.set(0);
    }

    /// Narrowest and widest cached readings, overrides applied.
    pub fn course_width_info(&self) -> CourseWidthInfo {
        if self.width_cache.borrow().is_empty() {
            let last_key = Self::width_key(self.total_length);
            for key in 0..=last_key {
                self.width_at(self.key_distance(key));
            }
        }

        let keys: Vec<u64> = self.width_cache.borrow().keys().copied().collect();
        let mut min: Option<(f64, f64)> = None;
        let mut max: Option<(f64, f64)> = None;
        for key in keys {
            let d = self.key_distance(key);
            let w = self.width_at(d);
            if min.is_none_or(|(_, mw)| w < mw) {
                min = Some((d, w));
            }
            if max.is_none_or(|(_, mw)| w > mw) {
                max = Some((d, w));
            }
        }

        let sample = |(distance, width): (f64, f64)| WidthSample {
            distance,
            width,
            position: self.position_at_distance(distance),
        };
        CourseWidthInfo {
            min: sample(min.unwrap_or((0.0, DEFAULT_WIDTH_M))),
            max: sample(max.unwrap_or((0.0, DEFAULT_WIDTH_M))),
        }
    }

    /// Force the width of one segment, e.g. to model a pinch point.
    pub fn set_segment_width(&mut self, segment: usize, width: f64) -> Result<()> {
        if segment >= self.segment_count() {
            return Err(CourseError::index(
                segment,
                self.segment_count(),
                "no such segment",
            ));
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(CourseError::InvalidParameter(format!(
                "segment width must be positive, got {width}"
            )));
        }
        debug!(segment, width, "Set segment width override");
        self.segment_width_overrides.insert(segment, width);
        Ok(())
    }

    pub fn clear_segment_width(&mut self, segment: usize) -> Option<f64> {
        self.segment_width_overrides.remove(&segment)
    }

    pub fn clear_segment_widths(&mut self) {
        self.segment_width_overrides.clear();
    }

    // ------------------------------------------------------------------
    // Laps
    // ------------------------------------------------------------------

    fn compute_lap_crossings(&self) -> Vec<f64> {
        let params = self.lap_detection_params;
        let start = self.points[0];
        let start_bearing = self.segment_bearings[0];
        let window = params.crossing_tolerance_meters * 2.0;

        let qualifies = |d: f64| -> Option<f64> {
            let dist = geo_math::distance(self.position_at_distance(d), start);
            let heading = self.bearing_at_distance(d);
            (dist <= params.crossing_tolerance_meters
                && geo_math::bearing_difference(heading, start_bearing)
                    <= params.bearing_tolerance_deg)
                .then_some(dist)
        };

        let mut crossings = Vec::new();
        let mut d = window;
        while d <= self.total_length {
            let Some(first_dist) = qualifies(d) else {
                d += params.step_meters;
                continue;
            };

            // Keep the sample closest to the start within this pass
            let (mut best_d, mut best_dist) = (d, first_dist);
            let pass_end = (d + window).min(self.total_length);
            let mut sample = d + params.step_meters;
            while sample <= pass_end {
                if let Some(dist) = qualifies(sample) {
                    if dist < best_dist {
                        best_d = sample;
                        best_dist = dist;
                    }
                }
                sample += params.step_meters;
            }

            crossings.push(best_d);
            d = pass_end.max(best_d + window);
        }

        crossings
    }

    /// 1-based lap number at distance `d`.
    pub fn lap_index_at_distance(&self, d: f64) -> usize {
        1 + self.lap_crossings.partition_point(|&c| c <= d)
    }

    pub fn set_lap_detection_params(&mut self, params: LapDetectionParams) -> Result<()> {
        params.validate()?;
        self.lap_detection_params = params;
        self.lap_crossings = self.compute_lap_crossings();
        debug!(laps = self.lap_count(), "Recomputed lap crossings");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation gate
    // ------------------------------------------------------------------

    fn rebuild_from(&mut self, points: Vec<GeoPoint>) -> Result<()> {
        let rebuilt = Self::build(points, self.lap_detection_params)?;
        if !self.segment_width_overrides.is_empty() {
            warn!(
                overrides = self.segment_width_overrides.len(),
                "Geometry changed, discarding segment width overrides"
            );
        }
        *self = rebuilt;
        Ok(())
    }

    /// Insert a point at `index`, or append when `index` is `None`.
    pub fn add_point(&mut self, point: GeoPoint, index: Option<usize>) -> Result<()> {
        point.validate()?;
        let len = self.points.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(CourseError::index(index, len, "insert position past end"));
        }

        let mut points = self.points.clone();
        points.insert(index, point);
        self.rebuild_from(points)
    }

    pub fn move_point(&mut self, index: usize, point: GeoPoint) -> Result<()> {
        point.validate()?;
        let len = self.points.len();
        if index >= len {
            return Err(CourseError::index(index, len, "no such point"));
        }

        let mut points = self.points.clone();
        points[index] = point;
        self.rebuild_from(points)
    }

    pub fn delete_point(&mut self, index: usize) -> Result<()> {
        let len = self.points.len();
        if len <= 2 {
            return Err(CourseError::index(
                index,
                len,
                "course must have at least 2 points",
            ));
        }
        if index >= len {
            return Err(CourseError::index(index, len, "no such point"));
        }

        let mut points = self.points.clone();
        points.remove(index);
        self.rebuild_from(points)
    }

    /// Replace the whole point sequence, e.g. after a fresh import.
    pub fn replace_points(&mut self, points: impl Into<Vec<GeoPoint>>) -> Result<()> {
        let points = points.into();
        for p in &points {
            p.validate()?;
        }
        self.rebuild_from(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_math::METERS_PER_DEGREE;

    fn pt(north_m: f64, east_m: f64) -> GeoPoint {
        GeoPoint::new(north_m / METERS_PER_DEGREE, east_m / METERS_PER_DEGREE)
    }

    fn straight(len: f64) -> Course {
        Course::new(vec![pt(0.0, 0.0), pt(0.0, len)]).unwrap()
    }

    #[test]
    fn test_rejects_single_distinct_point() {
        let err = Course::new(vec![pt(0.0, 0.0), pt(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, CourseError::InvalidCourse(_)));
    }

    #[test]
    fn test_rejects_invalid_coordinates() {
        let err = Course::new(vec![GeoPoint::new(95.0, 0.0), pt(0.0, 10.0)]).unwrap_err();
        assert!(matches!(err, CourseError::InvalidPoint { .. }));
    }

    #[test]
    fn test_dedupes_consecutive_points() {
        let course =
            Course::new(vec![pt(0.0, 0.0), pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 100.0)]).unwrap();
        assert_eq!(course.point_count(), 2);
        assert_eq!(course.cumulative_distances().len(), 2);
    }

    #[test]
    fn test_cumulative_distances() {
        let course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(50.0, 100.0)]).unwrap();
        let cum = course.cumulative_distances();
        assert_eq!(cum[0], 0.0);
        assert!((cum[1] - 100.0).abs() < 1e-6);
        assert!((cum[2] - 150.0).abs() < 1e-6);
        assert_eq!(course.total_length(), cum[2]);
    }

    #[test]
    fn test_position_endpoints_exact() {
        let course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(50.0, 100.0)]).unwrap();
        assert_eq!(course.position_at_distance(0.0), course.start());
        assert_eq!(course.position_at_distance(course.total_length()), course.finish());
    }

    #[test]
    fn test_position_clamps() {
        let course = straight(100.0);
        assert_eq!(course.position_at_distance(-5.0), course.start());
        assert_eq!(course.position_at_distance(1e9), course.finish());
        assert!(course.position_at_distance_strict(-5.0).is_err());
        assert!(course.position_at_distance_strict(100.5).is_err());
    }

    #[test]
    fn test_position_interpolates() {
        let course = straight(100.0);
        let mid = course.position_at_distance(40.0);
        assert!((geo_math::distance(course.start(), mid) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_at_distance() {
        let course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(100.0, 100.0)]).unwrap();
        assert!((course.bearing_at_distance(50.0) - 90.0).abs() < 1e-6);
        assert!(course.bearing_at_distance(150.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_at_position_round_trip() {
        let course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(100.0, 100.0)]).unwrap();
        for d in [0.0, 30.0, 99.0, 130.0, 200.0] {
            let p = course.position_at_distance(d);
            assert!((course.distance_at_position(p) - d).abs() < 0.01, "d = {d}");
        }
    }

    #[test]
    fn test_distance_at_offset_position() {
        let course = straight(100.0);
        assert!((course.distance_at_position(pt(3.0, 25.0)) - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_straight_course_default_width() {
        let course = straight(120.0);
        assert!(course.width_cache_len() > 0);
        for d in [0.0, 33.0, 60.0, 120.0] {
            assert_eq!(course.width_at(d), DEFAULT_WIDTH_M);
        }
    }

    #[test]
    fn test_segment_override_wins() {
        let mut course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 200.0)]).unwrap();
        course.set_segment_width(1, 0.8).unwrap();
        assert_eq!(course.width_at(150.0), 0.8);
        assert_eq!(course.width_at(50.0), DEFAULT_WIDTH_M);
        assert_eq!(course.clear_segment_width(1), Some(0.8));
        assert_eq!(course.width_at(150.0), DEFAULT_WIDTH_M);
    }

    #[test]
    fn test_segment_override_validation() {
        let mut course = straight(100.0);
        assert!(course.set_segment_width(1, 1.0).unwrap_err().is_invalid_index());
        assert!(matches!(
            course.set_segment_width(0, -1.0),
            Err(CourseError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_retraced_leg_has_zero_width() {
        // Straight back along the same line: the returning leg touches every point
        let course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 0.5)]).unwrap();
        assert_eq!(course.width_at(50.0), 0.0);
        assert_eq!(course.find_closest_parallel_path(pt(0.0, 50.0), 90.0), Some(0.0));
    }

    #[test]
    fn test_cached_segment_lookup_matches_search() {
        let course = Course::new(vec![
            pt(0.0, 0.0),
            pt(0.0, 100.0),
            pt(50.0, 100.0),
            pt(50.0, 300.0),
        ])
        .unwrap();
        let total = course.total_length();
        let mut forward: Vec<f64> = (0..=70).map(|i| i as f64 * 5.0).collect();
        forward.extend([100.0, 150.0, total, 0.0, 149.9, 3.0, total, 100.0]);
        for d in forward {
            let d = course.clamp_distance(d);
            assert_eq!(course.segment_index_cached(d), course.segment_index(d), "d = {d}");
        }
    }

    #[test]
    fn test_find_closest_parallel_path() {
        let course =
            Course::new(vec![pt(0.0, 0.0), pt(0.0, 200.0), pt(-3.0, 200.0), pt(-3.0, 0.0)])
                .unwrap();
        assert_eq!(course.find_closest_parallel_path(pt(0.0, 100.0), 90.0), Some(3.0));
        // Same heading as the returning leg: nothing opposite within reach
        assert_eq!(course.find_closest_parallel_path(pt(0.0, 100.0), 180.0), None);
    }

    #[test]
    fn test_width_info() {
        let mut course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 200.0)]).unwrap();
        course.set_segment_width(1, 3.5).unwrap();
        let info = course.course_width_info();
        assert_eq!(info.min.width, DEFAULT_WIDTH_M);
        assert_eq!(info.max.width, 3.5);
        assert!(info.max.distance >= 100.0);
    }

    #[test]
    fn test_add_point_appends_and_rebuilds() {
        let mut course = straight(100.0);
        let before = course.width_cache_len();
        course.add_point(pt(0.0, 200.0), None).unwrap();
        assert_eq!(course.point_count(), 3);
        assert!((course.total_length() - 200.0).abs() < 1e-6);
        assert!(course.width_cache_len() > before);
    }

    #[test]
    fn test_add_point_validation() {
        let mut course = straight(100.0);
        assert!(matches!(
            course.add_point(GeoPoint::new(0.0, 181.0), None),
            Err(CourseError::InvalidPoint { .. })
        ));
        assert!(course.add_point(pt(0.0, 50.0), Some(3)).unwrap_err().is_invalid_index());
        assert_eq!(course.point_count(), 2);
    }

    #[test]
    fn test_move_point() {
        let mut course = straight(100.0);
        course.move_point(1, pt(0.0, 300.0)).unwrap();
        assert!((course.total_length() - 300.0).abs() < 1e-6);
        assert!(matches!(
            course.move_point(0, GeoPoint::new(-91.0, 0.0)),
            Err(CourseError::InvalidPoint { .. })
        ));
        assert!(course.move_point(2, pt(0.0, 1.0)).unwrap_err().is_invalid_index());
    }

    #[test]
    fn test_move_point_onto_neighbour_keeps_state() {
        let mut course = straight(100.0);
        let err = course.move_point(1, pt(0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CourseError::InvalidCourse(_)));
        assert!((course.total_length() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_delete_point() {
        let mut course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 200.0)]).unwrap();
        course.delete_point(1).unwrap();
        assert_eq!(course.point_count(), 2);
        let err = course.delete_point(0).unwrap_err();
        assert!(err.is_invalid_index());
        assert!(err.to_string().contains("at least 2 points"));
    }

    #[test]
    fn test_mutation_discards_overrides() {
        let mut course = Course::new(vec![pt(0.0, 0.0), pt(0.0, 100.0), pt(0.0, 200.0)]).unwrap();
        course.set_segment_width(0, 1.0).unwrap();
        course.add_point(pt(0.0, 300.0), None).unwrap();
        assert!(course.segment_width_overrides().is_empty());
        assert_eq!(course.width_at(50.0), DEFAULT_WIDTH_M);
    }

    #[test]
    fn test_lap_index_without_crossings() {
        let course = straight(500.0);
        assert_eq!(course.lap_count(), 1);
        assert_eq!(course.lap_index_at_distance(0.0), 1);
        assert_eq!(course.lap_index_at_distance(500.0), 1);
    }
}
