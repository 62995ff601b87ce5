//! Procedural course generation.
//!
//! Regular shapes are laid out with [`geo_math::destination`] so lengths and
//! lateral offsets come out in true meters. The random walk keeps the
//! momentum-and-bounce behavior of a wandering trail.

use course::{GeoPoint, geo_math};
use rand::Rng;

use crate::config::{BoundingBox, CourseShape, Region};

const EAST: f64 = 90.0;
const WEST: f64 = 270.0;
const NORTH: f64 = 0.0;
const SOUTH: f64 = 180.0;

/// Configuration for procedural course generation.
#[derive(Debug, Clone)]
pub struct ShapeConfig {
    /// Starting point of regular shapes.
    pub origin: GeoPoint,
    /// Approximate distance between random walk points in meters.
    pub point_spacing_m: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            origin: Region::BOULDER.center(),
            point_spacing_m: 10.0,
        }
    }
}

/// Generates synthetic course geometry.
#[derive(Debug, Clone, Default)]
pub struct ProceduralGenerator {
    config: ShapeConfig,
}

impl ProceduralGenerator {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            config: ShapeConfig {
                origin,
                ..Default::default()
            },
        }
    }

    /// Sets point spacing.
    pub fn with_point_spacing(mut self, meters: f64) -> Self {
        self.config.point_spacing_m = meters;
        self
    }

    pub fn origin(&self) -> GeoPoint {
        self.config.origin
    }

    /// Generates the point sequence for a procedural shape.
    ///
    /// Returns `None` for [`CourseShape::Gpx`], which has no procedural form.
    pub fn generate(&self, shape: &CourseShape, rng: &mut impl Rng) -> Option<Vec<GeoPoint>> {
        let points = match *shape {
            CourseShape::Straight { length_m } => self.straight(length_m),
            CourseShape::OutAndBack { length_m, offset_m } => self.out_and_back(length_m, offset_m),
            CourseShape::Loop { lap_length_m, laps } => self.square_loop(lap_length_m, laps),
            CourseShape::ZigZag {
                leg_length_m,
                legs,
                step_m,
            } => self.zig_zag(leg_length_m, legs, step_m),
            CourseShape::RandomWalk { distance_m, region } => {
                let start = if region.contains(self.config.origin) {
                    self.config.origin
                } else {
                    region.random_point(rng)
                };
                self.random_walk(start, distance_m, &region, rng)
            }
            CourseShape::Gpx { .. } => return None,
        };
        Some(points)
    }

    fn offset(&self, from: GeoPoint, bearing: f64, meters: f64) -> GeoPoint {
        geo_math::destination(from, bearing, meters)
    }

    /// Straight eastward line.
    pub fn straight(&self, length_m: f64) -> Vec<GeoPoint> {
        let start = self.config.origin;
        vec![start, self.offset(start, EAST, length_m)]
    }

    /// East for `length_m`, step `offset_m` south, then west back to the start line.
    pub fn out_and_back(&self, length_m: f64, offset_m: f64) -> Vec<GeoPoint> {
        let start = self.config.origin;
        let turn = self.offset(start, EAST, length_m);
        let turn_back = self.offset(turn, SOUTH, offset_m);
        let finish = self.offset(start, SOUTH, offset_m);
        vec![start, turn, turn_back, finish]
    }

    /// Square lap of `lap_length_m` run `laps` times, counter-clockwise from the origin.
    pub fn square_loop(&self, lap_length_m: f64, laps: u32) -> Vec<GeoPoint> {
        let side = lap_length_m / 4.0;
        let start = self.config.origin;
        let east = self.offset(start, EAST, side);
        let north_east = self.offset(east, NORTH, side);
        let north = self.offset(start, NORTH, side);

        let mut points = vec![start];
        for _ in 0..laps {
            points.extend([east, north_east, north, start]);
        }
        points
    }

    /// `legs` eastward legs, each starting `step_m` further south than the last,
    /// followed by a return leg to the origin.
    pub fn zig_zag(&self, leg_length_m: f64, legs: u32, step_m: f64) -> Vec<GeoPoint> {
        let start = self.config.origin;
        let mut points = vec![start];
        let mut leg_start = start;
        for _ in 0..legs {
            leg_start = self.offset(leg_start, SOUTH, step_m);
            let leg_end = self.offset(leg_start, EAST, leg_length_m);
            points.push(leg_start);
            points.push(leg_end);
            leg_start = leg_end;
        }
        // Back up to the start line and home along it
        let corner = self.offset(leg_start, NORTH, step_m * legs as f64);
        points.push(corner);
        points.push(self.offset(corner, WEST, leg_length_m * legs as f64));
        points
    }

    /// Random walk with some momentum to create natural-looking paths.
    pub fn random_walk(
        &self,
        start: GeoPoint,
        distance_m: f64,
        bounds: &BoundingBox,
        rng: &mut impl Rng,
    ) -> Vec<GeoPoint> {
        let mut path = vec![start];
        let mut current = start;
        let mut total_distance = 0.0;
        let mut heading: f64 = rng.gen_range(0.0..360.0);

        while total_distance < distance_m {
            heading += rng.gen_range(-17.0..17.0);

            // Step size roughly the configured spacing, with variance
            let step = self.config.point_spacing_m * rng.gen_range(0.8..1.2);
            let next = self.offset(current, heading, step);

            let (next, bounced_heading) = apply_bounds(next, heading, bounds);
            heading = bounced_heading;

            total_distance += geo_math::distance(current, next);
            current = next;
            path.push(current);
        }

        path
    }
}

/// Clamps a point to the bounds, reflecting the heading off whichever edge was hit.
fn apply_bounds(p: GeoPoint, heading: f64, b: &BoundingBox) -> (GeoPoint, f64) {
    let mut new_heading = heading;

    let lat = if p.lat < b.min_lat {
        new_heading = 180.0 - new_heading;
        b.min_lat + (b.min_lat - p.lat).min(0.001)
    } else if p.lat > b.max_lat {
        new_heading = 180.0 - new_heading;
        b.max_lat - (p.lat - b.max_lat).min(0.001)
    } else {
        p.lat
    };

    let lon = if p.lon < b.min_lon {
        new_heading = -new_heading;
        b.min_lon + (b.min_lon - p.lon).min(0.001)
    } else if p.lon > b.max_lon {
        new_heading = -new_heading;
        b.max_lon - (p.lon - b.max_lon).min(0.001)
    } else {
        p.lon
    };

    (GeoPoint::new(lat, lon), geo_math::normalize_bearing(new_heading))
}

#[cfg(test)]
mod tests {
    use course::Course;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn generator() -> ProceduralGenerator {
        ProceduralGenerator::new(GeoPoint::new(0.0, 0.0))
    }

    #[test]
    fn test_straight_length() {
        let course = Course::new(generator().straight(750.0)).unwrap();
        assert!((course.total_length() - 750.0).abs() < 1e-3);
    }

    #[test]
    fn test_out_and_back_width() {
        let course = Course::new(generator().out_and_back(400.0, 3.0)).unwrap();
        assert!((course.total_length() - 803.0).abs() < 1e-3);
        assert_eq!(course.width_at(100.0), 3.0);
    }

    #[test]
    fn test_loop_laps() {
        let course = Course::new(generator().square_loop(400.0, 3)).unwrap();
        assert!((course.total_length() - 1200.0).abs() < 1e-2);
        assert_eq!(course.lap_count(), 3);
        assert!(geo_math::distance(course.start(), course.finish()) < 1e-6);
    }

    #[test]
    fn test_zig_zag_legs_step_sideways() {
        let points = generator().zig_zag(100.0, 4, 1.0);
        // origin, two points per leg, return corner and home
        assert_eq!(points.len(), 1 + 4 * 2 + 2);
        let course = Course::new(points).unwrap();
        // Each leg is one step further from the return leg than the last
        assert_eq!(course.width_at(50.0), 1.0);
        assert_eq!(course.width_at(155.0), 2.0);
        assert_eq!(course.width_at(260.0), 3.0);
    }

    #[test]
    fn test_random_walk_stays_in_bounds() {
        let bounds = Region::BOULDER;
        let generator = ProceduralGenerator::new(bounds.center());
        let mut rng = StdRng::seed_from_u64(42);

        let path = generator.random_walk(bounds.center(), 2000.0, &bounds, &mut rng);
        assert!(path.len() > 100);
        assert!(path.iter().all(|p| bounds.contains(*p)));

        let course = Course::new(path).unwrap();
        assert!(course.total_length() >= 2000.0);
    }

    #[test]
    fn test_random_walk_is_seeded() {
        let bounds = Region::BOULDER;
        let generator = ProceduralGenerator::new(bounds.center());
        let shape = CourseShape::RandomWalk {
            distance_m: 500.0,
            region: bounds,
        };

        let a = generator.generate(&shape, &mut StdRng::seed_from_u64(5));
        let b = generator.generate(&shape, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_gpx_shape_has_no_procedural_form() {
        let shape = CourseShape::Gpx {
            path: "course.gpx".into(),
        };
        assert!(generator().generate(&shape, &mut rand::thread_rng()).is_none());
    }
}
