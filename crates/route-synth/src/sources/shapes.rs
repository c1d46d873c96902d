//! Procedural route shapes.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, EARTH_RADIUS_M, Path};

/// Kilometers per degree of latitude on the mean-radius sphere.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_M / 1000.0 * PI / 180.0;
/// Standard deviation of the per-step heading change of a wander.
const HEADING_DRIFT_RAD: f64 = 0.15;
/// Upper bound on generated vertices; spacing widens past it.
const MAX_POINTS: usize = 100_000;
/// Start latitudes are clamped to this band before projecting offsets.
const MAX_START_LAT: f64 = 85.0;

/// Geometric templates a route can be generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    /// Circle starting and ending at the start point.
    Loop,
    Square,
    Triangle,
    /// Straight out along the rotation bearing and back.
    OutAndBack,
    /// Two tangent loops meeting at the start point.
    Figure8,
    /// Momentum random walk; does not return to the start.
    Wander,
}

impl std::str::FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loop" | "circle" => Ok(Shape::Loop),
            "square" => Ok(Shape::Square),
            "triangle" => Ok(Shape::Triangle),
            "out-and-back" | "outandback" | "line" => Ok(Shape::OutAndBack),
            "figure8" | "figure-8" | "figure-eight" => Ok(Shape::Figure8),
            "wander" | "random" => Ok(Shape::Wander),
            other => Err(format!("unknown shape: {other}")),
        }
    }
}

/// Generates paths of a target length around a start point.
#[derive(Debug, Clone)]
pub struct ShapeGenerator {
    start: Coordinate,
    /// Target route length in km.
    distance_km: f64,
    /// Approximate distance between consecutive vertices in km.
    spacing_km: f64,
    /// Clockwise rotation of the template, in degrees.
    rotation_deg: f64,
}

impl ShapeGenerator {
    pub fn new(start: Coordinate) -> Self {
        Self {
            start,
            distance_km: 5.0,
            spacing_km: 0.025,
            rotation_deg: 0.0,
        }
    }

    /// Sets the target distance.
    pub fn with_distance_km(mut self, km: f64) -> Self {
        self.distance_km = km;
        self
    }

    /// Sets vertex spacing in meters.
    pub fn with_spacing_m(mut self, meters: f64) -> Self {
        self.spacing_km = (meters / 1000.0).max(0.001);
        self
    }

    /// Sets the template rotation.
    pub fn with_rotation_deg(mut self, degrees: f64) -> Self {
        self.rotation_deg = degrees;
        self
    }

    /// Generates `shape`. A non-positive or non-finite distance yields the
    /// start point alone.
    ///
    /// Start latitudes beyond ±85° are clamped, since longitude offsets
    /// diverge at the poles.
    pub fn generate(&self, shape: Shape, rng: &mut impl Rng) -> Path {
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Path::new(vec![self.start]);
        }
        let start = Coordinate::new(
            self.start.lat.clamp(-MAX_START_LAT, MAX_START_LAT),
            self.start.lon,
        );
        let spacing = self.spacing_km.max(self.distance_km / MAX_POINTS as f64);

        let local = match shape {
            Shape::Loop => circle(self.distance_km / TAU, 1.0, spacing),
            Shape::Figure8 => {
                let radius = self.distance_km / (2.0 * TAU);
                let mut points = circle(radius, 1.0, spacing);
                points.extend(circle(radius, -1.0, spacing).into_iter().skip(1));
                points
            }
            Shape::Square => {
                let s = self.distance_km / 4.0;
                densify(&[(0.0, 0.0), (s, 0.0), (s, s), (0.0, s), (0.0, 0.0)], spacing)
            }
            Shape::Triangle => {
                let s = self.distance_km / 3.0;
                let h = s * 3.0_f64.sqrt() / 2.0;
                densify(&[(0.0, 0.0), (s, 0.0), (s / 2.0, h), (0.0, 0.0)], spacing)
            }
            Shape::OutAndBack => {
                let half = self.distance_km / 2.0;
                densify(&[(0.0, 0.0), (0.0, half), (0.0, 0.0)], spacing)
            }
            Shape::Wander => self.wander(spacing, rng),
        };

        let rotation = self.rotation_deg.to_radians();
        local
            .into_iter()
            .map(|(east, north)| {
                let (east, north) = rotate(east, north, rotation);
                offset(start, east, north)
            })
            .collect()
    }

    /// Random walk with heading momentum, stopping once the target is reached.
    fn wander(&self, spacing_km: f64, rng: &mut impl Rng) -> Vec<(f64, f64)> {
        let mut points = vec![(0.0, 0.0)];
        let mut current = (0.0, 0.0);
        let mut total = 0.0;
        let mut heading = rng.gen_range(0.0..TAU);
        let Ok(drift) = Normal::new(0.0, HEADING_DRIFT_RAD) else {
            return points;
        };

        while total < self.distance_km && points.len() < MAX_POINTS {
            heading += drift.sample(rng);
            let step = spacing_km * rng.gen_range(0.8..1.2);
            current = (current.0 + step * heading.sin(), current.1 + step * heading.cos());
            points.push(current);
            total += step;
        }
        points
    }
}

/// Circle through the origin; `side` 1 puts it north of the start, -1 south.
fn circle(radius: f64, side: f64, spacing_km: f64) -> Vec<(f64, f64)> {
    let segments = ((TAU * radius / spacing_km).ceil() as usize).max(8);
    (0..=segments)
        .map(|k| {
            let theta = -side * PI / 2.0 + side * TAU * k as f64 / segments as f64;
            (radius * theta.cos(), side * radius + radius * theta.sin())
        })
        .collect()
}

/// Interpolates vertices along each edge at roughly the configured spacing.
fn densify(corners: &[(f64, f64)], spacing_km: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    for edge in corners.windows(2) {
        let (e0, n0) = edge[0];
        let (e1, n1) = edge[1];
        let length = ((e1 - e0).powi(2) + (n1 - n0).powi(2)).sqrt();
        let steps = ((length / spacing_km).ceil() as usize).max(1);
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            points.push((e0 + (e1 - e0) * t, n0 + (n1 - n0) * t));
        }
    }
    if let Some(&last) = corners.last() {
        points.push(last);
    }
    points
}

fn rotate(east: f64, north: f64, clockwise_rad: f64) -> (f64, f64) {
    let (sin, cos) = clockwise_rad.sin_cos();
    (east * cos + north * sin, north * cos - east * sin)
}

/// Moves `origin` by a local east/north displacement in km.
fn offset(origin: Coordinate, east_km: f64, north_km: f64) -> Coordinate {
    let lat = origin.lat + north_km / KM_PER_DEGREE;
    let lon = origin.lon + east_km / (KM_PER_DEGREE * origin.lat.to_radians().cos());
    Coordinate::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance_km;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const START: Coordinate = Coordinate::new(40.015, -105.27);

    fn generate(shape: Shape, km: f64) -> Path {
        let mut rng = StdRng::seed_from_u64(42);
        ShapeGenerator::new(START)
            .with_distance_km(km)
            .generate(shape, &mut rng)
    }

    #[test]
    fn test_closed_shapes_hit_target_distance() {
        for shape in [Shape::Loop, Shape::Square, Shape::Triangle, Shape::OutAndBack, Shape::Figure8] {
            let path = generate(shape, 5.0);
            let length = path.length_km();
            assert!((length - 5.0).abs() / 5.0 < 0.03, "{shape:?}: {length}");

            let first = path.points()[0];
            let last = *path.points().last().unwrap();
            assert!(distance_km(first, START) < 1e-6, "{shape:?} starts off origin");
            assert!(distance_km(last, START) < 1e-3, "{shape:?} does not close");
        }
    }

    #[test]
    fn test_spacing_controls_point_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let coarse = ShapeGenerator::new(START)
            .with_spacing_m(100.0)
            .generate(Shape::Square, &mut rng);
        let fine = ShapeGenerator::new(START)
            .with_spacing_m(10.0)
            .generate(Shape::Square, &mut rng);
        assert!(fine.len() > coarse.len() * 5);
    }

    #[test]
    fn test_wander_reaches_target() {
        let path = generate(Shape::Wander, 2.0);
        assert!(path.length_km() >= 1.9);
        assert!(path.len() > 50);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let rotated = ShapeGenerator::new(START)
            .with_rotation_deg(37.0)
            .generate(Shape::Triangle, &mut rng);
        assert!((rotated.length_km() - 5.0).abs() < 0.15);
    }

    #[test]
    fn test_non_positive_distance_is_single_point() {
        let path = generate(Shape::Loop, 0.0);
        assert_eq!(path.len(), 1);
        assert_eq!(path.length_km(), 0.0);
    }

    #[test]
    fn test_non_finite_distance_is_single_point() {
        for km in [f64::INFINITY, f64::NAN] {
            for shape in [Shape::Loop, Shape::Figure8, Shape::Square, Shape::Wander] {
                assert_eq!(generate(shape, km).len(), 1, "{shape:?} at {km}");
            }
        }
    }

    #[test]
    fn test_huge_distance_caps_point_count() {
        let path = generate(Shape::Loop, 1.0e9);
        assert!(path.len() <= MAX_POINTS + 2);
        assert!(path.points().iter().all(|c| c.lat.is_finite() && c.lon.is_finite()));
    }

    #[test]
    fn test_polar_start_stays_finite() {
        let mut rng = StdRng::seed_from_u64(3);
        let path = ShapeGenerator::new(Coordinate::new(90.0, 10.0))
            .with_distance_km(2.0)
            .generate(Shape::Square, &mut rng);
        assert!(path.points().iter().all(|c| c.lat.abs() <= 90.0 && c.lon.abs() < 1000.0));
        assert!((path.length_km() - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!("figure-8".parse::<Shape>(), Ok(Shape::Figure8));
        assert_eq!("Out-And-Back".parse::<Shape>(), Ok(Shape::OutAndBack));
        assert!("hexagon".parse::<Shape>().is_err());
    }
}
