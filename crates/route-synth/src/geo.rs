//! Great-circle distance and path-length accumulation.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Mean earth radius used for all distance math, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// An ordered route in travel order.
///
/// Paths are replaced wholesale, never edited in place, so anything derived
/// from one (statistics, elevation, pace draws) can be keyed by its
/// [`Path::fingerprint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Coordinate>,
}

impl Path {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of consecutive vertex pairs.
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn length_km(&self) -> f64 {
        path_length_km(&self.points)
    }

    /// Content hash over the exact coordinate bit patterns.
    ///
    /// Two paths with the same vertex count but different geometry hash
    /// differently.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.points.len().hash(&mut hasher);
        for point in &self.points {
            point.lat.to_bits().hash(&mut hasher);
            point.lon.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl From<Vec<Coordinate>> for Path {
    fn from(points: Vec<Coordinate>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Coordinate> for Path {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Haversine distance between two coordinates in kilometers.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c / 1000.0
}

/// Distance of every consecutive pair, in travel order.
pub fn segment_distances_km(points: &[Coordinate]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| distance_km(pair[0], pair[1]))
        .collect()
}

/// Total length of a vertex sequence; 0 for fewer than two points.
pub fn path_length_km(points: &[Coordinate]) -> f64 {
    segment_distances_km(points).iter().sum()
}

/// Running distance at each vertex, starting at 0 for the first one.
pub fn cumulative_distances_km(points: &[Coordinate]) -> Vec<f64> {
    let mut total = 0.0;
    let mut result = Vec::with_capacity(points.len());
    if !points.is_empty() {
        result.push(0.0);
    }
    for segment in segment_distances_km(points) {
        total += segment;
        result.push(total);
    }
    result
}
