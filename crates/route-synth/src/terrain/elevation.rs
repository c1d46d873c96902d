//! Sinusoidal elevation profile generation.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-vertex elevation samples in meters, never negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    samples: Vec<f64>,
}

impl ElevationProfile {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.samples.get(index).copied()
    }

    /// Total climb (sum of positive deltas).
    pub fn gain(&self) -> f64 {
        elevation_gain(&self.samples)
    }
}

/// Sum of positive deltas between consecutive samples.
pub fn elevation_gain(samples: &[f64]) -> f64 {
    samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .sum()
}

/// Generates gently rolling elevation profiles.
///
/// Sample `i` is `base + sin(i * frequency) * amplitude + U(0, jitter)`,
/// clamped to `floor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationSynthesizer {
    /// Baseline elevation in meters.
    base_elevation: f64,
    /// Peak deviation of the base curve from the baseline.
    amplitude: f64,
    /// Radians advanced per vertex (controls the wave period).
    frequency: f64,
    /// Upper bound of the non-negative uniform jitter.
    jitter: f64,
    /// Lowest elevation ever emitted.
    floor: f64,
}

impl Default for ElevationSynthesizer {
    fn default() -> Self {
        Self {
            base_elevation: 50.0,
            amplitude: 20.0,
            frequency: 0.1,
            jitter: 10.0,
            floor: 0.0,
        }
    }
}

impl ElevationSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat terrain with only jitter.
    pub fn flat() -> Self {
        Self {
            amplitude: 0.0,
            ..Default::default()
        }
    }

    /// Sets the baseline elevation.
    pub fn with_base_elevation(mut self, elevation: f64) -> Self {
        self.base_elevation = elevation;
        self
    }

    /// Sets the base curve amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Sets the per-vertex angular step of the base curve.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Sets the jitter range; negative values are treated as 0.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn base_elevation(&self) -> f64 {
        self.base_elevation
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Produces `count` samples.
    pub fn generate(&self, count: usize, rng: &mut impl Rng) -> ElevationProfile {
        let samples = (0..count)
            .map(|i| {
                let wave = (i as f64 * self.frequency).sin() * self.amplitude;
                let jitter = if self.jitter > 0.0 {
                    rng.gen_range(0.0..self.jitter)
                } else {
                    0.0
                };
                (self.base_elevation + wave + jitter).max(self.floor)
            })
            .collect();
        ElevationProfile::new(samples)
    }
}
