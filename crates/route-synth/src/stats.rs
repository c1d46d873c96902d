//! Route statistics snapshot shared by the display, the charts and the exporter.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::{Path, cumulative_distances_km};
use crate::pace::{
    self, DEFAULT_PACE_MIN_PER_KM, PaceSetting, PaceUnit, PaceVariance, SegmentAllocation,
    allocate_with_variance, from_canonical_pace,
};
use crate::terrain::{ElevationCache, ElevationProfile, ElevationSynthesizer};

/// Random draws frozen per path: the elevation profile and the per-segment
/// pace variance.
///
/// Both are keyed by [`Path::fingerprint`] so redrawing a path of the same
/// length still invalidates them.
#[derive(Debug, Clone, Default)]
pub struct FrozenDraws {
    elevation: ElevationCache,
    variance: Option<(u64, PaceVariance)>,
}

impl FrozenDraws {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elevation_for(
        &mut self,
        path: &Path,
        synth: &ElevationSynthesizer,
        rng: &mut impl Rng,
    ) -> &ElevationProfile {
        self.elevation.profile_for(path, synth, rng)
    }

    pub fn variance_for(&mut self, path: &Path, rng: &mut impl Rng) -> &PaceVariance {
        let fingerprint = path.fingerprint();
        if !matches!(&self.variance, Some((key, _)) if *key == fingerprint) {
            self.variance = None;
        }
        let (_, variance) = self.variance.get_or_insert_with(|| {
            debug!(segments = path.segment_count(), "sampling pace variance");
            (fingerprint, PaceVariance::sample(path.segment_count(), rng))
        });
        variance
    }

    pub fn clear(&mut self) {
        self.elevation.clear();
        self.variance = None;
    }
}

/// Authoritative snapshot of the last computed route stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistics {
    pub distance_km: f64,
    pub duration_seconds: f64,
    /// Canonical pace in min/km.
    pub pace_min_per_km: f64,
    pub speed_kmh: f64,
    /// Sum of positive elevation deltas in meters.
    pub elevation_gain_m: f64,
    pub elevation_profile: ElevationProfile,
    pub pace_variance: PaceVariance,
    pub inconsistency_pct: f64,
    /// Fingerprint of the path these stats were computed from.
    pub path_fingerprint: u64,
}

impl RouteStatistics {
    /// Recomputes the snapshot for `path` at `pace`.
    ///
    /// Reuses the frozen elevation profile and pace variance when the path is
    /// unchanged; otherwise draws new ones.
    pub fn recompute(
        path: &Path,
        pace: &PaceSetting,
        draws: &mut FrozenDraws,
        synth: &ElevationSynthesizer,
        rng: &mut impl Rng,
    ) -> Self {
        let distance_km = path.length_km();
        let pace_min_per_km = pace.canonical_min_per_km();
        let duration_seconds = pace::total_duration_seconds(distance_km, pace_min_per_km);
        let elevation_profile = draws.elevation_for(path, synth, rng).clone();
        let pace_variance = draws.variance_for(path, rng).clone();

        let stats = Self {
            distance_km,
            duration_seconds,
            pace_min_per_km,
            speed_kmh: pace::speed_kmh(distance_km, duration_seconds / 60.0),
            elevation_gain_m: elevation_profile.gain(),
            elevation_profile,
            pace_variance,
            inconsistency_pct: pace.inconsistency_pct(),
            path_fingerprint: path.fingerprint(),
        };
        debug!(
            distance_km = stats.distance_km,
            duration_seconds = stats.duration_seconds,
            elevation_gain_m = stats.elevation_gain_m,
            "route statistics recomputed"
        );
        stats
    }

    /// Zeroed snapshot for a cleared route.
    pub fn reset() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elevation_profile.is_empty() && self.distance_km == 0.0
    }

    /// Whether this snapshot was computed from `path`.
    pub fn matches(&self, path: &Path) -> bool {
        self.path_fingerprint == path.fingerprint() && self.elevation_profile.len() == path.len()
    }

    /// Per-segment times reconciled to `duration_seconds`.
    pub fn allocation(&self, path: &Path) -> SegmentAllocation {
        allocate_with_variance(
            path.points(),
            self.pace_min_per_km,
            self.inconsistency_pct,
            &self.pace_variance,
        )
        .rescaled(self.duration_seconds)
    }

    /// Pre-formatted values for the stats panel.
    pub fn display(&self, unit: PaceUnit) -> StatsDisplay {
        if self.is_empty() {
            return StatsDisplay {
                distance: "0 km".to_string(),
                duration: "0:00:00".to_string(),
                elevation_gain: "0m".to_string(),
                pace: format!("{:.2}", from_canonical_pace(DEFAULT_PACE_MIN_PER_KM, unit)),
                speed: "0 km/h".to_string(),
            };
        }
        StatsDisplay {
            distance: format!(
                "{:.2} {}",
                pace::distance_in_unit(self.distance_km, unit),
                unit.distance_label()
            ),
            duration: pace::format_duration(self.duration_seconds),
            elevation_gain: format!("{}m", self.elevation_gain_m.round()),
            pace: format!("{:.2}", from_canonical_pace(self.pace_min_per_km, unit)),
            speed: format!("{:.1} km/h", self.speed_kmh),
        }
    }

    /// Chart view over the same allocation and profile the exporter uses.
    pub fn chart_series(&self, path: &Path, unit: PaceUnit) -> ChartSeries {
        if path.is_empty() {
            return ChartSeries::default();
        }
        let allocation = allocate_with_variance(
            path.points(),
            self.pace_min_per_km,
            self.inconsistency_pct,
            &self.pace_variance,
        );

        let labels = cumulative_distances_km(path.points())
            .into_iter()
            .map(|km| format!("{km:.2}"))
            .collect();

        let pace: Vec<f64> = (0..path.len())
            .map(|i| {
                let segment = i.saturating_sub(1);
                let canonical = allocation
                    .paces_min_per_km
                    .get(segment)
                    .copied()
                    .unwrap_or(self.pace_min_per_km);
                from_canonical_pace(canonical, unit)
            })
            .collect();

        let average_pace = pace.iter().sum::<f64>() / pace.len() as f64;

        ChartSeries {
            labels,
            pace,
            elevation: self.elevation_profile.samples().to_vec(),
            average_pace,
            total_gain_m: self.elevation_gain_m,
        }
    }
}

/// Stats panel strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDisplay {
    pub distance: String,
    pub duration: String,
    pub elevation_gain: String,
    pub pace: String,
    pub speed: String,
}

impl fmt::Display for StatsDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Distance:       {}", self.distance)?;
        writeln!(f, "Duration:       {}", self.duration)?;
        writeln!(f, "Pace:           {}", self.pace)?;
        writeln!(f, "Speed:          {}", self.speed)?;
        write!(f, "Elevation gain: {}", self.elevation_gain)
    }
}

/// Per-vertex series for the pace and elevation charts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    /// Cumulative distance in km at each vertex, two decimals.
    pub labels: Vec<String>,
    /// Pace with variance at each vertex, in the display unit.
    pub pace: Vec<f64>,
    pub elevation: Vec<f64>,
    pub average_pace: f64,
    pub total_gain_m: f64,
}
