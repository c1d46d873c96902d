//! Pace, duration and per-segment time allocation.
//!
//! All math runs on canonical pace (minutes per kilometer). The user's unit
//! only matters when parsing input and rendering output.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activity::ActivityType;
use crate::geo::{Coordinate, segment_distances_km};

pub const KM_PER_MILE: f64 = 1.60934;
pub const MILES_PER_KM: f64 = 0.621371;

/// Fallback canonical pace for unusable input.
pub const DEFAULT_PACE_MIN_PER_KM: f64 = 5.5;
/// Fallback inconsistency for unusable input.
pub const DEFAULT_INCONSISTENCY_PCT: f64 = 0.0;
/// Minutes/km of pace spread per percent of inconsistency.
pub const VARIANCE_SCALE: f64 = 0.1;
/// A perturbed segment pace never drops below this fraction of the base pace.
const MIN_SEGMENT_PACE_FRACTION: f64 = 0.1;

/// Unit a pace is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaceUnit {
    #[default]
    #[serde(rename = "min/km")]
    MinPerKm,
    #[serde(rename = "min/mile")]
    MinPerMile,
}

impl PaceUnit {
    pub fn label(self) -> &'static str {
        match self {
            PaceUnit::MinPerKm => "min/km",
            PaceUnit::MinPerMile => "min/mile",
        }
    }

    /// Distance unit shown alongside this pace unit.
    pub fn distance_label(self) -> &'static str {
        match self {
            PaceUnit::MinPerKm => "km",
            PaceUnit::MinPerMile => "mi",
        }
    }
}

impl fmt::Display for PaceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min/km" | "km" | "metric" => Ok(PaceUnit::MinPerKm),
            "min/mile" | "min/mi" | "mile" | "mi" | "imperial" => Ok(PaceUnit::MinPerMile),
            other => Err(format!("unknown pace unit: {other}")),
        }
    }
}

/// Converts a pace in `unit` to min/km.
pub fn to_canonical_pace_min_per_km(value: f64, unit: PaceUnit) -> f64 {
    match unit {
        PaceUnit::MinPerKm => value,
        PaceUnit::MinPerMile => value * KM_PER_MILE,
    }
}

/// Converts a min/km pace to `unit`.
pub fn from_canonical_pace(pace_min_per_km: f64, unit: PaceUnit) -> f64 {
    match unit {
        PaceUnit::MinPerKm => pace_min_per_km,
        PaceUnit::MinPerMile => pace_min_per_km / KM_PER_MILE,
    }
}

/// Converts a distance in km to the distance unit paired with `unit`.
pub fn distance_in_unit(distance_km: f64, unit: PaceUnit) -> f64 {
    match unit {
        PaceUnit::MinPerKm => distance_km,
        PaceUnit::MinPerMile => distance_km * MILES_PER_KM,
    }
}

/// User pace configuration.
///
/// `value` is kept in the user's unit so it can be echoed back verbatim;
/// [`PaceSetting::canonical_min_per_km`] is what every computation uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceSetting {
    value: f64,
    unit: PaceUnit,
    inconsistency_pct: f64,
}

impl Default for PaceSetting {
    fn default() -> Self {
        Self {
            value: DEFAULT_PACE_MIN_PER_KM,
            unit: PaceUnit::MinPerKm,
            inconsistency_pct: DEFAULT_INCONSISTENCY_PCT,
        }
    }
}

impl PaceSetting {
    /// Builds a setting, replacing unusable numbers with the defaults.
    pub fn new(value: f64, unit: PaceUnit, inconsistency_pct: f64) -> Self {
        let value = if value.is_finite() && value > 0.0 {
            value
        } else {
            debug!(value, "pace is not positive, using default");
            from_canonical_pace(DEFAULT_PACE_MIN_PER_KM, unit)
        };
        Self {
            value,
            unit,
            inconsistency_pct: sanitize_inconsistency(inconsistency_pct),
        }
    }

    /// Builds a setting from raw form text.
    ///
    /// Unparsable fields fall back to 5.5 min/km and 0 % rather than failing,
    /// since the input is edited live.
    pub fn parse(value: &str, unit: PaceUnit, inconsistency: &str) -> Self {
        let value = value.trim().parse::<f64>().unwrap_or_else(|_| {
            debug!(input = value, "unparsable pace, using default");
            from_canonical_pace(DEFAULT_PACE_MIN_PER_KM, unit)
        });
        let inconsistency = inconsistency.trim().parse::<f64>().unwrap_or_else(|_| {
            debug!(input = inconsistency, "unparsable inconsistency, using default");
            DEFAULT_INCONSISTENCY_PCT
        });
        Self::new(value, unit, inconsistency)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> PaceUnit {
        self.unit
    }

    pub fn inconsistency_pct(&self) -> f64 {
        self.inconsistency_pct
    }

    /// Pace in min/km; always positive.
    pub fn canonical_min_per_km(&self) -> f64 {
        to_canonical_pace_min_per_km(self.value, self.unit)
    }

    /// Re-expresses the same pace in another unit.
    pub fn with_unit(self, unit: PaceUnit) -> Self {
        Self {
            value: from_canonical_pace(self.canonical_min_per_km(), unit),
            unit,
            ..self
        }
    }

    pub fn with_inconsistency(self, inconsistency_pct: f64) -> Self {
        Self {
            inconsistency_pct: sanitize_inconsistency(inconsistency_pct),
            ..self
        }
    }

    /// Resets the pace to the activity default when it lies outside the
    /// activity's typical range.
    ///
    /// Bounds apply to the value as entered, in its own unit, and only run
    /// on an activity switch.
    pub fn normalized_for(self, activity: ActivityType) -> Self {
        let bounds = activity.pace_bounds();
        if bounds.contains(self.value) {
            self
        } else {
            debug!(
                pace = self.value,
                unit = %self.unit,
                %activity,
                "pace outside activity range, using activity default"
            );
            Self {
                value: bounds.default,
                ..self
            }
        }
    }
}

fn sanitize_inconsistency(pct: f64) -> f64 {
    if pct.is_finite() {
        pct.clamp(0.0, 100.0)
    } else {
        DEFAULT_INCONSISTENCY_PCT
    }
}

/// Total duration in seconds for a distance at a canonical pace.
pub fn total_duration_seconds(distance_km: f64, pace_min_per_km: f64) -> f64 {
    distance_km * pace_min_per_km * 60.0
}

/// Average speed in km/h; 0 when there is no distance or no time.
pub fn speed_kmh(distance_km: f64, duration_minutes: f64) -> f64 {
    if distance_km <= 0.0 || duration_minutes <= 0.0 {
        return 0.0;
    }
    distance_km / (duration_minutes / 60.0)
}

/// Renders seconds as `H:MM:SS`, truncating fractional seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Parses `H:MM:SS` (or `MM:SS`) back to seconds.
pub fn parse_duration(text: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut parts = 0;
    for part in text.trim().split(':') {
        let value: u64 = part.parse().ok()?;
        total = total * 60.0 + value as f64;
        parts += 1;
    }
    (1..=3).contains(&parts).then_some(total)
}

/// Frozen per-segment pace perturbations.
///
/// Each draw is uniform in `[-0.5, 0.5)`; the pace offset for a segment is
/// `draw * inconsistency_pct * VARIANCE_SCALE` minutes/km. Keeping the unit
/// draws lets the inconsistency be changed without re-rolling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaceVariance {
    draws: Vec<f64>,
}

impl PaceVariance {
    pub fn sample(segments: usize, rng: &mut impl Rng) -> Self {
        Self {
            draws: (0..segments).map(|_| rng.gen_range(-0.5..0.5)).collect(),
        }
    }

    /// No perturbation on any segment.
    pub fn none(segments: usize) -> Self {
        Self {
            draws: vec![0.0; segments],
        }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Pace offset in min/km for segment `index`.
    pub fn offset(&self, index: usize, inconsistency_pct: f64) -> f64 {
        self.draws.get(index).copied().unwrap_or(0.0) * inconsistency_pct * VARIANCE_SCALE
    }
}

/// Distances, perturbed paces and nominal times for each segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentAllocation {
    pub distances_km: Vec<f64>,
    pub paces_min_per_km: Vec<f64>,
    pub times_seconds: Vec<f64>,
}

impl SegmentAllocation {
    pub fn len(&self) -> usize {
        self.times_seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_seconds.is_empty()
    }

    pub fn total_seconds(&self) -> f64 {
        self.times_seconds.iter().sum()
    }

    /// Scales segment times so they sum to `target_seconds`.
    pub fn rescaled(mut self, target_seconds: f64) -> Self {
        self.times_seconds = rescale_to_target(&self.times_seconds, target_seconds);
        self
    }

    /// Elapsed time at each vertex: `len() + 1` values starting at 0.
    pub fn cumulative_seconds(&self) -> Vec<f64> {
        let mut elapsed = 0.0;
        let mut result = Vec::with_capacity(self.times_seconds.len() + 1);
        result.push(0.0);
        for time in &self.times_seconds {
            elapsed += time;
            result.push(elapsed);
        }
        result
    }
}

/// Allocates time to each segment with freshly drawn pace variance.
pub fn per_segment_allocation(
    points: &[Coordinate],
    pace_min_per_km: f64,
    inconsistency_pct: f64,
    rng: &mut impl Rng,
) -> SegmentAllocation {
    let variance = PaceVariance::sample(points.len().saturating_sub(1), rng);
    allocate_with_variance(points, pace_min_per_km, inconsistency_pct, &variance)
}

/// Allocates time to each segment using previously frozen draws.
pub fn allocate_with_variance(
    points: &[Coordinate],
    pace_min_per_km: f64,
    inconsistency_pct: f64,
    variance: &PaceVariance,
) -> SegmentAllocation {
    let distances_km = segment_distances_km(points);
    let floor = pace_min_per_km * MIN_SEGMENT_PACE_FRACTION;

    let paces_min_per_km: Vec<f64> = (0..distances_km.len())
        .map(|i| (pace_min_per_km + variance.offset(i, inconsistency_pct)).max(floor))
        .collect();

    let times_seconds = distances_km
        .iter()
        .zip(&paces_min_per_km)
        .map(|(&distance, &pace)| total_duration_seconds(distance, pace))
        .collect();

    SegmentAllocation {
        distances_km,
        paces_min_per_km,
        times_seconds,
    }
}

/// Scales `segment_times` so their sum equals `target_total_seconds`.
///
/// When the segments carry no time at all there is nothing to scale and the
/// input is returned unchanged.
pub fn rescale_to_target(segment_times: &[f64], target_total_seconds: f64) -> Vec<f64> {
    let sum: f64 = segment_times.iter().sum();
    if sum <= 0.0 || !target_total_seconds.is_finite() || target_total_seconds < 0.0 {
        return segment_times.to_vec();
    }
    let scale = target_total_seconds / sum;
    segment_times.iter().map(|t| t * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn route() -> Vec<Coordinate> {
        vec![
            Coordinate::new(40.0, -105.3),
            Coordinate::new(40.005, -105.295),
            Coordinate::new(40.01, -105.3),
            Coordinate::new(40.01, -105.3),
            Coordinate::new(40.02, -105.31),
        ]
    }

    #[test]
    fn test_unit_round_trip() {
        for pace in [3.0, 5.5, 7.25, 12.0] {
            let per_mile = from_canonical_pace(pace, PaceUnit::MinPerMile);
            let back = to_canonical_pace_min_per_km(per_mile, PaceUnit::MinPerMile);
            assert!((back - pace).abs() < 1e-12);
        }
        assert_eq!(to_canonical_pace_min_per_km(5.0, PaceUnit::MinPerKm), 5.0);
        assert!((to_canonical_pace_min_per_km(8.0, PaceUnit::MinPerMile) - 12.87472).abs() < 1e-9);
    }

    #[test]
    fn test_parse_falls_back_to_defaults() {
        let setting = PaceSetting::parse("abc", PaceUnit::MinPerKm, "");
        assert_eq!(setting.canonical_min_per_km(), DEFAULT_PACE_MIN_PER_KM);
        assert_eq!(setting.inconsistency_pct(), 0.0);

        let setting = PaceSetting::parse("-2", PaceUnit::MinPerMile, "250");
        assert!((setting.canonical_min_per_km() - DEFAULT_PACE_MIN_PER_KM).abs() < 1e-12);
        assert_eq!(setting.inconsistency_pct(), 100.0);

        let setting = PaceSetting::parse(" 6.0 ", PaceUnit::MinPerKm, "20");
        assert_eq!(setting.value(), 6.0);
        assert_eq!(setting.inconsistency_pct(), 20.0);
    }

    #[test]
    fn test_with_unit_keeps_canonical_pace() {
        let setting = PaceSetting::new(5.0, PaceUnit::MinPerKm, 0.0).with_unit(PaceUnit::MinPerMile);
        assert_eq!(setting.unit(), PaceUnit::MinPerMile);
        assert!((setting.value() - 5.0 / KM_PER_MILE).abs() < 1e-12);
        assert!((setting.canonical_min_per_km() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_for_activity() {
        let run = PaceSetting::new(5.5, PaceUnit::MinPerKm, 0.0);
        let bike = run.normalized_for(ActivityType::Bike);
        assert_eq!(bike.canonical_min_per_km(), 3.0);
        assert_eq!(bike.normalized_for(ActivityType::Run).canonical_min_per_km(), 3.0);
        assert_eq!(run.normalized_for(ActivityType::Run), run);

        let sprint = PaceSetting::new(2.5, PaceUnit::MinPerKm, 0.0);
        assert_eq!(sprint.normalized_for(ActivityType::Run).canonical_min_per_km(), 5.5);
    }

    #[test]
    fn test_normalized_for_checks_value_in_its_unit() {
        let easy_mile = PaceSetting::new(10.0, PaceUnit::MinPerMile, 0.0);
        assert_eq!(easy_mile.normalized_for(ActivityType::Run), easy_mile);

        let slow_mile = PaceSetting::new(20.0, PaceUnit::MinPerMile, 0.0);
        let reset = slow_mile.normalized_for(ActivityType::Run);
        assert_eq!(reset.value(), 5.5);
        assert_eq!(reset.unit(), PaceUnit::MinPerMile);
    }

    #[test]
    fn test_total_duration_and_speed() {
        assert_eq!(total_duration_seconds(10.0, 5.0), 3000.0);
        assert!((speed_kmh(10.0, 50.0) - 12.0).abs() < 1e-12);
        assert_eq!(speed_kmh(0.0, 0.0), 0.0);
        assert_eq!(speed_kmh(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(59.9), "0:00:59");
        assert_eq!(format_duration(3723.0), "1:02:03");
        assert_eq!(format_duration(36_000.0), "10:00:00");
        assert_eq!(format_duration(f64::NAN), "0:00:00");
    }

    #[test]
    fn test_format_duration_round_trips_within_a_second() {
        for (distance, pace) in [(0.0, 5.5), (1.234, 5.5), (21.0975, 4.75), (42.195, 6.3), (100.0, 2.5)] {
            let seconds = total_duration_seconds(distance, pace);
            let parsed = parse_duration(&format_duration(seconds)).unwrap();
            assert!((parsed - seconds).abs() < 1.0, "{seconds} vs {parsed}");
        }
        assert_eq!(parse_duration("x:10"), None);
    }

    #[test]
    fn test_allocation_without_variance_matches_total() {
        let points = route();
        let allocation = allocate_with_variance(&points, 5.0, 0.0, &PaceVariance::none(4));
        assert_eq!(allocation.len(), 4);
        let expected = total_duration_seconds(crate::geo::path_length_km(&points), 5.0);
        assert!((allocation.total_seconds() - expected).abs() < 1e-9);
        assert_eq!(allocation.times_seconds[2], 0.0);
    }

    #[test]
    fn test_variance_stays_within_amplitude() {
        let mut rng = StdRng::seed_from_u64(11);
        let allocation = per_segment_allocation(&route(), 6.0, 30.0, &mut rng);
        for pace in &allocation.paces_min_per_km {
            assert!((pace - 6.0).abs() <= 30.0 * VARIANCE_SCALE / 2.0);
        }
    }

    #[test]
    fn test_extreme_variance_keeps_paces_positive() {
        let mut rng = StdRng::seed_from_u64(2);
        let allocation = per_segment_allocation(&route(), 2.0, 100.0, &mut rng);
        assert!(allocation.paces_min_per_km.iter().all(|&p| p > 0.0));
        assert!(allocation.times_seconds.iter().all(|&t| t >= 0.0));
    }

    #[test]
    fn test_rescale_to_target() {
        let scaled = rescale_to_target(&[10.0, 30.0, 0.0, 60.0], 50.0);
        assert_eq!(scaled, vec![5.0, 15.0, 0.0, 30.0]);
        assert_eq!(rescale_to_target(&[0.0, 0.0], 10.0), vec![0.0, 0.0]);
        assert!(rescale_to_target(&[], 10.0).is_empty());
    }

    #[test]
    fn test_rescaled_cumulative_ends_at_target() {
        let mut rng = StdRng::seed_from_u64(8);
        let allocation = per_segment_allocation(&route(), 5.5, 60.0, &mut rng).rescaled(1234.5);
        let cumulative = allocation.cumulative_seconds();
        assert_eq!(cumulative.len(), 5);
        assert_eq!(cumulative[0], 0.0);
        assert!((cumulative[4] - 1234.5).abs() < 1e-9);
        assert!(cumulative.windows(2).all(|w| w[1] >= w[0]));
    }
}
