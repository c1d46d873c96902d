//! Activity types and their pacing and physiology defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Half-width of the simulated heart-rate band around the baseline, in bpm.
pub const HEART_RATE_SPREAD: u16 = 10;

/// Accepted pace range and default for an activity, in canonical min/km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceBounds {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl PaceBounds {
    pub fn contains(&self, pace_min_per_km: f64) -> bool {
        (self.min..=self.max).contains(&pace_min_per_km)
    }
}

/// The kind of session being synthesized.
///
/// Governs pace bounds, the GPX `<type>` label, heart-rate baseline and the
/// routing profile used for road snapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Run,
    Bike,
}

impl ActivityType {
    /// Typical pace envelope.
    ///
    /// - Run: 3 to 15 min/km, default 5:30/km
    /// - Bike: 2 to 5 min/km (12 to 30 km/h), default 3:00/km
    pub fn pace_bounds(self) -> PaceBounds {
        match self {
            ActivityType::Run => PaceBounds {
                min: 3.0,
                max: 15.0,
                default: 5.5,
            },
            ActivityType::Bike => PaceBounds {
                min: 2.0,
                max: 5.0,
                default: 3.0,
            },
        }
    }

    pub fn default_pace(self) -> f64 {
        self.pace_bounds().default
    }

    /// Label written to the GPX track `<type>` element.
    pub fn gpx_type(self) -> &'static str {
        match self {
            ActivityType::Run => "Running",
            ActivityType::Bike => "Biking",
        }
    }

    /// Centre of the simulated heart-rate band.
    pub fn heart_rate_baseline(self) -> u16 {
        match self {
            ActivityType::Run => 160,
            ActivityType::Bike => 140,
        }
    }

    /// Inclusive heart-rate range emitted for this activity.
    pub fn heart_rate_range(self) -> (u16, u16) {
        let base = self.heart_rate_baseline();
        (base - HEART_RATE_SPREAD, base + HEART_RATE_SPREAD)
    }

    /// OSRM profile name for road snapping.
    pub fn routing_profile(self) -> &'static str {
        match self {
            ActivityType::Run => "foot",
            ActivityType::Bike => "cycling",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Run => "run",
            ActivityType::Bike => "bike",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" | "running" => Ok(ActivityType::Run),
            "bike" | "biking" | "ride" | "cycling" => Ok(ActivityType::Bike),
            other => Err(format!("unknown activity type: {other}")),
        }
    }
}
