//! Configuration for route synthesis.

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activity::ActivityType;
use crate::export::DEFAULT_CREATOR;
use crate::pace::{DEFAULT_INCONSISTENCY_PCT, DEFAULT_PACE_MIN_PER_KM, PaceSetting, PaceUnit};
use crate::sources::DEFAULT_OSRM_ENDPOINT;
use crate::terrain::ElevationSynthesizer;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session defaults, loadable from JSON.
///
/// Missing keys take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Pace value in `pace_unit`.
    pub pace: f64,
    pub pace_unit: PaceUnit,
    /// Per-segment pace variance, 0 to 100.
    pub inconsistency_pct: f64,
    pub activity: ActivityType,
    /// `creator` attribute of exported documents.
    pub creator: String,
    pub elevation: ElevationSynthesizer,
    /// OSRM base URL for road snapping.
    pub osrm_endpoint: String,
    /// Fixed RNG seed for reproducible output.
    pub seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            pace: DEFAULT_PACE_MIN_PER_KM,
            pace_unit: PaceUnit::MinPerKm,
            inconsistency_pct: DEFAULT_INCONSISTENCY_PCT,
            activity: ActivityType::Run,
            creator: DEFAULT_CREATOR.to_string(),
            elevation: ElevationSynthesizer::default(),
            osrm_endpoint: DEFAULT_OSRM_ENDPOINT.to_string(),
            seed: None,
        }
    }
}

impl SynthConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Applies `ROUTE_SYNTH_*` environment overrides.
    ///
    /// Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ROUTE_SYNTH_OSRM_URL") {
            self.osrm_endpoint = url;
        }
        if let Ok(creator) = std::env::var("ROUTE_SYNTH_CREATOR") {
            self.creator = creator;
        }
        if let Some(seed) = std::env::var("ROUTE_SYNTH_SEED")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.seed = Some(seed);
        }
        self
    }

    /// Initial pace setting, sanitized.
    pub fn pace_setting(&self) -> PaceSetting {
        PaceSetting::new(self.pace, self.pace_unit, self.inconsistency_pct)
    }
}
