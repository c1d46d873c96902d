//! The active route session.
//!
//! A [`RouteSession`] owns the one active path, its pace settings, the frozen
//! random draws and the last statistics snapshot. UI layers drive it through
//! the `on_*` command methods; each one re-runs the recompute pipeline so the
//! display and the exporter always read the same numbers.

use rand::SeedableRng;
use rand::rngs::StdRng;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::activity::ActivityType;
use crate::config::SynthConfig;
use crate::error::SynthError;
use crate::export::{ExportOptions, TrackSynthesizer, suggested_filename};
use crate::geo::{Coordinate, Path};
use crate::pace::{PaceSetting, PaceUnit};
use crate::sources::SnapError;
use crate::stats::{ChartSeries, FrozenDraws, RouteStatistics, StatsDisplay};
use crate::terrain::ElevationSynthesizer;

/// A single edit coming from the parameter form.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterChange {
    /// New pace value in the current unit.
    Pace(f64),
    /// New display unit; the pace value is converted so the canonical pace
    /// does not change.
    Unit(PaceUnit),
    Inconsistency(f64),
    /// New activity; an out-of-range pace snaps to the activity default.
    Activity(ActivityType),
    /// Wholesale replacement, e.g. from [`PaceSetting::parse`].
    Setting(PaceSetting),
}

/// Identifies the path a road-snap request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapTicket(u64);

/// Everything an async caller needs to run a road-snap request.
#[derive(Debug, Clone)]
pub struct SnapRequest {
    pub ticket: SnapTicket,
    pub path: Path,
    pub activity: ActivityType,
}

/// What happened to a resolved road-snap request.
#[derive(Debug)]
pub enum SnapOutcome {
    /// The snapped path replaced the active one.
    Applied,
    /// The path changed while the request was in flight; result dropped.
    Stale,
    /// The service failed; the active path is unchanged.
    Failed(SnapError),
}

/// Result of an export request.
#[derive(Debug, Clone)]
pub struct GpxExport {
    pub filename: String,
    pub document: String,
}

pub struct RouteSession {
    path: Path,
    pace: PaceSetting,
    activity: ActivityType,
    stats: RouteStatistics,
    draws: FrozenDraws,
    elevation: ElevationSynthesizer,
    synthesizer: TrackSynthesizer,
    creator: String,
    rng: StdRng,
    /// Bumped on every path replacement or clear.
    generation: u64,
}

impl RouteSession {
    pub fn new(config: &SynthConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            path: Path::empty(),
            pace: config.pace_setting(),
            activity: config.activity,
            stats: RouteStatistics::reset(),
            draws: FrozenDraws::new(),
            elevation: config.elevation.clone(),
            synthesizer: TrackSynthesizer::new(config.elevation.clone()),
            creator: config.creator.clone(),
            rng,
            generation: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pace(&self) -> &PaceSetting {
        &self.pace
    }

    pub fn activity(&self) -> ActivityType {
        self.activity
    }

    pub fn stats(&self) -> &RouteStatistics {
        &self.stats
    }

    /// Stats panel strings in the current unit.
    pub fn display(&self) -> StatsDisplay {
        self.stats.display(self.pace.unit())
    }

    pub fn chart_series(&self) -> ChartSeries {
        self.stats.chart_series(&self.path, self.pace.unit())
    }

    /// Vertices numbered from 1, for waypoint markers.
    pub fn waypoints(&self) -> impl Iterator<Item = (usize, Coordinate)> + '_ {
        self.path.points().iter().enumerate().map(|(i, &c)| (i + 1, c))
    }

    /// Installs a new path (drawn, generated or snapped) and recomputes.
    pub fn on_path_replaced(&mut self, path: Path) -> &RouteStatistics {
        self.generation += 1;
        self.path = path;
        debug!(points = self.path.len(), "path replaced");
        self.recompute();
        &self.stats
    }

    /// Drops the path and zeroes the statistics.
    pub fn on_path_cleared(&mut self) {
        self.generation += 1;
        self.path = Path::empty();
        self.draws.clear();
        self.stats = RouteStatistics::reset();
        debug!("path cleared");
    }

    pub fn on_parameter_changed(&mut self, change: ParameterChange) -> &RouteStatistics {
        self.pace = match change {
            ParameterChange::Pace(value) => {
                PaceSetting::new(value, self.pace.unit(), self.pace.inconsistency_pct())
            }
            ParameterChange::Unit(unit) => self.pace.with_unit(unit),
            ParameterChange::Inconsistency(pct) => self.pace.with_inconsistency(pct),
            ParameterChange::Activity(activity) => {
                self.activity = activity;
                self.pace.normalized_for(activity)
            }
            ParameterChange::Setting(setting) => setting,
        };
        self.recompute();
        &self.stats
    }

    /// Recomputes the statistics and builds the export document.
    ///
    /// The session's activity type overrides `options.activity`.
    pub fn on_export_requested(&mut self, options: &ExportOptions) -> Result<GpxExport, SynthError> {
        if self.path.is_empty() {
            warn!("export requested without a route");
            return Err(SynthError::EmptyRoute);
        }
        self.recompute();

        let options = ExportOptions {
            activity: self.activity,
            creator: if options.creator.is_empty() {
                self.creator.clone()
            } else {
                options.creator.clone()
            },
            ..options.clone()
        };
        let now = OffsetDateTime::now_utc();
        let document = self
            .synthesizer
            .build_at(&self.path, &self.stats, &options, now, &mut self.rng)?;
        let filename = suggested_filename(&options.name, now);
        info!(%filename, "export ready");

        Ok(GpxExport { filename, document })
    }

    /// Starts a road-snap request for the current path.
    pub fn begin_snap(&self) -> Result<SnapRequest, SnapError> {
        if self.path.len() < 2 {
            return Err(SnapError::TooFewPoints(self.path.len()));
        }
        Ok(SnapRequest {
            ticket: SnapTicket(self.generation),
            path: self.path.clone(),
            activity: self.activity,
        })
    }

    /// Applies a finished road-snap request.
    ///
    /// Results for a path that has since been replaced or cleared are ignored,
    /// as are failures (the path stays as it was).
    pub fn on_snap_resolved(
        &mut self,
        ticket: SnapTicket,
        result: Result<Path, SnapError>,
    ) -> SnapOutcome {
        if ticket.0 != self.generation {
            debug!("ignoring stale road snap result");
            return SnapOutcome::Stale;
        }
        match result {
            Ok(path) => {
                self.on_path_replaced(path);
                SnapOutcome::Applied
            }
            Err(e) => {
                warn!("road snap failed: {e}");
                SnapOutcome::Failed(e)
            }
        }
    }

    fn recompute(&mut self) {
        if self.path.is_empty() {
            self.stats = RouteStatistics::reset();
            return;
        }
        self.stats = RouteStatistics::recompute(
            &self.path,
            &self.pace,
            &mut self.draws,
            &self.elevation,
            &mut self.rng,
        );
    }
}

impl Default for RouteSession {
    fn default() -> Self {
        Self::new(&SynthConfig::default())
    }
}
