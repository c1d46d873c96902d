//! Synthetic GPS track logs from drawn or generated routes.
//!
//! A route is an ordered list of coordinates. This crate computes its distance,
//! duration, speed and a synthetic elevation profile for a chosen pace, then
//! exports it as a GPX 1.1 track with one timestamped point per vertex.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use route_synth::prelude::*;
//!
//! let mut session = RouteSession::new(&SynthConfig::default());
//! let route = ShapeGenerator::new(Coordinate::new(40.015, -105.27))
//!     .with_distance_km(5.0)
//!     .generate(Shape::Loop, &mut rand::thread_rng());
//!
//! session.on_path_replaced(route);
//! session.on_parameter_changed(ParameterChange::Pace(4.75));
//! println!("{}", session.display());
//!
//! let export = session.on_export_requested(&ExportOptions::default())?;
//! std::fs::write(&export.filename, export.document)?;
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod pace;
pub mod session;
pub mod sources;
pub mod stats;
pub mod terrain;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::activity::ActivityType;
    pub use crate::config::SynthConfig;
    pub use crate::error::SynthError;
    pub use crate::export::{ExportOptions, TrackSynthesizer};
    pub use crate::geo::{Coordinate, Path};
    pub use crate::pace::{PaceSetting, PaceUnit};
    pub use crate::session::{GpxExport, ParameterChange, RouteSession, SnapOutcome};
    pub use crate::sources::{GpxLoader, RoadSnapClient, Shape, ShapeGenerator};
    pub use crate::stats::{RouteStatistics, StatsDisplay};
    pub use crate::terrain::ElevationSynthesizer;
}
