//! Terrain synthesis.
//!
//! Route geometry carries no height data, so elevation samples are synthesized
//! from a smooth base curve plus jitter and then frozen per path.

mod cache;
mod elevation;

pub use cache::ElevationCache;
pub use elevation::{ElevationProfile, ElevationSynthesizer, elevation_gain};
