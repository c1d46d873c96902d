//! Elevation profile cache keyed by path content.

use rand::Rng;
use tracing::debug;

use super::{ElevationProfile, ElevationSynthesizer};
use crate::geo::Path;

/// Holds the profile generated for the most recent path.
///
/// A profile is reused only when the path fingerprint matches, so display,
/// charts and export all read the same samples until the geometry changes.
#[derive(Debug, Clone, Default)]
pub struct ElevationCache {
    entry: Option<(u64, ElevationProfile)>,
}

impl ElevationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached profile for `path`, generating it on a miss.
    pub fn profile_for(
        &mut self,
        path: &Path,
        synth: &ElevationSynthesizer,
        rng: &mut impl Rng,
    ) -> &ElevationProfile {
        let fingerprint = path.fingerprint();
        if !matches!(&self.entry, Some((key, _)) if *key == fingerprint) {
            self.entry = None;
        }
        let (_, profile) = self.entry.get_or_insert_with(|| {
            debug!(points = path.len(), "elevation cache miss, generating profile");
            (fingerprint, synth.generate(path.len(), rng))
        });
        profile
    }

    /// Cached profile for `path`, if any.
    pub fn peek(&self, path: &Path) -> Option<&ElevationProfile> {
        let fingerprint = path.fingerprint();
        self.entry
            .as_ref()
            .filter(|(key, _)| *key == fingerprint)
            .map(|(_, profile)| profile)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn line(offset: f64) -> Path {
        Path::new(vec![
            Coordinate::new(40.0, -105.0),
            Coordinate::new(40.0 + offset, -105.0),
            Coordinate::new(40.0 + 2.0 * offset, -105.0),
        ])
    }

    #[test]
    fn test_repeated_reads_hit_cache() {
        let mut cache = ElevationCache::new();
        let synth = ElevationSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(5);
        let path = line(0.01);

        let first = cache.profile_for(&path, &synth, &mut rng).clone();
        let second = cache.profile_for(&path, &synth, &mut rng).clone();
        assert_eq!(first, second);
        assert_eq!(cache.peek(&path), Some(&first));
    }

    #[test]
    fn test_same_length_different_shape_regenerates() {
        let mut cache = ElevationCache::new();
        let synth = ElevationSynthesizer::default();
        let mut rng = StdRng::seed_from_u64(5);

        let first = cache.profile_for(&line(0.01), &synth, &mut rng).clone();
        let other = line(0.02);
        assert!(cache.peek(&other).is_none());
        let second = cache.profile_for(&other, &synth, &mut rng).clone();
        assert_eq!(second.len(), 3);
        assert_ne!(first, second);
    }

    #[test]
    fn test_clear_drops_entry() {
        let mut cache = ElevationCache::new();
        let mut rng = StdRng::seed_from_u64(5);
        let path = line(0.01);
        cache.profile_for(&path, &ElevationSynthesizer::default(), &mut rng);
        cache.clear();
        assert!(cache.peek(&path).is_none());
    }
}
