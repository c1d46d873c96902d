//! Reading route geometry from GPX files.

use std::path::Path as FsPath;

use gpx::{Gpx, read};
use thiserror::Error;

use crate::geo::{Coordinate, Path};

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GPX parse error: {0}")]
    Parse(#[from] gpx::errors::GpxError),
    #[error("No tracks or routes found in GPX file")]
    NoTracks,
    #[error("GPX file contains no points")]
    NoPoints,
}

/// Loads a route's vertices from GPX data.
///
/// Timestamps, elevations and extensions in the source are ignored; only
/// the geometry is kept, so the result can be re-timed like a drawn path.
pub struct GpxLoader;

impl GpxLoader {
    pub fn load_file(path: impl AsRef<FsPath>) -> Result<Path, GpxError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let gpx: Gpx = read(reader)?;

        Self::extract_path(&gpx)
    }

    pub fn load_bytes(data: &[u8]) -> Result<Path, GpxError> {
        let gpx: Gpx = read(std::io::Cursor::new(data))?;

        Self::extract_path(&gpx)
    }

    /// Flattens every track segment, in document order, into one path.
    /// Files without tracks fall back to their first route.
    fn extract_path(gpx: &Gpx) -> Result<Path, GpxError> {
        let waypoints: Vec<&gpx::Waypoint> = if !gpx.tracks.is_empty() {
            gpx.tracks
                .iter()
                .flat_map(|track| &track.segments)
                .flat_map(|segment| &segment.points)
                .collect()
        } else if let Some(route) = gpx.routes.first() {
            route.points.iter().collect()
        } else {
            return Err(GpxError::NoTracks);
        };

        if waypoints.is_empty() {
            return Err(GpxError::NoPoints);
        }

        Ok(waypoints
            .into_iter()
            .map(|waypoint| {
                let point = waypoint.point();
                Coordinate::new(point.y(), point.x())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Two segments</name>
    <trkseg>
      <trkpt lat="40.0" lon="-105.3"><ele>1650.0</ele></trkpt>
      <trkpt lat="40.01" lon="-105.29"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="40.02" lon="-105.28"></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_load_flattens_segments() {
        let path = GpxLoader::load_bytes(TRACK.as_bytes()).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.points()[0], Coordinate::new(40.0, -105.3));
        assert_eq!(path.points()[2], Coordinate::new(40.02, -105.28));
    }

    #[test]
    fn test_load_without_tracks() {
        let data = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
</gpx>
"#;
        assert!(matches!(
            GpxLoader::load_bytes(data.as_bytes()),
            Err(GpxError::NoTracks)
        ));
    }

    #[test]
    fn test_load_file_round_trip() {
        let temp_path = std::env::temp_dir().join("route_synth_loader_test.gpx");
        std::fs::write(&temp_path, TRACK).unwrap();

        let path = GpxLoader::load_file(&temp_path).unwrap();
        assert_eq!(path.len(), 3);

        std::fs::remove_file(temp_path).ok();
    }
}
