//! GPX 1.1 track synthesis.
//!
//! Turns a path plus its [`RouteStatistics`] into a complete track log with
//! one timestamped, elevation-annotated point per vertex.

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};
use tracing::{info, warn};

use crate::activity::ActivityType;
use crate::error::SynthError;
use crate::geo::{Coordinate, Path};
use crate::pace::{self, DEFAULT_PACE_MIN_PER_KM};
use crate::stats::RouteStatistics;
use crate::terrain::ElevationSynthesizer;

pub const DEFAULT_RUN_NAME: &str = "My Running Route";
pub const DEFAULT_CREATOR: &str = "route-synth";

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const TPX_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// User-facing export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub name: String,
    pub description: String,
    pub activity: ActivityType,
    /// Local start date; today when absent.
    pub date: Option<Date>,
    /// Local start time of day; the current time when absent.
    pub start_time: Option<Time>,
    /// Offset the local date and time are interpreted in.
    pub utc_offset: UtcOffset,
    pub include_heart_rate: bool,
    /// Value of the `creator` attribute.
    pub creator: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            activity: ActivityType::default(),
            date: None,
            start_time: None,
            utc_offset: UtcOffset::UTC,
            include_heart_rate: false,
            creator: DEFAULT_CREATOR.to_string(),
        }
    }
}

impl ExportOptions {
    /// Run name with the default substituted for an empty one.
    pub fn run_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            DEFAULT_RUN_NAME
        } else {
            trimmed
        }
    }

    /// Combines date and start time into a single instant.
    ///
    /// Missing parts are taken from `now` as seen in `utc_offset`.
    pub fn start_instant(&self, now: OffsetDateTime) -> OffsetDateTime {
        let local_now = now.to_offset(self.utc_offset);
        match (self.date, self.start_time) {
            (None, None) => now,
            (date, time) => {
                let date = date.unwrap_or_else(|| local_now.date());
                let time = time.unwrap_or_else(|| local_now.time());
                date.with_time(time).assume_offset(self.utc_offset)
            }
        }
    }
}

/// A single synthesized sample, produced only while exporting.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub coordinate: Coordinate,
    pub elevation: f64,
    pub time: OffsetDateTime,
    pub heart_rate: Option<u16>,
}

/// Builds GPX documents from a path and its statistics.
#[derive(Debug, Clone, Default)]
pub struct TrackSynthesizer {
    elevation: ElevationSynthesizer,
}

impl TrackSynthesizer {
    pub fn new(elevation: ElevationSynthesizer) -> Self {
        Self { elevation }
    }

    /// Builds the document, starting now when the options carry no date/time.
    pub fn build(
        &self,
        path: &Path,
        stats: &RouteStatistics,
        options: &ExportOptions,
        rng: &mut impl Rng,
    ) -> Result<String, SynthError> {
        self.build_at(path, stats, options, OffsetDateTime::now_utc(), rng)
    }

    /// Builds the document using `now` as the current instant.
    pub fn build_at(
        &self,
        path: &Path,
        stats: &RouteStatistics,
        options: &ExportOptions,
        now: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Result<String, SynthError> {
        let start = options.start_instant(now);
        let points = self.track_points(
            path,
            stats,
            options.activity,
            options.include_heart_rate,
            start,
            rng,
        )?;
        let document = render_gpx(&points, options, start)?;
        info!(
            points = points.len(),
            duration_seconds = stats.duration_seconds,
            name = options.run_name(),
            "synthesized GPX track"
        );
        Ok(document)
    }

    /// Synthesizes the timestamped points for `path`.
    ///
    /// Segment times are rescaled so the last point lands exactly
    /// `stats.duration_seconds` after `start`.
    pub fn track_points(
        &self,
        path: &Path,
        stats: &RouteStatistics,
        activity: ActivityType,
        include_heart_rate: bool,
        start: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Result<Vec<TrackPoint>, SynthError> {
        if path.is_empty() {
            return Err(SynthError::EmptyRoute);
        }

        let fresh = stats.matches(path);
        if !fresh {
            warn!(
                points = path.len(),
                profile = stats.elevation_profile.len(),
                "statistics do not belong to this path, synthesizing fallback draws"
            );
        }

        let elevations = if fresh {
            stats.elevation_profile.clone()
        } else {
            self.elevation.generate(path.len(), rng)
        };

        let pace = if stats.pace_min_per_km > 0.0 {
            stats.pace_min_per_km
        } else {
            DEFAULT_PACE_MIN_PER_KM
        };
        let target_seconds = if stats.duration_seconds > 0.0 {
            stats.duration_seconds
        } else {
            pace::total_duration_seconds(path.length_km(), pace)
        };

        let allocation = if fresh {
            pace::allocate_with_variance(
                path.points(),
                pace,
                stats.inconsistency_pct,
                &stats.pace_variance,
            )
        } else {
            pace::per_segment_allocation(path.points(), pace, stats.inconsistency_pct, rng)
        }
        .rescaled(target_seconds);

        let (hr_min, hr_max) = activity.heart_rate_range();

        let points = path
            .points()
            .iter()
            .zip(allocation.cumulative_seconds())
            .enumerate()
            .map(|(i, (&coordinate, elapsed))| {
                let offset = Duration::milliseconds((elapsed * 1000.0).round() as i64);
                TrackPoint {
                    coordinate,
                    elevation: elevations.get(i).unwrap_or(0.0),
                    time: start + offset,
                    heart_rate: include_heart_rate.then(|| rng.gen_range(hr_min..=hr_max)),
                }
            })
            .collect();

        Ok(points)
    }
}

/// Serializes points into a GPX 1.1 document.
pub fn render_gpx(
    points: &[TrackPoint],
    options: &ExportOptions,
    created: OffsetDateTime,
) -> Result<String, SynthError> {
    let name = escape_xml(options.run_name());
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(&format!(
        r#"<gpx version="1.1" creator="{}" xmlns="{GPX_NAMESPACE}" xmlns:gpxtpx="{TPX_NAMESPACE}" xmlns:xsi="{XSI_NAMESPACE}" xsi:schemaLocation="{SCHEMA_LOCATION}">"#,
        escape_xml(&options.creator),
    ));
    gpx.push('\n');

    gpx.push_str("  <metadata>\n");
    gpx.push_str(&format!("    <name>{name}</name>\n"));
    gpx.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&options.description)));
    gpx.push_str(&format!("    <time>{}</time>\n", format_timestamp(created)?));
    gpx.push_str("  </metadata>\n");

    gpx.push_str("  <trk>\n");
    gpx.push_str(&format!("    <name>{name}</name>\n"));
    gpx.push_str(&format!("    <type>{}</type>\n", options.activity.gpx_type()));
    gpx.push_str("    <trkseg>\n");

    for point in points {
        gpx.push_str(&format!(
            r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
            point.coordinate.lat, point.coordinate.lon
        ));
        gpx.push('\n');
        gpx.push_str(&format!("        <ele>{:.2}</ele>\n", point.elevation));
        gpx.push_str(&format!("        <time>{}</time>\n", format_timestamp(point.time)?));

        if let Some(hr) = point.heart_rate {
            gpx.push_str("        <extensions>\n");
            gpx.push_str("          <gpxtpx:TrackPointExtension>\n");
            gpx.push_str(&format!("            <gpxtpx:hr>{hr}</gpxtpx:hr>\n"));
            gpx.push_str("          </gpxtpx:TrackPointExtension>\n");
            gpx.push_str("        </extensions>\n");
        }

        gpx.push_str("      </trkpt>\n");
    }

    gpx.push_str("    </trkseg>\n");
    gpx.push_str("  </trk>\n");
    gpx.push_str("</gpx>\n");

    Ok(gpx)
}

/// UTC ISO-8601 with millisecond precision, e.g. `2024-05-01T07:30:00.000Z`.
pub fn format_timestamp(instant: OffsetDateTime) -> Result<String, SynthError> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    Ok(instant.to_offset(UtcOffset::UTC).format(format)?)
}

/// Download filename for an export.
///
/// The run name is lower-cased, whitespace runs become `-` and anything else
/// outside `[a-z0-9_-]` is dropped. An empty result falls back to
/// `route-YYYYMMDD-HHMMSS.gpx` from `at`.
pub fn suggested_filename(run_name: &str, at: OffsetDateTime) -> String {
    let mut slug = String::with_capacity(run_name.len());
    let mut pending_dash = false;
    for c in run_name.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }

    if slug.is_empty() {
        let format = format_description!("[year][month][day]-[hour][minute][second]");
        let stamp = at.format(format).unwrap_or_else(|_| at.unix_timestamp().to_string());
        format!("route-{stamp}.gpx")
    } else {
        format!("{slug}.gpx")
    }
}

/// Escapes XML special characters in a string.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::{PaceSetting, PaceUnit};
    use crate::stats::FrozenDraws;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use time::macros::{date, datetime, time};

    fn square() -> Path {
        Path::new(vec![
            Coordinate::new(40.0, -105.0),
            Coordinate::new(40.0, -104.99),
            Coordinate::new(40.01, -104.99),
            Coordinate::new(40.01, -105.0),
            Coordinate::new(40.0, -105.0),
        ])
    }

    fn stats_for(path: &Path, inconsistency: f64, rng: &mut StdRng) -> RouteStatistics {
        RouteStatistics::recompute(
            path,
            &PaceSetting::new(5.0, PaceUnit::MinPerKm, inconsistency),
            &mut FrozenDraws::new(),
            &ElevationSynthesizer::default(),
            rng,
        )
    }

    fn fixed_options() -> ExportOptions {
        ExportOptions {
            name: "Morning Loop".to_string(),
            description: "Easy & steady".to_string(),
            date: Some(date!(2024 - 05 - 01)),
            start_time: Some(time!(07:30)),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = TrackSynthesizer::default().build(
            &Path::empty(),
            &RouteStatistics::reset(),
            &fixed_options(),
            &mut rng,
        );
        assert!(matches!(result, Err(SynthError::EmptyRoute)));
    }

    #[test]
    fn test_single_point_has_zero_elapsed_time() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = Path::new(vec![Coordinate::new(40.0, -105.0)]);
        let stats = stats_for(&path, 0.0, &mut rng);
        let start = datetime!(2024-05-01 07:30 UTC);
        let points = TrackSynthesizer::default()
            .track_points(&path, &stats, ActivityType::Run, false, start, &mut rng)
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, start);

        let gpx = TrackSynthesizer::default()
            .build(&path, &stats, &fixed_options(), &mut rng)
            .unwrap();
        assert_eq!(gpx.matches("<trkpt ").count(), 1);
    }

    #[test]
    fn test_last_point_lands_on_duration() {
        let mut rng = StdRng::seed_from_u64(3);
        let path = square();
        let stats = stats_for(&path, 75.0, &mut rng);
        let start = datetime!(2024-05-01 07:30 UTC);
        let points = TrackSynthesizer::default()
            .track_points(&path, &stats, ActivityType::Run, false, start, &mut rng)
            .unwrap();

        let elapsed = (points[4].time - points[0].time).as_seconds_f64();
        assert!((elapsed - stats.duration_seconds).abs() <= 1e-3);
        assert!(points.windows(2).all(|w| w[1].time > w[0].time));
        for (point, expected) in points.iter().zip(stats.elevation_profile.samples()) {
            assert_eq!(point.elevation, *expected);
        }
    }

    #[test]
    fn test_heart_rate_within_band() {
        let mut rng = StdRng::seed_from_u64(9);
        let path = square();
        let stats = stats_for(&path, 0.0, &mut rng);
        let start = datetime!(2024-05-01 07:30 UTC);
        for activity in [ActivityType::Run, ActivityType::Bike] {
            let (lo, hi) = activity.heart_rate_range();
            for _ in 0..50 {
                let points = TrackSynthesizer::default()
                    .track_points(&path, &stats, activity, true, start, &mut rng)
                    .unwrap();
                for point in points {
                    let hr = point.heart_rate.unwrap();
                    assert!((lo..=hi).contains(&hr), "{hr} outside {lo}..={hi}");
                }
            }
        }
    }

    #[test]
    fn test_document_envelope() {
        let mut rng = StdRng::seed_from_u64(5);
        let path = square();
        let stats = stats_for(&path, 0.0, &mut rng);
        let options = ExportOptions {
            activity: ActivityType::Bike,
            include_heart_rate: true,
            ..fixed_options()
        };
        let gpx = TrackSynthesizer::default()
            .build(&path, &stats, &options, &mut rng)
            .unwrap();

        assert!(gpx.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(gpx.contains(r#"version="1.1""#));
        assert!(gpx.contains(r#"xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1""#));
        assert!(gpx.contains("<name>Morning Loop</name>"));
        assert!(gpx.contains("<desc>Easy &amp; steady</desc>"));
        assert!(gpx.contains("<time>2024-05-01T07:30:00.000Z</time>"));
        assert!(gpx.contains("<type>Biking</type>"));
        assert!(gpx.contains(r#"<trkpt lat="40.0000000" lon="-105.0000000">"#));
        assert_eq!(gpx.matches("<trkpt ").count(), 5);
        assert_eq!(gpx.matches("<gpxtpx:hr>").count(), 5);
        assert!(gpx.trim_end().ends_with("</gpx>"));
    }

    #[test]
    fn test_document_without_optional_parts() {
        let mut rng = StdRng::seed_from_u64(5);
        let path = square();
        let stats = stats_for(&path, 0.0, &mut rng);
        let options = ExportOptions {
            name: "   ".to_string(),
            description: String::new(),
            ..fixed_options()
        };
        let gpx = TrackSynthesizer::default()
            .build(&path, &stats, &options, &mut rng)
            .unwrap();
        assert!(gpx.contains("<name>My Running Route</name>"));
        assert!(gpx.contains("<type>Running</type>"));
        assert!(gpx.contains("<desc></desc>"));
        assert!(!gpx.contains("<extensions>"));
    }

    #[test]
    fn test_elevation_has_two_decimals() {
        let mut rng = StdRng::seed_from_u64(5);
        let path = square();
        let stats = stats_for(&path, 0.0, &mut rng);
        let gpx = TrackSynthesizer::default()
            .build(&path, &stats, &fixed_options(), &mut rng)
            .unwrap();
        let first = format!("<ele>{:.2}</ele>", stats.elevation_profile.samples()[0]);
        assert!(gpx.contains(&first));
    }

    #[test]
    fn test_stale_stats_fall_back_to_fresh_profile() {
        let mut rng = StdRng::seed_from_u64(5);
        let path = square();
        let points = TrackSynthesizer::default()
            .track_points(
                &path,
                &RouteStatistics::reset(),
                ActivityType::Run,
                false,
                datetime!(2024-05-01 07:30 UTC),
                &mut rng,
            )
            .unwrap();
        assert_eq!(points.len(), 5);
        let expected = pace::total_duration_seconds(path.length_km(), DEFAULT_PACE_MIN_PER_KM);
        let elapsed = (points[4].time - points[0].time).as_seconds_f64();
        assert!((elapsed - expected).abs() <= 1e-3);
    }

    #[test]
    fn test_start_instant_combines_local_date_and_time() {
        let now = datetime!(2024-06-10 12:00 UTC);
        let options = ExportOptions {
            date: Some(date!(2024 - 05 - 01)),
            start_time: Some(time!(07:30)),
            utc_offset: UtcOffset::from_hms(2, 0, 0).unwrap(),
            ..Default::default()
        };
        assert_eq!(options.start_instant(now), datetime!(2024-05-01 05:30 UTC));

        let only_time = ExportOptions {
            start_time: Some(time!(06:00)),
            ..Default::default()
        };
        assert_eq!(only_time.start_instant(now), datetime!(2024-06-10 06:00 UTC));
        assert_eq!(ExportOptions::default().start_instant(now), now);
    }

    #[test]
    fn test_suggested_filename() {
        let at = datetime!(2024-05-01 07:30:15 UTC);
        assert_eq!(suggested_filename("Morning  Loop Run", at), "morning-loop-run.gpx");
        assert_eq!(suggested_filename("Café <5k>", at), "caf-5k.gpx");
        assert_eq!(suggested_filename("", at), "route-20240501-073015.gpx");
        assert_eq!(suggested_filename("!!!", at), "route-20240501-073015.gpx");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml("Test & <Activity> \"Name\""),
            "Test &amp; &lt;Activity&gt; &quot;Name&quot;"
        );
    }
}
