//! Command-line front end for route synthesis.
//!
//! Run with:
//! ```
//! cargo run -p route-synth -- shape --shape loop --lat 40.015 --lon -105.27 --distance-km 5
//! cargo run -p route-synth -- convert ride.gpx --activity bike --pace 2.8 --heart-rate
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use route_synth::prelude::*;
use time::macros::format_description;
use time::{Date, Time, UtcOffset};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthesize timestamped GPX tracks from routes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a procedural route around a start point and export it
    Shape(ShapeArgs),
    /// Re-time the vertices of an existing GPX file
    Convert(ConvertArgs),
    /// Snap a GPX route to roads with OSRM, then export it
    Snap(ConvertArgs),
}

#[derive(Args, Debug)]
struct ShapeArgs {
    /// Template: loop, square, triangle, out-and-back, figure8, wander
    #[arg(long, default_value = "loop")]
    shape: Shape,

    /// Start latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Start longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Target route length in km
    #[arg(long, default_value_t = 5.0)]
    distance_km: f64,

    /// Vertex spacing in meters
    #[arg(long, default_value_t = 25.0)]
    spacing_m: f64,

    /// Clockwise rotation of the template in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotation: f64,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// GPX file whose track or route vertices form the path
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Pace in the selected unit (config value when omitted)
    #[arg(long)]
    pace: Option<String>,

    /// Pace unit: min/km or min/mile
    #[arg(long)]
    unit: Option<PaceUnit>,

    /// Per-segment pace variance, 0 to 100
    #[arg(long)]
    inconsistency: Option<String>,

    /// Activity type: run or bike
    #[arg(long)]
    activity: Option<ActivityType>,

    /// Run name
    #[arg(long, default_value = "")]
    name: String,

    /// Track description
    #[arg(long, default_value = "")]
    description: String,

    /// Local start date, YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,

    /// Local start time, HH:MM or HH:MM:SS
    #[arg(long)]
    time: Option<String>,

    /// Include synthetic heart rate
    #[arg(long, action = ArgAction::SetTrue)]
    heart_rate: bool,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Output path (`-` for stdout, derived from the run name when omitted)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Shape(args) => {
            let (mut session, config) = open_session(&args.export)?;
            let start = Coordinate::new(args.lat, args.lon);
            let path = ShapeGenerator::new(start)
                .with_distance_km(args.distance_km)
                .with_spacing_m(args.spacing_m)
                .with_rotation_deg(args.rotation)
                .generate(args.shape, &mut rand::thread_rng());
            info!(shape = ?args.shape, points = path.len(), "generated route");
            session.on_path_replaced(path);
            export(&mut session, &config, &args.export)
        }
        Command::Convert(args) => {
            let (mut session, config) = open_session(&args.export)?;
            let path = GpxLoader::load_file(&args.input)
                .with_context(|| format!("loading {}", args.input.display()))?;
            session.on_path_replaced(path);
            export(&mut session, &config, &args.export)
        }
        Command::Snap(args) => {
            let (mut session, config) = open_session(&args.export)?;
            let path = GpxLoader::load_file(&args.input)
                .with_context(|| format!("loading {}", args.input.display()))?;
            session.on_path_replaced(path);

            let request = session.begin_snap()?;
            let client = RoadSnapClient::new().with_endpoint(config.osrm_endpoint.clone());
            let result = client.snap(&request.path, request.activity).await;
            match session.on_snap_resolved(request.ticket, result) {
                SnapOutcome::Applied => info!(points = session.path().len(), "route snapped to roads"),
                SnapOutcome::Stale => {}
                SnapOutcome::Failed(e) => warn!("keeping drawn route: {e}"),
            }
            export(&mut session, &config, &args.export)
        }
    }
}

/// Builds a session from the config file, environment and flags.
fn open_session(args: &ExportArgs) -> Result<(RouteSession, SynthConfig)> {
    let mut config = match &args.config {
        Some(path) => SynthConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SynthConfig::default(),
    }
    .with_env_overrides();
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let mut session = RouteSession::new(&config);
    let activity = args.activity.unwrap_or(config.activity);
    session.on_parameter_changed(ParameterChange::Activity(activity));

    let unit = args.unit.unwrap_or(config.pace_unit);
    let current = session.pace().with_unit(unit);
    let pace = args.pace.clone().unwrap_or_else(|| current.value().to_string());
    let inconsistency = args
        .inconsistency
        .clone()
        .unwrap_or_else(|| current.inconsistency_pct().to_string());
    session.on_parameter_changed(ParameterChange::Setting(PaceSetting::parse(
        &pace,
        unit,
        &inconsistency,
    )));

    Ok((session, config))
}

fn export(session: &mut RouteSession, config: &SynthConfig, args: &ExportArgs) -> Result<()> {
    let options = ExportOptions {
        name: args.name.clone(),
        description: args.description.clone(),
        activity: session.activity(),
        date: args.date.as_deref().map(parse_date).transpose()?,
        start_time: args.time.as_deref().map(parse_time).transpose()?,
        utc_offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        include_heart_rate: args.heart_rate,
        creator: config.creator.clone(),
    };

    let export = session.on_export_requested(&options)?;
    eprintln!("{}", session.display());

    match args.output.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            io::stdout().write_all(export.document.as_bytes())?;
        }
        output => {
            let path = output
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(&export.filename));
            std::fs::write(&path, &export.document)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn parse_date(text: &str) -> Result<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {text:?}, expected YYYY-MM-DD"))
}

fn parse_time(text: &str) -> Result<Time> {
    let text = text.trim();
    if let Ok(time) = Time::parse(text, format_description!("[hour]:[minute]:[second]")) {
        return Ok(time);
    }
    match Time::parse(text, format_description!("[hour]:[minute]")) {
        Ok(time) => Ok(time),
        Err(_) => bail!("invalid start time {text:?}, expected HH:MM or HH:MM:SS"),
    }
}
