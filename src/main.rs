use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use track_synth_rs::resume::{last_record_in_file, resume_state};
use track_synth_rs::sink::{OutputOptions, OutputPaths, TrackWriter};
use track_synth_rs::stats::TrackStats;
use track_synth_rs::waypoints::{load_waypoints, plan_legs};
use track_synth_rs::wire::NmeaClock;
use track_synth_rs::{Frame, MotionState, Sample, SpeedBand, SpeedMode, SynthConfig, Synthesizer};

#[derive(Parser, Debug)]
#[command(name = "track_synth")]
#[command(about = "Synthetic GPS track generator - CSV records, NMEA GGA/RMC and KML", long_about = None)]
struct Args {
    /// Waypoint CSV with longitude, latitude and optional mode columns
    #[arg(short, long, value_name = "CSV")]
    waypoints: PathBuf,

    /// Frame of the waypoint coordinates (wgs84, gcj02, bd09)
    #[arg(short, long, default_value = "gcj02")]
    frame: Frame,

    /// Custom speed band in m/s ("10-15" or "15"), overrides every waypoint mode
    #[arg(short, long, value_parser = SpeedBand::parse)]
    speed: Option<SpeedBand>,

    /// Mode for legs whose waypoints name none (1-4 or walk/jog/run/drive)
    #[arg(short, long, default_value = "walk")]
    mode: SpeedMode,

    /// Output base name
    #[arg(short, long, default_value = "trajectory")]
    output: String,

    /// Write GPRMC sentences
    #[arg(short = 'c', long)]
    gprmc: bool,

    /// Write GPGGA sentences
    #[arg(short = 'a', long)]
    gpgga: bool,

    /// Write a KML document of this run
    #[arg(long)]
    kml: bool,

    /// Skip the tabular record file (disables resumption)
    #[arg(long)]
    no_csv: bool,

    /// Truncate existing outputs before writing
    #[arg(short = 'x', long)]
    clear: bool,

    /// Seed for a reproducible track
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds between samples
    #[arg(long)]
    cadence: Option<f64>,

    /// JSON synthesis config
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SynthConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SynthConfig::default(),
    };
    // Nothing on disk is touched until the effective config is known to be valid
    let config = config
        .with_overrides(args.cadence, args.seed)
        .context("Invalid synthesis config")?;
    let mut synth = Synthesizer::from_config(config).context("Invalid synthesis config")?;

    let options = OutputOptions {
        records: !args.no_csv,
        gga: args.gpgga,
        rmc: args.gprmc,
        kml: args.kml,
    };
    if !(options.records || options.gga || options.rmc || options.kml) {
        bail!("No outputs enabled");
    }
    let paths = OutputPaths::new(&args.output);

    let waypoints = load_waypoints(&args.waypoints, args.frame)
        .with_context(|| format!("Failed to read waypoints from {}", args.waypoints.display()))?;
    if waypoints.is_empty() {
        bail!("{} contains no waypoints", args.waypoints.display());
    }
    info!("Loaded {} waypoints ({} -> WGS-84)", waypoints.len(), args.frame);

    if args.clear {
        paths.clear(&options).context("Failed to clear outputs")?;
    }

    let default_altitude = synth.config().altitude.default_m;
    let resumed = if options.records {
        last_record_in_file(&paths.records, default_altitude)
    } else {
        None
    };
    let state = match &resumed {
        Some(record) => resume_state(record).context("Invalid resume record")?,
        None => MotionState::new(waypoints[0].position, default_altitude),
    };

    let legs = plan_legs(
        &waypoints,
        args.speed,
        args.mode,
        resumed.as_ref().map(|_| state.position),
    );
    match args.speed {
        Some(band) => info!("Custom speed band {}", band),
        None => info!("Default mode {:?} ({})", args.mode, args.mode.band()),
    }
    if legs.is_empty() {
        warn!("A single waypoint yields no legs; only the start fix is written");
    }

    let clock = NmeaClock::resumed(Utc::now(), state.elapsed_time);
    let mut writer = TrackWriter::open(&paths, &options, clock).context("Failed to open outputs")?;
    let mut stats = TrackStats::starting_at(state.position, state.elapsed_time);
    stats.legs = legs.len();

    if resumed.is_none() {
        writer.write_start(&Sample {
            elapsed_time: state.elapsed_time,
            position: state.position,
            altitude: state.altitude,
            speed: 0.0,
            heading: 0.0,
        })?;
    }

    let end = synth
        .synthesize_track(&legs, state, |sample| {
            stats.record(sample);
            writer.write(sample)
        })
        .context("Track synthesis failed")?;
    writer.finish().context("Failed to finalize outputs")?;
    stats
        .save(&paths.summary)
        .with_context(|| format!("Failed to write {}", paths.summary.display()))?;

    println!("\n=== Track Summary ===");
    println!("  Legs:       {}", stats.legs);
    println!("  Samples:    {}", stats.samples);
    println!("  Distance:   {:.1} m", stats.distance_m);
    println!("  Duration:   {:.1} s (T={:.1}s at end)", stats.duration_s(), end.elapsed_time);
    println!("  Avg speed:  {:.2} m/s", stats.average_speed_ms());
    println!("  Peak speed: {:.2} m/s", stats.peak_speed_ms);
    println!("  End:        {} alt {:.3} m", end.position, end.altitude);

    Ok(())
}
