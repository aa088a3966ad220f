use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use serde::Serialize;

use sensor_oxide::aggregate::{ChartKind, bucket_count, select_interval};
use sensor_oxide::constants::config::CONFIG_FILE;
use sensor_oxide::data::{Reading, ReadingSource, TimeWindow, parse_timestamp_ms};
use sensor_oxide::error::{EngineError, Result};
use sensor_oxide::gaps::GapSynthesizer;
use sensor_oxide::pipeline::{AggregationRequest, aggregate};
use sensor_oxide::{EngineConfig, weekly_heatmap};

#[derive(Parser, Debug)]
#[command(version, about = "Downsample sensor readings for dashboards", long_about = None)]
struct Cli {
    /// Engine config JSON (defaults apply when omitted)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the bucket width chosen for a window
    Interval(IntervalArgs),
    /// Bucket a sensor series into dashboard datapoints
    Aggregate(AggregateArgs),
    /// Weekly heatmap of daily means for one year
    Heatmap(HeatmapArgs),
    /// Write a config file with default values
    InitConfig {
        #[arg(default_value = CONFIG_FILE, value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindOpt {
    Timeseries,
    Barchart,
}

impl From<KindOpt> for ChartKind {
    fn from(kind: KindOpt) -> Self {
        match kind {
            KindOpt::Timeseries => ChartKind::Timeseries,
            KindOpt::Barchart => ChartKind::Barchart,
        }
    }
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Window start (RFC 3339 or `YYYY-MM-DD HH:MM:SS`, UTC)
    #[arg(long, value_parser = parse_instant)]
    start: DateTime<Utc>,

    /// Window end, exclusive
    #[arg(long, value_parser = parse_instant)]
    end: DateTime<Utc>,

    /// Native sampling period in seconds
    #[arg(long)]
    period: f64,

    #[arg(long, value_enum, default_value_t = KindOpt::Timeseries)]
    kind: KindOpt,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// CSV or Parquet file with raw readings
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    #[arg(long, default_value = "timestamp")]
    time_column: String,

    #[arg(long, default_value = "valor")]
    value_column: String,

    /// Keep rows whose equipment id column equals this
    #[arg(long)]
    equipment_id: Option<i64>,

    #[arg(long, default_value = "id_equipo")]
    equipment_column: String,

    /// Keep rows whose variable id column equals this
    #[arg(long)]
    variable_id: Option<i64>,

    #[arg(long, default_value = "id_variable")]
    variable_column: String,
}

#[derive(Args, Debug)]
struct IntervalArgs {
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    window: WindowArgs,

    /// Label attached to every output record
    #[arg(long)]
    equipment: Option<String>,

    /// Carve synthetic dropout gaps before aggregating (demo only)
    #[arg(long, action = ArgAction::SetTrue)]
    gaps: bool,

    /// Seed for --gaps (ignored without it)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct HeatmapArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Calendar year (defaults to the current one)
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Serialize)]
struct IntervalReport {
    kind: ChartKind,
    width_secs: f64,
    buckets: usize,
}

fn parse_instant(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp_ms(raw)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| format!("unrecognised timestamp: {raw}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    #[cfg(feature = "profile-with-puffin")]
    let _puffin_server = start_puffin_server();

    let stdout = io::stdout();
    match run(cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("{}: {}", e.title(), e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Serve profiling scopes to an external puffin_viewer
#[cfg(feature = "profile-with-puffin")]
fn start_puffin_server() -> Option<puffin_http::Server> {
    let addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
    match puffin_http::Server::new(&addr) {
        Ok(server) => {
            puffin::set_scopes_on(true);
            log::info!("puffin server on {addr}");
            Some(server)
        }
        Err(e) => {
            log::warn!("puffin server failed to start: {e}");
            None
        }
    }
}

fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let result = match cli.command {
        Command::Interval(args) => handle_interval(args, out),
        Command::Aggregate(args) => handle_aggregate(args, &config, out),
        Command::Heatmap(args) => handle_heatmap(args, out),
        Command::InitConfig { path } => {
            config.save(&path)?;
            log::info!("wrote {}", path.display());
            Ok(())
        }
    };
    profiling::finish_frame!();
    result
}

fn handle_interval<W: Write>(args: IntervalArgs, out: &mut W) -> Result<()> {
    let window = TimeWindow::new(args.window.start, args.window.end);
    let kind = ChartKind::from(args.window.kind);
    let width_secs = select_interval(kind, args.window.period, &window)?;
    print_json(
        out,
        &IntervalReport {
            kind,
            width_secs,
            buckets: bucket_count(&window, width_secs),
        },
    )
}

fn handle_aggregate<W: Write>(
    args: AggregateArgs,
    config: &EngineConfig,
    out: &mut W,
) -> Result<()> {
    let mut readings = load_readings(&args.source)?;

    if args.gaps {
        let mut synthesizer = match args.seed {
            Some(seed) => GapSynthesizer::seeded(seed),
            None => GapSynthesizer::from_entropy(),
        }
        .with_max_attempts(config.gap_max_attempts);
        let (pruned, gaps) = synthesizer.synthesize(&readings)?;
        log::info!("removed {} gaps, {} readings left", gaps.len(), pruned.len());
        readings = pruned;
    }

    let request = AggregationRequest {
        window: TimeWindow::new(args.window.start, args.window.end),
        native_period_secs: args.window.period,
        kind: args.window.kind.into(),
        equipment: args.equipment,
    };
    let result = aggregate(&request, &readings, config)?;
    print_json(out, &result.points)
}

fn handle_heatmap<W: Write>(args: HeatmapArgs, out: &mut W) -> Result<()> {
    let readings = load_readings(&args.source)?;
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    print_json(out, &weekly_heatmap(&readings, year))
}

fn load_readings(args: &SourceArgs) -> Result<Vec<Reading>> {
    let mut source = ReadingSource::load(&args.input)?;
    if let Some(id) = args.equipment_id {
        source.filter_eq(&args.equipment_column, id)?;
    }
    if let Some(id) = args.variable_id {
        source.filter_eq(&args.variable_column, id)?;
    }
    log::debug!("{} rows after filters", source.height());

    let readings = source.readings(&args.time_column, &args.value_column)?;
    if readings.is_empty() {
        return Err(EngineError::EmptySeries);
    }
    log::debug!("{} readings from {}", readings.len(), args.input.display());
    Ok(readings)
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::{Builder, NamedTempFile};

    /// Two hours of minute readings for equipment 1 from Monday 2024-03-04,
    /// interleaved with readings of equipment 2 that must be filtered out
    fn sensor_csv() -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "timestamp,id_equipo,id_variable,valor").unwrap();
        for i in 0..120 {
            let stamp = format!("2024-03-04 {:02}:{:02}:00", i / 60, i % 60);
            writeln!(file, "{stamp},1,7,{}", i % 10).unwrap();
            writeln!(file, "{stamp},2,7,1000").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn run_json(args: &[&str]) -> Result<serde_json::Value> {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(serde_json::from_slice(&out).unwrap())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_aggregate_args() {
        let cli = Cli::try_parse_from([
            "sensor-oxide",
            "aggregate",
            "data.csv",
            "--start",
            "2024-03-01T00:00:00Z",
            "--end",
            "2024-03-08 00:00:00",
            "--period",
            "60",
            "--kind",
            "barchart",
            "--equipment-id",
            "3",
            "--gaps",
            "--seed",
            "9",
        ])
        .unwrap();

        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.source.equipment_id, Some(3));
        assert_eq!(args.source.value_column, "valor");
        assert_eq!(args.seed, Some(9));
        assert_eq!(ChartKind::from(args.window.kind), ChartKind::Barchart);
        assert_eq!(
            args.window.end - args.window.start,
            chrono::Duration::days(7)
        );
    }

    #[test]
    fn test_interval_command() {
        let json = run_json(&[
            "sensor-oxide",
            "interval",
            "--start",
            "2024-03-01T00:00:00Z",
            "--end",
            "2024-03-08T00:00:00Z",
            "--period",
            "60",
        ])
        .unwrap();
        assert_eq!(json["kind"], "timeseries");
        assert_eq!(json["width_secs"], 1_800.0);
        assert_eq!(json["buckets"], 336);
    }

    #[test]
    fn test_aggregate_command_with_seeded_gaps() {
        let file = sensor_csv();
        let path = file.path().to_str().unwrap();
        let args = [
            "sensor-oxide",
            "aggregate",
            path,
            "--start",
            "2024-03-04T00:00:00Z",
            "--end",
            "2024-03-04T02:00:00Z",
            "--period",
            "60",
            "--equipment-id",
            "1",
            "--variable-id",
            "7",
            "--equipment",
            "Boiler 1",
            "--gaps",
            "--seed",
            "5",
        ];

        let json = run_json(&args).unwrap();
        let points = json.as_array().unwrap();
        assert_eq!(points.len(), 120);
        assert_eq!(points[0]["equipment"], "Boiler 1");
        assert_eq!(points[61]["time"], "2024-03-04T01:01:00.000Z");

        let nulls = points.iter().filter(|p| p["value"].is_null()).count();
        assert!((1..=4).contains(&nulls), "{nulls} nulls");
        for (i, point) in points.iter().enumerate() {
            if let Some(v) = point["value"].as_f64() {
                assert_eq!(v, (i % 10) as f64);
            }
        }

        // Same seed, same output
        assert_eq!(run_json(&args).unwrap(), json);
    }

    #[test]
    fn test_heatmap_command() {
        let file = sensor_csv();
        let json = run_json(&[
            "sensor-oxide",
            "heatmap",
            file.path().to_str().unwrap(),
            "--equipment-id",
            "1",
            "--year",
            "2024",
        ])
        .unwrap();

        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Week"], 10);
        assert_eq!(rows[0]["Monday"], 4.5);
        assert!(rows[0]["Tuesday"].is_null());
    }

    #[test]
    fn test_filtered_out_equipment_is_empty() {
        let file = sensor_csv();
        let result = run_json(&[
            "sensor-oxide",
            "heatmap",
            file.path().to_str().unwrap(),
            "--equipment-id",
            "9",
        ]);
        assert!(matches!(result, Err(EngineError::EmptySeries)));
    }

    #[test]
    fn test_init_config_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let cli =
            Cli::try_parse_from(["sensor-oxide", "init-config", path.to_str().unwrap()]).unwrap();
        run(cli, &mut Vec::new()).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_bad_instant() {
        assert!(parse_instant("next tuesday").is_err());
    }
}
