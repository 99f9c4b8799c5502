//! CLI entry point: rebuilds the stop schedule data set from a GTFS feed.

use anyhow::Result;
use clap::Parser;
use gtfs_stop_schedules::pipeline::{RunConfig, run};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_stop_schedules")]
#[command(about = "Builds per-stop schedules and service calendars from a static GTFS feed", long_about = None)]
struct Cli {
    /// Directory containing the GTFS .txt files
    #[arg(long, default_value = "gtfs")]
    gtfs_dir: PathBuf,

    /// Directory to write services.json, stops.json and stops/ into
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_stop_schedules.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_stop_schedules.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    run(&RunConfig {
        gtfs_dir: cli.gtfs_dir,
        data_dir: cli.data_dir,
    })?;

    Ok(())
}
