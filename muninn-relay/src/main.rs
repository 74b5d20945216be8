#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use muninn_relay_core::{
    capture, config, CaptureMode, CaptureState, LiveSource, OfflineSource,
};

/// Receive-side packet reassembly core for a one-way data-over-WiFi link.
#[derive(Parser, Debug)]
#[command(author, version, about = "muninn-relay WiFi frame reassembly receiver")]
struct Cli {
    /// Path to the receiver configuration TOML file.
    #[arg(short, long, value_name = "FILE", default_value = "config/receiver.toml")]
    config: PathBuf,

    /// Live capture interface (monitor mode). Mutually exclusive with --offline.
    #[arg(long, value_name = "IFACE", conflicts_with = "offline")]
    device: Option<String>,

    /// Replay frames from a pcap savefile instead of a live device.
    #[arg(long, value_name = "FILE", conflicts_with = "device")]
    offline: Option<PathBuf>,

    /// Destination for reassembled bytes. Defaults to stdout.
    #[arg(long, value_name = "FILE")]
    sink: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let cfg = match config::load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let mode = if cli.device.is_some() { CaptureMode::Live } else { CaptureMode::Offline };

    let stop = capture::stop_flag();
    let stop_for_handler = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("received interrupt, stopping capture");
        capture::request_stop(&stop_for_handler);
    }) {
        error!(%err, "failed to install interrupt handler");
        return ExitCode::FAILURE;
    }

    let stats = match (&cli.device, &cli.offline) {
        (Some(device), _) => match LiveSource::open(device, &cfg) {
            Ok(source) => run_with_sink(source, cfg, mode, &cli.sink, stop),
            Err(err) => {
                error!(%err, device = %device, "failed to open live capture source");
                return ExitCode::FAILURE;
            }
        },
        (None, Some(path)) => match OfflineSource::open(path) {
            Ok(source) => run_with_sink(source, cfg, mode, &cli.sink, stop),
            Err(err) => {
                error!(%err, path = %path.display(), "failed to open offline capture");
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            error!("one of --device or --offline must be given");
            return ExitCode::FAILURE;
        }
    };

    let stats = match stats {
        Ok(stats) => stats,
        Err(err) => {
            error!(%err, "capture loop failed to run");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{json}"),
        Err(err) => error!(%err, "failed to serialize capture statistics"),
    }

    if stats.capture_state == CaptureState::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_with_sink<S: capture::CaptureSource>(
    source: S,
    cfg: config::ReceiverConfig,
    mode: CaptureMode,
    sink_path: &Option<PathBuf>,
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> io::Result<muninn_relay_core::CaptureStatistics> {
    let sink: Box<dyn Write> = match sink_path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    Ok(capture::run(source, cfg, mode, sink, stop))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}
