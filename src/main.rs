//! # HiSKY RX
//!
//! Host-side HiSKY receiver.
//!
//! Plays a recorded air capture through the receiver core and forwards the
//! decoded channels to a flight controller as CRSF.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration, set up logging
//!    - Load the capture and the stored binding
//!    - Open the CRSF serial port and telemetry log if enabled
//!
//! 2. **Main Loop**
//!    - Tick the receiver every `tick_interval_us`
//!    - Send CRSF frames at `packet_rate_hz` while the link is up
//!    - Write a telemetry record every `log_interval_ms`
//!    - Stop on Ctrl+C, or once a non-looping capture has played out
//!
//! # Usage
//!
//! ```bash
//! hisky-rx [config.toml] [--unbind]
//! ```

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use hisky_rx::config::{Config, LoggingConfig};
use hisky_rx::link::ProtocolState;
use hisky_rx::output::CrsfOutput;
use hisky_rx::radio::replay::{load_capture, ReplayRadio};
use hisky_rx::receiver::Receiver;
use hisky_rx::storage::FileStore;
use hisky_rx::telemetry::{LinkRecord, TelemetryLogger};

/// Configuration used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Command line options
#[derive(Debug, PartialEq, Eq)]
struct Args {
    config: PathBuf,
    unbind: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut config = None;
    let mut unbind = false;

    for arg in args {
        match arg.as_str() {
            "--unbind" => unbind = true,
            flag if flag.starts_with('-') => bail!("unknown option: {}", flag),
            path if config.is_none() => config = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument: {}", extra),
        }
    }

    Ok(Args {
        config: config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        unbind,
    })
}

/// Split a log file path into the appender's directory and file prefix
fn split_log_path(file: &str) -> (PathBuf, String) {
    let path = Path::new(file);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map_or_else(|| "hisky-rx.log".to_string(), |n| n.to_string_lossy().into_owned());
    (dir, prefix)
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard must be held
/// for the lifetime of the program when a log file is configured.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = if logging.file.is_empty() {
        (None, None)
    } else {
        let (dir, prefix) = split_log_path(&logging.file);
        let appender = tracing_appender::rolling::daily(dir, prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let _log_guard = init_logging(&config.logging);
    info!("HiSKY RX v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let capture = load_capture(&config.replay.capture)
        .with_context(|| format!("loading capture {}", config.replay.capture))?;
    info!("Replaying {} packets from {}", capture.len(), config.replay.capture);
    let radio = ReplayRadio::new(capture, config.replay.loop_capture);

    let store = FileStore::new(&config.storage.path);
    let mut receiver = Receiver::new(radio, store, config.to_receiver_config());

    if args.unbind {
        info!("Unbinding as requested");
        receiver.reset();
    }

    let mut output = if config.output.enabled {
        Some(CrsfOutput::open_with_paths(&[config.output.port.as_str()], config.output.baud_rate)?)
    } else {
        None
    };

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?)
    } else {
        None
    };

    let mut tick_interval = interval(config.tick_interval());
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let output_period = Duration::from_micros(1_000_000 / u64::from(config.output.packet_rate_hz));
    let mut output_interval = interval(output_period);
    output_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut telemetry_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));

    info!("Receiver running, press Ctrl+C to exit");

    let start = Instant::now();
    let mut last_state = receiver.state();
    let mut was_online = false;

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let now = start.elapsed();
                receiver.radio_mut().advance(now);
                receiver.tick(now);

                let state = receiver.state();
                if state != last_state {
                    debug!("State {} -> {}", last_state.name(), state.name());
                    last_state = state;
                }

                let online = receiver.online();
                if online != was_online {
                    if online {
                        info!("Link up");
                    } else {
                        warn!("Link lost after {} frames", receiver.frames_received());
                    }
                    was_online = online;
                }

                if receiver.radio().is_finished() && !online && state != ProtocolState::Bound {
                    info!("Capture played out");
                    break;
                }
            }

            _ = output_interval.tick(), if output.is_some() => {
                if let Some(out) = output.as_mut() {
                    // Silent while offline so the flight controller fails safe
                    if receiver.online() {
                        if let Err(e) = out.send_channels(receiver.values()).await {
                            warn!("Failed to send CRSF frame: {}", e);
                        }
                    }
                }
            }

            _ = telemetry_interval.tick(), if telemetry.is_some() => {
                if let Some(logger) = telemetry.as_mut() {
                    let record = LinkRecord::sample(&receiver, chrono::Utc::now())
                        .with_replay(receiver.radio().stats());
                    if let Err(e) = logger.log(&record) {
                        warn!("Failed to write telemetry: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = receiver.radio().stats();
    info!(
        "Frames decoded: {}, packets received: {}, missed: {}, overflowed: {}",
        receiver.frames_received(),
        stats.received,
        stats.missed,
        stats.overflowed
    );
    if let Some(out) = &output {
        info!("CRSF frames sent on {}: {}", out.device_path(), out.frames_sent());
    }

    Ok(())
}
