//! # Ground Station
//!
//! Receives balloon/rover telemetry over serial (or from a captured file),
//! assembles records and reports derived positions on the console.
//!
//! # Console
//!
//! | Input | Effect |
//! |-------|--------|
//! | `open`, `close` | send the request to the flying unit |
//! | `status` | print the latest derived values |
//! | `tail` | print the last raw lines |
//! | `missing` | list missing frame indices |
//! | `station <n> <x> <y> <z>` | move a ground station |
//! | `rssi <n> <dbm>` | set a station's one-meter RSSI |

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use nalgebra::Vector3;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ground_station::config::{Config, LogConfig};
use ground_station::serial::{Command, TelemetryLink};
use ground_station::series::channels::missing_indices;
use ground_station::station::{Dashboard, Station};
use ground_station::telemetry::capture::RawCapture;

/// Seconds between periodic status log messages
const REPORT_INTERVAL_S: u64 = 10;

/// Ground station telemetry receiver
#[derive(Debug, Parser)]
#[command(name = "ground-station", version, about)]
struct Args {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device, overrides the configured port
    #[arg(short, long)]
    port: Option<String>,

    /// Replay a captured log instead of opening the serial port
    #[arg(short, long, value_name = "FILE")]
    replay: Option<PathBuf>,
}

/// Operator console input
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Request(Command),
    Status,
    Tail,
    Missing,
    MoveStation(usize, Vector3<f64>),
    SetOneMeterRssi(usize, f64),
}

fn parse_console(line: &str) -> Option<ConsoleCommand> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let numbers = |from: usize| -> Option<Vec<f64>> {
        words.get(from..)?.iter().map(|w| w.parse().ok()).collect()
    };

    match words.as_slice() {
        [word] => match *word {
            "status" => Some(ConsoleCommand::Status),
            "tail" => Some(ConsoleCommand::Tail),
            "missing" => Some(ConsoleCommand::Missing),
            other => Command::from_name(other).map(ConsoleCommand::Request),
        },
        ["station", n, _, _, _] => {
            let c = numbers(2)?;
            Some(ConsoleCommand::MoveStation(n.parse().ok()?, Vector3::new(c[0], c[1], c[2])))
        }
        ["rssi", n, _] => {
            let c = numbers(2)?;
            Some(ConsoleCommand::SetOneMeterRssi(n.parse().ok()?, c[0]))
        }
        _ => None,
    }
}

/// Install the stdout subscriber plus the daily diagnostics file when enabled
fn init_logging(log: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    if log.enabled {
        let appender = tracing_appender::rolling::daily(&log.dir, "ground-station.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}

/// Main entry point for the ground station
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Open the serial port (or the replay file) and the raw capture file
///
/// 2. **Main Loop**
///    - A pump task reads chunks and publishes session snapshots
///    - Console lines become requests or reports
///    - Status is logged every 10 seconds
///    - Ctrl+C or end of stream ends the session
///
/// 3. **Shutdown**
///    - Pending read dropped, unterminated line discarded
///    - Final status printed
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
        config.validate()?;
    }

    let _log_guard = init_logging(&config.log);
    info!("Ground Station v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut station = Station::with_console_lines(config.display.console_lines);
    if config.log.enabled && config.log.raw_capture && args.replay.is_none() {
        match RawCapture::create_in(&config.log.dir).await {
            Ok(capture) => station = station.with_capture(capture),
            Err(e) => warn!("Raw capture disabled: {}", e),
        }
    }

    let updates = station.subscribe();
    let (stop, stopped) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = stopped.await;
    };

    let (mut pump, mut requests) = match &args.replay {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            let mut link = TelemetryLink::new(file, path.display().to_string(), config.serial.read_buffer_size);
            let pump = tokio::spawn(async move { station.run(&mut link, shutdown).await });
            (pump, None)
        }
        None => {
            let (mut reader, writer) = TelemetryLink::open(&config.serial)?.split();
            let pump = tokio::spawn(async move { station.run(&mut reader, shutdown).await });
            (pump, Some(writer))
        }
    };

    let mut dashboard = Dashboard::from_config(&config);
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;
    let mut report_interval = interval(Duration::from_secs(REPORT_INTERVAL_S));

    info!("Type 'status', 'tail', 'missing', 'open' or 'close'. Press Ctrl+C to exit");

    let finished = loop {
        tokio::select! {
            result = &mut pump => break Some(result),

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break None;
            }

            line = console.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    let snapshot = updates.borrow().clone();
                    match parse_console(&line) {
                        Some(ConsoleCommand::Request(command)) => match requests.as_mut() {
                            Some(writer) => {
                                if let Err(e) = writer.send_command(command).await {
                                    warn!("Request failed: {}", e);
                                }
                            }
                            None => warn!("Requests are not sent while replaying"),
                        },
                        Some(ConsoleCommand::Status) => println!("{}", dashboard.report(&snapshot)),
                        Some(ConsoleCommand::Tail) => println!("{}", snapshot.console.join("\n")),
                        Some(ConsoleCommand::Missing) => println!("{:?}", missing_indices(&snapshot.records)),
                        Some(ConsoleCommand::MoveStation(n, position)) => {
                            let mut layout = dashboard.layout().clone();
                            layout.set_position(n, position);
                            dashboard.set_layout(layout);
                        }
                        Some(ConsoleCommand::SetOneMeterRssi(n, rssi)) => {
                            let mut layout = dashboard.layout().clone();
                            layout.set_one_meter_rssi(n, rssi);
                            dashboard.set_layout(layout);
                        }
                        None if line.trim().is_empty() => {}
                        None => warn!("Unknown console input: {}", line.trim()),
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("Console input closed");
                    console_open = false;
                }
            },

            _ = report_interval.tick() => {
                let snapshot = updates.borrow().clone();
                info!(
                    "{} records, latest I {}, {} missing",
                    snapshot.records.len(),
                    snapshot.latest().map_or(-1, |r| r.index),
                    missing_indices(&snapshot.records).len()
                );
            }
        }
    };

    let result = match finished {
        Some(result) => result,
        None => {
            let _ = stop.send(());
            pump.await
        }
    };

    let snapshot = result??;
    println!("{}", dashboard.report(&snapshot));
    Ok(())
}
