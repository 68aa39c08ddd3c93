//! # Ground Station
//!
//! Pumps the telemetry link into a session and publishes snapshots.
//!
//! One task owns the session. Each chunk is captured, decoded and assembled
//! completely before the next read starts, and every reader sees whole-chunk
//! versions through a [`tokio::sync::watch`] channel.

use std::fmt;
use std::future::Future;

use nalgebra::Vector3;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::geometry::bounds::PointBounds;
use crate::geometry::interpolation::GpsTrack;
use crate::geometry::stations::StationLayout;
use crate::serial::TelemetryLink;
use crate::series::{channels, Series};
use crate::telemetry::assembler::AssemblerStats;
use crate::telemetry::capture::RawCapture;
use crate::telemetry::record::TelemetryRecord;
use crate::telemetry::session::{SessionSnapshot, TelemetrySession, DEFAULT_CONSOLE_LINES};

/// Owns the session for one connection.
#[derive(Debug)]
pub struct Station {
    session: TelemetrySession,
    capture: Option<RawCapture>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Default for Station {
    fn default() -> Self {
        Self::new()
    }
}

impl Station {
    #[must_use]
    pub fn new() -> Self {
        Self::with_console_lines(DEFAULT_CONSOLE_LINES)
    }

    /// Station whose snapshots carry the last `console_lines` raw lines.
    #[must_use]
    pub fn with_console_lines(console_lines: usize) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            session: TelemetrySession::with_console_lines(console_lines),
            capture: None,
            updates,
        }
    }

    /// Mirror every received byte to `capture`.
    #[must_use]
    pub fn with_capture(mut self, capture: RawCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Receiver for the snapshot published after each chunk.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> &TelemetrySession {
        &self.session
    }

    /// Capture, decode and publish one chunk. Returns the number of lines processed.
    ///
    /// A failing capture file is closed and the session carries on without it.
    pub async fn ingest(&mut self, chunk: &[u8]) -> usize {
        if let Some(capture) = self.capture.as_mut() {
            if let Err(e) = capture.append(chunk).await {
                warn!("Raw capture to {} stopped: {}", capture.path().display(), e);
                self.capture = None;
            }
        }

        let lines = self.session.ingest(chunk);
        self.updates.send_replace(self.session.snapshot());
        lines
    }

    /// Read from `link` until end of stream or `shutdown` completes
    ///
    /// The pending read is dropped on shutdown and the unterminated fragment
    /// is discarded either way; the active record stays uncommitted.
    ///
    /// # Returns
    ///
    /// * `Result<SessionSnapshot>` - Final state of the session
    ///
    /// # Errors
    ///
    /// Returns error if reading from the link fails
    pub async fn run<S, F>(&mut self, link: &mut TelemetryLink<S>, shutdown: F) -> Result<SessionSnapshot>
    where
        S: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Receiving telemetry from {}", link.device_path());

        let outcome = loop {
            tokio::select! {
                chunk = link.read_chunk() => match chunk {
                    Ok(Some(bytes)) => {
                        self.ingest(&bytes).await;
                    }
                    Ok(None) => {
                        info!("Telemetry stream from {} ended", link.device_path());
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                },
                () = &mut shutdown => {
                    info!("Shutdown requested, closing session");
                    break Ok(());
                }
            }
        };

        self.close().await;
        let snapshot = self.session.snapshot();
        info!(
            "Session closed: {} records, {} evicted, {} discarded, {} malformed lines",
            snapshot.records.len(),
            snapshot.stats.evicted,
            snapshot.stats.discarded,
            snapshot.stats.malformed
        );

        outcome.map(|()| snapshot)
    }

    async fn close(&mut self) {
        self.session.close();

        if let Some(capture) = self.capture.as_mut() {
            match capture.flush().await {
                Ok(()) => debug!("Captured {} bytes to {}", capture.bytes_written(), capture.path().display()),
                Err(e) => warn!("Failed to flush raw capture: {}", e),
            }
        }

        self.updates.send_replace(self.session.snapshot());
    }
}

/// Operator view of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub version: u64,
    pub records: usize,
    pub active_index: Option<i64>,
    pub stats: AssemblerStats,
    pub latest: Option<TelemetryRecord>,
    /// Last valid barometric altitude above base
    pub altitude: Option<f64>,
    /// Last valid vertical speed
    pub vertical_speed: Option<f64>,
    pub rssi_position: Option<Vector3<f64>>,
    pub gps_position: Option<Vector3<f64>>,
    pub estimated_position: Option<Vector3<f64>>,
    /// Altitude points kept after downsampling
    pub displayed_points: usize,
    pub missing: Vec<i64>,
}

fn last_valid<V: Clone>(points: &[crate::series::SeriesPoint<V>]) -> Option<V> {
    points.iter().rev().find_map(|p| p.value.clone())
}

fn format_point(point: Option<&Vector3<f64>>) -> String {
    match point {
        Some(p) => format!("x {:.1} y {:.1} z {:.1}", p.x, p.y, p.z),
        None => "-".to_string(),
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Records: {} (active: {})",
            self.records,
            self.active_index.map_or_else(|| "-".to_string(), |i| i.to_string())
        )?;
        writeln!(
            f,
            "Evicted: {}, discarded: {}, malformed: {}",
            self.stats.evicted, self.stats.discarded, self.stats.malformed
        )?;
        match self.altitude {
            Some(alt) => writeln!(f, "Altitude: {:.1} m", alt)?,
            None => writeln!(f, "Altitude: -")?,
        }
        match self.vertical_speed {
            Some(v) => writeln!(f, "Vertical speed: {:.2} m/s", v)?,
            None => writeln!(f, "Vertical speed: -")?,
        }
        writeln!(f, "RSSI position: {}", format_point(self.rssi_position.as_ref()))?;
        writeln!(f, "GPS position: {}", format_point(self.gps_position.as_ref()))?;
        writeln!(f, "Estimated position: {}", format_point(self.estimated_position.as_ref()))?;
        write!(f, "Missing indices: {}", self.missing.len())?;
        if let Some(latest) = &self.latest {
            write!(f, "\n{}", latest)?;
        }
        Ok(())
    }
}

/// Series cache for the operator console.
///
/// Holds the derived series across snapshots so each is recomputed only when
/// a new version arrives.
#[derive(Debug)]
pub struct Dashboard {
    layout: StationLayout,
    bounds: PointBounds,
    target_points: usize,
    altitude: Series<f64>,
    rssi: Series<Vector3<f64>>,
    gps: Series<Vector3<f64>>,
}

impl Dashboard {
    #[must_use]
    pub fn new(layout: StationLayout, bounds: PointBounds, target_points: usize) -> Self {
        Self {
            rssi: channels::rssi_position(layout.clone(), bounds),
            gps: channels::gps_local_position(bounds),
            altitude: channels::barometric_altitude(),
            layout,
            bounds,
            target_points,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            StationLayout::from(&config.stations),
            PointBounds::new(config.derivation.max_extent_m),
            config.display.target_points,
        )
    }

    #[must_use]
    pub fn layout(&self) -> &StationLayout {
        &self.layout
    }

    /// Replace the station layout. RSSI positions are recomputed on the next report.
    pub fn set_layout(&mut self, layout: StationLayout) {
        self.rssi = channels::rssi_position(layout.clone(), self.bounds);
        self.layout = layout;
    }

    pub fn report(&mut self, snapshot: &SessionSnapshot) -> StatusReport {
        let altitude = last_valid(self.altitude.points(snapshot));
        let displayed_points = self.altitude.display(snapshot, self.target_points).len();
        let rssi_position = last_valid(self.rssi.points(snapshot));
        let gps_position = last_valid(self.gps.points(snapshot));
        let vertical_speed = last_valid(&channels::vertical_speed(&snapshot.records));

        let estimated_position = snapshot.latest().and_then(|latest| {
            GpsTrack::from_records(&snapshot.records, &snapshot.baselines, &self.bounds)
                .estimate_for(latest, &snapshot.baselines)
        });

        StatusReport {
            version: snapshot.version,
            records: snapshot.records.len(),
            active_index: snapshot.active.as_ref().map(|r| r.index),
            stats: snapshot.stats,
            latest: snapshot.latest().cloned(),
            altitude,
            vertical_speed,
            rssi_position,
            gps_position,
            estimated_position,
            displayed_points,
            missing: channels::missing_indices(&snapshot.records),
        }
    }
}
