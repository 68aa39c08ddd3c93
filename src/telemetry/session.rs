//! # Telemetry Session
//!
//! One connection's worth of state: the raw text log, the line decoder and the
//! assembler. A new connection starts a new session.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use super::assembler::{AssemblerStats, TelemetryAssembler};
use super::decoder::LineDecoder;
use super::record::{Baselines, TelemetryRecord};

/// Consistent view of a session taken between two chunks.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Incremented once per ingested chunk
    pub version: u64,
    pub records: Arc<Vec<TelemetryRecord>>,
    pub active: Option<TelemetryRecord>,
    pub baselines: Baselines,
    pub stats: AssemblerStats,
    /// Last lines of the raw log for the console view
    pub console: Vec<String>,
}

impl SessionSnapshot {
    /// Most recent committed record.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.records.last()
    }
}

/// Default number of raw lines carried in a snapshot.
pub const DEFAULT_CONSOLE_LINES: usize = 80;

/// Owns the decoding pipeline for one connection.
#[derive(Debug)]
pub struct TelemetrySession {
    log: BytesMut,
    decoder: LineDecoder,
    assembler: TelemetryAssembler,
    version: u64,
    console_lines: usize,
}

impl Default for TelemetrySession {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySession {
    #[must_use]
    pub fn new() -> Self {
        Self::with_console_lines(DEFAULT_CONSOLE_LINES)
    }

    /// Session whose snapshots carry the last `console_lines` raw lines.
    #[must_use]
    pub fn with_console_lines(console_lines: usize) -> Self {
        Self {
            log: BytesMut::new(),
            decoder: LineDecoder::default(),
            assembler: TelemetryAssembler::new(),
            version: 0,
            console_lines,
        }
    }

    /// Decode and assemble one chunk from the transport
    ///
    /// # Arguments
    ///
    /// * `chunk` - Raw bytes exactly as read
    ///
    /// # Returns
    ///
    /// * `usize` - Number of complete lines processed
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::telemetry::session::TelemetrySession;
    ///
    /// let mut session = TelemetrySession::new();
    /// assert_eq!(session.ingest(b"I 1 100\nT=20\nI 2 2"), 2);
    /// assert_eq!(session.ingest(b"00\n"), 1);
    /// assert_eq!(session.snapshot().records.len(), 1);
    /// ```
    pub fn ingest(&mut self, chunk: &[u8]) -> usize {
        self.log.extend_from_slice(chunk);

        let lines = self.decoder.push(chunk);
        for line in &lines {
            self.assembler.process_line(line);
        }

        self.version += 1;
        debug!(
            "Ingested {} bytes, {} lines, {} records",
            chunk.len(),
            lines.len(),
            self.assembler.records().len()
        );

        lines.len()
    }

    /// Take a snapshot. Records are shared, not copied.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            records: Arc::clone(self.assembler.records()),
            active: self.assembler.active().cloned(),
            baselines: *self.assembler.baselines(),
            stats: self.assembler.stats(),
            console: self.log_tail(self.console_lines),
        }
    }

    /// Full raw text received this session.
    ///
    /// Bytes are kept as received and decoded here, so a character split
    /// between two reads comes out whole.
    #[must_use]
    pub fn log(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.log)
    }

    /// Last `count` lines of the raw log, for a console view.
    #[must_use]
    pub fn log_tail(&self, count: usize) -> Vec<String> {
        if self.log.is_empty() {
            return Vec::new();
        }

        let mut lines: Vec<String> = self
            .log
            .rsplit(|&b| b == b'\n')
            .take(count)
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        lines.reverse();
        lines
    }

    #[must_use]
    pub fn assembler(&self) -> &TelemetryAssembler {
        &self.assembler
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Connection closed: drop the unterminated fragment.
    ///
    /// The active record stays uncommitted.
    pub fn close(&mut self) {
        if !self.decoder.pending().is_empty() {
            debug!("Discarding {} pending bytes", self.decoder.pending().len());
        }
        self.decoder.discard();
    }
}
