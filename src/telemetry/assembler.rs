//! # Telemetry Assembler
//!
//! Stateful record builder. Consumes decoded lines in arrival order, keeps one
//! in-progress record per index marker and commits it to an append-only log
//! when the next marker arrives.
//!
//! ## Line handling
//!
//! | Line | Effect |
//! |------|--------|
//! | blank, `//`, `/*`, `*/` | ignored |
//! | contains `ovf` | active record flagged, dropped at the next marker |
//! | `I <index> <millis>` | commit active record, start a new one, repair the log tail |
//! | `KEY=value` | update the active record |
//!
//! No line is ever fatal: malformed values and unknown keys are logged and
//! skipped.

use std::sync::Arc;

use tracing::{debug, warn};

use super::fields::{parse_field, Field, IndexMarker};
use super::record::{Baselines, TelemetryRecord};

/// Timestamps at or beyond one day are treated as corrupt.
pub const MAX_SESSION_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Substring the device emits when its transmit buffer overflowed.
pub const OVERFLOW_MARKER: &str = "ovf";

const COMMENT_PREFIXES: [&str; 3] = ["//", "/*", "*/"];

/// Counters describing what the assembler has done this session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Lines passed to the assembler, ignored ones included
    pub lines: u64,
    /// Records appended to the log
    pub committed: u64,
    /// Records removed from the log by the timestamp checks
    pub evicted: u64,
    /// Records dropped because of an overflow line
    pub discarded: u64,
    /// Lines skipped because they did not parse or had an unknown key
    pub malformed: u64,
}

/// Turns decoded lines into an ordered log of telemetry records.
#[derive(Debug, Default)]
pub struct TelemetryAssembler {
    records: Arc<Vec<TelemetryRecord>>,
    active: Option<TelemetryRecord>,
    baselines: Baselines,
    stats: AssemblerStats,
}

impl TelemetryAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed records in arrival order.
    #[must_use]
    pub fn records(&self) -> &Arc<Vec<TelemetryRecord>> {
        &self.records
    }

    /// The in-progress record, if a marker has been seen.
    #[must_use]
    pub fn active(&self) -> Option<&TelemetryRecord> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn last_committed(&self) -> Option<&TelemetryRecord> {
        self.records.last()
    }

    #[must_use]
    pub fn baselines(&self) -> &Baselines {
        &self.baselines
    }

    #[must_use]
    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Process one decoded line
    ///
    /// # Arguments
    ///
    /// * `line` - A line without its trailing `\n` (a trailing `\r` is tolerated)
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::telemetry::assembler::TelemetryAssembler;
    ///
    /// let mut assembler = TelemetryAssembler::new();
    /// for line in ["I 1 100", "T=20", "I 2 200"] {
    ///     assembler.process_line(line);
    /// }
    /// assert_eq!(assembler.records().len(), 1);
    /// assert_eq!(assembler.records()[0].temperature, 20.0);
    /// ```
    pub fn process_line(&mut self, line: &str) {
        self.stats.lines += 1;
        let line = line.trim_end_matches('\r');

        if line.len() <= 1 || COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)) {
            return;
        }

        if line.contains(OVERFLOW_MARKER) {
            if let Some(active) = self.active.as_mut() {
                debug!("Overflow reported, flagging record I {}", active.index);
                active.marked_for_deletion = true;
            }
            return;
        }

        if line.starts_with('I') {
            match IndexMarker::parse(line) {
                Ok(marker) => self.start_record(marker),
                Err(e) => {
                    self.stats.malformed += 1;
                    warn!("Skipping line: {}", e);
                }
            }
            return;
        }

        if self.active.is_some() {
            self.apply_field_line(line);
        }
    }

    /// Commit the active record and open a new one for `marker`.
    fn start_record(&mut self, marker: IndexMarker) {
        if let Some(previous) = self.active.take() {
            if previous.marked_for_deletion {
                self.stats.discarded += 1;
                warn!("Discarded overflowed record at I {}", previous.index);
            } else {
                Arc::make_mut(&mut self.records).push(previous);
                self.stats.committed += 1;
            }
        }

        Baselines::freeze(&mut self.baselines.millis, marker.millis, true);
        let base_millis = self.baselines.millis.unwrap_or(marker.millis);

        self.active = Some(TelemetryRecord::new(marker.index, marker.millis - base_millis));
        self.repair_tail(marker);
    }

    /// Evict the last one or two committed records when their timestamps
    /// break ordering.
    ///
    /// `prev` is evicted when it is not older than both its successor and the
    /// raw timestamp just received, or when it lies a day or more into the
    /// session. `last` is evicted when it is not newer than `prev`. Both
    /// checks use the values before any removal.
    fn repair_tail(&mut self, marker: IndexMarker) {
        let len = self.records.len();
        if len < 2 {
            return;
        }

        let prev_ms = self.records[len - 2].milliseconds;
        let last_ms = self.records[len - 1].milliseconds;

        let evict_prev = (prev_ms >= last_ms && prev_ms >= marker.millis)
            || prev_ms >= MAX_SESSION_MILLIS;
        let evict_last = last_ms <= prev_ms;

        if !evict_prev && !evict_last {
            return;
        }

        let records = Arc::make_mut(&mut self.records);
        if evict_last {
            if let Some(removed) = records.pop() {
                warn!("Removed corrupted record I {} at I {}", removed.index, marker.index);
            }
        }
        if evict_prev {
            let removed = records.remove(len - 2);
            warn!("Removed corrupted record I {} at I {}", removed.index, marker.index);
        }

        self.stats.evicted += u64::from(evict_prev) + u64::from(evict_last);
    }

    fn apply_field_line(&mut self, line: &str) {
        match parse_field(line) {
            Ok(Some(field)) => self.apply_field(field),
            Ok(None) => {
                self.stats.malformed += 1;
                warn!("Unknown field: {}", line);
            }
            Err(e) => {
                self.stats.malformed += 1;
                warn!("Skipping line: {}", e);
            }
        }
    }

    fn apply_field(&mut self, field: Field) {
        let Some(record) = self.active.as_mut() else {
            return;
        };
        let baselines = &mut self.baselines;

        match field {
            Field::Temperature(v) => record.temperature = v,
            Field::AnalogTemperature(v) => record.analog_temperature = v,
            Field::Pressure(v) => record.pressure = v,
            Field::Altitude(v) => {
                record.altitude = v;
                if Baselines::freeze(&mut baselines.altitude, v, v > 0.0) {
                    debug!("Base altitude frozen at {} m", v);
                }
            }
            Field::Ping(v) => record.ping = v,
            Field::Open(v) => record.open = v,
            Field::HasBarometer(v) => record.has_barometer = v,
            Field::Rssi(v) => record.rssi = v,
            Field::Panel(v) => record.panels = v,
            Field::Gps(fix) => {
                record.gps = fix;
                Baselines::freeze(&mut baselines.longitude, fix.longitude, fix.longitude > 0.0);
                Baselines::freeze(&mut baselines.latitude, fix.latitude, fix.latitude > 0.0);
                Baselines::freeze(&mut baselines.gps_altitude, fix.altitude, fix.altitude > -100.0);
            }
        }
    }
}
