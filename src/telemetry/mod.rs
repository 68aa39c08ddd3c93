//! # Telemetry Module
//!
//! Decodes the line-oriented ASCII telemetry stream into records.
//!
//! This module handles:
//! - Splitting raw chunks into lines
//! - Parsing `key=value` field lines
//! - Assembling one record per index marker and repairing the log tail
//! - Tracking the session baselines (time, altitude, GPS origin)
//! - Mirroring the raw text to a capture file

pub mod assembler;
pub mod capture;
pub mod decoder;
pub mod fields;
pub mod record;
pub mod session;

pub use assembler::TelemetryAssembler;
pub use record::{Baselines, GpsFix, PanelReading, RssiReading, TelemetryRecord};
pub use session::{SessionSnapshot, TelemetrySession};
