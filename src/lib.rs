//! # Ground Station Library
//!
//! Receives the ASCII telemetry stream of a balloon or rover over serial and
//! turns it into records, positions and plottable series.
//!
//! The pipeline runs chunk by chunk: [`telemetry`] decodes lines and
//! assembles records, [`geometry`] derives positions from RSSI and GPS, and
//! [`series`] shapes the record log for display. [`station`] ties the serial
//! link to a session.

pub mod config;
pub mod error;
pub mod geometry;
pub mod serial;
pub mod series;
pub mod station;
pub mod telemetry;
