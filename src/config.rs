//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{GroundError, Result};

/// Main configuration structure
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub stations: StationConfig,
    pub derivation: DerivationConfig,
    pub display: DisplayConfig,
    pub log: LogConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Ground station layout and radio calibration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StationConfig {
    /// World positions `[x, y, z]` (X west, Y up, Z north)
    #[serde(default = "default_station_positions")]
    pub positions: [[f64; 3]; 3],

    #[serde(default = "default_one_meter_rssi")]
    pub one_meter_rssi: [f64; 3],

    #[serde(default = "default_tx_power_dbm")]
    pub tx_power_dbm: f64,
}

/// Position derivation limits
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DerivationConfig {
    #[serde(default = "default_max_extent_m")]
    pub max_extent_m: f64,
}

/// Display shaping
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_target_points")]
    pub target_points: usize,

    #[serde(default = "default_console_lines")]
    pub console_lines: usize,
}

/// Diagnostics and raw capture files
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_raw_capture")]
    pub raw_capture: bool,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 9600 }
fn default_read_buffer_size() -> usize { 1024 }

fn default_station_positions() -> [[f64; 3]; 3] {
    [[0.0, 0.0, 0.0], [-1000.0, 0.0, 0.0], [-500.0, 0.0, 500.0]]
}
fn default_one_meter_rssi() -> [f64; 3] { [-60.0; 3] }
fn default_tx_power_dbm() -> f64 { 17.0 }

fn default_max_extent_m() -> f64 { 3000.0 }

fn default_target_points() -> usize { 200 }
fn default_console_lines() -> usize { 80 }

fn default_log_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_raw_capture() -> bool { true }

/// Baud rates the flight radio can be configured for
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            positions: default_station_positions(),
            one_meter_rssi: default_one_meter_rssi(),
            tx_power_dbm: default_tx_power_dbm(),
        }
    }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            max_extent_m: default_max_extent_m(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_points: default_target_points(),
            console_lines: default_console_lines(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            dir: default_log_dir(),
            raw_capture: default_raw_capture(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> GroundError {
    GroundError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ground_station::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200"));
        }

        if self.serial.read_buffer_size == 0 || self.serial.read_buffer_size > 65536 {
            return Err(invalid("read_buffer_size must be between 1 and 65536"));
        }

        let coordinates = self.stations.positions.iter().flatten();
        if coordinates.chain(&self.stations.one_meter_rssi).any(|v| !v.is_finite()) {
            return Err(invalid("station positions and one_meter_rssi must be finite"));
        }

        if !self.stations.tx_power_dbm.is_finite() {
            return Err(invalid("tx_power_dbm must be finite"));
        }

        if !(self.derivation.max_extent_m.is_finite() && self.derivation.max_extent_m > 0.0) {
            return Err(invalid("max_extent_m must be greater than 0"));
        }

        if self.display.target_points == 0 {
            return Err(invalid("target_points must be greater than 0"));
        }

        if self.display.console_lines == 0 {
            return Err(invalid("console_lines must be greater than 0"));
        }

        if self.log.enabled && self.log.dir.is_empty() {
            return Err(invalid("log dir cannot be empty when enabled"));
        }

        Ok(())
    }
}
