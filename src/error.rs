//! # Error Types
//!
//! Custom error types for the ground station using `thiserror`.

use thiserror::Error;

/// Main error type for the ground station
#[derive(Debug, Error)]
pub enum GroundError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the ground station
pub type Result<T> = std::result::Result<T, GroundError>;
