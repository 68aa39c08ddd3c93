//! # Serial Communication Module
//!
//! Handles the serial link to the ground radio.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control) at the configured baud rate
//! - Reading raw chunks exactly as they arrive
//! - Writing operator requests back to the device
//!
//! [`TelemetryLink`] is generic over the stream so a replay file or an
//! in-memory mock can stand in for the port.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{GroundError, Result};

/// Fallback device paths tried after the configured one
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Operator request sent to the flying unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the payload hatch
    Open,
    /// Close the payload hatch
    Close,
}

impl Command {
    /// Line written to the device for this request.
    #[must_use]
    pub fn as_wire(self) -> &'static [u8] {
        match self {
            Command::Open => b"open\n",
            Command::Close => b"close\n",
        }
    }

    /// Parse an operator console word.
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::serial::Command;
    ///
    /// assert_eq!(Command::from_name(" OPEN "), Some(Command::Open));
    /// assert_eq!(Command::from_name("launch"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Command::Open),
            "close" => Some(Command::Close),
            _ => None,
        }
    }
}

/// Telemetry link
///
/// Wraps the byte stream from the ground radio.
pub struct TelemetryLink<S = tokio_serial::SerialStream> {
    /// Underlying stream
    port: S,
    /// Device path (or replay file name)
    device_path: String,
    /// Scratch buffer for one read
    buffer: Vec<u8>,
}

impl<S> std::fmt::Debug for TelemetryLink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLink")
            .field("device_path", &self.device_path)
            .field("read_buffer_size", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl TelemetryLink {
    /// Open the serial port from configuration
    ///
    /// Tries the configured port first, then the common device paths.
    ///
    /// # Returns
    ///
    /// * `Result<TelemetryLink>` - Connected serial port or error
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ground_station::config::SerialConfig;
    /// use ground_station::serial::TelemetryLink;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let link = TelemetryLink::open(&SerialConfig::default())?;
    /// println!("Connected to: {}", link.device_path());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut paths = vec![config.port.as_str()];
        paths.extend(DEFAULT_DEVICE_PATHS.iter().filter(|p| **p != config.port));

        Self::open_with_paths(&paths, config.baud_rate, config.read_buffer_size)
    }

    /// Open the first device that accepts the connection
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    /// * `read_buffer_size` - Maximum bytes returned by one read
    ///
    /// # Returns
    ///
    /// * `Result<TelemetryLink>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, read_buffer_size: usize) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened ground radio at {} ({} baud)", path, baud_rate);
                    return Ok(Self::new(port, *path, read_buffer_size));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(GroundError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| GroundError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<S> TelemetryLink<S> {
    /// Wrap an already open stream.
    pub fn new(port: S, device_path: impl Into<String>, read_buffer_size: usize) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            buffer: vec![0; read_buffer_size.max(1)],
        }
    }

    /// Get the device path of the opened port
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl<S: AsyncRead + AsyncWrite> TelemetryLink<S> {
    /// Split into independent read and write halves so requests can be sent
    /// while a read is pending.
    pub fn split(self) -> (TelemetryLink<ReadHalf<S>>, TelemetryLink<WriteHalf<S>>) {
        let size = self.buffer.len();
        let (reader, writer) = tokio::io::split(self.port);
        (
            TelemetryLink::new(reader, self.device_path.clone(), size),
            TelemetryLink::new(writer, self.device_path, size),
        )
    }
}

impl<S: AsyncRead + Unpin> TelemetryLink<S> {
    /// Read the next chunk
    ///
    /// Waits until at least one byte is available. Cancel-safe: dropping the
    /// future loses no data.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - Bytes exactly as received
    /// * `Ok(None)` - End of stream
    pub async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let count = self
            .port
            .read(&mut self.buffer)
            .await
            .map_err(|e| GroundError::Serial(format!("Failed to read from {}: {}", self.device_path, e)))?;

        if count == 0 {
            debug!("End of stream on {}", self.device_path);
            return Ok(None);
        }

        Ok(Some(self.buffer[..count].to_vec()))
    }
}

impl<S: AsyncWrite + Unpin> TelemetryLink<S> {
    /// Send an operator request
    pub async fn send_command(&mut self, command: Command) -> Result<()> {
        self.port
            .write_all(command.as_wire())
            .await
            .map_err(|e| GroundError::Serial(format!("Failed to write request: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| GroundError::Serial(format!("Failed to flush serial port: {}", e)))?;

        info!("Sent {:?} request", command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_default_device_paths() {
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyACM0");
    }

    #[test]
    fn test_command_wire_format() {
        assert_eq!(Command::Open.as_wire(), b"open\n");
        assert_eq!(Command::Close.as_wire(), b"close\n");
        assert_eq!(Command::from_name("close"), Some(Command::Close));
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = TelemetryLink::open_with_paths(invalid_paths, 9600, 1024);

        match result {
            Err(GroundError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = TelemetryLink::open_with_paths(empty_paths, 9600, 1024);
        assert!(matches!(result, Err(GroundError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = TelemetryLink::open_port("/dev/nonexistent_serial_device_12345", 9600);

        match result {
            Err(GroundError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_read_chunks_until_end_of_stream() {
        let mock = Builder::new().read(b"I 1 100\nT=2").read(b"0\n").build();
        let mut link = TelemetryLink::new(mock, "mock", 64);

        assert_eq!(link.read_chunk().await.unwrap(), Some(b"I 1 100\nT=2".to_vec()));
        assert_eq!(link.read_chunk().await.unwrap(), Some(b"0\n".to_vec()));
        assert_eq!(link.read_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_respects_buffer_size() {
        let mock = Builder::new().read(b"abcdef").build();
        let mut link = TelemetryLink::new(mock, "mock", 4);

        assert_eq!(link.read_chunk().await.unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(link.read_chunk().await.unwrap(), Some(b"ef".to_vec()));
        assert_eq!(link.read_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_error_is_serial_error() {
        let mock = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let mut link = TelemetryLink::new(mock, "mock", 16);

        match link.read_chunk().await {
            Err(GroundError::Serial(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_commands() {
        let mock = Builder::new().write(b"open\n").write(b"close\n").build();
        let mut link = TelemetryLink::new(mock, "mock", 16);

        link.send_command(Command::Open).await.unwrap();
        link.send_command(Command::Close).await.unwrap();
    }

    #[tokio::test]
    async fn test_split_halves() {
        let mock = Builder::new().read(b"I 1 0\n").write(b"open\n").build();
        let (mut reader, mut writer) = TelemetryLink::new(mock, "mock", 16).split();

        assert_eq!(reader.device_path(), "mock");
        assert_eq!(reader.read_chunk().await.unwrap(), Some(b"I 1 0\n".to_vec()));
        writer.send_command(Command::Open).await.unwrap();
    }

    #[test]
    fn test_zero_buffer_size_is_clamped() {
        let link = TelemetryLink::new(tokio::io::empty(), "empty", 0);
        assert!(format!("{:?}", link).contains("read_buffer_size: 1"));
    }

    // Only runs if the ground radio is connected
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        match TelemetryLink::open(&SerialConfig::default()) {
            Ok(link) => println!("Opened ground radio at: {}", link.device_path()),
            Err(e) => println!("No ground radio detected ({}), this is OK for CI/CD", e),
        }
    }
}
