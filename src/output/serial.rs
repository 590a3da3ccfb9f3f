//! # CRSF Serial Sink
//!
//! Writes RC channels frames to a flight controller's CRSF UART.
//!
//! The port sits behind [`SerialPortIO`] so the sink can be tested without
//! hardware.

use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::crsf::encode_frame;
use crate::error::{Result, RxError};
use crate::protocol::ChannelValues;

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// `tokio_serial::SerialStream` behind [`SerialPortIO`]
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}

/// CRSF frame writer
pub struct CrsfOutput<P> {
    port: P,
    device_path: String,
    frames_sent: u64,
}

impl<P> std::fmt::Debug for CrsfOutput<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsfOutput")
            .field("device_path", &self.device_path)
            .field("frames_sent", &self.frames_sent)
            .finish_non_exhaustive()
    }
}

impl CrsfOutput<TokioSerialPort> {
    /// Open the first usable port among `paths`, 8N1 without flow control
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try in order (e.g. `&["/dev/ttyUSB0"]`)
    /// * `baud_rate` - CRSF link speed
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried if none opens
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match open_port(path, baud_rate) {
                Ok(port) => {
                    info!("CRSF output on {} at {} baud", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort { port }, *path));
                }
                Err(e) => warn!("Failed to open {}: {}", path, e),
            }
        }

        Err(RxError::SerialPortNotFound(paths.join(", ")))
    }
}

fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| RxError::Serial(format!("Failed to open {}: {}", path, e)))
}

impl<P: SerialPortIO> CrsfOutput<P> {
    /// Wrap an already opened port
    pub fn with_port(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            frames_sent: 0,
        }
    }

    /// Encode and send one RC channels frame
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the write or flush fails
    pub async fn send_channels(&mut self, values: &ChannelValues) -> Result<()> {
        let frame = encode_frame(values);

        self.port
            .write_all(&frame)
            .await
            .map_err(|e| RxError::Serial(format!("Failed to write frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| RxError::Serial(format!("Failed to flush serial port: {}", e)))?;

        self.frames_sent += 1;
        Ok(())
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Frames written successfully
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSerialPort;
    use super::*;
    use crate::output::crsf::{CRSF_RC_CHANNELS_FRAME_SIZE, CRSF_SYNC_BYTE};

    #[tokio::test]
    async fn test_send_channels_writes_one_frame() {
        let port = MockSerialPort::new();
        let mut output = CrsfOutput::with_port(port.clone(), "mock");

        output.send_channels(&[500; 8]).await.unwrap();

        let frames = port.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), CRSF_RC_CHANNELS_FRAME_SIZE);
        assert_eq!(frames[0][0], CRSF_SYNC_BYTE);
        assert_eq!(frames[0], encode_frame(&[500; 8]).to_vec());
        assert_eq!(output.frames_sent(), 1);
    }

    #[tokio::test]
    async fn test_write_error_is_serial_error() {
        let port = MockSerialPort::new();
        port.fail_writes(io::ErrorKind::BrokenPipe);
        let mut output = CrsfOutput::with_port(port.clone(), "mock");

        let result = output.send_channels(&[0; 8]).await;

        match result {
            Err(RxError::Serial(msg)) => assert!(msg.contains("write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert!(port.frames().is_empty());
        assert_eq!(output.frames_sent(), 0);
    }

    #[tokio::test]
    async fn test_flush_error_is_serial_error() {
        let port = MockSerialPort::new();
        port.fail_flushes(io::ErrorKind::TimedOut);
        let mut output = CrsfOutput::with_port(port, "mock");

        let result = output.send_channels(&[0; 8]).await;
        assert!(matches!(result, Err(RxError::Serial(msg)) if msg.contains("flush")));
        assert_eq!(output.frames_sent(), 0);
    }

    #[test]
    fn test_frames_follow_values() {
        let port = MockSerialPort::new();
        let mut output = CrsfOutput::with_port(port.clone(), "mock");

        tokio_test::block_on(async {
            output.send_channels(&[0; 8]).await.unwrap();
            output.send_channels(&[1000; 8]).await.unwrap();
        });

        let frames = port.frames();
        assert_eq!(frames.len(), 2);
        assert_ne!(frames[0], frames[1]);
        assert_eq!(output.frames_sent(), 2);
        assert_eq!(output.device_path(), "mock");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let result = CrsfOutput::open_with_paths(&["/dev/nonexistent0", "/dev/nonexistent1"], 420_000);

        match result {
            Err(RxError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        match open_port("/dev/nonexistent_serial_device_12345", 420_000) {
            Err(RxError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            Err(other) => panic!("Expected Serial error, got: {:?}", other),
            Ok(_) => panic!("Opened a nonexistent device"),
        }
    }
}
