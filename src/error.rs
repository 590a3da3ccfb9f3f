//! # Error Types
//!
//! Custom error types for the HiSKY receiver using `thiserror`.
//!
//! The protocol core itself never fails: malformed packets are dropped and
//! missed hops are handled by backoff. These errors cover the collaborators
//! around it (configuration, storage, capture files, serial output).

use thiserror::Error;

/// Main error type for the receiver crate
#[derive(Debug, Error)]
pub enum RxError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bind record could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Capture file is unusable
    #[error("Capture error: {0}")]
    Capture(String),

    /// Serial output errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("No serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the receiver crate
pub type Result<T> = std::result::Result<T, RxError>;
