//! # Configuration Module
//!
//! Handles loading and validating the receiver's TOML configuration.
//!
//! Every field has a default, so an empty section (or an empty file) is a
//! valid configuration. See `config/default.toml` for the annotated layout.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, RxError};
use crate::receiver::ReceiverConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub receiver: ReceiverSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Protocol timing
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverSection {
    #[serde(default = "default_hop_period_us")]
    pub hop_period_us: u64,

    /// 0 disables the bind timeout
    #[serde(default)]
    pub bind_timeout_ms: u64,

    #[serde(default = "default_tick_interval_us")]
    pub tick_interval_us: u64,
}

/// Bind record location
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

/// Air traffic fed to the replay radio
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    #[serde(default = "default_capture_path")]
    pub capture: String,

    #[serde(default)]
    pub loop_capture: bool,
}

/// CRSF serial output
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_packet_rate_hz")]
    pub packet_rate_hz: u32,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Diagnostic logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily-rotated log file; empty logs to stderr only
    #[serde(default)]
    pub file: String,
}

// Default value functions
fn default_hop_period_us() -> u64 { 9500 }
fn default_tick_interval_us() -> u64 { 500 }

fn default_storage_path() -> String { "./hisky-bind.bin".to_string() }
fn default_capture_path() -> String { "./capture.jsonl".to_string() }

fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 420000 }
fn default_packet_rate_hz() -> u32 { 250 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for ReceiverSection {
    fn default() -> Self {
        Self {
            hop_period_us: default_hop_period_us(),
            bind_timeout_ms: 0,
            tick_interval_us: default_tick_interval_us(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_storage_path() }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capture: default_capture_path(),
            loop_capture: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            packet_rate_hz: default_packet_rate_hz(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RxError {
    RxError::Config(toml::de::Error::custom(message))
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
    /// use hisky_rx::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Protocol engine settings derived from `[receiver]`
    #[must_use]
    pub fn to_receiver_config(&self) -> ReceiverConfig {
        let bind_timeout = match self.receiver.bind_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        ReceiverConfig {
            hop_period: Duration::from_micros(self.receiver.hop_period_us),
            bind_timeout,
        }
    }

    /// Scheduler cadence
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.receiver.tick_interval_us)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        let receiver = &self.receiver;
        if receiver.hop_period_us == 0 || receiver.hop_period_us > 100_000 {
            return Err(invalid("hop_period_us must be between 1 and 100000"));
        }

        if receiver.tick_interval_us < 50 || receiver.tick_interval_us > 5000 {
            return Err(invalid("tick_interval_us must be between 50 and 5000"));
        }

        if receiver.tick_interval_us >= receiver.hop_period_us {
            return Err(invalid("tick_interval_us must be less than hop_period_us"));
        }

        if self.storage.path.is_empty() {
            return Err(invalid("storage path cannot be empty"));
        }

        if self.replay.capture.is_empty() {
            return Err(invalid("replay capture path cannot be empty"));
        }

        // Validate output configuration
        if self.output.enabled && self.output.port.is_empty() {
            return Err(invalid("output port cannot be empty when enabled"));
        }

        if ![115200, 400000, 420000, 921600, 1870000, 3750000].contains(&self.output.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 115200, 400000, 420000, 921600, 1870000, 3750000",
            ));
        }

        if ![50, 150, 250, 500].contains(&self.output.packet_rate_hz) {
            return Err(invalid("packet_rate_hz must be one of: 50, 150, 250, 500"));
        }

        // Validate telemetry configuration
        let telemetry = &self.telemetry;
        if telemetry.enabled && telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if telemetry.log_interval_ms == 0 || telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        Ok(())
    }
}
