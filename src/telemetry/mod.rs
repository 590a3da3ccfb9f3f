//! # Telemetry Module
//!
//! Periodic link-status logging to JSONL files with rotation.
//!
//! This module handles:
//! - Sampling receiver state (protocol state, hop position, liveness, channels)
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

pub mod logger;
pub mod types;

pub use logger::TelemetryLogger;
pub use types::{LinkRecord, ReplayCounters};
