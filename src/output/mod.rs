//! # Output Module
//!
//! Forwards decoded channel values downstream as CRSF.
//!
//! This module handles:
//! - Rescaling receiver values (0-1000) to CRSF channel values (0-2047)
//! - Packing and framing `RC_CHANNELS_PACKED` frames with CRC-8/DVB-S2
//! - Writing frames to a serial port at the configured packet rate

pub mod crsf;
pub mod serial;

pub use crsf::encode_frame;
pub use serial::{CrsfOutput, SerialPortIO, TokioSerialPort};
