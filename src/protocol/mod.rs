//! # HiSKY Protocol Module
//!
//! Wire-level definitions of the HiSKY 2.4GHz RC protocol.
//!
//! This module handles:
//! - Protocol constants (bind channel/address, packet size, hop period)
//! - The persisted bind record and its address checksum
//! - Classification and decoding of the 10-byte radio payloads

pub mod bind_info;
pub mod constants;
pub mod decoder;

pub use bind_info::{AddressChecksum, BindInfo};
pub use constants::*;
pub use decoder::{decode, decode_control_frame, BindGroup, ControlFrame, DecodeContext, Packet};
