//! # HiSKY Protocol Constants
//!
//! Core protocol definitions shared by the decoder, the hop controller and the
//! binding state machine.

use std::time::Duration;

/// Radio channel used during the binding handshake
pub const BIND_CHANNEL: u8 = 81;

/// Radio address used during the binding handshake
pub const BIND_ADDRESS: [u8; ADDRESS_LEN] = [0x12, 0x23, 0x23, 0x45, 0x78];

/// Marker in the first three bytes of a bind header packet
pub const BIND_HEADER_MARKER: [u8; 3] = [0xFF, 0xAA, 0x55];

/// Radio address width in bytes
pub const ADDRESS_LEN: usize = 5;

/// Fixed radio payload size
pub const PACKET_SIZE: usize = 10;

/// Number of slots in the hop sequence
pub const HOP_COUNT: usize = 20;

/// Number of bind groups carrying the hop sequence
pub const BIND_GROUP_COUNT: u8 = 3;

/// Hop channels carried by bind groups 0 and 1 (group 2 carries the remaining 6)
pub const BIND_GROUP_STRIDE: usize = 7;

/// Maximum transmitter hop period (9.5 ms)
pub const HOP_PERIOD: Duration = Duration::from_micros(9500);

/// Ceiling of the hop backoff multiplier.
///
/// Larger than [`HOP_COUNT`] so a saturated backoff walks the sequence in a
/// shifted order instead of landing on the same slot every time.
pub const MAX_BACKOFF: u8 = 21;

/// Number of control channels
pub const NUM_CHANNELS: usize = 8;

/// Channel value range
pub const CHANNEL_VALUE_MIN: u16 = 0;
pub const CHANNEL_VALUE_MAX: u16 = 1000;

/// Liveness counter value after each good control frame, in ticks
pub const LIVENESS_TICKS: u32 = 1000;

/// Sentinel in `channels[0]` marking an unbound record
pub const UNBOUND_SENTINEL: u8 = 0xFF;

/// Raw radio payload
pub type RawPacket = [u8; PACKET_SIZE];

/// Decoded channel values (0-1000)
pub type ChannelValues = [u16; NUM_CHANNELS];

/// Channel indices for semantic access.
pub mod channels {
    pub const ROLL: usize = 0;
    pub const PITCH: usize = 1;
    pub const YAW: usize = 2;
    pub const THROTTLE: usize = 3;
    pub const AUX1: usize = 4;
    pub const AUX2: usize = 5;
    pub const AUX3: usize = 6;
    pub const AUX4: usize = 7;
}
