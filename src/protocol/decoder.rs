//! # HiSKY Packet Decoder
//!
//! Classifies 10-byte radio payloads and unpacks control frames.
//!
//! ## Packet shapes
//!
//! ```text
//! Bind header:  FF AA 55 | a0 a1 a2 a3 a4 | xx xx
//! Bind group:   sum_lo sum_hi g | c0 .. c6          (g = 0, 1: 7 channels)
//!                               | c0 .. c5 | xx     (g = 2:    6 channels)
//! Control:      lo0 lo1 .. lo7 | hi_lo hi_hi
//! ```
//!
//! Control frames carry the low 8 bits of each channel in bytes 0-7. The
//! little-endian word at offset 8 holds the high 2 bits of every channel,
//! channel 0 in bits 0-1, channel 1 in bits 2-3 and so on.

use super::bind_info::AddressChecksum;
use super::constants::*;

/// What the receiver is currently expecting, which decides how a payload is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeContext {
    /// Handshake in progress; group packets are checked against `checksum`
    Binding { checksum: AddressChecksum },
    /// Hop tracking; every payload is control data
    Tracking,
}

/// Hop sequence slice from one bind group packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroup {
    /// Group index (0-2)
    pub group: u8,
    channels: [u8; BIND_GROUP_STRIDE],
    len: usize,
}

impl BindGroup {
    /// Hop channels carried by this group
    #[must_use]
    pub fn channels(&self) -> &[u8] {
        &self.channels[..self.len]
    }

    /// First hop slot covered by this group
    #[must_use]
    pub fn offset(&self) -> usize {
        self.group as usize * BIND_GROUP_STRIDE
    }
}

/// Decoded control frame, 8 channel values in 0-1000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    pub values: ChannelValues,
}

/// A classified payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Start of a handshake, carrying the transmitter address
    BindHeader { address: [u8; ADDRESS_LEN] },
    /// One of the three hop sequence groups
    BindGroup(BindGroup),
    /// Channel data
    Control(ControlFrame),
}

/// Classify a raw payload
///
/// # Arguments
///
/// * `buf` - Raw 10-byte payload as read from the radio
/// * `context` - Binding (with the accumulated address checksum) or tracking
///
/// # Returns
///
/// * `Option<Packet>` - The packet, or `None` if it matches no shape expected
///   in this context. Callers drop unmatched payloads silently.
///
/// # Examples
///
/// ```
/// use hisky_rx::protocol::{decode, DecodeContext, Packet};
///
/// let buf = [0xFF, 0xAA, 0x55, 1, 2, 3, 4, 5, 0, 0];
/// let ctx = DecodeContext::Binding { checksum: Default::default() };
/// assert_eq!(decode(&buf, ctx), Some(Packet::BindHeader { address: [1, 2, 3, 4, 5] }));
/// ```
#[must_use]
pub fn decode(buf: &RawPacket, context: DecodeContext) -> Option<Packet> {
    match context {
        DecodeContext::Tracking => Some(Packet::Control(decode_control_frame(buf))),
        DecodeContext::Binding { checksum } => {
            if buf[..3] == BIND_HEADER_MARKER {
                let mut address = [0u8; ADDRESS_LEN];
                address.copy_from_slice(&buf[3..3 + ADDRESS_LEN]);
                return Some(Packet::BindHeader { address });
            }

            if checksum.matches(buf[0], buf[1]) && buf[2] < BIND_GROUP_COUNT {
                return Some(Packet::BindGroup(decode_bind_group(buf)));
            }

            None
        }
    }
}

/// Extract the hop channels of a bind group packet (checksum already verified)
fn decode_bind_group(buf: &RawPacket) -> BindGroup {
    let group = buf[2];
    let len = if group + 1 < BIND_GROUP_COUNT {
        BIND_GROUP_STRIDE
    } else {
        HOP_COUNT - BIND_GROUP_STRIDE * (BIND_GROUP_COUNT as usize - 1)
    };

    let mut channels = [0u8; BIND_GROUP_STRIDE];
    channels[..len].copy_from_slice(&buf[3..3 + len]);

    BindGroup {
        group,
        channels,
        len,
    }
}

/// Unpack the 8 channel values of a control frame
///
/// Each value is assembled from its low byte and a 2-bit slice of the
/// high word, then clamped to 0-1000.
#[must_use]
pub fn decode_control_frame(buf: &RawPacket) -> ControlFrame {
    let mut high = u16::from_le_bytes([buf[8], buf[9]]);
    let mut values = [0u16; NUM_CHANNELS];

    for (value, &low) in values.iter_mut().zip(&buf[..NUM_CHANNELS]) {
        let raw = ((high & 0x0003) << 8) | u16::from(low);
        high >>= 2;
        *value = raw.clamp(CHANNEL_VALUE_MIN, CHANNEL_VALUE_MAX);
    }

    ControlFrame { values }
}
