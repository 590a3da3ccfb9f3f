//! # CRSF RC Channels Frame
//!
//! Encodes receiver channel values as a CRSF `RC_CHANNELS_PACKED` frame.
//!
//! ```text
//! 0xC8 | 0x18 | 0x16 | 22-byte payload | CRC-8/DVB-S2
//! sync   len    type   16 x 11 bits      over type + payload
//! ```

use crc::{Crc, CRC_8_DVB_S2};

use crate::protocol::{ChannelValues, CHANNEL_VALUE_MAX, NUM_CHANNELS};

/// Frame sync byte (addressed to the flight controller)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// RC channels packet type
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;

/// Type + payload + CRC
pub const CRSF_RC_CHANNELS_FRAME_LENGTH: u8 = 0x18;

/// 16 channels x 11 bits
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// Complete frame size on the wire
pub const CRSF_RC_CHANNELS_FRAME_SIZE: usize = CRSF_RC_CHANNELS_PAYLOAD_SIZE + 4;

pub const CRSF_NUM_CHANNELS: usize = 16;

pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;
pub const CRSF_CHANNEL_VALUE_CENTER: u16 = 1024;

/// 16 CRSF channels, 11-bit values
pub type RcChannels = [u16; CRSF_NUM_CHANNELS];

/// A complete CRSF RC channels frame
pub type RcChannelsFrame = [u8; CRSF_RC_CHANNELS_FRAME_SIZE];

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_DVB_S2);

/// Rescale a receiver value (0-1000) to the CRSF range (0-2047)
///
/// Out-of-range input is clamped first.
#[must_use]
pub fn scale_channel(value: u16) -> u16 {
    let value = u32::from(value.min(CHANNEL_VALUE_MAX));
    (value * u32::from(CRSF_CHANNEL_VALUE_MAX) / u32::from(CHANNEL_VALUE_MAX)) as u16
}

/// Place the 8 receiver channels on CRSF channels 1-8
///
/// Channels 9-16 are held at center.
#[must_use]
pub fn map_channels(values: &ChannelValues) -> RcChannels {
    let mut channels = [CRSF_CHANNEL_VALUE_CENTER; CRSF_NUM_CHANNELS];
    for (out, &value) in channels[..NUM_CHANNELS].iter_mut().zip(values) {
        *out = scale_channel(value);
    }
    channels
}

/// Pack 16 channels LSB-first, 11 bits each
///
/// ```text
/// Byte 0: Ch1[0:7]
/// Byte 1: Ch1[8:10] | Ch2[0:4]
/// Byte 2: Ch2[5:10] | Ch3[0:1]
/// ...
/// ```
#[must_use]
pub fn pack_channels(channels: &RcChannels) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut out = 0;

    for &channel in channels {
        acc |= u32::from(channel.min(CRSF_CHANNEL_VALUE_MAX)) << bits;
        bits += 11;
        while bits >= 8 {
            payload[out] = (acc & 0xFF) as u8;
            out += 1;
            acc >>= 8;
            bits -= 8;
        }
    }

    payload
}

/// Build the complete RC channels frame for a set of receiver values
///
/// # Examples
///
/// ```
/// use hisky_rx::output::crsf::{encode_frame, CRSF_SYNC_BYTE};
///
/// let frame = encode_frame(&[500; 8]);
/// assert_eq!(frame.len(), 26);
/// assert_eq!(frame[0], CRSF_SYNC_BYTE);
/// ```
#[must_use]
pub fn encode_frame(values: &ChannelValues) -> RcChannelsFrame {
    encode_rc_channels(&map_channels(values))
}

/// Frame 16 pre-scaled CRSF channels
#[must_use]
pub fn encode_rc_channels(channels: &RcChannels) -> RcChannelsFrame {
    let mut frame = [0u8; CRSF_RC_CHANNELS_FRAME_SIZE];
    frame[0] = CRSF_SYNC_BYTE;
    frame[1] = CRSF_RC_CHANNELS_FRAME_LENGTH;
    frame[2] = CRSF_FRAMETYPE_RC_CHANNELS_PACKED;
    frame[3..3 + CRSF_RC_CHANNELS_PAYLOAD_SIZE].copy_from_slice(&pack_channels(channels));

    let last = CRSF_RC_CHANNELS_FRAME_SIZE - 1;
    frame[last] = CRC8.checksum(&frame[2..last]);
    frame
}
