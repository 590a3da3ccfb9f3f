//! # Bind Record
//!
//! The transmitter address and hop sequence learned during binding, stored as
//! a fixed 25-byte record: address (5 bytes) followed by the hop channels
//! (20 bytes).

use super::constants::{ADDRESS_LEN, HOP_COUNT, UNBOUND_SENTINEL};
use crate::error::{Result, RxError};

/// Size of the persisted bind record
pub const BIND_RECORD_LEN: usize = ADDRESS_LEN + HOP_COUNT;

/// Transmitter address and hop sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindInfo {
    /// Private radio address of the transmitter
    pub address: [u8; ADDRESS_LEN],

    /// Hop sequence, one radio channel per slot
    pub channels: [u8; HOP_COUNT],
}

impl Default for BindInfo {
    fn default() -> Self {
        Self::unbound()
    }
}

impl BindInfo {
    /// An erased record (all bytes `0xFF`), which reads as unbound.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            address: [0xFF; ADDRESS_LEN],
            channels: [0xFF; HOP_COUNT],
        }
    }

    /// Whether the record holds a binding.
    ///
    /// Only `channels[0]` is inspected. A transmitter that really hops on
    /// channel 255 in its first slot is indistinguishable from an erased
    /// record.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.channels[0] != UNBOUND_SENTINEL
    }

    /// Writes the sentinel, keeping the remaining bytes.
    pub fn invalidate(&mut self) {
        self.channels[0] = UNBOUND_SENTINEL;
    }

    /// Radio channel for a hop slot.
    #[must_use]
    pub fn channel(&self, hop: u8) -> u8 {
        self.channels[hop as usize % HOP_COUNT]
    }

    /// Serializes the record in storage order.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; BIND_RECORD_LEN] {
        let mut record = [0u8; BIND_RECORD_LEN];
        record[..ADDRESS_LEN].copy_from_slice(&self.address);
        record[ADDRESS_LEN..].copy_from_slice(&self.channels);
        record
    }

    /// Parses a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`RxError::Storage`] if `record` is not exactly 25 bytes.
    pub fn from_bytes(record: &[u8]) -> Result<Self> {
        if record.len() != BIND_RECORD_LEN {
            return Err(RxError::Storage(format!(
                "Bind record must be {} bytes, got {}",
                BIND_RECORD_LEN,
                record.len()
            )));
        }

        let mut info = Self::unbound();
        info.address.copy_from_slice(&record[..ADDRESS_LEN]);
        info.channels.copy_from_slice(&record[ADDRESS_LEN..]);
        Ok(info)
    }
}

/// 16-bit wrapping sum of the bind address bytes.
///
/// Bind group packets carry it little-endian in their first two bytes so the
/// receiver can tell its own transmitter's groups apart from other traffic on
/// the bind channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressChecksum(u16);

impl AddressChecksum {
    /// Sums the bytes of `address`.
    #[must_use]
    pub fn of(address: &[u8]) -> Self {
        let mut sum = Self::default();
        for &byte in address {
            sum.add(byte);
        }
        sum
    }

    pub fn add(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(u16::from(byte));
    }

    #[must_use]
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Compares against the two checksum bytes of a bind group packet.
    #[must_use]
    pub fn matches(&self, low: u8, high: u8) -> bool {
        self.0.to_le_bytes() == [low, high]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_record_is_erased() {
        let info = BindInfo::unbound();
        assert!(!info.is_bound());
        assert_eq!(info.to_bytes(), [0xFF; BIND_RECORD_LEN]);
    }

    #[test]
    fn test_is_bound_checks_first_slot_only() {
        let mut info = BindInfo::unbound();
        info.channels[0] = 0x10;
        assert!(info.is_bound());

        // Sentinel wins even when the rest of the record looks valid
        let mut info = BindInfo {
            address: [1, 2, 3, 4, 5],
            channels: [7; HOP_COUNT],
        };
        info.channels[0] = UNBOUND_SENTINEL;
        assert!(!info.is_bound());
    }

    #[test]
    fn test_invalidate_keeps_remaining_bytes() {
        let mut info = BindInfo {
            address: [1, 2, 3, 4, 5],
            channels: [9; HOP_COUNT],
        };
        info.invalidate();
        assert!(!info.is_bound());
        assert_eq!(info.address, [1, 2, 3, 4, 5]);
        assert_eq!(info.channels[1], 9);
    }

    #[test]
    fn test_record_layout() {
        let mut channels = [0u8; HOP_COUNT];
        for (i, ch) in channels.iter_mut().enumerate() {
            *ch = 10 + i as u8;
        }
        let info = BindInfo {
            address: [0xA1, 0xA2, 0xA3, 0xA4, 0xA5],
            channels,
        };

        let record = info.to_bytes();
        assert_eq!(&record[..5], &[0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);
        assert_eq!(record[5], 10);
        assert_eq!(record[24], 29);
        assert_eq!(BindInfo::from_bytes(&record).unwrap(), info);
    }

    #[test]
    fn test_from_bytes_wrong_length() {
        assert!(matches!(
            BindInfo::from_bytes(&[0u8; 24]),
            Err(RxError::Storage(_))
        ));
        assert!(BindInfo::from_bytes(&[0u8; 26]).is_err());
        assert!(BindInfo::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_channel_wraps_hop_index() {
        let mut info = BindInfo::unbound();
        info.channels[0] = 3;
        info.channels[1] = 4;
        assert_eq!(info.channel(0), 3);
        assert_eq!(info.channel(21), 4);
    }

    #[test]
    fn test_checksum_sum() {
        let sum = AddressChecksum::of(&[0x12, 0x23, 0x23, 0x45, 0x78]);
        assert_eq!(sum.value(), 0x12 + 0x23 + 0x23 + 0x45 + 0x78);
        assert!(sum.matches(0x15, 0x01));
        assert!(!sum.matches(0x01, 0x15));
    }

    #[test]
    fn test_checksum_high_byte() {
        let sum = AddressChecksum::of(&[0xFF; 5]);
        assert_eq!(sum.value(), 0x04FB);
        assert!(sum.matches(0xFB, 0x04));
    }
}
