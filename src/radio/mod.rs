//! # Radio Module
//!
//! Minimal control surface over an nRF24L01-class packet radio.
//!
//! This module handles:
//! - The [`Transceiver`] trait driven by the protocol engine
//! - Radio configuration values (CRC, data rate, pipes, address width, payload size)
//! - The register-level nRF24L01 driver over `embedded-hal`
//! - A replay transceiver that plays back recorded air traffic
//!
//! The transceiver layer is a faithful shim: no retries, no buffering beyond
//! the chip's own RX FIFO. Protocol semantics live above it.

pub mod nrf24l01;
pub mod replay;

use crate::protocol::{RawPacket, ADDRESS_LEN, PACKET_SIZE};

/// CRC length appended by the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcMode {
    None,
    OneByte,
    TwoBytes,
}

/// Over-the-air data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    Kbps250,
    Mbps1,
    Mbps2,
}

/// Static radio settings applied once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub crc: CrcMode,
    pub data_rate: DataRate,
    /// Number of enabled RX pipes, starting at pipe 0
    pub pipes: u8,
    /// Address width in bytes (3-5)
    pub address_width: u8,
    /// Fixed payload size in bytes
    pub payload_size: u8,
}

impl RadioConfig {
    /// Settings used by HiSKY transmitters: 2-byte CRC, 1 Mbps, one pipe,
    /// 5-byte addresses, 10-byte payloads.
    #[must_use]
    pub const fn hisky() -> Self {
        Self {
            crc: CrcMode::TwoBytes,
            data_rate: DataRate::Mbps1,
            pipes: 1,
            address_width: ADDRESS_LEN as u8,
            payload_size: PACKET_SIZE as u8,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::hisky()
    }
}

/// Register-level operations the protocol engine needs from a packet radio.
///
/// Every call completes synchronously. Channel changes must be bracketed by
/// [`disable_rx`](Transceiver::disable_rx) and
/// [`enable_rx`](Transceiver::enable_rx); see [`retune`].
pub trait Transceiver {
    /// Apply CRC mode, data rate, pipe count, address width and payload size
    fn configure(&mut self, config: &RadioConfig);

    /// Set the receive address of a pipe
    fn set_address(&mut self, pipe: u8, address: &[u8]);

    /// Select the RF channel
    fn set_channel(&mut self, channel: u8);

    /// Start listening; returns after the RX settling delay
    fn enable_rx(&mut self);

    /// Stop listening
    fn disable_rx(&mut self);

    /// Whether a payload is waiting in the RX FIFO
    fn has_packet(&mut self) -> bool;

    /// Pop one payload and clear the pending-data flag
    fn read_packet(&mut self) -> RawPacket;

    /// Drop everything in the RX FIFO
    fn flush_queue(&mut self);
}

/// Switch to `channel` without reconfiguring mid-reception.
pub fn retune<R: Transceiver + ?Sized>(radio: &mut R, channel: u8) {
    radio.disable_rx();
    radio.set_channel(channel);
    radio.enable_rx();
}


#[cfg(test)]
mod tests {
    use super::mocks::{MockRadio, RadioOp};
    use super::*;

    #[test]
    fn test_hisky_config() {
        let config = RadioConfig::hisky();
        assert_eq!(config.crc, CrcMode::TwoBytes);
        assert_eq!(config.data_rate, DataRate::Mbps1);
        assert_eq!(config.pipes, 1);
        assert_eq!(config.address_width, 5);
        assert_eq!(config.payload_size, 10);
        assert_eq!(RadioConfig::default(), config);
    }

    #[test]
    fn test_retune_brackets_channel_change() {
        let mut radio = MockRadio::new();
        radio.enable_rx();
        radio.take_ops();

        retune(&mut radio, 42);

        assert_eq!(
            radio.take_ops(),
            vec![RadioOp::DisableRx, RadioOp::SetChannel(42), RadioOp::EnableRx]
        );
        assert!(radio.enabled);
    }
}
