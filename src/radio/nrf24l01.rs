//! # nRF24L01 Driver
//!
//! Register-level driver for the Nordic nRF24L01(+) in receive-only use.
//!
//! The chip is reached through an `embedded-hal` [`SpiDevice`], which owns the
//! chip-select line so every command below is one CS-bracketed transaction.
//! The CE pin gates RX mode. Power-up and RX settling use blocking delays from
//! a [`DelayNs`] provider.
//!
//! Bus and pin errors are logged and the command is abandoned. The protocol
//! engine above has no error path; a failing bus shows up as a receiver that
//! never binds or goes offline.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};
use tracing::warn;

use super::{CrcMode, DataRate, RadioConfig, Transceiver};
use crate::protocol::{RawPacket, PACKET_SIZE};

/// Register map
#[allow(dead_code)]
mod reg {
    pub const CONFIG: u8 = 0x00;
    pub const EN_AA: u8 = 0x01;
    pub const EN_RXADDR: u8 = 0x02;
    pub const SETUP_AW: u8 = 0x03;
    pub const SETUP_RETR: u8 = 0x04;
    pub const RF_CH: u8 = 0x05;
    pub const RF_SETUP: u8 = 0x06;
    pub const STATUS: u8 = 0x07;
    pub const RX_ADDR_P0: u8 = 0x0A;
    pub const RX_PW_P0: u8 = 0x11;
    pub const FIFO_STATUS: u8 = 0x17;
    pub const DYNPD: u8 = 0x1C;
    pub const FEATURE: u8 = 0x1D;
}

/// SPI commands
mod cmd {
    pub const R_REGISTER: u8 = 0x00;
    pub const W_REGISTER: u8 = 0x20;
    pub const R_RX_PAYLOAD: u8 = 0x61;
    pub const FLUSH_RX: u8 = 0xE2;
}

/// `CONFIG` values: PWR_UP and PRIM_RX set, CRC bits per mode
const CONFIG_CRC_NONE: u8 = 0x03;
const CONFIG_CRC_1BYTE: u8 = 0x0B;
const CONFIG_CRC_2BYTE: u8 = 0x0F;

/// `RF_SETUP` data rate bits
const RF_SETUP_1MBPS: u8 = 0x00;
const RF_SETUP_2MBPS: u8 = 0x08;
const RF_SETUP_250KBPS: u8 = 0x20;

/// `FIFO_STATUS.RX_EMPTY`
const FIFO_RX_EMPTY: u8 = 0x01;

/// Number of RX pipes on the chip
const PIPE_COUNT: u8 = 6;

/// Power-on reset time
const POWER_ON_RESET_US: u32 = 100_000;

/// Power down to standby (Tpd2stby)
const POWER_UP_US: u32 = 5_000;

/// RX settling after CE goes high
const RX_SETTLE_US: u32 = 130;

/// nRF24L01 in primary receiver mode
pub struct Nrf24l01<SPI, CE, D> {
    spi: SPI,
    ce: CE,
    delay: D,
    address_width: u8,
    payload_size: u8,
}

impl<SPI, CE, D> std::fmt::Debug for Nrf24l01<SPI, CE, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nrf24l01")
            .field("address_width", &self.address_width)
            .field("payload_size", &self.payload_size)
            .finish_non_exhaustive()
    }
}

impl<SPI, CE, D> Nrf24l01<SPI, CE, D>
where
    SPI: SpiDevice,
    CE: OutputPin,
    D: DelayNs,
{
    /// Power the chip up in RX mode with auto-ack, retransmit and dynamic
    /// payloads disabled.
    ///
    /// Blocks for about 105 ms (power-on reset plus standby transition).
    pub fn new(spi: SPI, ce: CE, delay: D) -> Self {
        let mut radio = Self {
            spi,
            ce,
            delay,
            address_width: 5,
            payload_size: PACKET_SIZE as u8,
        };

        radio.set_ce(false);

        radio.delay.delay_us(POWER_ON_RESET_US);
        radio.write_register(reg::CONFIG, 0x00);
        radio.write_register(reg::CONFIG, CONFIG_CRC_1BYTE);
        radio.delay.delay_us(POWER_UP_US);
        radio.write_register(reg::EN_AA, 0x00);
        radio.write_register(reg::SETUP_RETR, 0x00);
        radio.write_register(reg::DYNPD, 0x00);
        radio.write_register(reg::FEATURE, 0x00);

        radio
    }

    /// Give back the bus, CE pin and delay provider
    pub fn release(self) -> (SPI, CE, D) {
        (self.spi, self.ce, self.delay)
    }

    fn set_ce(&mut self, high: bool) {
        let result = if high {
            self.ce.set_high()
        } else {
            self.ce.set_low()
        };
        if let Err(e) = result {
            warn!("nRF24L01 CE pin error: {:?}", e);
        }
    }

    fn read_register(&mut self, register: u8) -> Option<u8> {
        let mut value = [0u8; 1];
        let result = self.spi.transaction(&mut [
            Operation::Write(&[cmd::R_REGISTER | register]),
            Operation::Read(&mut value),
        ]);
        if let Err(e) = result {
            warn!("nRF24L01 read_register 0x{:02X} error: {:?}", register, e);
            return None;
        }
        Some(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) {
        self.write_register_bytes(register, &[value]);
    }

    fn write_register_bytes(&mut self, register: u8, data: &[u8]) {
        let result = self.spi.transaction(&mut [
            Operation::Write(&[cmd::W_REGISTER | register]),
            Operation::Write(data),
        ]);
        if let Err(e) = result {
            warn!("nRF24L01 write_register 0x{:02X} error: {:?}", register, e);
        }
    }

    fn command(&mut self, command: u8) {
        if let Err(e) = self.spi.write(&[command]) {
            warn!("nRF24L01 command 0x{:02X} error: {:?}", command, e);
        }
    }
}

impl<SPI, CE, D> Transceiver for Nrf24l01<SPI, CE, D>
where
    SPI: SpiDevice,
    CE: OutputPin,
    D: DelayNs,
{
    fn configure(&mut self, config: &RadioConfig) {
        let config_reg = match config.crc {
            CrcMode::None => CONFIG_CRC_NONE,
            CrcMode::OneByte => CONFIG_CRC_1BYTE,
            CrcMode::TwoBytes => CONFIG_CRC_2BYTE,
        };
        self.write_register(reg::CONFIG, config_reg);

        let rf_setup = match config.data_rate {
            DataRate::Mbps1 => RF_SETUP_1MBPS,
            DataRate::Mbps2 => RF_SETUP_2MBPS,
            DataRate::Kbps250 => RF_SETUP_250KBPS,
        };
        self.write_register(reg::RF_SETUP, rf_setup);

        let pipes = config.pipes.clamp(1, PIPE_COUNT);
        self.write_register(reg::EN_RXADDR, ((1u16 << pipes) - 1) as u8);

        self.address_width = config.address_width.clamp(3, 5);
        self.write_register(reg::SETUP_AW, self.address_width - 2);

        self.payload_size = config.payload_size.clamp(1, PACKET_SIZE as u8);
        for pipe in 0..PIPE_COUNT {
            self.write_register(reg::RX_PW_P0 + pipe, self.payload_size);
        }
    }

    fn set_address(&mut self, pipe: u8, address: &[u8]) {
        // Pipes 2-5 share the upper bytes of pipe 1 and take only the LSB
        let len = if pipe < 2 {
            self.address_width as usize
        } else {
            1
        };
        if address.len() < len || pipe >= PIPE_COUNT {
            warn!("nRF24L01 invalid address for pipe {}: {:02X?}", pipe, address);
            return;
        }
        self.write_register_bytes(reg::RX_ADDR_P0 + pipe, &address[..len]);
    }

    fn set_channel(&mut self, channel: u8) {
        self.write_register(reg::RF_CH, channel);
    }

    fn enable_rx(&mut self) {
        self.set_ce(true);
        self.delay.delay_us(RX_SETTLE_US);
    }

    fn disable_rx(&mut self) {
        self.set_ce(false);
    }

    fn has_packet(&mut self) -> bool {
        // A failed status read counts as an empty FIFO
        self.read_register(reg::FIFO_STATUS)
            .is_some_and(|status| status & FIFO_RX_EMPTY == 0)
    }

    fn read_packet(&mut self) -> RawPacket {
        let mut packet = [0u8; PACKET_SIZE];
        let size = self.payload_size as usize;
        let result = self.spi.transaction(&mut [
            Operation::Write(&[cmd::R_RX_PAYLOAD]),
            Operation::Read(&mut packet[..size]),
        ]);
        if let Err(e) = result {
            warn!("nRF24L01 read payload error: {:?}", e);
        }

        // Clear RX_DR, TX_DS and MAX_RT
        self.write_register(reg::STATUS, 0xFF);
        packet
    }

    fn flush_queue(&mut self) {
        self.command(cmd::FLUSH_RX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    /// SPI device that records every transaction as a flat byte list of writes
    /// and answers reads from a register image
    #[derive(Clone, Default)]
    struct FakeSpi {
        transactions: Arc<Mutex<Vec<Vec<u8>>>>,
        fifo_status: Arc<Mutex<u8>>,
        payload: Arc<Mutex<Vec<u8>>>,
    }

    impl FakeSpi {
        fn transactions(&self) -> Vec<Vec<u8>> {
            self.transactions.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.transactions.lock().unwrap().clear();
        }
    }

    impl embedded_hal::spi::ErrorType for FakeSpi {
        type Error = Infallible;
    }

    impl SpiDevice for FakeSpi {
        fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> Result<(), Infallible> {
            let mut written = Vec::new();
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(data) => written.extend_from_slice(*data),
                    Operation::Read(buf) => {
                        let source = if written.first() == Some(&cmd::R_RX_PAYLOAD) {
                            self.payload.lock().unwrap().clone()
                        } else {
                            vec![*self.fifo_status.lock().unwrap()]
                        };
                        for (dst, src) in buf.iter_mut().zip(source) {
                            *dst = src;
                        }
                    }
                    _ => {}
                }
            }
            self.transactions.lock().unwrap().push(written);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakePin {
        levels: Arc<Mutex<Vec<bool>>>,
    }

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.levels.lock().unwrap().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.levels.lock().unwrap().push(true);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeDelay {
        total_ns: Arc<Mutex<u64>>,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            *self.total_ns.lock().unwrap() += u64::from(ns);
        }
    }

    fn radio() -> (Nrf24l01<FakeSpi, FakePin, FakeDelay>, FakeSpi, FakePin, FakeDelay) {
        let spi = FakeSpi::default();
        let pin = FakePin::default();
        let delay = FakeDelay::default();
        let radio = Nrf24l01::new(spi.clone(), pin.clone(), delay.clone());
        (radio, spi, pin, delay)
    }

    #[test]
    fn test_power_up_sequence() {
        let (_radio, spi, pin, delay) = radio();

        assert_eq!(
            spi.transactions(),
            vec![
                vec![0x20, 0x00],
                vec![0x20, 0x0B],
                vec![0x21, 0x00],
                vec![0x24, 0x00],
                vec![0x3C, 0x00],
                vec![0x3D, 0x00],
            ]
        );
        assert_eq!(*pin.levels.lock().unwrap(), vec![false]);
        assert_eq!(*delay.total_ns.lock().unwrap(), 105_000_000);
    }

    #[test]
    fn test_configure_hisky() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();

        radio.configure(&RadioConfig::hisky());

        let tx = spi.transactions();
        assert_eq!(tx[0], vec![0x20, 0x0F]); // CONFIG: 2-byte CRC
        assert_eq!(tx[1], vec![0x26, 0x00]); // RF_SETUP: 1 Mbps
        assert_eq!(tx[2], vec![0x22, 0x01]); // EN_RXADDR: pipe 0
        assert_eq!(tx[3], vec![0x23, 0x03]); // SETUP_AW: 5 bytes
        for pipe in 0..6u8 {
            assert_eq!(tx[4 + pipe as usize], vec![0x31 + pipe, 10]);
        }
        assert_eq!(tx.len(), 10);
    }

    #[test]
    fn test_configure_other_modes() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();

        radio.configure(&RadioConfig {
            crc: CrcMode::None,
            data_rate: DataRate::Kbps250,
            pipes: 6,
            address_width: 3,
            payload_size: 8,
        });

        let tx = spi.transactions();
        assert_eq!(tx[0], vec![0x20, 0x03]);
        assert_eq!(tx[1], vec![0x26, 0x20]);
        assert_eq!(tx[2], vec![0x22, 0x3F]);
        assert_eq!(tx[3], vec![0x23, 0x01]);
        assert_eq!(tx[4], vec![0x31, 8]);
    }

    #[test]
    fn test_set_address_pipe0_uses_address_width() {
        let (mut radio, spi, _, _) = radio();
        radio.configure(&RadioConfig::hisky());
        spi.clear();

        radio.set_address(0, &[0x12, 0x23, 0x23, 0x45, 0x78]);
        radio.set_address(3, &[0xAB]);

        assert_eq!(
            spi.transactions(),
            vec![
                vec![0x2A, 0x12, 0x23, 0x23, 0x45, 0x78],
                vec![0x2D, 0xAB],
            ]
        );
    }

    #[test]
    fn test_set_address_too_short_is_ignored() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();
        radio.set_address(0, &[1, 2]);
        assert!(spi.transactions().is_empty());
    }

    #[test]
    fn test_enable_disable_drive_ce_and_settle() {
        let (mut radio, spi, pin, delay) = radio();
        spi.clear();
        *delay.total_ns.lock().unwrap() = 0;

        radio.enable_rx();
        radio.disable_rx();

        assert_eq!(*pin.levels.lock().unwrap(), vec![false, true, false]);
        assert_eq!(*delay.total_ns.lock().unwrap(), 130_000);
        assert!(spi.transactions().is_empty());
    }

    #[test]
    fn test_set_channel() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();
        radio.set_channel(81);
        assert_eq!(spi.transactions(), vec![vec![0x25, 81]]);
    }

    #[test]
    fn test_has_packet_reads_fifo_status() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();

        *spi.fifo_status.lock().unwrap() = 0x11; // RX_EMPTY set
        assert!(!radio.has_packet());

        *spi.fifo_status.lock().unwrap() = 0x10;
        assert!(radio.has_packet());

        assert_eq!(spi.transactions(), vec![vec![0x17], vec![0x17]]);
    }

    #[test]
    fn test_read_packet_then_clear_status() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();
        *spi.payload.lock().unwrap() = (1..=10).collect();

        let packet = radio.read_packet();

        assert_eq!(packet, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(spi.transactions(), vec![vec![0x61], vec![0x27, 0xFF]]);
    }

    #[test]
    fn test_flush_queue() {
        let (mut radio, spi, _, _) = radio();
        spi.clear();
        radio.flush_queue();
        assert_eq!(spi.transactions(), vec![vec![0xE2]]);
    }

    #[test]
    fn test_release_returns_parts() {
        let (radio, _, _, _) = radio();
        let (_spi, _pin, _delay) = radio.release();
    }
}
