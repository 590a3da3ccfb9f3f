//! # Replay Transceiver
//!
//! Plays recorded air traffic back into the receiver.
//!
//! A capture is a JSON Lines file, one packet per line:
//!
//! ```text
//! {"at_us":120000,"channel":81,"address":[18,35,35,69,120],"payload":[255,170,85,60,145,7,226,90,0,0]}
//! ```
//!
//! The radio model is deliberately small: when a packet's timestamp passes it
//! is "on air" for an instant. It lands in the 3-deep RX FIFO only if RX is
//! enabled on that channel with pipe 0 set to that address; otherwise it is
//! lost, exactly as a real transceiver tuned elsewhere would miss it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RadioConfig, Transceiver};
use crate::error::{Result, RxError};
use crate::protocol::{RawPacket, ADDRESS_LEN, PACKET_SIZE};

/// Depth of the nRF24L01 RX FIFO
const RX_FIFO_DEPTH: usize = 3;

/// One recorded transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirPacket {
    /// Time of transmission relative to the start of the capture
    pub at_us: u64,
    /// RF channel
    pub channel: u8,
    /// Destination address
    pub address: [u8; ADDRESS_LEN],
    /// Payload bytes
    pub payload: RawPacket,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Packets placed in the RX FIFO
    pub received: u64,
    /// Packets sent while the radio listened elsewhere (or not at all)
    pub missed: u64,
    /// Packets lost to a full RX FIFO
    pub overflowed: u64,
}

/// Load a capture file
///
/// Blank lines are ignored; malformed lines are skipped with a warning.
/// Packets are returned ordered by timestamp.
///
/// # Errors
///
/// Returns error if the file cannot be read or holds no usable packet
pub fn load_capture<P: AsRef<Path>>(path: P) -> Result<Vec<AirPacket>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let packets = parse_capture(&contents);

    if packets.is_empty() {
        return Err(RxError::Capture(format!(
            "No packets in capture {}",
            path.display()
        )));
    }

    debug!("Loaded {} packets from {}", packets.len(), path.display());
    Ok(packets)
}

/// Parse capture text, skipping malformed lines
pub fn parse_capture(contents: &str) -> Vec<AirPacket> {
    let mut packets: Vec<AirPacket> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str(line) {
            Ok(packet) => Some(packet),
            Err(e) => {
                warn!("Skipping capture line {}: {}", number + 1, e);
                None
            }
        })
        .collect();

    packets.sort_by_key(|p| p.at_us);
    packets
}

/// Transceiver fed from a capture
#[derive(Debug)]
pub struct ReplayRadio {
    capture: Vec<AirPacket>,
    pending: VecDeque<AirPacket>,
    fifo: VecDeque<RawPacket>,
    config: RadioConfig,
    address: [u8; ADDRESS_LEN],
    channel: u8,
    listening: bool,
    looping: bool,
    base: Duration,
    stats: ReplayStats,
}

impl ReplayRadio {
    /// Create a replay radio over `capture`
    ///
    /// # Arguments
    ///
    /// * `capture` - Recorded packets, in any order
    /// * `looping` - Restart the capture once it has been played out
    pub fn new(mut capture: Vec<AirPacket>, looping: bool) -> Self {
        capture.sort_by_key(|p| p.at_us);
        let pending = capture.iter().copied().collect();

        Self {
            capture,
            pending,
            fifo: VecDeque::with_capacity(RX_FIFO_DEPTH),
            config: RadioConfig::default(),
            address: [0; ADDRESS_LEN],
            channel: 0,
            listening: false,
            looping,
            base: Duration::ZERO,
            stats: ReplayStats::default(),
        }
    }

    /// Put every packet sent up to `now` on the air
    pub fn advance(&mut self, now: Duration) {
        loop {
            let Some(packet) = self.pending.front().copied() else {
                if !self.looping || self.capture.is_empty() {
                    return;
                }
                self.restart(now);
                continue;
            };

            if self.base + Duration::from_micros(packet.at_us) > now {
                return;
            }
            self.pending.pop_front();
            self.transmit(&packet);
        }
    }

    fn restart(&mut self, now: Duration) {
        let first = self.capture.first().map_or(0, |p| p.at_us);
        // Start the next pass right after `now`, keeping the capture's spacing
        self.base = (now + Duration::from_micros(1)).saturating_sub(Duration::from_micros(first));
        self.pending = self.capture.iter().copied().collect();
        debug!("Replay restarted at {:?}", now);
    }

    fn transmit(&mut self, packet: &AirPacket) {
        let width = (self.config.address_width as usize).min(ADDRESS_LEN);
        let heard = self.listening
            && packet.channel == self.channel
            && packet.address[..width] == self.address[..width];

        if !heard {
            self.stats.missed += 1;
            return;
        }

        if self.fifo.len() >= RX_FIFO_DEPTH {
            self.stats.overflowed += 1;
            return;
        }

        let mut payload = [0u8; PACKET_SIZE];
        let size = (self.config.payload_size as usize).min(PACKET_SIZE);
        payload[..size].copy_from_slice(&packet.payload[..size]);
        self.fifo.push_back(payload);
        self.stats.received += 1;
    }

    /// Whether every packet has been played (never true when looping)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && !self.looping
    }

    /// Currently tuned RF channel
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Whether RX is enabled
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    #[must_use]
    pub fn stats(&self) -> ReplayStats {
        self.stats
    }
}

impl Transceiver for ReplayRadio {
    fn configure(&mut self, config: &RadioConfig) {
        self.config = *config;
    }

    fn set_address(&mut self, pipe: u8, address: &[u8]) {
        if pipe != 0 {
            return;
        }
        let len = address.len().min(ADDRESS_LEN);
        self.address = [0; ADDRESS_LEN];
        self.address[..len].copy_from_slice(&address[..len]);
    }

    fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
    }

    fn enable_rx(&mut self) {
        self.listening = true;
    }

    fn disable_rx(&mut self) {
        self.listening = false;
    }

    fn has_packet(&mut self) -> bool {
        !self.fifo.is_empty()
    }

    fn read_packet(&mut self) -> RawPacket {
        self.fifo.pop_front().unwrap_or([0; PACKET_SIZE])
    }

    fn flush_queue(&mut self) {
        self.fifo.clear();
    }
}
