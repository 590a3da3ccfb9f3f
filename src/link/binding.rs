//! # Binding State Machine
//!
//! Learns a transmitter's address and hop sequence over the air.
//!
//! ```text
//! Start ──tick──▶ AwaitHeader ──header──▶ AwaitGroup(0) ──g0──▶ AwaitGroup(1)
//!                                                                    │ g1
//!   Tracking ◀──immediately── Bound ◀──────────g2────────── AwaitGroup(2)
//! ```
//!
//! The handshake runs on the well-known bind channel and address. The header
//! carries the transmitter's private address; the three groups that follow
//! carry the 20 hop channels and are recognised by the 16-bit sum of that
//! address. Anything that does not fit the current step is dropped.
//!
//! A stored binding skips the handshake entirely and starts in `Bound`.
//! The only way back to `Start` is an explicit reset (or the optional bind
//! timeout while a handshake is in progress).

use std::time::Duration;
use tracing::{debug, info};

use crate::protocol::{
    decode, AddressChecksum, BindInfo, DecodeContext, Packet, RawPacket, BIND_ADDRESS,
    BIND_CHANNEL, BIND_GROUP_COUNT,
};
use crate::radio::Transceiver;

/// Protocol state of the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Unbound; the next tick arms the bind channel
    Start,
    /// Listening on the bind channel for a header
    AwaitHeader,
    /// Header seen; waiting for bind group 0, 1 or 2
    AwaitGroup(u8),
    /// Binding known; the next step tunes to the hop sequence
    Bound,
    /// Following the hop sequence and decoding control frames
    Tracking,
}

impl ProtocolState {
    /// Whether a handshake is in progress
    #[must_use]
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::AwaitHeader | Self::AwaitGroup(_))
    }

    /// Short lowercase name for logs and telemetry
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitHeader => "await_header",
            Self::AwaitGroup(_) => "await_group",
            Self::Bound => "bound",
            Self::Tracking => "tracking",
        }
    }
}

/// Handshake progress and the state it drives
#[derive(Debug, Clone)]
pub struct BindingStateMachine {
    state: ProtocolState,
    checksum: AddressChecksum,
    candidate: BindInfo,
    started: Duration,
    timeout: Option<Duration>,
}

impl BindingStateMachine {
    /// # Arguments
    ///
    /// * `stored` - Record loaded from storage; a bound record starts in `Bound`
    /// * `timeout` - Abandon an unfinished handshake after this long (`None`: wait forever)
    #[must_use]
    pub fn new(stored: &BindInfo, timeout: Option<Duration>) -> Self {
        let state = if stored.is_bound() {
            ProtocolState::Bound
        } else {
            ProtocolState::Start
        };

        Self {
            state,
            checksum: AddressChecksum::default(),
            candidate: BindInfo::unbound(),
            started: Duration::ZERO,
            timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// `Start → AwaitHeader`: tune to the bind channel and clear the accumulator
    pub fn begin<R: Transceiver + ?Sized>(&mut self, radio: &mut R, now: Duration) {
        radio.disable_rx();
        radio.set_address(0, &BIND_ADDRESS);
        radio.set_channel(BIND_CHANNEL);
        radio.enable_rx();
        radio.flush_queue();

        self.checksum = AddressChecksum::default();
        self.candidate = BindInfo::unbound();
        self.started = now;
        self.state = ProtocolState::AwaitHeader;
        info!("Waiting for bind header on channel {}", BIND_CHANNEL);
    }

    /// Feed one payload received during the handshake
    ///
    /// # Returns
    ///
    /// * `Option<BindInfo>` - The completed record once group 2 is accepted;
    ///   the machine is then in `Bound`
    pub fn accept(&mut self, packet: &RawPacket) -> Option<BindInfo> {
        let context = DecodeContext::Binding {
            checksum: self.checksum,
        };

        match (self.state, decode(packet, context)) {
            (ProtocolState::AwaitHeader, Some(Packet::BindHeader { address })) => {
                self.checksum = AddressChecksum::of(&address);
                self.candidate.address = address;
                self.state = ProtocolState::AwaitGroup(0);
                info!("Bind header received, transmitter address {:02X?}", address);
                None
            }
            (ProtocolState::AwaitGroup(expected), Some(Packet::BindGroup(group)))
                if group.group == expected =>
            {
                let offset = group.offset();
                let channels = group.channels();
                self.candidate.channels[offset..offset + channels.len()].copy_from_slice(channels);
                debug!("Bind group {} received: {:?}", expected, channels);

                if expected + 1 < BIND_GROUP_COUNT {
                    self.state = ProtocolState::AwaitGroup(expected + 1);
                    None
                } else {
                    self.state = ProtocolState::Bound;
                    info!("Binding complete, hop sequence {:?}", self.candidate.channels);
                    Some(self.candidate)
                }
            }
            (state, _) => {
                debug!("Ignoring packet in state {:?}: {:02X?}", state, packet);
                None
            }
        }
    }

    /// Whether an unfinished handshake has outlived the bind timeout
    #[must_use]
    pub fn timed_out(&self, now: Duration) -> bool {
        match self.timeout {
            Some(timeout) if self.state.is_binding() => now.saturating_sub(self.started) >= timeout,
            _ => false,
        }
    }

    /// `Bound → Tracking`
    pub fn enter_tracking(&mut self) {
        self.state = ProtocolState::Tracking;
    }

    /// Back to `Start` from any state
    pub fn reset(&mut self) {
        self.state = ProtocolState::Start;
        self.checksum = AddressChecksum::default();
    }
}

#[cfg(test)]
pub(crate) mod frames {
    //! Payload builders for handshake and control traffic in tests

    use crate::protocol::{AddressChecksum, RawPacket, BIND_HEADER_MARKER, HOP_COUNT, PACKET_SIZE};

    pub const TX_ADDRESS: [u8; 5] = [0x3C, 0x91, 0x07, 0xE2, 0x5A];

    pub fn hop_sequence() -> [u8; HOP_COUNT] {
        let mut channels = [0u8; HOP_COUNT];
        for (i, ch) in channels.iter_mut().enumerate() {
            *ch = 4 + 3 * i as u8;
        }
        channels
    }

    pub fn header(address: [u8; 5]) -> RawPacket {
        let mut buf = [0u8; PACKET_SIZE];
        buf[..3].copy_from_slice(&BIND_HEADER_MARKER);
        buf[3..8].copy_from_slice(&address);
        buf
    }

    pub fn group(address: [u8; 5], group: u8, channels: &[u8; HOP_COUNT]) -> RawPacket {
        let sum = AddressChecksum::of(&address).value().to_le_bytes();
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = sum[0];
        buf[1] = sum[1];
        buf[2] = group;
        let start = group as usize * 7;
        let end = (start + 7).min(HOP_COUNT);
        buf[3..3 + end - start].copy_from_slice(&channels[start..end]);
        buf
    }

    /// Control frame for 8 values in 0-1023
    pub fn control(values: [u16; 8]) -> RawPacket {
        let mut buf = [0u8; PACKET_SIZE];
        let mut high = 0u16;
        for (i, &value) in values.iter().enumerate() {
            buf[i] = (value & 0xFF) as u8;
            high |= ((value >> 8) & 0x3) << (2 * i);
        }
        buf[8..].copy_from_slice(&high.to_le_bytes());
        buf
    }
}
