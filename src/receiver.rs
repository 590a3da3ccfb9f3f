//! # Receiver
//!
//! The externally visible receiver: one owned value that the caller ticks.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use hisky_rx::radio::replay::ReplayRadio;
//! use hisky_rx::receiver::{Receiver, ReceiverConfig};
//! use hisky_rx::storage::MemoryStore;
//!
//! let radio = ReplayRadio::new(Vec::new(), false);
//! let mut rx = Receiver::new(radio, MemoryStore::new(), ReceiverConfig::default());
//!
//! let start = Instant::now();
//! for _ in 0..10 {
//!     rx.tick(start.elapsed());
//! }
//! assert!(!rx.bound());
//! assert!(!rx.online());
//! ```
//!
//! All mutation happens in [`tick`](Receiver::tick) and
//! [`reset`](Receiver::reset). The accessors only read state.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::link::{BindingStateMachine, HopController, HopState, ProtocolState};
use crate::protocol::{
    decode_control_frame, BindInfo, ChannelValues, RawPacket, HOP_PERIOD, LIVENESS_TICKS,
    NUM_CHANNELS,
};
use crate::radio::{RadioConfig, Transceiver};
use crate::storage::BindStore;

/// Receiver tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Transmitter hop period
    pub hop_period: Duration,
    /// Abandon an unfinished handshake after this long (`None`: never)
    pub bind_timeout: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            hop_period: HOP_PERIOD,
            bind_timeout: None,
        }
    }
}

/// Decaying "recently heard" counter, in ticks
#[derive(Debug, Clone, Copy, Default)]
struct Liveness(u32);

impl Liveness {
    fn refresh(&mut self) {
        self.0 = LIVENESS_TICKS;
    }

    fn decay(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    fn is_online(&self) -> bool {
        self.0 > 0
    }
}

/// HiSKY receiver driving a transceiver `R` and a bind record store `S`
#[derive(Debug)]
pub struct Receiver<R, S> {
    radio: R,
    store: S,
    bind: BindInfo,
    machine: BindingStateMachine,
    hop: HopController,
    liveness: Liveness,
    values: ChannelValues,
    frames: u64,
}

impl<R: Transceiver, S: BindStore> Receiver<R, S> {
    /// Configure the radio and load the stored binding
    ///
    /// A store that cannot be read is treated as unbound.
    pub fn new(mut radio: R, mut store: S, config: ReceiverConfig) -> Self {
        radio.configure(&RadioConfig::hisky());

        let bind = store.load().unwrap_or_else(|e| {
            warn!("Failed to load bind record, starting unbound: {}", e);
            BindInfo::unbound()
        });

        if bind.is_bound() {
            info!("Restored binding for transmitter {:02X?}", bind.address);
        } else {
            info!("No binding stored, waiting for transmitter");
        }

        Self {
            radio,
            store,
            machine: BindingStateMachine::new(&bind, config.bind_timeout),
            bind,
            hop: HopController::new(config.hop_period),
            liveness: Liveness::default(),
            values: [0; NUM_CHANNELS],
            frames: 0,
        }
    }

    /// Run one step of the protocol engine
    ///
    /// Call much more often than the hop period. Never blocks beyond a bus
    /// transaction and the radio's settling delays.
    ///
    /// # Arguments
    ///
    /// * `now` - Monotonic time since any fixed epoch
    pub fn tick(&mut self, now: Duration) {
        match self.machine.state() {
            ProtocolState::Start => {
                self.machine.begin(&mut self.radio, now);
                return;
            }
            ProtocolState::Bound => {
                self.enter_tracking(now);
                return;
            }
            ProtocolState::AwaitHeader | ProtocolState::AwaitGroup(_) | ProtocolState::Tracking => {}
        }

        self.liveness.decay();

        if self.machine.timed_out(now) {
            info!("Bind attempt timed out, restarting handshake");
            self.machine.reset();
            return;
        }

        if !self.radio.has_packet() {
            if self.machine.state() == ProtocolState::Tracking
                && self.hop.on_idle(&mut self.radio, &self.bind, now)
            {
                let hop = self.hop.state();
                debug!("Missed hop, skipping to slot {} (backoff {})", hop.index, hop.backoff);
            }
            return;
        }

        let packet = self.radio.read_packet();
        if self.machine.state() == ProtocolState::Tracking {
            self.on_control_packet(&packet, now);
        } else if let Some(info) = self.machine.accept(&packet) {
            self.complete_binding(info, now);
        }
    }

    fn on_control_packet(&mut self, packet: &RawPacket, now: Duration) {
        self.hop.on_packet(&mut self.radio, &self.bind, now);

        // Everything heard while tracking is control data
        let frame = decode_control_frame(packet);
        self.values = frame.values;
        self.liveness.refresh();
        self.frames += 1;
    }

    fn complete_binding(&mut self, info: BindInfo, now: Duration) {
        self.bind = info;
        self.persist();
        self.enter_tracking(now);
    }

    /// `Bound → Tracking`: switch to the transmitter's address and slot 0
    fn enter_tracking(&mut self, now: Duration) {
        self.radio.disable_rx();
        self.radio.set_address(0, &self.bind.address);
        self.hop.start(&mut self.radio, &self.bind, now);
        self.radio.flush_queue();
        self.machine.enter_tracking();
        info!(
            "Tracking transmitter {:02X?} from channel {}",
            self.bind.address,
            self.bind.channel(0)
        );
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.store(&self.bind) {
            warn!("Failed to persist bind record: {}", e);
        }
    }

    /// Forget the binding and restart the handshake
    ///
    /// Writes the unbound sentinel to storage if a binding was stored; an
    /// already unbound receiver leaves storage untouched.
    pub fn reset(&mut self) {
        if self.bind.is_bound() {
            self.bind.invalidate();
            self.persist();
            info!("Binding forgotten");
        }
        self.machine.reset();
    }

    /// Last decoded channel values (0-1000), held until the next frame
    #[must_use]
    pub fn values(&self) -> &ChannelValues {
        &self.values
    }

    /// Whether a control frame arrived within the last 1000 ticks
    #[must_use]
    pub fn online(&self) -> bool {
        self.liveness.is_online()
    }

    /// Whether a binding is stored
    #[must_use]
    pub fn bound(&self) -> bool {
        self.bind.is_bound()
    }

    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.machine.state()
    }

    #[must_use]
    pub fn hop(&self) -> HopState {
        self.hop.state()
    }

    #[must_use]
    pub fn bind_info(&self) -> &BindInfo {
        &self.bind
    }

    /// Control frames decoded since startup
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Direct access to the transceiver, e.g. to advance a replay clock
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
