//! # Hop Controller
//!
//! Follows the transmitter around its 20-slot hop sequence.
//!
//! ## Tracking
//!
//! Every received packet means the transmitter is about to move to the next
//! slot, so the receiver moves with it and arms a deadline one hop period out.
//!
//! ## Resynchronization
//!
//! When the deadline passes without a packet the receiver has lost step. It
//! jumps ahead by a backoff that doubles on every consecutive miss
//! (1, 2, 4, 8, 16) and saturates at 21, waiting `backoff` hop periods on the
//! new slot. Sitting still longer on a slot further ahead gives the
//! transmitter time to come round to it.

use std::time::Duration;

use crate::protocol::{BindInfo, HOP_COUNT, MAX_BACKOFF};
use crate::radio::{retune, Transceiver};

/// Position in the hop sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopState {
    /// Current slot (0-19)
    pub index: u8,
    /// Consecutive-miss multiplier, 0 while in step
    pub backoff: u8,
    /// When to give up on the current slot
    pub deadline: Duration,
}

/// Backoff after one more missed deadline
///
/// `clamp(max(1, 2 * backoff), 1, 21)`
#[must_use]
pub fn next_backoff(backoff: u8) -> u8 {
    backoff.saturating_mul(2).clamp(1, MAX_BACKOFF)
}

/// Hop index and deadline bookkeeping
#[derive(Debug, Clone)]
pub struct HopController {
    state: HopState,
    period: Duration,
}

impl HopController {
    /// # Arguments
    ///
    /// * `period` - Transmitter hop period
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            state: HopState::default(),
            period,
        }
    }

    #[must_use]
    pub fn state(&self) -> HopState {
        self.state
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tune to slot 0 and arm the first deadline
    pub fn start<R: Transceiver + ?Sized>(&mut self, radio: &mut R, bind: &BindInfo, now: Duration) {
        self.state = HopState {
            index: 0,
            backoff: 0,
            deadline: now + self.period,
        };
        retune(radio, bind.channel(0));
    }

    /// A packet arrived on the current slot: step to the next one
    pub fn on_packet<R: Transceiver + ?Sized>(
        &mut self,
        radio: &mut R,
        bind: &BindInfo,
        now: Duration,
    ) {
        self.state.backoff = 0;
        self.advance(radio, bind, 1);
        self.state.deadline = now + self.period;
    }

    /// Check the deadline; on expiry jump ahead with backoff.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether a resync hop was made
    pub fn on_idle<R: Transceiver + ?Sized>(
        &mut self,
        radio: &mut R,
        bind: &BindInfo,
        now: Duration,
    ) -> bool {
        if now < self.state.deadline {
            return false;
        }

        let backoff = next_backoff(self.state.backoff);
        self.state.backoff = backoff;
        self.advance(radio, bind, backoff);
        self.state.deadline = now + self.period * u32::from(backoff);
        true
    }

    fn advance<R: Transceiver + ?Sized>(&mut self, radio: &mut R, bind: &BindInfo, step: u8) {
        self.state.index = ((self.state.index as usize + step as usize) % HOP_COUNT) as u8;
        retune(radio, bind.channel(self.state.index));
    }
}
