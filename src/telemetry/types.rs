//! Telemetry record types

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::link::ProtocolState;
use crate::protocol::ChannelValues;
use crate::radio::replay::ReplayStats;
use crate::radio::Transceiver;
use crate::receiver::Receiver;
use crate::storage::BindStore;

/// One link-status sample, written as a single JSON line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRecord {
    pub timestamp: DateTime<Utc>,
    pub state: &'static str,
    pub bound: bool,
    pub online: bool,
    pub hop_index: u8,
    pub backoff: u8,
    pub frames_received: u64,
    pub channels: ChannelValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<ReplayCounters>,
}

/// Replay radio delivery counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayCounters {
    pub received: u64,
    pub missed: u64,
    pub overflowed: u64,
}

impl From<ReplayStats> for ReplayCounters {
    fn from(stats: ReplayStats) -> Self {
        Self {
            received: stats.received,
            missed: stats.missed,
            overflowed: stats.overflowed,
        }
    }
}

impl LinkRecord {
    /// Sample the receiver's current status
    pub fn sample<R: Transceiver, S: BindStore>(receiver: &Receiver<R, S>, now: DateTime<Utc>) -> Self {
        let state = receiver.state();
        let hop = receiver.hop();
        let tracking = state == ProtocolState::Tracking;

        Self {
            timestamp: now,
            state: state.name(),
            bound: receiver.bound(),
            online: receiver.online(),
            hop_index: if tracking { hop.index } else { 0 },
            backoff: if tracking { hop.backoff } else { 0 },
            frames_received: receiver.frames_received(),
            channels: *receiver.values(),
            replay: None,
        }
    }

    #[must_use]
    pub fn with_replay(mut self, stats: ReplayStats) -> Self {
        self.replay = Some(stats.into());
        self
    }
}
