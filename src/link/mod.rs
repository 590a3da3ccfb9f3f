//! # Link Module
//!
//! Protocol engine state: the binding handshake and hop tracking.

pub mod binding;
pub mod hop;

pub use binding::{BindingStateMachine, ProtocolState};
pub use hop::{next_backoff, HopController, HopState};
