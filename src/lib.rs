//! # HiSKY RX Library
//!
//! Receiver for the HiSKY 2.4GHz RC protocol on nRF24L01-class radios.
//!
//! This library provides the protocol core (binding handshake, hop tracking,
//! packet decoding) behind a single [`Receiver`](receiver::Receiver) that the
//! caller ticks, plus the collaborators a host needs around it: an
//! `embedded-hal` radio driver, a capture replay radio, bind record storage,
//! CRSF output and link telemetry.

pub mod config;
pub mod error;
pub mod link;
pub mod output;
pub mod protocol;
pub mod radio;
pub mod receiver;
pub mod storage;
pub mod telemetry;
