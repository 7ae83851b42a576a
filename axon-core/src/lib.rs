//! Dispatch layer of the Axon endpoint protocol.
//!
//! This crate contains the logic between validated packets and the
//! endpoint table that actually holds a device's remote properties and
//! functions:
//!
//! - The endpoint-table capability boundary (schema fingerprint, schema
//!   blob, call dispatch)
//! - Typed property accessors for exposing a value as endpoint storage
//! - The bidirectional channel that decodes call packets, tracks
//!   per-endpoint sequencing state and emits response packets
//!
//! Everything runs single-threaded to completion with fixed buffers; a
//! channel is reset by dropping and reconstructing it.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod channel;
pub mod endpoint;
pub mod property;

pub use channel::{Channel, ReceiverState, DEFAULT_TX_CAPACITY};
pub use endpoint::{EndpointTable, SCHEMA_ENDPOINT};
pub use property::Property;
