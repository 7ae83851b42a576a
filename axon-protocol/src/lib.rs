//! Wire layer of the Axon endpoint protocol.
//!
//! This crate turns an unreliable, possibly fragmented byte stream into
//! discrete, integrity-checked packets and back. It carries no call
//! semantics of its own; the dispatch layer (`axon-core`) sits on top.
//!
//! # Frame format
//!
//! All frames use a fixed binary layout:
//! ```text
//! ┌──────┬────────┬──────────┬─────────────┬───────┐
//! │ SYNC │ LENGTH │ CRC-8    │ PAYLOAD     │ CRC-16│
//! │ 1B   │ 1B     │ 1B       │ 0–255B      │ 2B LE │
//! └──────┴────────┴──────────┴─────────────┴───────┘
//! ```
//!
//! The CRC-8 guards only the two header bytes, so false sync matches in
//! random data are rejected before a payload is buffered. The CRC-16
//! covers the whole frame (header + payload). A frame failing either
//! check is discarded and the receiver resynchronizes on the next SYNC
//! byte; corruption never reaches the dispatch layer and never halts the
//! stream.
//!
//! # Multi-byte values
//!
//! Everything on the wire is little-endian, including the CRC-16 trailer
//! and every value marshalled by the [`codec`] module.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod codec;
pub mod crc;
pub mod frame;
pub mod sink;

pub use codec::{Codec, EndpointRef, Reader, Writer};
pub use frame::{Deframer, Framer, DEFAULT_RX_CAPACITY, SYNC_BYTE};
pub use sink::{ByteSink, ByteSource, Capacity, PacketSink, SinkError, SourceError};

/// Version of the wire protocol spoken by this crate.
pub const PROTOCOL_VERSION: u16 = 1;
