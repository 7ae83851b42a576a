//! Frame encoding and the stream→packet segmenter.
//!
//! Frame format:
//! - SYNC (1 byte): `0xAA` synchronization marker
//! - LENGTH (1 byte): payload length (0–255)
//! - CRC-8 (1 byte): header guard over SYNC and LENGTH
//! - PAYLOAD (LENGTH bytes)
//! - CRC-16 (2 bytes, little-endian): over SYNC, LENGTH, CRC-8 and PAYLOAD
//!
//! The [`Framer`] wraps packets in this format on the way out; the
//! [`Deframer`] recovers them from an arbitrary chunked byte stream on
//! the way in, discarding anything that fails a checksum and
//! resynchronizing on the next marker byte.

use crate::crc::{crc16, crc8, CRC16_INIT, CRC8_INIT};
use crate::sink::{push_all, ByteSink, Capacity, PacketSink, SinkError};
use heapless::Vec;

/// Frame synchronization byte.
pub const SYNC_BYTE: u8 = 0xAA;

/// Wire size of the frame header (SYNC, LENGTH, CRC-8).
pub const HEADER_SIZE: usize = 3;

/// Wire size of the CRC-16 trailer.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the LENGTH byte can declare.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Default receive capacity: payload plus trailer of an incoming frame.
pub const DEFAULT_RX_CAPACITY: usize = 128;

/// Packet sink that frames each packet into an underlying byte sink.
///
/// A byte sink that fills up mid-frame leaves a truncated frame on the
/// wire; the peer's deframer discards it on the trailer check, so the
/// failure is reported but never corrupts the stream.
#[derive(Debug)]
pub struct Framer<S> {
    output: S,
}

impl<S: ByteSink> Framer<S> {
    /// Frame packets into `output`.
    pub fn new(output: S) -> Self {
        Self { output }
    }

    /// Recover the wrapped sink.
    pub fn into_inner(self) -> S {
        self.output
    }
}

impl<S: ByteSink> PacketSink for Framer<S> {
    fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError> {
        if packet.len() > MAX_PAYLOAD {
            return Err(SinkError::Rejected);
        }

        let mut header = [SYNC_BYTE, packet.len() as u8, 0];
        header[2] = crc8(CRC8_INIT, &header[..2]);

        let mut trailer = crc16(CRC16_INIT, &header);
        trailer = crc16(trailer, packet);

        push_all(&mut self.output, &header)?;
        push_all(&mut self.output, packet)?;
        push_all(&mut self.output, &trailer.to_le_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeframeState {
    /// Scanning for a marker and validating the 3-byte header.
    Header,
    /// Accumulating payload and trailer bytes of a declared frame.
    Payload,
}

/// Stream→packet segmenter.
///
/// Consumes arbitrary chunks of a byte stream and delivers every frame
/// whose header guard and trailer both check out to the downstream
/// packet sink. `RX_CAP` bounds the buffered payload plus trailer, so a
/// frame may declare at most `RX_CAP - 2` payload bytes; larger
/// declarations are abandoned and scanning resumes.
///
/// The segmenter itself never fills up: [`ByteSink::push`] always
/// consumes the whole chunk, and garbage input is discarded at one byte
/// per step, so progress is guaranteed on any input.
#[derive(Debug)]
pub struct Deframer<P, const RX_CAP: usize = DEFAULT_RX_CAPACITY> {
    output: P,
    state: DeframeState,
    header: [u8; HEADER_SIZE],
    header_len: usize,
    payload: Vec<u8, RX_CAP>,
    expected: usize,
}

impl<P: PacketSink, const RX_CAP: usize> Deframer<P, RX_CAP> {
    /// Deliver deframed packets to `output`.
    pub fn new(output: P) -> Self {
        Self {
            output,
            state: DeframeState::Header,
            header: [0; HEADER_SIZE],
            header_len: 0,
            payload: Vec::new(),
            expected: 0,
        }
    }

    /// Drop any partially received frame and return to scanning.
    pub fn reset(&mut self) {
        self.state = DeframeState::Header;
        self.header_len = 0;
        self.payload.clear();
        self.expected = 0;
    }

    /// Recover the downstream packet sink.
    pub fn into_inner(self) -> P {
        self.output
    }

    fn feed(&mut self, byte: u8) {
        match self.state {
            DeframeState::Header => self.feed_header(byte),
            DeframeState::Payload => self.feed_payload(byte),
        }
    }

    fn feed_header(&mut self, byte: u8) {
        if self.header_len == 0 && byte != SYNC_BYTE {
            // noise between frames; scan on
            return;
        }
        self.header[self.header_len] = byte;
        self.header_len += 1;
        if self.header_len < HEADER_SIZE {
            return;
        }

        // A failed guard may hide a real header starting one byte later
        // within the buffered bytes, so shift instead of flushing.
        while self.header_len == HEADER_SIZE {
            if crc8(CRC8_INIT, &self.header[..2]) == self.header[2] {
                self.begin_payload();
                return;
            }
            self.shift_header();
        }
    }

    fn shift_header(&mut self) {
        self.header.copy_within(1.., 0);
        self.header_len -= 1;
        while self.header_len > 0 && self.header[0] != SYNC_BYTE {
            self.header.copy_within(1.., 0);
            self.header_len -= 1;
        }
    }

    fn begin_payload(&mut self) {
        let declared = usize::from(self.header[1]);
        if declared + TRAILER_SIZE > RX_CAP {
            // oversized declaration is a protocol violation, not a crash
            #[cfg(feature = "defmt")]
            defmt::trace!("frame dropped: declared length {} exceeds capacity", declared);
            self.header_len = 0;
            return;
        }
        self.expected = declared + TRAILER_SIZE;
        self.payload.clear();
        self.state = DeframeState::Payload;
    }

    fn feed_payload(&mut self, byte: u8) {
        // cannot overflow: expected <= RX_CAP was checked at entry
        let _ = self.payload.push(byte);
        if self.payload.len() < self.expected {
            return;
        }

        let declared = self.expected - TRAILER_SIZE;
        let mut computed = crc16(CRC16_INIT, &self.header);
        computed = crc16(computed, &self.payload[..declared]);
        let received = u16::from_le_bytes([self.payload[declared], self.payload[declared + 1]]);

        if computed == received {
            // delivery failure is the consumer's concern; framing state
            // resynchronizes either way
            let _ = self.output.accept(&self.payload[..declared]);
        } else {
            #[cfg(feature = "defmt")]
            defmt::trace!("frame dropped: trailer mismatch");
        }

        self.header_len = 0;
        self.payload.clear();
        self.state = DeframeState::Header;
    }
}

impl<P: PacketSink, const RX_CAP: usize> ByteSink for Deframer<P, RX_CAP> {
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        for &byte in bytes {
            self.feed(byte);
        }
        Ok(bytes.len())
    }

    fn free_space(&self) -> Capacity {
        Capacity::Unbounded
    }
}
