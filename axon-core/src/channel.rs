//! Bidirectional packet dispatch.
//!
//! The channel sits behind the deframer: it receives one validated,
//! already-deframed packet at a time, turns it into an endpoint call and
//! pushes the response packet (if one is due) into an output sink.
//!
//! # Call packet body
//!
//! ```text
//! ┌─────────────┬──────────┬─────────┬───────┬───────────┐
//! │ endpoint_id │ json_crc │ seqno   │ flags │ arguments │
//! │ 2B LE       │ 2B LE    │ 2B LE   │ 1B    │ ...       │
//! └─────────────┴──────────┴─────────┴───────┴───────────┘
//! ```
//!
//! Flags: bit 0 requests a bare acknowledgment, bit 1 a response body,
//! bit 2 strict in-order delivery for the endpoint. Unknown bits reject
//! the packet. A response echoes `[seqno | 0x8000]` (2 bytes LE)
//! followed by the result bytes.
//!
//! # Failure semantics
//!
//! Malformed headers, stale schema fingerprints, ordering violations,
//! unknown endpoints, rejected calls and oversized results are all
//! dropped without an error packet; the caller's own timeout and retry
//! are the only recovery channel. Nothing here blocks or halts the
//! device.

use axon_protocol::codec::{Codec, EndpointRef, Reader};
use axon_protocol::sink::{BufferSink, ByteSink, PacketSink, SinkError, SkipSink};
use heapless::FnvIndexMap;

use crate::endpoint::{EndpointTable, SCHEMA_ENDPOINT};

/// Default transmit scratch capacity: seqno echo plus result bytes.
pub const DEFAULT_TX_CAPACITY: usize = 32;

/// Bound on concurrently tracked per-endpoint exchanges.
pub const MAX_EXCHANGES: usize = 8;

/// High bit marking a seqno as belonging to a response packet.
pub const RESPONSE_FLAG: u16 = 0x8000;

/// Call header flag bits.
pub mod call_flags {
    /// Caller wants a bare acknowledgment packet.
    pub const EXPECT_ACK: u8 = 1 << 0;
    /// Caller wants a response body.
    pub const EXPECT_RESPONSE: u8 = 1 << 1;
    /// Reject out-of-order sequence numbers for this endpoint.
    pub const ENFORCE_ORDERING: u8 = 1 << 2;
    /// Every bit this protocol version understands.
    pub const KNOWN: u8 = EXPECT_ACK | EXPECT_RESPONSE | ENFORCE_ORDERING;
}

const SEQNO_SIZE: usize = core::mem::size_of::<u16>();

/// Per-endpoint bookkeeping across a multi-packet exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverState {
    /// Argument bytes seen for the endpoint across the exchange.
    pub length: usize,
    /// Exchange thread discriminator (high bit of the seqno space).
    pub seqno_thread: u16,
    /// Last accepted sequence number.
    pub seqno: u16,
    /// Caller wants a bare acknowledgment packet.
    pub expect_ack: bool,
    /// Caller wants a response body.
    pub expect_response: bool,
    /// Out-of-order sequence numbers are rejected, not reordered.
    pub enforce_ordering: bool,
}

type ExchangeMap = FnvIndexMap<u16, ReceiverState, MAX_EXCHANGES>;

/// Dispatch engine for one communication channel.
///
/// Owns the endpoint table capability, the per-endpoint receiver-state
/// table and a fixed transmit scratch buffer. Single-threaded,
/// run-to-completion: one `accept` call fully processes one packet.
/// Resetting a channel means dropping and reconstructing it, or calling
/// [`Channel::reset`] to forget all exchange state.
#[derive(Debug)]
pub struct Channel<T, P, const TX_CAP: usize = DEFAULT_TX_CAPACITY> {
    table: T,
    output: P,
    exchanges: ExchangeMap,
    tx_buf: [u8; TX_CAP],
}

impl<T: EndpointTable, P: PacketSink, const TX_CAP: usize> Channel<T, P, TX_CAP> {
    /// Dispatch packets against `table`, replying through `output`.
    pub fn new(table: T, output: P) -> Self {
        Self {
            table,
            output,
            exchanges: ExchangeMap::new(),
            tx_buf: [0; TX_CAP],
        }
    }

    /// The endpoint table capability.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// The output packet sink.
    pub fn output(&self) -> &P {
        &self.output
    }

    /// Receiver state of an endpoint, if any packet created one.
    pub fn exchange(&self, endpoint_id: u16) -> Option<&ReceiverState> {
        self.exchanges.get(&endpoint_id)
    }

    /// Forget all per-endpoint exchange state.
    pub fn reset(&mut self) {
        self.exchanges.clear();
    }

    /// Tear the channel apart into its table and output sink.
    pub fn into_parts(self) -> (T, P) {
        (self.table, self.output)
    }

    fn dispatch(&mut self, packet: &[u8]) {
        let Self {
            table,
            output,
            exchanges,
            tx_buf,
        } = self;

        let mut reader = Reader::new(packet);
        let Some(reference) = EndpointRef::decode(&mut reader) else {
            return;
        };
        let Some(seqno) = u16::decode(&mut reader) else {
            return;
        };
        let Some(flags) = u8::decode(&mut reader) else {
            return;
        };
        if flags & !call_flags::KNOWN != 0 {
            return;
        }

        let expect_ack = flags & call_flags::EXPECT_ACK != 0;
        let expect_response = flags & call_flags::EXPECT_RESPONSE != 0;
        let enforce_ordering = flags & call_flags::ENFORCE_ORDERING != 0;

        // Stale-schema calls are dropped outright. The schema endpoint
        // stays reachable regardless, so a caller can always rediscover
        // the live fingerprint.
        let is_schema = reference.endpoint_id == SCHEMA_ENDPOINT;
        if !is_schema && !table.is_ref_valid(reference) {
            #[cfg(feature = "defmt")]
            defmt::trace!(
                "call dropped: stale or invalid reference to endpoint {}",
                reference.endpoint_id
            );
            return;
        }

        let input = reader.remaining();
        if !admit(
            exchanges,
            reference.endpoint_id,
            seqno,
            input.len(),
            expect_ack,
            expect_response,
            enforce_ordering,
        ) {
            return;
        }

        // Fresh scratch for every call; nothing leaks across calls.
        tx_buf.fill(0);
        if tx_buf.len() < SEQNO_SIZE {
            return;
        }
        let (head, body) = tx_buf.split_at_mut(SEQNO_SIZE);

        let result_len = if is_schema {
            serve_schema(table.schema(), input, body)
        } else {
            table.handle(reference.endpoint_id, input, body)
        };

        let reply_seqno = seqno | RESPONSE_FLAG;
        if expect_response {
            let Some(len) = result_len else {
                return;
            };
            if len > body.len() {
                return;
            }
            head.copy_from_slice(&reply_seqno.to_le_bytes());
            // a full output sink loses the response; the caller's retry
            // covers it
            let _ = output.accept(&tx_buf[..SEQNO_SIZE + len]);
        } else if expect_ack {
            if result_len.is_none() {
                return;
            }
            head.copy_from_slice(&reply_seqno.to_le_bytes());
            let _ = output.accept(&tx_buf[..SEQNO_SIZE]);
        }
    }
}

impl<T: EndpointTable, P: PacketSink, const TX_CAP: usize> PacketSink for Channel<T, P, TX_CAP> {
    /// Process one call packet to completion.
    ///
    /// Always succeeds from the transport's point of view: every failure
    /// mode is a silent drop by design.
    fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError> {
        self.dispatch(packet);
        Ok(())
    }
}

/// Update or create the receiver state for an endpoint.
///
/// Returns `false` when the packet must be dropped: an out-of-order
/// seqno on an ordering-enforced exchange, or a fresh ordered exchange
/// that cannot be tracked because the table is full.
fn admit(
    exchanges: &mut ExchangeMap,
    endpoint_id: u16,
    seqno: u16,
    payload_len: usize,
    expect_ack: bool,
    expect_response: bool,
    enforce_ordering: bool,
) -> bool {
    if let Some(state) = exchanges.get_mut(&endpoint_id) {
        if (state.enforce_ordering || enforce_ordering) && seqno != state.seqno.wrapping_add(1) {
            #[cfg(feature = "defmt")]
            defmt::trace!("call dropped: seqno {} out of order", seqno);
            return false;
        }
        state.seqno = seqno;
        state.seqno_thread = seqno >> 15;
        state.length = state.length.saturating_add(payload_len);
        state.expect_ack = expect_ack;
        state.expect_response = expect_response;
        state.enforce_ordering = enforce_ordering;
        true
    } else {
        let state = ReceiverState {
            length: payload_len,
            seqno_thread: seqno >> 15,
            seqno,
            expect_ack,
            expect_response,
            enforce_ordering,
        };
        match exchanges.insert(endpoint_id, state) {
            Ok(_) => true,
            // table full: a fresh ordered exchange cannot be tracked, so
            // its guarantee cannot be honored; stateless calls proceed
            Err(_) => !enforce_ordering,
        }
    }
}

/// Serve a chunk of the schema blob from a caller-requested offset.
///
/// An offset at or past the end yields an empty chunk, which the caller
/// reads as end-of-schema. The chunk is truncated to the output budget;
/// the caller advances its offset by however many bytes came back.
fn serve_schema(schema: &[u8], input: &[u8], output: &mut [u8]) -> Option<usize> {
    let mut reader = Reader::new(input);
    let offset = u32::decode(&mut reader)?;

    let mut sink = SkipSink::new(offset as usize, BufferSink::new(output));
    // truncation to the output budget is expected, not an error
    let _ = sink.push(schema);
    Some(sink.into_inner().written())
}
