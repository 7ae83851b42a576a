//! Byte- and packet-oriented transport ports.
//!
//! A transport driver (UART, USB, ...) plugs into the stack by
//! implementing these capability traits; everything above composes
//! against them without knowing what carries the bytes. Nothing here
//! blocks: a sink that cannot take more data reports it and the caller
//! decides what to do with the unconsumed remainder.

/// Remaining room in a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capacity {
    /// At most this many further bytes will be accepted.
    Bounded(usize),
    /// The sink never fills up.
    Unbounded,
}

/// Why a sink refused (part of) a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Capacity ran out; the first `consumed` bytes were accepted and the
    /// rest were not. Nothing is discarded silently.
    Full {
        /// Bytes accepted before the sink filled up.
        consumed: usize,
    },
    /// The downstream consumer rejected the data outright.
    Rejected,
}

/// Why a source produced no (more) data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceError {
    /// The stream ended; no further bytes will ever be produced.
    Closed,
}

/// Consumer of a continuous byte stream.
pub trait ByteSink {
    /// Process a chunk of the stream.
    ///
    /// `Ok(n)` means the whole chunk was consumed (`n == bytes.len()`).
    /// [`SinkError::Full`] reports how many leading bytes were accepted
    /// before capacity ran out.
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError>;

    /// How many further bytes the sink can accept.
    fn free_space(&self) -> Capacity;
}

/// Producer of a continuous byte stream.
pub trait ByteSource {
    /// Pull up to `out.len()` bytes from the stream.
    ///
    /// Returns the number of bytes produced; zero means nothing is
    /// available right now.
    fn pull(&mut self, out: &mut [u8]) -> Result<usize, SourceError>;
}

/// Consumer of whole, already-framed packets.
///
/// All-or-nothing: implementations must never act on a partial packet.
pub trait PacketSink {
    /// Process one packet.
    fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError>;
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        (**self).push(bytes)
    }

    fn free_space(&self) -> Capacity {
        (**self).free_space()
    }
}

impl<P: PacketSink + ?Sized> PacketSink for &mut P {
    fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError> {
        (**self).accept(packet)
    }
}

/// Push a full chunk into a sink, retrying while it makes progress.
///
/// Returns [`SinkError::Full`] with the total consumed count once the
/// sink stops accepting bytes; never spins on a sink that is stuck.
pub fn push_all<S: ByteSink>(sink: &mut S, bytes: &[u8]) -> Result<(), SinkError> {
    let mut offset = 0;
    while offset < bytes.len() {
        match sink.push(&bytes[offset..]) {
            Ok(_) => return Ok(()),
            Err(SinkError::Full { consumed }) if consumed > 0 => offset += consumed,
            Err(SinkError::Full { .. }) => return Err(SinkError::Full { consumed: offset }),
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

/// Byte sink backed by a caller-provided fixed buffer.
///
/// Accepts bytes until the buffer is full, then reports
/// [`SinkError::Full`] with whatever still fit.
#[derive(Debug)]
pub struct BufferSink<'a> {
    buffer: &'a mut [u8],
    written: usize,
}

impl<'a> BufferSink<'a> {
    /// Wrap a buffer; writing starts at its first byte.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, written: 0 }
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// The filled prefix of the buffer.
    pub fn filled(&self) -> &[u8] {
        &self.buffer[..self.written]
    }
}

impl ByteSink for BufferSink<'_> {
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        let room = self.buffer.len() - self.written;
        let take = bytes.len().min(room);
        self.buffer[self.written..self.written + take].copy_from_slice(&bytes[..take]);
        self.written += take;
        if take == bytes.len() {
            Ok(take)
        } else {
            Err(SinkError::Full { consumed: take })
        }
    }

    fn free_space(&self) -> Capacity {
        Capacity::Bounded(self.buffer.len() - self.written)
    }
}

/// Byte sink that discards the first `skip` bytes, then forwards the rest.
///
/// Used to start a copy mid-stream, e.g. serving a blob from a caller-
/// requested offset, or feeding only the payload of a frame into a
/// checksum-only destination.
#[derive(Debug)]
pub struct SkipSink<S> {
    remaining_skip: usize,
    inner: S,
}

impl<S: ByteSink> SkipSink<S> {
    /// Forward to `inner` after discarding `skip` bytes.
    pub fn new(skip: usize, inner: S) -> Self {
        Self {
            remaining_skip: skip,
            inner,
        }
    }

    /// Recover the wrapped sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSink> ByteSink for SkipSink<S> {
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        if bytes.len() <= self.remaining_skip {
            self.remaining_skip -= bytes.len();
            return Ok(bytes.len());
        }
        let skipped = self.remaining_skip;
        self.remaining_skip = 0;
        match self.inner.push(&bytes[skipped..]) {
            Ok(n) => Ok(skipped + n),
            Err(SinkError::Full { consumed }) => Err(SinkError::Full {
                consumed: skipped + consumed,
            }),
            Err(other) => Err(other),
        }
    }

    fn free_space(&self) -> Capacity {
        match self.inner.free_space() {
            Capacity::Bounded(n) => Capacity::Bounded(n.saturating_add(self.remaining_skip)),
            Capacity::Unbounded => Capacity::Unbounded,
        }
    }
}

/// Byte sink that treats each pushed chunk as one complete packet.
///
/// The bridge for byte-oriented producers writing to a packet transport
/// that preserves message boundaries on its own.
#[derive(Debug)]
pub struct PacketChunkSink<P> {
    inner: P,
}

impl<P: PacketSink> PacketChunkSink<P> {
    /// Send every pushed chunk to `inner` as one packet.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Recover the wrapped sink.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: PacketSink> ByteSink for PacketChunkSink<P> {
    fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        self.inner.accept(bytes)?;
        Ok(bytes.len())
    }

    fn free_space(&self) -> Capacity {
        Capacity::Unbounded
    }
}

/// Packet sink that writes packet bytes verbatim into a byte sink.
///
/// Pushes until the whole packet is consumed; adds no framing of its
/// own. A byte sink that stalls mid-packet surfaces as an error, since a
/// partial packet must never be left looking complete.
#[derive(Debug)]
pub struct RawPacketSink<S> {
    inner: S,
}

impl<S: ByteSink> RawPacketSink<S> {
    /// Write packets into `inner` as plain byte runs.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Recover the wrapped sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSink> PacketSink for RawPacketSink<S> {
    fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError> {
        push_all(&mut self.inner, packet)
    }
}

/// Byte source draining a borrowed slice.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Produce the bytes of `data`, then report the stream closed.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ByteSource for SliceSource<'_> {
    fn pull(&mut self, out: &mut [u8]) -> Result<usize, SourceError> {
        if self.data.is_empty() {
            return Err(SourceError::Closed);
        }
        let take = self.data.len().min(out.len());
        out[..take].copy_from_slice(&self.data[..take]);
        self.data = &self.data[take..];
        Ok(take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most two bytes per push, like a transmit FIFO draining
    /// between calls.
    struct DribbleSink {
        received: heapless::Vec<u8, 64>,
    }

    impl DribbleSink {
        fn new() -> Self {
            Self {
                received: heapless::Vec::new(),
            }
        }
    }

    impl ByteSink for DribbleSink {
        fn push(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
            let take = bytes.len().min(2);
            self.received.extend_from_slice(&bytes[..take]).unwrap();
            if take == bytes.len() {
                Ok(take)
            } else {
                Err(SinkError::Full { consumed: take })
            }
        }

        fn free_space(&self) -> Capacity {
            Capacity::Bounded(2)
        }
    }

    #[test]
    fn test_buffer_sink_accepts_until_full() {
        let mut buffer = [0u8; 4];
        let mut sink = BufferSink::new(&mut buffer);

        assert_eq!(sink.push(&[1, 2]), Ok(2));
        assert_eq!(sink.free_space(), Capacity::Bounded(2));
        assert_eq!(sink.push(&[3, 4, 5]), Err(SinkError::Full { consumed: 2 }));
        assert_eq!(sink.filled(), &[1, 2, 3, 4]);
        assert_eq!(sink.free_space(), Capacity::Bounded(0));
    }

    #[test]
    fn test_skip_sink_discards_across_pushes() {
        let mut buffer = [0u8; 8];
        let mut sink = SkipSink::new(3, BufferSink::new(&mut buffer));

        assert_eq!(sink.push(&[1, 2]), Ok(2));
        assert_eq!(sink.push(&[3, 4, 5]), Ok(3));
        assert_eq!(sink.into_inner().filled(), &[4, 5]);
    }

    #[test]
    fn test_skip_sink_reports_combined_free_space() {
        let mut buffer = [0u8; 4];
        let sink = SkipSink::new(3, BufferSink::new(&mut buffer));
        assert_eq!(sink.free_space(), Capacity::Bounded(7));
    }

    #[test]
    fn test_push_all_retries_while_progressing() {
        let mut sink = DribbleSink::new();
        push_all(&mut sink, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(sink.received.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_all_gives_up_without_progress() {
        let mut buffer = [0u8; 2];
        let mut sink = BufferSink::new(&mut buffer);
        assert_eq!(
            push_all(&mut sink, &[1, 2, 3]),
            Err(SinkError::Full { consumed: 2 })
        );
    }

    #[test]
    fn test_raw_packet_sink_writes_whole_packet() {
        let mut sink = RawPacketSink::new(DribbleSink::new());
        sink.accept(&[9, 8, 7, 6, 5]).unwrap();
        assert_eq!(sink.into_inner().received.as_slice(), &[9, 8, 7, 6, 5]);
    }

    #[test]
    fn test_packet_chunk_sink_one_packet_per_push() {
        struct Collect {
            packets: heapless::Vec<heapless::Vec<u8, 16>, 4>,
        }
        impl PacketSink for Collect {
            fn accept(&mut self, packet: &[u8]) -> Result<(), SinkError> {
                let mut copy = heapless::Vec::new();
                copy.extend_from_slice(packet).unwrap();
                self.packets.push(copy).unwrap();
                Ok(())
            }
        }

        let mut sink = PacketChunkSink::new(Collect {
            packets: heapless::Vec::new(),
        });
        sink.push(&[1, 2, 3]).unwrap();
        sink.push(&[4]).unwrap();

        let collect = sink.into_inner();
        assert_eq!(collect.packets.len(), 2);
        assert_eq!(collect.packets[0].as_slice(), &[1, 2, 3]);
        assert_eq!(collect.packets[1].as_slice(), &[4]);
    }

    #[test]
    fn test_slice_source_drains_then_closes() {
        let mut source = SliceSource::new(&[1, 2, 3]);
        let mut out = [0u8; 2];

        assert_eq!(source.pull(&mut out), Ok(2));
        assert_eq!(out, [1, 2]);
        assert_eq!(source.pull(&mut out), Ok(1));
        assert_eq!(out[0], 3);
        assert_eq!(source.pull(&mut out), Err(SourceError::Closed));
    }
}
