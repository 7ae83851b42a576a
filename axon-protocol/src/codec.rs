//! Typed little-endian value codec.
//!
//! Call arguments and results are marshalled as fixed-width little-endian
//! values read and written through cursor types over borrowed buffers.
//! Decodes are all-or-nothing: a value either consumes exactly its wire
//! width, or nothing is consumed and `None` comes back. Encodes never
//! write partially. A failed decode means the whole chain it belongs to
//! must be abandoned.

/// Read cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    /// Read from the start of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buffer[self.position..]
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.position == self.buffer.len()
    }

    /// Decode a closed enum travelling as a 32-bit signed integer.
    ///
    /// An unknown discriminant leaves the cursor unmoved.
    pub fn decode_enum<E: WireEnum>(&mut self) -> Option<E> {
        let mark = self.position;
        let raw = i32::decode(self)?;
        match E::from_wire(raw) {
            Some(value) => Some(value),
            None => {
                self.position = mark;
                None
            }
        }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.buffer.len() - self.position < len {
            return None;
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Some(bytes)
    }
}

/// Write cursor over a borrowed byte buffer.
#[derive(Debug)]
pub struct Writer<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> Writer<'a> {
    /// Write from the start of `buffer`.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.position
    }

    /// Encode a closed enum as its 32-bit signed wire value.
    pub fn encode_enum<E: WireEnum>(&mut self, value: E) -> bool {
        value.to_wire().encode(self)
    }

    fn put(&mut self, bytes: &[u8]) -> bool {
        if self.buffer.len() - self.position < bytes.len() {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }
}

/// Fixed-width little-endian wire representation of a value type.
pub trait Codec: Sized {
    /// Decode one value, consuming exactly its wire width on success and
    /// leaving the cursor unmoved on failure.
    fn decode(reader: &mut Reader<'_>) -> Option<Self>;

    /// Encode one value; `false` means the destination lacks the full
    /// wire width and nothing was written.
    fn encode(&self, writer: &mut Writer<'_>) -> bool;
}

macro_rules! int_codec {
    ($($int:ty),* $(,)?) => {$(
        impl Codec for $int {
            fn decode(reader: &mut Reader<'_>) -> Option<Self> {
                let bytes = reader.take(core::mem::size_of::<$int>())?;
                Some(<$int>::from_le_bytes(bytes.try_into().ok()?))
            }

            fn encode(&self, writer: &mut Writer<'_>) -> bool {
                writer.put(&self.to_le_bytes())
            }
        }
    )*};
}

int_codec!(i8, u8, i16, u16, i32, u32, i64, u64);

impl Codec for bool {
    fn decode(reader: &mut Reader<'_>) -> Option<Self> {
        Some(u8::decode(reader)? != 0)
    }

    fn encode(&self, writer: &mut Writer<'_>) -> bool {
        u8::from(*self).encode(writer)
    }
}

impl Codec for f32 {
    /// Floats travel as their IEEE-754 bit pattern inside a `u32`, so
    /// endianness handling stays in one place.
    fn decode(reader: &mut Reader<'_>) -> Option<Self> {
        Some(f32::from_bits(u32::decode(reader)?))
    }

    fn encode(&self, writer: &mut Writer<'_>) -> bool {
        self.to_bits().encode(writer)
    }
}

/// Closed enum with a 32-bit signed integer wire representation.
pub trait WireEnum: Sized + Copy {
    /// Wire value of this variant.
    fn to_wire(self) -> i32;

    /// Variant for a wire value, `None` for unknown discriminants.
    fn from_wire(raw: i32) -> Option<Self>;
}

/// Reference to a remote endpoint, scoped to a schema fingerprint.
///
/// A reference only resolves while `json_crc` matches the fingerprint of
/// the endpoint table the device currently exposes; after a schema
/// change, stale references are rejected even if the index would still
/// be in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointRef {
    /// Fingerprint of the endpoint table this reference was minted for.
    pub json_crc: u16,
    /// Index into that table.
    pub endpoint_id: u16,
}

impl Codec for EndpointRef {
    /// Wire order is `endpoint_id` then `json_crc` — the inverse of the
    /// declaration order. Both sides must agree on this exact order.
    fn decode(reader: &mut Reader<'_>) -> Option<Self> {
        let bytes = reader.take(4)?;
        Some(Self {
            endpoint_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            json_crc: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }

    fn encode(&self, writer: &mut Writer<'_>) -> bool {
        let mut bytes = [0u8; 4];
        bytes[..2].copy_from_slice(&self.endpoint_id.to_le_bytes());
        bytes[2..].copy_from_slice(&self.json_crc.to_le_bytes());
        writer.put(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Idle,
        Active,
        Fault,
    }

    impl WireEnum for Mode {
        fn to_wire(self) -> i32 {
            match self {
                Mode::Idle => 0,
                Mode::Active => 1,
                Mode::Fault => 2,
            }
        }

        fn from_wire(raw: i32) -> Option<Self> {
            match raw {
                0 => Some(Mode::Idle),
                1 => Some(Mode::Active),
                2 => Some(Mode::Fault),
                _ => None,
            }
        }
    }

    fn roundtrip<T: Codec + PartialEq + core::fmt::Debug>(value: T) {
        let mut buffer = [0u8; 16];
        let mut writer = Writer::new(&mut buffer);
        assert!(value.encode(&mut writer));
        let written = writer.written();

        let mut reader = Reader::new(&buffer[..written]);
        assert_eq!(T::decode(&mut reader), Some(value));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_integer_roundtrips_at_boundaries() {
        roundtrip(0u8);
        roundtrip(u8::MAX);
        roundtrip(i8::MIN);
        roundtrip(i16::MIN);
        roundtrip(u16::MAX);
        roundtrip(0i32);
        roundtrip(i32::MIN);
        roundtrip(u32::MAX);
        roundtrip(i64::MIN);
        roundtrip(i64::MAX);
        roundtrip(u64::MAX);
    }

    #[test]
    fn test_bool_roundtrip_and_nonzero_decode() {
        roundtrip(true);
        roundtrip(false);

        // any nonzero byte decodes as true
        let mut reader = Reader::new(&[0x55]);
        assert_eq!(bool::decode(&mut reader), Some(true));
    }

    #[test]
    fn test_float_roundtrips_by_bit_pattern() {
        for value in [0.0f32, -0.0, 1.5, f32::MIN, f32::MAX, f32::NAN, f32::INFINITY] {
            let mut buffer = [0u8; 4];
            let mut writer = Writer::new(&mut buffer);
            assert!(value.encode(&mut writer));

            let mut reader = Reader::new(&buffer);
            let decoded = f32::decode(&mut reader).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_float_wire_layout_is_u32() {
        let mut buffer = [0u8; 4];
        let mut writer = Writer::new(&mut buffer);
        assert!(1.0f32.encode(&mut writer));
        assert_eq!(buffer, 0x3F80_0000u32.to_le_bytes());
    }

    #[test]
    fn test_enum_rides_i32() {
        let mut buffer = [0u8; 4];
        let mut writer = Writer::new(&mut buffer);
        assert!(writer.encode_enum(Mode::Fault));
        assert_eq!(buffer, 2i32.to_le_bytes());

        let mut reader = Reader::new(&buffer);
        assert_eq!(reader.decode_enum::<Mode>(), Some(Mode::Fault));
    }

    #[test]
    fn test_unknown_enum_discriminant_leaves_cursor() {
        let bytes = 9i32.to_le_bytes();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.decode_enum::<Mode>(), None);
        assert_eq!(reader.remaining().len(), 4);
    }

    #[test]
    fn test_endpoint_ref_wire_order() {
        let reference = EndpointRef {
            json_crc: 0xBEEF,
            endpoint_id: 0x1234,
        };

        let mut buffer = [0u8; 4];
        let mut writer = Writer::new(&mut buffer);
        assert!(reference.encode(&mut writer));
        assert_eq!(buffer, [0x34, 0x12, 0xEF, 0xBE]);

        let mut reader = Reader::new(&buffer);
        assert_eq!(EndpointRef::decode(&mut reader), Some(reference));
    }

    #[test]
    fn test_short_buffer_decode_leaves_cursor_unmoved() {
        let bytes = [1u8, 2, 3];
        let mut reader = Reader::new(&bytes);

        assert_eq!(u32::decode(&mut reader), None);
        assert_eq!(reader.remaining(), &[1, 2, 3]);
        assert_eq!(EndpointRef::decode(&mut reader), None);
        assert_eq!(reader.remaining(), &[1, 2, 3]);

        // a narrower value still decodes afterwards
        assert_eq!(u16::decode(&mut reader), Some(0x0201));
        assert_eq!(reader.remaining(), &[3]);
    }

    #[test]
    fn test_full_writer_refuses_partial_write() {
        let mut buffer = [0xAAu8; 3];
        let mut writer = Writer::new(&mut buffer);

        assert!(!0xDEAD_BEEFu32.encode(&mut writer));
        assert_eq!(writer.written(), 0);
        assert_eq!(buffer, [0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn test_sequential_values_share_buffer() {
        let mut buffer = [0u8; 7];
        let mut writer = Writer::new(&mut buffer);
        assert!(0x1122u16.encode(&mut writer));
        assert!(0x33445566u32.encode(&mut writer));
        assert!(true.encode(&mut writer));
        assert_eq!(writer.written(), 7);

        let mut reader = Reader::new(&buffer);
        assert_eq!(u16::decode(&mut reader), Some(0x1122));
        assert_eq!(u32::decode(&mut reader), Some(0x33445566));
        assert_eq!(bool::decode(&mut reader), Some(true));
        assert!(reader.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_u64_roundtrip(value in any::<u64>()) {
                roundtrip(value);
            }

            #[test]
            fn prop_i32_roundtrip(value in any::<i32>()) {
                roundtrip(value);
            }

            #[test]
            fn prop_f32_roundtrip_bits(bits in any::<u32>()) {
                let value = f32::from_bits(bits);
                let mut buffer = [0u8; 4];
                let mut writer = Writer::new(&mut buffer);
                prop_assert!(value.encode(&mut writer));

                let mut reader = Reader::new(&buffer);
                let decoded = f32::decode(&mut reader).unwrap();
                prop_assert_eq!(decoded.to_bits(), bits);
            }

            #[test]
            fn prop_decode_never_reads_past_short_buffers(
                bytes in prop::collection::vec(any::<u8>(), 0..3),
            ) {
                let mut reader = Reader::new(&bytes);
                prop_assert_eq!(u32::decode(&mut reader), None);
                prop_assert_eq!(reader.remaining().len(), bytes.len());
            }
        }
    }
}
