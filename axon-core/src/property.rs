//! Typed property accessors.
//!
//! A property exposes one backing value as an endpoint's storage. The
//! closed set of accessor variants replaces ad-hoc getter/setter plumbing:
//! a table entry holds either read-only or read-write access to a typed
//! value and dispatches calls through it.

use axon_protocol::codec::{Codec, Reader, Writer};

/// Access to one backing value of type `T`.
#[derive(Debug)]
pub enum Property<'a, T> {
    /// Getter-only exposure; writes are refused.
    ReadOnly(&'a T),
    /// Full get/set exposure.
    ReadWrite(&'a mut T),
}

impl<T: Copy> Property<'_, T> {
    /// Current value.
    pub fn read(&self) -> T {
        match self {
            Property::ReadOnly(value) => **value,
            Property::ReadWrite(value) => **value,
        }
    }

    /// Store a new value; `false` if the property is read-only.
    pub fn write(&mut self, value: T) -> bool {
        match self {
            Property::ReadOnly(_) => false,
            Property::ReadWrite(slot) => {
                **slot = value;
                true
            }
        }
    }

    /// Whether writes are accepted.
    pub fn is_writable(&self) -> bool {
        matches!(self, Property::ReadWrite(_))
    }

    /// Store `value` if present, returning the prior value either way.
    pub fn exchange(&mut self, value: Option<T>) -> T {
        let previous = self.read();
        if let Some(value) = value {
            let _ = self.write(value);
        }
        previous
    }
}

impl<T: Codec + Copy> Property<'_, T> {
    /// Endpoint handler body for a property call.
    ///
    /// An absent argument reads; a present argument writes. Either way
    /// the prior value is encoded as the result. A write against a
    /// read-only property rejects the whole call.
    pub fn dispatch(&mut self, input: &[u8], output: &mut [u8]) -> Option<usize> {
        let mut reader = Reader::new(input);
        let incoming = T::decode(&mut reader);
        if incoming.is_some() && !self.is_writable() {
            return None;
        }

        let previous = self.exchange(incoming);
        let mut writer = Writer::new(output);
        if previous.encode(&mut writer) {
            Some(writer.written())
        } else {
            None
        }
    }
}

/// Store a float into a property, converting to the property's type.
pub trait SetFromFloat {
    /// Convert and store; `false` if the property refuses the write.
    fn set_from_float(&mut self, value: f32) -> bool;
}

impl SetFromFloat for Property<'_, f32> {
    fn set_from_float(&mut self, value: f32) -> bool {
        self.write(value)
    }
}

impl SetFromFloat for Property<'_, bool> {
    /// Anything at or above zero reads as `true`.
    fn set_from_float(&mut self, value: f32) -> bool {
        self.write(value >= 0.0)
    }
}

macro_rules! int_set_from_float {
    ($($int:ty),* $(,)?) => {$(
        impl SetFromFloat for Property<'_, $int> {
            /// Rounds half away from zero, saturating at the type bounds.
            fn set_from_float(&mut self, value: f32) -> bool {
                let shifted = if value >= 0.0 { value + 0.5 } else { value - 0.5 };
                self.write(shifted as $int)
            }
        }
    )*};
}

int_set_from_float!(i8, u8, i16, u16, i32, u32, i64, u64);
