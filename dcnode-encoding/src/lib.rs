//! Serialization contract for DroneCAN data types
//!
//! Stack users should not depend on this crate directly. Use `dcnode::encoding` reexport instead.

#![no_std]

mod cursor;

pub use cursor::{ReadCursor, WriteCursor};

/// Identity of a DroneCAN data type
pub trait DataType {
    /// Message or service type ID
    const ID: u16;
    /// Data type signature, seeds the multi-frame transfer CRC
    const SIGNATURE: u64;
}

/// Marker for types broadcast as messages
pub trait Message: DataType {}

/// Marker for service request types
pub trait Request: DataType {}

/// Marker for service response types
pub trait Response: DataType {}

pub trait Serialize {
    /// Exact serialized length in bits
    fn size_bits(&self) -> usize;
    fn serialize(&self, cursor: &mut WriteCursor<'_>);
}

pub trait Deserialize {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeserializeError {
    /// A length prefix exceeds the array capacity
    ArrayLength,
    /// A field holds a value the type does not define
    InvalidValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferTooSmall;

pub trait BufferType {
    /// Buffer with capacity sufficient for correct message serialization
    type Buffer: Sized + Default + AsMut<[u8]> + AsRef<[u8]> + 'static;
}

pub struct StaticBuffer<const N: usize>([u8; N]);

impl<const N: usize> Default for StaticBuffer<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> AsRef<[u8]> for StaticBuffer<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> AsMut<[u8]> for StaticBuffer<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Serializes `value` into `buffer` and returns the payload length in bytes
pub fn serialize_into<T: Serialize + ?Sized>(
    value: &T,
    buffer: &mut [u8],
) -> Result<usize, BufferTooSmall> {
    if value.size_bits().div_ceil(8) > buffer.len() {
        return Err(BufferTooSmall);
    }
    let mut cursor = WriteCursor::new(buffer);
    value.serialize(&mut cursor);
    Ok(cursor.byte_length())
}

pub fn deserialize_from<T: Deserialize>(payload: &[u8]) -> Result<T, DeserializeError> {
    T::deserialize(&mut ReadCursor::new(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        flag: bool,
        value: u16,
    }

    impl Serialize for Pair {
        fn size_bits(&self) -> usize {
            17
        }

        fn serialize(&self, cursor: &mut WriteCursor<'_>) {
            cursor.write_bool(self.flag);
            cursor.write_u16(self.value);
        }
    }

    impl Deserialize for Pair {
        fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError> {
            Ok(Pair {
                flag: cursor.read_bool(),
                value: cursor.read_u16(),
            })
        }
    }

    #[test]
    fn test_serialize_into_reports_partial_byte() {
        let mut buffer = [0u8; 3];
        let pair = Pair {
            flag: true,
            value: 0x0102,
        };
        assert_eq!(serialize_into(&pair, &mut buffer), Ok(3));
        assert_eq!(buffer, [0x81, 0x00, 0x80]);

        let decoded: Pair = deserialize_from(&buffer).unwrap();
        assert!(decoded.flag);
        assert_eq!(decoded.value, 0x0102);
    }

    #[test]
    fn test_serialize_into_small_buffer() {
        let mut buffer = [0u8; 2];
        let pair = Pair {
            flag: false,
            value: 0,
        };
        assert_eq!(serialize_into(&pair, &mut buffer), Err(BufferTooSmall));
    }
}
