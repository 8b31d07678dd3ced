//! `uavcan.protocol.param` services

use dcnode_encoding::{self as enc, Deserialize as _, Serialize as _};
use heapless::Vec;

/// Longest string value of `uavcan.protocol.param.Value`
pub const MAX_STRING_VALUE_LENGTH: usize = 128;
/// Longest parameter name
pub const MAX_NAME_LENGTH: usize = 92;

pub type StringValue = Vec<u8, MAX_STRING_VALUE_LENGTH>;
pub type ParamName = Vec<u8, MAX_NAME_LENGTH>;

/// `uavcan.protocol.param.Value`
///
/// Tagged union, the tag occupies 3 bits after 5 void bits.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Integer(i64),
    Real(f32),
    Boolean(bool),
    /// Non-tail string with an 8-bit length prefix
    String(StringValue),
}

impl Value {
    const TAG_EMPTY: u64 = 0;
    const TAG_INTEGER: u64 = 1;
    const TAG_REAL: u64 = 2;
    const TAG_BOOLEAN: u64 = 3;
    const TAG_STRING: u64 = 4;

    /// Reads the tag and the value, without the leading void bits
    fn read_union(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        match cursor.read_uint(3) {
            Self::TAG_EMPTY => Ok(Value::Empty),
            Self::TAG_INTEGER => Ok(Value::Integer(cursor.read_i64())),
            Self::TAG_REAL => Ok(Value::Real(f32::from_bits(cursor.read_u32()))),
            Self::TAG_BOOLEAN => Ok(Value::Boolean(cursor.read_u8() != 0)),
            Self::TAG_STRING => {
                let length = usize::from(cursor.read_u8());
                if length > MAX_STRING_VALUE_LENGTH {
                    return Err(enc::DeserializeError::ArrayLength);
                }
                let mut bytes = [0u8; MAX_STRING_VALUE_LENGTH];
                cursor.read_bytes(&mut bytes[..length]);
                Ok(Value::String(unwrap!(Vec::from_slice(&bytes[..length]))))
            }
            _ => Err(enc::DeserializeError::InvalidValue),
        }
    }

    /// Writes the tag and the value, without the leading void bits
    fn write_union(&self, cursor: &mut enc::WriteCursor<'_>) {
        match self {
            Value::Empty => cursor.write_uint(Self::TAG_EMPTY, 3),
            Value::Integer(value) => {
                cursor.write_uint(Self::TAG_INTEGER, 3);
                cursor.write_i64(*value);
            }
            Value::Real(value) => {
                cursor.write_uint(Self::TAG_REAL, 3);
                cursor.write_u32(value.to_bits());
            }
            Value::Boolean(value) => {
                cursor.write_uint(Self::TAG_BOOLEAN, 3);
                cursor.write_u8((*value).into());
            }
            Value::String(bytes) => {
                cursor.write_uint(Self::TAG_STRING, 3);
                cursor.write_u8(bytes.len() as u8);
                cursor.write_bytes(bytes);
            }
        }
    }
}

impl enc::Serialize for Value {
    fn size_bits(&self) -> usize {
        8 + match self {
            Value::Empty => 0,
            Value::Integer(_) => 64,
            Value::Real(_) => 32,
            Value::Boolean(_) => 8,
            Value::String(bytes) => 8 + bytes.len() * 8,
        }
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_zeros(5);
        self.write_union(cursor);
    }
}
impl enc::Deserialize for Value {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        cursor.skip(5);
        Self::read_union(cursor)
    }
}

/// `uavcan.protocol.param.NumericValue`
///
/// Tagged union, the tag occupies 2 bits after 6 void bits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NumericValue {
    #[default]
    Empty,
    Integer(i64),
    Real(f32),
}

impl enc::Serialize for NumericValue {
    fn size_bits(&self) -> usize {
        8 + match self {
            NumericValue::Empty => 0,
            NumericValue::Integer(_) => 64,
            NumericValue::Real(_) => 32,
        }
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_zeros(6);
        match self {
            NumericValue::Empty => cursor.write_uint(0, 2),
            NumericValue::Integer(value) => {
                cursor.write_uint(1, 2);
                cursor.write_i64(*value);
            }
            NumericValue::Real(value) => {
                cursor.write_uint(2, 2);
                cursor.write_u32(value.to_bits());
            }
        }
    }
}
impl enc::Deserialize for NumericValue {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        cursor.skip(6);
        match cursor.read_uint(2) {
            0 => Ok(NumericValue::Empty),
            1 => Ok(NumericValue::Integer(cursor.read_i64())),
            2 => Ok(NumericValue::Real(f32::from_bits(cursor.read_u32()))),
            _ => Err(enc::DeserializeError::InvalidValue),
        }
    }
}

fn read_tail_name(cursor: &mut enc::ReadCursor<'_>) -> Result<ParamName, enc::DeserializeError> {
    let length = cursor.remaining_bytes();
    if length > MAX_NAME_LENGTH {
        return Err(enc::DeserializeError::ArrayLength);
    }
    let mut bytes = [0u8; MAX_NAME_LENGTH];
    cursor.read_bytes(&mut bytes[..length]);
    Ok(unwrap!(Vec::from_slice(&bytes[..length])))
}

/// `uavcan.protocol.param.GetSet` request
///
/// Get or set a parameter by name or by index. A non-empty name takes precedence
/// over the index. An empty value makes the request read-only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetSetRequest {
    /// `uint13`
    pub index: u16,
    pub value: Value,
    /// `uint8[<=92]`, tail array
    pub name: ParamName,
}

impl enc::DataType for GetSetRequest {
    const ID: u16 = 11;
    const SIGNATURE: u64 = 0xa7b6_22f9_39d1_a4d5;
}
impl enc::Request for GetSetRequest {}
impl enc::BufferType for GetSetRequest {
    type Buffer = enc::StaticBuffer<224>;
}
impl GetSetRequest {
    pub const MAX_INDEX: u16 = 0x1fff;
}
impl enc::Serialize for GetSetRequest {
    fn size_bits(&self) -> usize {
        13 + (self.value.size_bits() - 5) + self.name.len() * 8
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        // The 13-bit index replaces the void bits of the value union
        cursor.write_uint(self.index.into(), 13);
        self.value.write_union(cursor);
        cursor.write_bytes(&self.name);
    }
}
impl enc::Deserialize for GetSetRequest {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        let index = cursor.read_uint(13) as u16;
        let value = Value::read_union(cursor)?;
        let name = read_tail_name(cursor)?;
        Ok(GetSetRequest { index, value, name })
    }
}

/// `uavcan.protocol.param.GetSet` response
///
/// An empty name and an empty value mean the requested parameter does not exist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetSetResponse {
    /// Actual parameter value after the (possible) set
    pub value: Value,
    pub default_value: Value,
    pub max_value: NumericValue,
    pub min_value: NumericValue,
    /// `uint8[<=92]`, tail array
    pub name: ParamName,
}

impl enc::DataType for GetSetResponse {
    const ID: u16 = 11;
    const SIGNATURE: u64 = 0xa7b6_22f9_39d1_a4d5;
}
impl enc::Response for GetSetResponse {}
impl enc::BufferType for GetSetResponse {
    // two string values, two integer values and the name
    type Buffer = enc::StaticBuffer<{ 2 * (2 + MAX_STRING_VALUE_LENGTH) + 2 * 9 + MAX_NAME_LENGTH }>;
}
impl GetSetResponse {
    /// Response for an unknown parameter
    pub fn empty() -> Self {
        Self::default()
    }
}
impl enc::Serialize for GetSetResponse {
    fn size_bits(&self) -> usize {
        self.value.size_bits()
            + self.default_value.size_bits()
            + self.max_value.size_bits()
            + self.min_value.size_bits()
            + self.name.len() * 8
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        self.value.serialize(cursor);
        self.default_value.serialize(cursor);
        self.max_value.serialize(cursor);
        self.min_value.serialize(cursor);
        cursor.write_bytes(&self.name);
    }
}
impl enc::Deserialize for GetSetResponse {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(GetSetResponse {
            value: Value::deserialize(cursor)?,
            default_value: Value::deserialize(cursor)?,
            max_value: NumericValue::deserialize(cursor)?,
            min_value: NumericValue::deserialize(cursor)?,
            name: read_tail_name(cursor)?,
        })
    }
}

/// `uavcan.protocol.param.ExecuteOpcode` request
///
/// Fixed size 7 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecuteOpcodeRequest {
    /// `uint8`
    pub opcode: u8,
    /// Reserved, keep zero
    ///
    /// `int48`
    pub argument: i64,
}

impl enc::DataType for ExecuteOpcodeRequest {
    const ID: u16 = 10;
    const SIGNATURE: u64 = 0xa7b6_22f9_39d1_a466;
}
impl enc::Request for ExecuteOpcodeRequest {}
impl enc::BufferType for ExecuteOpcodeRequest {
    type Buffer = enc::StaticBuffer<7>;
}
impl ExecuteOpcodeRequest {
    /// Save all parameters to non-volatile storage
    pub const OPCODE_SAVE: u8 = 0;
    /// Clear the non-volatile storage, defaults apply after restart
    pub const OPCODE_ERASE: u8 = 1;
}
impl enc::Serialize for ExecuteOpcodeRequest {
    fn size_bits(&self) -> usize {
        56
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u8(self.opcode);
        cursor.write_int(self.argument, 48);
    }
}
impl enc::Deserialize for ExecuteOpcodeRequest {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(ExecuteOpcodeRequest {
            opcode: cursor.read_u8(),
            argument: cursor.read_int(48),
        })
    }
}

/// `uavcan.protocol.param.ExecuteOpcode` response
///
/// Fixed size 7 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExecuteOpcodeResponse {
    /// Opcode-specific result, zero if unused
    ///
    /// `int48`
    pub argument: i64,
    /// `bool`
    pub ok: bool,
}

impl enc::DataType for ExecuteOpcodeResponse {
    const ID: u16 = 10;
    const SIGNATURE: u64 = 0xa7b6_22f9_39d1_a466;
}
impl enc::Response for ExecuteOpcodeResponse {}
impl enc::BufferType for ExecuteOpcodeResponse {
    type Buffer = enc::StaticBuffer<7>;
}
impl enc::Serialize for ExecuteOpcodeResponse {
    fn size_bits(&self) -> usize {
        49
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_int(self.argument, 48);
        cursor.write_bool(self.ok);
    }
}
impl enc::Deserialize for ExecuteOpcodeResponse {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(ExecuteOpcodeResponse {
            argument: cursor.read_int(48),
            ok: cursor.read_bool(),
        })
    }
}
