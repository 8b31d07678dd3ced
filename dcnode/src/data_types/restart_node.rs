use dcnode_encoding as enc;

/// `uavcan.protocol.RestartNode` request
///
/// Fixed size 5 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RestartNodeRequest {
    /// `uint40`
    pub magic_number: u64,
}

impl Default for RestartNodeRequest {
    fn default() -> Self {
        Self {
            magic_number: Self::MAGIC_NUMBER,
        }
    }
}

impl enc::DataType for RestartNodeRequest {
    const ID: u16 = 5;
    const SIGNATURE: u64 = 0x569e_0539_4a30_17f0;
}
impl enc::Request for RestartNodeRequest {}
impl enc::BufferType for RestartNodeRequest {
    type Buffer = enc::StaticBuffer<5>;
}
impl RestartNodeRequest {
    pub const MAGIC_NUMBER: u64 = 0xAC_CE55_1B1E;
}
impl enc::Serialize for RestartNodeRequest {
    fn size_bits(&self) -> usize {
        40
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_uint(self.magic_number, 40);
    }
}
impl enc::Deserialize for RestartNodeRequest {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(RestartNodeRequest {
            magic_number: cursor.read_uint(40),
        })
    }
}

/// `uavcan.protocol.RestartNode` response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RestartNodeResponse {
    /// `bool`
    pub ok: bool,
}

impl enc::DataType for RestartNodeResponse {
    const ID: u16 = 5;
    const SIGNATURE: u64 = 0x569e_0539_4a30_17f0;
}
impl enc::Response for RestartNodeResponse {}
impl enc::BufferType for RestartNodeResponse {
    type Buffer = enc::StaticBuffer<1>;
}
impl enc::Serialize for RestartNodeResponse {
    fn size_bits(&self) -> usize {
        1
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_bool(self.ok);
    }
}
impl enc::Deserialize for RestartNodeResponse {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(RestartNodeResponse {
            ok: cursor.read_bool(),
        })
    }
}
