use dcnode_encoding::{self as enc, Deserialize as _, Serialize as _};
use heapless::String;

use super::node_status::NodeStatus;

/// `uavcan.protocol.GetNodeInfo` request
///
/// Full node info request. The request carries no data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetNodeInfoRequest;

impl enc::DataType for GetNodeInfoRequest {
    const ID: u16 = 1;
    const SIGNATURE: u64 = 0xee46_8a81_21c4_6a9e;
}
impl enc::Request for GetNodeInfoRequest {}
impl enc::Serialize for GetNodeInfoRequest {
    fn size_bits(&self) -> usize {
        0
    }
    fn serialize(&self, _cursor: &mut enc::WriteCursor<'_>) {}
}
impl enc::Deserialize for GetNodeInfoRequest {
    fn deserialize(_cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(GetNodeInfoRequest)
    }
}

/// Maximum node name length in bytes
pub const MAX_NAME_LENGTH: usize = 80;

pub type NodeName = String<MAX_NAME_LENGTH>;

/// `uavcan.protocol.GetNodeInfo` response
///
/// Size ranges from 41 to 377 bytes. The certificate of authenticity is always
/// sent empty, which bounds the response to 121 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNodeInfoResponse {
    /// Current node status
    pub status: NodeStatus,
    pub software_version: SoftwareVersion,
    pub hardware_version: HardwareVersion,
    /// Human readable non-empty ASCII node name, reverse internet domain notation
    /// is recommended, e.g. "org.dronecan.sensor"
    ///
    /// `uint8[<=80]`, tail array
    pub name: NodeName,
}

impl enc::DataType for GetNodeInfoResponse {
    const ID: u16 = 1;
    const SIGNATURE: u64 = 0xee46_8a81_21c4_6a9e;
}
impl enc::Response for GetNodeInfoResponse {}
impl enc::BufferType for GetNodeInfoResponse {
    type Buffer = enc::StaticBuffer<377>;
}
impl GetNodeInfoResponse {
    /// Length of all fields preceding the name
    pub const HEADER_SIZE: usize = 41;
}
impl enc::Serialize for GetNodeInfoResponse {
    fn size_bits(&self) -> usize {
        (Self::HEADER_SIZE + self.name.len()) * 8
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        self.status.serialize(cursor);
        self.software_version.serialize(cursor);
        self.hardware_version.serialize(cursor);
        cursor.write_bytes(self.name.as_bytes());
    }
}
impl enc::Deserialize for GetNodeInfoResponse {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        let status = NodeStatus::deserialize(cursor)?;
        let software_version = SoftwareVersion::deserialize(cursor)?;
        let hardware_version = HardwareVersion::deserialize(cursor)?;

        let mut bytes = [0u8; MAX_NAME_LENGTH];
        let length = cursor.remaining_bytes();
        if length > MAX_NAME_LENGTH {
            return Err(enc::DeserializeError::ArrayLength);
        }
        cursor.read_bytes(&mut bytes[..length]);
        let name = core::str::from_utf8(&bytes[..length])
            .ok()
            .and_then(|name| String::try_from(name).ok())
            .ok_or(enc::DeserializeError::InvalidValue)?;

        Ok(GetNodeInfoResponse {
            status,
            software_version,
            hardware_version,
            name,
        })
    }
}

/// `uavcan.protocol.SoftwareVersion`
///
/// Fixed size 15 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftwareVersion {
    pub major: u8,
    pub minor: u8,
    /// Bitmask of the valid optional fields below
    ///
    /// `uint8`
    pub optional_field_flags: u8,
    /// VCS commit hash or revision number, e.g. git short commit hash
    ///
    /// `uint32`
    pub vcs_commit: u32,
    /// CRC-64-WE of the firmware image
    ///
    /// `uint64`
    pub image_crc: u64,
}

impl SoftwareVersion {
    pub const OPTIONAL_FIELD_FLAG_VCS_COMMIT: u8 = 1;
    pub const OPTIONAL_FIELD_FLAG_IMAGE_CRC: u8 = 2;

    /// Version with a valid VCS commit and no image CRC
    pub const fn new(major: u8, minor: u8, vcs_commit: u32) -> Self {
        Self {
            major,
            minor,
            optional_field_flags: Self::OPTIONAL_FIELD_FLAG_VCS_COMMIT,
            vcs_commit,
            image_crc: 0,
        }
    }
}

impl enc::Serialize for SoftwareVersion {
    fn size_bits(&self) -> usize {
        120
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u8(self.major);
        cursor.write_u8(self.minor);
        cursor.write_u8(self.optional_field_flags);
        cursor.write_u32(self.vcs_commit);
        cursor.write_u64(self.image_crc);
    }
}
impl enc::Deserialize for SoftwareVersion {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(SoftwareVersion {
            major: cursor.read_u8(),
            minor: cursor.read_u8(),
            optional_field_flags: cursor.read_u8(),
            vcs_commit: cursor.read_u32(),
            image_crc: cursor.read_u64(),
        })
    }
}

/// `uavcan.protocol.HardwareVersion`
///
/// Serialized with an empty certificate of authenticity: 19 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareVersion {
    pub major: u8,
    pub minor: u8,
    /// Unique ID of the node, all zeros if not available
    ///
    /// `uint8[16]`
    pub unique_id: [u8; 16],
}

impl HardwareVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            unique_id: [0; 16],
        }
    }
}

impl enc::Serialize for HardwareVersion {
    fn size_bits(&self) -> usize {
        152
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u8(self.major);
        cursor.write_u8(self.minor);
        cursor.write_bytes(&self.unique_id);
        // certificate_of_authenticity length
        cursor.write_u8(0);
    }
}
impl enc::Deserialize for HardwareVersion {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        let major = cursor.read_u8();
        let minor = cursor.read_u8();
        let mut unique_id = [0; 16];
        cursor.read_bytes(&mut unique_id);
        let certificate_length = cursor.read_u8();
        cursor.skip(usize::from(certificate_length) * 8);
        Ok(HardwareVersion {
            major,
            minor,
            unique_id,
        })
    }
}
