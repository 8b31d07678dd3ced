use dcnode_encoding as enc;

/// `uavcan.protocol.NodeStatus`
///
/// Fixed size 7 bytes
///
/// Abstract node status information.
///
/// Any UAVCAN node is required to publish this message periodically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeStatus {
    /// Uptime counter should never overflow.
    /// Other nodes may detect that a remote node has restarted when this value goes backwards.
    ///
    /// `uint32`
    pub uptime_sec: u32,
    /// Abstract node health.
    ///
    /// `uint2`
    pub health: Health,
    /// Current mode.
    ///
    /// `uint3`
    pub mode: Mode,
    /// Not used currently, keep zero when publishing, ignore when receiving.
    ///
    /// `uint3`
    pub sub_mode: u8,
    /// Optional, vendor-specific node status code, e.g. a fault code or a status bitmask.
    ///
    /// `uint16`
    pub vendor_specific_status_code: u16,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self {
            uptime_sec: 0,
            health: Health::Ok,
            mode: Mode::Operational,
            sub_mode: 0,
            vendor_specific_status_code: 0,
        }
    }
}

impl enc::DataType for NodeStatus {
    const ID: u16 = 341;
    const SIGNATURE: u64 = 0x0f08_68d0_c1a7_c6f1;
}
impl enc::Message for NodeStatus {}
impl enc::BufferType for NodeStatus {
    type Buffer = enc::StaticBuffer<7>;
}
impl NodeStatus {
    pub const SIZE: usize = 7;

    /// \[millisecond\]
    /// Publication period the node follows.
    pub const BROADCASTING_PERIOD_MS: u64 = 500;
    /// \[millisecond\]
    /// If the last message from the node was received more than this amount of time ago,
    /// it should be considered offline.
    pub const OFFLINE_TIMEOUT_MS: u64 = 3000;

    pub const MAX_SUB_MODE: u8 = 0x7;
}
impl enc::Serialize for NodeStatus {
    fn size_bits(&self) -> usize {
        56
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        cursor.write_u32(self.uptime_sec);
        cursor.write_uint(self.health.into_u8().into(), 2);
        cursor.write_uint(self.mode.into_u8().into(), 3);
        cursor.write_uint(self.sub_mode.into(), 3);
        cursor.write_u16(self.vendor_specific_status_code);
    }
}
impl enc::Deserialize for NodeStatus {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(NodeStatus {
            uptime_sec: cursor.read_u32(),
            health: Health::from_u8_truncating(cursor.read_uint(2) as u8),
            mode: Mode::try_from_u8(cursor.read_uint(3) as u8)
                .ok_or(enc::DeserializeError::InvalidValue)?,
            sub_mode: cursor.read_uint(3) as u8,
            vendor_specific_status_code: cursor.read_u16(),
        })
    }
}

/// Abstract node health
///
/// Ordered by severity, so `max` picks the worse of two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Health {
    /// The node is functioning properly.
    Ok = 0,
    /// A critical parameter went out of range or the node encountered a minor failure.
    Warning = 1,
    /// The node encountered a major failure.
    Error = 2,
    /// The node suffered a fatal malfunction.
    Critical = 3,
}

impl Health {
    pub const fn from_u8_truncating(code: u8) -> Self {
        match code & 0x3 {
            0 => Health::Ok,
            1 => Health::Warning,
            2 => Health::Error,
            _ => Health::Critical,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

/// Current node mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Normal operating mode.
    Operational = 0,
    /// Initialization is in progress; this mode is entered immediately after startup.
    Initialization = 1,
    /// E.g. calibration, the bootloader is running, etc.
    Maintenance = 2,
    /// New software/firmware is being loaded.
    SoftwareUpdate = 3,
    /// The node is no longer available.
    Offline = 7,
}

impl Mode {
    pub const fn try_from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Operational),
            1 => Some(Mode::Initialization),
            2 => Some(Mode::Maintenance),
            3 => Some(Mode::SoftwareUpdate),
            7 => Some(Mode::Offline),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}
