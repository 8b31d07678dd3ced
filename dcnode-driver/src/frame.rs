//! Transport frame object

use dcnode_core::{NodeId, Priority};

pub use embedded_can::ExtendedId;

const NODE_ID_MASK: u32 = lsb_mask(7);
const PRIORITY_MASK: u32 = lsb_mask(5);
const MSG_TYPE_ID_MASK: u32 = lsb_mask(16);
const ANON_TYPE_ID_MASK: u32 = lsb_mask(2);
const SRV_TYPE_ID_MASK: u32 = lsb_mask(8);

const PRIORITY_OFFSET: u32 = 24;
const SOURCE_OFFSET: u32 = 0;
const MSG_TYPE_ID_OFFSET: u32 = 8;
const SRV_TYPE_ID_OFFSET: u32 = 16;
const SRV_DESTINATION_OFFSET: u32 = 8;

const SERVICE_FLAG: u32 = 1 << 7;
const SRV_REQUEST_FLAG: u32 = 1 << 15;

const fn lsb_mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// Classic CAN payload capacity
pub const MTU: usize = 8;

/// Encodes the data type carried by a transfer and its kind
///
/// Message type IDs span 16 bits, service type IDs span 8 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSpecifier {
    Message(u16),
    Request(u8),
    Response(u8),
}

impl DataSpecifier {
    pub fn type_id(&self) -> u16 {
        match *self {
            DataSpecifier::Message(id) => id,
            DataSpecifier::Request(id) | DataSpecifier::Response(id) => id.into(),
        }
    }

    pub fn is_service(&self) -> bool {
        !matches!(self, DataSpecifier::Message(_))
    }
}

/// Transport frame data encoded with the 29-bit CAN frame ID
///
/// Anonymous messages carry only two bits of the type ID in the CAN ID, the rest of
/// the field is occupied by a discriminator. The decoded `data_spec` of such frames holds
/// the truncated type ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub priority: Priority,
    pub data_spec: DataSpecifier,
    pub source: Option<NodeId>,
    pub destination: Option<NodeId>,
}

impl Header {
    pub fn from_can_id(id: ExtendedId) -> Self {
        let raw = id.as_raw();
        let priority = Priority::from_u8_truncating(((raw >> PRIORITY_OFFSET) & PRIORITY_MASK) as u8);
        let source = NodeId::from_u8_truncating(((raw >> SOURCE_OFFSET) & NODE_ID_MASK) as u8);

        if raw & SERVICE_FLAG == 0 {
            let type_id = if source.is_some() {
                (raw >> MSG_TYPE_ID_OFFSET) & MSG_TYPE_ID_MASK
            } else {
                (raw >> MSG_TYPE_ID_OFFSET) & ANON_TYPE_ID_MASK
            };
            return Self {
                priority,
                data_spec: DataSpecifier::Message(type_id as u16),
                source,
                destination: None,
            };
        }

        let type_id = ((raw >> SRV_TYPE_ID_OFFSET) & SRV_TYPE_ID_MASK) as u8;
        let data_spec = if raw & SRV_REQUEST_FLAG != 0 {
            DataSpecifier::Request(type_id)
        } else {
            DataSpecifier::Response(type_id)
        };
        Self {
            priority,
            data_spec,
            source,
            destination: NodeId::from_u8_truncating(
                ((raw >> SRV_DESTINATION_OFFSET) & NODE_ID_MASK) as u8,
            ),
        }
    }

    /// Encodes the header into a CAN ID
    ///
    /// An anonymous message is encoded with a zero discriminator.
    pub fn to_can_id(&self) -> ExtendedId {
        let mut raw = u32::from(self.priority) << PRIORITY_OFFSET;
        raw |= self.source.map_or(0, u32::from) << SOURCE_OFFSET;

        match self.data_spec {
            DataSpecifier::Message(type_id) => {
                let mask = if self.source.is_some() {
                    MSG_TYPE_ID_MASK
                } else {
                    ANON_TYPE_ID_MASK
                };
                raw |= (u32::from(type_id) & mask) << MSG_TYPE_ID_OFFSET;
            }
            DataSpecifier::Request(type_id) | DataSpecifier::Response(type_id) => {
                raw |= SERVICE_FLAG;
                raw |= u32::from(type_id) << SRV_TYPE_ID_OFFSET;
                raw |= self.destination.map_or(0, u32::from) << SRV_DESTINATION_OFFSET;
                if matches!(self.data_spec, DataSpecifier::Request(_)) {
                    raw |= SRV_REQUEST_FLAG;
                }
            }
        }
        // All fields are masked to fit 29 bits
        unwrap!(ExtendedId::new(raw))
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// Classic CAN data vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Data {
    length: u8,
    bytes: [u8; MTU],
}

impl Data {
    /// Creates a new vector from a slice of at most `MTU` bytes.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > MTU {
            return Err(InvalidLength);
        }
        let mut bytes = [0; MTU];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self {
            length: data.len() as u8,
            bytes,
        })
    }

    pub fn new_zeros(length: usize) -> Result<Self, InvalidLength> {
        if length > MTU {
            return Err(InvalidLength);
        }
        Ok(Self {
            length: length as u8,
            bytes: [0; MTU],
        })
    }
}

impl core::ops::Deref for Data {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..usize::from(self.length)]
    }
}

impl core::ops::DerefMut for Data {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes[..usize::from(self.length)]
    }
}

/// Extended-ID data frame, the only frame kind DroneCAN uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: ExtendedId,
    pub data: Data,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Frame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Frame {{ id: {=u32:#x}, data: {} }}", self.id.as_raw(), self.data)
    }
}

impl Frame {
    pub fn new(id: ExtendedId, data: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            id,
            data: Data::new(data)?,
        })
    }

    pub fn header(&self) -> Header {
        Header::from_can_id(self.id)
    }

    /// CAN arbitration order: a lower ID wins the bus
    pub fn has_priority_over(&self, other: &Frame) -> bool {
        self.id.as_raw() < other.id.as_raw()
    }
}
