//! DroneCAN protocol core data types
//!
//! This crate provides basic data type definitions used by other dcnode crates.
//! Users should not depend on this crate directly. Use `dcnode::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Transfer priority
///
/// DroneCAN v0 encodes priority as a 5-bit field at the top of the CAN ID,
/// so a lower numerical value means a higher priority: HIGHEST > LOWEST.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Priority(u8);

impl Priority {
    const MAX_VALUE: u8 = 0x1f;

    pub const HIGHEST: Priority = Priority(0);
    pub const HIGH: Priority = Priority(8);
    pub const MEDIUM: Priority = Priority(16);
    /// Default priority of the periodic NodeStatus broadcast
    pub const LOW: Priority = Priority(24);
    pub const LOWEST: Priority = Priority(31);

    pub const fn new(code: u8) -> Option<Priority> {
        if code <= Self::MAX_VALUE {
            Some(Priority::from_u8_truncating(code))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(code: u8) -> Priority {
        Priority(code & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.into_u8()
    }
}

impl From<Priority> for u32 {
    fn from(value: Priority) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Node identifier of a non-anonymous node
///
/// The value zero is reserved for anonymous transfers and broadcast addressing,
/// so an anonymous source or destination is modeled as `Option<NodeId>::None`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeId(u8);

impl NodeId {
    const MAX_VALUE: u8 = 0x7f;
    pub const MIN: NodeId = NodeId(1);
    pub const MAX: NodeId = NodeId(Self::MAX_VALUE);

    pub const fn new(value: u8) -> Option<Self> {
        if value != 0 && value <= Self::MAX_VALUE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Decodes a 7-bit address field, zero maps to `None`
    pub const fn from_u8_truncating(value: u8) -> Option<Self> {
        Self::new(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<NodeId> for u8 {
    fn from(value: NodeId) -> Self {
        value.into_u8()
    }
}

impl From<NodeId> for u32 {
    fn from(value: NodeId) -> Self {
        u8::from(value).into()
    }
}

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        u8::from(value).into()
    }
}

impl TryFrom<u8> for NodeId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferId(u8);

impl TransferId {
    const MAX_VALUE: u8 = 0x1f;
    pub const MAX: TransferId = TransferId(Self::MAX_VALUE);
    pub const SESSION_START: TransferId = TransferId(0);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) & Self::MAX.0)
    }

    /// Number of increments needed to get from `self` to `other` modulo 32
    pub fn forward_distance(self, other: TransferId) -> u8 {
        other.0.wrapping_sub(self.0) & Self::MAX_VALUE
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::SESSION_START
    }
}

impl From<TransferId> for u8 {
    fn from(value: TransferId) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for TransferId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Kind of a transfer as seen on the bus
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferKind {
    Broadcast,
    Request,
    Response,
}
