//! DroneCAN node runtime
//!
//! [`Node`] owns the CAN driver, the transfer engine, the platform hooks and the
//! parameter storage. It holds the node status and the transport statistics, routes
//! received transfers to subscriptions and answers the standard services:
//!
//! * `uavcan.protocol.GetNodeInfo`
//! * `uavcan.protocol.param.GetSet` and `ExecuteOpcode`
//! * `uavcan.protocol.RestartNode`
//! * `uavcan.protocol.GetTransportStats`
//!
//! It also listens to `uavcan.protocol.NodeStatus` to spot another node using the same ID.
//! While such a node is seen, the reported health is at least [`Health::Warning`].
//!
//! The node does nothing by itself. The application calls [`Node::spin_once`] from its
//! main loop. Each call
//! 1. pushes queued frames to the driver until the driver is busy,
//! 2. pulls up to [`MAX_RX_FRAMES`] received frames and dispatches completed transfers,
//! 3. broadcasts `NodeStatus` if [`NodeStatus::BROADCASTING_PERIOD_MS`] has elapsed.
//!
//! Subscription handlers are plain functions. They get a [`Control`] handle to read or
//! change the node status and to send transfers.

use dcnode_encoding::{self as enc, BufferType, Serialize};

use crate::core::{NodeId, Priority, TransferId};
use crate::driver::Iface;
use crate::time::Instant;
use crate::transfer::{RxTransfer, TxError};

mod core_node;
mod registry;
mod services;
mod spin;
mod state;

pub use crate::data_types::get_node_info::{HardwareVersion, MAX_NAME_LENGTH, SoftwareVersion};
pub use crate::data_types::node_status::{Health, Mode, NodeStatus};
pub use crate::data_types::transport_stats::{CanIfaceStats, TransportStats};
pub use core_node::Node;
pub use registry::{Handler, SubscribeError};
pub use spin::{MAX_RX_FRAMES, MAX_TX_ATTEMPTS};
pub use state::DUPLICATE_ID_WINDOW;

/// Application identity served through `GetNodeInfo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppInfo {
    /// Truncated to [`MAX_NAME_LENGTH`] bytes
    pub name: &'static str,
    pub software_version: SoftwareVersion,
    /// The unique ID is read from the platform, the value here is ignored
    pub hardware_version: HardwareVersion,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "org.dcnode.node",
            software_version: SoftwareVersion::new(0, 0, 0),
            hardware_version: HardwareVersion::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Local node ID, 1 to 127
    pub node_id: u8,
    /// CAN bitrate in bit/s
    pub bitrate: u32,
    pub iface: Iface,
    /// Initial vendor-specific status code
    pub vendor_status_code: u16,
    pub app: AppInfo,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: 0,
            bitrate: 1_000_000,
            iface: Iface::FIRST,
            vendor_status_code: 0,
            app: AppInfo::default(),
        }
    }
}

impl Config {
    pub fn new(node_id: u8, app: AppInfo) -> Self {
        Self {
            node_id,
            app,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError<E> {
    InvalidNodeId,
    Driver(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// The value does not fit its serialization buffer
    BufferTooSmall,
    Tx(TxError),
}

impl From<TxError> for PublishError {
    fn from(value: TxError) -> Self {
        Self::Tx(value)
    }
}

impl From<enc::BufferTooSmall> for PublishError {
    fn from(_value: enc::BufferTooSmall) -> Self {
        Self::BufferTooSmall
    }
}

/// Anything that can broadcast messages on behalf of the node
pub trait Publish {
    /// Node clock
    fn now(&self) -> Instant;

    /// Queues a raw message transfer and returns the number of queued frames
    fn publish(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError>;

    /// Serializes and queues a message
    fn publish_message<T: enc::Message + Serialize + BufferType>(
        &mut self,
        message: &T,
        transfer_id: &mut TransferId,
        priority: Priority,
    ) -> Result<usize, PublishError> {
        let mut buffer = T::Buffer::default();
        let length = enc::serialize_into(message, buffer.as_mut())?;
        let count = self.publish(
            T::SIGNATURE,
            T::ID,
            transfer_id,
            priority,
            &buffer.as_ref()[..length],
        )?;
        Ok(count)
    }
}

pub(crate) trait DynamicControl {
    fn status(&self) -> NodeStatus;
    fn set_health(&mut self, health: Health);
    fn set_mode(&mut self, mode: Mode);
    fn set_sub_mode(&mut self, sub_mode: u8);
    fn set_vendor_status_code(&mut self, code: u16);
    fn local_node_id(&self) -> NodeId;
    fn now(&self) -> Instant;
    fn stats(&self) -> TransportStats;
    fn publish(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError>;
    fn respond(
        &mut self,
        transfer: &RxTransfer,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) -> Result<usize, TxError>;
}

/// Node handle passed to subscription handlers
pub struct Control<'a>(&'a mut dyn DynamicControl);

impl<'a> Control<'a> {
    pub(crate) fn new(node: &'a mut dyn DynamicControl) -> Self {
        Self(node)
    }

    pub fn status(&self) -> NodeStatus {
        self.0.status()
    }

    pub fn set_health(&mut self, health: Health) {
        self.0.set_health(health);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.0.set_mode(mode);
    }

    pub fn set_sub_mode(&mut self, sub_mode: u8) {
        self.0.set_sub_mode(sub_mode);
    }

    pub fn set_vendor_status_code(&mut self, code: u16) {
        self.0.set_vendor_status_code(code);
    }

    pub fn local_node_id(&self) -> NodeId {
        self.0.local_node_id()
    }

    pub fn stats(&self) -> TransportStats {
        self.0.stats()
    }

    /// Queues a raw service response to `transfer`
    pub fn respond(
        &mut self,
        transfer: &RxTransfer,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.0.respond(transfer, signature, type_id, payload)
    }

    pub fn respond_with<T: enc::Response + Serialize + BufferType>(
        &mut self,
        transfer: &RxTransfer,
        response: &T,
    ) -> Result<usize, PublishError> {
        let mut buffer = T::Buffer::default();
        let length = enc::serialize_into(response, buffer.as_mut())?;
        let count = self.respond(transfer, T::SIGNATURE, T::ID, &buffer.as_ref()[..length])?;
        Ok(count)
    }
}

impl Publish for Control<'_> {
    fn now(&self) -> Instant {
        self.0.now()
    }

    fn publish(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.0
            .publish(signature, type_id, transfer_id, priority, payload)
    }
}
