//! Transfer engine
//!
//! The engine turns application payloads into CAN frames and back. The node core talks
//! to it through the [`TransferEngine`] contract only; [`Canard`] is the bundled
//! implementation following the DroneCAN v0 transport rules:
//!
//! * every frame ends with a tail byte carrying start/end of transfer flags, a toggle
//!   bit and a 5-bit transfer ID;
//! * a payload of up to 7 bytes travels in a single frame without CRC;
//! * longer payloads are split into 7-byte chunks, the first chunk starts with the
//!   little-endian CRC-16 of the payload seeded with the data type signature.

use dcnode_encoding as enc;
use heapless::Vec;

use crate::core::{NodeId, Priority, TransferId, TransferKind};
use crate::frame::Frame;
use crate::time::Instant;

mod canard;
mod gather;
mod scatter;
mod tx_queue;

pub use canard::Canard;

/// Largest payload of a received transfer
pub const MAX_PAYLOAD_LENGTH: usize = 384;

pub type Payload = Vec<u8, MAX_PAYLOAD_LENGTH>;

/// Direction of a service transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceKind {
    Request,
    Response,
}

impl From<ServiceKind> for TransferKind {
    fn from(value: ServiceKind) -> Self {
        match value {
            ServiceKind::Request => TransferKind::Request,
            ServiceKind::Response => TransferKind::Response,
        }
    }
}

/// Reassembled inbound transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxTransfer {
    /// Reception time of the first frame
    pub timestamp: Instant,
    pub priority: Priority,
    pub kind: TransferKind,
    pub type_id: u16,
    /// `None` for anonymous messages
    pub source: Option<NodeId>,
    pub transfer_id: TransferId,
    /// Index of the subscription the transfer is dispatched to
    pub subscription: usize,
    pub payload: Payload,
}

impl RxTransfer {
    pub fn decode<T: enc::Deserialize>(&self) -> Result<T, enc::DeserializeError> {
        enc::deserialize_from(&self.payload)
    }
}

/// Decides which inbound transfers are worth reassembling
pub trait AcceptFilter {
    /// Returns the data type signature if transfers of this type are wanted
    fn accept(&self, type_id: u16, kind: TransferKind, source: Option<NodeId>) -> Option<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// Anonymous transmission is not supported
    NodeIdNotSet,
    /// The outbound queue can not take all frames of the transfer
    QueueFull,
    /// Service type ID beyond 8 bits
    InvalidTypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// A continuation frame without a preceding start of transfer
    MissedStart,
    WrongToggle,
    UnexpectedTransferId,
    /// Empty frame or a start frame too short to carry the CRC
    ShortFrame,
    BadCrc,
    /// The transfer does not fit [`MAX_PAYLOAD_LENGTH`]
    PayloadOverflow,
}

/// Transfer-level protocol engine contract
pub trait TransferEngine {
    fn local_node_id(&self) -> Option<NodeId>;

    fn set_local_node_id(&mut self, node_id: NodeId);

    /// Queues a message transfer and advances `transfer_id`
    ///
    /// Returns the number of queued frames.
    fn broadcast(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError>;

    /// Queues a service transfer
    ///
    /// A request advances `transfer_id`, a response reuses the request's one.
    /// Returns the number of queued frames.
    #[allow(clippy::too_many_arguments)]
    fn request_or_respond(
        &mut self,
        destination: NodeId,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        kind: ServiceKind,
        payload: &[u8],
    ) -> Result<usize, TxError>;

    /// Highest priority frame waiting for transmission
    fn peek_tx(&self) -> Option<&Frame>;

    fn pop_tx(&mut self) -> Option<Frame>;

    /// Feeds one received frame
    ///
    /// Returns a transfer once its last frame arrives. Frames that are not addressed to
    /// the local node or not wanted by `filter` yield `Ok(None)`.
    fn handle_rx_frame(
        &mut self,
        frame: &Frame,
        timestamp: Instant,
        filter: &dyn AcceptFilter,
    ) -> Result<Option<RxTransfer>, RxError>;
}
