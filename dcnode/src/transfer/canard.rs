use heapless::Vec;

use crate::core::{NodeId, Priority, TransferId, TransferKind};
use crate::format::{TailByte, frame_count};
use crate::frame::{DataSpecifier, Frame, Header};
use crate::time::{Duration, Instant};
use crate::transfer::gather::Gather;
use crate::transfer::scatter::Scatter;
use crate::transfer::tx_queue::TxQueue;
use crate::transfer::{
    AcceptFilter, Payload, RxError, RxTransfer, ServiceKind, TransferEngine, TxError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionKey {
    type_id: u16,
    kind: TransferKind,
    source: NodeId,
}

struct Session {
    key: SessionKey,
    signature: u64,
    gather: Gather,
}

/// DroneCAN v0 transfer engine
///
/// `TX` bounds the outbound queue in frames, `SESSIONS` bounds the number of concurrently
/// tracked reception sessions. When the session table is full, a timed out session is
/// replaced first, the least recently active one otherwise.
pub struct Canard<const TX: usize = 64, const SESSIONS: usize = 8> {
    node_id: Option<NodeId>,
    tx_queue: TxQueue<TX>,
    sessions: Vec<Session, SESSIONS>,
}

impl<const TX: usize, const SESSIONS: usize> Default for Canard<TX, SESSIONS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const TX: usize, const SESSIONS: usize> Canard<TX, SESSIONS> {
    pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new() -> Self {
        Self {
            node_id: None,
            tx_queue: TxQueue::default(),
            sessions: Vec::new(),
        }
    }

    /// Number of frames waiting for transmission
    pub fn tx_pending(&self) -> usize {
        self.tx_queue.len()
    }

    fn enqueue(
        &mut self,
        header: Header,
        signature: u64,
        transfer_id: TransferId,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        let count = frame_count(payload.len());
        if count > self.tx_queue.free() {
            return Err(TxError::QueueFull);
        }

        let id = header.to_can_id();
        for data in Scatter::new(transfer_id, signature, payload) {
            unwrap!(self.tx_queue.push(Frame { id, data }));
        }
        Ok(count)
    }

    fn session_index(&mut self, key: SessionKey, signature: u64, timestamp: Instant) -> usize {
        if let Some(index) = self.sessions.iter().position(|session| session.key == key) {
            return index;
        }

        let session = Session {
            key,
            signature,
            gather: Gather::new(timestamp),
        };
        if !self.sessions.is_full() {
            let _ = self.sessions.push(session);
            return self.sessions.len() - 1;
        }

        let index = self
            .sessions
            .iter()
            .position(|session| session.gather.is_timed_out(timestamp, Self::TRANSFER_TIMEOUT))
            .or_else(|| {
                self.sessions
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, session)| session.gather.last_timestamp())
                    .map(|(index, _)| index)
            });
        let index = unwrap!(index);
        trace!("evicting rx session of type {}", self.sessions[index].key.type_id);
        self.sessions[index] = session;
        index
    }
}

impl<const TX: usize, const SESSIONS: usize> TransferEngine for Canard<TX, SESSIONS> {
    fn local_node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    fn set_local_node_id(&mut self, node_id: NodeId) {
        self.node_id = Some(node_id);
    }

    fn broadcast(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        let source = self.node_id.ok_or(TxError::NodeIdNotSet)?;
        let header = Header {
            priority,
            data_spec: DataSpecifier::Message(type_id),
            source: Some(source),
            destination: None,
        };
        let count = self.enqueue(header, signature, *transfer_id, payload)?;
        *transfer_id = transfer_id.next();
        Ok(count)
    }

    fn request_or_respond(
        &mut self,
        destination: NodeId,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        kind: ServiceKind,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        let source = self.node_id.ok_or(TxError::NodeIdNotSet)?;
        let type_id = u8::try_from(type_id).map_err(|_| TxError::InvalidTypeId)?;
        let data_spec = match kind {
            ServiceKind::Request => DataSpecifier::Request(type_id),
            ServiceKind::Response => DataSpecifier::Response(type_id),
        };
        let header = Header {
            priority,
            data_spec,
            source: Some(source),
            destination: Some(destination),
        };
        let count = self.enqueue(header, signature, *transfer_id, payload)?;
        if kind == ServiceKind::Request {
            *transfer_id = transfer_id.next();
        }
        Ok(count)
    }

    fn peek_tx(&self) -> Option<&Frame> {
        self.tx_queue.peek()
    }

    fn pop_tx(&mut self) -> Option<Frame> {
        self.tx_queue.pop()
    }

    fn handle_rx_frame(
        &mut self,
        frame: &Frame,
        timestamp: Instant,
        filter: &dyn AcceptFilter,
    ) -> Result<Option<RxTransfer>, RxError> {
        let header = frame.header();
        let kind = match header.data_spec {
            DataSpecifier::Message(_) => TransferKind::Broadcast,
            DataSpecifier::Request(_) => TransferKind::Request,
            DataSpecifier::Response(_) => TransferKind::Response,
        };
        if kind != TransferKind::Broadcast
            && (self.node_id.is_none() || header.destination != self.node_id)
        {
            return Ok(None);
        }

        let type_id = header.data_spec.type_id();
        let Some(signature) = filter.accept(type_id, kind, header.source) else {
            return Ok(None);
        };
        let (&tail_byte, payload) = frame.data.split_last().ok_or(RxError::ShortFrame)?;
        let tail = TailByte::from(tail_byte);

        let Some(source) = header.source else {
            // Anonymous transfers are single-frame by definition
            if !(tail.sot() && tail.eot()) {
                return Ok(None);
            }
            return Ok(Some(RxTransfer {
                timestamp,
                priority: header.priority,
                kind,
                type_id,
                source: None,
                transfer_id: tail.transfer_id(),
                subscription: 0,
                payload: unwrap!(Payload::from_slice(payload)),
            }));
        };

        let key = SessionKey {
            type_id,
            kind,
            source,
        };
        let known = self.sessions.iter().any(|session| session.key == key);
        if !known && !tail.sot() {
            return Err(RxError::MissedStart);
        }
        let index = self.session_index(key, signature, timestamp);
        let session = &mut self.sessions[index];
        if tail.sot() {
            session.signature = signature;
        }

        let transfer = session.gather.push_frame(
            Self::TRANSFER_TIMEOUT,
            session.signature,
            header.priority,
            &frame.data,
            timestamp,
        )?;
        Ok(transfer.map(|transfer| RxTransfer {
            timestamp: transfer.timestamp,
            priority: transfer.priority,
            kind,
            type_id,
            source: Some(source),
            transfer_id: transfer.id,
            subscription: 0,
            payload: transfer.payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ExtendedId;

    const LOCAL: NodeId = NodeId::new(10).unwrap();
    const REMOTE: NodeId = NodeId::new(20).unwrap();
    const SIGNATURE: u64 = 0x0f08_68d0_c1a7_c6f1;

    struct AcceptAll;

    impl AcceptFilter for AcceptAll {
        fn accept(&self, _type_id: u16, _kind: TransferKind, _source: Option<NodeId>) -> Option<u64> {
            Some(SIGNATURE)
        }
    }

    struct AcceptNone;

    impl AcceptFilter for AcceptNone {
        fn accept(&self, _type_id: u16, _kind: TransferKind, _source: Option<NodeId>) -> Option<u64> {
            None
        }
    }

    fn node(id: NodeId) -> Canard<16, 2> {
        let mut canard = Canard::new();
        canard.set_local_node_id(id);
        canard
    }

    fn deliver(
        from: &mut Canard<16, 2>,
        to: &mut Canard<16, 2>,
        filter: &dyn AcceptFilter,
    ) -> Option<RxTransfer> {
        let mut result = None;
        while let Some(frame) = from.pop_tx() {
            if let Some(transfer) = to.handle_rx_frame(&frame, Instant::from_millis(5), filter).unwrap()
            {
                result = Some(transfer);
            }
        }
        result
    }

    #[test]
    fn test_broadcast_requires_node_id() {
        let mut canard = Canard::<16, 2>::new();
        let mut tid = TransferId::default();
        assert_eq!(
            canard.broadcast(SIGNATURE, 341, &mut tid, Priority::LOW, &[0; 7]),
            Err(TxError::NodeIdNotSet)
        );
        assert_eq!(tid, TransferId::default());
    }

    #[test]
    fn test_broadcast_frame() {
        let mut canard = node(LOCAL);
        let mut tid = TransferId::from_u8_truncating(31);
        assert_eq!(
            canard.broadcast(SIGNATURE, 341, &mut tid, Priority::LOW, &[1, 2, 3, 4, 5, 6, 7]),
            Ok(1)
        );
        assert_eq!(tid, TransferId::default());

        let frame = canard.peek_tx().unwrap();
        assert_eq!(frame.id.as_raw(), 24 << 24 | 341 << 8 | 10);
        assert_eq!(*frame.data, [1, 2, 3, 4, 5, 6, 7, 0b1100_0000 + 31]);
    }

    #[test]
    fn test_queue_full_is_atomic() {
        let mut canard = node(LOCAL);
        let mut tid = TransferId::default();
        // 100 bytes need 15 frames
        assert_eq!(canard.broadcast(SIGNATURE, 1000, &mut tid, Priority::LOW, &[0; 100]), Ok(15));
        assert_eq!(
            canard.broadcast(SIGNATURE, 1000, &mut tid, Priority::LOW, &[0; 8]),
            Err(TxError::QueueFull)
        );
        assert_eq!(canard.tx_pending(), 15);
        assert_eq!(tid.into_u8(), 1);
    }

    #[test]
    fn test_service_type_id_range() {
        let mut canard = node(LOCAL);
        let mut tid = TransferId::default();
        assert_eq!(
            canard.request_or_respond(
                REMOTE,
                SIGNATURE,
                300,
                &mut tid,
                Priority::MEDIUM,
                ServiceKind::Request,
                &[]
            ),
            Err(TxError::InvalidTypeId)
        );
    }

    #[test]
    fn test_response_reuses_transfer_id() {
        let mut canard = node(LOCAL);
        let mut tid = TransferId::from_u8_truncating(7);
        canard
            .request_or_respond(REMOTE, SIGNATURE, 4, &mut tid, Priority::MEDIUM, ServiceKind::Response, &[1])
            .unwrap();
        assert_eq!(tid.into_u8(), 7);
        canard
            .request_or_respond(REMOTE, SIGNATURE, 4, &mut tid, Priority::MEDIUM, ServiceKind::Request, &[1])
            .unwrap();
        assert_eq!(tid.into_u8(), 8);
    }

    #[test]
    fn test_multi_frame_request_between_nodes() {
        let mut client = node(REMOTE);
        let mut server = node(LOCAL);
        let payload: heapless::Vec<u8, 50> = (0..50).collect();
        let mut tid = TransferId::default();
        client
            .request_or_respond(LOCAL, SIGNATURE, 11, &mut tid, Priority::HIGH, ServiceKind::Request, &payload)
            .unwrap();

        let transfer = deliver(&mut client, &mut server, &AcceptAll).unwrap();
        assert_eq!(transfer.kind, TransferKind::Request);
        assert_eq!(transfer.type_id, 11);
        assert_eq!(transfer.source, Some(REMOTE));
        assert_eq!(transfer.priority, Priority::HIGH);
        assert_eq!(transfer.payload, payload);
    }

    #[test]
    fn test_request_for_other_node_is_ignored() {
        let mut client = node(REMOTE);
        let mut other = node(NodeId::new(99).unwrap());
        let mut tid = TransferId::default();
        client
            .request_or_respond(LOCAL, SIGNATURE, 1, &mut tid, Priority::HIGH, ServiceKind::Request, &[])
            .unwrap();
        assert_eq!(deliver(&mut client, &mut other, &AcceptAll), None);
    }

    #[test]
    fn test_unwanted_transfer_is_ignored() {
        let mut remote = node(REMOTE);
        let mut local = node(LOCAL);
        let mut tid = TransferId::default();
        remote.broadcast(SIGNATURE, 341, &mut tid, Priority::LOW, &[0; 20]).unwrap();
        assert_eq!(deliver(&mut remote, &mut local, &AcceptNone), None);
    }

    #[test]
    fn test_continuation_without_session() {
        let mut local = node(LOCAL);
        let id = ExtendedId::new(24 << 24 | 341 << 8 | 20).unwrap();
        let frame = Frame::new(id, &[1, 2, 3, 0b0010_0000]).unwrap();
        assert_eq!(
            local.handle_rx_frame(&frame, Instant::from_millis(0), &AcceptAll),
            Err(RxError::MissedStart)
        );
    }

    #[test]
    fn test_anonymous_single_frame() {
        let mut local = node(LOCAL);
        // Discriminator in bits 10..23, type ID 1 in bits 8..9
        let id = ExtendedId::new(24 << 24 | 0x1234 << 10 | 1 << 8).unwrap();
        let frame = Frame::new(id, &[9, 0b1100_0011]).unwrap();
        let transfer = local
            .handle_rx_frame(&frame, Instant::from_millis(0), &AcceptAll)
            .unwrap()
            .unwrap();
        assert_eq!(transfer.source, None);
        assert_eq!(transfer.type_id, 1);
        assert_eq!(transfer.transfer_id.into_u8(), 3);
        assert_eq!(transfer.payload, [9]);
    }

    #[test]
    fn test_session_eviction() {
        let mut local = node(LOCAL);
        for (source, at) in [(20u8, 0u64), (21, 10), (22, 20)] {
            let id = ExtendedId::new(24 << 24 | 1000 << 8 | u32::from(source)).unwrap();
            let frame = Frame::new(id, &[0xaa, 0xbb, 0xcc, 0b1000_0000]).unwrap();
            assert_eq!(local.handle_rx_frame(&frame, Instant::from_millis(at), &AcceptAll), Ok(None));
        }
        assert_eq!(local.sessions.len(), 2);
        let sources: heapless::Vec<u8, 2> = local
            .sessions
            .iter()
            .map(|session| session.key.source.into_u8())
            .collect();
        assert_eq!(sources, [22, 21]);
    }
}
