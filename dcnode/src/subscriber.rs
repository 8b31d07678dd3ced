//! Typed message reception

use dcnode_encoding::Deserialize;

use crate::core::NodeId;
use crate::time::Instant;
use crate::transfer::RxTransfer;

/// Decides whether a decoded message is kept
pub type Filter<T> = fn(&RxTransfer, &T) -> bool;

/// Decoded message with its transfer metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received<T> {
    pub msg: T,
    pub source: Option<NodeId>,
    pub timestamp: Instant,
}

/// Keeps the last message of type `T` per subscription
///
/// One instance serves up to `N` subscriptions of the same handler: slots are indexed by
/// [`RxTransfer::subscription`]. Transfers of subscriptions beyond `N` are ignored.
///
/// # Examples:
///
/// ```
/// use dcnode::data_types::node_status::{Health, NodeStatus};
/// use dcnode::subscriber::Subscriber;
/// use dcnode::transfer::RxTransfer;
///
/// fn healthy(_transfer: &RxTransfer, msg: &NodeStatus) -> bool {
///     msg.health == Health::Ok
/// }
///
/// fn on_status(subscriber: &mut Subscriber<NodeStatus, 8>, transfer: &RxTransfer) {
///     if let Some(received) = subscriber.receive(transfer) {
///         let _uptime = received.msg.uptime_sec;
///     }
/// }
///
/// let subscriber = Subscriber::<NodeStatus, 8>::with_filter(healthy);
/// assert!(subscriber.last(0).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Subscriber<T, const N: usize> {
    filter: Option<Filter<T>>,
    slots: [Option<Received<T>>; N],
}

impl<T, const N: usize> Default for Subscriber<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Subscriber<T, N> {
    pub fn new() -> Self {
        Self {
            filter: None,
            slots: core::array::from_fn(|_| None),
        }
    }

    pub fn with_filter(filter: Filter<T>) -> Self {
        Self {
            filter: Some(filter),
            ..Self::new()
        }
    }

    /// Last accepted message of the given subscription
    pub fn last(&self, subscription: usize) -> Option<&Received<T>> {
        self.slots.get(subscription)?.as_ref()
    }

    /// Empties the slot of the given subscription
    pub fn take(&mut self, subscription: usize) -> Option<Received<T>> {
        self.slots.get_mut(subscription)?.take()
    }
}

impl<T: Deserialize, const N: usize> Subscriber<T, N> {
    /// Decodes the transfer and stores it in its subscription slot
    ///
    /// Returns the stored message. Malformed and filtered out messages leave the slot
    /// untouched.
    pub fn receive(&mut self, transfer: &RxTransfer) -> Option<&Received<T>> {
        if transfer.subscription >= N {
            warn!("subscription {} has no slot", transfer.subscription);
            return None;
        }
        let msg: T = match transfer.decode() {
            Ok(msg) => msg,
            Err(err) => {
                debug!("malformed message of type {}: {:?}", transfer.type_id, err);
                return None;
            }
        };
        if let Some(filter) = self.filter {
            if !filter(transfer, &msg) {
                return None;
            }
        }

        let slot = &mut self.slots[transfer.subscription];
        *slot = Some(Received {
            msg,
            source: transfer.source,
            timestamp: transfer.timestamp,
        });
        slot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Priority, TransferId, TransferKind};
    use crate::data_types::node_status::{Health, NodeStatus};
    use crate::transfer::Payload;
    use dcnode_encoding as enc;

    fn transfer(subscription: usize, payload: &[u8]) -> RxTransfer {
        RxTransfer {
            timestamp: Instant::from_millis(7),
            priority: Priority::LOW,
            kind: TransferKind::Broadcast,
            type_id: 341,
            source: NodeId::new(20),
            transfer_id: TransferId::default(),
            subscription,
            payload: Payload::from_slice(payload).unwrap(),
        }
    }

    fn status(health: Health) -> [u8; NodeStatus::SIZE] {
        let status = NodeStatus {
            health,
            ..Default::default()
        };
        let mut buffer = [0u8; NodeStatus::SIZE];
        enc::serialize_into(&status, &mut buffer).unwrap();
        buffer
    }

    fn healthy(_transfer: &RxTransfer, msg: &NodeStatus) -> bool {
        msg.health == Health::Ok
    }

    #[test]
    fn test_slots_follow_subscription_index() {
        let mut subscriber = Subscriber::<NodeStatus, 4>::new();
        assert!(subscriber.receive(&transfer(1, &status(Health::Error))).is_some());
        assert!(subscriber.receive(&transfer(3, &status(Health::Ok))).is_some());

        let received = subscriber.last(1).unwrap();
        assert_eq!(received.msg.health, Health::Error);
        assert_eq!(received.source, NodeId::new(20));
        assert_eq!(received.timestamp, Instant::from_millis(7));
        assert_eq!(subscriber.last(3).unwrap().msg.health, Health::Ok);
        assert!(subscriber.last(0).is_none());

        assert!(subscriber.take(1).is_some());
        assert!(subscriber.last(1).is_none());
    }

    #[test]
    fn test_filter_and_malformed_keep_slot() {
        let mut subscriber = Subscriber::<NodeStatus, 2>::with_filter(healthy);
        assert!(subscriber.receive(&transfer(0, &status(Health::Ok))).is_some());
        assert!(subscriber.receive(&transfer(0, &status(Health::Warning))).is_none());
        // reserved mode value
        assert!(subscriber.receive(&transfer(0, &[0, 0, 0, 0, 0x20, 0, 0])).is_none());
        assert_eq!(subscriber.last(0).unwrap().msg.health, Health::Ok);
    }

    #[test]
    fn test_subscription_beyond_capacity_is_ignored() {
        let mut subscriber = Subscriber::<NodeStatus, 2>::new();
        assert!(subscriber.receive(&transfer(2, &status(Health::Ok))).is_none());
        assert!(subscriber.last(2).is_none());
    }
}
