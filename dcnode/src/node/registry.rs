use heapless::Vec;

use crate::core::{NodeId, TransferKind};
use crate::node::Control;
use crate::transfer::{AcceptFilter, RxTransfer};

/// Subscription handler
///
/// Runs synchronously inside [`Node::spin_once`](crate::node::Node::spin_once) and must
/// not block.
pub type Handler = fn(&mut Control<'_>, &RxTransfer);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubscribeError {
    /// All subscription slots are taken
    Full,
    InvalidSignature,
    InvalidTypeId,
}

/// Services the node answers by itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Service {
    GetNodeInfo,
    ParamGetSet,
    ParamExecuteOpcode,
    RestartNode,
    GetTransportStats,
    NodeStatusSnoop,
}

#[derive(Clone, Copy)]
pub(crate) enum Callback {
    Builtin(Service),
    User(Handler),
}

#[derive(Clone, Copy)]
pub(crate) struct Entry {
    pub signature: u64,
    pub type_id: u16,
    /// `None` matches transfers of any kind
    pub kind: Option<TransferKind>,
    pub callback: Callback,
}

impl Entry {
    pub fn matches(&self, type_id: u16, kind: TransferKind) -> bool {
        self.type_id == type_id && self.kind.is_none_or(|own| own == kind)
    }
}

/// Fixed-capacity subscription table
///
/// Registration order is preserved: it decides both the accept-filter signature on
/// type ID collisions and the handler invocation order.
pub(crate) struct Registry<const N: usize> {
    entries: Vec<Entry, N>,
}

impl<const N: usize> Registry<N> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<Entry> {
        self.entries.get(index).copied()
    }

    pub fn subscribe(
        &mut self,
        signature: u64,
        type_id: u16,
        handler: Handler,
    ) -> Result<usize, SubscribeError> {
        if signature == 0 {
            return Err(SubscribeError::InvalidSignature);
        }
        if type_id == 0 {
            return Err(SubscribeError::InvalidTypeId);
        }
        self.push(Entry {
            signature,
            type_id,
            kind: None,
            callback: Callback::User(handler),
        })
    }

    pub fn install(
        &mut self,
        service: Service,
        signature: u64,
        type_id: u16,
        kind: TransferKind,
    ) -> Result<usize, SubscribeError> {
        self.push(Entry {
            signature,
            type_id,
            kind: Some(kind),
            callback: Callback::Builtin(service),
        })
    }

    fn push(&mut self, entry: Entry) -> Result<usize, SubscribeError> {
        self.entries
            .push(entry)
            .map_err(|_| SubscribeError::Full)?;
        Ok(self.entries.len() - 1)
    }

    /// Signature of the first subscription to `type_id`
    pub fn find_by_type_id(&self, type_id: u16) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.type_id == type_id)
            .map(|entry| entry.signature)
    }
}

impl<const N: usize> AcceptFilter for Registry<N> {
    fn accept(&self, type_id: u16, kind: TransferKind, _source: Option<NodeId>) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.matches(type_id, kind))
            .map(|entry| entry.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(_control: &mut Control<'_>, _transfer: &RxTransfer) {}

    #[test]
    fn test_capacity() {
        let mut registry = Registry::<2>::new();
        assert_eq!(registry.subscribe(1, 100, handler), Ok(0));
        assert_eq!(registry.subscribe(2, 101, handler), Ok(1));
        assert_eq!(registry.subscribe(3, 102, handler), Err(SubscribeError::Full));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_by_type_id(102), None);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut registry = Registry::<2>::new();
        assert_eq!(
            registry.subscribe(0, 100, handler),
            Err(SubscribeError::InvalidSignature)
        );
        assert_eq!(registry.subscribe(1, 0, handler), Err(SubscribeError::InvalidTypeId));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry = Registry::<3>::new();
        registry.subscribe(0xaa, 100, handler).unwrap();
        registry.subscribe(0xbb, 100, handler).unwrap();
        assert_eq!(registry.find_by_type_id(100), Some(0xaa));
        assert_eq!(registry.accept(100, TransferKind::Broadcast, None), Some(0xaa));
    }

    #[test]
    fn test_builtin_kind() {
        let mut registry = Registry::<3>::new();
        registry
            .install(Service::GetNodeInfo, 0xee, 1, TransferKind::Request)
            .unwrap();
        assert_eq!(registry.accept(1, TransferKind::Request, None), Some(0xee));
        assert_eq!(registry.accept(1, TransferKind::Response, None), None);
        assert_eq!(registry.accept(1, TransferKind::Broadcast, None), None);

        registry.subscribe(0xff, 1, handler).unwrap();
        assert_eq!(registry.accept(1, TransferKind::Response, None), Some(0xff));
    }
}
