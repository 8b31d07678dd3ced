#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use dcnode::core::{NodeId, Priority, TransferId, TransferKind};
use dcnode::driver::{CanDriver, Iface, TxStatus};
use dcnode::encoding::{self as enc, Serialize};
use dcnode::frame::{DataSpecifier, Frame};
use dcnode::node::{AppInfo, Config, HardwareVersion, Node, SoftwareVersion};
use dcnode::params::{IntegerParam, ParamError, ParamKind, ParamStorage, StringParam};
use dcnode::platform::Platform;
use dcnode::time::Instant;
use dcnode::transfer::{AcceptFilter, Canard, RxTransfer, ServiceKind, TransferEngine};

pub const LOCAL: NodeId = NodeId::new(10).unwrap();
pub const PEER: NodeId = NodeId::new(20).unwrap();
pub const NODE_NAME: &str = "org.dcnode.test";
pub const UNIQUE_ID: [u8; 16] = [0xa5; 16];

pub type TestNode<const SUBS: usize = 10> =
    Node<MockDriver, Canard, MockPlatform, MockStorage, SUBS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Default)]
pub struct MockDriver {
    pub rx: VecDeque<Frame>,
    pub sent: Vec<Frame>,
    /// Frames accepted before the driver reports busy, `None` for unlimited
    pub accept_limit: Option<usize>,
    pub fail_init: bool,
    pub fail_transmit: bool,
    pub fail_receive: bool,
    pub hw_errors: u64,
    pub rx_overflows: u64,
    pub init_args: Option<(u32, Iface)>,
}

impl MockDriver {
    /// Sent frames of the given data specifier
    pub fn sent_of(&self, data_spec: DataSpecifier) -> usize {
        self.sent
            .iter()
            .filter(|frame| frame.header().data_spec == data_spec)
            .count()
    }
}

impl CanDriver for MockDriver {
    type Error = MockError;

    fn init(&mut self, bitrate: u32, iface: Iface) -> Result<(), Self::Error> {
        if self.fail_init {
            return Err(MockError);
        }
        self.init_args = Some((bitrate, iface));
        Ok(())
    }

    fn receive(&mut self, _iface: Iface) -> Result<Option<Frame>, Self::Error> {
        if self.fail_receive {
            return Err(MockError);
        }
        Ok(self.rx.pop_front())
    }

    fn transmit(&mut self, _iface: Iface, frame: &Frame) -> Result<TxStatus, Self::Error> {
        if self.fail_transmit {
            return Err(MockError);
        }
        if let Some(limit) = self.accept_limit.as_mut() {
            if *limit == 0 {
                return Ok(TxStatus::Busy);
            }
            *limit -= 1;
        }
        self.sent.push(*frame);
        Ok(TxStatus::Accepted)
    }

    fn error_count(&self) -> u64 {
        self.hw_errors
    }

    fn rx_overflow_count(&self) -> u64 {
        self.rx_overflows
    }
}

#[derive(Default)]
pub struct MockPlatform {
    pub clock: Rc<Cell<u32>>,
    pub accept_restart: bool,
    pub restart_requests: usize,
}

impl Platform for MockPlatform {
    fn time_ms(&self) -> u32 {
        self.clock.get()
    }

    fn request_restart(&mut self) -> bool {
        self.restart_requests += 1;
        self.accept_restart
    }

    fn read_unique_id(&self, unique_id: &mut [u8; 16]) {
        *unique_id = UNIQUE_ID;
    }
}

pub enum Slot {
    Integer(IntegerParam),
    String(StringParam),
}

pub struct MockParam {
    pub name: &'static str,
    pub slot: Slot,
}

pub struct MockStorage {
    pub params: Vec<Option<MockParam>>,
    pub save_ok: bool,
    pub calls: Vec<&'static str>,
}

impl MockStorage {
    pub fn empty() -> Self {
        Self {
            params: Vec::new(),
            save_ok: true,
            calls: Vec::new(),
        }
    }

    /// Indices 0, 1, 3 and 5 are populated
    pub fn sample() -> Self {
        let integer = |name, value, default, min, max| {
            Some(MockParam {
                name,
                slot: Slot::Integer(IntegerParam {
                    value,
                    default,
                    min,
                    max,
                }),
            })
        };
        let mut storage = Self::empty();
        storage.params = vec![
            integer("uavcan.node_id", 10, 0, 0, 127),
            Some(MockParam {
                name: "board.label",
                slot: Slot::String(StringParam::from_slice(b"left").unwrap()),
            }),
            None,
            integer("bar", 30, 3, 0, 100),
            None,
            integer("foo", 50, 5, -100, 100),
        ];
        storage
    }

    fn param(&self, index: u16) -> Option<&MockParam> {
        self.params.get(usize::from(index))?.as_ref()
    }

    fn param_mut(&mut self, index: u16) -> Option<&mut MockParam> {
        self.params.get_mut(usize::from(index))?.as_mut()
    }
}

impl ParamStorage for MockStorage {
    fn find(&self, name: &str) -> Option<u16> {
        self.params
            .iter()
            .position(|param| param.as_ref().is_some_and(|param| param.name == name))
            .map(|index| index as u16)
    }

    fn name(&self, index: u16) -> Option<&str> {
        self.param(index).map(|param| param.name)
    }

    fn kind(&self, index: u16) -> ParamKind {
        match self.param(index).map(|param| &param.slot) {
            Some(Slot::Integer(_)) => ParamKind::Integer,
            Some(Slot::String(_)) => ParamKind::String,
            None => ParamKind::Unknown,
        }
    }

    fn integer(&self, index: u16) -> Option<IntegerParam> {
        match self.param(index)?.slot {
            Slot::Integer(param) => Some(param),
            Slot::String(_) => None,
        }
    }

    fn set_integer(&mut self, index: u16, value: i32) -> Result<(), ParamError> {
        self.calls.push("set_integer");
        let param = self.param_mut(index).ok_or(ParamError::UnknownIndex)?;
        match &mut param.slot {
            Slot::Integer(param) if (param.min..=param.max).contains(&value) => {
                param.value = value;
                Ok(())
            }
            _ => Err(ParamError::InvalidValue),
        }
    }

    fn string(&self, index: u16) -> Option<StringParam> {
        match &self.param(index)?.slot {
            Slot::String(value) => Some(value.clone()),
            Slot::Integer(_) => None,
        }
    }

    fn set_string(&mut self, index: u16, value: &[u8]) -> Result<(), ParamError> {
        self.calls.push("set_string");
        let param = self.param_mut(index).ok_or(ParamError::UnknownIndex)?;
        match &mut param.slot {
            Slot::String(slot) => {
                *slot = StringParam::from_slice(value).map_err(|_| ParamError::InvalidValue)?;
                Ok(())
            }
            Slot::Integer(_) => Err(ParamError::InvalidValue),
        }
    }

    fn save(&mut self) -> Result<(), ParamError> {
        self.calls.push("save");
        if self.save_ok {
            Ok(())
        } else {
            Err(ParamError::Storage)
        }
    }

    fn reset_to_default(&mut self) -> Result<(), ParamError> {
        self.calls.push("reset_to_default");
        Ok(())
    }
}

pub fn app_info() -> AppInfo {
    AppInfo {
        name: NODE_NAME,
        software_version: SoftwareVersion::new(1, 2, 0xdead_beef),
        hardware_version: HardwareVersion::new(3, 4),
    }
}

pub fn new_node<const SUBS: usize>(storage: MockStorage) -> TestNode<SUBS> {
    new_node_with(MockPlatform::default(), storage)
}

pub fn new_node_with<const SUBS: usize>(
    platform: MockPlatform,
    storage: MockStorage,
) -> TestNode<SUBS> {
    let config = Config::new(LOCAL.into_u8(), app_info());
    Node::new(config, MockDriver::default(), Canard::new(), platform, storage).unwrap()
}

pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    let mut buffer = [0u8; 512];
    let length = enc::serialize_into(value, &mut buffer).unwrap();
    buffer[..length].to_vec()
}

/// Accepts transfers of a single type and kind
pub struct Expect {
    pub signature: u64,
    pub type_id: u16,
    pub kind: TransferKind,
}

impl AcceptFilter for Expect {
    fn accept(&self, type_id: u16, kind: TransferKind, _source: Option<NodeId>) -> Option<u64> {
        (type_id == self.type_id && kind == self.kind).then_some(self.signature)
    }
}

/// Remote node talking to the node under test through its mock driver
pub struct Peer {
    pub engine: Canard<128, 8>,
    pub transfer_id: TransferId,
    /// Sent frames of the node under test already consumed by this peer
    seen: usize,
}

impl Peer {
    pub fn new(node_id: NodeId) -> Self {
        let mut engine = Canard::new();
        engine.set_local_node_id(node_id);
        Self {
            engine,
            transfer_id: TransferId::default(),
            seen: 0,
        }
    }

    /// Ignores the frames the node has sent so far
    pub fn skip_sent<const SUBS: usize>(&mut self, node: &TestNode<SUBS>) {
        self.seen = node.driver().sent.len();
    }

    fn flush_into<const SUBS: usize>(&mut self, node: &mut TestNode<SUBS>) {
        while let Some(frame) = self.engine.pop_tx() {
            node.driver_mut().rx.push_back(frame);
        }
    }

    pub fn request<const SUBS: usize>(
        &mut self,
        node: &mut TestNode<SUBS>,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) {
        self.engine
            .request_or_respond(
                LOCAL,
                signature,
                type_id,
                &mut self.transfer_id,
                Priority::MEDIUM,
                ServiceKind::Request,
                payload,
            )
            .unwrap();
        self.flush_into(node);
    }

    pub fn broadcast<const SUBS: usize>(
        &mut self,
        node: &mut TestNode<SUBS>,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) {
        self.engine
            .broadcast(
                signature,
                type_id,
                &mut self.transfer_id,
                Priority::MEDIUM,
                payload,
            )
            .unwrap();
        self.flush_into(node);
    }

    /// Reassembles the transfers the node has sent since the last call
    pub fn collect<const SUBS: usize>(
        &mut self,
        node: &TestNode<SUBS>,
        filter: &Expect,
    ) -> Vec<RxTransfer> {
        let sent = &node.driver().sent;
        let mut transfers = Vec::new();
        for frame in &sent[self.seen..] {
            if let Some(transfer) = self
                .engine
                .handle_rx_frame(frame, Instant::from_millis(0), filter)
                .unwrap()
            {
                transfers.push(transfer);
            }
        }
        self.seen = sent.len();
        transfers
    }

    /// Single response of the given type
    pub fn response<const SUBS: usize>(
        &mut self,
        node: &TestNode<SUBS>,
        signature: u64,
        type_id: u16,
    ) -> RxTransfer {
        let filter = Expect {
            signature,
            type_id,
            kind: TransferKind::Response,
        };
        let mut transfers = self.collect(node, &filter);
        assert_eq!(transfers.len(), 1, "expected exactly one response");
        transfers.pop().unwrap()
    }
}

/// Spins twice: the first spin handles the inbound frames, the second one
/// transmits the queued responses
pub fn exchange<const SUBS: usize>(node: &mut TestNode<SUBS>, now_ms: u32) {
    node.spin_once_at(now_ms);
    node.spin_once_at(now_ms + 1);
}
