use dcnode_encoding::{self as enc, BufferType, DataType, Serialize};

use crate::core::{NodeId, Priority, TransferId, TransferKind};
use crate::data_types::get_node_info::GetNodeInfoRequest;
use crate::data_types::node_status::NodeStatus;
use crate::data_types::param::{ExecuteOpcodeRequest, GetSetRequest};
use crate::data_types::restart_node::RestartNodeRequest;
use crate::data_types::transport_stats::GetTransportStatsRequest;
use crate::driver::{CanDriver, Iface};
use crate::node::registry::{Registry, Service};
use crate::node::state::NodeState;
use crate::node::{
    AppInfo, Config, DynamicControl, Handler, HardwareVersion, Health, InitError, Mode,
    Publish, PublishError, SoftwareVersion, SubscribeError, TransportStats,
};
use crate::params::ParamStorage;
use crate::platform::Platform;
use crate::time::Instant;
use crate::transfer::{RxTransfer, ServiceKind, TransferEngine, TxError};

const BUILTIN_SERVICES: [(Service, u64, u16, TransferKind); 6] = [
    (
        Service::GetNodeInfo,
        GetNodeInfoRequest::SIGNATURE,
        GetNodeInfoRequest::ID,
        TransferKind::Request,
    ),
    (
        Service::ParamGetSet,
        GetSetRequest::SIGNATURE,
        GetSetRequest::ID,
        TransferKind::Request,
    ),
    (
        Service::ParamExecuteOpcode,
        ExecuteOpcodeRequest::SIGNATURE,
        ExecuteOpcodeRequest::ID,
        TransferKind::Request,
    ),
    (
        Service::RestartNode,
        RestartNodeRequest::SIGNATURE,
        RestartNodeRequest::ID,
        TransferKind::Request,
    ),
    (
        Service::GetTransportStats,
        GetTransportStatsRequest::SIGNATURE,
        GetTransportStatsRequest::ID,
        TransferKind::Request,
    ),
    (
        Service::NodeStatusSnoop,
        NodeStatus::SIGNATURE,
        NodeStatus::ID,
        TransferKind::Broadcast,
    ),
];

/// DroneCAN node
///
/// `SUBS` is the subscription capacity, built-in services included.
pub struct Node<D, E, P, S, const SUBS: usize = 10>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    pub(super) driver: D,
    pub(super) engine: E,
    pub(super) platform: P,
    pub(super) storage: S,
    pub(super) iface: Iface,
    pub(super) registry: Registry<SUBS>,
    pub(super) state: NodeState,
}

impl<D, E, P, S, const SUBS: usize> Node<D, E, P, S, SUBS>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    const _CAPACITY_CHECK: () = assert!(
        SUBS >= BUILTIN_SERVICES.len(),
        "subscription capacity must cover built-in services"
    );

    /// Validates the configuration, initializes the driver and installs built-in services
    pub fn new(
        config: Config,
        mut driver: D,
        mut engine: E,
        platform: P,
        storage: S,
    ) -> Result<Self, InitError<D::Error>> {
        #[allow(clippy::let_unit_value)]
        let () = Self::_CAPACITY_CHECK;

        let node_id = NodeId::new(config.node_id).ok_or(InitError::InvalidNodeId)?;
        driver
            .init(config.bitrate, config.iface)
            .map_err(InitError::Driver)?;
        engine.set_local_node_id(node_id);

        let mut registry = Registry::new();
        for (service, signature, type_id, kind) in BUILTIN_SERVICES {
            unwrap!(registry.install(service, signature, type_id, kind));
        }

        let state = NodeState::new(node_id, platform.time_ms());
        let mut node = Self {
            driver,
            engine,
            platform,
            storage,
            iface: config.iface,
            registry,
            state,
        };
        node.state.vendor_status_code = config.vendor_status_code;
        node.configure(&config.app);
        info!(
            "node {} started at {} bit/s",
            node_id.into_u8(),
            config.bitrate
        );
        Ok(node)
    }

    pub fn local_node_id(&self) -> NodeId {
        self.state.node_id
    }

    /// Changes the local node ID used for all subsequent transfers
    pub fn set_node_id(&mut self, node_id: NodeId) {
        info!("node id changed to {}", node_id.into_u8());
        self.state.node_id = node_id;
        self.engine.set_local_node_id(node_id);
    }

    /// Replaces the name and versions served through `GetNodeInfo`
    pub fn configure(&mut self, app: &AppInfo) {
        self.state.set_name(app.name);
        self.state.software_version = app.software_version;
        let mut hardware_version = app.hardware_version;
        self.platform
            .read_unique_id(&mut hardware_version.unique_id);
        self.state.hardware_version = hardware_version;
    }

    /// Health as broadcast, escalated to at least [`Health::Warning`] while another
    /// node uses the local node ID
    pub fn health(&self) -> Health {
        self.state.effective_health()
    }

    /// Health last set by the application
    pub fn requested_health(&self) -> Health {
        self.state.health
    }

    /// Has no effect once the health is [`Health::Critical`]
    pub fn set_health(&mut self, health: Health) {
        self.state.set_health(health);
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
    }

    pub fn sub_mode(&self) -> u8 {
        self.state.sub_mode
    }

    /// Saturates at [`NodeStatus::MAX_SUB_MODE`]
    pub fn set_sub_mode(&mut self, sub_mode: u8) {
        self.state.set_sub_mode(sub_mode);
    }

    pub fn vendor_status_code(&self) -> u16 {
        self.state.vendor_status_code
    }

    pub fn set_vendor_status_code(&mut self, code: u16) {
        self.state.vendor_status_code = code;
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Truncated at a character boundary to fit [`MAX_NAME_LENGTH`](super::MAX_NAME_LENGTH)
    pub fn set_name(&mut self, name: &str) {
        self.state.set_name(name);
    }

    pub fn software_version(&self) -> SoftwareVersion {
        self.state.software_version
    }

    pub fn hardware_version(&self) -> HardwareVersion {
        self.state.hardware_version
    }

    /// Status as broadcast right now
    pub fn status(&self) -> NodeStatus {
        self.state.status()
    }

    pub fn is_duplicate_id_detected(&self) -> bool {
        self.state.duplicate.is_detected()
    }

    pub fn stats(&self) -> TransportStats {
        self.state.stats
    }

    pub fn now(&self) -> Instant {
        self.state.clock.now()
    }

    /// Registers a handler for transfers of the given type ID
    ///
    /// Returns the subscription index, which is stable and passed to the handler
    /// as [`RxTransfer::subscription`].
    pub fn subscribe(
        &mut self,
        signature: u64,
        type_id: u16,
        handler: Handler,
    ) -> Result<usize, SubscribeError> {
        let index = self.registry.subscribe(signature, type_id, handler)?;
        debug!("subscription {} to type {}", index, type_id);
        Ok(index)
    }

    /// Signature of the first subscription to `type_id`, built-in services included
    pub fn subscribed_signature(&self, type_id: u16) -> Option<u64> {
        self.registry.find_by_type_id(type_id)
    }

    pub fn subscribe_to<T: DataType>(&mut self, handler: Handler) -> Result<usize, SubscribeError> {
        self.subscribe(T::SIGNATURE, T::ID, handler)
    }

    /// Queues a raw service response to `transfer`
    ///
    /// An empty payload queues nothing.
    pub fn respond(
        &mut self,
        transfer: &RxTransfer,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        if payload.is_empty() {
            return Ok(0);
        }
        let Some(destination) = transfer.source else {
            return Ok(0);
        };
        let mut transfer_id = transfer.transfer_id;
        self.engine.request_or_respond(
            destination,
            signature,
            type_id,
            &mut transfer_id,
            transfer.priority,
            ServiceKind::Response,
            payload,
        )
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

    /// Queues a service request and advances `transfer_id`
    pub fn request(
        &mut self,
        destination: NodeId,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.engine.request_or_respond(
            destination,
            signature,
            type_id,
            transfer_id,
            priority,
            ServiceKind::Request,
            payload,
        )
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

impl<D, E, P, S, const SUBS: usize> Publish for Node<D, E, P, S, SUBS>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    fn now(&self) -> Instant {
        self.state.clock.now()
    }

    fn publish(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.engine
            .broadcast(signature, type_id, transfer_id, priority, payload)
    }
}

impl<D, E, P, S, const SUBS: usize> DynamicControl for Node<D, E, P, S, SUBS>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    fn status(&self) -> NodeStatus {
        self.state.status()
    }

    fn set_health(&mut self, health: Health) {
        self.state.set_health(health);
    }

    fn set_mode(&mut self, mode: Mode) {
        self.state.mode = mode;
    }

    fn set_sub_mode(&mut self, sub_mode: u8) {
        self.state.set_sub_mode(sub_mode);
    }

    fn set_vendor_status_code(&mut self, code: u16) {
        self.state.vendor_status_code = code;
    }

    fn local_node_id(&self) -> NodeId {
        self.state.node_id
    }

    fn now(&self) -> Instant {
        self.state.clock.now()
    }

    fn stats(&self) -> TransportStats {
        self.state.stats
    }

    fn publish(
        &mut self,
        signature: u64,
        type_id: u16,
        transfer_id: &mut TransferId,
        priority: Priority,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        Publish::publish(self, signature, type_id, transfer_id, priority, payload)
    }

    fn respond(
        &mut self,
        transfer: &RxTransfer,
        signature: u64,
        type_id: u16,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        Node::respond(self, transfer, signature, type_id, payload)
    }
}
