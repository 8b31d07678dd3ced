use dcnode_encoding::{BufferType, Response, Serialize};
use heapless::Vec;

use crate::data_types::get_node_info::GetNodeInfoResponse;
use crate::data_types::param::{
    ExecuteOpcodeRequest, ExecuteOpcodeResponse, GetSetRequest, GetSetResponse, MAX_NAME_LENGTH,
    NumericValue, ParamName, Value,
};
use crate::data_types::restart_node::RestartNodeResponse;
use crate::driver::CanDriver;
use crate::node::Node;
use crate::node::registry::Service;
use crate::params::{ParamKind, ParamStorage};
use crate::platform::Platform;
use crate::transfer::{RxTransfer, TransferEngine};

impl<D, E, P, S, const SUBS: usize> Node<D, E, P, S, SUBS>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    pub(super) fn serve(&mut self, service: Service, transfer: &RxTransfer) {
        match service {
            Service::GetNodeInfo => self.serve_get_node_info(transfer),
            Service::ParamGetSet => self.serve_param_get_set(transfer),
            Service::ParamExecuteOpcode => self.serve_param_execute_opcode(transfer),
            Service::RestartNode => self.serve_restart_node(transfer),
            Service::GetTransportStats => self.serve_get_transport_stats(transfer),
            Service::NodeStatusSnoop => self.snoop_node_status(transfer),
        }
    }

    fn serve_get_node_info(&mut self, transfer: &RxTransfer) {
        let response = GetNodeInfoResponse {
            status: self.state.status(),
            software_version: self.state.software_version,
            hardware_version: self.state.hardware_version,
            name: self.state.name.clone(),
        };
        self.send_response(transfer, &response);
    }

    fn serve_param_get_set(&mut self, transfer: &RxTransfer) {
        let response = match transfer.decode::<GetSetRequest>() {
            Ok(request) => self.get_set(&request),
            Err(_err) => {
                debug!("malformed GetSet request");
                GetSetResponse::empty()
            }
        };
        self.send_response(transfer, &response);
    }

    /// Applies the requested value if its kind matches the parameter and reports the
    /// current state of the parameter
    fn get_set(&mut self, request: &GetSetRequest) -> GetSetResponse {
        let index = if request.name.is_empty() {
            request.index
        } else {
            let found = core::str::from_utf8(&request.name)
                .ok()
                .and_then(|name| self.storage.find(name));
            match found {
                Some(index) => index,
                None => return GetSetResponse::empty(),
            }
        };

        match self.storage.kind(index) {
            ParamKind::Integer => {
                if let Value::Integer(value) = request.value {
                    let value = value.clamp(i32::MIN.into(), i32::MAX.into()) as i32;
                    match self.storage.set_integer(index, value) {
                        Ok(()) => info!("param {} set to {}", index, value),
                        Err(err) => warn!("param {} not set: {:?}", index, err),
                    }
                }
                let Some(param) = self.storage.integer(index) else {
                    return GetSetResponse::empty();
                };
                GetSetResponse {
                    value: Value::Integer(param.value.into()),
                    default_value: Value::Integer(param.default.into()),
                    max_value: NumericValue::Integer(param.max.into()),
                    min_value: NumericValue::Integer(param.min.into()),
                    name: self.param_name(index),
                }
            }
            ParamKind::String => {
                if let Value::String(bytes) = &request.value {
                    match self.storage.set_string(index, bytes) {
                        Ok(()) => info!("param {} set", index),
                        Err(err) => warn!("param {} not set: {:?}", index, err),
                    }
                }
                let Some(value) = self.storage.string(index) else {
                    return GetSetResponse::empty();
                };
                GetSetResponse {
                    value: Value::String(unwrap!(Vec::from_slice(&value))),
                    name: self.param_name(index),
                    ..GetSetResponse::empty()
                }
            }
            ParamKind::Unknown => GetSetResponse::empty(),
        }
    }

    fn param_name(&self, index: u16) -> ParamName {
        let name = self.storage.name(index).unwrap_or_default().as_bytes();
        let length = name.len().min(MAX_NAME_LENGTH);
        unwrap!(Vec::from_slice(&name[..length]))
    }

    fn serve_param_execute_opcode(&mut self, transfer: &RxTransfer) {
        let ok = match transfer.payload.first().copied() {
            Some(ExecuteOpcodeRequest::OPCODE_SAVE) => self.storage.save().is_ok(),
            Some(ExecuteOpcodeRequest::OPCODE_ERASE) => self.storage.reset_to_default().is_ok(),
            _ => false,
        };
        debug!("ExecuteOpcode {:?} ok: {}", transfer.payload.first(), ok);
        let response = ExecuteOpcodeResponse { argument: 0, ok };
        self.send_response(transfer, &response);
    }

    fn serve_restart_node(&mut self, transfer: &RxTransfer) {
        let ok = self.platform.request_restart();
        if ok {
            info!("restart requested");
        } else {
            info!("restart request refused");
        }
        self.send_response(transfer, &RestartNodeResponse { ok });
    }

    fn serve_get_transport_stats(&mut self, transfer: &RxTransfer) {
        let mut stats = self.state.stats;
        let iface_stats = &mut stats.can_iface_stats[self.iface.index()];
        iface_stats.errors = iface_stats.errors.saturating_add(self.driver.error_count());
        self.send_response(transfer, &stats);
    }

    fn snoop_node_status(&mut self, transfer: &RxTransfer) {
        if transfer.source != Some(self.state.node_id) {
            return;
        }
        if self.state.duplicate.observe(transfer.timestamp) {
            warn!(
                "another node uses node id {}",
                self.state.node_id.into_u8()
            );
        }
    }

    fn send_response<T: Response + Serialize + BufferType>(
        &mut self,
        transfer: &RxTransfer,
        response: &T,
    ) {
        if let Err(err) = self.respond_with(transfer, response) {
            debug!("response to type {} not queued: {:?}", transfer.type_id, err);
            self.state.stats.transfer_errors += 1;
        }
    }
}
