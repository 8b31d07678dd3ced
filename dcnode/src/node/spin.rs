use dcnode_encoding::{self as enc, DataType as _};

use crate::core::Priority;
use crate::data_types::node_status::NodeStatus;
use crate::driver::{CanDriver, TxStatus};
use crate::node::registry::Callback;
use crate::node::{Control, Node};
use crate::params::ParamStorage;
use crate::platform::Platform;
use crate::time::{Duration, Instant};
use crate::transfer::{RxTransfer, TransferEngine};

/// Transmission attempts per spin
pub const MAX_TX_ATTEMPTS: usize = 20;
/// Received frames processed per spin
pub const MAX_RX_FRAMES: usize = 10;

const STATUS_PERIOD: Duration = Duration::from_millis(NodeStatus::BROADCASTING_PERIOD_MS);

impl<D, E, P, S, const SUBS: usize> Node<D, E, P, S, SUBS>
where
    D: CanDriver,
    E: TransferEngine,
    P: Platform,
    S: ParamStorage,
{
    /// Runs one cycle using the platform clock
    pub fn spin_once(&mut self) {
        let now_ms = self.platform.time_ms();
        self.spin_once_at(now_ms);
    }

    /// Runs one cycle at the given raw millisecond time
    ///
    /// Pushes queued frames to the driver, processes received frames and broadcasts
    /// `NodeStatus` when due, in this order. Never blocks.
    pub fn spin_once_at(&mut self, now_ms: u32) {
        let now = self.state.clock.update(now_ms);
        self.drain_tx();
        self.drain_rx(now);
        self.maybe_publish_status(now);
    }

    fn drain_tx(&mut self) {
        let iface = self.iface;
        for _ in 0..MAX_TX_ATTEMPTS {
            let Some(frame) = self.engine.peek_tx() else {
                return;
            };
            match self.driver.transmit(iface, frame) {
                Ok(TxStatus::Accepted) => {
                    self.engine.pop_tx();
                    let stats = &mut self.state.stats;
                    stats.transfers_tx += 1;
                    stats.can_iface_stats[iface.index()].frames_tx += 1;
                }
                Ok(TxStatus::Busy) => return,
                Err(_err) => {
                    warn!("CAN transmit failed on iface {}", iface.index());
                    self.count_iface_error();
                    return;
                }
            }
        }
        if self.engine.peek_tx().is_some() {
            debug!("transmit attempt limit reached");
            self.count_iface_error();
        }
    }

    fn drain_rx(&mut self, now: Instant) {
        let iface = self.iface;
        for _ in 0..MAX_RX_FRAMES {
            let frame = match self.driver.receive(iface) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_err) => {
                    warn!("CAN receive failed on iface {}", iface.index());
                    self.count_iface_error();
                    break;
                }
            };
            self.state.stats.can_iface_stats[iface.index()].frames_rx += 1;

            match self.engine.handle_rx_frame(&frame, now, &self.registry) {
                Ok(Some(transfer)) => self.dispatch(transfer),
                Ok(None) => {}
                Err(err) => {
                    trace!("rx frame dropped: {:?}", err);
                    self.state.stats.transfer_errors += 1;
                }
            }
        }

        let overflow = self.driver.rx_overflow_count();
        if overflow > self.state.rx_overflow_count {
            warn!(
                "{} frames lost to rx overflow",
                overflow - self.state.rx_overflow_count
            );
            self.state.rx_overflow_count = overflow;
        }
    }

    /// Invokes every subscription matching the transfer, in registration order
    fn dispatch(&mut self, mut transfer: RxTransfer) {
        self.state.stats.transfers_rx += 1;
        for index in 0..self.registry.len() {
            let Some(entry) = self.registry.get(index) else {
                break;
            };
            if !entry.matches(transfer.type_id, transfer.kind) {
                continue;
            }
            transfer.subscription = index;
            match entry.callback {
                Callback::Builtin(service) => self.serve(service, &transfer),
                Callback::User(handler) => handler(&mut Control::new(self), &transfer),
            }
        }
    }

    fn maybe_publish_status(&mut self, now: Instant) {
        if now.saturating_duration_since(self.state.last_status) < STATUS_PERIOD {
            return;
        }
        self.state.last_status = now;
        if self.state.duplicate.expire(now) {
            info!("duplicate node id condition cleared");
        }

        let status = self.state.status();
        let mut buffer = [0u8; NodeStatus::SIZE];
        let length = unwrap!(enc::serialize_into(&status, &mut buffer));
        let result = self.engine.broadcast(
            NodeStatus::SIGNATURE,
            NodeStatus::ID,
            &mut self.state.status_transfer_id,
            Priority::LOW,
            &buffer[..length],
        );
        if let Err(err) = result {
            debug!("NodeStatus not queued: {:?}", err);
            self.state.stats.transfer_errors += 1;
        }
    }

    fn count_iface_error(&mut self) {
        self.state.stats.transfer_errors += 1;
        self.state.stats.can_iface_stats[self.iface.index()].errors += 1;
    }
}
