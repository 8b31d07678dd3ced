use heapless::String;

use crate::core::{NodeId, TransferId};
use crate::data_types::get_node_info::{HardwareVersion, NodeName, SoftwareVersion};
use crate::data_types::node_status::{Health, Mode, NodeStatus};
use crate::data_types::transport_stats::TransportStats;
use crate::time::{Duration, Instant};

/// How long a duplicate node ID condition holds after the last offending `NodeStatus`
pub const DUPLICATE_ID_WINDOW: Duration = Duration::from_secs(2);

/// Monotonic node clock on top of a wrapping millisecond counter
///
/// Starts at zero. A counter going backwards does not advance the clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clock {
    last_raw: u32,
    elapsed_ms: u64,
}

impl Clock {
    pub fn new(raw: u32) -> Self {
        Self {
            last_raw: raw,
            elapsed_ms: 0,
        }
    }

    pub fn update(&mut self, raw: u32) -> Instant {
        let delta = raw.wrapping_sub(self.last_raw);
        if delta <= u32::MAX / 2 {
            self.elapsed_ms += u64::from(delta);
        }
        self.last_raw = raw;
        self.now()
    }

    pub fn now(&self) -> Instant {
        Instant::from_millis(self.elapsed_ms)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DuplicateId {
    detected: bool,
    deadline: Option<Instant>,
}

impl DuplicateId {
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Returns `true` on a new detection
    pub fn observe(&mut self, timestamp: Instant) -> bool {
        let new = !self.detected;
        self.detected = true;
        self.deadline = Some(
            timestamp
                .checked_add(DUPLICATE_ID_WINDOW)
                .unwrap_or(Instant::MAX),
        );
        new
    }

    /// Returns `true` if the condition has just expired
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if self.detected && deadline < now => {
                self.detected = false;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub(crate) struct NodeState {
    pub node_id: NodeId,
    /// Health requested by the application
    pub health: Health,
    pub mode: Mode,
    pub sub_mode: u8,
    pub vendor_status_code: u16,
    pub name: NodeName,
    pub software_version: SoftwareVersion,
    pub hardware_version: HardwareVersion,
    pub stats: TransportStats,
    pub duplicate: DuplicateId,
    pub clock: Clock,
    pub last_status: Instant,
    pub status_transfer_id: TransferId,
    pub rx_overflow_count: u64,
}

impl NodeState {
    pub fn new(node_id: NodeId, now_raw: u32) -> Self {
        Self {
            node_id,
            health: Health::Ok,
            mode: Mode::Operational,
            sub_mode: 0,
            vendor_status_code: 0,
            name: String::new(),
            software_version: SoftwareVersion::default(),
            hardware_version: HardwareVersion::default(),
            stats: TransportStats::default(),
            duplicate: DuplicateId::default(),
            clock: Clock::new(now_raw),
            last_status: Instant::from_millis(0),
            status_transfer_id: TransferId::default(),
            rx_overflow_count: 0,
        }
    }

    /// Requested health, escalated to a warning while a duplicate node ID is seen
    pub fn effective_health(&self) -> Health {
        if self.duplicate.is_detected() {
            self.health.max(Health::Warning)
        } else {
            self.health
        }
    }

    /// Critical health is latched
    pub fn set_health(&mut self, health: Health) {
        if self.health == Health::Critical {
            if health != Health::Critical {
                debug!("health is latched at critical");
            }
            return;
        }
        self.health = health;
    }

    pub fn set_sub_mode(&mut self, sub_mode: u8) {
        self.sub_mode = sub_mode.min(NodeStatus::MAX_SUB_MODE);
    }

    /// Stores the name truncated to the longest prefix that fits
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(self.name.capacity());
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name.clear();
        unwrap!(self.name.push_str(&name[..end]));
    }

    pub fn status(&self) -> NodeStatus {
        let uptime_sec = self.clock.now().as_secs();
        NodeStatus {
            uptime_sec: u32::try_from(uptime_sec).unwrap_or(u32::MAX),
            health: self.effective_health(),
            mode: self.mode,
            sub_mode: self.sub_mode,
            vendor_specific_status_code: self.vendor_status_code,
        }
    }
}
