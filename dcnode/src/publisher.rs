//! Typed message publication

use dcnode_encoding::{BufferType, Message, Serialize};

use crate::core::{Priority, TransferId};
use crate::node::{Publish, PublishError};
use crate::time::{Duration, Instant};

/// Publishes messages of a single type
///
/// Owns the transfer ID counter of its message type. The last published value is kept
/// in `msg`.
///
/// # Examples:
///
/// ```
/// use dcnode::data_types::node_status::{Health, Mode, NodeStatus};
/// use dcnode::node::{Publish, PublishError};
/// use dcnode::publisher::Publisher;
///
/// fn announce(node: &mut impl Publish) -> Result<usize, PublishError> {
///     let mut publisher = Publisher::<NodeStatus>::new();
///     publisher.msg.health = Health::Warning;
///     publisher.msg.mode = Mode::Maintenance;
///     publisher.publish(node)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Publisher<T> {
    pub msg: T,
    transfer_id: TransferId,
    priority: Priority,
}

impl<T: Default> Publisher<T> {
    pub fn new() -> Self {
        Self::with_message(T::default())
    }
}

impl<T: Default> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Publisher<T> {
    pub fn with_message(msg: T) -> Self {
        Self {
            msg,
            transfer_id: TransferId::default(),
            priority: Priority::MEDIUM,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Transfer ID of the next publication
    pub fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }
}

impl<T: Message + Serialize + BufferType> Publisher<T> {
    /// Publishes `msg` and returns the number of queued frames
    pub fn publish(&mut self, node: &mut impl Publish) -> Result<usize, PublishError> {
        node.publish_message(&self.msg, &mut self.transfer_id, self.priority)
    }

    pub fn publish_value(&mut self, msg: T, node: &mut impl Publish) -> Result<usize, PublishError> {
        self.msg = msg;
        self.publish(node)
    }
}

/// Publisher bound to a fixed rate
///
/// The rate is clamped to 0.001..=1000 Hz. The first publication is due
/// [`PeriodicPublisher::FIRST_DEADLINE`] after the node start.
#[derive(Debug, Clone)]
pub struct PeriodicPublisher<T> {
    pub publisher: Publisher<T>,
    period: Duration,
    next: Instant,
}

impl<T> PeriodicPublisher<T> {
    pub const MIN_FREQUENCY_HZ: f32 = 0.001;
    pub const MAX_FREQUENCY_HZ: f32 = 1000.0;
    pub const FIRST_DEADLINE: Duration = Duration::from_millis(500);

    pub fn new(msg: T, frequency_hz: f32) -> Self {
        Self {
            publisher: Publisher::with_message(msg),
            period: Self::period_from_frequency(frequency_hz),
            next: Instant::from_millis(0) + Self::FIRST_DEADLINE,
        }
    }

    fn period_from_frequency(frequency_hz: f32) -> Duration {
        let frequency_hz = frequency_hz.clamp(Self::MIN_FREQUENCY_HZ, Self::MAX_FREQUENCY_HZ);
        // rounded to the nearest millisecond
        Duration::from_millis((1000.0 / frequency_hz + 0.5) as u64)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.period = Self::period_from_frequency(frequency_hz);
    }

    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    pub fn msg_mut(&mut self) -> &mut T {
        &mut self.publisher.msg
    }
}

impl<T: Message + Serialize + BufferType> PeriodicPublisher<T> {
    /// Publishes if the deadline has been reached
    ///
    /// Returns `Ok(true)` if the message has been queued. A failed attempt still moves
    /// the deadline one period ahead.
    pub fn spin_once(&mut self, node: &mut impl Publish) -> Result<bool, PublishError> {
        let now = node.now();
        if now < self.next {
            return Ok(false);
        }
        self.next = now + self.period;
        self.publisher.publish(node)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::node_status::NodeStatus;
    use crate::transfer::TxError;

    #[derive(Default)]
    struct Recorder {
        now_ms: u64,
        sent: usize,
        last_transfer_id: Option<TransferId>,
        last_priority: Option<Priority>,
    }

    impl Publish for Recorder {
        fn now(&self) -> Instant {
            Instant::from_millis(self.now_ms)
        }

        fn publish(
            &mut self,
            _signature: u64,
            _type_id: u16,
            transfer_id: &mut TransferId,
            priority: Priority,
            _payload: &[u8],
        ) -> Result<usize, TxError> {
            self.sent += 1;
            self.last_transfer_id = Some(*transfer_id);
            self.last_priority = Some(priority);
            *transfer_id = transfer_id.next();
            Ok(1)
        }
    }

    #[test]
    fn test_publisher_advances_transfer_id_once() {
        let mut node = Recorder::default();
        let mut publisher = Publisher::<NodeStatus>::new();
        publisher.set_priority(Priority::LOW);
        assert_eq!(publisher.publish(&mut node), Ok(1));
        assert_eq!(publisher.publish(&mut node), Ok(1));
        assert_eq!(node.sent, 2);
        assert_eq!(node.last_transfer_id, Some(TransferId::default().next()));
        assert_eq!(node.last_priority, Some(Priority::LOW));
        assert_eq!(publisher.transfer_id(), TransferId::default().next().next());
    }

    #[test]
    fn test_frequency_is_clamped() {
        let fast = PeriodicPublisher::new(NodeStatus::default(), 5000.0);
        assert_eq!(fast.period(), Duration::from_millis(1));
        let slow = PeriodicPublisher::new(NodeStatus::default(), 0.0);
        assert_eq!(slow.period(), Duration::from_millis(1_000_000));
        let regular = PeriodicPublisher::new(NodeStatus::default(), 4.0);
        assert_eq!(regular.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_periodic_schedule() {
        let mut node = Recorder::default();
        let mut publisher = PeriodicPublisher::new(NodeStatus::default(), 10.0);

        let mut published = 0;
        for t in (0..=1000).step_by(10) {
            node.now_ms = t;
            if publisher.spin_once(&mut node).unwrap() {
                published += 1;
            }
        }
        // 500, 600, ..., 1000 ms
        assert_eq!(published, 6);
        assert_eq!(node.sent, 6);
        assert_eq!(publisher.next_deadline(), Instant::from_millis(1100));
    }
}
