//! Polling CAN driver contract

use crate::frame::Frame;

/// Index of a CAN interface
///
/// The stack drives a single interface, usually [`Iface::FIRST`]. The node keeps
/// statistics for up to [`Iface::COUNT`] interfaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Iface(u8);

impl Iface {
    pub const COUNT: usize = 3;
    pub const FIRST: Iface = Iface(0);

    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Iface {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Outcome of a non-failing transmission attempt
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// The frame has been placed into a hardware mailbox
    Accepted,
    /// No room in hardware, retry later
    Busy,
}

/// Non-blocking CAN peripheral access
///
/// All methods are expected to return immediately. The node calls them from its spin
/// context only; interrupt-level synchronization is up to the implementation.
pub trait CanDriver {
    type Error: core::fmt::Debug;

    fn init(&mut self, bitrate: u32, iface: Iface) -> Result<(), Self::Error>;

    /// Pops one received frame, `Ok(None)` means no frame is pending
    fn receive(&mut self, iface: Iface) -> Result<Option<Frame>, Self::Error>;

    fn transmit(&mut self, iface: Iface, frame: &Frame) -> Result<TxStatus, Self::Error>;

    /// Cumulative number of hardware-level errors
    fn error_count(&self) -> u64;

    /// Cumulative number of frames lost to receive FIFO overflow
    fn rx_overflow_count(&self) -> u64 {
        0
    }
}

impl<T: CanDriver + ?Sized> CanDriver for &mut T {
    type Error = T::Error;

    fn init(&mut self, bitrate: u32, iface: Iface) -> Result<(), Self::Error> {
        T::init(self, bitrate, iface)
    }

    fn receive(&mut self, iface: Iface) -> Result<Option<Frame>, Self::Error> {
        T::receive(self, iface)
    }

    fn transmit(&mut self, iface: Iface, frame: &Frame) -> Result<TxStatus, Self::Error> {
        T::transmit(self, iface, frame)
    }

    fn error_count(&self) -> u64 {
        T::error_count(self)
    }

    fn rx_overflow_count(&self) -> u64 {
        T::rx_overflow_count(self)
    }
}
