//! Adapter for `embedded-can` non-blocking peripherals

use embedded_can::{Frame as _, Id};

use crate::driver::{CanDriver, Iface, TxStatus};
use crate::frame::Frame;

/// Wraps an [`embedded_can::nb::Can`] implementation into a [`CanDriver`]
///
/// The peripheral must be configured (bit timing, filters) by the HAL before use,
/// so `init` only records the interface. Standard-ID and remote frames are dropped
/// on reception.
///
/// A frame the peripheral pushes out of its mailbox to make room for a higher priority one
/// is kept and sent again before any new frame is accepted.
pub struct EmbeddedCan<C> {
    can: C,
    errors: u64,
    displaced: u64,
    pending: Option<Frame>,
}

impl<C> EmbeddedCan<C> {
    /// Bounds the number of incompatible frames skipped by a single `receive` call
    const MAX_SKIPPED_FRAMES: usize = 8;

    pub fn new(can: C) -> Self {
        Self {
            can,
            errors: 0,
            displaced: 0,
            pending: None,
        }
    }

    pub fn inner(&mut self) -> &mut C {
        &mut self.can
    }

    pub fn into_inner(self) -> C {
        self.can
    }

    /// Number of queued frames replaced by higher priority ones inside the peripheral
    pub fn displaced_count(&self) -> u64 {
        self.displaced
    }

    /// Whether a displaced frame still waits for a mailbox
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<C: embedded_can::nb::Can> EmbeddedCan<C> {
    /// Queues `frame` in a mailbox, keeping whatever frame it displaces
    fn send(&mut self, frame: &Frame) -> nb::Result<(), C::Error> {
        let raw = unwrap!(C::Frame::new(Id::Extended(frame.id), &frame.data));
        if let Some(displaced) = self.can.transmit(&raw)? {
            self.displaced += 1;
            match displaced.id() {
                Id::Extended(id) => self.pending = Frame::new(id, displaced.data()).ok(),
                Id::Standard(_) => warn!("foreign CAN frame displaced"),
            }
        }
        Ok(())
    }
}

impl<C: embedded_can::nb::Can> CanDriver for EmbeddedCan<C> {
    type Error = C::Error;

    fn init(&mut self, bitrate: u32, iface: Iface) -> Result<(), Self::Error> {
        debug!("CAN iface {} attached at {} bit/s", iface.index(), bitrate);
        Ok(())
    }

    fn receive(&mut self, _iface: Iface) -> Result<Option<Frame>, Self::Error> {
        for _ in 0..Self::MAX_SKIPPED_FRAMES {
            let raw = match self.can.receive() {
                Ok(raw) => raw,
                Err(nb::Error::WouldBlock) => return Ok(None),
                Err(nb::Error::Other(err)) => {
                    self.errors += 1;
                    return Err(err);
                }
            };

            match (raw.id(), raw.is_data_frame()) {
                (Id::Extended(id), true) => {
                    // Data frames never exceed the classic MTU
                    if let Ok(frame) = Frame::new(id, raw.data()) {
                        return Ok(Some(frame));
                    }
                }
                _ => trace!("skip incompatible CAN frame"),
            }
        }
        Ok(None)
    }

    fn transmit(&mut self, _iface: Iface, frame: &Frame) -> Result<TxStatus, Self::Error> {
        if let Some(pending) = self.pending.take() {
            let result = self.send(&pending);
            if let Err(err) = result {
                self.pending = Some(pending);
                return match err {
                    nb::Error::WouldBlock => Ok(TxStatus::Busy),
                    nb::Error::Other(err) => {
                        self.errors += 1;
                        Err(err)
                    }
                };
            }
            if self.pending.is_some() {
                return Ok(TxStatus::Busy);
            }
        }

        match self.send(frame) {
            Ok(()) => Ok(TxStatus::Accepted),
            Err(nb::Error::WouldBlock) => Ok(TxStatus::Busy),
            Err(nb::Error::Other(err)) => {
                self.errors += 1;
                Err(err)
            }
        }
    }

    fn error_count(&self) -> u64 {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::{ErrorKind, ExtendedId, StandardId};

    #[derive(Debug, Clone, Copy)]
    struct MockFrame {
        id: Id,
        remote: bool,
        len: usize,
        data: [u8; 8],
    }

    impl embedded_can::Frame for MockFrame {
        fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
            if data.len() > 8 {
                return None;
            }
            let mut bytes = [0; 8];
            bytes[..data.len()].copy_from_slice(data);
            Some(Self {
                id: id.into(),
                remote: false,
                len: data.len(),
                data: bytes,
            })
        }

        fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
            Some(Self {
                id: id.into(),
                remote: true,
                len: dlc,
                data: [0; 8],
            })
        }

        fn is_extended(&self) -> bool {
            matches!(self.id, Id::Extended(_))
        }

        fn is_remote_frame(&self) -> bool {
            self.remote
        }

        fn id(&self) -> Id {
            self.id
        }

        fn dlc(&self) -> usize {
            self.len
        }

        fn data(&self) -> &[u8] {
            &self.data[..self.len]
        }
    }

    #[derive(Default)]
    struct MockCan {
        rx: [Option<nb::Result<MockFrame, ErrorKind>>; 4],
        rx_pos: usize,
        tx_room: usize,
        tx_fail: bool,
        sent: usize,
        // frame handed back by the next transmit, as if pushed out of a mailbox
        displace: Option<MockFrame>,
    }

    impl embedded_can::nb::Can for MockCan {
        type Frame = MockFrame;
        type Error = ErrorKind;

        fn transmit(&mut self, _frame: &MockFrame) -> nb::Result<Option<MockFrame>, ErrorKind> {
            if self.tx_fail {
                return Err(nb::Error::Other(ErrorKind::Bit));
            }
            if self.tx_room == 0 {
                return Err(nb::Error::WouldBlock);
            }
            self.tx_room -= 1;
            self.sent += 1;
            Ok(self.displace.take())
        }

        fn receive(&mut self) -> nb::Result<MockFrame, ErrorKind> {
            let item = self.rx.get_mut(self.rx_pos).and_then(Option::take);
            self.rx_pos += 1;
            item.unwrap_or(Err(nb::Error::WouldBlock))
        }
    }

    fn ext_frame(raw: u32, data: &[u8]) -> MockFrame {
        embedded_can::Frame::new(ExtendedId::new(raw).unwrap(), data).unwrap()
    }

    #[test]
    fn test_receive_skips_standard_frames() {
        let standard = embedded_can::Frame::new(StandardId::new(0x10).unwrap(), &[1]).unwrap();
        let mut can = MockCan::default();
        can.rx[0] = Some(Ok(standard));
        can.rx[1] = Some(Ok(ext_frame(0x1801_552a, &[1, 2, 3])));

        let mut driver = EmbeddedCan::new(can);
        let frame = driver.receive(Iface::FIRST).unwrap().unwrap();
        assert_eq!(frame.id.as_raw(), 0x1801_552a);
        assert_eq!(&*frame.data, &[1, 2, 3]);
        assert!(driver.receive(Iface::FIRST).unwrap().is_none());
    }

    #[test]
    fn test_receive_error_is_counted() {
        let mut can = MockCan::default();
        can.rx[0] = Some(Err(nb::Error::Other(ErrorKind::Overrun)));

        let mut driver = EmbeddedCan::new(can);
        assert_eq!(driver.receive(Iface::FIRST), Err(ErrorKind::Overrun));
        assert_eq!(driver.error_count(), 1);
    }

    #[test]
    fn test_transmit_busy_and_error() {
        let frame = Frame::new(ExtendedId::new(0x1801_552a).unwrap(), &[0; 7]).unwrap();
        let mut driver = EmbeddedCan::new(MockCan {
            tx_room: 1,
            ..Default::default()
        });
        assert_eq!(driver.transmit(Iface::FIRST, &frame), Ok(TxStatus::Accepted));
        assert_eq!(driver.transmit(Iface::FIRST, &frame), Ok(TxStatus::Busy));
        assert_eq!(driver.inner().sent, 1);

        driver.inner().tx_fail = true;
        assert_eq!(driver.transmit(Iface::FIRST, &frame), Err(ErrorKind::Bit));
        assert_eq!(driver.error_count(), 1);
    }

    #[test]
    fn test_displaced_frame_is_sent_first() {
        let first = Frame::new(ExtendedId::new(0x1801_552a).unwrap(), &[1]).unwrap();
        let second = Frame::new(ExtendedId::new(0x1001_552a).unwrap(), &[2]).unwrap();
        let mut driver = EmbeddedCan::new(MockCan {
            tx_room: 1,
            displace: Some(ext_frame(0x1801_552a, &[1])),
            ..Default::default()
        });

        assert_eq!(driver.transmit(Iface::FIRST, &first), Ok(TxStatus::Accepted));
        assert_eq!(driver.displaced_count(), 1);
        assert!(driver.has_pending());

        // no mailbox for the displaced frame: the new one must wait
        assert_eq!(driver.transmit(Iface::FIRST, &second), Ok(TxStatus::Busy));
        assert!(driver.has_pending());

        driver.inner().tx_room = 2;
        assert_eq!(driver.transmit(Iface::FIRST, &second), Ok(TxStatus::Accepted));
        assert!(!driver.has_pending());
        assert_eq!(driver.inner().sent, 3);
    }
}
