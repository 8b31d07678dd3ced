use crate::core::{Priority, TransferId};
use crate::format::{SOT_TOGGLE_BIT, TailByte, TransferCrc};
use crate::time::{Duration, Instant};
use crate::transfer::{Payload, RxError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: TransferId,
    pub priority: Priority,
    /// Reception time of the start frame
    pub timestamp: Instant,
    pub payload: Payload,
}

/// Transfer reception state machine of a single session
///
/// A session is a stream of transfers of one data type and kind from one source.
///
/// Rules:
/// 1.  A frame without data is rejected as short.
///
/// 2.  The session restarts when it has never seen a start frame, when the transfer
///     timeout has elapsed since the last start frame, or when a start frame arrives
///     while a transfer is in progress or carries an unexpected transfer ID.
///     A restart adopts the frame's transfer ID. A restart caused by a continuation
///     frame rejects the frame as a missed start.
///
/// 3.  A frame with an unexpected transfer ID is rejected, then a frame with an
///     unexpected toggle bit is rejected. Neither changes the session state.
///
/// 4.  A continuation frame outside of a transfer is rejected as a missed start.
///
/// 5.  A start & end frame produces a transfer immediately. Its payload carries no CRC.
///
/// 6.  A start frame of a multi-frame transfer must carry the 2-byte CRC and at least one
///     payload byte. The CRC computation is seeded with the data type signature.
///
/// 7.  An end frame finishes the transfer. The transfer is produced if the CRC matches,
///     rejected otherwise. Either way the session expects the next transfer ID.
///
/// 8.  A transfer exceeding the payload capacity is dropped.
///
/// 9.  Transfer priority is determined by the end frame.
#[derive(Debug)]
pub struct Gather {
    sot_timestamp: Option<Instant>,
    last_timestamp: Instant,
    transfer_id: TransferId,
    toggle_bit: bool,
    in_progress: bool,
    crc: TransferCrc,
    expected_crc: u16,
    payload: Payload,
}

impl Gather {
    pub fn new(timestamp: Instant) -> Self {
        Self {
            sot_timestamp: None,
            last_timestamp: timestamp,
            transfer_id: TransferId::default(),
            toggle_bit: SOT_TOGGLE_BIT,
            in_progress: false,
            crc: TransferCrc::default(),
            expected_crc: 0,
            payload: Payload::new(),
        }
    }

    /// Reception time of the latest frame
    pub fn last_timestamp(&self) -> Instant {
        self.last_timestamp
    }

    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.sot_timestamp
            .is_none_or(|sot| now.saturating_duration_since(sot) > timeout)
    }

    pub fn push_frame(
        &mut self,
        timeout: Duration,
        signature: u64,
        priority: Priority,
        data: &[u8],
        timestamp: Instant,
    ) -> Result<Option<Transfer>, RxError> {
        // R1
        let (tail_byte, segment) = data.split_last().ok_or(RxError::ShortFrame)?;
        let tail = TailByte::from(*tail_byte);

        // R2
        let restart = self.is_timed_out(timestamp, timeout)
            || (tail.sot() && (self.in_progress || tail.transfer_id() != self.transfer_id));
        self.last_timestamp = timestamp;
        if restart {
            self.reset(tail.transfer_id());
            if !tail.sot() {
                self.transfer_id = self.transfer_id.next();
                return Err(RxError::MissedStart);
            }
        }

        // R3
        if tail.transfer_id() != self.transfer_id {
            return Err(RxError::UnexpectedTransferId);
        }
        if tail.toggle() != self.toggle_bit {
            return Err(RxError::WrongToggle);
        }

        // R4
        if !tail.sot() && !self.in_progress {
            return Err(RxError::MissedStart);
        }

        match (tail.sot(), tail.eot()) {
            // R5
            (true, true) => {
                self.sot_timestamp = Some(timestamp);
                let transfer = Transfer {
                    id: self.transfer_id,
                    priority,
                    timestamp,
                    payload: unwrap!(Payload::from_slice(segment)),
                };
                self.reset(self.transfer_id.next());
                Ok(Some(transfer))
            }
            // R6
            (true, false) => {
                if segment.len() <= TransferCrc::LENGTH {
                    return Err(RxError::ShortFrame);
                }
                let (crc, segment) = segment.split_at(TransferCrc::LENGTH);
                self.sot_timestamp = Some(timestamp);
                self.expected_crc = u16::from_le_bytes([crc[0], crc[1]]);
                self.crc = TransferCrc::new(signature);
                self.in_progress = true;
                self.append(segment)?;
                self.toggle_bit = !self.toggle_bit;
                Ok(None)
            }
            (false, false) => {
                self.append(segment)?;
                self.toggle_bit = !self.toggle_bit;
                Ok(None)
            }
            // R7
            (false, true) => {
                self.append(segment)?;
                let valid = self.crc.get() == self.expected_crc;
                let transfer = Transfer {
                    id: self.transfer_id,
                    // R9
                    priority,
                    timestamp: unwrap!(self.sot_timestamp),
                    payload: core::mem::take(&mut self.payload),
                };
                self.reset(self.transfer_id.next());
                if valid {
                    Ok(Some(transfer))
                } else {
                    Err(RxError::BadCrc)
                }
            }
        }
    }

    // R8
    fn append(&mut self, segment: &[u8]) -> Result<(), RxError> {
        if self.payload.extend_from_slice(segment).is_err() {
            self.reset(self.transfer_id.next());
            return Err(RxError::PayloadOverflow);
        }
        self.crc.add_bytes(segment);
        Ok(())
    }

    fn reset(&mut self, transfer_id: TransferId) {
        self.transfer_id = transfer_id;
        self.toggle_bit = SOT_TOGGLE_BIT;
        self.in_progress = false;
        self.payload.clear();
    }
}
