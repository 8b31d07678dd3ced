use core::cmp::min;

use crate::core::TransferId;
use crate::format::{SOT_TOGGLE_BIT, TailByte, TransferCrc};
use crate::frame::{Data, MTU};

/// Splits a payload into frame data vectors
///
/// A multi-frame transfer is sent as the stream `crc[0], crc[1], payload..` cut into
/// chunks of `MTU - 1` bytes, each followed by a tail byte.
pub struct Scatter<'a> {
    payload: &'a [u8],
    crc: Option<TransferCrc>,
    transfer_id: TransferId,
    toggle_bit: bool,
    offset: usize,
    exhausted: bool,
}

impl<'a> Scatter<'a> {
    const CAPACITY: usize = MTU - 1;

    pub fn new(transfer_id: TransferId, signature: u64, payload: &'a [u8]) -> Self {
        let crc = (payload.len() > Self::CAPACITY).then(|| {
            let mut crc = TransferCrc::new(signature);
            crc.add_bytes(payload);
            crc
        });
        Self {
            payload,
            crc,
            transfer_id,
            toggle_bit: SOT_TOGGLE_BIT,
            offset: 0,
            exhausted: false,
        }
    }

    fn stream_length(&self) -> usize {
        match self.crc {
            Some(_) => self.payload.len() + TransferCrc::LENGTH,
            None => self.payload.len(),
        }
    }

    fn stream_byte(&self, index: usize) -> u8 {
        match self.crc {
            Some(crc) if index < TransferCrc::LENGTH => crc.get().to_le_bytes()[index],
            Some(_) => self.payload[index - TransferCrc::LENGTH],
            None => self.payload[index],
        }
    }
}

impl Iterator for Scatter<'_> {
    type Item = Data;

    fn next(&mut self) -> Option<Data> {
        if self.exhausted {
            return None;
        }

        let sot = self.offset == 0;
        let length = min(Self::CAPACITY, self.stream_length() - self.offset);
        let mut data = unwrap!(Data::new_zeros(length + 1));
        for (index, byte) in data[..length].iter_mut().enumerate() {
            *byte = self.stream_byte(self.offset + index);
        }
        self.offset += length;

        let eot = self.offset == self.stream_length();
        data[length] = TailByte::new(sot, eot, self.toggle_bit, self.transfer_id).into();
        self.toggle_bit = !self.toggle_bit;
        self.exhausted = eot;
        Some(data)
    }
}
