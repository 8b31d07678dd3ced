use crate::core::TransferId;

/// CRC-16-CCITT of a multi-frame transfer
///
/// DroneCAN v0 seeds the CRC with the data type signature before the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCrc(u16);

impl Default for TransferCrc {
    fn default() -> Self {
        Self(Self::INIT_VALUE)
    }
}

impl TransferCrc {
    pub const LENGTH: usize = 2;
    const INIT_VALUE: u16 = 0xffff;
    const POLYNOMIAL: u16 = 0x1021;

    /// Initial CRC state of a transfer of the given data type
    pub fn new(signature: u64) -> Self {
        let mut crc = Self::default();
        crc.add_bytes(&signature.to_le_bytes());
        crc
    }

    pub fn add(&mut self, byte: u8) {
        self.0 ^= u16::from(byte) << 8;
        for _bit in 0..8 {
            if (self.0 & 0x8000) != 0 {
                self.0 = (self.0 << 1) ^ Self::POLYNOMIAL;
            } else {
                self.0 <<= 1;
            }
        }
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for TransferCrc {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Last byte of every frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailByte(u8);

impl TailByte {
    const START_OF_TRANSFER: u8 = 7;
    const END_OF_TRANSFER: u8 = 6;
    const TOGGLE_BIT: u8 = 5;
    const TRANSFER_ID: u8 = 0;

    pub fn new(sot: bool, eot: bool, toggle: bool, transfer_id: TransferId) -> Self {
        Self(
            (sot as u8) << Self::START_OF_TRANSFER
                | (eot as u8) << Self::END_OF_TRANSFER
                | (toggle as u8) << Self::TOGGLE_BIT
                | u8::from(transfer_id) << Self::TRANSFER_ID,
        )
    }

    pub fn sot(&self) -> bool {
        (self.0 >> Self::START_OF_TRANSFER) & 0x1 != 0
    }

    pub fn eot(&self) -> bool {
        (self.0 >> Self::END_OF_TRANSFER) & 0x1 != 0
    }

    pub fn toggle(&self) -> bool {
        (self.0 >> Self::TOGGLE_BIT) & 0x1 != 0
    }

    pub fn transfer_id(&self) -> TransferId {
        TransferId::from_u8_truncating(self.0 >> Self::TRANSFER_ID)
    }
}

impl From<TailByte> for u8 {
    fn from(value: TailByte) -> Self {
        value.0
    }
}

impl From<u8> for TailByte {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// Toggle bit value for start-of-transfer frame
pub const SOT_TOGGLE_BIT: bool = false;

/// Number of frames needed to carry a payload of the given length
pub fn frame_count(payload_length: usize) -> usize {
    let capacity = crate::frame::MTU - 1;
    if payload_length <= capacity {
        1
    } else {
        (payload_length + TransferCrc::LENGTH).div_ceil(capacity)
    }
}
