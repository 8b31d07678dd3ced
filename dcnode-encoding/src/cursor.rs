use bitvec::prelude::*;
use core::cmp::min;

/// Bit-level writer over a byte buffer
///
/// Scalars follow the DroneCAN v0 layout: value bytes are laid out little-endian, the
/// last partial byte keeps its most significant bits, and the resulting bit stream is
/// placed MSB-first. Byte-aligned fields therefore look like plain little-endian values.
///
/// Writes beyond the buffer end are dropped, the offset still advances so
/// [`WriteCursor::byte_length`] reports the length the value would need.
pub struct WriteCursor<'b> {
    bits: &'b mut BitSlice<u8, Msb0>,
    offset: usize,
}

impl<'b> WriteCursor<'b> {
    pub fn new(bytes: &'b mut [u8]) -> Self {
        Self {
            bits: bytes.view_bits_mut::<Msb0>(),
            offset: 0,
        }
    }

    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes touched so far, including the last partial one
    pub fn byte_length(&self) -> usize {
        self.offset.div_ceil(8)
    }

    pub fn is_overflown(&self) -> bool {
        self.offset > self.bits.len()
    }

    pub fn write_uint(&mut self, value: u64, bit_length: usize) {
        debug_assert!(bit_length <= 64);
        let mut storage = value.to_le_bytes();
        let residue = bit_length % 8;
        if residue != 0 {
            storage[bit_length / 8] <<= 8 - residue;
        }
        self.put(&storage.view_bits::<Msb0>()[..bit_length]);
    }

    pub fn write_int(&mut self, value: i64, bit_length: usize) {
        self.write_uint(value as u64, bit_length);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_uint(value.into(), 1);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_uint(value.into(), 8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_uint(value.into(), 16);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_uint(value.into(), 32);
    }

    pub fn write_u48(&mut self, value: u64) {
        self.write_uint(value, 48);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_uint(value, 64);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_int(value, 64);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes.view_bits::<Msb0>());
    }

    /// Writes a void field
    pub fn write_zeros(&mut self, bit_length: usize) {
        let start = min(self.offset, self.bits.len());
        let end = min(self.offset + bit_length, self.bits.len());
        self.bits[start..end].fill(false);
        self.offset += bit_length;
    }

    fn put(&mut self, src: &BitSlice<u8, Msb0>) {
        let start = min(self.offset, self.bits.len());
        let end = min(self.offset + src.len(), self.bits.len());
        self.bits[start..end].copy_from_bitslice(&src[..end - start]);
        self.offset += src.len();
    }
}

/// Bit-level reader over a received payload
///
/// Reads beyond the payload end yield zero bits, which matches the truncation rules
/// for variable-length tails.
pub struct ReadCursor<'b> {
    bits: &'b BitSlice<u8, Msb0>,
    offset: usize,
}

impl<'b> ReadCursor<'b> {
    pub fn new(bytes: &'b [u8]) -> Self {
        Self {
            bits: bytes.view_bits::<Msb0>(),
            offset: 0,
        }
    }

    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    pub fn remaining_bits(&self) -> usize {
        self.bits.len().saturating_sub(self.offset)
    }

    /// Number of whole bytes left
    pub fn remaining_bytes(&self) -> usize {
        self.remaining_bits() / 8
    }

    pub fn read_uint(&mut self, bit_length: usize) -> u64 {
        debug_assert!(bit_length <= 64);
        let mut storage = [0u8; 8];
        self.take(&mut storage.view_bits_mut::<Msb0>()[..bit_length]);
        let residue = bit_length % 8;
        if residue != 0 {
            storage[bit_length / 8] >>= 8 - residue;
        }
        u64::from_le_bytes(storage)
    }

    pub fn read_int(&mut self, bit_length: usize) -> i64 {
        let value = self.read_uint(bit_length);
        if bit_length == 0 || bit_length >= 64 {
            return value as i64;
        }
        let shift = 64 - bit_length;
        ((value << shift) as i64) >> shift
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_uint(1) != 0
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read_uint(8) as u8
    }

    pub fn read_u16(&mut self) -> u16 {
        self.read_uint(16) as u16
    }

    pub fn read_u32(&mut self) -> u32 {
        self.read_uint(32) as u32
    }

    pub fn read_u48(&mut self) -> u64 {
        self.read_uint(48)
    }

    pub fn read_u64(&mut self) -> u64 {
        self.read_uint(64)
    }

    pub fn read_i64(&mut self) -> i64 {
        self.read_int(64)
    }

    pub fn read_bytes(&mut self, bytes: &mut [u8]) {
        self.take(bytes.view_bits_mut::<Msb0>());
    }

    pub fn skip(&mut self, bit_length: usize) {
        self.offset += bit_length;
    }

    fn take(&mut self, dst: &mut BitSlice<u8, Msb0>) {
        let start = min(self.offset, self.bits.len());
        let end = min(self.offset + dst.len(), self.bits.len());
        let available = end - start;
        dst[..available].copy_from_bitslice(&self.bits[start..end]);
        dst[available..].fill(false);
        self.offset += dst.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_scalars_are_little_endian() {
        let mut buffer = [0u8; 8];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_u16(0x1234);
        cursor.write_u48(0x0605_0403_0201);
        assert_eq!(cursor.byte_length(), 8);
        assert_eq!(buffer, [0x34, 0x12, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_sub_byte_fields_fill_msb_first() {
        let mut buffer = [0u8; 1];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_uint(2, 2);
        cursor.write_uint(3, 3);
        cursor.write_uint(5, 3);
        assert_eq!(buffer, [0b10_011_101]);

        let mut cursor = ReadCursor::new(&buffer);
        assert_eq!(cursor.read_uint(2), 2);
        assert_eq!(cursor.read_uint(3), 3);
        assert_eq!(cursor.read_uint(3), 5);
        assert_eq!(cursor.remaining_bits(), 0);
    }

    #[test]
    fn test_13_bit_field() {
        // 13-bit index followed by a 3-bit tag
        let buffer = [0x05, 0x01];
        let mut cursor = ReadCursor::new(&buffer);
        assert_eq!(cursor.read_uint(13), 5);
        assert_eq!(cursor.read_uint(3), 1);

        let mut out = [0u8; 2];
        let mut cursor = WriteCursor::new(&mut out);
        cursor.write_uint(5, 13);
        cursor.write_uint(1, 3);
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_unaligned_i64() {
        let mut buffer = [0u8; 9];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_uint(0, 5);
        cursor.write_i64(-2);
        cursor.write_uint(0, 3);

        let mut cursor = ReadCursor::new(&buffer);
        cursor.skip(5);
        assert_eq!(cursor.read_i64(), -2);
    }

    #[test]
    fn test_signed_sign_extension() {
        let mut buffer = [0u8; 6];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_int(-3, 48);
        assert_eq!(ReadCursor::new(&buffer).read_int(48), -3);
        assert_eq!(ReadCursor::new(&buffer).read_u48(), (1 << 48) - 3);
    }

    #[test]
    fn test_read_past_end_yields_zeros() {
        let buffer = [0xff];
        let mut cursor = ReadCursor::new(&buffer);
        assert_eq!(cursor.read_u16(), 0xff);
        assert_eq!(cursor.read_u8(), 0);
        assert_eq!(cursor.remaining_bytes(), 0);
    }

    #[test]
    fn test_write_past_end_is_dropped() {
        let mut buffer = [0u8; 2];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_u32(0xaabb_ccdd);
        assert!(cursor.is_overflown());
        assert_eq!(cursor.byte_length(), 4);
        assert_eq!(buffer, [0xdd, 0xcc]);
    }

    #[test]
    fn test_zeros_clear_stale_bits() {
        let mut buffer = [0xffu8; 2];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_zeros(5);
        cursor.write_uint(4, 3);
        assert_eq!(buffer[0], 0x04);
        assert_eq!(buffer[1], 0xff);
    }
}
