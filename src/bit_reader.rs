//! Little-endian bit reader for IVI bitstreams.
//!
//! Bits are consumed starting from the least significant bit of each byte.
//! Reads past the end of the buffer yield zero bits and set an overrun flag
//! instead of failing, so trailing padding never aborts a decode.

pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    overrun: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_pos: 0,
            overrun: false,
        }
    }

    /// Returns the next `count` bits (at most 32) without advancing.
    pub fn peek_bits(&self, count: u32) -> u32 {
        debug_assert!(count <= 32);
        if count == 0 {
            return 0;
        }
        let byte = self.bit_pos >> 3;
        let shift = (self.bit_pos & 7) as u32;
        let mut cache = 0u64;
        for i in 0..5 {
            if let Some(&b) = self.data.get(byte + i) {
                cache |= (b as u64) << (8 * i);
            }
        }
        ((cache >> shift) & ((1u64 << count) - 1)) as u32
    }

    pub fn get_bits(&mut self, count: u32) -> u32 {
        let value = self.peek_bits(count);
        self.skip(count as usize);
        value
    }

    pub fn get_bit(&mut self) -> bool {
        self.get_bits(1) != 0
    }

    pub fn skip(&mut self, count: usize) {
        self.bit_pos += count;
        if self.bit_pos > self.data.len() * 8 {
            self.overrun = true;
        }
    }

    /// Discards the remaining bits of the current byte.
    pub fn align(&mut self) {
        self.bit_pos = (self.bit_pos + 7) & !7;
    }

    /// Current position in bits from the start of the buffer.
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    pub fn bits_left(&self) -> isize {
        (self.data.len() * 8) as isize - self.bit_pos as isize
    }

    /// True once any read or skip went past the end of the data.
    pub fn overrun(&self) -> bool {
        self.overrun
    }
}
