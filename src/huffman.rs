//! IVI Huffman codebooks.
//!
//! A codebook is described by a list of rows. Row `i` holds `2^xbits[i]`
//! codes made of `i` one-bits, a terminating zero (absent on the last row)
//! and `xbits[i]` payload bits. Codes are read least significant bit first,
//! so they are stored bit-reversed and looked up by the low bits of a
//! fixed-width peek.

use crate::bit_reader::BitReader;
use crate::error::Indeo5Error;
use once_cell::sync::Lazy;

/// Width of the decode lookup; no code may be longer.
pub const IVI_VLC_BITS: u32 = 13;

const MAX_CODES: usize = 256;

/// Row descriptor of a codebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HuffDesc {
    pub num_rows: usize,
    pub xbits: [u8; 16],
}

impl HuffDesc {
    pub const fn new(num_rows: usize, rows: &[u8]) -> Self {
        let mut xbits = [0u8; 16];
        let mut i = 0;
        while i < rows.len() {
            xbits[i] = rows[i];
            i += 1;
        }
        Self { num_rows, xbits }
    }

    fn rows(&self) -> &[u8] {
        &self.xbits[..self.num_rows.min(16)]
    }
}

/// Predefined macroblock-level codebooks.
pub const MB_HUFF_DESC: [HuffDesc; 8] = [
    HuffDesc::new(8, &[0, 4, 5, 4, 4, 4, 6, 6]),
    HuffDesc::new(12, &[0, 2, 2, 3, 3, 3, 3, 5, 3, 2, 2, 2]),
    HuffDesc::new(12, &[0, 2, 3, 4, 3, 3, 3, 3, 4, 3, 2, 2]),
    HuffDesc::new(12, &[0, 3, 4, 4, 3, 3, 3, 3, 3, 2, 2, 2]),
    HuffDesc::new(13, &[0, 4, 4, 3, 3, 3, 3, 2, 3, 3, 2, 1, 1]),
    HuffDesc::new(9, &[0, 4, 4, 4, 4, 3, 3, 3, 2]),
    HuffDesc::new(10, &[0, 4, 4, 4, 4, 3, 3, 2, 2, 2]),
    HuffDesc::new(12, &[0, 4, 4, 4, 3, 3, 2, 3, 2, 2, 2, 2]),
];

/// Predefined block-level codebooks.
pub const BLK_HUFF_DESC: [HuffDesc; 8] = [
    HuffDesc::new(10, &[1, 2, 3, 4, 4, 7, 5, 5, 4, 1]),
    HuffDesc::new(11, &[2, 3, 4, 4, 4, 7, 5, 4, 3, 3, 2]),
    HuffDesc::new(12, &[2, 4, 5, 5, 5, 5, 6, 4, 4, 3, 1, 1]),
    HuffDesc::new(13, &[3, 3, 4, 4, 5, 6, 6, 4, 4, 3, 2, 1, 1]),
    HuffDesc::new(11, &[3, 4, 4, 5, 5, 5, 6, 5, 4, 2, 2]),
    HuffDesc::new(13, &[3, 4, 5, 5, 5, 5, 6, 4, 3, 3, 2, 1, 1]),
    HuffDesc::new(13, &[3, 4, 5, 5, 5, 6, 5, 4, 3, 3, 2, 1, 1]),
    HuffDesc::new(9, &[3, 4, 4, 5, 5, 5, 6, 5, 5]),
];

fn build_predefined(descs: &[HuffDesc]) -> Vec<HuffmanTable> {
    descs
        .iter()
        .map(|d| HuffmanTable::build_truncated(d).expect("predefined codebook descriptor is valid"))
        .collect()
}

pub static MB_TABLES: Lazy<Vec<HuffmanTable>> = Lazy::new(|| build_predefined(&MB_HUFF_DESC));

pub static BLK_TABLES: Lazy<Vec<HuffmanTable>> = Lazy::new(|| build_predefined(&BLK_HUFF_DESC));

/// A code as it appears in the bitstream: `length` bits, first bit in bit 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

fn reverse_bits(value: u16, nbits: u32) -> u16 {
    if nbits == 0 {
        return 0;
    }
    value.reverse_bits() >> (16 - nbits)
}

#[derive(Clone)]
pub struct HuffmanTable {
    codes: Vec<HuffmanCode>,
    // (length << 8) | symbol, zero for prefixes that match no code
    lookup: Vec<u16>,
}

impl HuffmanTable {
    /// Builds a codebook from a stream-coded descriptor.
    ///
    /// Descriptors yielding more than 256 codes or a code longer than
    /// [`IVI_VLC_BITS`] are rejected.
    pub fn build(desc: &HuffDesc) -> Result<Self, Indeo5Error> {
        Self::generate(desc, false)
    }

    /// Builds a predefined codebook. Block codebook 7 declares 264 codes;
    /// only the first 256 are kept.
    fn build_truncated(desc: &HuffDesc) -> Result<Self, Indeo5Error> {
        Self::generate(desc, true)
    }

    fn generate(desc: &HuffDesc, truncate: bool) -> Result<Self, Indeo5Error> {
        let rows = desc.rows();
        let mut codes = Vec::with_capacity(MAX_CODES);

        for (i, &xbits) in rows.iter().enumerate() {
            let xbits = xbits as u32;
            let not_last_row = (i + 1 != rows.len()) as u32;
            let prefix = ((1u32 << i) - 1) << (xbits + not_last_row);

            for j in 0..(1u32 << xbits) {
                if codes.len() >= MAX_CODES {
                    if truncate {
                        break;
                    }
                    return Err(Indeo5Error::HuffmanTooManyCodes);
                }
                let length = i as u32 + xbits + not_last_row;
                if length > IVI_VLC_BITS {
                    return Err(Indeo5Error::HuffmanCodeTooLong);
                }
                codes.push(HuffmanCode {
                    value: reverse_bits((prefix | j) as u16, length),
                    length: length.max(1) as u8,
                });
            }
        }

        let mut lookup = vec![0u16; 1 << IVI_VLC_BITS];
        for (sym, code) in codes.iter().enumerate() {
            let step = 1usize << code.length;
            let entry = ((code.length as u16) << 8) | sym as u16;
            let mut idx = code.value as usize;
            while idx < lookup.len() {
                lookup[idx] = entry;
                idx += step;
            }
        }

        Ok(Self { codes, lookup })
    }

    /// Codes in symbol order.
    pub fn codes(&self) -> &[HuffmanCode] {
        &self.codes
    }

    pub fn decode(&self, br: &mut BitReader) -> Result<u32, Indeo5Error> {
        let entry = self.lookup[br.peek_bits(IVI_VLC_BITS) as usize];
        if entry == 0 {
            return Err(Indeo5Error::InvalidHuffmanCode);
        }
        br.skip((entry >> 8) as usize);
        Ok((entry & 0xFF) as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Macroblock,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Predefined(usize),
    Custom,
}

/// Per-band (or per-picture) codebook selection with a cached custom table.
#[derive(Clone)]
pub struct HuffmanSelector {
    kind: TableKind,
    selection: Selection,
    pub tab_sel: u32,
    cust_desc: HuffDesc,
    cust_tab: Option<HuffmanTable>,
}

impl HuffmanSelector {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            selection: Selection::Predefined(7),
            tab_sel: 7,
            cust_desc: HuffDesc::default(),
            cust_tab: None,
        }
    }

    /// Reads a codebook selector from the stream.
    ///
    /// Selector 7 carries an explicit descriptor; the custom table is only
    /// rebuilt when that descriptor differs from the previous one.
    pub fn decode_desc(&mut self, br: &mut BitReader, desc_coded: bool) -> Result<(), Indeo5Error> {
        if !desc_coded {
            self.selection = Selection::Predefined(7);
            return Ok(());
        }

        self.tab_sel = br.get_bits(3);
        if self.tab_sel != 7 {
            self.selection = Selection::Predefined(self.tab_sel as usize);
            return Ok(());
        }

        let num_rows = br.get_bits(4) as usize;
        if num_rows == 0 {
            return Err(Indeo5Error::EmptyHuffmanDescriptor);
        }
        let mut desc = HuffDesc {
            num_rows,
            xbits: [0; 16],
        };
        for x in desc.xbits.iter_mut().take(num_rows) {
            *x = br.get_bits(4) as u8;
        }

        if desc != self.cust_desc || self.cust_tab.is_none() {
            self.cust_desc = desc;
            match HuffmanTable::build(&desc) {
                Ok(tab) => self.cust_tab = Some(tab),
                Err(e) => {
                    self.cust_desc = HuffDesc::default();
                    self.cust_tab = None;
                    return Err(e);
                }
            }
        } else {
            log::trace!("reusing custom huffman table");
        }
        self.selection = Selection::Custom;
        Ok(())
    }

    pub fn table(&self) -> &HuffmanTable {
        let predefined = match self.kind {
            TableKind::Macroblock => &MB_TABLES,
            TableKind::Block => &BLK_TABLES,
        };
        match (self.selection, &self.cust_tab) {
            (Selection::Custom, Some(tab)) => tab,
            (Selection::Predefined(idx), _) => &predefined[idx],
            (Selection::Custom, None) => &predefined[7],
        }
    }

    pub fn is_custom(&self) -> bool {
        self.selection == Selection::Custom
    }

    pub fn decode(&self, br: &mut BitReader) -> Result<u32, Indeo5Error> {
        self.table().decode(br)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Packs codes LSB-first, the way the stream carries them.
    fn pack(codes: &[HuffmanCode]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u64;
        let mut n = 0;
        for c in codes {
            acc |= (c.value as u64) << n;
            n += c.length as u32;
            while n >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                n -= 8;
            }
        }
        if n > 0 {
            out.push(acc as u8);
        }
        out.extend_from_slice(&[0, 0, 0]);
        out
    }

    #[test]
    fn test_predefined_tables_build() {
        for desc in MB_HUFF_DESC.iter().chain(BLK_HUFF_DESC.iter()) {
            let tab = HuffmanTable::build_truncated(desc).unwrap();
            assert!(!tab.codes().is_empty());
            assert!(tab.codes().len() <= 256);
        }
        assert_eq!(MB_TABLES.len(), 8);
        assert_eq!(BLK_TABLES.len(), 8);
    }

    #[test]
    fn test_every_code_round_trips() {
        for desc in MB_HUFF_DESC.iter().chain(BLK_HUFF_DESC.iter()) {
            let tab = HuffmanTable::build_truncated(desc).unwrap();
            let data = pack(tab.codes());
            let mut br = BitReader::new(&data);
            for sym in 0..tab.codes().len() {
                assert_eq!(tab.decode(&mut br).unwrap(), sym as u32);
            }
        }
    }

    #[test]
    fn test_code_layout() {
        // Two rows: "0x" and "1xx".
        let tab = HuffmanTable::build(&HuffDesc::new(2, &[1, 2])).unwrap();
        let lens: Vec<u8> = tab.codes().iter().map(|c| c.length).collect();
        assert_eq!(lens, vec![2, 2, 3, 3, 3, 3]);
        // MSB-first "01" reversed is 0b10.
        assert_eq!(tab.codes()[1].value, 0b10);
        // MSB-first "100" reversed is 0b001.
        assert_eq!(tab.codes()[2].value, 0b001);
    }

    #[test]
    fn test_single_zero_length_row() {
        let tab = HuffmanTable::build(&HuffDesc::new(1, &[0])).unwrap();
        assert_eq!(tab.codes(), &[HuffmanCode { value: 0, length: 1 }]);
    }

    #[test]
    fn test_too_many_codes() {
        let desc = HuffDesc::new(2, &[8, 1]);
        assert_eq!(HuffmanTable::build(&desc).err(), Some(Indeo5Error::HuffmanTooManyCodes));

        let tab = HuffmanTable::build_truncated(&desc).unwrap();
        assert_eq!(tab.codes().len(), 256);
        assert!(tab.codes().iter().all(|c| c.length == 9));
    }

    #[test]
    fn test_default_block_codebook_truncated() {
        assert_eq!(BLK_TABLES[7].codes().len(), 256);
        assert_eq!(
            HuffmanTable::build(&BLK_HUFF_DESC[7]).err(),
            Some(Indeo5Error::HuffmanTooManyCodes)
        );
    }

    #[test]
    fn test_code_too_long() {
        let desc = HuffDesc::new(3, &[0, 0, 12]);
        assert_eq!(HuffmanTable::build(&desc).err(), Some(Indeo5Error::HuffmanCodeTooLong));
    }

    #[test]
    fn test_invalid_prefix() {
        // Descriptors always yield complete code sets; punch a hole by hand.
        let mut tab = HuffmanTable::build(&HuffDesc::new(1, &[1])).unwrap();
        for e in tab.lookup.iter_mut().step_by(2) {
            *e = 0;
        }
        let data = [0u8, 0];
        let mut br = BitReader::new(&data);
        assert_eq!(tab.decode(&mut br).err(), Some(Indeo5Error::InvalidHuffmanCode));
    }

    #[test]
    fn test_selector_default_and_predefined() {
        let mut sel = HuffmanSelector::new(TableKind::Block);
        let data = [0u8; 4];
        let mut br = BitReader::new(&data);
        sel.decode_desc(&mut br, false).unwrap();
        assert!(!sel.is_custom());
        assert_eq!(br.position(), 0);
        assert_eq!(sel.table().codes().len(), BLK_TABLES[7].codes().len());

        let data = [0b011u8, 0];
        let mut br = BitReader::new(&data);
        sel.decode_desc(&mut br, true).unwrap();
        assert_eq!(sel.tab_sel, 3);
        assert_eq!(sel.table().codes().len(), BLK_TABLES[3].codes().len());
    }

    #[test]
    fn test_selector_custom_table_cached() {
        // sel=7, rows=2, xbits = 1, 2
        let bits: u32 = 7 | (2 << 3) | (1 << 7) | (2 << 11);
        let data = bits.to_le_bytes();
        let mut sel = HuffmanSelector::new(TableKind::Macroblock);
        let mut br = BitReader::new(&data);
        sel.decode_desc(&mut br, true).unwrap();
        assert!(sel.is_custom());
        assert_eq!(sel.table().codes().len(), 6);
        assert_eq!(br.position(), 15);

        let mut br = BitReader::new(&data);
        sel.decode_desc(&mut br, true).unwrap();
        assert_eq!(sel.table().codes().len(), 6);
    }

    /// Serializes a custom descriptor behind selector 7.
    fn custom_desc_bits(rows: &[u8]) -> Vec<u8> {
        let mut fields = vec![(7u32, 3u32), (rows.len() as u32, 4)];
        fields.extend(rows.iter().map(|&x| (x as u32, 4)));

        let mut out = vec![0u8; 16];
        let mut pos = 0;
        for (value, nbits) in fields {
            for i in 0..nbits {
                if (value >> i) & 1 != 0 {
                    out[pos >> 3] |= 1 << (pos & 7);
                }
                pos += 1;
            }
        }
        out
    }

    fn max_code_len(rows: &[u8]) -> usize {
        rows.iter()
            .enumerate()
            .map(|(i, &x)| i + x as usize + (i + 1 != rows.len()) as usize)
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_custom_descriptors_round_trip() {
        let mut seed = 0x2545_f491u32;
        let mut checked = 0;
        while checked < 64 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let num_rows = 1 + (seed >> 16) as usize % 10;
            let rows: Vec<u8> = (0..num_rows)
                .map(|i| {
                    let r = seed.rotate_left(i as u32 * 3) >> 28;
                    (r % 7) as u8
                })
                .collect();
            let expected: usize = rows.iter().map(|&x| 1usize << x).sum();
            if max_code_len(&rows) > IVI_VLC_BITS as usize || expected > 256 {
                continue;
            }

            let data = custom_desc_bits(&rows);
            let mut sel = HuffmanSelector::new(TableKind::Block);
            let mut br = BitReader::new(&data);
            sel.decode_desc(&mut br, true).unwrap();
            assert!(sel.is_custom());
            assert_eq!(br.position(), 7 + 4 * rows.len());

            let tab = sel.table();
            assert_eq!(tab.codes().len(), expected, "{:?}", rows);

            let data = pack(tab.codes());
            let mut br = BitReader::new(&data);
            for (sym, code) in tab.codes().iter().enumerate() {
                let start = br.position();
                assert_eq!(sel.decode(&mut br).unwrap(), sym as u32, "{:?}", rows);
                assert_eq!(br.position() - start, code.length as usize);
            }
            checked += 1;
        }
    }

    #[test]
    fn test_selector_rejects_too_many_codes() {
        let data = custom_desc_bits(&[8, 1]);
        let mut sel = HuffmanSelector::new(TableKind::Block);
        let mut br = BitReader::new(&data);
        assert_eq!(sel.decode_desc(&mut br, true).err(), Some(Indeo5Error::HuffmanTooManyCodes));
        assert!(!sel.is_custom());
    }

    #[test]
    fn test_selector_rejects_long_codes() {
        let data = custom_desc_bits(&[0, 0, 12]);
        let mut sel = HuffmanSelector::new(TableKind::Block);
        let mut br = BitReader::new(&data);
        assert_eq!(sel.decode_desc(&mut br, true).err(), Some(Indeo5Error::HuffmanCodeTooLong));
        assert!(!sel.is_custom());

        // a valid descriptor afterwards is still accepted
        let data = custom_desc_bits(&[1, 2]);
        let mut br = BitReader::new(&data);
        sel.decode_desc(&mut br, true).unwrap();
        assert_eq!(sel.table().codes().len(), 6);
    }

    #[test]
    fn test_selector_empty_custom_descriptor() {
        let data = [7u8, 0];
        let mut sel = HuffmanSelector::new(TableKind::Macroblock);
        let mut br = BitReader::new(&data);
        assert_eq!(sel.decode_desc(&mut br, true).err(), Some(Indeo5Error::EmptyHuffmanDescriptor));
    }
}
