#![allow(dead_code)]

use indeo5_rs::huffman::{BLK_TABLES, MB_TABLES};

/// LSB-first bit writer matching the decoder's reader.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, value: u32, nbits: u32) -> &mut Self {
        for i in 0..nbits {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (self.bit_pos % 8);
            }
            self.bit_pos += 1;
        }
        self
    }

    pub fn bit(&mut self, b: bool) -> &mut Self {
        self.put(b as u32, 1)
    }

    pub fn align(&mut self) -> &mut Self {
        self.bit_pos = (self.bit_pos + 7) & !7;
        self
    }

    pub fn zeros(&mut self, nbits: u32) -> &mut Self {
        self.put(0, nbits)
    }

    /// Writes a symbol of predefined block codebook 7.
    pub fn blk_sym(&mut self, sym: usize) -> &mut Self {
        let code = BLK_TABLES[7].codes()[sym];
        self.put(code.value as u32, code.length as u32)
    }

    /// Writes a symbol of predefined macroblock codebook 7.
    pub fn mb_sym(&mut self, sym: usize) -> &mut Self {
        let code = MB_TABLES[7].codes()[sym];
        self.put(code.value as u32, code.length as u32)
    }

    pub fn append(&mut self, bytes: &[u8]) -> &mut Self {
        self.align();
        self.bytes.extend_from_slice(bytes);
        self.bit_pos = self.bytes.len() * 8;
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        self.align();
        std::mem::take(&mut self.bytes)
    }
}

pub const INTRA: u32 = 0;
pub const INTER: u32 = 1;
pub const INTER_SCALABLE: u32 = 2;
pub const NULL: u32 = 4;

pub struct GopParams {
    pub flags: u32,
    pub luma_bands_code: u32,
    pub chroma_bands_code: u32,
    pub width: u32,
    pub height: u32,
    pub luma_halfpel: bool,
    /// Luma macroblocks hold a single 8x8 block instead of four.
    pub luma_mb_is_blk: bool,
}

impl GopParams {
    pub fn single_band(width: u32, height: u32) -> Self {
        Self {
            flags: 0,
            luma_bands_code: 0,
            chroma_bands_code: 0,
            width,
            height,
            luma_halfpel: false,
            luma_mb_is_blk: false,
        }
    }

    /// Four luma bands with 8x8 macroblocks, one chroma band.
    pub fn scalable(width: u32, height: u32) -> Self {
        Self {
            luma_bands_code: 1,
            luma_mb_is_blk: true,
            ..Self::single_band(width, height)
        }
    }
}

pub fn picture_start(w: &mut BitWriter, frame_type: u32, frame_num: u32) {
    w.put(0x1F, 5).put(frame_type, 3).put(frame_num, 8);
}

/// GOP header with 8x8 luma blocks and a chroma band with 4x4 macroblocks
/// and blocks, one tile per band.
pub fn gop(w: &mut BitWriter, p: &GopParams) {
    w.put(p.flags, 8);
    if p.flags & 0x20 != 0 {
        w.put(0xDEAD_BEEF, 32);
    }
    w.put(p.luma_bands_code, 2).put(p.chroma_bands_code, 1);
    w.put(15, 4).put(p.height, 13).put(p.width, 13);

    // halfpel, mb size flag, 8x8 blocks, no extended transform, end marker
    for _ in 0..p.luma_bands_code * 3 + 1 {
        w.bit(p.luma_halfpel).bit(p.luma_mb_is_blk).bit(false).bit(false).zeros(2);
    }
    // chroma: fullpel, mb = blk, 4x4 blocks
    for _ in 0..p.chroma_bands_code * 3 + 1 {
        w.bit(false).bit(true).bit(true).bit(false).zeros(2);
    }

    w.align().zeros(23).bit(false).align();
}

/// Picture start, GOP header and picture flags of an intra frame.
pub fn intra_header(w: &mut BitWriter, p: &GopParams, frame_num: u32) {
    picture_start(w, INTRA, frame_num);
    gop(w, p);
    picture_flags(w);
}

/// Picture flags with no optional fields, followed by the header alignment.
pub fn picture_flags(w: &mut BitWriter) {
    w.put(0, 8).zeros(3).align();
}

/// Band header with no optional fields.
pub fn band_header(w: &mut BitWriter, glob_quant: u32) {
    band_header_flags(w, 0, glob_quant);
}

/// Band header with the given flag byte; flags must not request optional fields.
pub fn band_header_flags(w: &mut BitWriter, flags: u32, glob_quant: u32) {
    w.put(flags, 8).bit(false).put(glob_quant, 5).align();
}

pub fn empty_band(w: &mut BitWriter) {
    w.put(0x01, 8).align();
}

/// Prefixes a coded tile body with its empty flag and data size.
pub fn coded_tile(w: &mut BitWriter, body: &[u8]) {
    let size = body.len() + 2;
    assert!(size < 255);
    w.bit(false).bit(true).put(size as u32, 8).align();
    w.append(body);
}

pub fn empty_tile(w: &mut BitWriter) {
    w.bit(true).align();
}

/// Coded tile of an intra frame: one coded block pattern of `cbp_bits` per
/// macroblock, then the block symbols of every coded block in order.
pub fn intra_tile(w: &mut BitWriter, cbps: &[u32], cbp_bits: u32, blocks: &[&[usize]]) {
    let mut body = BitWriter::new();
    for &cbp in cbps {
        body.bit(false).put(cbp, cbp_bits);
    }
    body.align();
    for syms in blocks {
        for &sym in syms.iter() {
            body.blk_sym(sym);
        }
    }
    coded_tile(w, &body.finish());
}

/// Uncoded intra chroma tile of `num_mbs` 4x4 macroblocks.
pub fn flat_chroma_tile(w: &mut BitWriter, num_mbs: usize) {
    intra_tile(w, &vec![0; num_mbs], 1, &[]);
}

/// Block symbols for an escape-coded first coefficient.
pub fn escaped_dc(lo: usize, hi: usize) -> [usize; 5] {
    // escape, run 1, low part, high part, end of block
    [11, 0, lo, hi, 4]
}

/// Single-band intra frame whose first luma block is coded with `syms`,
/// the remaining blocks predicted from it.
pub fn intra_frame_with_block(frame_num: u32, syms: &[usize]) -> Vec<u8> {
    let mut w = BitWriter::new();
    intra_header(&mut w, &GopParams::single_band(16, 16), frame_num);

    band_header(&mut w, 0);
    intra_tile(&mut w, &[0b0001], 4, &[syms]);

    for _ in 0..2 {
        band_header(&mut w, 0);
        flat_chroma_tile(&mut w, 1);
    }
    w.finish()
}

/// 16x16 intra frame whose first luma block carries DC 8 (run 1, value 8),
/// with the remaining blocks predicted from it.
pub fn dc_intra_frame(frame_num: u32) -> Vec<u8> {
    intra_frame_with_block(frame_num, &[35, 4])
}

/// Inter frame leaving every tile empty.
pub fn empty_inter_frame(frame_num: u32) -> Vec<u8> {
    let mut w = BitWriter::new();
    picture_start(&mut w, INTER, frame_num);
    picture_flags(&mut w);
    band_header(&mut w, 0);
    empty_tile(&mut w);
    for _ in 0..2 {
        empty_band(&mut w);
    }
    w.finish()
}

/// 32x16 intra frame with two 16x16 luma macroblocks, the left one at DC 8
/// (sample 4) and the right one at DC 16 (sample 8). With `coded_chroma`
/// both chroma planes carry the same split over their two 4x4 macroblocks,
/// otherwise they stay flat.
pub fn two_tone_intra_frame(luma_halfpel: bool, coded_chroma: bool) -> Vec<u8> {
    let mut w = BitWriter::new();
    let params = GopParams {
        luma_halfpel,
        ..GopParams::single_band(32, 16)
    };
    intra_header(&mut w, &params, 0);

    band_header(&mut w, 0);
    intra_tile(&mut w, &[0b0001, 0b0001], 4, &[&[35, 4], &[35, 4]]);

    for _ in 0..2 {
        band_header(&mut w, 0);
        if coded_chroma {
            intra_tile(&mut w, &[1, 1], 1, &[&[35, 4], &[35, 4]]);
        } else {
            flat_chroma_tile(&mut w, 2);
        }
    }
    w.finish()
}
