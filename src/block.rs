//! Block reconstruction: coefficient decoding, inverse transform and motion
//! compensation for every macroblock of a tile, plus empty tile handling.
//!
//! A coded block is a sequence of block-codebook symbols terminated by the
//! end-of-block symbol of the band's run/value map. Each regular symbol
//! advances the scan position by its run and stores its value; the escape
//! symbol is followed by three more symbols carrying an explicit run and the
//! low and high parts of a signed value. Intra DC coefficients of 2-D transforms are coded as
//! differences from the previous block of the same tile.

use crate::bit_reader::BitReader;
use crate::error::Indeo5Error;
use crate::macroblock::{check_mv_bounds, inherit_mv, to_signed};
use crate::motion::{McOp, mc_type, motion_compensate};
use crate::picture::{Band, MacroblockInfo, MbType, Tile, mbs_per_tile};
use crate::quant::{MAX_QUANT, dequantize};
use crate::rv_map::RunValueMap;
use crate::transform::DcTransform;

/// Upper bound on symbols decoded for one block before giving up.
const MAX_BLOCK_SYMBOLS: usize = 2 * 64 + 1;

/// Range of the running intra DC predictor.
const DC_RANGE: (i32, i32) = (i16::MIN as i32, i16::MAX as i32);

/// Returns the write target and the motion compensation reference.
///
/// Both are borrowed from the same band buffer set, so the indices must
/// differ; an aliasing or out of range pair is rejected with
/// [`Indeo5Error::BlockOutOfBounds`].
pub fn split_bufs(bufs: &mut [Vec<i16>], dst: usize, reference: usize) -> Result<(&mut [i16], &[i16]), Indeo5Error> {
    if dst == reference || dst >= bufs.len() || reference >= bufs.len() {
        return Err(Indeo5Error::BlockOutOfBounds);
    }
    if dst < reference {
        let (lo, hi) = bufs.split_at_mut(reference);
        Ok((&mut lo[dst], &hi[0]))
    } else {
        let (lo, hi) = bufs.split_at_mut(dst);
        Ok((&mut hi[0], &lo[reference]))
    }
}

/// Offset of block `blk` inside its macroblock.
fn block_offset(band: &Band, mb: &MacroblockInfo, blk: usize) -> usize {
    mb.buf_offs + band.blk_size * ((blk & 1) + (blk >> 1) * band.pitch)
}

/// Halfpel-adjusted vector and interpolation type of an inter macroblock.
fn fullpel_mv(band: &Band, mb: &MacroblockInfo) -> (i32, i32, u32) {
    if band.is_halfpel {
        (mb.mv_x >> 1, mb.mv_y >> 1, mc_type(mb.mv_x, mb.mv_y))
    } else {
        (mb.mv_x, mb.mv_y, 0)
    }
}

struct CodedBlock<'a> {
    band: &'a Band,
    rv_map: &'a RunValueMap,
    is_intra: bool,
    quant: u32,
}

impl CodedBlock<'_> {
    /// Decodes coefficients of one block and reconstructs it at `offs`.
    fn decode(&self, br: &mut BitReader, dst: &mut [i16], offs: usize, prev_dc: &mut i32) -> Result<(), Indeo5Error> {
        let band = self.band;
        let blk_size = band.blk_size;
        let num_coeffs = blk_size * blk_size;
        let col_mask = blk_size - 1;
        let transform = band.transform;

        if transform.size() > blk_size {
            return Err(Indeo5Error::TransformSizeMismatch);
        }
        if offs + transform.footprint(band.pitch) > band.buf_size().min(dst.len()) {
            return Err(Indeo5Error::BlockOutOfBounds);
        }

        let base_tab = band.quant.base(self.is_intra);
        let scan = band.scan.table();
        let mut trvec = [0i32; 64];
        let mut col_flags = [false; 8];
        let mut scan_pos: isize = -1;
        let mut ac_coded = false;
        let mut symbols = 0;

        loop {
            symbols += 1;
            if symbols > MAX_BLOCK_SYMBOLS {
                return Err(Indeo5Error::CoefficientLoopLimit);
            }

            let sym = band.blk_vlc.decode(br)?;
            if sym == self.rv_map.eob_sym as u32 {
                break;
            }

            let (run, val) = if sym == self.rv_map.esc_sym as u32 {
                let run = band.blk_vlc.decode(br)? + 1;
                let lo = band.blk_vlc.decode(br)?;
                let hi = band.blk_vlc.decode(br)?;
                (run, to_signed((hi << 6) | lo))
            } else {
                self.rv_map.run_value(sym)?
            };

            scan_pos += run as isize;
            if scan_pos < 0 || scan_pos as usize >= num_coeffs {
                return Err(Indeo5Error::CoefficientOverrun);
            }
            let pos = scan[scan_pos as usize] as usize;

            if val == 0 {
                log::warn!("zero coefficient value at scan position {}", scan_pos);
            }

            let q = (base_tab[pos] as u32 * self.quant) >> 9;
            let val = dequantize(val, q);
            trvec[pos] = val;
            col_flags[pos & col_mask] |= val != 0;
            ac_coded |= pos != 0 && val != 0;
        }

        if self.is_intra && transform.is_2d() {
            *prev_dc = prev_dc.saturating_add(trvec[0]).clamp(DC_RANGE.0, DC_RANGE.1);
            trvec[0] = *prev_dc;
            col_flags[0] |= *prev_dc != 0;
        }

        let out = &mut dst[offs..];
        if !ac_coded && transform.dc_transform() == DcTransform::Slant2d {
            transform.dc_transform().apply(trvec[0], out, band.pitch, blk_size);
        } else {
            transform.apply(&trvec[..num_coeffs], out, band.pitch, &col_flags[..blk_size]);
        }
        Ok(())
    }
}

/// Reconstructs every macroblock of a coded tile.
///
/// Blocks flagged in a macroblock's coded block pattern are decoded from
/// `br`. For inter macroblocks the residual is then added to the motion
/// compensated prediction from `reference`. Uncoded intra blocks are filled
/// with the running DC predictor; uncoded inter blocks take the prediction
/// as is. The reader is byte aligned on return.
///
/// # Errors
///
/// [`Indeo5Error::CoefficientOverrun`] when a run moves past the last
/// coefficient, [`Indeo5Error::CoefficientLoopLimit`] when a block never
/// reaches its end-of-block symbol, and the bounds errors of
/// [`check_mv_bounds`] and [`motion_compensate`].
pub fn decode_blocks(
    br: &mut BitReader,
    band: &Band,
    tile: &Tile,
    rv_map: &RunValueMap,
    dst: &mut [i16],
    reference: &[i16],
) -> Result<(), Indeo5Error> {
    let blk_size = band.blk_size;
    let num_blocks = band.blocks_per_mb();
    let mut prev_dc = 0i32;

    for mb in &tile.mbs {
        let is_intra = mb.mb_type == MbType::Intra;
        let level = (band.header.glob_quant + mb.q_delta).clamp(0, MAX_QUANT);
        let block = CodedBlock {
            band,
            rv_map,
            is_intra,
            quant: band.quant.scale(is_intra, level),
        };

        let (mv_x, mv_y, mc) = if is_intra { (0, 0, 0) } else { fullpel_mv(band, mb) };
        if !is_intra {
            check_mv_bounds(band, mb)?;
        }

        let mut cbp = mb.cbp;
        for blk in 0..num_blocks {
            let offs = block_offset(band, mb, blk);

            if cbp & 1 != 0 {
                block.decode(br, dst, offs, &mut prev_dc)?;
                if !is_intra {
                    motion_compensate(McOp::Add, blk_size, dst, reference, offs, mv_x, mv_y, mc, band.pitch)?;
                }
            } else if is_intra {
                let min_size = (blk_size - 1) * band.pitch + blk_size;
                if offs + min_size > band.buf_size().min(dst.len()) {
                    return Err(Indeo5Error::BlockOutOfBounds);
                }
                band.transform
                    .dc_transform()
                    .apply(prev_dc, &mut dst[offs..], band.pitch, blk_size);
            } else {
                motion_compensate(McOp::Put, blk_size, dst, reference, offs, mv_x, mv_y, mc, band.pitch)?;
            }

            cbp >>= 1;
        }
    }

    br.align();
    Ok(())
}

/// Fills a tile that carries no data this frame.
///
/// Macroblocks become inter blocks with inherited motion and quant delta.
/// The tile is motion compensated from the reference buffer when any
/// inherited vector is non-zero, otherwise copied from it.
pub fn process_empty_tile(
    band: &Band,
    tile: &mut Tile,
    ref_mbs: Option<&[MacroblockInfo]>,
    mv_scale: i32,
    dst: &mut [i16],
    reference: &[i16],
) -> Result<(), Indeo5Error> {
    let mb_size = band.mb_size;
    let cols = tile.width.div_ceil(mb_size);
    if tile.num_mbs() != mbs_per_tile(tile.width, tile.height, mb_size)
        || ref_mbs.is_some_and(|r| r.len() < tile.num_mbs())
    {
        return Err(Indeo5Error::TileMacroblockMismatch);
    }

    let hdr = &band.header;
    let mut need_mc = false;

    for (i, mb) in tile.mbs.iter_mut().enumerate() {
        let ref_mb = ref_mbs.map(|r| &r[i]);
        let x = tile.xpos + (i % cols) * mb_size;
        let y = tile.ypos + (i / cols) * mb_size;
        *mb = MacroblockInfo {
            xpos: x,
            ypos: y,
            buf_offs: y * band.pitch + x,
            mb_type: MbType::Inter,
            ..MacroblockInfo::default()
        };

        if !hdr.qdelta_present && band.is_base() {
            mb.q_delta = hdr.glob_quant;
        }
        if let Some(r) = ref_mb.filter(|_| hdr.inherit_qdelta) {
            mb.q_delta = r.q_delta;
        }
        if let Some(r) = ref_mb.filter(|_| hdr.inherit_mv) {
            (mb.mv_x, mb.mv_y) = inherit_mv(r, mv_scale);
            need_mc |= mb.mv_x != 0 || mb.mv_y != 0;
            check_mv_bounds(band, mb)?;
        }
    }

    if hdr.inherit_mv && need_mc {
        for mb in &tile.mbs {
            let (mv_x, mv_y, mc) = fullpel_mv(band, mb);
            for blk in 0..band.blocks_per_mb() {
                let offs = block_offset(band, mb, blk);
                motion_compensate(McOp::Put, band.blk_size, dst, reference, offs, mv_x, mv_y, mc, band.pitch)?;
            }
        }
    } else {
        copy_rect(dst, reference, band.pitch, tile.xpos, tile.ypos, tile.width, tile.height)?;
    }

    Ok(())
}

/// Copies a rectangle between two buffers of the same pitch.
pub fn copy_rect(
    dst: &mut [i16],
    src: &[i16],
    pitch: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Result<(), Indeo5Error> {
    if height > 0 && (y + height - 1) * pitch + x + width > dst.len().min(src.len()) {
        return Err(Indeo5Error::BlockOutOfBounds);
    }
    for row in y..y + height {
        let o = row * pitch + x;
        dst[o..o + width].copy_from_slice(&src[o..o + width]);
    }
    Ok(())
}
