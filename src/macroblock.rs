//! Macroblock info decoding: type, coded block pattern, quant delta and
//! motion vector of every macroblock in a tile.

use crate::bit_reader::BitReader;
use crate::error::Indeo5Error;
use crate::header::{FrameType, PictureFlags};
use crate::huffman::HuffmanSelector;
use crate::picture::{Band, MacroblockInfo, MbType, Tile};

/// Frame-level state shared by every band of a picture.
pub struct MbContext<'a> {
    pub frame_type: FrameType,
    pub pic_flags: PictureFlags,
    /// Codebook for quant deltas and vector differences, chosen by the
    /// picture header.
    pub mb_vlc: &'a HuffmanSelector,
    /// Macroblock size of the first luma band.
    pub base_mb_size: usize,
}

impl MbContext<'_> {
    /// Shift applied to vectors inherited from the first luma band.
    ///
    /// A 16x16 luma band feeding 4x4 chroma macroblocks gives 2, so chroma
    /// vectors are a quarter of the luma ones.
    pub fn mv_scale(&self, band: &Band) -> i32 {
        (self.base_mb_size >> 3) as i32 - (band.mb_size >> 3) as i32
    }
}

/// Maps an unsigned code with the sign in its LSB onto 0, 1, -1, 2, -2...
///
/// ```
/// use indeo5_rs::macroblock::to_signed;
/// assert_eq!(to_signed(4), -2);
/// assert_eq!(to_signed(255), 128);
/// ```
pub fn to_signed(val: u32) -> i32 {
    -(((val >> 1) as i32) ^ -((val & 1) as i32))
}

/// Rescales a vector, rounding half away from zero.
pub fn scale_mv(mv: i32, mv_scale: i32) -> i32 {
    (mv + (mv > 0) as i32 + (mv_scale - 1)) >> mv_scale
}

pub(crate) fn inherit_mv(ref_mb: &MacroblockInfo, mv_scale: i32) -> (i32, i32) {
    if mv_scale > 0 {
        (scale_mv(ref_mb.mv_x, mv_scale), scale_mv(ref_mb.mv_y, mv_scale))
    } else {
        (ref_mb.mv_x, ref_mb.mv_y)
    }
}

/// Verifies that the motion-compensated source of a macroblock lies inside
/// the band buffer, including the extra sample halfpel interpolation reads.
pub fn check_mv_bounds(band: &Band, mb: &MacroblockInfo) -> Result<(), Indeo5Error> {
    let hp = band.is_halfpel as i32;
    let dmv_x = mb.mv_x >> hp;
    let dmv_y = mb.mv_y >> hp;
    let cx = mb.mv_x & hp;
    let cy = mb.mv_y & hp;
    let x = mb.xpos as i64 + dmv_x as i64;
    let y = mb.ypos as i64 + dmv_y as i64;
    let size = band.mb_size as i64;

    if x < 0 || x + size + cx as i64 > band.pitch as i64 || y < 0 || y + size + cy as i64 > band.aheight as i64 {
        log::debug!(
            "motion vector ({}, {}) at ({}, {}) outside reference",
            mb.mv_x,
            mb.mv_y,
            mb.xpos,
            mb.ypos
        );
        return Err(Indeo5Error::MotionVectorOutOfBounds);
    }
    Ok(())
}

/// Decodes the macroblock info of one tile.
///
/// `ref_mbs` holds the macroblocks of the co-located tile in the first luma
/// band, used when the band inherits motion vectors or quant deltas.
///
/// Vectors not inherited are coded as differences from the previous inter
/// macroblock of the tile, vertical component first. In halfpel bands they
/// are in half pixels.
///
/// # Errors
///
/// - [`Indeo5Error::MissingReferenceTile`] if the band header asks for
///   inheritance but the tile has no reference.
/// - [`Indeo5Error::TileMacroblockMismatch`] if the macroblock counts of the
///   tile and its reference differ.
/// - [`Indeo5Error::EmptyMacroblockInIntra`] for a skipped macroblock in an
///   intra frame.
/// - [`Indeo5Error::MotionVectorOutOfBounds`] for a vector reaching outside
///   the band buffer.
pub fn decode_mb_info(
    br: &mut BitReader,
    ctx: &MbContext,
    band: &Band,
    tile: &mut Tile,
    ref_mbs: Option<&[MacroblockInfo]>,
) -> Result<(), Indeo5Error> {
    let hdr = &band.header;
    if ref_mbs.is_none() && ((hdr.qdelta_present && hdr.inherit_qdelta) || hdr.inherit_mv) {
        return Err(Indeo5Error::MissingReferenceTile);
    }

    let mb_size = band.mb_size;
    let cols = tile.width.div_ceil(mb_size);
    let rows = tile.height.div_ceil(mb_size);
    if tile.num_mbs() != cols * rows || ref_mbs.is_some_and(|r| r.len() < cols * rows) {
        return Err(Indeo5Error::TileMacroblockMismatch);
    }

    let is_base = band.is_base();
    let mb_quant = is_base && ctx.pic_flags.has_mb_quant();
    let mv_scale = ctx.mv_scale(band);
    let (mut mv_x, mut mv_y) = (0i32, 0i32);

    for (i, mb) in tile.mbs.iter_mut().enumerate() {
        let ref_mb = ref_mbs.map(|r| &r[i]);
        let x = tile.xpos + (i % cols) * mb_size;
        let y = tile.ypos + (i / cols) * mb_size;
        *mb = MacroblockInfo {
            xpos: x,
            ypos: y,
            buf_offs: y * band.pitch + x,
            ..MacroblockInfo::default()
        };

        if br.get_bit() {
            if ctx.frame_type == FrameType::Intra {
                return Err(Indeo5Error::EmptyMacroblockInIntra);
            }
            mb.mb_type = MbType::Inter;
            mb.cbp = 0;
            if mb_quant {
                mb.q_delta = to_signed(ctx.mb_vlc.decode(br)?);
            }
            if let Some(r) = ref_mb.filter(|_| hdr.inherit_mv) {
                (mb.mv_x, mb.mv_y) = inherit_mv(r, mv_scale);
            }
        } else {
            mb.mb_type = match ref_mb {
                Some(r) if hdr.inherit_mv => r.mb_type,
                _ if ctx.frame_type == FrameType::Intra => MbType::Intra,
                _ if br.get_bit() => MbType::Inter,
                _ => MbType::Intra,
            };

            mb.cbp = br.get_bits(band.blocks_per_mb() as u32);

            if hdr.qdelta_present {
                if hdr.inherit_qdelta {
                    if let Some(r) = ref_mb {
                        mb.q_delta = r.q_delta;
                    }
                } else if mb.cbp != 0 || mb_quant {
                    mb.q_delta = to_signed(ctx.mb_vlc.decode(br)?);
                }
            }

            if mb.mb_type == MbType::Inter {
                match ref_mb {
                    Some(r) if hdr.inherit_mv => {
                        (mb.mv_x, mb.mv_y) = inherit_mv(r, mv_scale);
                    }
                    _ => {
                        mv_y += to_signed(ctx.mb_vlc.decode(br)?);
                        mv_x += to_signed(ctx.mb_vlc.decode(br)?);
                        mb.mv_x = mv_x;
                        mb.mv_y = mv_y;
                    }
                }
            }
        }

        if mb.mb_type == MbType::Inter {
            check_mv_bounds(band, mb)?;
        }
    }

    br.align();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_signed() {
        let vals: Vec<i32> = (0..7).map(to_signed).collect();
        assert_eq!(vals, vec![0, 1, -1, 2, -2, 3, -3]);
    }

    #[test]
    fn test_scale_mv() {
        assert_eq!(scale_mv(4, 1), 2);
        assert_eq!(scale_mv(3, 1), 2);
        assert_eq!(scale_mv(-3, 1), -2);
        assert_eq!(scale_mv(-4, 1), -2);
        assert_eq!(scale_mv(5, 2), 1);
        assert_eq!(scale_mv(7, 2), 2);
        assert_eq!(scale_mv(0, 2), 0);
    }

    #[test]
    fn test_inherit_without_scale() {
        let r = MacroblockInfo {
            mv_x: -3,
            mv_y: 5,
            ..MacroblockInfo::default()
        };
        assert_eq!(inherit_mv(&r, 0), (-3, 5));
        assert_eq!(inherit_mv(&r, -1), (-3, 5));
        assert_eq!(inherit_mv(&r, 1), (-2, 3));
    }
}
