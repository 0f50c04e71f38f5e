//! Frame-level decoding: header state machine, buffer roles, band loop and
//! output composition.

use std::mem;

use crate::bit_reader::BitReader;
use crate::block::{decode_blocks, process_empty_tile, split_bufs};
use crate::buffers::BufferRoles;
use crate::error::Indeo5Error;
use crate::header::{BandHeader, FrameType, GopHeader, PictureFlags, gop_flags, read_frame_type};
use crate::huffman::{HuffmanSelector, TableKind};
use crate::macroblock::{MbContext, decode_mb_info};
use crate::picture::{Band, Plane, PictureConfig, Tile, init_planes, init_tiles};
use crate::recompose::{Subbands, output_plane, recompose_haar, recompose53};
use crate::rv_map::RunValueMap;

/// Where the decoder is within the current frame.
///
/// A successful [`Indeo5Decoder::decode_frame`] ends in `Done`; a failed one
/// falls back to `AwaitingPicture`. The intermediate states are only visible
/// from log output and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitingPicture,
    /// Parsing the GOP header of an intra frame.
    DecodingGop,
    DecodingPicture,
    DecodingBand { plane: usize, band: usize },
    Done,
}

/// Filter used to recombine the four luma bands of a scalable stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveletFilter {
    #[default]
    Recompose53,
    Haar,
}

/// Decoded picture in planar YUV 4:1:0.
///
/// Chroma planes carry one extra column and row replicated from their last
/// column and row, so their pitch is `chroma_width + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub width: usize,
    pub height: usize,
    pub chroma_width: usize,
    pub chroma_height: usize,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

impl Picture {
    /// Row stride of [`u`](Self::u) and [`v`](Self::v).
    pub fn chroma_pitch(&self) -> usize {
        self.chroma_width + 1
    }
}

/// Frame type history and buffer roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContext {
    /// `None` when the last picture header carried an unknown type.
    pub frame_type: Option<FrameType>,
    pub prev_frame_type: Option<FrameType>,
    /// Sequence number from the picture header, informational only.
    pub frame_num: u8,
    pub pic_flags: PictureFlags,
    pub roles: BufferRoles,
}

/// Stateful Indeo 5 frame decoder.
///
/// Frames must be fed in stream order. The decoder owns every band buffer
/// of the current layout, so inter frames predict from the pictures it
/// decoded earlier; reordering or dropping frames corrupts the reference
/// chain until the next intra frame.
///
/// ```no_run
/// use indeo5_rs::Indeo5Decoder;
///
/// # fn frames() -> Vec<Vec<u8>> { Vec::new() }
/// let mut decoder = Indeo5Decoder::new(320, 240)?;
/// for frame in frames() {
///     match decoder.decode_frame(&frame) {
///         Ok(picture) => println!("{}x{}", picture.width, picture.height),
///         Err(e) => eprintln!("skipped: {}", e),
///     }
/// }
/// # Ok::<(), indeo5_rs::Indeo5Error>(())
/// ```
pub struct Indeo5Decoder {
    state: DecoderState,
    pic_conf: PictureConfig,
    is_scalable: bool,
    planes: Vec<Plane>,
    frame: FrameContext,
    gop_flags: u8,
    gop_invalid: bool,
    buf_invalid: [bool; 3],
    mb_vlc: HuffmanSelector,
    wavelet_filter: WaveletFilter,
    picture: Option<Picture>,
}

impl Indeo5Decoder {
    /// Creates a decoder with the basic single-band, single-tile layout.
    ///
    /// `width` and `height` only matter until the first intra frame, whose
    /// GOP header defines the real layout. Zero dimensions are rejected with
    /// [`Indeo5Error::InvalidPictureSize`].
    pub fn new(width: usize, height: usize) -> Result<Self, Indeo5Error> {
        let pic_conf = PictureConfig::basic(width, height);
        let planes = init_planes(&pic_conf)?;
        Ok(Self {
            state: DecoderState::AwaitingPicture,
            pic_conf,
            is_scalable: false,
            planes,
            frame: FrameContext::default(),
            gop_flags: 0,
            gop_invalid: false,
            buf_invalid: [false; 3],
            mb_vlc: HuffmanSelector::new(TableKind::Macroblock),
            wavelet_filter: WaveletFilter::default(),
            picture: None,
        })
    }

    /// Selects the filter that recombines scalable luma bands.
    pub fn with_wavelet_filter(mut self, filter: WaveletFilter) -> Self {
        self.wavelet_filter = filter;
        self
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Layout from the most recent valid GOP header.
    pub fn config(&self) -> PictureConfig {
        self.pic_conf
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    /// Band buffers and tiling of the current layout, luma first.
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Last successfully decoded picture.
    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    /// Decodes one compressed frame and returns the picture it produced.
    ///
    /// Intra frames carry a GOP header that may reallocate every plane; all
    /// other frames reuse the current layout. Buffer roles are switched
    /// before any band is decoded, so the reference of an inter frame is the
    /// picture returned by the previous non-null call.
    ///
    /// # Errors
    ///
    /// Any [`Indeo5Error`] aborts the frame. The previous picture stays
    /// available through [`picture`](Self::picture) and the state returns to
    /// [`DecoderState::AwaitingPicture`]. A failed GOP header makes every
    /// following frame fail with [`Indeo5Error::InvalidGop`] until the next
    /// intra frame. Null frames return the previous picture unchanged.
    pub fn decode_frame(&mut self, data: &[u8]) -> Result<&Picture, Indeo5Error> {
        self.state = DecoderState::AwaitingPicture;
        if let Err(e) = self.decode_frame_data(data) {
            self.state = DecoderState::AwaitingPicture;
            return Err(e);
        }
        self.picture.as_ref().ok_or(Indeo5Error::IncompleteBuffer)
    }

    fn decode_frame_data(&mut self, data: &[u8]) -> Result<(), Indeo5Error> {
        let mut br = BitReader::new(data);
        self.decode_pic_hdr(&mut br)?;

        if self.gop_invalid {
            return Err(Indeo5Error::InvalidGop);
        }
        if self.gop_flags & gop_flags::PROTECTED != 0 {
            return Err(Indeo5Error::ProtectedStream);
        }

        let frame_type = self.frame.frame_type.ok_or(Indeo5Error::InvalidFrameType)?;
        let roles = self.frame.roles.transition(self.frame.prev_frame_type, frame_type);
        log::debug!(
            "frame {} {:?}: dst {} ref {}",
            self.frame.frame_num,
            frame_type,
            roles.dst(),
            roles.reference()
        );
        self.frame.roles = roles;
        let dst = roles.dst();

        if frame_type != FrameType::Null {
            self.buf_invalid[dst] = true;
            for p in 0..self.planes.len() {
                for b in 0..self.planes[p].bands.len() {
                    self.state = DecoderState::DecodingBand { plane: p, band: b };
                    self.decode_band(&mut br, p, b).inspect_err(|e| {
                        log::warn!("band {} of plane {} failed: {}", b, p, e);
                    })?;
                }
            }
            self.buf_invalid[dst] = false;
        } else if self.is_scalable {
            return Err(Indeo5Error::NullFrameInScalableStream);
        }

        if self.buf_invalid[dst] {
            return Err(Indeo5Error::IncompleteBuffer);
        }

        if frame_type != FrameType::Null {
            self.picture = Some(self.compose(dst)?);
        } else if self.picture.is_none() {
            return Err(Indeo5Error::IncompleteBuffer);
        }
        self.state = DecoderState::Done;
        Ok(())
    }

    fn decode_pic_hdr(&mut self, br: &mut BitReader) -> Result<(), Indeo5Error> {
        self.state = DecoderState::DecodingPicture;
        let raw_type = read_frame_type(br)?;

        self.frame.prev_frame_type = self.frame.frame_type;
        self.frame.frame_type = FrameType::try_from(raw_type).ok();
        let frame_type = self.frame.frame_type.ok_or(Indeo5Error::InvalidFrameType)?;
        self.frame.frame_num = br.get_bits(8) as u8;

        if frame_type == FrameType::Intra {
            self.state = DecoderState::DecodingGop;
            let result = GopHeader::read(br).and_then(|gop| self.apply_gop(&gop));
            if let Err(e) = result {
                log::warn!("invalid GOP header, skipping frames: {}", e);
                self.gop_invalid = true;
                return Err(e);
            }
            self.gop_invalid = false;
            self.state = DecoderState::DecodingPicture;
        }

        if frame_type == FrameType::InterScalable && !self.is_scalable {
            self.frame.frame_type = Some(FrameType::Inter);
            return Err(Indeo5Error::ScalableFrameInNonScalableStream);
        }

        if frame_type != FrameType::Null {
            self.frame.pic_flags = PictureFlags::read(br, &mut self.mb_vlc)?;
        }
        br.align();
        Ok(())
    }

    fn apply_gop(&mut self, gop: &GopHeader) -> Result<(), Indeo5Error> {
        let mut blk_size_changed = false;

        if gop.config != self.pic_conf || self.gop_invalid {
            self.planes = init_planes(&gop.config)?;
            self.pic_conf = gop.config;
            self.is_scalable = gop.config.is_scalable();
            blk_size_changed = true;
            log::debug!(
                "picture layout {}x{}, tiles {}x{}, bands {}+{}",
                gop.config.pic_width,
                gop.config.pic_height,
                gop.config.tile_width,
                gop.config.tile_height,
                gop.config.luma_bands,
                gop.config.chroma_bands
            );
        }

        for layout in &gop.bands {
            let targets: &[usize] = if layout.plane == 0 { &[0] } else { &[1, 2] };
            for &p in targets {
                let band = self.planes[p]
                    .bands
                    .get_mut(layout.band_num)
                    .ok_or(Indeo5Error::InvalidBandCount)?;
                blk_size_changed |= band.apply_layout(layout);
            }
        }

        if blk_size_changed {
            init_tiles(&mut self.planes, self.pic_conf.tile_width, self.pic_conf.tile_height)?;
        }

        self.gop_flags = gop.flags;
        Ok(())
    }

    fn decode_band(&mut self, br: &mut BitReader, p: usize, b: usize) -> Result<(), Indeo5Error> {
        let frame_type = self.frame.frame_type.ok_or(Indeo5Error::InvalidFrameType)?;
        let ctx = MbContext {
            frame_type,
            pic_flags: self.frame.pic_flags,
            mb_vlc: &self.mb_vlc,
            base_mb_size: self.planes[0].bands[0].mb_size,
        };
        let roles = self.frame.roles;
        let (band, base) = split_band(&mut self.planes, p, b);

        band.header = BandHeader::read(br, &ctx.pic_flags, &mut band.blk_vlc)?;

        let mut bufs = mem::take(&mut band.bufs);
        let mut tiles = mem::take(&mut band.tiles);
        let result = decode_band_tiles(br, &ctx, band, base, &mut tiles, &mut bufs, roles);
        band.bufs = bufs;
        band.tiles = tiles;
        result?;

        br.align();
        if br.overrun() {
            return Err(Indeo5Error::BitstreamOverrun);
        }
        log::trace!("plane {} band {} done at bit {}", p, b, br.position());
        Ok(())
    }

    fn compose(&self, dst: usize) -> Result<Picture, Indeo5Error> {
        let cfg = &self.pic_conf;

        let luma = &self.planes[0];
        let mut y = vec![0u8; luma.width * luma.height];
        if self.is_scalable && luma.bands.len() == 4 {
            let bands = Subbands {
                bufs: [
                    band_buf(&luma.bands[0], dst)?,
                    band_buf(&luma.bands[1], dst)?,
                    band_buf(&luma.bands[2], dst)?,
                    band_buf(&luma.bands[3], dst)?,
                ],
                pitch: luma.bands[0].pitch,
            };
            match self.wavelet_filter {
                WaveletFilter::Recompose53 => recompose53(&bands, luma.width, luma.height, &mut y, luma.width),
                WaveletFilter::Haar => recompose_haar(&bands, luma.width, luma.height, &mut y, luma.width),
            }
        } else {
            let band = &luma.bands[0];
            output_plane(band_buf(band, dst)?, band.pitch, luma.width, luma.height, &mut y, luma.width);
        }

        let (cw, ch) = (cfg.chroma_width, cfg.chroma_height);
        let mut chroma = [Vec::new(), Vec::new()];
        for (out, plane) in chroma.iter_mut().zip(&self.planes[1..3]) {
            let band = &plane.bands[0];
            *out = vec![0u8; (cw + 1) * (ch + 1)];
            output_plane(band_buf(band, dst)?, band.pitch, cw, ch, out, cw + 1);
            replicate_edge(out, cw, ch);
        }
        let [u, v] = chroma;

        Ok(Picture {
            width: cfg.pic_width,
            height: cfg.pic_height,
            chroma_width: cw,
            chroma_height: ch,
            y,
            u,
            v,
        })
    }
}

fn band_buf(band: &Band, idx: usize) -> Result<&[i16], Indeo5Error> {
    band.bufs
        .get(idx)
        .map(|b| b.as_slice())
        .ok_or(Indeo5Error::IncompleteBuffer)
}

/// Fills the extra column and row of a chroma plane with pitch `cw + 1`.
fn replicate_edge(plane: &mut [u8], cw: usize, ch: usize) {
    let pitch = cw + 1;
    for row in plane.chunks_exact_mut(pitch).take(ch) {
        row[cw] = row[cw - 1];
    }
    plane.copy_within((ch - 1) * pitch..ch * pitch, ch * pitch);
}

/// Borrows band `b` of plane `p` mutably along with the first luma band.
fn split_band(planes: &mut [Plane], p: usize, b: usize) -> (&mut Band, Option<&Band>) {
    if p == 0 {
        let (base, rest) = planes[0].bands.split_at_mut(1);
        if b == 0 {
            (&mut base[0], None)
        } else {
            (&mut rest[b - 1], Some(&base[0]))
        }
    } else {
        let (luma, chroma) = planes.split_at_mut(1);
        (&mut chroma[p - 1].bands[b], Some(&luma[0].bands[0]))
    }
}

/// Reads a tile data size: one flag bit, then 8 bits with 0xFF escaping to
/// 24 bits. Zero when the flag is clear.
fn tile_data_size(br: &mut BitReader) -> usize {
    let mut len = 0;
    if br.get_bit() {
        len = br.get_bits(8) as usize;
        if len == 255 {
            len = br.get_bits(24) as usize;
        }
    }
    br.align();
    len
}

fn decode_band_tiles(
    br: &mut BitReader,
    ctx: &MbContext,
    band: &Band,
    base: Option<&Band>,
    tiles: &mut [Tile],
    bufs: &mut [Vec<i16>],
    roles: BufferRoles,
) -> Result<(), Indeo5Error> {
    let (dst, reference) = split_bufs(bufs, roles.dst(), roles.reference())?;

    if band.header.is_empty {
        log::warn!("empty band {} of plane {}", band.band_num, band.plane);
        dst.copy_from_slice(reference);
        return Ok(());
    }

    let rv_map = RunValueMap::with_corrections(band.header.rvmap_sel, &band.header.corrections)?;
    let mv_scale = ctx.mv_scale(band);
    let mut pos = br.position();

    for (t, tile) in tiles.iter_mut().enumerate() {
        if tile.mb_size != band.mb_size {
            return Err(Indeo5Error::TileMacroblockMismatch);
        }
        let ref_mbs = tile
            .ref_tile
            .and_then(|i| base.and_then(|b| b.tiles.get(i)))
            .map(|r| r.mbs.as_slice());

        tile.is_empty = br.get_bit();
        if tile.is_empty {
            process_empty_tile(band, tile, ref_mbs, mv_scale, dst, reference)?;
            log::warn!("empty tile {} in plane {} band {}", t, band.plane, band.band_num);
            continue;
        }

        tile.data_size = tile_data_size(br);
        if tile.data_size == 0 {
            return Err(Indeo5Error::ZeroTileDataSize);
        }

        decode_mb_info(br, ctx, band, tile, ref_mbs)?;
        decode_blocks(br, band, tile, &rv_map, dst, reference)?;

        if (br.position() - pos) >> 3 != tile.data_size {
            return Err(Indeo5Error::TileDataSizeMismatch);
        }
        pos += tile.data_size << 3;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_basic_layout() {
        let dec = Indeo5Decoder::new(64, 48).unwrap();
        assert_eq!(dec.state(), DecoderState::AwaitingPicture);
        assert_eq!(dec.config(), PictureConfig::basic(64, 48));
        assert_eq!(dec.planes().len(), 3);
        assert!(dec.picture().is_none());
        assert!(Indeo5Decoder::new(0, 48).is_err());
    }

    #[test]
    fn test_replicate_edge() {
        let mut plane = vec![1, 2, 0, 3, 4, 0, 0, 0, 0];
        replicate_edge(&mut plane, 2, 2);
        assert_eq!(plane, vec![1, 2, 2, 3, 4, 4, 3, 4, 4]);
    }

    #[test]
    fn test_tile_data_size() {
        let data = [0x00, 0x20, 0x00, 0x00];
        let mut br = BitReader::new(&data);
        assert_eq!(tile_data_size(&mut br), 0);
        assert_eq!(br.position(), 8);

        let data = [0x41, 0x00];
        let mut br = BitReader::new(&data);
        assert_eq!(tile_data_size(&mut br), 0x20);
        assert_eq!(br.position(), 16);

        // 0xFF escapes to a 24-bit size
        let data = [0xFF, 0x03, 0x01, 0x00, 0x00];
        let mut br = BitReader::new(&data);
        assert_eq!(tile_data_size(&mut br), 0x81);
        assert_eq!(br.position(), 40);
    }

    #[test]
    fn test_failed_gop_resets_state() {
        let mut dec = Indeo5Decoder::new(16, 16).unwrap();
        // intra frame 0 whose zero-filled GOP gives chroma 8x8 blocks
        let data = [0x1F, 0x00, 0x00];
        assert_eq!(dec.decode_frame(&data).err(), Some(Indeo5Error::TransformSizeMismatch));
        assert_eq!(dec.state(), DecoderState::AwaitingPicture);
        assert!(dec.picture().is_none());
    }

    #[test]
    fn test_bad_sync_keeps_state() {
        let mut dec = Indeo5Decoder::new(64, 48).unwrap();
        assert_eq!(dec.decode_frame(&[0x00, 0x00]).err(), Some(Indeo5Error::InvalidSyncCode));
        assert!(dec.picture().is_none());
    }
}
