//! Picture layout: planes, bands, tiles and macroblocks.
//!
//! A picture has one luma and two chroma planes. Each plane is split into
//! one or four wavelet bands, each band into tiles and each tile into
//! macroblocks. Band buffers persist across frames; macroblock info is
//! rebuilt for every frame.

use crate::error::Indeo5Error;
use crate::header::{BandHeader, BandLayout};
use crate::huffman::{HuffmanSelector, TableKind};
use crate::quant::QuantMatrix;
use crate::scan::ScanOrder;
use crate::transform::InvTransform;

/// Layout parameters defined by a GOP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PictureConfig {
    pub pic_width: usize,
    pub pic_height: usize,
    pub chroma_width: usize,
    pub chroma_height: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    pub luma_bands: usize,
    pub chroma_bands: usize,
}

impl PictureConfig {
    /// Single band, single tile layout used before the first GOP header.
    pub fn basic(width: usize, height: usize) -> Self {
        Self {
            pic_width: width,
            pic_height: height,
            chroma_width: (width + 3) >> 2,
            chroma_height: (height + 3) >> 2,
            tile_width: width,
            tile_height: height,
            luma_bands: 1,
            chroma_bands: 1,
        }
    }

    pub fn is_scalable(&self) -> bool {
        self.luma_bands != 1 || self.chroma_bands != 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MbType {
    #[default]
    Intra,
    Inter,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MacroblockInfo {
    pub xpos: usize,
    pub ypos: usize,
    pub buf_offs: usize,
    pub mb_type: MbType,
    /// One bit per block, least significant first.
    pub cbp: u32,
    pub q_delta: i32,
    pub mv_x: i32,
    pub mv_y: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub xpos: usize,
    pub ypos: usize,
    pub width: usize,
    pub height: usize,
    pub mb_size: usize,
    pub is_empty: bool,
    pub data_size: usize,
    pub mbs: Vec<MacroblockInfo>,
    /// Index of the co-located tile in the first luma band.
    pub ref_tile: Option<usize>,
}

impl Tile {
    pub fn num_mbs(&self) -> usize {
        self.mbs.len()
    }
}

pub fn mbs_per_tile(width: usize, height: usize, mb_size: usize) -> usize {
    width.div_ceil(mb_size) * height.div_ceil(mb_size)
}

#[derive(Clone)]
pub struct Band {
    pub plane: usize,
    pub band_num: usize,
    pub width: usize,
    pub height: usize,
    pub pitch: usize,
    pub aheight: usize,
    pub bufs: Vec<Vec<i16>>,

    pub mb_size: usize,
    pub blk_size: usize,
    pub is_halfpel: bool,
    pub transform: InvTransform,
    pub scan: ScanOrder,
    pub quant: QuantMatrix,

    /// Refreshed by every band header.
    pub header: BandHeader,
    pub blk_vlc: HuffmanSelector,

    pub tiles: Vec<Tile>,
}

impl Band {
    pub(crate) fn new(plane: usize, band_num: usize, width: usize, height: usize, align: usize, num_bufs: usize) -> Self {
        let pitch = width.next_multiple_of(align);
        let aheight = height.next_multiple_of(align);
        Self {
            plane,
            band_num,
            width,
            height,
            pitch,
            aheight,
            bufs: vec![vec![0i16; pitch * aheight]; num_bufs],
            mb_size: 0,
            blk_size: 0,
            is_halfpel: false,
            transform: InvTransform::Slant8x8,
            scan: ScanOrder::ZigZag8x8,
            quant: QuantMatrix::default(),
            header: BandHeader::default(),
            blk_vlc: HuffmanSelector::new(TableKind::Block),
            tiles: Vec::new(),
        }
    }

    /// True for the first band of the luma plane, which drives inheritance.
    pub fn is_base(&self) -> bool {
        self.plane == 0 && self.band_num == 0
    }

    pub fn buf_size(&self) -> usize {
        self.pitch * self.aheight
    }

    /// Blocks per macroblock: one, or four when blocks are half the size.
    pub fn blocks_per_mb(&self) -> usize {
        if self.mb_size != self.blk_size { 4 } else { 1 }
    }

    /// Installs the GOP coding parameters; returns true if block sizes changed.
    pub fn apply_layout(&mut self, layout: &BandLayout) -> bool {
        let changed = layout.mb_size != self.mb_size || layout.blk_size != self.blk_size;
        self.mb_size = layout.mb_size;
        self.blk_size = layout.blk_size;
        self.is_halfpel = layout.is_halfpel;
        self.transform = layout.transform;
        self.scan = layout.scan;
        self.quant = layout.quant;
        changed
    }
}

pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Band>,
}

/// Allocates planes and band buffers for a layout.
pub fn init_planes(cfg: &PictureConfig) -> Result<Vec<Plane>, Indeo5Error> {
    if cfg.pic_width < 1 || cfg.pic_height < 1 || cfg.luma_bands < 1 || cfg.chroma_bands < 1 {
        return Err(Indeo5Error::InvalidPictureSize);
    }

    let num_bufs = if cfg.luma_bands > 1 { 3 } else { 2 };
    let mut planes = Vec::with_capacity(3);

    for p in 0..3 {
        let (width, height, num_bands) = if p == 0 {
            (cfg.pic_width, cfg.pic_height, cfg.luma_bands)
        } else {
            ((cfg.pic_width + 3) >> 2, (cfg.pic_height + 3) >> 2, cfg.chroma_bands)
        };

        let (b_width, b_height) = if num_bands == 1 {
            (width, height)
        } else {
            ((width + 1) >> 1, (height + 1) >> 1)
        };
        let align = if p == 0 { 16 } else { 8 };

        let bands = (0..num_bands)
            .map(|b| Band::new(p, b, b_width, b_height, align, num_bufs))
            .collect();
        planes.push(Plane { width, height, bands });
    }

    log::debug!(
        "allocated planes {}x{} luma bands {} chroma bands {}",
        cfg.pic_width,
        cfg.pic_height,
        cfg.luma_bands,
        cfg.chroma_bands
    );
    Ok(planes)
}

fn band_tiles(band: &Band, t_width: usize, t_height: usize, base: Option<&[Tile]>) -> Result<Vec<Tile>, Indeo5Error> {
    let mut tiles = Vec::new();
    for y in (0..band.height).step_by(t_height) {
        for x in (0..band.width).step_by(t_width) {
            let width = (band.width - x).min(t_width);
            let height = (band.height - y).min(t_height);
            let num_mbs = mbs_per_tile(width, height, band.mb_size);

            let ref_tile = match base {
                Some(base_tiles) => {
                    let idx = tiles.len();
                    match base_tiles.get(idx) {
                        Some(t) if t.num_mbs() == num_mbs => Some(idx),
                        _ => return Err(Indeo5Error::TileMacroblockMismatch),
                    }
                }
                None => None,
            };

            tiles.push(Tile {
                xpos: x,
                ypos: y,
                width,
                height,
                mb_size: band.mb_size,
                is_empty: false,
                data_size: 0,
                mbs: vec![MacroblockInfo::default(); num_mbs],
                ref_tile,
            });
        }
    }
    Ok(tiles)
}

/// Splits every band into tiles and links them to the first luma band.
pub fn init_tiles(planes: &mut [Plane], tile_width: usize, tile_height: usize) -> Result<(), Indeo5Error> {
    for p in 0..planes.len() {
        let (mut t_width, mut t_height) = if p == 0 {
            (tile_width, tile_height)
        } else {
            ((tile_width + 3) >> 2, (tile_height + 3) >> 2)
        };
        if p == 0 && planes[0].bands.len() == 4 {
            t_width >>= 1;
            t_height >>= 1;
        }
        if t_width == 0 || t_height == 0 {
            return Err(Indeo5Error::InvalidTileSize);
        }

        for b in 0..planes[p].bands.len() {
            let band = &planes[p].bands[b];
            if band.mb_size == 0 {
                return Err(Indeo5Error::InvalidTileSize);
            }
            let base = if p == 0 && b == 0 {
                None
            } else {
                Some(planes[0].bands[0].tiles.as_slice())
            };
            let tiles = band_tiles(band, t_width, t_height, base)?;
            planes[p].bands[b].tiles = tiles;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_blocks(planes: &mut [Plane], luma_mb: usize, chroma_mb: usize) {
        for (p, plane) in planes.iter_mut().enumerate() {
            for band in plane.bands.iter_mut() {
                band.mb_size = if p == 0 { luma_mb } else { chroma_mb };
                band.blk_size = band.mb_size.min(8);
                band.transform = InvTransform::Slant8x8;
            }
        }
    }

    #[test]
    fn test_basic_layout() {
        let cfg = PictureConfig::basic(160, 120);
        assert_eq!(cfg.chroma_width, 40);
        assert_eq!(cfg.chroma_height, 30);
        assert!(!cfg.is_scalable());

        let planes = init_planes(&cfg).unwrap();
        assert_eq!(planes.len(), 3);
        let luma = &planes[0].bands[0];
        assert_eq!((luma.pitch, luma.aheight), (160, 128));
        assert_eq!(luma.bufs.len(), 2);
        let chroma = &planes[2].bands[0];
        assert_eq!((chroma.width, chroma.height), (40, 30));
        assert_eq!((chroma.pitch, chroma.aheight), (40, 32));
    }

    #[test]
    fn test_scalable_layout() {
        let mut cfg = PictureConfig::basic(160, 120);
        cfg.luma_bands = 4;
        let planes = init_planes(&cfg).unwrap();
        assert_eq!(planes[0].bands.len(), 4);
        let band = &planes[0].bands[3];
        assert_eq!((band.width, band.height), (80, 60));
        assert_eq!((band.pitch, band.aheight), (80, 64));
        assert_eq!(band.bufs.len(), 3);
        assert_eq!(planes[1].bands[0].bufs.len(), 3);
    }

    #[test]
    fn test_rejects_empty_picture() {
        let cfg = PictureConfig::basic(0, 120);
        assert_eq!(init_planes(&cfg).err(), Some(Indeo5Error::InvalidPictureSize));
    }

    #[test]
    fn test_single_tile_per_band() {
        let cfg = PictureConfig::basic(160, 120);
        let mut planes = init_planes(&cfg).unwrap();
        set_blocks(&mut planes, 16, 4);
        init_tiles(&mut planes, cfg.tile_width, cfg.tile_height).unwrap();

        let luma = &planes[0].bands[0];
        assert_eq!(luma.tiles.len(), 1);
        assert_eq!(luma.tiles[0].num_mbs(), 10 * 8);
        assert_eq!(luma.tiles[0].ref_tile, None);
        let chroma = &planes[1].bands[0];
        assert_eq!(chroma.tiles[0].num_mbs(), 10 * 8);
        assert_eq!(chroma.tiles[0].ref_tile, Some(0));
    }

    #[test]
    fn test_tiled_band() {
        let mut cfg = PictureConfig::basic(160, 120);
        cfg.tile_width = 64;
        cfg.tile_height = 64;
        let mut planes = init_planes(&cfg).unwrap();
        set_blocks(&mut planes, 16, 4);
        init_tiles(&mut planes, 64, 64).unwrap();

        let luma = &planes[0].bands[0];
        assert_eq!(luma.tiles.len(), 6);
        let last = &luma.tiles[5];
        assert_eq!((last.xpos, last.ypos, last.width, last.height), (128, 64, 32, 56));
        assert_eq!(planes[2].bands[0].tiles[5].ref_tile, Some(5));
    }

    #[test]
    fn test_mismatched_chroma_macroblocks() {
        let cfg = PictureConfig::basic(160, 120);
        let mut planes = init_planes(&cfg).unwrap();
        set_blocks(&mut planes, 16, 8);
        assert_eq!(
            init_tiles(&mut planes, cfg.tile_width, cfg.tile_height).err(),
            Some(Indeo5Error::TileMacroblockMismatch)
        );
    }

    #[test]
    fn test_mbs_per_tile() {
        assert_eq!(mbs_per_tile(40, 30, 4), 10 * 8);
        assert_eq!(mbs_per_tile(17, 16, 16), 2);
    }
}
