//! Picture, GOP and band header decoding.

use crate::bit_reader::BitReader;
use crate::error::Indeo5Error;
use crate::huffman::HuffmanSelector;
use crate::picture::PictureConfig;
use crate::quant::QuantMatrix;
use crate::rv_map::MAX_CORRECTIONS;
use crate::scan::ScanOrder;
use crate::transform::InvTransform;
use num_enum::TryFromPrimitive;

pub const PICTURE_START_CODE: u32 = 0x1F;

const PIC_SIZE_ESC: u32 = 15;

/// Standard picture sizes in units of four pixels, as (width, height).
const COMMON_PIC_SIZES: [(usize, usize); 15] = [
    (160, 120),
    (80, 60),
    (40, 30),
    (176, 120),
    (88, 60),
    (88, 72),
    (44, 36),
    (60, 45),
    (160, 60),
    (176, 60),
    (20, 15),
    (22, 18),
    (0, 0),
    (0, 0),
    (0, 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum FrameType {
    Intra = 0,
    Inter = 1,
    InterScalable = 2,
    InterNoRef = 3,
    Null = 4,
}

pub mod gop_flags {
    pub const HAS_HEADER_SIZE: u8 = 0x01;
    pub const YV12: u8 = 0x02;
    pub const TRANSPARENCY: u8 = 0x08;
    pub const PROTECTED: u8 = 0x20;
    pub const HAS_TILE_SIZE: u8 = 0x40;
}

pub mod frame_flags {
    pub const HAS_HEADER_SIZE: u8 = 0x01;
    pub const MB_QUANT: u8 = 0x08;
    pub const HAS_CHECKSUM: u8 = 0x10;
    pub const HAS_EXTENSION: u8 = 0x20;
    pub const MB_HUFF_CODED: u8 = 0x40;
    pub const HAS_BAND_SIZE: u8 = 0x80;
}

mod band_flags {
    pub const EMPTY: u8 = 0x01;
    pub const INHERIT_MV: u8 = 0x02;
    pub const QDELTA_PRESENT: u8 = 0x04;
    pub const INHERIT_QDELTA: u8 = 0x08;
    pub const HAS_CORRECTIONS: u8 = 0x10;
    pub const HAS_EXTENSION: u8 = 0x20;
    pub const HAS_RVMAP: u8 = 0x40;
    pub const BLK_HUFF_CODED: u8 = 0x80;
}

/// Checks the picture start code and returns the raw 3-bit frame type.
pub fn read_frame_type(br: &mut BitReader) -> Result<u8, Indeo5Error> {
    if br.get_bits(5) != PICTURE_START_CODE {
        return Err(Indeo5Error::InvalidSyncCode);
    }
    Ok(br.get_bits(3) as u8)
}

fn skip_hdr_extension(br: &mut BitReader) {
    loop {
        let len = br.get_bits(8) as usize;
        if len == 0 {
            break;
        }
        br.skip(len * 8);
        if br.overrun() {
            break;
        }
    }
}

/// Coding parameters of one band, fixed by its position in the picture.
#[derive(Debug, Clone, Copy)]
pub struct BandLayout {
    pub plane: usize,
    pub band_num: usize,
    pub is_halfpel: bool,
    pub mb_size: usize,
    pub blk_size: usize,
    pub transform: InvTransform,
    pub scan: ScanOrder,
    pub quant: QuantMatrix,
}

impl BandLayout {
    fn read(br: &mut BitReader, plane: usize, band_num: usize, luma_bands: usize) -> Result<Self, Indeo5Error> {
        let is_halfpel = br.get_bit();
        let mb_flag = br.get_bit();
        let blk_size = 8 >> br.get_bits(1);
        let mb_size = if mb_flag { blk_size } else { blk_size << 1 };

        if plane == 0 && blk_size == 4 {
            return Err(Indeo5Error::InvalidLumaBlockSize);
        }
        if br.get_bit() {
            return Err(Indeo5Error::ExtendedTransform);
        }

        let (transform, scan) = match (plane << 2) + band_num {
            0 => (InvTransform::Slant8x8, ScanOrder::ZigZag8x8),
            1 => (InvTransform::RowSlant8, ScanOrder::Vertical8x8),
            2 => (InvTransform::ColSlant8, ScanOrder::Horizontal8x8),
            3 => (InvTransform::PutPixels8x8, ScanOrder::Horizontal8x8),
            _ => (InvTransform::Slant4x4, ScanOrder::Direct4x4),
        };
        if transform.size() != blk_size {
            return Err(Indeo5Error::TransformSizeMismatch);
        }

        let quant_mat = match plane {
            0 if luma_bands > 1 => band_num + 1,
            0 => 0,
            _ => 5,
        };
        let quant = QuantMatrix::select(blk_size, quant_mat)?;

        if br.get_bits(2) != 0 {
            return Err(Indeo5Error::InvalidGopEndMarker);
        }

        Ok(Self {
            plane,
            band_num,
            is_halfpel,
            mb_size,
            blk_size,
            transform,
            scan,
            quant,
        })
    }
}

/// Group of pictures header carried by every intra frame.
#[derive(Debug, Clone)]
pub struct GopHeader {
    pub flags: u8,
    pub header_size: u32,
    pub lock_word: Option<u32>,
    pub config: PictureConfig,
    /// Band layouts of the luma plane followed by the first chroma plane.
    pub bands: Vec<BandLayout>,
}

impl GopHeader {
    pub fn read(br: &mut BitReader) -> Result<Self, Indeo5Error> {
        let flags = br.get_bits(8) as u8;
        let header_size = if flags & gop_flags::HAS_HEADER_SIZE != 0 {
            br.get_bits(16)
        } else {
            0
        };
        let lock_word = if flags & gop_flags::PROTECTED != 0 {
            Some(br.get_bits(32))
        } else {
            None
        };

        let tile_size = if flags & gop_flags::HAS_TILE_SIZE != 0 {
            64usize << br.get_bits(2)
        } else {
            0
        };
        if tile_size > 256 {
            return Err(Indeo5Error::InvalidTileSize);
        }

        let luma_bands = br.get_bits(2) as usize * 3 + 1;
        let chroma_bands = br.get_bits(1) as usize * 3 + 1;
        let is_scalable = luma_bands != 1 || chroma_bands != 1;
        if is_scalable && (luma_bands != 4 || chroma_bands != 1) {
            return Err(Indeo5Error::InvalidBandCount);
        }

        let pic_size_indx = br.get_bits(4);
        let (pic_width, pic_height) = if pic_size_indx == PIC_SIZE_ESC {
            let height = br.get_bits(13) as usize;
            let width = br.get_bits(13) as usize;
            (width, height)
        } else {
            let (w, h) = COMMON_PIC_SIZES[pic_size_indx as usize];
            (w << 2, h << 2)
        };

        if flags & gop_flags::YV12 != 0 {
            return Err(Indeo5Error::UnsupportedYv12);
        }
        if pic_width == 0 || pic_height == 0 {
            return Err(Indeo5Error::InvalidPictureSize);
        }

        let (tile_width, tile_height) = if tile_size == 0 {
            (pic_width, pic_height)
        } else {
            (tile_size, tile_size)
        };
        let config = PictureConfig {
            pic_width,
            pic_height,
            chroma_width: (pic_width + 3) >> 2,
            chroma_height: (pic_height + 3) >> 2,
            tile_width,
            tile_height,
            luma_bands,
            chroma_bands,
        };

        let mut bands = Vec::with_capacity(luma_bands + chroma_bands);
        for p in 0..=1 {
            let num_bands = if p == 0 { luma_bands } else { chroma_bands };
            for b in 0..num_bands {
                bands.push(BandLayout::read(br, p, b, luma_bands)?);
            }
        }

        if flags & gop_flags::TRANSPARENCY != 0 {
            if br.get_bits(3) != 0 {
                return Err(Indeo5Error::InvalidTransparencyBits);
            }
            // fill colour
            if br.get_bit() {
                br.skip(24);
            }
        }

        br.align();
        br.skip(23);

        if br.get_bit() {
            loop {
                let word = br.get_bits(16);
                if word & 0x8000 == 0 || br.overrun() {
                    break;
                }
            }
        }
        br.align();

        Ok(Self {
            flags,
            header_size,
            lock_word,
            config,
            bands,
        })
    }

    pub fn is_protected(&self) -> bool {
        self.flags & gop_flags::PROTECTED != 0
    }

    /// Layout for a band; the second chroma plane shares the first one's.
    pub fn layout(&self, plane: usize, band_num: usize) -> Option<&BandLayout> {
        let plane = plane.min(1);
        self.bands
            .iter()
            .find(|l| l.plane == plane && l.band_num == band_num)
    }
}

/// Fields following the frame number of a non-null picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PictureFlags {
    pub frame_flags: u8,
    pub header_size: u32,
    pub checksum: Option<u16>,
}

impl PictureFlags {
    /// Reads the picture flags and the macroblock codebook selector.
    pub fn read(br: &mut BitReader, mb_vlc: &mut HuffmanSelector) -> Result<Self, Indeo5Error> {
        let frame_flags = br.get_bits(8) as u8;
        let header_size = if frame_flags & frame_flags::HAS_HEADER_SIZE != 0 {
            br.get_bits(24)
        } else {
            0
        };
        let checksum = if frame_flags & frame_flags::HAS_CHECKSUM != 0 {
            Some(br.get_bits(16) as u16)
        } else {
            None
        };
        if frame_flags & frame_flags::HAS_EXTENSION != 0 {
            skip_hdr_extension(br);
        }

        mb_vlc.decode_desc(br, frame_flags & frame_flags::MB_HUFF_CODED != 0)?;

        br.skip(3);
        Ok(Self {
            frame_flags,
            header_size,
            checksum,
        })
    }

    pub fn has_mb_quant(&self) -> bool {
        self.frame_flags & frame_flags::MB_QUANT != 0
    }

    pub fn has_band_size(&self) -> bool {
        self.frame_flags & frame_flags::HAS_BAND_SIZE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandHeader {
    pub is_empty: bool,
    pub data_size: Option<u32>,
    pub inherit_mv: bool,
    pub inherit_qdelta: bool,
    pub qdelta_present: bool,
    pub corrections: Vec<(u8, u8)>,
    pub rvmap_sel: usize,
    pub checksum: Option<u16>,
    pub glob_quant: i32,
}

impl Default for BandHeader {
    fn default() -> Self {
        Self {
            is_empty: false,
            data_size: None,
            inherit_mv: false,
            inherit_qdelta: false,
            qdelta_present: false,
            corrections: Vec::new(),
            rvmap_sel: 8,
            checksum: None,
            glob_quant: 0,
        }
    }
}

impl BandHeader {
    pub fn read(
        br: &mut BitReader,
        pic_flags: &PictureFlags,
        blk_vlc: &mut HuffmanSelector,
    ) -> Result<Self, Indeo5Error> {
        let flags = br.get_bits(8) as u8;
        if flags & band_flags::EMPTY != 0 {
            return Ok(Self {
                is_empty: true,
                ..Self::default()
            });
        }

        let data_size = if pic_flags.has_band_size() {
            Some(br.get_bits(24))
        } else {
            None
        };

        let inherit_mv = flags & band_flags::INHERIT_MV != 0;
        let qdelta_present = flags & band_flags::QDELTA_PRESENT != 0;
        let inherit_qdelta = flags & band_flags::INHERIT_QDELTA != 0 || !qdelta_present;

        let mut corrections = Vec::new();
        if flags & band_flags::HAS_CORRECTIONS != 0 {
            let num_corr = br.get_bits(8) as usize;
            if num_corr > MAX_CORRECTIONS {
                return Err(Indeo5Error::TooManyCorrections);
            }
            corrections.reserve(num_corr);
            for _ in 0..num_corr {
                let idx1 = br.get_bits(8) as u8;
                let idx2 = br.get_bits(8) as u8;
                corrections.push((idx1, idx2));
            }
        }

        let rvmap_sel = if flags & band_flags::HAS_RVMAP != 0 {
            br.get_bits(3) as usize
        } else {
            8
        };

        blk_vlc.decode_desc(br, flags & band_flags::BLK_HUFF_CODED != 0)?;

        let checksum = if br.get_bit() {
            Some(br.get_bits(16) as u16)
        } else {
            None
        };

        let glob_quant = br.get_bits(5) as i32;

        if flags & band_flags::HAS_EXTENSION != 0 {
            br.align();
            skip_hdr_extension(br);
        }
        br.align();

        Ok(Self {
            is_empty: false,
            data_size,
            inherit_mv,
            inherit_qdelta,
            qdelta_present,
            corrections,
            rvmap_sel,
            checksum,
            glob_quant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::TableKind;

    /// Packs (value, width) fields LSB first.
    fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u64;
        let mut bits = 0;
        for &(value, width) in fields {
            acc |= ((value as u64) & ((1u64 << width) - 1)) << bits;
            bits += width;
            while bits >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                bits -= 8;
            }
        }
        if bits > 0 {
            out.push(acc as u8);
        }
        out.extend_from_slice(&[0; 8]);
        out
    }

    fn basic_gop(flags: u32, luma_levels: u32, size_idx: u32) -> Vec<(u32, u32)> {
        vec![
            (flags, 8),
            (luma_levels, 2),
            (0, 1),
            (size_idx, 4),
        ]
    }

    // halfpel, mb flag, blk flag, ext transform, end marker
    fn band(mb_is_blk: bool, blk4: bool) -> Vec<(u32, u32)> {
        vec![(0, 1), (mb_is_blk as u32, 1), (blk4 as u32, 1), (0, 1), (0, 2)]
    }

    #[test]
    fn test_frame_type() {
        let data = pack(&[(0x1F, 5), (1, 3)]);
        let mut br = BitReader::new(&data);
        assert_eq!(read_frame_type(&mut br), Ok(1));
        assert_eq!(FrameType::try_from(1u8).ok(), Some(FrameType::Inter));
        assert!(FrameType::try_from(5u8).is_err());

        let data = pack(&[(0x1E, 5), (0, 3)]);
        let mut br = BitReader::new(&data);
        assert_eq!(read_frame_type(&mut br), Err(Indeo5Error::InvalidSyncCode));
    }

    #[test]
    fn test_basic_gop() {
        let mut fields = basic_gop(0, 0, 0);
        fields.extend(band(false, false));
        fields.extend(band(false, true));
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        let gop = GopHeader::read(&mut br).unwrap();

        assert_eq!(gop.config.pic_width, 640);
        assert_eq!(gop.config.pic_height, 480);
        assert_eq!(gop.config.chroma_width, 160);
        assert_eq!(gop.config.tile_width, 640);
        assert!(!gop.config.is_scalable());
        assert!(!gop.is_protected());

        let luma = gop.layout(0, 0).unwrap();
        assert_eq!((luma.mb_size, luma.blk_size), (16, 8));
        assert_eq!(luma.transform, InvTransform::Slant8x8);
        let chroma = gop.layout(2, 0).unwrap();
        assert_eq!((chroma.mb_size, chroma.blk_size), (8, 4));
        assert_eq!(chroma.scan, ScanOrder::Direct4x4);
        assert_eq!(br.position() % 8, 0);
    }

    #[test]
    fn test_scalable_gop() {
        let mut fields = basic_gop(0x40, 1, 15);
        fields.insert(1, (1, 2));
        fields.extend([(120, 13), (160, 13)]);
        for _ in 0..4 {
            fields.extend(band(false, false));
        }
        fields.extend(band(true, true));
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        let gop = GopHeader::read(&mut br).unwrap();

        assert_eq!((gop.config.pic_width, gop.config.pic_height), (160, 120));
        assert_eq!(gop.config.tile_width, 128);
        assert_eq!(gop.config.luma_bands, 4);
        assert_eq!(gop.layout(0, 3).unwrap().transform, InvTransform::PutPixels8x8);
        assert_eq!(gop.layout(1, 0).unwrap().mb_size, 4);
    }

    #[test]
    fn test_gop_rejects_band_combination() {
        let mut fields = basic_gop(0, 0, 0);
        fields[2] = (1, 1);
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        assert_eq!(GopHeader::read(&mut br).err(), Some(Indeo5Error::InvalidBandCount));
    }

    #[test]
    fn test_gop_rejects_luma_4x4() {
        let mut fields = basic_gop(0, 0, 0);
        fields.extend(band(true, true));
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        assert_eq!(
            GopHeader::read(&mut br).err(),
            Some(Indeo5Error::InvalidLumaBlockSize)
        );
    }

    #[test]
    fn test_gop_rejects_8x8_chroma() {
        let mut fields = basic_gop(0, 0, 0);
        fields.extend(band(false, false));
        fields.extend(band(true, false));
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        assert_eq!(
            GopHeader::read(&mut br).err(),
            Some(Indeo5Error::TransformSizeMismatch)
        );
    }

    #[test]
    fn test_gop_protected_and_yv12() {
        let mut fields = vec![(0x20, 8), (0xDEADBEEF, 32), (0, 2), (0, 1), (0, 4)];
        fields.extend(band(false, false));
        fields.extend(band(false, true));
        let data = pack(&fields);
        let mut br = BitReader::new(&data);
        let gop = GopHeader::read(&mut br).unwrap();
        assert!(gop.is_protected());
        assert_eq!(gop.lock_word, Some(0xDEADBEEF));

        let data = pack(&basic_gop(0x02, 0, 0));
        let mut br = BitReader::new(&data);
        assert_eq!(GopHeader::read(&mut br).err(), Some(Indeo5Error::UnsupportedYv12));
    }

    #[test]
    fn test_gop_unused_size_index() {
        let data = pack(&basic_gop(0, 0, 13));
        let mut br = BitReader::new(&data);
        assert_eq!(
            GopHeader::read(&mut br).err(),
            Some(Indeo5Error::InvalidPictureSize)
        );
    }

    #[test]
    fn test_picture_flags() {
        let data = pack(&[(0x11, 8), (0x123456, 24), (0xBEEF, 16), (0, 3)]);
        let mut br = BitReader::new(&data);
        let mut mb_vlc = HuffmanSelector::new(TableKind::Macroblock);
        let flags = PictureFlags::read(&mut br, &mut mb_vlc).unwrap();
        assert_eq!(flags.header_size, 0x123456);
        assert_eq!(flags.checksum, Some(0xBEEF));
        assert!(!flags.has_mb_quant());
        assert!(!mb_vlc.is_custom());
        assert_eq!(br.position(), 8 + 24 + 16 + 3);
    }

    #[test]
    fn test_band_header() {
        let data = pack(&[
            (0x54, 8),
            (2, 8),
            (3, 8),
            (4, 8),
            (5, 8),
            (6, 8),
            (2, 3),
            (1, 1),
            (0x1234, 16),
            (30, 5),
        ]);
        let mut br = BitReader::new(&data);
        let mut blk_vlc = HuffmanSelector::new(TableKind::Block);
        let hdr = BandHeader::read(&mut br, &PictureFlags::default(), &mut blk_vlc).unwrap();
        assert!(!hdr.is_empty);
        assert!(hdr.qdelta_present);
        assert!(!hdr.inherit_qdelta);
        assert_eq!(hdr.corrections, vec![(3, 4), (5, 6)]);
        assert_eq!(hdr.rvmap_sel, 2);
        assert_eq!(hdr.checksum, Some(0x1234));
        assert_eq!(hdr.glob_quant, 30);
        assert_eq!(br.position(), 80);
    }

    #[test]
    fn test_band_header_defaults() {
        let data = pack(&[(0x00, 8), (0, 1), (7, 5)]);
        let mut br = BitReader::new(&data);
        let mut blk_vlc = HuffmanSelector::new(TableKind::Block);
        let hdr = BandHeader::read(&mut br, &PictureFlags::default(), &mut blk_vlc).unwrap();
        assert!(hdr.inherit_qdelta);
        assert_eq!(hdr.rvmap_sel, 8);
        assert_eq!(hdr.glob_quant, 7);
    }

    #[test]
    fn test_band_header_empty_and_too_many_corrections() {
        let data = pack(&[(0x01, 8)]);
        let mut br = BitReader::new(&data);
        let mut blk_vlc = HuffmanSelector::new(TableKind::Block);
        let hdr = BandHeader::read(&mut br, &PictureFlags::default(), &mut blk_vlc).unwrap();
        assert!(hdr.is_empty);

        let data = pack(&[(0x10, 8), (62, 8)]);
        let mut br = BitReader::new(&data);
        assert_eq!(
            BandHeader::read(&mut br, &PictureFlags::default(), &mut blk_vlc).err(),
            Some(Indeo5Error::TooManyCorrections)
        );
    }
}
