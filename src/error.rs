use thiserror::Error;

/// Coarse classification of a decode failure.
///
/// Every variant of [`Indeo5Error`] is fatal to the frame being decoded; the
/// kind tells the caller whether the stream is merely damaged or can never be
/// decoded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed header field, table descriptor or coefficient stream.
    Structural,
    /// A motion vector or block offset points outside an allocated buffer.
    Bounds,
    /// The stream is password protected.
    Protected,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indeo5Error {
    #[error("Invalid picture start code")]
    InvalidSyncCode = 1,
    #[error("Invalid frame type")]
    InvalidFrameType = 2,
    #[error("Invalid tile size")]
    InvalidTileSize = 3,
    #[error("Unsupported band count combination")]
    InvalidBandCount = 4,
    #[error("YV12 picture layout not supported")]
    UnsupportedYv12 = 5,
    #[error("4x4 luma blocks not supported")]
    InvalidLumaBlockSize = 6,
    #[error("Extended transform not supported")]
    ExtendedTransform = 7,
    #[error("Transform size does not match block size")]
    TransformSizeMismatch = 8,
    #[error("Quantization matrix index out of range")]
    InvalidQuantMatrix = 9,
    #[error("Invalid GOP header end marker")]
    InvalidGopEndMarker = 10,
    #[error("Invalid transparency alignment bits")]
    InvalidTransparencyBits = 11,
    #[error("Empty custom Huffman descriptor")]
    EmptyHuffmanDescriptor = 12,
    #[error("Huffman descriptor produces more than 256 codes")]
    HuffmanTooManyCodes = 13,
    #[error("Huffman descriptor produces a code longer than the table width")]
    HuffmanCodeTooLong = 14,
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode = 15,
    #[error("Too many run/value corrections")]
    TooManyCorrections = 16,
    #[error("Run/value symbol out of range")]
    InvalidRunValueSymbol = 17,
    #[error("Coefficient scan position past end of block")]
    CoefficientOverrun = 18,
    #[error("Coefficient loop did not terminate")]
    CoefficientLoopLimit = 19,
    #[error("Macroblock count does not match reference tile")]
    TileMacroblockMismatch = 20,
    #[error("Inheritance requested without a reference tile")]
    MissingReferenceTile = 21,
    #[error("Empty macroblock in intra frame")]
    EmptyMacroblockInIntra = 22,
    #[error("Zero tile data size")]
    ZeroTileDataSize = 23,
    #[error("Tile data size mismatch")]
    TileDataSizeMismatch = 24,
    #[error("Scalable inter frame in non-scalable stream")]
    ScalableFrameInNonScalableStream = 25,
    #[error("Null frame in scalable stream")]
    NullFrameInScalableStream = 26,
    #[error("GOP is invalid until the next intra frame")]
    InvalidGop = 27,
    #[error("Read past end of frame data")]
    BitstreamOverrun = 29,
    #[error("Destination buffer holds an incomplete frame")]
    IncompleteBuffer = 30,
    #[error("Invalid picture dimensions")]
    InvalidPictureSize = 31,

    #[error("Motion vector points outside the reference buffer")]
    MotionVectorOutOfBounds = 100,
    #[error("Block lies outside the band buffer")]
    BlockOutOfBounds = 101,

    #[error("Password protected stream")]
    ProtectedStream = 200,
}

impl Indeo5Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MotionVectorOutOfBounds | Self::BlockOutOfBounds => ErrorKind::Bounds,
            Self::ProtectedStream => ErrorKind::Protected,
            _ => ErrorKind::Structural,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Indeo5Error::InvalidSyncCode.kind(), ErrorKind::Structural);
        assert_eq!(Indeo5Error::CoefficientOverrun.kind(), ErrorKind::Structural);
        assert_eq!(Indeo5Error::MotionVectorOutOfBounds.kind(), ErrorKind::Bounds);
        assert_eq!(Indeo5Error::ProtectedStream.kind(), ErrorKind::Protected);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(Indeo5Error::InvalidGop.to_string(), "GOP is invalid until the next intra frame");
    }
}
