//! Decoder for Indeo Video Interactive 5 (IV50) frames.
//!
//! ```no_run
//! use indeo5_rs::Indeo5Decoder;
//!
//! # fn frames() -> Vec<Vec<u8>> { Vec::new() }
//! let mut decoder = Indeo5Decoder::new(320, 240)?;
//! for frame in frames() {
//!     match decoder.decode_frame(&frame) {
//!         Ok(picture) => println!("{}x{}", picture.width, picture.height),
//!         Err(e) => eprintln!("skipped frame: {}", e),
//!     }
//! }
//! # Ok::<(), indeo5_rs::Indeo5Error>(())
//! ```

pub mod bit_reader;
pub mod block;
pub mod buffers;
pub mod color;
pub mod decoder;
pub mod error;
pub mod header;
pub mod huffman;
pub mod macroblock;
pub mod motion;
pub mod picture;
pub mod quant;
pub mod recompose;
pub mod rv_map;
pub mod scan;
pub mod transform;

pub use decoder::{DecoderState, Indeo5Decoder, Picture, WaveletFilter};
pub use error::{ErrorKind, Indeo5Error};
pub use header::FrameType;
pub use picture::PictureConfig;
