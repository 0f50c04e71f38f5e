//! ivi5dec CLI - decodes Indeo 5 frames to YUV or PPM images.

use clap::{Parser, Subcommand, ValueEnum};
use indeo5_rs::bit_reader::BitReader;
use indeo5_rs::header::{GopHeader, read_frame_type};
use indeo5_rs::{FrameType, Indeo5Decoder, Picture, WaveletFilter};
use std::fs;
use std::path::{Path, PathBuf};

/// Indeo Video Interactive 5 frame decoder
#[derive(Parser)]
#[command(name = "ivi5dec")]
#[command(author = "indeo5-rs contributors")]
#[command(version)]
#[command(about = "Decode Indeo 5 (IV50) frames to raw YUV or PPM images", long_about = None)]
#[command(after_help = "EXAMPLES:
    ivi5dec decode -i frame000.bin frame001.bin -o out -w 320 -H 240
    ivi5dec decode -i frames/*.bin -o out -w 320 -H 240 -f ppm
    ivi5dec info -i frame000.bin

Each input file holds one compressed frame, decoded in the given order.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a sequence of frames
    ///
    /// Frames that fail to decode are reported and skipped; decoding resumes
    /// with the next frame.
    #[command(visible_alias = "d")]
    Decode {
        /// Compressed frame files, in decode order
        #[arg(short, long, num_args = 1.., required = true, help = "Paths to compressed frame files")]
        input: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, help = "Directory for decoded pictures")]
        output: PathBuf,

        /// Picture width until the first GOP header
        #[arg(short, long)]
        width: usize,

        /// Picture height until the first GOP header
        #[arg(short = 'H', long)]
        height: usize,

        /// Output format
        #[arg(short, long, default_value = "yuv", value_enum)]
        format: OutputFormat,

        /// Use the Haar filter to recombine scalable luma bands
        #[arg(long)]
        haar: bool,
    },

    /// Display the picture layout carried by an intra frame
    #[command(visible_alias = "i")]
    Info {
        /// Input frame file
        #[arg(short, long, help = "Path to a compressed frame file")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Planar YUV 4:1:0, chroma planes padded by one column and row
    Yuv,
    /// Portable PixMap, converted to RGB
    Ppm,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            width,
            height,
            format,
            haar,
        } => decode_command(&input, &output, width, height, format, haar),
        Commands::Info { input } => info_command(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn decode_command(
    inputs: &[PathBuf],
    output: &Path,
    width: usize,
    height: usize,
    format: OutputFormat,
    haar: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output)?;

    let filter = if haar { WaveletFilter::Haar } else { WaveletFilter::Recompose53 };
    let mut decoder = Indeo5Decoder::new(width, height)?.with_wavelet_filter(filter);
    let mut decoded = 0;

    for (i, path) in inputs.iter().enumerate() {
        let data = fs::read(path)?;
        let picture = match decoder.decode_frame(&data) {
            Ok(picture) => picture,
            Err(e) => {
                eprintln!("✗ {}: {} ({:?})", path.display(), e, e.kind());
                continue;
            }
        };

        let out_path = match format {
            OutputFormat::Yuv => {
                let p = output.join(format!("frame{:05}.yuv", i));
                write_yuv(&p, picture)?;
                p
            }
            OutputFormat::Ppm => {
                let p = output.join(format!("frame{:05}.ppm", i));
                write_ppm(&p, &picture.to_rgb24(), picture.width, picture.height)?;
                p
            }
        };
        decoded += 1;
        log::info!("{} -> {}", path.display(), out_path.display());
    }

    println!("✓ Decoded {} of {} frames into {}", decoded, inputs.len(), output.display());
    Ok(())
}

fn info_command(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let mut br = BitReader::new(&data);
    let raw_type = read_frame_type(&mut br)?;
    let frame_type = FrameType::try_from(raw_type).map_err(|_| indeo5_rs::Indeo5Error::InvalidFrameType)?;
    let frame_num = br.get_bits(8);

    println!("File: {}", input.display());
    println!("Size: {} bytes", data.len());
    println!("Frame: {} ({:?})", frame_num, frame_type);

    if frame_type != FrameType::Intra {
        println!("No GOP header; picture layout is defined by the preceding intra frame.");
        return Ok(());
    }

    let gop = GopHeader::read(&mut br)?;
    let cfg = gop.config;
    println!("Picture: {}x{}", cfg.pic_width, cfg.pic_height);
    println!("Chroma: {}x{}", cfg.chroma_width, cfg.chroma_height);
    println!("Tiles: {}x{}", cfg.tile_width, cfg.tile_height);
    println!("Bands: luma {}, chroma {}", cfg.luma_bands, cfg.chroma_bands);
    println!("Protected: {}", gop.is_protected());
    if let Some(lock) = gop.lock_word {
        println!("Lock word: {:#010x}", lock);
    }
    for layout in &gop.bands {
        println!(
            "  plane {} band {}: mb {} blk {} {:?} {:?}{}",
            layout.plane,
            layout.band_num,
            layout.mb_size,
            layout.blk_size,
            layout.transform,
            layout.scan,
            if layout.is_halfpel { " halfpel" } else { "" }
        );
    }
    Ok(())
}

fn write_yuv(path: &Path, picture: &Picture) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    let mut file = fs::File::create(path)?;
    file.write_all(&picture.y)?;
    file.write_all(&picture.u)?;
    file.write_all(&picture.v)?;
    Ok(())
}

fn write_ppm(path: &Path, pixels: &[u8], width: usize, height: usize) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    let mut file = fs::File::create(path)?;

    writeln!(file, "P6")?;
    writeln!(file, "{} {}", width, height)?;
    writeln!(file, "255")?;
    file.write_all(pixels)?;

    Ok(())
}
