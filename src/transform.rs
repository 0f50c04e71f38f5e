//! Inverse transforms for IVI blocks.
//!
//! All transforms read a dequantized coefficient block in raster order and
//! write reconstructed samples into a band buffer with the given pitch.
//! Column passes skip columns whose flag is clear; row passes skip rows that
//! are entirely zero.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvTransform {
    Slant8x8,
    RowSlant8,
    ColSlant8,
    Slant4x4,
    RowSlant4,
    ColSlant4,
    PutPixels8x8,
    Haar8x8,
    RowHaar8,
    ColHaar8,
    Haar4x4,
    RowHaar4,
    ColHaar4,
}

/// Shortcut used when a block carries no coded coefficients besides DC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcTransform {
    Slant2d,
    RowSlant,
    ColSlant,
    PutDcPixel,
    Haar2d,
}

impl InvTransform {
    pub fn size(&self) -> usize {
        match self {
            Self::Slant8x8
            | Self::RowSlant8
            | Self::ColSlant8
            | Self::PutPixels8x8
            | Self::Haar8x8
            | Self::RowHaar8
            | Self::ColHaar8 => 8,
            Self::Slant4x4
            | Self::RowSlant4
            | Self::ColSlant4
            | Self::Haar4x4
            | Self::RowHaar4
            | Self::ColHaar4 => 4,
        }
    }

    /// True for transforms that mix both dimensions, whose DC is predicted.
    pub fn is_2d(&self) -> bool {
        matches!(self, Self::Slant8x8 | Self::Slant4x4 | Self::Haar8x8 | Self::Haar4x4)
    }

    pub fn dc_transform(&self) -> DcTransform {
        match self {
            Self::Slant8x8 | Self::Slant4x4 => DcTransform::Slant2d,
            Self::RowSlant8 | Self::RowSlant4 => DcTransform::RowSlant,
            Self::ColSlant8 | Self::ColSlant4 => DcTransform::ColSlant,
            Self::PutPixels8x8 => DcTransform::PutDcPixel,
            _ => DcTransform::Haar2d,
        }
    }

    /// Minimum output slice length for a block written with `pitch`.
    pub fn footprint(&self, pitch: usize) -> usize {
        let n = self.size();
        (n - 1) * pitch + n
    }

    pub fn apply(&self, coeffs: &[i32], out: &mut [i16], pitch: usize, flags: &[bool]) {
        match self {
            Self::Slant8x8 => inverse_2d::<8>(coeffs, out, pitch, flags, slant8, false, compensate),
            Self::Slant4x4 => inverse_2d::<4>(coeffs, out, pitch, flags, slant4, false, compensate),
            Self::RowSlant8 => rows_only::<8>(coeffs, out, pitch, slant8, compensate),
            Self::RowSlant4 => rows_only::<4>(coeffs, out, pitch, slant4, compensate),
            Self::ColSlant8 => cols_only::<8>(coeffs, out, pitch, flags, slant8, compensate),
            Self::ColSlant4 => cols_only::<4>(coeffs, out, pitch, flags, slant4, compensate),
            Self::Haar8x8 => inverse_2d::<8>(coeffs, out, pitch, flags, haar8, true, identity),
            Self::Haar4x4 => inverse_2d::<4>(coeffs, out, pitch, flags, haar4, true, identity),
            Self::RowHaar8 => rows_only::<8>(coeffs, out, pitch, haar8, identity),
            Self::RowHaar4 => rows_only::<4>(coeffs, out, pitch, haar4, identity),
            Self::ColHaar8 => cols_only::<8>(coeffs, out, pitch, flags, haar8, identity),
            Self::ColHaar4 => cols_only::<4>(coeffs, out, pitch, flags, haar4, identity),
            Self::PutPixels8x8 => {
                for y in 0..8 {
                    for x in 0..8 {
                        out[y * pitch + x] = coeffs[y * 8 + x] as i16;
                    }
                }
            }
        }
    }
}

impl DcTransform {
    pub fn apply(&self, dc: i32, out: &mut [i16], pitch: usize, blk_size: usize) {
        match self {
            Self::Slant2d | Self::Haar2d => {
                let v = if *self == Self::Slant2d { (dc + 1) >> 1 } else { dc >> 3 };
                let v = v as i16;
                for y in 0..blk_size {
                    out[y * pitch..y * pitch + blk_size].fill(v);
                }
            }
            Self::RowSlant => {
                out[..blk_size].fill(((dc + 1) >> 1) as i16);
                for y in 1..blk_size {
                    out[y * pitch..y * pitch + blk_size].fill(0);
                }
            }
            Self::ColSlant => {
                let v = ((dc + 1) >> 1) as i16;
                for y in 0..blk_size {
                    let row = &mut out[y * pitch..y * pitch + blk_size];
                    row.fill(0);
                    row[0] = v;
                }
            }
            Self::PutDcPixel => {
                for y in 0..8 {
                    out[y * pitch..y * pitch + 8].fill(0);
                }
                out[0] = dc as i16;
            }
        }
    }
}

fn compensate(x: i32) -> i32 {
    (x + 1) >> 1
}

fn identity(x: i32) -> i32 {
    x
}

fn inverse_2d<const N: usize>(
    coeffs: &[i32],
    out: &mut [i16],
    pitch: usize,
    flags: &[bool],
    kernel: fn([i32; N]) -> [i32; N],
    prescale: bool,
    row_comp: fn(i32) -> i32,
) {
    let mut tmp = [0i32; 64];

    for i in 0..N {
        if !flags[i] {
            continue;
        }
        let mut col = [0i32; N];
        for (k, c) in col.iter_mut().enumerate() {
            *c = coeffs[i + k * N];
        }
        if prescale && i & (N / 2) == 0 {
            for c in col.iter_mut().take(N / 2) {
                *c <<= 1;
            }
        }
        for (k, v) in kernel(col).into_iter().enumerate() {
            tmp[i + k * N] = v;
        }
    }

    for r in 0..N {
        let dst = &mut out[r * pitch..r * pitch + N];
        let mut row = [0i32; N];
        row.copy_from_slice(&tmp[r * N..r * N + N]);
        if row.iter().all(|&v| v == 0) {
            dst.fill(0);
        } else {
            for (d, v) in dst.iter_mut().zip(kernel(row)) {
                *d = row_comp(v) as i16;
            }
        }
    }
}

fn rows_only<const N: usize>(
    coeffs: &[i32],
    out: &mut [i16],
    pitch: usize,
    kernel: fn([i32; N]) -> [i32; N],
    comp: fn(i32) -> i32,
) {
    for r in 0..N {
        let dst = &mut out[r * pitch..r * pitch + N];
        let mut row = [0i32; N];
        row.copy_from_slice(&coeffs[r * N..r * N + N]);
        if row.iter().all(|&v| v == 0) {
            dst.fill(0);
        } else {
            for (d, v) in dst.iter_mut().zip(kernel(row)) {
                *d = comp(v) as i16;
            }
        }
    }
}

fn cols_only<const N: usize>(
    coeffs: &[i32],
    out: &mut [i16],
    pitch: usize,
    flags: &[bool],
    kernel: fn([i32; N]) -> [i32; N],
    comp: fn(i32) -> i32,
) {
    for i in 0..N {
        if flags[i] {
            let mut col = [0i32; N];
            for (k, c) in col.iter_mut().enumerate() {
                *c = coeffs[i + k * N];
            }
            for (k, v) in kernel(col).into_iter().enumerate() {
                out[k * pitch + i] = comp(v) as i16;
            }
        } else {
            for k in 0..N {
                out[k * pitch + i] = 0;
            }
        }
    }
}

fn slant_part4(s1: i32, s2: i32) -> (i32, i32) {
    (s2 + ((s1 * 4 - s2 + 4) >> 3), s1 + ((-s1 - s2 * 4 + 4) >> 3))
}

fn ireflect(s1: i32, s2: i32) -> (i32, i32) {
    (((s1 + s2 * 2 + 2) >> 2) + s1, ((s1 * 2 - s2 + 2) >> 2) - s2)
}

fn bfly(s1: i32, s2: i32) -> (i32, i32) {
    (s1 + s2, s1 - s2)
}

fn slant8(input: [i32; 8]) -> [i32; 8] {
    let [s1, s4, s8, s5, s2, s6, s3, s7] = input;

    let (t4, t5) = slant_part4(s4, s5);

    let (t1, t5) = bfly(s1, t5);
    let (t2, t6) = bfly(s2, s6);
    let (t7, t3) = bfly(s7, s3);
    let (t4, t8) = bfly(t4, s8);

    let (t1, t2) = bfly(t1, t2);
    let (t4, t3) = ireflect(t4, t3);
    let (t5, t6) = bfly(t5, t6);
    let (t8, t7) = ireflect(t8, t7);
    let (t1, t4) = bfly(t1, t4);
    let (t2, t3) = bfly(t2, t3);
    let (t5, t8) = bfly(t5, t8);
    let (t6, t7) = bfly(t6, t7);

    [t1, t2, t3, t4, t5, t6, t7, t8]
}

fn slant4(input: [i32; 4]) -> [i32; 4] {
    let [s1, s4, s2, s3] = input;

    let (t1, t2) = bfly(s1, s2);
    let (t4, t3) = ireflect(s4, s3);
    let (t1, t4) = bfly(t1, t4);
    let (t2, t3) = bfly(t2, t3);

    [t1, t2, t3, t4]
}

fn haar_bfly(s1: i32, s2: i32) -> (i32, i32) {
    ((s1 + s2) >> 1, (s1 - s2) >> 1)
}

fn haar8(input: [i32; 8]) -> [i32; 8] {
    let [s1, s5, s3, s7, s2, s4, s6, s8] = input;

    let (t1, t5) = haar_bfly(s1 << 1, s5 << 1);
    let (t1, t3) = haar_bfly(t1, s3);
    let (t5, t7) = haar_bfly(t5, s7);
    let (t1, t2) = haar_bfly(t1, s2);
    let (t3, t4) = haar_bfly(t3, s4);
    let (t5, t6) = haar_bfly(t5, s6);
    let (t7, t8) = haar_bfly(t7, s8);

    [t1, t2, t3, t4, t5, t6, t7, t8]
}

fn haar4(input: [i32; 4]) -> [i32; 4] {
    let [s1, s3, s5, s7] = input;

    let (t0, t1) = haar_bfly(s1, s3);
    let (d1, d2) = haar_bfly(t0, s5);
    let (d3, d4) = haar_bfly(t1, s7);

    [d1, d2, d3, d4]
}
