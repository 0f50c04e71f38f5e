//! Block motion compensation with optional half-pixel interpolation.

use crate::error::Indeo5Error;

/// How the predicted block is combined with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McOp {
    /// Overwrite; used for blocks without a coded residual.
    Put,
    /// Accumulate onto an already reconstructed residual.
    Add,
}

/// Interpolation selected by the fractional parts of a halfpel vector:
/// bit 0 horizontal, bit 1 vertical.
pub fn mc_type(mv_x: i32, mv_y: i32) -> u32 {
    (((mv_y & 1) << 1) | (mv_x & 1)) as u32
}

/// Predicts a `size`x`size` block at `offs` of `dst` from `reference`
/// displaced by the full-pixel vector (`mv_x`, `mv_y`).
#[allow(clippy::too_many_arguments)]
pub fn motion_compensate(
    op: McOp,
    size: usize,
    dst: &mut [i16],
    reference: &[i16],
    offs: usize,
    mv_x: i32,
    mv_y: i32,
    mc_type: u32,
    pitch: usize,
) -> Result<(), Indeo5Error> {
    let ref_offs = offs as isize + mv_y as isize * pitch as isize + mv_x as isize;
    let footprint = pitch * (size - 1) + size;
    let extra = if mc_type > 1 { pitch } else { 0 } + (mc_type & 1) as usize;

    if ref_offs < 0
        || offs + footprint > dst.len()
        || ref_offs as usize + footprint + extra > reference.len()
    {
        return Err(Indeo5Error::BlockOutOfBounds);
    }
    let ref_offs = ref_offs as usize;

    for i in 0..size {
        let row = offs + i * pitch;
        let r0 = ref_offs + i * pitch;
        let r1 = r0 + pitch;
        for j in 0..size {
            let a = reference[r0 + j] as i32;
            let pred = match mc_type {
                0 => a,
                1 => (a + reference[r0 + j + 1] as i32) >> 1,
                2 => (a + reference[r1 + j] as i32) >> 1,
                _ => {
                    (a + reference[r0 + j + 1] as i32
                        + reference[r1 + j] as i32
                        + reference[r1 + j + 1] as i32)
                        >> 2
                }
            };
            match op {
                McOp::Put => dst[row + j] = pred as i16,
                McOp::Add => dst[row + j] = dst[row + j].wrapping_add(pred as i16),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<i16> {
        (0..len).map(|v| (v % 97) as i16 - 40).collect()
    }

    #[test]
    fn test_zero_vector_put_copies_reference() {
        let pitch = 16;
        let reference = ramp(pitch * 16);
        let mut dst = vec![0i16; pitch * 16];
        let offs = 4 * pitch + 8;
        motion_compensate(McOp::Put, 8, &mut dst, &reference, offs, 0, 0, 0, pitch).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let p = offs + y * pitch + x;
                assert_eq!(dst[p], reference[p]);
            }
        }
        assert_eq!(dst[0], 0);
    }

    #[test]
    fn test_add_accumulates() {
        let pitch = 8;
        let reference = vec![3i16; 64];
        let mut dst = vec![2i16; 64];
        motion_compensate(McOp::Add, 4, &mut dst, &reference, 0, 1, 1, 0, pitch).unwrap();
        assert_eq!(dst[0], 5);
        assert_eq!(dst[3 * pitch + 3], 5);
        assert_eq!(dst[4], 2);
    }

    #[test]
    fn test_halfpel_averages() {
        let pitch = 8;
        let mut reference = vec![0i16; 64];
        for y in 0..8 {
            for x in 0..8 {
                reference[y * pitch + x] = (x * 2 + y * 20) as i16;
            }
        }
        let mut dst = vec![0i16; 64];
        motion_compensate(McOp::Put, 4, &mut dst, &reference, 0, 0, 0, 1, pitch).unwrap();
        assert_eq!(dst[0], 1);
        motion_compensate(McOp::Put, 4, &mut dst, &reference, 0, 0, 0, 2, pitch).unwrap();
        assert_eq!(dst[0], 10);
        motion_compensate(McOp::Put, 4, &mut dst, &reference, 0, 0, 0, 3, pitch).unwrap();
        assert_eq!(dst[0], 11);
    }

    #[test]
    fn test_out_of_bounds() {
        let reference = vec![0i16; 64];
        let mut dst = vec![0i16; 64];
        assert_eq!(
            motion_compensate(McOp::Put, 8, &mut dst, &reference, 0, -1, 0, 0, 8).err(),
            Some(Indeo5Error::BlockOutOfBounds)
        );
        assert_eq!(
            motion_compensate(McOp::Put, 8, &mut dst, &reference, 0, 0, 0, 1, 8).err(),
            Some(Indeo5Error::BlockOutOfBounds)
        );
    }

    #[test]
    fn test_mc_type() {
        assert_eq!(mc_type(4, 6), 0);
        assert_eq!(mc_type(3, 6), 1);
        assert_eq!(mc_type(-2, -1), 2);
        assert_eq!(mc_type(-1, 1), 3);
    }
}
