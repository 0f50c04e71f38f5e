//! Output composition: biasing single-band planes into 8-bit samples and
//! recombining the four wavelet bands of a scalable luma plane.

fn clip_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Converts a single-band plane to 8-bit samples.
pub fn output_plane(src: &[i16], src_pitch: usize, width: usize, height: usize, dst: &mut [u8], dst_pitch: usize) {
    for y in 0..height {
        let src_row = &src[y * src_pitch..y * src_pitch + width];
        let dst_row = &mut dst[y * dst_pitch..y * dst_pitch + width];
        for (d, &s) in dst_row.iter_mut().zip(src_row) {
            *d = clip_u8(s as i32 + 128);
        }
    }
}

/// The four half-resolution subbands of a plane, in LL, HL, LH, HH order.
pub struct Subbands<'a> {
    pub bufs: [&'a [i16]; 4],
    pub pitch: usize,
}

/// Writes a 2x2 output quad, dropping samples past the plane edge.
fn put_quad(dst: &mut [u8], dst_pitch: usize, x: usize, y: usize, width: usize, height: usize, p: [i32; 4]) {
    let coords = [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)];
    for ((cx, cy), v) in coords.into_iter().zip(p) {
        if cx < width && cy < height {
            dst[cy * dst_pitch + cx] = clip_u8(v);
        }
    }
}

/// 5/3 wavelet recomposition of a `width`x`height` plane.
pub fn recompose53(bands: &Subbands, width: usize, height: usize, dst: &mut [u8], dst_pitch: usize) {
    let pitch = bands.pitch as isize;
    let [b0, b1, b2, b3] = bands.bufs;
    let at = |b: &[i16], idx: isize| b[idx as usize] as i32;

    for (row, y) in (0..height).step_by(2).enumerate() {
        let base = row as isize * pitch;
        let below = if y + 2 >= height { 0 } else { pitch };
        let above = if y == 0 { 0 } else { -pitch };

        for (indx, x) in (0..width).step_by(2).enumerate() {
            let c = base + indx as isize;
            let n = if x + 2 >= width { c } else { c + 1 };
            let l = if indx == 0 { c } else { c - 1 };

            // LL: lowpass in both directions
            let a = at(b0, c);
            let a_n = at(b0, n);
            let a_d = at(b0, c + below);
            let a_dn = at(b0, n + below);
            let mut p0 = a << 4;
            let mut p1 = (a + a_n) << 3;
            let mut p2 = (a + a_d) << 3;
            let mut p3 = (a + a_n + a_d + a_dn) << 2;

            // HL: vertical highpass, horizontal lowpass
            let hpf1 = |i: isize| at(b1, i + above) - at(b1, i) * 6 + at(b1, i + below);
            let t0 = at(b1, c);
            let t1 = at(b1, c + above);
            let t2 = t1 - t0 * 6 + hpf1(c);
            p0 += (t0 + t1) << 3;
            p1 += (t0 + t1 + at(b1, n + above) + at(b1, n)) << 2;
            p2 += t2 << 2;
            p3 += (t2 + hpf1(n)) << 1;

            // LH: vertical lowpass, horizontal highpass
            let t0 = at(b2, l) + at(b2, c);
            let t1 = at(b2, l) - at(b2, c) * 6 + at(b2, n);
            p0 += t0 << 3;
            p1 += t1 << 2;
            p2 += (t0 + at(b2, l + below) + at(b2, c + below)) << 2;
            p3 += (t1 + at(b2, l + below) - at(b2, c + below) * 6 + at(b2, n + below)) << 1;

            // HH: highpass in both directions
            let hpf3 = |i: isize| at(b3, i + above) - at(b3, i) * 6 + at(b3, i + below);
            let t0 = at(b3, l + above) + at(b3, l);
            let t1 = at(b3, c + above) + at(b3, c);
            let t2 = at(b3, n + above) + at(b3, n);
            p0 += (t0 + t1) << 2;
            p1 += (t0 - t1 * 6 + t2) << 1;
            p2 += (hpf3(l) + hpf3(c)) << 1;
            p3 += hpf3(l) - hpf3(c) * 6 + hpf3(n);

            put_quad(
                dst,
                dst_pitch,
                x,
                y,
                width,
                height,
                [(p0 >> 6) + 128, (p1 >> 6) + 128, (p2 >> 6) + 128, (p3 >> 6) + 128],
            );
        }
    }
}

/// Haar recomposition of a `width`x`height` plane.
pub fn recompose_haar(bands: &Subbands, width: usize, height: usize, dst: &mut [u8], dst_pitch: usize) {
    let [b0, b1, b2, b3] = bands.bufs;

    for (row, y) in (0..height).step_by(2).enumerate() {
        for (indx, x) in (0..width).step_by(2).enumerate() {
            let i = row * bands.pitch + indx;
            let (b0, b1, b2, b3) = (b0[i] as i32, b1[i] as i32, b2[i] as i32, b3[i] as i32);

            let p0 = (b0 + b1 + b2 + b3 + 2) >> 2;
            let p1 = (b0 + b1 - b2 - b3 + 2) >> 2;
            let p2 = (b0 - b1 + b2 - b3 + 2) >> 2;
            let p3 = (b0 - b1 - b2 + b3 + 2) >> 2;

            put_quad(dst, dst_pitch, x, y, width, height, [p0 + 128, p1 + 128, p2 + 128, p3 + 128]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_plane_bias_and_clip() {
        let src = [-128i16, 0, 127, 300, -500, 5, 0, 0];
        let mut dst = [0u8; 6];
        output_plane(&src, 4, 3, 2, &mut dst, 3);
        assert_eq!(dst, [0, 128, 255, 0, 133, 128]);
    }

    #[test]
    fn test_recompose53_flat_lowpass() {
        // flat LL of 64 reconstructs to 16 above the bias
        let pitch = 4;
        let ll = vec![64i16; pitch * 4];
        let zero = vec![0i16; pitch * 4];
        let bands = Subbands {
            bufs: [&ll[..], &zero[..], &zero[..], &zero[..]],
            pitch,
        };
        let mut dst = vec![0u8; 8 * 8];
        recompose53(&bands, 8, 8, &mut dst, 8);
        assert!(dst.iter().all(|&v| v == 128 + 16), "{:?}", dst);
    }

    #[test]
    fn test_recompose53_odd_size() {
        let pitch = 4;
        let zero = vec![0i16; pitch * 4];
        let bands = Subbands {
            bufs: [&zero[..], &zero[..], &zero[..], &zero[..]],
            pitch,
        };
        let mut dst = vec![7u8; 7 * 5];
        recompose53(&bands, 7, 5, &mut dst, 7);
        assert!(dst.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_recompose_haar() {
        let pitch = 2;
        let b0 = vec![40i16; 4];
        let b1 = vec![8i16; 4];
        let zero = vec![0i16; 4];
        let bands = Subbands {
            bufs: [&b0[..], &b1[..], &zero[..], &zero[..]],
            pitch,
        };
        let mut dst = vec![0u8; 16];
        recompose_haar(&bands, 4, 4, &mut dst, 4);
        assert_eq!(&dst[0..2], &[128 + 12, 128 + 12]);
        assert_eq!(&dst[4..6], &[128 + 8, 128 + 8]);
    }
}
