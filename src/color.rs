//! YUV 4:1:0 to RGB conversion for decoded pictures.

use crate::decoder::Picture;

fn clip(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// BT.601 studio-range conversion of one sample.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = 298 * (y as i32 - 16);
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    [
        clip((c + 409 * e + 128) >> 8),
        clip((c - 100 * d - 208 * e + 128) >> 8),
        clip((c + 516 * d + 128) >> 8),
    ]
}

impl Picture {
    /// Interleaved RGB24, chroma upsampled by nearest neighbour.
    pub fn to_rgb24(&self) -> Vec<u8> {
        let pitch = self.chroma_pitch();
        let mut out = Vec::with_capacity(self.width * self.height * 3);

        for (y, row) in self.y.chunks_exact(self.width).take(self.height).enumerate() {
            let c_row = (y >> 2) * pitch;
            for (x, &luma) in row.iter().enumerate() {
                let ci = c_row + (x >> 2);
                out.extend_from_slice(&yuv_to_rgb(luma, self.u[ci], self.v[ci]));
            }
        }
        out
    }
}
