//! Coefficient scan orders.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    ZigZag8x8,
    Vertical8x8,
    Horizontal8x8,
    Direct4x4,
}

impl ScanOrder {
    pub fn table(&self) -> &'static [u8] {
        match self {
            Self::ZigZag8x8 => &ZIGZAG_8X8,
            Self::Vertical8x8 => &VERTICAL_8X8,
            Self::Horizontal8x8 => &HORIZONTAL_8X8,
            Self::Direct4x4 => &DIRECT_4X4,
        }
    }
}

pub const ZIGZAG_8X8: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

pub const VERTICAL_8X8: [u8; 64] = [
    0, 8, 16, 24, 32, 40, 48, 56, 1, 9, 17, 25, 33, 41, 49, 57, 2, 10, 18, 26, 34, 42, 50, 58, 3,
    11, 19, 27, 35, 43, 51, 59, 4, 12, 20, 28, 36, 44, 52, 60, 5, 13, 21, 29, 37, 45, 53, 61, 6,
    14, 22, 30, 38, 46, 54, 62, 7, 15, 23, 31, 39, 47, 55, 63,
];

pub const HORIZONTAL_8X8: [u8; 64] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49,
    50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63,
];

pub const DIRECT_4X4: [u8; 16] = [0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scans_are_permutations() {
        for scan in [
            ScanOrder::ZigZag8x8,
            ScanOrder::Vertical8x8,
            ScanOrder::Horizontal8x8,
            ScanOrder::Direct4x4,
        ] {
            let tab = scan.table();
            let mut seen = vec![false; tab.len()];
            for &p in tab {
                assert!(!seen[p as usize]);
                seen[p as usize] = true;
            }
        }
    }
}
