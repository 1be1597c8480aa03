//! Glyph bitmap packing
//!
//! Converts renderer coverage into the pixel formats the firmware draws from:
//! - 8-bit coverage → 4-bit samples (top nibble)
//! - 4-bit samples → 1-bit or 2-bit levels, packed MSB-first
//! - packed (continuous bitstream) ↔ byte-aligned (every row starts on a byte)
//!
//! Packed bitmaps have no row padding: the first pixel of row `y + 1` follows
//! the last pixel of row `y` in the same byte. Byte-aligned bitmaps only exist
//! inside compressed groups, where identical rows must produce identical bytes
//! regardless of their horizontal bit offset.

// ============================================================================
// Bit Depth
// ============================================================================

/// Pixel bit depth of a compiled font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    /// Black and white, 8 pixels per byte
    One,
    /// Four gray levels (white, light, dark, black), 4 pixels per byte
    Two,
}

impl BitDepth {
    /// Depth selected by the `is2Bit` flag stored in font records
    pub const fn from_is_2bit(is_2bit: bool) -> Self {
        if is_2bit {
            BitDepth::Two
        } else {
            BitDepth::One
        }
    }

    /// Bits per pixel
    #[inline]
    pub const fn bits(self) -> usize {
        match self {
            BitDepth::One => 1,
            BitDepth::Two => 2,
        }
    }

    #[inline]
    pub const fn is_2bit(self) -> bool {
        matches!(self, BitDepth::Two)
    }

    /// Largest level a pixel can hold (also the per-pixel bit mask)
    #[inline]
    pub const fn max_level(self) -> u8 {
        (1u8 << self.bits()) - 1
    }

    /// Quantize a 4-bit sample (0-15) to a pixel level of this depth
    ///
    /// 1-bit: set when any of the sample's top three bits is set (≥ 2/15).
    /// 2-bit: 0-3 white, 4-7 light gray, 8-11 dark gray, 12-15 black.
    #[inline]
    pub const fn quantize(self, sample: u8) -> u8 {
        match self {
            BitDepth::One => ((sample & 0x0E) != 0) as u8,
            BitDepth::Two => {
                if sample >= 12 {
                    3
                } else if sample >= 8 {
                    2
                } else if sample >= 4 {
                    1
                } else {
                    0
                }
            }
        }
    }
}

// ============================================================================
// Sizes
// ============================================================================

/// Size in bytes of a packed bitmap (continuous bitstream, no row padding)
#[inline]
pub const fn packed_len(width: usize, height: usize, depth: BitDepth) -> usize {
    (width * height * depth.bits()).div_ceil(8)
}

/// Bytes per row of a byte-aligned bitmap
#[inline]
pub const fn row_stride(width: usize, depth: BitDepth) -> usize {
    (width * depth.bits()).div_ceil(8)
}

/// Size in bytes of a byte-aligned bitmap
#[inline]
pub const fn aligned_len(width: usize, height: usize, depth: BitDepth) -> usize {
    row_stride(width, depth) * height
}

// ============================================================================
// Pixel Access
// ============================================================================

/// Read the level of pixel `index` from an MSB-first bitstream
#[inline]
fn read_level(data: &[u8], index: usize, depth: BitDepth) -> u8 {
    let bits = depth.bits();
    let bit = index * bits;
    let shift = 8 - bits - bit % 8;
    (data[bit / 8] >> shift) & depth.max_level()
}

/// OR the level of pixel `index` into an MSB-first bitstream
#[inline]
fn write_level(data: &mut [u8], index: usize, level: u8, depth: BitDepth) {
    let bits = depth.bits();
    let bit = index * bits;
    let shift = 8 - bits - bit % 8;
    data[bit / 8] |= (level & depth.max_level()) << shift;
}

// ============================================================================
// Packing
// ============================================================================

/// Reduce 8-bit renderer coverage to one 4-bit sample per pixel
///
/// The renderer works at 3-bit effective precision, so only the top nibble of
/// each coverage byte carries information.
pub fn coverage_to_samples(coverage: &[u8]) -> Vec<u8> {
    coverage.iter().map(|&value| value >> 4).collect()
}

/// Quantize row-major 4-bit samples and pack them MSB-first with no row padding
///
/// Missing samples (a short buffer) are treated as white. Trailing bits of the
/// last byte are always zero.
pub fn pack_glyph(samples: &[u8], width: usize, height: usize, depth: BitDepth) -> Vec<u8> {
    let mut packed = vec![0u8; packed_len(width, height, depth)];
    for (index, &sample) in samples.iter().take(width * height).enumerate() {
        let level = depth.quantize(sample);
        if level != 0 {
            write_level(&mut packed, index, level, depth);
        }
    }
    packed
}

/// Convert a packed bitmap to byte-aligned rows, zero-padding each row's last byte
///
/// # Panics
/// If `packed` is shorter than [`packed_len`] for the given dimensions.
pub fn to_byte_aligned(packed: &[u8], width: usize, height: usize, depth: BitDepth) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let stride = row_stride(width, depth);
    let mut aligned = vec![0u8; stride * height];
    for (y, row) in aligned.chunks_exact_mut(stride).enumerate() {
        for x in 0..width {
            let level = read_level(packed, y * width + x, depth);
            if level != 0 {
                write_level(row, x, level, depth);
            }
        }
    }
    aligned
}

/// Convert byte-aligned rows back to a packed bitmap (inverse of [`to_byte_aligned`])
///
/// # Panics
/// If `aligned` is shorter than [`aligned_len`] for the given dimensions.
pub fn to_packed(aligned: &[u8], width: usize, height: usize, depth: BitDepth) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let stride = row_stride(width, depth);
    let mut packed = vec![0u8; packed_len(width, height, depth)];
    for (y, row) in aligned.chunks_exact(stride).take(height).enumerate() {
        for x in 0..width {
            let level = read_level(row, x, depth);
            if level != 0 {
                write_level(&mut packed, y * width + x, level, depth);
            }
        }
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    #[test]
    fn test_quantize_2bit_thresholds() {
        let levels: Vec<u8> = (0..16).map(|s| BitDepth::Two.quantize(s)).collect();
        assert_eq!(
            levels,
            vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]
        );
    }

    #[test]
    fn test_quantize_1bit_threshold() {
        assert_eq!(BitDepth::One.quantize(0), 0);
        assert_eq!(BitDepth::One.quantize(1), 0);
        for sample in 2..16 {
            assert_eq!(BitDepth::One.quantize(sample), 1, "sample {}", sample);
        }
    }

    #[test]
    fn test_coverage_to_samples_keeps_top_nibble() {
        assert_eq!(coverage_to_samples(&[0x00, 0x1F, 0x20, 0xFF]), vec![0, 1, 2, 15]);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(packed_len(3, 3, BitDepth::One), 2); // 9 bits
        assert_eq!(packed_len(3, 3, BitDepth::Two), 3); // 18 bits
        assert_eq!(row_stride(3, BitDepth::One), 1);
        assert_eq!(row_stride(5, BitDepth::Two), 2);
        assert_eq!(aligned_len(5, 4, BitDepth::Two), 8);
        assert_eq!(packed_len(0, 10, BitDepth::Two), 0);
        assert_eq!(aligned_len(10, 0, BitDepth::One), 0);
    }

    #[test]
    fn test_pack_1bit_flows_across_rows() {
        // 3×3 fully black: 9 bits set, MSB first
        let packed = pack_glyph(&[15; 9], 3, 3, BitDepth::One);
        assert_eq!(packed, vec![0xFF, 0x80]);

        let aligned = to_byte_aligned(&packed, 3, 3, BitDepth::One);
        assert_eq!(aligned, vec![0xE0, 0xE0, 0xE0]);
    }

    #[test]
    fn test_pack_2bit_levels() {
        // One row of four pixels: white, light, dark, black
        let packed = pack_glyph(&[0, 5, 9, 13], 4, 1, BitDepth::Two);
        assert_eq!(packed, vec![0b00_01_10_11]);
    }

    #[test]
    fn test_pack_2bit_row_padding() {
        // 3×2 black: 12 bits of 1s packed, two 6-bit rows aligned
        let packed = pack_glyph(&[15; 6], 3, 2, BitDepth::Two);
        assert_eq!(packed, vec![0xFF, 0xF0]);

        let aligned = to_byte_aligned(&packed, 3, 2, BitDepth::Two);
        assert_eq!(aligned, vec![0xFC, 0xFC]);
        assert_eq!(to_packed(&aligned, 3, 2, BitDepth::Two), packed);
    }

    #[test]
    fn test_identical_rows_align_identically() {
        // Width 5 at 2-bit: rows start at different bit offsets when packed
        let row = [15, 0, 8, 4, 15];
        let samples: Vec<u8> = row.iter().cycle().take(5 * 3).copied().collect();
        let packed = pack_glyph(&samples, 5, 3, BitDepth::Two);
        let aligned = to_byte_aligned(&packed, 5, 3, BitDepth::Two);

        let stride = row_stride(5, BitDepth::Two);
        assert_eq!(aligned[0..stride], aligned[stride..2 * stride]);
        assert_eq!(aligned[0..stride], aligned[2 * stride..3 * stride]);
    }

    #[test]
    fn test_empty_glyph() {
        assert!(pack_glyph(&[], 0, 0, BitDepth::Two).is_empty());
        assert!(to_byte_aligned(&[], 0, 7, BitDepth::Two).is_empty());
        assert!(to_packed(&[], 7, 0, BitDepth::One).is_empty());
    }

    #[test]
    fn test_alignment_roundtrip_all_dimensions() {
        let mut rng = Pcg32::seed_from_u64(0x5eed);
        for depth in [BitDepth::One, BitDepth::Two] {
            for width in 0..24 {
                for height in 0..12 {
                    let samples: Vec<u8> = (0..width * height)
                        .map(|_| rng.random_range(0..16u8))
                        .collect();
                    let packed = pack_glyph(&samples, width, height, depth);
                    assert_eq!(packed.len(), packed_len(width, height, depth));

                    let aligned = to_byte_aligned(&packed, width, height, depth);
                    assert_eq!(aligned.len(), aligned_len(width, height, depth));
                    assert_eq!(
                        to_packed(&aligned, width, height, depth),
                        packed,
                        "{:?} {}x{}",
                        depth,
                        width,
                        height
                    );
                }
            }
        }
    }
}
