//! Glyph rasterization and packing
//!
//! Renders every planned codepoint through the fallback stack and packs the
//! coverage into the continuous 1-bit or 2-bit bitstream. Each glyph's
//! `data_offset` is the running byte count of all earlier glyphs.

use rayon::prelude::*;
use tracing::debug;

use epdfont_common::formats::{glyph_codepoints, CodepointInterval, GlyphRecord};
use epdfont_common::{coverage_to_samples, pack_glyph, packed_len, BitDepth};

use crate::error::CompileError;
use crate::face::{norm_floor, FontStack, RenderedGlyph};

/// A packed glyph bitmap and its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedGlyph {
    pub record: GlyphRecord,
    pub packed: Vec<u8>,
}

/// Rasterize every codepoint of `intervals`, in interval order
pub fn rasterize(
    stack: &FontStack,
    intervals: &[CodepointInterval],
    px: f32,
    depth: BitDepth,
) -> Result<Vec<PackedGlyph>, CompileError> {
    let codepoints: Vec<u32> = glyph_codepoints(intervals).collect();

    let mut glyphs = codepoints
        .par_iter()
        .map(|&codepoint| {
            let rendered = stack
                .render(codepoint, px)
                .ok_or(CompileError::MissingGlyph { codepoint })?;
            pack_rendered(codepoint, &rendered, depth)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut offset = 0u32;
    for glyph in &mut glyphs {
        glyph.record.data_offset = offset;
        offset += glyph.packed.len() as u32;
    }
    debug!("Rasterized {} glyphs, {} packed bytes", glyphs.len(), offset);

    Ok(glyphs)
}

/// Quantize and pack one rendered glyph (offset left at 0)
pub fn pack_rendered(
    codepoint: u32,
    rendered: &RenderedGlyph,
    depth: BitDepth,
) -> Result<PackedGlyph, CompileError> {
    let (width, height) = (rendered.width as usize, rendered.height as usize);
    if rendered.coverage.len() != width * height {
        return Err(CompileError::BadCoverage {
            codepoint,
            width: rendered.width,
            height: rendered.height,
            actual: rendered.coverage.len(),
        });
    }

    let samples = coverage_to_samples(&rendered.coverage);
    let packed = pack_glyph(&samples, width, height, depth);
    debug_assert_eq!(packed.len(), packed_len(width, height, depth));

    let too_large = |field: &'static str, value: i64| CompileError::GlyphTooLarge {
        codepoint,
        field,
        value,
    };
    let advance = norm_floor(rendered.advance);

    let record = GlyphRecord {
        width: u8::try_from(rendered.width).map_err(|_| too_large("width", rendered.width.into()))?,
        height: u8::try_from(rendered.height)
            .map_err(|_| too_large("height", rendered.height.into()))?,
        advance_x: u8::try_from(advance).map_err(|_| too_large("advanceX", advance.into()))?,
        left: i16::try_from(rendered.left).map_err(|_| too_large("left", rendered.left.into()))?,
        top: i16::try_from(rendered.top).map_err(|_| too_large("top", rendered.top.into()))?,
        data_length: u16::try_from(packed.len())
            .map_err(|_| too_large("dataLength", packed.len() as i64))?,
        data_offset: 0,
        codepoint,
    };

    Ok(PackedGlyph { record, packed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stack_of, BlockFace};

    fn rendered(width: u32, height: u32, coverage: Vec<u8>) -> RenderedGlyph {
        RenderedGlyph {
            width,
            height,
            left: 1,
            top: height as i32,
            advance: 64 * (width as i32 + 1) + 63,
            coverage,
        }
    }

    #[test]
    fn test_one_bit_threshold() {
        // 0x1F → sample 1 (off), 0x20 → sample 2 (on)
        let glyph = pack_rendered(0x41, &rendered(3, 1, vec![0x1F, 0x20, 0xFF]), BitDepth::One)
            .unwrap();
        assert_eq!(glyph.packed, vec![0b0110_0000]);
        assert_eq!(glyph.record.data_length, 1);
        assert_eq!(glyph.record.advance_x, 4);
    }

    #[test]
    fn test_two_bit_levels() {
        let glyph = pack_rendered(
            0x41,
            &rendered(5, 1, vec![0x00, 0x40, 0x80, 0xC0, 0xFF]),
            BitDepth::Two,
        )
        .unwrap();
        assert_eq!(glyph.packed, vec![0b0001_1011, 0b1100_0000]);
    }

    #[test]
    fn test_bad_coverage_length() {
        let err = pack_rendered(0x41, &rendered(3, 3, vec![0; 8]), BitDepth::One).unwrap_err();
        assert!(matches!(err, CompileError::BadCoverage { actual: 8, .. }));
    }

    #[test]
    fn test_oversized_glyph_rejected() {
        let err = pack_rendered(0x41, &rendered(300, 1, vec![0; 300]), BitDepth::One).unwrap_err();
        assert!(matches!(
            err,
            CompileError::GlyphTooLarge { field: "width", .. }
        ));
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let stack = stack_of(BlockFace::new("latin", [(0x20, 0x7E)]));
        let glyphs = rasterize(
            &stack,
            &[CodepointInterval::new(0x20, 0x23)],
            20.0,
            BitDepth::Two,
        )
        .unwrap();

        assert_eq!(glyphs.len(), 4);
        assert_eq!(glyphs[0].record.codepoint, 0x20);
        assert!(glyphs[0].packed.is_empty());
        let mut expected = 0u32;
        for glyph in &glyphs {
            assert_eq!(glyph.record.data_offset, expected);
            assert_eq!(
                glyph.record.data_length as usize,
                packed_len(
                    glyph.record.width as usize,
                    glyph.record.height as usize,
                    BitDepth::Two
                )
            );
            expected += glyph.record.data_length as u32;
        }
    }

    #[test]
    fn test_missing_glyph_is_error() {
        let stack = stack_of(BlockFace::new("latin", [(0x41, 0x41)]));
        let err = rasterize(
            &stack,
            &[CodepointInterval::new(0x41, 0x42)],
            20.0,
            BitDepth::One,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MissingGlyph { codepoint: 0x42 }));
    }
}
