//! Group compression
//!
//! Each group's member bitmaps are converted to byte-aligned rows,
//! concatenated and compressed with raw DEFLATE at maximum level. Groups never
//! share a dictionary, so the device can inflate any one group on its own.
//!
//! Glyph records are rebuilt in a second pass: every glyph's `data_offset`
//! becomes its packed offset within its own group.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use rayon::prelude::*;

use epdfont_common::formats::GlyphRecord;
use epdfont_common::{to_byte_aligned, BitDepth};

use crate::error::CompileError;
use crate::grouping::GroupPlan;
use crate::model::GroupDescriptor;
use crate::raster::PackedGlyph;

/// Raw (headerless) DEFLATE at maximum compression
pub fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inverse of [`deflate`]
pub fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Compressed bitmap region with its rebuilt glyph table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedGroups {
    /// Concatenated compressed groups, in group order
    pub bitmap: Vec<u8>,
    /// Glyph records with group-relative offsets
    pub glyphs: Vec<GlyphRecord>,
    pub groups: Vec<GroupDescriptor>,
    /// Total packed size before compression
    pub packed_size: usize,
}

struct GroupPayload {
    compressed: Vec<u8>,
    uncompressed_size: usize,
}

pub fn compress_groups(
    glyphs: &[PackedGlyph],
    plan: &GroupPlan,
    depth: BitDepth,
) -> Result<CompressedGroups, CompileError> {
    // Pass 1: group-relative packed offsets
    let mut offsets = vec![0u32; glyphs.len()];
    for members in &plan.groups {
        let mut within = 0u32;
        for &index in members {
            offsets[index] = within;
            within += glyphs[index].packed.len() as u32;
        }
    }

    let payloads = plan
        .groups
        .par_iter()
        .enumerate()
        .map(|(group, members)| -> Result<GroupPayload, CompileError> {
            let aligned: Vec<u8> = members
                .iter()
                .flat_map(|&index| {
                    let record = &glyphs[index].record;
                    to_byte_aligned(
                        &glyphs[index].packed,
                        record.width as usize,
                        record.height as usize,
                        depth,
                    )
                })
                .collect();
            let compressed =
                deflate(&aligned).map_err(|source| CompileError::Compression { group, source })?;
            Ok(GroupPayload {
                compressed,
                uncompressed_size: aligned.len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut bitmap = Vec::new();
    let mut descriptors = Vec::with_capacity(payloads.len());
    for (payload, members) in payloads.iter().zip(&plan.groups) {
        descriptors.push(GroupDescriptor {
            compressed_offset: to_u32("compressedOffset", bitmap.len())?,
            compressed_size: to_u32("compressedSize", payload.compressed.len())?,
            uncompressed_size: to_u32("uncompressedSize", payload.uncompressed_size)?,
            glyph_count: to_u32("glyphCount", members.len())?,
            first_glyph_index: to_u32("firstGlyphIndex", members.first().copied().unwrap_or(0))?,
        });
        bitmap.extend_from_slice(&payload.compressed);
    }

    // Pass 2: fresh glyph table with final offsets
    let records = glyphs
        .iter()
        .zip(&offsets)
        .map(|(glyph, &data_offset)| GlyphRecord {
            data_offset,
            ..glyph.record
        })
        .collect();

    Ok(CompressedGroups {
        bitmap,
        glyphs: records,
        groups: descriptors,
        packed_size: glyphs.iter().map(|g| g.packed.len()).sum(),
    })
}

fn to_u32(field: &'static str, value: usize) -> Result<u32, CompileError> {
    u32::try_from(value).map_err(|_| {
        CompileError::Format(epdfont_common::FormatError::OutOfRange {
            field,
            value: value as i64,
            ty: "u32",
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_by_script;
    use epdfont_common::{aligned_len, to_packed};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn glyph(codepoint: u32, width: u8, height: u8, fill: u8) -> PackedGlyph {
        let len = epdfont_common::packed_len(width as usize, height as usize, BitDepth::Two);
        PackedGlyph {
            record: GlyphRecord {
                width,
                height,
                data_length: len as u16,
                codepoint,
                ..Default::default()
            },
            packed: vec![fill; len],
        }
    }

    #[test]
    fn test_deflate_roundtrip() {
        let mut rng = Pcg32::seed_from_u64(42);
        for len in [0usize, 1, 17, 4096] {
            let data: Vec<u8> = (0..len).map(|_| rng.random_range(0..4u8) * 0x55).collect();
            assert_eq!(inflate(&deflate(&data).unwrap()).unwrap(), data);
        }
    }

    #[test]
    fn test_deflate_is_raw() {
        // zlib streams start with 0x78; raw DEFLATE of a short block does not
        let compressed = deflate(b"aaaaaaaaaaaaaaaa").unwrap();
        assert_ne!(compressed[0], 0x78);
    }

    #[test]
    fn test_group_offsets_restart() {
        let glyphs = vec![
            glyph(0x41, 5, 3, 0xFF),
            glyph(0x42, 3, 3, 0xAA),
            glyph(0xE9, 6, 2, 0x55),
            glyph(0xEA, 0, 0, 0),
            glyph(0xEB, 7, 1, 0xF0),
        ];
        let codepoints: Vec<u32> = glyphs.iter().map(|g| g.record.codepoint).collect();
        let plan = group_by_script(&codepoints);
        let compressed = compress_groups(&glyphs, &plan, BitDepth::Two).unwrap();

        assert_eq!(compressed.groups.len(), 2);
        let offsets: Vec<u32> = compressed.glyphs.iter().map(|g| g.data_offset).collect();
        // 5x3 → 4 bytes, 3x3 → 3 bytes; 6x2 → 3 bytes, 0x0 → 0 bytes
        assert_eq!(offsets, vec![0, 4, 0, 3, 3]);

        let first = compressed.groups[0];
        assert_eq!(first.compressed_offset, 0);
        assert_eq!(first.glyph_count, 2);
        assert_eq!(first.uncompressed_size as usize, aligned_len(5, 3, BitDepth::Two) + aligned_len(3, 3, BitDepth::Two));
        let second = compressed.groups[1];
        assert_eq!(second.compressed_offset, first.compressed_size);
        assert_eq!(second.first_glyph_index, 2);
        assert_eq!(compressed.bitmap.len() as u32, first.compressed_size + second.compressed_size);
    }

    #[test]
    fn test_group_payload_restores_packed_bitmaps() {
        let mut rng = Pcg32::seed_from_u64(7);
        let glyphs: Vec<PackedGlyph> = (0..20u32)
            .map(|i| {
                let (w, h) = (rng.random_range(1..12u8), rng.random_range(1..12u8));
                let mut g = glyph(0x41 + i, w, h, 0);
                let samples: Vec<u8> = (0..w as usize * h as usize)
                    .map(|_| rng.random_range(0..16u8))
                    .collect();
                g.packed = epdfont_common::pack_glyph(&samples, w as usize, h as usize, BitDepth::Two);
                g
            })
            .collect();
        let codepoints: Vec<u32> = glyphs.iter().map(|g| g.record.codepoint).collect();
        let plan = group_by_script(&codepoints);
        let compressed = compress_groups(&glyphs, &plan, BitDepth::Two).unwrap();

        let group = compressed.groups[0];
        let payload = inflate(&compressed.bitmap[..group.compressed_size as usize]).unwrap();
        assert_eq!(payload.len(), group.uncompressed_size as usize);

        let mut cursor = 0;
        for glyph in &glyphs {
            let (w, h) = (glyph.record.width as usize, glyph.record.height as usize);
            let len = aligned_len(w, h, BitDepth::Two);
            let packed = to_packed(&payload[cursor..cursor + len], w, h, BitDepth::Two);
            assert_eq!(packed, glyph.packed);
            cursor += len;
        }
    }
}
