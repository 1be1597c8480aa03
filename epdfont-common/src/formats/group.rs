//! Compressed glyph groups and device-side glyph lookup
//!
//! A compressed font stores its bitmap as independently inflatable groups.
//! Each group decompresses to its members' byte-aligned bitmaps, concatenated
//! in ascending glyph-index order. Inflating is left to the caller; this
//! module locates a glyph inside an inflated group and repacks it.

use crate::error::FormatError;
use crate::packing::{aligned_len, to_packed, BitDepth};

use super::glyph::GlyphRecord;
use super::interval::IntervalRecord;

/// One compressed group in the bitmap region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupDescriptor {
    pub compressed_offset: u32,
    pub compressed_size: u32,
    /// Byte-aligned size after decompression
    pub uncompressed_size: u32,
    pub glyph_count: u32,
    /// First member for contiguous groups; informational for sparse ones
    pub first_glyph_index: u32,
}

/// Group table of one font, with the sparse membership table if it has one
#[derive(Debug, Clone, Copy)]
pub struct GroupIndex<'a> {
    groups: &'a [GroupDescriptor],
    glyph_to_group: Option<&'a [u16]>,
}

impl<'a> GroupIndex<'a> {
    pub fn new(groups: &'a [GroupDescriptor], glyph_to_group: Option<&'a [u16]>) -> Self {
        Self {
            groups,
            glyph_to_group,
        }
    }

    pub fn groups(&self) -> &'a [GroupDescriptor] {
        self.groups
    }

    /// Group holding `glyph`, `None` when no group claims it
    pub fn group_of(&self, glyph: usize) -> Option<usize> {
        match self.glyph_to_group {
            Some(table) => table
                .get(glyph)
                .map(|&g| g as usize)
                .filter(|&g| g < self.groups.len()),
            None => self.groups.iter().position(|desc| {
                let first = desc.first_glyph_index as usize;
                (first..first + desc.glyph_count as usize).contains(&glyph)
            }),
        }
    }

    /// Ordered glyph indices of a group
    pub fn members(&self, group: usize) -> Vec<usize> {
        if let Some(table) = self.glyph_to_group {
            return table
                .iter()
                .enumerate()
                .filter(|&(_, &id)| id as usize == group)
                .map(|(index, _)| index)
                .collect();
        }
        match self.groups.get(group) {
            Some(desc) => {
                let first = desc.first_glyph_index as usize;
                (first..first + desc.glyph_count as usize).collect()
            }
            None => Vec::new(),
        }
    }

    /// Compressed bytes of a group within the font's bitmap region
    pub fn compressed<'b>(&self, bitmap: &'b [u8], group: usize) -> Result<&'b [u8], FormatError> {
        let desc = self.groups.get(group).ok_or(FormatError::UnknownGroup {
            group,
            group_count: self.groups.len(),
        })?;
        let start = desc.compressed_offset as usize;
        let end = start + desc.compressed_size as usize;
        bitmap.get(start..end).ok_or(FormatError::Truncated {
            what: "compressed group",
            needed: end,
            actual: bitmap.len(),
        })
    }

    /// Byte-aligned offset of `glyph` within its group's inflated data
    pub fn aligned_offset(
        &self,
        glyphs: &[GlyphRecord],
        group: usize,
        glyph: usize,
        depth: BitDepth,
    ) -> usize {
        self.members(group)
            .into_iter()
            .take_while(|&member| member < glyph)
            .filter_map(|member| glyphs.get(member))
            .map(|g| aligned_len(g.width as usize, g.height as usize, depth))
            .sum()
    }

    /// Packed bitmap of `glyph`, cut from its group's inflated data
    pub fn extract_glyph(
        &self,
        glyphs: &[GlyphRecord],
        inflated: &[u8],
        glyph: usize,
        depth: BitDepth,
    ) -> Result<Vec<u8>, FormatError> {
        let record = glyphs.get(glyph).ok_or(FormatError::UnknownGlyph { glyph })?;
        let group = self.group_of(glyph).ok_or(FormatError::UnknownGlyph { glyph })?;
        let (width, height) = (record.width as usize, record.height as usize);
        let start = self.aligned_offset(glyphs, group, glyph, depth);
        let end = start + aligned_len(width, height, depth);
        let aligned = inflated.get(start..end).ok_or(FormatError::Truncated {
            what: "inflated group",
            needed: end,
            actual: inflated.len(),
        })?;
        Ok(to_packed(aligned, width, height, depth))
    }
}

/// Glyph-table index of `codepoint`, by binary search over sorted intervals
pub fn find_glyph_index(intervals: &[IntervalRecord], codepoint: u32) -> Option<usize> {
    let pos = intervals.partition_point(|interval| interval.last < codepoint);
    let interval = intervals.get(pos)?;
    (interval.first <= codepoint).then(|| (interval.offset + (codepoint - interval.first)) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::{packed_len, to_byte_aligned};

    fn glyph(width: u8, height: u8) -> GlyphRecord {
        GlyphRecord {
            width,
            height,
            data_length: packed_len(width as usize, height as usize, BitDepth::Two) as u16,
            ..Default::default()
        }
    }

    fn packed(seed: u8, record: &GlyphRecord) -> Vec<u8> {
        let len = packed_len(record.width as usize, record.height as usize, BitDepth::Two);
        let mut bytes: Vec<u8> = (0..len).map(|i| seed.wrapping_mul(31).wrapping_add(i as u8 * 7)).collect();
        // Clear trailing bits past the last pixel
        let bits = record.width as usize * record.height as usize * 2;
        if bits % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFFu8 << (8 - bits % 8);
            }
        }
        bytes
    }

    #[test]
    fn test_find_glyph_index() {
        let intervals = [
            IntervalRecord::new(0x20, 0x7E, 0),
            IntervalRecord::new(0x400, 0x45F, 95),
            IntervalRecord::new(0xFFFD, 0xFFFD, 191),
        ];
        assert_eq!(find_glyph_index(&intervals, 0x20), Some(0));
        assert_eq!(find_glyph_index(&intervals, 0x7E), Some(94));
        assert_eq!(find_glyph_index(&intervals, 0x401), Some(96));
        assert_eq!(find_glyph_index(&intervals, 0xFFFD), Some(191));
        assert_eq!(find_glyph_index(&intervals, 0x7F), None);
        assert_eq!(find_glyph_index(&intervals, 0x10000), None);
        assert_eq!(find_glyph_index(&[], 0x41), None);
    }

    #[test]
    fn test_contiguous_group_lookup() {
        let groups = [
            GroupDescriptor {
                glyph_count: 2,
                first_glyph_index: 0,
                ..Default::default()
            },
            GroupDescriptor {
                glyph_count: 3,
                first_glyph_index: 2,
                ..Default::default()
            },
        ];
        let index = GroupIndex::new(&groups, None);
        assert_eq!(index.group_of(1), Some(0));
        assert_eq!(index.group_of(4), Some(1));
        assert_eq!(index.group_of(5), None);
        assert_eq!(index.members(1), vec![2, 3, 4]);
        assert!(index.members(2).is_empty());
    }

    #[test]
    fn test_sparse_group_extracts_each_glyph() {
        let glyphs = [glyph(5, 3), glyph(4, 2), glyph(0, 0), glyph(7, 6), glyph(1, 1)];
        let bitmaps: Vec<Vec<u8>> = glyphs
            .iter()
            .enumerate()
            .map(|(i, g)| packed(i as u8 + 1, g))
            .collect();
        let glyph_to_group = [1u16, 0, 1, 1, 0];
        let groups = [GroupDescriptor::default(); 2];
        let index = GroupIndex::new(&groups, Some(&glyph_to_group));

        for group in 0..2 {
            let inflated: Vec<u8> = index
                .members(group)
                .into_iter()
                .flat_map(|g| {
                    let r = &glyphs[g];
                    to_byte_aligned(&bitmaps[g], r.width as usize, r.height as usize, BitDepth::Two)
                })
                .collect();
            for member in index.members(group) {
                let out = index.extract_glyph(&glyphs, &inflated, member, BitDepth::Two).unwrap();
                assert_eq!(out, bitmaps[member], "glyph {}", member);
            }
        }
        // 5x3 at stride 2, then the empty glyph
        assert_eq!(index.aligned_offset(&glyphs, 1, 3, BitDepth::Two), 6);
    }

    #[test]
    fn test_short_inflated_group_rejected() {
        let glyphs = [glyph(8, 4)];
        let groups = [GroupDescriptor {
            glyph_count: 1,
            ..Default::default()
        }];
        let index = GroupIndex::new(&groups, None);
        assert!(matches!(
            index.extract_glyph(&glyphs, &[0u8; 7], 0, BitDepth::Two),
            Err(FormatError::Truncated { needed: 8, .. })
        ));
        assert_eq!(
            index.extract_glyph(&glyphs, &[0u8; 8], 1, BitDepth::Two),
            Err(FormatError::UnknownGlyph { glyph: 1 })
        );
    }

    #[test]
    fn test_compressed_slice_bounds() {
        let groups = [GroupDescriptor {
            compressed_offset: 2,
            compressed_size: 3,
            ..Default::default()
        }];
        let index = GroupIndex::new(&groups, None);
        assert_eq!(index.compressed(&[0, 1, 2, 3, 4], 0).unwrap(), &[2, 3, 4]);
        assert!(index.compressed(&[0, 1, 2, 3], 0).is_err());
        assert!(matches!(
            index.compressed(&[0; 8], 1),
            Err(FormatError::UnknownGroup { group: 1, .. })
        ));
    }
}
