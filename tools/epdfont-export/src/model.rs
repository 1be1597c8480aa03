//! Format-agnostic compiled font
//!
//! The compile pipeline produces a [`CompiledFont`]; the header and `.fontbin`
//! emitters both consume it, and the verifier rebuilds one from header text.

use epdfont_common::formats::{interval_records, CodepointInterval, GlyphRecord, GroupIndex, IntervalRecord};
use epdfont_common::BitDepth;

pub use epdfont_common::formats::GroupDescriptor;

/// Face-level vertical metrics in whole pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceMetrics {
    /// Line height
    pub advance_y: i32,
    pub ascender: i32,
    pub descender: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFont {
    pub name: String,
    pub depth: BitDepth,
    /// Packed glyph data, or concatenated compressed groups
    pub bitmap: Vec<u8>,
    pub glyphs: Vec<GlyphRecord>,
    pub intervals: Vec<CodepointInterval>,
    pub metrics: FaceMetrics,
    pub groups: Option<Vec<GroupDescriptor>>,
    pub glyph_to_group: Option<Vec<u16>>,
}

impl CompiledFont {
    pub fn is_compressed(&self) -> bool {
        self.groups.is_some()
    }

    pub fn is_frequency_grouped(&self) -> bool {
        self.glyph_to_group.is_some()
    }

    pub fn group_count(&self) -> usize {
        self.groups.as_ref().map_or(0, Vec::len)
    }

    pub fn interval_records(&self) -> Vec<IntervalRecord> {
        interval_records(&self.intervals)
    }

    /// Group lookup over this font's tables, `None` when uncompressed
    pub fn group_index(&self) -> Option<GroupIndex<'_>> {
        self.groups
            .as_deref()
            .map(|groups| GroupIndex::new(groups, self.glyph_to_group.as_deref()))
    }

    /// Ordered glyph indices of a group
    ///
    /// Sparse fonts scan `glyph_to_group`; contiguous fonts use
    /// `first_glyph_index..first_glyph_index + glyph_count`.
    pub fn group_members(&self, group: usize) -> Vec<usize> {
        self.group_index()
            .map(|index| index.members(group))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(groups: Vec<GroupDescriptor>, glyph_to_group: Option<Vec<u16>>) -> CompiledFont {
        CompiledFont {
            name: "test".to_string(),
            depth: BitDepth::Two,
            bitmap: Vec::new(),
            glyphs: vec![GlyphRecord::default(); 5],
            intervals: vec![CodepointInterval::new(0x41, 0x45)],
            metrics: FaceMetrics::default(),
            groups: Some(groups),
            glyph_to_group,
        }
    }

    #[test]
    fn test_contiguous_members() {
        let font = font(
            vec![
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
            ],
            None,
        );
        assert_eq!(font.group_members(1), vec![2, 3, 4]);
        assert!(font.group_members(2).is_empty());
        assert!(!font.is_frequency_grouped());
    }

    #[test]
    fn test_sparse_members() {
        let font = font(
            vec![GroupDescriptor::default(); 2],
            Some(vec![1, 0, 1, 1, 0]),
        );
        assert_eq!(font.group_members(0), vec![1, 4]);
        assert_eq!(font.group_members(1), vec![0, 2, 3]);
        assert_eq!(font.group_count(), 2);
    }
}
