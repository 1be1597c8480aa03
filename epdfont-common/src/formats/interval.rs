//! Codepoint intervals and the interval record (12 bytes)
//!
//! # Layout
//! ```text
//! 0x00: first u32
//! 0x04: last u32
//! 0x08: offset u32 (index of `first`'s glyph in the glyph table)
//! ```

use super::serialization::read_u32;

/// Inclusive range of Unicode scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodepointInterval {
    pub first: u32,
    pub last: u32,
}

impl CodepointInterval {
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Number of codepoints covered
    #[inline]
    pub const fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.last < self.first
    }

    #[inline]
    pub const fn contains(&self, codepoint: u32) -> bool {
        self.first <= codepoint && codepoint <= self.last
    }

    pub fn codepoints(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }
}

/// Interval with the cumulative glyph index of its first codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRecord {
    pub first: u32,
    pub last: u32,
    pub offset: u32,
}

impl IntervalRecord {
    pub const SIZE: usize = 12;

    pub const fn new(first: u32, last: u32, offset: u32) -> Self {
        Self {
            first,
            last,
            offset,
        }
    }

    /// Write record to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.first.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.last.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.offset.to_le_bytes());
        bytes
    }

    /// Read record from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            first: read_u32(bytes, 0),
            last: read_u32(bytes, 4),
            offset: read_u32(bytes, 8),
        })
    }

    pub const fn interval(&self) -> CodepointInterval {
        CodepointInterval::new(self.first, self.last)
    }
}

/// Attach cumulative glyph offsets to an ordered interval list
pub fn interval_records(intervals: &[CodepointInterval]) -> Vec<IntervalRecord> {
    let mut offset = 0u32;
    intervals
        .iter()
        .map(|interval| {
            let record = IntervalRecord::new(interval.first, interval.last, offset);
            offset += interval.len();
            record
        })
        .collect()
}

/// Codepoint of every glyph, in glyph-table order
pub fn glyph_codepoints(intervals: &[CodepointInterval]) -> impl Iterator<Item = u32> + '_ {
    intervals.iter().flat_map(|interval| interval.codepoints())
}
