//! Compiled font binary (.fontbin)
//!
//! Uncompressed single-font format, produced by the compiler's binary mode and
//! consumed by the partition packer.
//!
//! # Layout
//! ```text
//! 0x00: name [u8; 32] (NUL-padded)
//! 0x20: group [u8; 16] (NUL-padded partition group tag)
//! 0x30: bitmap_size u32
//! 0x34: glyph_count u32
//! 0x38: interval_count u32
//! 0x3C: advance_y u8
//! 0x3D: is_2bit u8
//! 0x3E: padding [u8; 2]
//! 0x40: ascender i32
//! 0x44: descender i32
//! 0x48: bitmap (bitmap_size bytes), zero-padded to a 4-byte boundary
//!       glyph table (glyph_count × 16 bytes)
//!       interval table (interval_count × 12 bytes)
//! ```

use super::name::{decode_name, encode_name};
use super::serialization::{read_i32, read_table, read_u32, write_table};
use super::{align_up, GlyphRecord, IntervalRecord};
use crate::FormatError;

/// File extension for compiled font binaries
pub const FONTBIN_EXT: &str = "fontbin";

/// Alignment of every section after the header
pub const SECTION_ALIGN: usize = 4;

/// .fontbin header (72 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontBinHeader {
    /// Font name
    pub name: [u8; 32],
    /// Partition group tag (e.g. "ui", "bookerly")
    pub group: [u8; 16],
    pub bitmap_size: u32,
    pub glyph_count: u32,
    pub interval_count: u32,
    /// Line height in pixels
    pub advance_y: u8,
    pub is_2bit: bool,
    pub ascender: i32,
    pub descender: i32,
}

impl FontBinHeader {
    pub const SIZE: usize = 72;

    /// Font name as a string
    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// Group tag as a string
    pub fn group(&self) -> String {
        decode_name(&self.group)
    }

    /// Offset of the glyph table from the start of the file
    pub fn glyph_table_offset(&self) -> usize {
        align_up(Self::SIZE + self.bitmap_size as usize, SECTION_ALIGN)
    }

    /// Offset of the interval table from the start of the file
    pub fn interval_table_offset(&self) -> usize {
        self.glyph_table_offset() + self.glyph_count as usize * GlyphRecord::SIZE
    }

    /// Total file size implied by the header
    pub fn file_size(&self) -> usize {
        self.interval_table_offset() + self.interval_count as usize * IntervalRecord::SIZE
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..32].copy_from_slice(&self.name);
        bytes[32..48].copy_from_slice(&self.group);
        bytes[48..52].copy_from_slice(&self.bitmap_size.to_le_bytes());
        bytes[52..56].copy_from_slice(&self.glyph_count.to_le_bytes());
        bytes[56..60].copy_from_slice(&self.interval_count.to_le_bytes());
        bytes[60] = self.advance_y;
        bytes[61] = self.is_2bit as u8;
        bytes[64..68].copy_from_slice(&self.ascender.to_le_bytes());
        bytes[68..72].copy_from_slice(&self.descender.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut name = [0u8; 32];
        name.copy_from_slice(&bytes[0..32]);
        let mut group = [0u8; 16];
        group.copy_from_slice(&bytes[32..48]);
        Some(Self {
            name,
            group,
            bitmap_size: read_u32(bytes, 48),
            glyph_count: read_u32(bytes, 52),
            interval_count: read_u32(bytes, 56),
            advance_y: bytes[60],
            is_2bit: bytes[61] != 0,
            ascender: read_i32(bytes, 64),
            descender: read_i32(bytes, 68),
        })
    }
}

/// Face-level metrics stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontBinMetrics {
    pub advance_y: u8,
    pub is_2bit: bool,
    pub ascender: i32,
    pub descender: i32,
}

/// A complete .fontbin file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontBin {
    pub header: FontBinHeader,
    pub bitmap: Vec<u8>,
    pub glyphs: Vec<GlyphRecord>,
    pub intervals: Vec<IntervalRecord>,
}

impl FontBin {
    /// Assemble a font binary, filling in the header's sizes and counts
    pub fn new(
        name: &str,
        group: &str,
        metrics: FontBinMetrics,
        bitmap: Vec<u8>,
        glyphs: Vec<GlyphRecord>,
        intervals: Vec<IntervalRecord>,
    ) -> Result<Self, FormatError> {
        let header = FontBinHeader {
            name: encode_name(name)?,
            group: encode_name(group)?,
            bitmap_size: to_u32("bitmap_size", bitmap.len())?,
            glyph_count: to_u32("glyph_count", glyphs.len())?,
            interval_count: to_u32("interval_count", intervals.len())?,
            advance_y: metrics.advance_y,
            is_2bit: metrics.is_2bit,
            ascender: metrics.ascender,
            descender: metrics.descender,
        };
        Ok(Self {
            header,
            bitmap,
            glyphs,
            intervals,
        })
    }

    /// Serialize header, bitmap (padded to 4 bytes), glyph table and interval table
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.file_size());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.bitmap);
        out.resize(align_up(out.len(), SECTION_ALIGN), 0);
        write_table(&mut out, &self.glyphs);
        write_table(&mut out, &self.intervals);
        out
    }

    /// Parse a font binary, rejecting files shorter than their header declares
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = FontBinHeader::from_bytes(bytes).ok_or(FormatError::Truncated {
            what: "fontbin header",
            needed: FontBinHeader::SIZE,
            actual: bytes.len(),
        })?;

        let bitmap_end = FontBinHeader::SIZE + header.bitmap_size as usize;
        if bytes.len() < bitmap_end {
            return Err(FormatError::Truncated {
                what: "fontbin bitmap",
                needed: bitmap_end,
                actual: bytes.len(),
            });
        }
        let bitmap = bytes[FontBinHeader::SIZE..bitmap_end].to_vec();

        let glyphs = read_table(
            bytes,
            header.glyph_table_offset(),
            header.glyph_count as usize,
            "fontbin glyph table",
        )?;
        let intervals = read_table(
            bytes,
            header.interval_table_offset(),
            header.interval_count as usize,
            "fontbin interval table",
        )?;

        Ok(Self {
            header,
            bitmap,
            glyphs,
            intervals,
        })
    }

    /// Glyph table as written to disk
    pub fn glyph_table_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.glyphs.len() * GlyphRecord::SIZE);
        write_table(&mut out, &self.glyphs);
        out
    }

    /// Interval table as written to disk
    pub fn interval_table_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.intervals.len() * IntervalRecord::SIZE);
        write_table(&mut out, &self.intervals);
        out
    }
}

fn to_u32(field: &'static str, value: usize) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::OutOfRange {
        field,
        value: value as i64,
        ty: "u32",
    })
}
