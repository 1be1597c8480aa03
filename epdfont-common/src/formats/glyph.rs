//! Glyph record (16 bytes)
//!
//! # Layout
//! ```text
//! 0x00: width u8
//! 0x01: height u8
//! 0x02: advance_x u8
//! 0x03: padding u8
//! 0x04: left i16
//! 0x06: top i16
//! 0x08: data_length u16
//! 0x0A: padding [u8; 2]
//! 0x0C: data_offset u32
//! ```

use super::serialization::{read_i16, read_u16, read_u32};

/// Metrics and bitmap location of one glyph
///
/// `data_offset` is relative to the start of the glyph's data segment: the
/// whole bitmap region for uncompressed fonts, or the glyph's own group once
/// a font is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphRecord {
    /// Bitmap width in pixels
    pub width: u8,
    /// Bitmap height in pixels
    pub height: u8,
    /// Horizontal advance in whole pixels
    pub advance_x: u8,
    /// Distance from the pen position to the bitmap's left edge
    pub left: i16,
    /// Distance from the baseline up to the bitmap's top edge
    pub top: i16,
    /// Packed bitmap length in bytes
    pub data_length: u16,
    /// Packed bitmap offset in bytes
    pub data_offset: u32,
    /// Unicode codepoint; not stored in the binary record, recovered from the
    /// interval table
    pub codepoint: u32,
}

impl GlyphRecord {
    pub const SIZE: usize = 16;

    /// Write record to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.width;
        bytes[1] = self.height;
        bytes[2] = self.advance_x;
        bytes[4..6].copy_from_slice(&self.left.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.top.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.data_length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.data_offset.to_le_bytes());
        bytes
    }

    /// Read record from bytes (`codepoint` is left at 0)
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            width: bytes[0],
            height: bytes[1],
            advance_x: bytes[2],
            left: read_i16(bytes, 4),
            top: read_i16(bytes, 6),
            data_length: read_u16(bytes, 8),
            data_offset: read_u32(bytes, 12),
            codepoint: 0,
        })
    }
}
