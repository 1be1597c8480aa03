//! Font partition image
//!
//! Many `.fontbin` fonts merged into one flash partition. Fonts are clustered
//! by group tag; every group's data starts on a 64 KiB boundary so the
//! firmware can memory-map exactly one group at a time. All offsets are
//! absolute byte offsets from the start of the image.
//!
//! # Layout
//! ```text
//! 0x00: PartitionHeader (20 bytes)
//! 0x14: GroupDirEntry × group_count (24 bytes each)
//!       FontDirEntry × font_count (68 bytes each, in group order)
//!       ... zero fill up to the next 64 KiB boundary ...
//!       group 0 data: per font bitmap, glyph table, interval table (4-byte aligned)
//!       ... zero fill up to the next 64 KiB boundary ...
//!       group 1 data
//! ```

use super::name::decode_name;
use super::serialization::{read_i32, read_table, read_u32};
use super::{GlyphRecord, IntervalRecord};
use crate::FormatError;

/// Partition magic (`"TFPC"` on disk)
pub const PARTITION_MAGIC: u32 = 0x4350_4654;

/// Partition format version
pub const PARTITION_VERSION: u32 = 2;

/// Flash memory-map page size; every group starts on this boundary
pub const PARTITION_PAGE_SIZE: usize = 0x10000;

/// Partition header (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionHeader {
    pub magic: u32,
    pub version: u32,
    pub font_count: u32,
    /// Total image length in bytes
    pub total_data_size: u32,
    pub group_count: u32,
}

impl PartitionHeader {
    pub const SIZE: usize = 20;

    pub fn new(font_count: u32, total_data_size: u32, group_count: u32) -> Self {
        Self {
            magic: PARTITION_MAGIC,
            version: PARTITION_VERSION,
            font_count,
            total_data_size,
            group_count,
        }
    }

    /// Size of header plus both directories
    pub fn directory_size(&self) -> usize {
        Self::SIZE
            + self.group_count as usize * GroupDirEntry::SIZE
            + self.font_count as usize * FontDirEntry::SIZE
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.font_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.total_data_size.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.group_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: read_u32(bytes, 0),
            version: read_u32(bytes, 4),
            font_count: read_u32(bytes, 8),
            total_data_size: read_u32(bytes, 12),
            group_count: read_u32(bytes, 16),
        })
    }
}

/// Group directory entry (24 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDirEntry {
    pub name: [u8; 16],
    pub data_offset: u32,
    pub data_size: u32,
}

impl GroupDirEntry {
    pub const SIZE: usize = 24;

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// Whether an absolute image offset falls inside this group's data
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.data_offset && offset - self.data_offset < self.data_size.max(1)
    }

    /// Write entry to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..16].copy_from_slice(&self.name);
        bytes[16..20].copy_from_slice(&self.data_offset.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.data_size.to_le_bytes());
        bytes
    }

    /// Read entry from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut name = [0u8; 16];
        name.copy_from_slice(&bytes[0..16]);
        Some(Self {
            name,
            data_offset: read_u32(bytes, 16),
            data_size: read_u32(bytes, 20),
        })
    }
}

/// Font directory entry (68 bytes)
///
/// # Layout
/// ```text
/// 0x00: name [u8; 32]
/// 0x20: bitmap_offset u32, bitmap_size u32
/// 0x28: glyph_offset u32, glyph_count u32
/// 0x30: interval_offset u32, interval_count u32
/// 0x38: advance_y u8, is_2bit u8, padding [u8; 2]
/// 0x3C: ascender i32
/// 0x40: descender i32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontDirEntry {
    pub name: [u8; 32],
    pub bitmap_offset: u32,
    pub bitmap_size: u32,
    pub glyph_offset: u32,
    pub glyph_count: u32,
    pub interval_offset: u32,
    pub interval_count: u32,
    pub advance_y: u8,
    pub is_2bit: bool,
    pub ascender: i32,
    pub descender: i32,
}

impl FontDirEntry {
    pub const SIZE: usize = 68;

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    /// Write entry to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..32].copy_from_slice(&self.name);
        bytes[32..36].copy_from_slice(&self.bitmap_offset.to_le_bytes());
        bytes[36..40].copy_from_slice(&self.bitmap_size.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.glyph_offset.to_le_bytes());
        bytes[44..48].copy_from_slice(&self.glyph_count.to_le_bytes());
        bytes[48..52].copy_from_slice(&self.interval_offset.to_le_bytes());
        bytes[52..56].copy_from_slice(&self.interval_count.to_le_bytes());
        bytes[56] = self.advance_y;
        bytes[57] = self.is_2bit as u8;
        bytes[60..64].copy_from_slice(&self.ascender.to_le_bytes());
        bytes[64..68].copy_from_slice(&self.descender.to_le_bytes());
        bytes
    }

    /// Read entry from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut name = [0u8; 32];
        name.copy_from_slice(&bytes[0..32]);
        Some(Self {
            name,
            bitmap_offset: read_u32(bytes, 32),
            bitmap_size: read_u32(bytes, 36),
            glyph_offset: read_u32(bytes, 40),
            glyph_count: read_u32(bytes, 44),
            interval_offset: read_u32(bytes, 48),
            interval_count: read_u32(bytes, 52),
            advance_y: bytes[56],
            is_2bit: bytes[57] != 0,
            ascender: read_i32(bytes, 60),
            descender: read_i32(bytes, 64),
        })
    }
}

/// Read-only view of a partition image, as the firmware loader sees it
#[derive(Debug, Clone)]
pub struct PartitionImage<'a> {
    pub header: PartitionHeader,
    pub groups: Vec<GroupDirEntry>,
    pub fonts: Vec<FontDirEntry>,
    data: &'a [u8],
}

impl<'a> PartitionImage<'a> {
    /// Parse and validate an image: magic, version, and every directory range
    pub fn parse(data: &'a [u8]) -> Result<Self, FormatError> {
        let header = PartitionHeader::from_bytes(data).ok_or(FormatError::Truncated {
            what: "partition header",
            needed: PartitionHeader::SIZE,
            actual: data.len(),
        })?;
        if header.magic != PARTITION_MAGIC {
            return Err(FormatError::BadMagic {
                expected: PARTITION_MAGIC,
                found: header.magic,
            });
        }
        if header.version != PARTITION_VERSION {
            return Err(FormatError::UnsupportedVersion {
                expected: PARTITION_VERSION,
                found: header.version,
            });
        }

        let groups: Vec<GroupDirEntry> = read_table(
            data,
            PartitionHeader::SIZE,
            header.group_count as usize,
            "group directory",
        )?;
        let fonts: Vec<FontDirEntry> = read_table(
            data,
            PartitionHeader::SIZE + groups.len() * GroupDirEntry::SIZE,
            header.font_count as usize,
            "font directory",
        )?;

        for group in &groups {
            check_range(data, format!("group '{}'", group.name()), group.data_offset, group.data_size)?;
        }
        for font in &fonts {
            let name = font.name();
            check_range(data, format!("font '{}' bitmap", name), font.bitmap_offset, font.bitmap_size)?;
            check_range(
                data,
                format!("font '{}' glyphs", name),
                font.glyph_offset,
                font.glyph_count.saturating_mul(GlyphRecord::SIZE as u32),
            )?;
            check_range(
                data,
                format!("font '{}' intervals", name),
                font.interval_offset,
                font.interval_count.saturating_mul(IntervalRecord::SIZE as u32),
            )?;
        }

        Ok(Self {
            header,
            groups,
            fonts,
            data,
        })
    }

    /// Look up a font by name
    pub fn font(&self, name: &str) -> Option<&FontDirEntry> {
        self.fonts.iter().find(|font| font.name() == name)
    }

    /// Look up a group by name
    pub fn group(&self, name: &str) -> Option<&GroupDirEntry> {
        self.groups.iter().find(|group| group.name() == name)
    }

    /// Group whose data region holds the font
    pub fn group_of(&self, font: &FontDirEntry) -> Option<&GroupDirEntry> {
        self.groups
            .iter()
            .find(|group| group.contains(font.bitmap_offset))
    }

    /// Raw bitmap bytes of a font
    pub fn bitmap(&self, font: &FontDirEntry) -> &'a [u8] {
        let start = font.bitmap_offset as usize;
        &self.data[start..start + font.bitmap_size as usize]
    }

    /// Decoded glyph table of a font
    pub fn glyphs(&self, font: &FontDirEntry) -> Result<Vec<GlyphRecord>, FormatError> {
        read_table(
            self.data,
            font.glyph_offset as usize,
            font.glyph_count as usize,
            "font glyph table",
        )
    }

    /// Decoded interval table of a font
    pub fn intervals(&self, font: &FontDirEntry) -> Result<Vec<IntervalRecord>, FormatError> {
        read_table(
            self.data,
            font.interval_offset as usize,
            font.interval_count as usize,
            "font interval table",
        )
    }
}

fn check_range(data: &[u8], what: String, offset: u32, size: u32) -> Result<(), FormatError> {
    if offset as usize + size as usize > data.len() {
        return Err(FormatError::RangeOutOfBounds {
            what,
            offset,
            size,
            image_size: data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::encode_name;

    #[test]
    fn test_magic_bytes() {
        let header = PartitionHeader::new(3, 0x30000, 2);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"TFPC");
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(PartitionHeader::from_bytes(&bytes), Some(header));
    }

    #[test]
    fn test_directory_size() {
        let header = PartitionHeader::new(3, 0, 2);
        assert_eq!(header.directory_size(), 20 + 2 * 24 + 3 * 68);
    }

    #[test]
    fn test_font_dir_entry_layout() {
        let entry = FontDirEntry {
            name: encode_name("bookerly_12").unwrap(),
            bitmap_offset: 0x10000,
            bitmap_size: 100,
            glyph_offset: 0x10064,
            glyph_count: 2,
            interval_offset: 0x10084,
            interval_count: 1,
            advance_y: 30,
            is_2bit: true,
            ascender: 24,
            descender: -7,
        };
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[32..36], &0x10000u32.to_le_bytes());
        assert_eq!(bytes[56], 30);
        assert_eq!(bytes[57], 1);
        assert_eq!(&bytes[58..60], &[0, 0]);
        assert_eq!(&bytes[64..68], &(-7i32).to_le_bytes());
        assert_eq!(FontDirEntry::from_bytes(&bytes), Some(entry));
    }

    #[test]
    fn test_group_contains() {
        let group = GroupDirEntry {
            name: encode_name("ui").unwrap(),
            data_offset: 0x10000,
            data_size: 0x100,
        };
        assert!(group.contains(0x10000));
        assert!(group.contains(0x100FF));
        assert!(!group.contains(0x10100));
        assert!(!group.contains(0xFFFF));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = PartitionHeader::new(0, 20, 0).to_bytes().to_vec();
        bytes[0] = b'X';
        assert!(matches!(
            PartitionImage::parse(&bytes),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let mut header = PartitionHeader::new(0, 20, 0);
        header.version = 1;
        assert_eq!(
            PartitionImage::parse(&header.to_bytes()).unwrap_err(),
            FormatError::UnsupportedVersion {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_group() {
        let mut bytes = PartitionHeader::new(0, 0, 1).to_bytes().to_vec();
        let group = GroupDirEntry {
            name: encode_name("ui").unwrap(),
            data_offset: 0x10000,
            data_size: 16,
        };
        bytes.extend_from_slice(&group.to_bytes());
        assert!(matches!(
            PartitionImage::parse(&bytes),
            Err(FormatError::RangeOutOfBounds { .. })
        ));
    }
}
