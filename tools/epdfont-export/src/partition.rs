//! Partition packer
//!
//! Merges a directory of `.fontbin` files into one partition image. Fonts are
//! clustered by group tag (`"ui"` first, the rest alphabetical), each group
//! starts on a 64 KiB page and each font section inside a group is 4-byte
//! aligned. See [`epdfont_common::formats::PartitionImage`] for the layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use epdfont_common::formats::{
    align_up, encode_name, FontBin, FontDirEntry, GroupDirEntry, PartitionHeader, FONTBIN_EXT,
    PARTITION_PAGE_SIZE, SECTION_ALIGN,
};

use crate::error::PartitionError;

/// Group tag always placed first
pub const PRIORITY_GROUP: &str = "ui";

/// One parsed input file
#[derive(Debug, Clone)]
pub struct PartitionInput {
    pub path: PathBuf,
    pub font: FontBin,
}

/// Read every `.fontbin` directly inside `dir`, sorted by file name
pub fn collect_fontbins(dir: &Path) -> Result<Vec<PartitionInput>, PartitionError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(FONTBIN_EXT)
        {
            continue;
        }
        let bytes = std::fs::read(path).map_err(|source| PartitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontBin::parse(&bytes).map_err(|source| PartitionError::BadFontBin {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "{}: {} glyphs, group '{}'",
            path.display(),
            font.header.glyph_count,
            font.header.group()
        );
        inputs.push(PartitionInput {
            path: path.to_path_buf(),
            font,
        });
    }

    if inputs.is_empty() {
        return Err(PartitionError::NoInputs {
            dir: dir.to_path_buf(),
        });
    }
    Ok(inputs)
}

/// Cluster fonts by group tag: `"ui"` first, then alphabetical; fonts keep input order
pub fn order_groups(inputs: &[PartitionInput]) -> Vec<(String, Vec<&FontBin>)> {
    let mut by_tag: BTreeMap<String, Vec<&FontBin>> = BTreeMap::new();
    for input in inputs {
        by_tag
            .entry(input.font.header.group())
            .or_default()
            .push(&input.font);
    }

    let mut groups: Vec<(String, Vec<&FontBin>)> = by_tag.into_iter().collect();
    groups.sort_by_key(|(tag, _)| tag != PRIORITY_GROUP);
    groups
}

/// A named byte range of the image, used for the overlap check
#[derive(Debug)]
struct Region {
    what: String,
    start: usize,
    end: usize,
}

/// Lay out and serialize the partition image
pub fn pack_partition(inputs: &[PartitionInput]) -> Result<Vec<u8>, PartitionError> {
    let groups = order_groups(inputs);
    let font_count = inputs.len();
    let directory_size = PartitionHeader::SIZE
        + groups.len() * GroupDirEntry::SIZE
        + font_count * FontDirEntry::SIZE;

    let mut image = vec![0u8; directory_size];
    let mut group_entries = Vec::with_capacity(groups.len());
    let mut font_entries = Vec::with_capacity(font_count);
    let mut regions = vec![Region {
        what: "directory".to_string(),
        start: 0,
        end: directory_size,
    }];

    for (tag, fonts) in &groups {
        let group_start = align_up(image.len(), PARTITION_PAGE_SIZE);
        image.resize(group_start, 0);

        for font in fonts {
            let bitmap_offset = append_section(&mut image, &font.bitmap);
            let glyph_offset = append_section(&mut image, &font.glyph_table_bytes());
            let interval_offset = append_section(&mut image, &font.interval_table_bytes());

            let header = &font.header;
            font_entries.push(FontDirEntry {
                name: header.name,
                bitmap_offset: to_u32(bitmap_offset)?,
                bitmap_size: header.bitmap_size,
                glyph_offset: to_u32(glyph_offset)?,
                glyph_count: header.glyph_count,
                interval_offset: to_u32(interval_offset)?,
                interval_count: header.interval_count,
                advance_y: header.advance_y,
                is_2bit: header.is_2bit,
                ascender: header.ascender,
                descender: header.descender,
            });
        }

        let group_end = image.len();
        regions.push(Region {
            what: format!("group '{}'", tag),
            start: group_start,
            end: group_end,
        });
        group_entries.push(GroupDirEntry {
            name: encode_name(tag)?,
            data_offset: to_u32(group_start)?,
            data_size: to_u32(group_end - group_start)?,
        });
        info!(
            "Group '{}': {} fonts at {:#x} ({} bytes)",
            tag,
            fonts.len(),
            group_start,
            group_end - group_start
        );
    }

    check_overlaps(&mut regions)?;

    let header = PartitionHeader::new(
        to_u32(font_count)?,
        to_u32(image.len())?,
        to_u32(group_entries.len())?,
    );
    let mut cursor = 0;
    let mut put = |bytes: &[u8]| {
        image[cursor..cursor + bytes.len()].copy_from_slice(bytes);
        cursor += bytes.len();
    };
    put(&header.to_bytes());
    for entry in &group_entries {
        put(&entry.to_bytes());
    }
    for entry in &font_entries {
        put(&entry.to_bytes());
    }

    Ok(image)
}

/// Collect, pack and return the image bytes for a directory
pub fn pack_dir(dir: &Path) -> Result<Vec<u8>, PartitionError> {
    let inputs = collect_fontbins(dir)?;
    let image = pack_partition(&inputs)?;
    info!(
        "Packed {} fonts into {} bytes",
        inputs.len(),
        image.len()
    );
    Ok(image)
}

/// Pad to the section alignment, append, and return the section's offset
fn append_section(image: &mut Vec<u8>, bytes: &[u8]) -> usize {
    let offset = align_up(image.len(), SECTION_ALIGN);
    image.resize(offset, 0);
    image.extend_from_slice(bytes);
    offset
}

fn check_overlaps(regions: &mut [Region]) -> Result<(), PartitionError> {
    regions.sort_by_key(|region| region.start);
    for pair in regions.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if second.start < first.end {
            return Err(PartitionError::Overlap {
                first: first.what.clone(),
                first_start: first.start,
                first_end: first.end,
                second: second.what.clone(),
                second_start: second.start,
            });
        }
    }
    Ok(())
}

fn to_u32(value: usize) -> Result<u32, PartitionError> {
    u32::try_from(value).map_err(|_| PartitionError::TooLarge { size: value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use epdfont_common::formats::{FontBinMetrics, GlyphRecord, IntervalRecord, PartitionImage};

    fn input(name: &str, group: &str, bitmap_len: usize) -> PartitionInput {
        let font = FontBin::new(
            name,
            group,
            FontBinMetrics {
                advance_y: 20,
                is_2bit: true,
                ascender: 15,
                descender: -5,
            },
            (0..bitmap_len).map(|i| i as u8).collect(),
            vec![GlyphRecord {
                width: 4,
                height: 4,
                data_length: 4,
                ..Default::default()
            }],
            vec![IntervalRecord::new(0x41, 0x41, 0)],
        )
        .unwrap();
        PartitionInput {
            path: PathBuf::from(format!("{}.fontbin", name)),
            font,
        }
    }

    #[test]
    fn test_ui_group_first() {
        let inputs = vec![
            input("noto_12", "notosans", 10),
            input("ui_10", "ui", 10),
            input("bookerly_12", "bookerly", 10),
        ];
        let tags: Vec<String> = order_groups(&inputs).into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["ui", "bookerly", "notosans"]);
    }

    #[test]
    fn test_groups_page_aligned() {
        let inputs = vec![
            input("noto_12", "notosans", 70_000),
            input("ui_10", "ui", 5),
            input("bookerly_12", "bookerly", 3),
            input("bookerly_14", "bookerly", 7),
        ];
        let bytes = pack_partition(&inputs).unwrap();
        let image = PartitionImage::parse(&bytes).unwrap();

        assert_eq!(image.header.font_count, 4);
        assert_eq!(image.header.group_count, 3);
        assert_eq!(image.header.total_data_size as usize, bytes.len());
        let offsets: Vec<u32> = image.groups.iter().map(|g| g.data_offset).collect();
        assert_eq!(offsets, vec![0x10000, 0x20000, 0x30000]);
        for group in &image.groups {
            assert_eq!(group.data_offset as usize % PARTITION_PAGE_SIZE, 0);
        }

        // Font directory is in group order
        let names: Vec<String> = image.fonts.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["ui_10", "bookerly_12", "bookerly_14", "noto_12"]);

        for font in &image.fonts {
            assert_eq!(font.bitmap_offset % 4, 0);
            assert_eq!(font.glyph_offset % 4, 0);
            assert_eq!(font.interval_offset % 4, 0);
            let group = image.group_of(font).unwrap();
            assert!(group.contains(font.interval_offset));
        }

        let bookerly_14 = image.font("bookerly_14").unwrap();
        assert_eq!(image.bitmap(bookerly_14), &[0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(image.glyphs(bookerly_14).unwrap()[0].width, 4);
        assert_eq!(
            image.intervals(bookerly_14).unwrap(),
            vec![IntervalRecord::new(0x41, 0x41, 0)]
        );
    }

    #[test]
    fn test_image_ends_at_last_group() {
        let bytes = pack_partition(&[input("ui_10", "ui", 5)]).unwrap();
        // 5 bitmap bytes → pad to 8, 16-byte glyph, 12-byte interval
        assert_eq!(bytes.len(), 0x10000 + 8 + 16 + 12);
    }

    #[test]
    fn test_overlap_detected() {
        let mut regions = vec![
            Region {
                what: "directory".to_string(),
                start: 0,
                end: 0x10010,
            },
            Region {
                what: "group 'ui'".to_string(),
                start: 0x10000,
                end: 0x10100,
            },
        ];
        assert!(matches!(
            check_overlaps(&mut regions),
            Err(PartitionError::Overlap { .. })
        ));
    }

    #[test]
    fn test_collect_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a font").unwrap();
        assert!(matches!(
            collect_fontbins(dir.path()),
            Err(PartitionError::NoInputs { .. })
        ));
    }

    #[test]
    fn test_collect_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = input("ui_10", "ui", 5).font.to_bytes();
        std::fs::write(dir.path().join("ui_10.fontbin"), &bytes[..bytes.len() - 4]).unwrap();
        assert!(matches!(
            collect_fontbins(dir.path()),
            Err(PartitionError::BadFontBin { .. })
        ));
    }
}
