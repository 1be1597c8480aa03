//! Round-trip verifier
//!
//! Re-reads generated headers and proves that every compressed group
//! decompresses to exactly the glyph data the glyph table describes. The
//! verifier only reports; it never repairs a file.

pub mod parser;

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use epdfont_common::formats::GroupIndex;
use epdfont_common::{aligned_len, packed_len, to_byte_aligned, to_packed, FormatError};

use crate::compress::inflate;
use crate::error::VerifyError;
use crate::model::CompiledFont;

pub use parser::{mentions_declaration, ParsedHeader, GROUP_TYPE};

/// Aggregate header that only includes the per-font headers
pub const AGGREGATE_HEADER: &str = "all.h";

/// What a passing font contained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub groups: usize,
    pub glyphs: usize,
    pub frequency_grouped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed(Summary),
    /// No group array: the font is uncompressed
    Skipped,
    Failed(String),
}

/// Check every group of a compressed font
///
/// Uncompressed fonts have nothing to check and pass with zero groups.
pub fn verify_font(font: &CompiledFont) -> Result<Summary, VerifyError> {
    let Some(groups) = &font.groups else {
        return Ok(Summary {
            groups: 0,
            glyphs: font.glyphs.len(),
            frequency_grouped: false,
        });
    };
    if !font.depth.is_2bit() {
        return Err(VerifyError::NotTwoBit);
    }

    let covered: usize = font.intervals.iter().map(|i| i.len() as usize).sum();
    if covered != font.glyphs.len() {
        return Err(VerifyError::IntervalCoverage {
            covered,
            glyphs: font.glyphs.len(),
        });
    }

    if let Some(glyph_to_group) = &font.glyph_to_group {
        if glyph_to_group.len() != font.glyphs.len() {
            return Err(VerifyError::GlyphToGroupLength {
                expected: font.glyphs.len(),
                actual: glyph_to_group.len(),
            });
        }
        if let Some(&group) = glyph_to_group.iter().find(|&&g| g as usize >= groups.len()) {
            return Err(VerifyError::UnknownGroup {
                group: group as usize,
                group_count: groups.len(),
            });
        }
    }

    let members: Vec<Vec<usize>> = (0..groups.len()).map(|g| font.group_members(g)).collect();

    let mut claims = vec![0usize; font.glyphs.len()];
    for (group, indices) in members.iter().enumerate() {
        for &glyph in indices {
            match claims.get_mut(glyph) {
                Some(count) => *count += 1,
                None => return Err(VerifyError::GlyphOutOfRange { group, glyph }),
            }
        }
    }
    if let Some((glyph, &claims)) = claims.iter().enumerate().find(|&(_, &c)| c != 1) {
        return Err(VerifyError::GlyphClaims { glyph, claims });
    }

    for (group, indices) in members.iter().enumerate() {
        let payload = decode_group(font, group)?;
        verify_group(font, group, indices, &payload)?;
        debug!("{}: group {} OK ({} glyphs)", font.name, group, indices.len());
    }

    Ok(Summary {
        groups: groups.len(),
        glyphs: font.glyphs.len(),
        frequency_grouped: font.is_frequency_grouped(),
    })
}

/// Inflate one group of a compressed font, checking its declared size
pub fn decode_group(font: &CompiledFont, group: usize) -> Result<Vec<u8>, VerifyError> {
    let groups = font.groups.as_deref().unwrap_or_default();
    let desc = groups.get(group).ok_or(FormatError::UnknownGroup {
        group,
        group_count: groups.len(),
    })?;
    let index = GroupIndex::new(groups, font.glyph_to_group.as_deref());
    let compressed = index
        .compressed(&font.bitmap, group)
        .map_err(|_| VerifyError::CompressedTruncated {
            group,
            expected: desc.compressed_size as usize,
            actual: font
                .bitmap
                .len()
                .saturating_sub(desc.compressed_offset as usize),
        })?;

    let payload = inflate(compressed).map_err(|e| VerifyError::Decompress {
        group,
        message: e.to_string(),
    })?;
    if payload.len() != desc.uncompressed_size as usize {
        return Err(VerifyError::SizeMismatch {
            group,
            expected: desc.uncompressed_size as usize,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Packed bitmap of one glyph, inflating its group when the font is compressed
pub fn glyph_bitmap(font: &CompiledFont, glyph: usize) -> Result<Vec<u8>, VerifyError> {
    let record = font
        .glyphs
        .get(glyph)
        .ok_or(FormatError::UnknownGlyph { glyph })?;
    let Some(index) = font.group_index() else {
        let start = record.data_offset as usize;
        let end = start + record.data_length as usize;
        let bytes = font.bitmap.get(start..end).ok_or(FormatError::Truncated {
            what: "glyph bitmap",
            needed: end,
            actual: font.bitmap.len(),
        })?;
        return Ok(bytes.to_vec());
    };
    let group = index
        .group_of(glyph)
        .ok_or(FormatError::UnknownGlyph { glyph })?;
    let payload = decode_group(font, group)?;
    Ok(index.extract_glyph(&font.glyphs, &payload, glyph, font.depth)?)
}

/// Walk one decompressed group glyph by glyph
fn verify_group(
    font: &CompiledFont,
    group: usize,
    members: &[usize],
    payload: &[u8],
) -> Result<(), VerifyError> {
    let mut aligned_offset = 0usize;
    let mut packed_offset = 0usize;

    for &glyph in members {
        let record = &font.glyphs[glyph];
        let (width, height) = (record.width as usize, record.height as usize);
        let size = aligned_len(width, height, font.depth);
        let aligned = payload
            .get(aligned_offset..aligned_offset + size)
            .ok_or(VerifyError::AlignedOverrun {
                group,
                glyph,
                offset: aligned_offset,
                size,
                buf_size: payload.len(),
            })?;

        let packed = to_packed(aligned, width, height, font.depth);
        let expected_len = packed_len(width, height, font.depth);
        if record.data_offset as usize != packed_offset {
            return Err(VerifyError::DataOffset {
                group,
                glyph,
                expected: packed_offset,
                actual: record.data_offset as usize,
            });
        }
        if record.data_length as usize != expected_len {
            return Err(VerifyError::DataLength {
                group,
                glyph,
                expected: expected_len,
                actual: record.data_length as usize,
                width: record.width,
                height: record.height,
            });
        }
        if to_byte_aligned(&packed, width, height, font.depth) != aligned {
            return Err(VerifyError::DirtyPadding { group, glyph });
        }

        aligned_offset += size;
        packed_offset += expected_len;
    }

    if aligned_offset != payload.len() {
        return Err(VerifyError::UncompressedTotal {
            group,
            expected: payload.len(),
            actual: aligned_offset,
        });
    }
    Ok(())
}

/// Parse and check one header's text
///
/// Files without a group array are skipped before parsing, so only headers
/// that claim to be compressed can fail.
pub fn verify_header(source: &str) -> Outcome {
    if !mentions_declaration(source, GROUP_TYPE) {
        return Outcome::Skipped;
    }
    let header = match ParsedHeader::parse(source) {
        Ok(header) => header,
        Err(e) => return Outcome::Failed(e.to_string()),
    };
    if !header.declares(GROUP_TYPE) {
        return Outcome::Skipped;
    }
    match header.font().map_err(VerifyError::from).and_then(|font| verify_font(&font)) {
        Ok(summary) => Outcome::Passed(summary),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub files: Vec<FileReport>,
}

impl VerifyReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    /// Per-file PASS/FAIL/SKIP lines followed by the totals line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for report in &self.files {
            match &report.outcome {
                Outcome::Passed(summary) => {
                    let _ = writeln!(
                        out,
                        "  PASS: {} ({} groups, {} glyphs OK{})",
                        report.file,
                        summary.groups,
                        summary.glyphs,
                        if summary.frequency_grouped { " (frequency-grouped)" } else { "" }
                    );
                }
                Outcome::Failed(reason) => {
                    let _ = writeln!(out, "  FAIL: {} - {}", report.file, reason);
                }
                Outcome::Skipped => {
                    let _ = writeln!(out, "  SKIP: {} (uncompressed)", report.file);
                }
            }
        }
        let _ = writeln!(
            out,
            "\nResults: {} passed, {} failed, {} skipped (uncompressed)",
            self.passed(),
            self.failed(),
            self.skipped()
        );
        out
    }
}

/// Header files directly inside `dir`, sorted by name, excluding the aggregate
pub fn header_files(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("h")
            && entry.file_name() != AGGREGATE_HEADER
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Verify every header in `dir`; per-file results keep file-name order
pub fn verify_dir(dir: &Path) -> Result<VerifyReport, walkdir::Error> {
    let files = header_files(dir)?
        .par_iter()
        .map(|path| {
            let outcome = match std::fs::read_to_string(path) {
                Ok(source) => verify_header(&source),
                Err(e) => Outcome::Failed(format!("failed to read: {}", e)),
            };
            FileReport {
                file: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                outcome,
            }
        })
        .collect();
    Ok(VerifyReport { files })
}
