//! Typed errors for each stage of the font pipeline.
//!
//! The CLI wraps these in `anyhow` with the offending path attached.

use std::path::PathBuf;

use epdfont_common::FormatError;

/// Fatal failure while compiling one font
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Option combination rejected before any work starts
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load font {}: {message}", path.display())]
    FontLoad { path: PathBuf, message: String },

    #[error("frequency table line {line}: {message}")]
    FrequencyTable { line: usize, message: String },

    /// Malformed input to the frequency table builder
    #[error("{list} line {line}: {message}")]
    RankSource {
        list: &'static str,
        line: usize,
        message: String,
    },

    #[error("no fonts in the fallback stack")]
    EmptyFontStack,

    /// A planned codepoint vanished from every face between planning and rendering
    #[error("code point U+{codepoint:04X} not found in font stack")]
    MissingGlyph { codepoint: u32 },

    #[error("renderer returned {actual} coverage bytes for U+{codepoint:04X} ({width}x{height})")]
    BadCoverage {
        codepoint: u32,
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("U+{codepoint:04X}: {field} = {value} does not fit the glyph record")]
    GlyphTooLarge {
        codepoint: u32,
        field: &'static str,
        value: i64,
    },

    #[error("{count} groups exceed the 16-bit group id range")]
    TooManyGroups { count: usize },

    #[error("DEFLATE failed for group {group}: {source}")]
    Compression {
        group: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Malformed generated header text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("line {line}: integer literal {literal} out of range")]
    BadInteger { line: usize, literal: String },

    #[error("no EpdFontData declaration found")]
    NoAggregate,

    #[error("'{0}' is referenced but never declared")]
    Unresolved(String),

    #[error("{name}: declared length {declared} but {actual} elements given")]
    LengthMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("{name}: {message}")]
    BadValue { name: String, message: String },
}

/// Round-trip check failure for one compiled font
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("{0}")]
    Header(#[from] HeaderError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("compressed font is not 2-bit")]
    NotTwoBit,

    #[error("intervals cover {covered} code points but {glyphs} glyphs are declared")]
    IntervalCoverage { covered: usize, glyphs: usize },

    #[error("glyphToGroup length ({actual}) != glyph count ({expected})")]
    GlyphToGroupLength { expected: usize, actual: usize },

    #[error("glyphToGroup contains group ID {group} but only {group_count} groups exist")]
    UnknownGroup { group: usize, group_count: usize },

    #[error("glyph {glyph} is claimed by {claims} groups")]
    GlyphClaims { glyph: usize, claims: usize },

    #[error("group {group}: compressed data truncated (expected {expected}, got {actual})")]
    CompressedTruncated {
        group: usize,
        expected: usize,
        actual: usize,
    },

    #[error("group {group}: decompression failed: {message}")]
    Decompress { group: usize, message: String },

    #[error("group {group}: size mismatch (expected {expected}, got {actual})")]
    SizeMismatch {
        group: usize,
        expected: usize,
        actual: usize,
    },

    #[error("group {group}: glyph index {glyph} out of range")]
    GlyphOutOfRange { group: usize, glyph: usize },

    #[error("group {group}, glyph {glyph}: dataOffset {actual} != expected packed offset {expected}")]
    DataOffset {
        group: usize,
        glyph: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "group {group}, glyph {glyph}: dataLength {actual} != expected packed length {expected} (width={width}, height={height})"
    )]
    DataLength {
        group: usize,
        glyph: usize,
        expected: usize,
        actual: usize,
        width: u8,
        height: u8,
    },

    #[error(
        "group {group}, glyph {glyph}: byte-aligned data extends beyond decompressed buffer (offset={offset}, size={size}, buf_size={buf_size})"
    )]
    AlignedOverrun {
        group: usize,
        glyph: usize,
        offset: usize,
        size: usize,
        buf_size: usize,
    },

    #[error("group {group}, glyph {glyph}: row padding bits are not zero")]
    DirtyPadding { group: usize, glyph: usize },

    #[error("group {group}: total byte-aligned size {actual} != uncompressedSize {expected}")]
    UncompressedTotal {
        group: usize,
        expected: usize,
        actual: usize,
    },
}

/// Fatal failure while packing a partition image
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("no .fontbin files found in {}", dir.display())]
    NoInputs { dir: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("{}: {source}", path.display())]
    BadFontBin {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("{first} [{first_start:#x}, {first_end:#x}) overlaps {second} starting at {second_start:#x}")]
    Overlap {
        first: String,
        first_start: usize,
        first_end: usize,
        second: String,
        second_start: usize,
    },

    #[error("image size {size:#x} exceeds the 32-bit offset range")]
    TooLarge { size: usize },

    #[error(transparent)]
    Format(#[from] FormatError),
}
