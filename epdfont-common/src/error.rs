//! Errors raised while encoding or decoding binary font layouts.

/// Failure to encode or decode one of the fixed binary layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Input ended before a structure it declares
    #[error("{what} truncated: need {needed} bytes, have {actual}")]
    Truncated {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    /// Partition image does not start with the expected magic
    #[error("bad partition magic {found:#010x} (expected {expected:#010x})")]
    BadMagic { expected: u32, found: u32 },

    /// Partition image written by an incompatible packer
    #[error("unsupported partition version {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// Name does not fit its fixed-width, NUL-terminated field
    #[error("name {name:?} is too long ({len} bytes, field holds {max})")]
    NameTooLong { name: String, len: usize, max: usize },

    /// Numeric value does not fit the field it is stored in
    #[error("{field} = {value} does not fit in {ty}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        ty: &'static str,
    },

    /// A directory entry points outside the image
    #[error("{what} range {offset:#x}+{size:#x} exceeds image size {image_size:#x}")]
    RangeOutOfBounds {
        what: String,
        offset: u32,
        size: u32,
        image_size: usize,
    },

    /// Group index past the end of the group table
    #[error("group {group} does not exist ({group_count} groups)")]
    UnknownGroup { group: usize, group_count: usize },

    /// Glyph missing from the glyph table or claimed by no group
    #[error("glyph {glyph} has no bitmap")]
    UnknownGlyph { glyph: usize },
}
