//! Shared types and utilities for the e-paper font pipeline
//!
//! This crate provides the device-facing pieces shared between:
//! - `epdfont-export` (font compiler, partition packer, verifier)
//! - the firmware's font loader, which reads the same layouts back
//!
//! # Modules
//!
//! - [`packing`] - Glyph bitmap packing (grayscale → 1-bit/2-bit, packed ↔ byte-aligned)
//! - [`formats`] - `.fontbin` files and the font partition image

pub mod error;
pub mod formats;
pub mod packing;

pub use error::FormatError;

// Re-export commonly used packing items
pub use packing::{
    aligned_len, coverage_to_samples, pack_glyph, packed_len, row_stride, to_byte_aligned,
    to_packed, BitDepth,
};

// Re-export commonly used format items
pub use formats::{
    find_glyph_index, BinarySerializable, CodepointInterval, FontBin, FontBinHeader,
    FontBinMetrics, FontDirEntry, GlyphRecord, GroupDescriptor, GroupDirEntry, GroupIndex,
    IntervalRecord, PartitionHeader, PartitionImage, FONTBIN_EXT, PARTITION_MAGIC,
    PARTITION_PAGE_SIZE, PARTITION_VERSION,
};
