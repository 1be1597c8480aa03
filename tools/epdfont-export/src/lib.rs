//! epdfont-export library
//!
//! Compiles TTF/OTF fonts into the glyph tables an e-paper reader draws from,
//! packs `.fontbin` outputs into a flash partition image, and verifies
//! compressed headers by re-reading them. It also builds the CJK frequency
//! table that drives coverage caps and frequency grouping.

pub mod compile;
pub mod compress;
pub mod config;
pub mod coverage;
pub mod emit;
pub mod error;
pub mod face;
pub mod frequency;
pub mod grouping;
pub mod manifest;
pub mod model;
pub mod output;
pub mod partition;
pub mod rank_table;
pub mod raster;
pub mod verify;

#[cfg(test)]
mod test_support;

// Re-export the pipeline entry points
pub use compile::{compile_font, compile_from_files};
pub use config::{CompileOptions, OutputMode};
pub use emit::{render_header, to_fontbin, Banner};
pub use error::{CompileError, HeaderError, PartitionError, VerifyError};
pub use face::{FontStack, FontdueFace, GlyphSource, LineMetrics, RenderedGlyph};
pub use frequency::FrequencyTable;
pub use model::{CompiledFont, FaceMetrics, GroupDescriptor};
pub use partition::{collect_fontbins, pack_dir, pack_partition, PartitionInput};
pub use rank_table::{build_ranking, RankSources, Ranking};
pub use verify::{
    decode_group, glyph_bitmap, verify_dir, verify_font, verify_header, Outcome, VerifyReport,
};
