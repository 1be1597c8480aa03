//! `.fontbin` emitter

use epdfont_common::formats::{FontBin, FontBinMetrics};
use epdfont_common::FormatError;

use crate::error::CompileError;
use crate::model::CompiledFont;

/// Build the binary form of an uncompressed font tagged with `group`
pub fn to_fontbin(font: &CompiledFont, group: &str) -> Result<FontBin, CompileError> {
    if font.is_compressed() {
        return Err(CompileError::InvalidConfig(
            "binary output does not support compressed fonts".to_string(),
        ));
    }
    let advance_y = u8::try_from(font.metrics.advance_y).map_err(|_| FormatError::OutOfRange {
        field: "advanceY",
        value: font.metrics.advance_y.into(),
        ty: "u8",
    })?;

    Ok(FontBin::new(
        &font.name,
        group,
        FontBinMetrics {
            advance_y,
            is_2bit: font.depth.is_2bit(),
            ascender: font.metrics.ascender,
            descender: font.metrics.descender,
        },
        font.bitmap.clone(),
        font.glyphs.clone(),
        font.interval_records(),
    )?)
}
