//! C header emitter

use anyhow::Result;
use std::fmt::Write as FmtWrite;

use crate::model::CompiledFont;

/// Bitmap bytes per line
const BYTES_PER_LINE: usize = 16;

/// glyphToGroup entries per line
const GROUP_IDS_PER_LINE: usize = 32;

/// Provenance printed in the leading comment block
#[derive(Debug, Clone, Default)]
pub struct Banner {
    pub size: u32,
    pub command: String,
}

/// Render the header text for a compiled font
pub fn render_header(font: &CompiledFont, banner: &Banner) -> Result<String> {
    let name = &font.name;
    let mut output = String::new();

    writeln!(output, "/**")?;
    writeln!(output, " * generated by epdfont-export")?;
    writeln!(output, " * name: {}", name)?;
    writeln!(output, " * size: {}", banner.size)?;
    writeln!(
        output,
        " * mode: {}{}",
        if font.depth.is_2bit() { "2-bit" } else { "1-bit" },
        if font.is_compressed() { "  compressed: true" } else { "" }
    )?;
    writeln!(output, " * Command used: {}", banner.command.replace("*/", "* /"))?;
    writeln!(output, " */")?;
    writeln!(output, "#pragma once")?;
    writeln!(output, "#include \"EpdFontData.h\"")?;
    writeln!(output)?;

    writeln!(
        output,
        "static const uint8_t {}Bitmaps[{}] = {{",
        name,
        font.bitmap.len()
    )?;
    for line in font.bitmap.chunks(BYTES_PER_LINE) {
        let bytes: Vec<String> = line.iter().map(|b| format!("0x{:02X},", b)).collect();
        writeln!(output, "    {}", bytes.join(" "))?;
    }
    writeln!(output, "}};")?;
    writeln!(output)?;

    writeln!(output, "static const EpdGlyph {}Glyphs[] = {{", name)?;
    for glyph in &font.glyphs {
        writeln!(
            output,
            "    {{ {}, {}, {}, {}, {}, {}, {} }}, // {}",
            glyph.width,
            glyph.height,
            glyph.advance_x,
            glyph.left,
            glyph.top,
            glyph.data_length,
            glyph.data_offset,
            comment_char(glyph.codepoint)
        )?;
    }
    writeln!(output, "}};")?;
    writeln!(output)?;

    writeln!(output, "static const EpdUnicodeInterval {}Intervals[] = {{", name)?;
    for record in font.interval_records() {
        writeln!(
            output,
            "    {{ 0x{:X}, 0x{:X}, 0x{:X} }},",
            record.first, record.last, record.offset
        )?;
    }
    writeln!(output, "}};")?;
    writeln!(output)?;

    if let Some(groups) = &font.groups {
        writeln!(output, "static const EpdFontGroup {}Groups[] = {{", name)?;
        for group in groups {
            writeln!(
                output,
                "    {{ {}, {}, {}, {}, {} }},",
                group.compressed_offset,
                group.compressed_size,
                group.uncompressed_size,
                group.glyph_count,
                group.first_glyph_index
            )?;
        }
        writeln!(output, "}};")?;
        writeln!(output)?;
    }

    if let Some(glyph_to_group) = &font.glyph_to_group {
        writeln!(output, "static const uint16_t {}GlyphToGroup[] = {{", name)?;
        for line in glyph_to_group.chunks(GROUP_IDS_PER_LINE) {
            let ids: Vec<String> = line.iter().map(|id| format!("{},", id)).collect();
            writeln!(output, "    {}", ids.join(" "))?;
        }
        writeln!(output, "}};")?;
        writeln!(output)?;
    }

    writeln!(output, "static const EpdFontData {} = {{", name)?;
    writeln!(output, "    {}Bitmaps,", name)?;
    writeln!(output, "    {}Glyphs,", name)?;
    writeln!(output, "    {}Intervals,", name)?;
    writeln!(output, "    {},", font.intervals.len())?;
    writeln!(output, "    {},", font.metrics.advance_y)?;
    writeln!(output, "    {},", font.metrics.ascender)?;
    writeln!(output, "    {},", font.metrics.descender)?;
    writeln!(output, "    {},", font.depth.is_2bit())?;
    match &font.groups {
        Some(groups) => {
            writeln!(output, "    {}Groups,", name)?;
            writeln!(output, "    {},", groups.len())?;
        }
        None => {
            writeln!(output, "    nullptr,")?;
            writeln!(output, "    0,")?;
        }
    }
    if font.glyph_to_group.is_some() {
        writeln!(output, "    {}GlyphToGroup,", name)?;
    } else {
        writeln!(output, "    nullptr,")?;
    }
    writeln!(output, "}};")?;

    Ok(output)
}

/// Trailing `// x` comment text for a glyph
fn comment_char(codepoint: u32) -> String {
    match char::from_u32(codepoint) {
        Some('\\') => "<backslash>".to_string(),
        Some(c) if !c.is_control() && !matches!(c, '\u{2028}' | '\u{2029}') => c.to_string(),
        _ => format!("U+{:04X}", codepoint),
    }
}
