//! Synthetic glyph sources for unit tests

use epdfont_common::formats::CodepointInterval;

use crate::face::{FontStack, GlyphSource, LineMetrics, RenderedGlyph};

/// Face covering fixed codepoint ranges with deterministic bitmaps
///
/// Glyph sizes vary with the codepoint unless pinned with
/// [`BlockFace::with_glyph_size`]; U+0020 renders empty.
pub struct BlockFace {
    label: String,
    ranges: Vec<CodepointInterval>,
    size: Option<(u32, u32)>,
    metrics: LineMetrics,
}

impl BlockFace {
    pub fn new(label: &str, ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            label: label.to_string(),
            ranges: ranges
                .into_iter()
                .map(|(first, last)| CodepointInterval::new(first, last))
                .collect(),
            size: None,
            metrics: LineMetrics {
                height: 20 * 64,
                ascender: 15 * 64,
                descender: -5 * 64,
            },
        }
    }

    pub fn with_glyph_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_line_metrics(mut self, height: i32, ascender: i32, descender: i32) -> Self {
        self.metrics = LineMetrics {
            height,
            ascender,
            descender,
        };
        self
    }
}

impl GlyphSource for BlockFace {
    fn label(&self) -> &str {
        &self.label
    }

    fn has_glyph(&self, codepoint: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(codepoint))
    }

    fn render(&self, codepoint: u32, _px: f32) -> Option<RenderedGlyph> {
        if !self.has_glyph(codepoint) {
            return None;
        }
        let (width, height) = match (codepoint, self.size) {
            (0x20, _) => (0, 0),
            (_, Some(size)) => size,
            _ => (3 + codepoint % 7, 5 + codepoint % 9),
        };
        let coverage = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| (codepoint.wrapping_mul(31) ^ (x * 53 + y * 97)) as u8)
            })
            .collect();
        Some(RenderedGlyph {
            width,
            height,
            left: (codepoint % 3) as i32 - 1,
            top: height as i32,
            advance: ((width + 1) * 64 + 17) as i32,
            coverage,
        })
    }

    fn line_metrics(&self, _px: f32) -> Option<LineMetrics> {
        Some(self.metrics)
    }
}

pub fn stack_of(face: BlockFace) -> FontStack {
    FontStack::new(vec![Box::new(face)]).expect("non-empty stack")
}
