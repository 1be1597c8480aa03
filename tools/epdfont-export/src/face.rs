//! Font faces and the fallback stack
//!
//! Rasterization itself is delegated to a [`GlyphSource`]. The shipped source
//! wraps `fontdue`; tests plug in synthetic faces.

use std::path::{Path, PathBuf};

use crate::error::CompileError;

/// Codepoint whose face supplies the line metrics
pub const METRICS_PROBE: char = '|';

/// Convert a pixel quantity to 26.6 fixed point
#[inline]
pub fn to_26_6(value: f32) -> i32 {
    (value * 64.0).round() as i32
}

/// Floor of a 26.6 value in whole pixels
#[inline]
pub fn norm_floor(value: i32) -> i32 {
    value.div_euclid(64)
}

/// Ceiling of a 26.6 value in whole pixels
#[inline]
pub fn norm_ceil(value: i32) -> i32 {
    -(-value).div_euclid(64)
}

/// One rendered glyph: 8-bit coverage plus 26.6 metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGlyph {
    pub width: u32,
    pub height: u32,
    /// Pen position to left edge of the bitmap
    pub left: i32,
    /// Baseline to top edge of the bitmap (positive up)
    pub top: i32,
    /// Horizontal advance in 26.6 fixed point
    pub advance: i32,
    /// Row-major coverage, one byte per pixel (0 = background)
    pub coverage: Vec<u8>,
}

/// Face-level vertical metrics in 26.6 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMetrics {
    pub height: i32,
    pub ascender: i32,
    /// Negative below the baseline
    pub descender: i32,
}

/// External rendering primitive: outline + codepoint → grayscale bitmap
pub trait GlyphSource: Send + Sync {
    /// Label used in logs
    fn label(&self) -> &str;

    /// Whether the face maps the codepoint to a nonzero glyph index
    fn has_glyph(&self, codepoint: u32) -> bool;

    /// Render at `px` pixels per em, `None` when the face lacks the glyph
    fn render(&self, codepoint: u32, px: f32) -> Option<RenderedGlyph>;

    /// Vertical metrics at `px` pixels per em
    fn line_metrics(&self, px: f32) -> Option<LineMetrics>;
}

/// `fontdue`-backed face loaded from a TTF/OTF file
pub struct FontdueFace {
    label: String,
    font: fontdue::Font,
}

impl FontdueFace {
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let data = std::fs::read(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default()).map_err(
            |message| CompileError::FontLoad {
                path: path.to_path_buf(),
                message: message.to_string(),
            },
        )?;
        Ok(Self {
            label: path.display().to_string(),
            font,
        })
    }

    fn glyph_index(&self, codepoint: u32) -> Option<u16> {
        let ch = char::from_u32(codepoint)?;
        match self.font.lookup_glyph_index(ch) {
            0 => None,
            index => Some(index),
        }
    }
}

impl GlyphSource for FontdueFace {
    fn label(&self) -> &str {
        &self.label
    }

    fn has_glyph(&self, codepoint: u32) -> bool {
        self.glyph_index(codepoint).is_some()
    }

    fn render(&self, codepoint: u32, px: f32) -> Option<RenderedGlyph> {
        let index = self.glyph_index(codepoint)?;
        let (metrics, coverage) = self.font.rasterize_indexed(index, px);
        Some(RenderedGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            advance: to_26_6(metrics.advance_width),
            coverage,
        })
    }

    fn line_metrics(&self, px: f32) -> Option<LineMetrics> {
        let metrics = self.font.horizontal_line_metrics(px)?;
        Some(LineMetrics {
            height: to_26_6(metrics.new_line_size),
            ascender: to_26_6(metrics.ascent),
            descender: to_26_6(metrics.descent),
        })
    }
}

/// Faces consulted in priority order until one supplies a glyph
pub struct FontStack {
    faces: Vec<Box<dyn GlyphSource>>,
}

impl FontStack {
    pub fn new(faces: Vec<Box<dyn GlyphSource>>) -> Result<Self, CompileError> {
        if faces.is_empty() {
            return Err(CompileError::EmptyFontStack);
        }
        Ok(Self { faces })
    }

    /// Load every font file with `fontdue`
    pub fn load(paths: &[PathBuf]) -> Result<Self, CompileError> {
        let faces = paths
            .iter()
            .map(|path| FontdueFace::load(path).map(|face| Box::new(face) as Box<dyn GlyphSource>))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(faces)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// First face that has the codepoint
    pub fn face_for(&self, codepoint: u32) -> Option<&dyn GlyphSource> {
        self.faces
            .iter()
            .map(|face| face.as_ref())
            .find(|face| face.has_glyph(codepoint))
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.face_for(codepoint).is_some()
    }

    pub fn render(&self, codepoint: u32, px: f32) -> Option<RenderedGlyph> {
        self.face_for(codepoint)?.render(codepoint, px)
    }

    /// Line metrics of the first face containing `'|'`, else of the first face
    pub fn line_metrics(&self, px: f32) -> Option<LineMetrics> {
        let face = self
            .face_for(METRICS_PROBE as u32)
            .or_else(|| self.faces.first().map(|face| face.as_ref()))?;
        face.line_metrics(px)
    }
}

impl std::fmt::Debug for FontStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.faces.iter().map(|face| face.label()))
            .finish()
    }
}
