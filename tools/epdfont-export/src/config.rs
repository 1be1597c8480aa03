//! Compile options
//!
//! Every knob of one compiler run, validated up front so that invalid
//! combinations fail before any font is loaded or any output is written.

use std::path::PathBuf;

use epdfont_common::formats::CodepointInterval;
use epdfont_common::BitDepth;

use crate::error::CompileError;

/// Panel density the point size is rendered at
pub const DEFAULT_DPI: u32 = 150;

/// Glyphs per frequency group
pub const DEFAULT_GROUP_SIZE: usize = 128;

/// Longest font name the 32-byte name fields accept
pub const MAX_FONT_NAME_LEN: usize = 31;

/// Longest group tag the 16-byte tag fields accept
pub const MAX_GROUP_TAG_LEN: usize = 15;

/// Output format of a compiled font
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// C header with static arrays
    #[default]
    Header,
    /// `.fontbin` tagged with a partition group
    Binary { group: String },
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Font name; prefixes every emitted array
    pub name: String,
    /// Point size
    pub size: u32,
    /// Font files in descending fallback priority
    pub font_paths: Vec<PathBuf>,
    pub depth: BitDepth,
    pub compress: bool,
    /// Intervals added to the base coverage set
    pub additional_intervals: Vec<CodepointInterval>,
    pub frequency_table: Option<PathBuf>,
    pub group_size: usize,
    pub pin_groups: usize,
    /// Size of non-pinned frequency groups; 0 means `group_size`
    pub non_pinned_group_size: usize,
    /// Keep only the top N CJK ideographs by rank; 0 means unlimited
    pub max_cjk_ideographs: usize,
    /// Keep only the top N Hangul syllables by rank; 0 means unlimited
    pub max_hangul: usize,
    pub dpi: u32,
    pub output: OutputMode,
}

impl CompileOptions {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
            font_paths: Vec::new(),
            depth: BitDepth::One,
            compress: false,
            additional_intervals: Vec::new(),
            frequency_table: None,
            group_size: DEFAULT_GROUP_SIZE,
            pin_groups: 0,
            non_pinned_group_size: 0,
            max_cjk_ideographs: 0,
            max_hangul: 0,
            dpi: DEFAULT_DPI,
            output: OutputMode::Header,
        }
    }

    /// Pixels per em the faces are rendered at
    pub fn pixel_size(&self) -> f32 {
        self.size as f32 * self.dpi as f32 / 72.0
    }

    /// Effective size of non-pinned frequency groups
    pub fn effective_non_pinned_size(&self) -> usize {
        if self.non_pinned_group_size > 0 {
            self.non_pinned_group_size
        } else {
            self.group_size
        }
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        let invalid = |msg: String| Err(CompileError::InvalidConfig(msg));

        if !is_c_identifier(&self.name) {
            return invalid(format!("font name {:?} is not a C identifier", self.name));
        }
        if self.name.len() > MAX_FONT_NAME_LEN {
            return invalid(format!(
                "font name {:?} is longer than {} bytes",
                self.name, MAX_FONT_NAME_LEN
            ));
        }
        if self.size == 0 || self.dpi == 0 {
            return invalid("size and dpi must be positive".to_string());
        }
        if self.compress && self.depth != BitDepth::Two {
            return invalid(
                "--compress requires --2bit (byte-aligned compression only supports 2-bit format)"
                    .to_string(),
            );
        }
        if self.group_size == 0 {
            return invalid("--group-size must be positive".to_string());
        }
        for interval in &self.additional_intervals {
            if interval.first > interval.last {
                return invalid(format!(
                    "interval {:#x},{:#x} ends before it starts",
                    interval.first, interval.last
                ));
            }
        }
        if let OutputMode::Binary { group } = &self.output {
            if self.compress {
                return invalid("binary output does not support --compress".to_string());
            }
            if group.is_empty() || group.len() > MAX_GROUP_TAG_LEN {
                return invalid(format!(
                    "group tag {:?} must be 1 to {} bytes",
                    group, MAX_GROUP_TAG_LEN
                ));
            }
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a decimal or `0x`-prefixed hexadecimal codepoint
pub fn parse_codepoint(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid code point {:?}: {}", text, e))
}

/// Parse `min,max` into an inclusive interval
pub fn parse_interval(text: &str) -> Result<CodepointInterval, String> {
    let (min, max) = text
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got {:?}", text))?;
    let first = parse_codepoint(min)?;
    let last = parse_codepoint(max)?;
    if first > last {
        return Err(format!("interval {:?} ends before it starts", text));
    }
    Ok(CodepointInterval::new(first, last))
}
