//! Compile pipeline: coverage → rasterize → group/compress → [`CompiledFont`]

use tracing::{info, warn};

use epdfont_common::formats::CodepointInterval;
use epdfont_common::BitDepth;

use crate::compress::compress_groups;
use crate::config::CompileOptions;
use crate::coverage::{plan_coverage, CoverageCaps, BASE_INTERVALS};
use crate::error::CompileError;
use crate::face::{norm_ceil, norm_floor, FontStack};
use crate::frequency::FrequencyTable;
use crate::grouping::{group_by_frequency, group_by_script, FrequencyParams, CJK_FREQUENCY_THRESHOLD};
use crate::model::{CompiledFont, FaceMetrics};

/// Load the fonts and frequency table named by `options`, then compile
pub fn compile_from_files(options: &CompileOptions) -> Result<CompiledFont, CompileError> {
    options.validate()?;
    let stack = FontStack::load(&options.font_paths)?;
    let frequency = options
        .frequency_table
        .as_deref()
        .map(FrequencyTable::load)
        .transpose()?;
    compile_font(options, &stack, frequency.as_ref())
}

/// Base coverage set plus the caller's additions
pub fn requested_intervals(options: &CompileOptions) -> Vec<CodepointInterval> {
    BASE_INTERVALS
        .iter()
        .chain(&options.additional_intervals)
        .copied()
        .collect()
}

pub fn compile_font(
    options: &CompileOptions,
    stack: &FontStack,
    frequency: Option<&FrequencyTable>,
) -> Result<CompiledFont, CompileError> {
    options.validate()?;
    let px = options.pixel_size();

    let caps = CoverageCaps::new(frequency, options.max_cjk_ideographs, options.max_hangul);
    let coverage = plan_coverage(&requested_intervals(options), &caps, |cp| stack.contains(cp));
    if !coverage.missing.is_empty() {
        warn!(
            "{} code points missing from the font stack",
            coverage.missing.len()
        );
    }
    info!(
        "{}: {} glyphs in {} intervals at {:.1}px",
        options.name,
        coverage.glyph_count(),
        coverage.intervals.len(),
        px
    );

    let glyphs = crate::raster::rasterize(stack, &coverage.intervals, px, options.depth)?;

    let line = stack
        .line_metrics(px)
        .ok_or_else(|| CompileError::FontLoad {
            path: options.font_paths.first().cloned().unwrap_or_default(),
            message: "face has no horizontal line metrics".to_string(),
        })?;
    let metrics = FaceMetrics {
        advance_y: norm_ceil(line.height),
        ascender: norm_ceil(line.ascender),
        descender: norm_floor(line.descender),
    };

    if !options.compress {
        return Ok(CompiledFont {
            name: options.name.clone(),
            depth: options.depth,
            bitmap: glyphs.iter().flat_map(|g| g.packed.iter().copied()).collect(),
            glyphs: glyphs.into_iter().map(|g| g.record).collect(),
            intervals: coverage.intervals,
            metrics,
            groups: None,
            glyph_to_group: None,
        });
    }

    let codepoints: Vec<u32> = glyphs.iter().map(|g| g.record.codepoint).collect();
    let plan = match frequency {
        Some(table) if !table.is_empty() => group_by_frequency(
            &codepoints,
            table,
            FrequencyParams {
                group_size: options.group_size,
                pin_groups: options.pin_groups,
                non_pinned_group_size: options.non_pinned_group_size,
            },
        )?,
        _ => group_by_script(&codepoints),
    };

    let compressed = compress_groups(&glyphs, &plan, BitDepth::Two)?;
    log_compression(options, &codepoints, &compressed.bitmap, compressed.packed_size, &plan);

    Ok(CompiledFont {
        name: options.name.clone(),
        depth: options.depth,
        bitmap: compressed.bitmap,
        glyphs: compressed.glyphs,
        intervals: coverage.intervals,
        metrics,
        groups: Some(compressed.groups),
        glyph_to_group: plan.glyph_to_group,
    })
}

fn log_compression(
    options: &CompileOptions,
    codepoints: &[u32],
    bitmap: &[u8],
    packed_size: usize,
    plan: &crate::grouping::GroupPlan,
) {
    let ratio = if packed_size == 0 {
        100.0
    } else {
        100.0 * bitmap.len() as f64 / packed_size as f64
    };
    info!(
        "Compression: {} packed -> {} compressed ({:.1}%), {} groups",
        packed_size,
        bitmap.len(),
        ratio,
        plan.groups.len()
    );
    if plan.is_sparse() {
        let cjk = codepoints
            .iter()
            .filter(|&&cp| cp >= CJK_FREQUENCY_THRESHOLD)
            .count();
        info!(
            "Groups: {} pinned CJK [{}/grp] + {} Latin + {} CJK [{}/grp]",
            plan.tiers.pinned,
            options.group_size,
            plan.tiers.script,
            plan.tiers.remaining,
            options.effective_non_pinned_size()
        );
        info!(
            "Glyphs: {} total ({} CJK, {} Latin)",
            codepoints.len(),
            cjk,
            codepoints.len() - cjk
        );
    }
}
