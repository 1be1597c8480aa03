//! Coverage planning
//!
//! Turns the requested Unicode ranges into the final, sorted and disjoint
//! interval list: ranges are merged, then every codepoint that is capped out
//! of a frequency top-N set or missing from the whole fallback stack is cut
//! out, leaving a hole in the interval list.

use hashbrown::HashSet;
use tracing::{debug, info, warn};

use epdfont_common::formats::CodepointInterval;

use crate::frequency::FrequencyTable;

/// Unicode ranges every font covers before additions and exclusions
pub const BASE_INTERVALS: [CodepointInterval; 13] = [
    // Basic Latin
    CodepointInterval::new(0x0020, 0x007F),
    // Latin-1 Supplement
    CodepointInterval::new(0x0080, 0x00FF),
    // Latin Extended-A
    CodepointInterval::new(0x0100, 0x017F),
    // General Punctuation
    CodepointInterval::new(0x2000, 0x206F),
    // Dashes, quotes, prime marks
    CodepointInterval::new(0x2010, 0x203A),
    // Misc punctuation
    CodepointInterval::new(0x2040, 0x205F),
    // Currency Symbols
    CodepointInterval::new(0x20A0, 0x20CF),
    // Combining Diacritical Marks
    CodepointInterval::new(0x0300, 0x036F),
    // Cyrillic
    CodepointInterval::new(0x0400, 0x04FF),
    // Superscripts and Subscripts
    CodepointInterval::new(0x2070, 0x209F),
    // Mathematical Operators
    CodepointInterval::new(0x2200, 0x22FF),
    // Arrows
    CodepointInterval::new(0x2190, 0x21FF),
    // Replacement Character
    CodepointInterval::new(0xFFFD, 0xFFFD),
];

/// CJK Unified Ideographs
pub const CJK_IDEOGRAPHS: CodepointInterval = CodepointInterval::new(0x4E00, 0x9FFF);

/// Hangul Syllables
pub const HANGUL_SYLLABLES: CodepointInterval = CodepointInterval::new(0xAC00, 0xD7AF);

/// Sort and coalesce intervals that touch or overlap
pub fn merge_intervals(intervals: &[CodepointInterval]) -> Vec<CodepointInterval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_unstable();

    let mut merged: Vec<CodepointInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.first <= last.last.saturating_add(1) => {
                last.last = last.last.max(interval.last);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Frequency caps on large blocks
#[derive(Debug, Clone, Default)]
pub struct CoverageCaps {
    cjk: Option<HashSet<u32>>,
    hangul: Option<HashSet<u32>>,
}

impl CoverageCaps {
    /// No caps: every codepoint the fallback stack has is kept
    pub fn none() -> Self {
        Self::default()
    }

    /// Build the allowed sets; a cap of 0 means unlimited
    ///
    /// Caps need a frequency table to rank against. Without one they are
    /// ignored with a warning.
    pub fn new(table: Option<&FrequencyTable>, max_cjk: usize, max_hangul: usize) -> Self {
        let table = match table {
            Some(table) if !table.is_empty() => table,
            _ => {
                if max_cjk > 0 || max_hangul > 0 {
                    warn!("CJK/Hangul caps need a frequency table; ignoring them");
                }
                return Self::none();
            }
        };

        let allowed = |block: CodepointInterval, max: usize, label: &str| {
            (max > 0).then(|| {
                let top = table.top_in_range(block.first, block.last, max);
                info!(
                    "{} limit: {} (from {} in frequency table)",
                    label,
                    max,
                    table.count_in_range(block.first, block.last)
                );
                top.into_iter().collect::<HashSet<u32>>()
            })
        };

        Self {
            cjk: allowed(CJK_IDEOGRAPHS, max_cjk, "CJK ideograph"),
            hangul: allowed(HANGUL_SYLLABLES, max_hangul, "Hangul syllable"),
        }
    }

    /// Whether the caps keep a codepoint
    pub fn allows(&self, codepoint: u32) -> bool {
        if let Some(allowed) = &self.cjk
            && CJK_IDEOGRAPHS.contains(codepoint)
        {
            return allowed.contains(&codepoint);
        }
        if let Some(allowed) = &self.hangul
            && HANGUL_SYLLABLES.contains(codepoint)
        {
            return allowed.contains(&codepoint);
        }
        true
    }
}

/// Result of coverage planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoveragePlan {
    /// Sorted, pairwise-disjoint intervals to rasterize
    pub intervals: Vec<CodepointInterval>,
    /// Codepoints no font in the stack could supply
    pub missing: Vec<u32>,
    /// Codepoints removed by frequency caps
    pub capped: usize,
}

impl CoveragePlan {
    pub fn glyph_count(&self) -> usize {
        self.intervals.iter().map(|i| i.len() as usize).sum()
    }
}

/// Plan the final interval list
///
/// `has_glyph` reports whether any font in the fallback stack supplies a
/// codepoint. Missing codepoints are logged and excluded, never fatal.
pub fn plan_coverage(
    requested: &[CodepointInterval],
    caps: &CoverageCaps,
    has_glyph: impl Fn(u32) -> bool,
) -> CoveragePlan {
    let mut plan = CoveragePlan::default();

    for interval in merge_intervals(requested) {
        let mut run_start: Option<u32> = None;
        for codepoint in interval.codepoints() {
            let keep = if !caps.allows(codepoint) {
                debug!("U+{:04X} excluded by frequency cap", codepoint);
                plan.capped += 1;
                false
            } else if !has_glyph(codepoint) {
                warn!(
                    "code point {} (U+{:04X}) not found in font stack",
                    codepoint, codepoint
                );
                plan.missing.push(codepoint);
                false
            } else {
                true
            };

            match (keep, run_start) {
                (true, None) => run_start = Some(codepoint),
                (false, Some(start)) => {
                    plan.intervals.push(CodepointInterval::new(start, codepoint - 1));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            plan.intervals.push(CodepointInterval::new(start, interval.last));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn iv(first: u32, last: u32) -> CodepointInterval {
        CodepointInterval::new(first, last)
    }

    #[test]
    fn test_merge_touching_and_overlapping() {
        let merged = merge_intervals(&[iv(0x30, 0x39), iv(0x20, 0x2F), iv(0x35, 0x50), iv(0x52, 0x60)]);
        assert_eq!(merged, vec![iv(0x20, 0x50), iv(0x52, 0x60)]);
    }

    #[test]
    fn test_merge_base_intervals() {
        let merged = merge_intervals(&BASE_INTERVALS);
        assert_eq!(
            merged,
            vec![
                iv(0x20, 0x17F),
                iv(0x300, 0x36F),
                iv(0x400, 0x4FF),
                iv(0x2000, 0x20CF),
                iv(0x2190, 0x22FF),
                iv(0xFFFD, 0xFFFD),
            ]
        );
    }

    #[test]
    fn test_merge_preserves_union() {
        let mut rng = Pcg32::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let input: Vec<CodepointInterval> = (0..rng.random_range(1..12))
                .map(|_| {
                    let first = rng.random_range(0..300u32);
                    iv(first, first + rng.random_range(0..20u32))
                })
                .collect();
            let merged = merge_intervals(&input);

            for pair in merged.windows(2) {
                assert!(pair[0].last + 1 < pair[1].first, "{:?}", merged);
            }
            for cp in 0..340u32 {
                let in_input = input.iter().any(|i| i.contains(cp));
                let in_merged = merged.iter().any(|i| i.contains(cp));
                assert_eq!(in_input, in_merged, "cp {} of {:?}", cp, input);
            }
        }
    }

    #[test]
    fn test_missing_glyphs_leave_holes() {
        let plan = plan_coverage(&[iv(0x41, 0x46)], &CoverageCaps::none(), |cp| {
            cp != 0x43 && cp != 0x46
        });
        assert_eq!(plan.intervals, vec![iv(0x41, 0x42), iv(0x44, 0x45)]);
        assert_eq!(plan.missing, vec![0x43, 0x46]);
        assert_eq!(plan.glyph_count(), 4);
    }

    #[test]
    fn test_all_missing_yields_no_interval() {
        let plan = plan_coverage(&[iv(0x41, 0x42)], &CoverageCaps::none(), |_| false);
        assert!(plan.intervals.is_empty());
        assert_eq!(plan.missing.len(), 2);
    }

    #[test]
    fn test_capped_codepoints_never_emitted() {
        let table = FrequencyTable::from_ranks([(0x4E01, 1), (0x4E05, 2), (0x4E03, 3), (0xAC00, 1)]);
        let caps = CoverageCaps::new(Some(&table), 2, 0);
        let plan = plan_coverage(&[iv(0x4E00, 0x4E06), iv(0xAC00, 0xAC01)], &caps, |_| true);

        assert_eq!(
            plan.intervals,
            vec![iv(0x4E01, 0x4E01), iv(0x4E05, 0x4E05), iv(0xAC00, 0xAC01)]
        );
        assert_eq!(plan.capped, 5);
        assert!(!plan.intervals.iter().any(|i| i.contains(0x4E03)));
    }

    #[test]
    fn test_hangul_cap_keeps_top_syllables() {
        let table = FrequencyTable::from_ranks([
            (0xAC05, 1),
            (0xAC01, 2),
            (0xAC03, 3),
            (0xAC00, 4),
            (0x4E00, 1),
        ]);
        let caps = CoverageCaps::new(Some(&table), 0, 2);
        let plan = plan_coverage(&[iv(0x4E00, 0x4E01), iv(0xAC00, 0xAC06)], &caps, |_| true);

        assert_eq!(
            plan.intervals,
            vec![iv(0x4E00, 0x4E01), iv(0xAC01, 0xAC01), iv(0xAC05, 0xAC05)]
        );
        assert_eq!(plan.capped, 5);
        for cp in [0xAC00, 0xAC02, 0xAC03, 0xAC04, 0xAC06] {
            assert!(!plan.intervals.iter().any(|i| i.contains(cp)), "{:#X}", cp);
        }
    }

    #[test]
    fn test_caps_without_table_are_ignored() {
        let caps = CoverageCaps::new(None, 10, 10);
        assert!(caps.allows(0x4E00));
        assert!(caps.allows(0xAC00));
    }
}
