//! Glyph grouping
//!
//! A group is the unit of compression and of the device's decompression
//! cache. Two strategies:
//!
//! - **Script adjacency**: consecutive glyphs in the same script block share a
//!   group. Groups are contiguous index ranges.
//! - **Frequency hybrid**: glyphs below [`CJK_FREQUENCY_THRESHOLD`] keep script
//!   grouping; the rest are ranked by frequency and chunked into a pinned tier
//!   and a remaining tier. Membership is sparse, so a glyph→group table is
//!   emitted.
//!
//! Group order is pinned, then script, then remaining, so the hottest data
//! gets the lowest group ids.

use std::ops::Range;

use epdfont_common::formats::CodepointInterval;

use crate::error::CompileError;
use crate::frequency::FrequencyTable;

/// Script blocks that keep glyphs adjacent
pub const SCRIPT_GROUP_RANGES: [CodepointInterval; 11] = [
    CodepointInterval::new(0x0000, 0x007F), // ASCII
    CodepointInterval::new(0x0080, 0x00FF), // Latin-1 Supplement
    CodepointInterval::new(0x0100, 0x017F), // Latin Extended-A
    CodepointInterval::new(0x0300, 0x036F), // Combining Diacritical Marks
    CodepointInterval::new(0x0400, 0x04FF), // Cyrillic
    CodepointInterval::new(0x2000, 0x206F), // General Punctuation
    CodepointInterval::new(0x2070, 0x209F), // Superscripts & Subscripts
    CodepointInterval::new(0x20A0, 0x20CF), // Currency Symbols
    CodepointInterval::new(0x2190, 0x21FF), // Arrows
    CodepointInterval::new(0x2200, 0x22FF), // Math Operators
    CodepointInterval::new(0xFFFD, 0xFFFD), // Replacement Character
];

/// Codepoints at or above this use frequency grouping
pub const CJK_FREQUENCY_THRESHOLD: u32 = 0x3000;

/// Script block of a codepoint; `None` for codepoints outside every block
pub fn script_key(codepoint: u32) -> Option<usize> {
    SCRIPT_GROUP_RANGES
        .iter()
        .position(|range| range.contains(codepoint))
}

/// Sizes for frequency grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyParams {
    pub group_size: usize,
    pub pin_groups: usize,
    pub non_pinned_group_size: usize,
}

/// Group counts per tier, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub pinned: usize,
    pub script: usize,
    pub remaining: usize,
}

/// Final group membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    /// Glyph indices of each group, in layout order
    pub groups: Vec<Vec<usize>>,
    /// Group id of every glyph; present for sparse (frequency) plans only
    pub glyph_to_group: Option<Vec<u16>>,
    pub tiers: TierCounts,
}

impl GroupPlan {
    pub fn is_sparse(&self) -> bool {
        self.glyph_to_group.is_some()
    }
}

/// Contiguous runs of equal script key over `codepoints`, as index ranges
fn script_runs(codepoints: &[u32], indices: impl Iterator<Item = usize>) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut current: Option<Option<usize>> = None;
    for index in indices {
        let key = script_key(codepoints[index]);
        match runs.last_mut() {
            Some(run) if current == Some(key) && run.end == index => run.end = index + 1,
            _ => {
                runs.push(index..index + 1);
                current = Some(key);
            }
        }
    }
    runs
}

/// Script-adjacency grouping over the whole glyph set
pub fn group_by_script(codepoints: &[u32]) -> GroupPlan {
    let groups: Vec<Vec<usize>> = script_runs(codepoints, 0..codepoints.len())
        .into_iter()
        .map(|run| run.collect())
        .collect();
    GroupPlan {
        tiers: TierCounts {
            script: groups.len(),
            ..TierCounts::default()
        },
        groups,
        glyph_to_group: None,
    }
}

/// Frequency-hybrid grouping
///
/// Ranked glyphs are ordered by (rank, glyph index); the first
/// `pin_groups * group_size` form the pinned tier in chunks of `group_size`,
/// the rest form the remaining tier in chunks of `non_pinned_group_size`.
/// Each chunk is re-sorted by glyph index; chunks stay in frequency order.
pub fn group_by_frequency(
    codepoints: &[u32],
    table: &FrequencyTable,
    params: FrequencyParams,
) -> Result<GroupPlan, CompileError> {
    if params.group_size == 0 {
        return Err(CompileError::InvalidConfig(
            "group size must be positive".to_string(),
        ));
    }
    let non_pinned_size = if params.non_pinned_group_size > 0 {
        params.non_pinned_group_size
    } else {
        params.group_size
    };

    let script_groups: Vec<Vec<usize>> = script_runs(
        codepoints,
        (0..codepoints.len()).filter(|&i| codepoints[i] < CJK_FREQUENCY_THRESHOLD),
    )
    .into_iter()
    .map(|run| run.collect())
    .collect();

    // Stable sort keeps glyph-index order among equal ranks
    let mut ranked: Vec<usize> = (0..codepoints.len())
        .filter(|&i| codepoints[i] >= CJK_FREQUENCY_THRESHOLD)
        .collect();
    ranked.sort_by_key(|&i| table.rank(codepoints[i]));

    let pinned_count = params
        .pin_groups
        .saturating_mul(params.group_size)
        .min(ranked.len());
    let (pinned, remaining) = ranked.split_at(pinned_count);

    let chunk = |glyphs: &[usize], size: usize| -> Vec<Vec<usize>> {
        glyphs
            .chunks(size)
            .map(|chunk| {
                let mut group = chunk.to_vec();
                group.sort_unstable();
                group
            })
            .collect()
    };
    let pinned_groups = chunk(pinned, params.group_size);
    let remaining_groups = chunk(remaining, non_pinned_size);

    let tiers = TierCounts {
        pinned: pinned_groups.len(),
        script: script_groups.len(),
        remaining: remaining_groups.len(),
    };
    let groups: Vec<Vec<usize>> = pinned_groups
        .into_iter()
        .chain(script_groups)
        .chain(remaining_groups)
        .collect();

    if groups.len() > usize::from(u16::MAX) + 1 {
        return Err(CompileError::TooManyGroups {
            count: groups.len(),
        });
    }
    let mut glyph_to_group = vec![0u16; codepoints.len()];
    for (group_id, members) in groups.iter().enumerate() {
        for &glyph in members {
            glyph_to_group[glyph] = group_id as u16;
        }
    }

    Ok(GroupPlan {
        groups,
        glyph_to_group: Some(glyph_to_group),
        tiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_key() {
        assert_eq!(script_key(0x41), Some(0));
        assert_eq!(script_key(0xE9), Some(1));
        assert_eq!(script_key(0x2014), Some(5));
        assert_eq!(script_key(0xFFFD), Some(10));
        assert_eq!(script_key(0x0370), None);
        assert_eq!(script_key(0x4E00), None);
    }

    #[test]
    fn test_script_groups_split_on_key_change() {
        let codepoints = [0x41, 0x42, 0xE9, 0xEA, 0x0391, 0x0392, 0x2014];
        let plan = group_by_script(&codepoints);
        assert_eq!(
            plan.groups,
            vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6]]
        );
        assert!(!plan.is_sparse());
        assert_eq!(plan.tiers.script, 4);
    }

    #[test]
    fn test_frequency_tiers() {
        // 0..3 Latin, 3..13 CJK with ranks reversed to codepoint order
        let mut codepoints = vec![0x41, 0x42, 0x2014];
        codepoints.extend(0x4E00..0x4E0A);
        let table = FrequencyTable::from_ranks((0..10u32).map(|i| (0x4E00 + i, 10 - i)));

        let plan = group_by_frequency(
            &codepoints,
            &table,
            FrequencyParams {
                group_size: 3,
                pin_groups: 1,
                non_pinned_group_size: 4,
            },
        )
        .unwrap();

        // Pinned: three best ranks (0x4E09, 0x4E08, 0x4E07) sorted by index
        assert_eq!(plan.groups[0], vec![10, 11, 12]);
        // Script groups follow
        assert_eq!(plan.groups[1], vec![0, 1]);
        assert_eq!(plan.groups[2], vec![2]);
        // Remaining chunks in frequency order, each index-sorted
        assert_eq!(plan.groups[3], vec![6, 7, 8, 9]);
        assert_eq!(plan.groups[4], vec![3, 4, 5]);
        assert_eq!(
            plan.tiers,
            TierCounts {
                pinned: 1,
                script: 2,
                remaining: 2
            }
        );

        let g2g = plan.glyph_to_group.unwrap();
        assert_eq!(g2g.len(), codepoints.len());
        assert_eq!(g2g[10], 0);
        assert_eq!(g2g[0], 1);
        assert_eq!(g2g[3], 4);
    }

    #[test]
    fn test_unranked_glyphs_sort_last_in_index_order() {
        let codepoints: Vec<u32> = (0x4E00..0x4E06).collect();
        let table = FrequencyTable::from_ranks([(0x4E04, 1)]);
        let plan = group_by_frequency(
            &codepoints,
            &table,
            FrequencyParams {
                group_size: 2,
                pin_groups: 1,
                non_pinned_group_size: 0,
            },
        )
        .unwrap();
        assert_eq!(plan.groups, vec![vec![0, 4], vec![1, 2], vec![3, 5]]);
    }

    #[test]
    fn test_every_glyph_claimed_once() {
        let mut codepoints: Vec<u32> = (0x20..0x7F).collect();
        codepoints.extend(0x4E00..0x4F00);
        codepoints.push(0xFFFD);
        let table = FrequencyTable::from_ranks((0x4E00..0x4F00).map(|cp| (cp, (cp * 7919) % 1000)));
        let plan = group_by_frequency(
            &codepoints,
            &table,
            FrequencyParams {
                group_size: 32,
                pin_groups: 2,
                non_pinned_group_size: 50,
            },
        )
        .unwrap();

        let mut claims = vec![0usize; codepoints.len()];
        for group in &plan.groups {
            for &glyph in group {
                claims[glyph] += 1;
            }
        }
        assert!(claims.iter().all(|&c| c == 1));
        let g2g = plan.glyph_to_group.unwrap();
        assert!(g2g.iter().all(|&g| (g as usize) < plan.groups.len()));
        assert_eq!(plan.tiers.pinned, 2);
        assert_eq!(plan.groups[0].len(), 32);
        assert_eq!(plan.groups[1].len(), 32);
    }
}
