//! Character frequency table
//!
//! Tab-separated `codepoint<TAB>rank` lines, rank 1 being the most frequent.
//! Blank lines and `#` comments are ignored, as are lines with fewer than two
//! fields.

use std::path::Path;

use hashbrown::HashMap;

use crate::config::parse_codepoint;
use crate::error::CompileError;

#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    ranks: HashMap<u32, u32>,
}

impl FrequencyTable {
    /// Rank given to codepoints missing from the table
    pub const UNRANKED: u32 = 999_999;

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, CompileError> {
        let mut ranks = HashMap::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(codepoint), Some(rank)) = (fields.next(), fields.next()) else {
                continue;
            };
            let codepoint = parse_codepoint(codepoint).map_err(|message| {
                CompileError::FrequencyTable {
                    line: index + 1,
                    message,
                }
            })?;
            let rank = rank
                .trim()
                .parse::<u32>()
                .map_err(|e| CompileError::FrequencyTable {
                    line: index + 1,
                    message: format!("invalid rank {:?}: {}", rank, e),
                })?;
            ranks.insert(codepoint, rank);
        }
        Ok(Self { ranks })
    }

    pub fn from_ranks(ranks: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            ranks: ranks.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn get(&self, codepoint: u32) -> Option<u32> {
        self.ranks.get(&codepoint).copied()
    }

    /// Rank of a codepoint, [`Self::UNRANKED`] when absent
    pub fn rank(&self, codepoint: u32) -> u32 {
        self.get(codepoint).unwrap_or(Self::UNRANKED)
    }

    /// Top `n` listed codepoints within `[first, last]`, ordered by (rank, codepoint)
    pub fn top_in_range(&self, first: u32, last: u32, n: usize) -> Vec<u32> {
        let mut entries: Vec<(u32, u32)> = self
            .ranks
            .iter()
            .filter(|(cp, _)| (first..=last).contains(*cp))
            .map(|(&cp, &rank)| (rank, cp))
            .collect();
        entries.sort_unstable();
        entries.into_iter().take(n).map(|(_, cp)| cp).collect()
    }

    /// Number of listed codepoints within `[first, last]`
    pub fn count_in_range(&self, first: u32, last: u32) -> usize {
        self.ranks
            .keys()
            .filter(|cp| (first..=last).contains(*cp))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let table = FrequencyTable::parse(
            "# codepoint\trank\n\n0x7684\t1\n19968\t2\n0x4E0D\t3\textra\nnot-a-line\n",
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rank(0x7684), 1);
        assert_eq!(table.rank(0x4E00), 2);
        assert_eq!(table.rank(0x4E0D), 3);
        assert_eq!(table.rank(0x4E01), FrequencyTable::UNRANKED);
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = FrequencyTable::parse("0x4E00\t1\n0x4E01\tfirst\n").unwrap_err();
        assert!(matches!(err, CompileError::FrequencyTable { line: 2, .. }));
    }

    #[test]
    fn test_top_in_range_breaks_ties_by_codepoint() {
        let table = FrequencyTable::from_ranks([
            (0x4E03, 5),
            (0x4E02, 1),
            (0x4E01, 5),
            (0xAC00, 2),
            (0x41, 1),
        ]);
        assert_eq!(table.top_in_range(0x4E00, 0x9FFF, 2), vec![0x4E02, 0x4E01]);
        assert_eq!(table.top_in_range(0x4E00, 0x9FFF, 10).len(), 3);
        assert_eq!(table.count_in_range(0xAC00, 0xD7AF), 1);
    }
}
