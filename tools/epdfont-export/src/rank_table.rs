//! CJK frequency table builder
//!
//! Merges a Chinese character frequency list, the Japanese Jōyō kanji list
//! and an optional Traditional→Simplified mapping into the
//! `codepoint<TAB>rank` table read by [`crate::frequency::FrequencyTable`].
//!
//! Ranking order:
//! 1. CJK Symbols and Punctuation (U+3000–U+303F)
//! 2. Hiragana (U+3040–U+309F), then Katakana (U+30A0–U+30FF)
//! 3. Hanzi by source rank, each followed by its Traditional variants
//! 4. Jōyō kanji not ranked yet, in code point order
//! 5. Hangul Syllables (U+AC00–U+D7AF) in code point order
//! 6. Halfwidth and Fullwidth Forms (U+FF00–U+FFEF)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite;
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use tracing::info;

use crate::config::parse_codepoint;
use crate::error::CompileError;
use crate::frequency::FrequencyTable;

const PUNCTUATION: (u32, u32) = (0x3000, 0x303F);
const HIRAGANA: (u32, u32) = (0x3040, 0x309F);
const KATAKANA: (u32, u32) = (0x30A0, 0x30FF);
const HANGUL: (u32, u32) = (0xAC00, 0xD7AF);
const FULLWIDTH: (u32, u32) = (0xFF00, 0xFFEF);

const RANK_COLUMN: &str = "frequency_rank";
const CHAR_COLUMN: &str = "character";

/// Parsed inputs of the builder
#[derive(Debug, Clone, Default)]
pub struct RankSources {
    /// `(codepoint, source rank)` in first-seen order; a repeated character
    /// keeps its position and takes the later rank
    pub hanzi: Vec<(u32, u32)>,
    pub joyo: BTreeSet<u32>,
    /// Traditional → Simplified
    pub trad_to_simp: BTreeMap<u32, u32>,
}

impl RankSources {
    /// Load the three lists; a missing mapping file means no mapping
    pub fn load(hanzi: &Path, joyo: &Path, trad_to_simp: Option<&Path>) -> Result<Self, CompileError> {
        let sources = Self {
            hanzi: parse_hanzi_csv(&read(hanzi)?)?,
            joyo: parse_joyo(&read(joyo)?),
            trad_to_simp: match trad_to_simp {
                Some(path) if path.exists() => parse_trad_to_simp(&read(path)?)?,
                _ => BTreeMap::new(),
            },
        };
        info!(
            "Loaded {} hanzi, {} Jōyō kanji, {} Traditional mappings",
            sources.hanzi.len(),
            sources.joyo.len(),
            sources.trad_to_simp.len()
        );
        Ok(sources)
    }
}

fn read(path: &Path) -> Result<String, CompileError> {
    std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Split one CSV record, honouring double-quoted fields
fn csv_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Character frequency CSV with `frequency_rank` and `character` columns
///
/// Rows whose rank is not an integer or whose character is not a single
/// scalar value are skipped.
pub fn parse_hanzi_csv(content: &str) -> Result<Vec<(u32, u32)>, CompileError> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let header = lines
        .next()
        .map(|(_, l)| csv_fields(l.trim_start_matches('\u{feff}')))
        .unwrap_or_default();
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| CompileError::RankSource {
                list: "hanzi frequency list",
                line: 1,
                message: format!("missing column {:?}", name),
            })
    };
    let (rank_col, char_col) = (column(RANK_COLUMN)?, column(CHAR_COLUMN)?);

    let mut order: Vec<(u32, u32)> = Vec::new();
    let mut position: HashMap<u32, usize> = HashMap::new();
    for (_, line) in lines {
        let fields = csv_fields(line);
        let (Some(rank), Some(character)) = (fields.get(rank_col), fields.get(char_col)) else {
            continue;
        };
        let Ok(rank) = rank.trim().parse::<u32>() else {
            continue;
        };
        let mut chars = character.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            continue;
        };
        let codepoint = c as u32;
        match position.get(&codepoint) {
            Some(&index) => order[index].1 = rank,
            None => {
                position.insert(codepoint, order.len());
                order.push((codepoint, rank));
            }
        }
    }
    Ok(order)
}

/// Jōyō kanji list: the first character of every non-blank line
pub fn parse_joyo(content: &str) -> BTreeSet<u32> {
    content
        .lines()
        .filter_map(|line| line.trim().chars().next())
        .map(|c| c as u32)
        .collect()
}

/// Tab-separated `traditional<TAB>simplified` code points
pub fn parse_trad_to_simp(content: &str) -> Result<BTreeMap<u32, u32>, CompileError> {
    let mut mapping = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(trad), Some(simp)) = (fields.next(), fields.next()) else {
            continue;
        };
        let parse = |text: &str| {
            parse_codepoint(text).map_err(|message| CompileError::RankSource {
                list: "Traditional→Simplified mapping",
                line: index + 1,
                message,
            })
        };
        mapping.insert(parse(trad)?, parse(simp)?);
    }
    Ok(mapping)
}

/// How many codepoints each tier contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankCounts {
    pub punctuation: usize,
    pub hiragana: usize,
    pub katakana: usize,
    pub hanzi: usize,
    pub traditional: usize,
    pub extra_joyo: usize,
    pub hangul: usize,
    pub fullwidth: usize,
}

/// Codepoints in rank order; rank is position + 1
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking {
    pub codepoints: Vec<u32>,
    pub counts: RankCounts,
}

impl Ranking {
    pub fn ranks(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.codepoints
            .iter()
            .enumerate()
            .map(|(index, &cp)| (cp, index as u32 + 1))
    }

    pub fn to_table(&self) -> FrequencyTable {
        FrequencyTable::from_ranks(self.ranks())
    }

    /// `0xXXXX<TAB>rank` lines under a comment header
    pub fn to_tsv(&self) -> String {
        let mut out = String::from(
            "# CJK frequency table: codepoint<TAB>rank (1 = most frequent)\n\
             # Generated by epdfont-export freq-table\n",
        );
        for (codepoint, rank) in self.ranks() {
            let _ = writeln!(out, "0x{:04X}\t{}", codepoint, rank);
        }
        out
    }
}

fn push_block(codepoints: &mut Vec<u32>, (first, last): (u32, u32)) -> usize {
    codepoints.extend(first..=last);
    (last - first + 1) as usize
}

pub fn build_ranking(sources: &RankSources) -> Ranking {
    let mut codepoints = Vec::new();
    let mut counts = RankCounts {
        punctuation: push_block(&mut codepoints, PUNCTUATION),
        hiragana: push_block(&mut codepoints, HIRAGANA),
        katakana: push_block(&mut codepoints, KATAKANA),
        ..Default::default()
    };
    let mut ranked: HashSet<u32> = codepoints.iter().copied().collect();

    let mut simp_to_trad: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for (&trad, &simp) in &sources.trad_to_simp {
        simp_to_trad.entry(simp).or_default().push(trad);
    }

    let mut hanzi = sources.hanzi.clone();
    hanzi.sort_by_key(|&(_, rank)| rank);
    for (codepoint, _) in hanzi {
        // Already placed as the Traditional variant of a more frequent character
        if !ranked.insert(codepoint) {
            continue;
        }
        codepoints.push(codepoint);
        counts.hanzi += 1;
        // Keys were inserted in ascending order, so variants are sorted
        for &trad in simp_to_trad.get(&codepoint).into_iter().flatten() {
            if ranked.insert(trad) {
                codepoints.push(trad);
                counts.traditional += 1;
            }
        }
    }

    for &kanji in &sources.joyo {
        if ranked.insert(kanji) {
            codepoints.push(kanji);
            counts.extra_joyo += 1;
        }
    }

    counts.hangul = push_block(&mut codepoints, HANGUL);
    counts.fullwidth = push_block(&mut codepoints, FULLWIDTH);

    info!(
        "Ranked {} code points: {} punctuation, {} hiragana, {} katakana, {} hanzi, \
         {} Traditional variants, {} extra Jōyō kanji, {} Hangul, {} fullwidth",
        codepoints.len(),
        counts.punctuation,
        counts.hiragana,
        counts.katakana,
        counts.hanzi,
        counts.traditional,
        counts.extra_joyo,
        counts.hangul,
        counts.fullwidth
    );
    Ranking { codepoints, counts }
}
