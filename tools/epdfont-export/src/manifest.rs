//! Batch manifest parsing and build orchestration
//!
//! Parses `fonts.toml`, compiles every listed font, verifies the generated
//! headers and packs the partition image.
//!
//! ```toml
//! [output]
//! headers = "include/fonts"
//! binaries = "build/fontbin"
//! partition = "build/fonts.bin"
//!
//! [[fonts]]
//! name = "ui_12"
//! size = 12
//! files = ["fonts/Ubuntu-Regular.ttf"]
//! binary = true
//! group = "ui"
//! ```

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::info;

use epdfont_common::formats::{CodepointInterval, FONTBIN_EXT};
use epdfont_common::BitDepth;

use crate::compile::compile_from_files;
use crate::config::{CompileOptions, OutputMode, DEFAULT_DPI, DEFAULT_GROUP_SIZE};
use crate::emit::{render_header, to_fontbin, Banner};
use crate::output::write_atomic;
use crate::partition::pack_dir;
use crate::verify::{verify_dir, AGGREGATE_HEADER};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_headers_dir")]
    pub headers: PathBuf,
    #[serde(default = "default_binaries_dir")]
    pub binaries: PathBuf,
    /// Partition image packed from `binaries`; not packed when unset
    #[serde(default)]
    pub partition: Option<PathBuf>,
    /// Run the round-trip verifier over `headers` after compiling
    #[serde(default = "default_true")]
    pub verify: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            headers: default_headers_dir(),
            binaries: default_binaries_dir(),
            partition: None,
            verify: true,
        }
    }
}

fn default_headers_dir() -> PathBuf {
    PathBuf::from("include/fonts")
}

fn default_binaries_dir() -> PathBuf {
    PathBuf::from("build/fontbin")
}

fn default_true() -> bool {
    true
}

fn default_group_size() -> usize {
    DEFAULT_GROUP_SIZE
}

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

/// One font to compile
#[derive(Debug, Deserialize)]
pub struct FontEntry {
    pub name: String,
    pub size: u32,
    /// Font files in fallback order, relative to the manifest
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub two_bit: bool,
    #[serde(default)]
    pub compress: bool,
    /// Emit a `.fontbin` for the partition instead of a header
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub frequency_table: Option<PathBuf>,
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default)]
    pub pin_groups: usize,
    #[serde(default)]
    pub non_pinned_group_size: usize,
    #[serde(default)]
    pub max_cjk_ideographs: usize,
    #[serde(default)]
    pub max_hangul: usize,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Extra `[first, last]` ranges added to the base coverage
    #[serde(default)]
    pub additional_intervals: Vec<[u32; 2]>,
}

impl FontEntry {
    /// Compile options with paths resolved against `base`
    pub fn to_options(&self, base: &Path) -> Result<CompileOptions> {
        let output = if self.binary {
            let group = self
                .group
                .clone()
                .with_context(|| format!("Font '{}': binary output needs a group", self.name))?;
            OutputMode::Binary { group }
        } else {
            OutputMode::Header
        };

        let options = CompileOptions {
            name: self.name.clone(),
            size: self.size,
            font_paths: self.files.iter().map(|p| base.join(p)).collect(),
            depth: BitDepth::from_is_2bit(self.two_bit),
            compress: self.compress,
            additional_intervals: self
                .additional_intervals
                .iter()
                .map(|&[first, last]| CodepointInterval::new(first, last))
                .collect(),
            frequency_table: self.frequency_table.as_ref().map(|p| base.join(p)),
            group_size: self.group_size,
            pin_groups: self.pin_groups,
            non_pinned_group_size: self.non_pinned_group_size,
            max_cjk_ideographs: self.max_cjk_ideographs,
            max_hangul: self.max_hangul,
            dpi: self.dpi,
            output,
        };
        options
            .validate()
            .with_context(|| format!("Font '{}'", self.name))?;
        Ok(options)
    }
}

/// Parse manifest text
pub fn parse(content: &str) -> Result<Manifest> {
    toml::from_str(content).context("Failed to parse font manifest")
}

/// Load and parse a manifest file
pub fn load(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    parse(&content).with_context(|| format!("In {}", path.display()))
}

/// Files written by a build
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub headers: Vec<PathBuf>,
    pub binaries: Vec<PathBuf>,
    pub partition: Option<PathBuf>,
}

/// Compile, verify and pack everything in the manifest
///
/// Relative paths are resolved against `base` (the manifest's directory).
pub fn build_all(manifest: &Manifest, base: &Path) -> Result<BuildSummary> {
    if manifest.fonts.is_empty() {
        anyhow::bail!("Manifest lists no fonts");
    }
    let options = manifest
        .fonts
        .iter()
        .map(|entry| entry.to_options(base))
        .collect::<Result<Vec<_>>>()?;

    let compiled = options
        .par_iter()
        .map(|opts| {
            compile_from_files(opts)
                .with_context(|| format!("Failed to compile font '{}'", opts.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let headers_dir = base.join(&manifest.output.headers);
    let binaries_dir = base.join(&manifest.output.binaries);
    let mut summary = BuildSummary::default();

    for (opts, font) in options.iter().zip(&compiled) {
        match &opts.output {
            OutputMode::Header => {
                let path = headers_dir.join(format!("{}.h", font.name));
                let banner = Banner {
                    size: opts.size,
                    command: format!("epdfont-export build ({})", font.name),
                };
                write_atomic(&path, render_header(font, &banner)?.as_bytes())?;
                info!("Wrote {}", path.display());
                summary.headers.push(path);
            }
            OutputMode::Binary { group } => {
                let path = binaries_dir.join(format!("{}.{}", font.name, FONTBIN_EXT));
                let bin = to_fontbin(font, group)
                    .with_context(|| format!("Failed to encode font '{}'", font.name))?;
                write_atomic(&path, &bin.to_bytes())?;
                info!("Wrote {}", path.display());
                summary.binaries.push(path);
            }
        }
    }

    if !summary.headers.is_empty() {
        let names: Vec<&str> = options
            .iter()
            .filter(|o| o.output == OutputMode::Header)
            .map(|o| o.name.as_str())
            .collect();
        write_atomic(&headers_dir.join(AGGREGATE_HEADER), aggregate_header(&names).as_bytes())?;

        if manifest.output.verify {
            let report = verify_dir(&headers_dir)
                .with_context(|| format!("Failed to scan {}", headers_dir.display()))?;
            info!(
                "Verified headers: {} passed, {} failed, {} skipped",
                report.passed(),
                report.failed(),
                report.skipped()
            );
            if report.failed() > 0 {
                anyhow::bail!("Header verification failed:\n{}", report.render());
            }
        }
    }

    if let Some(partition) = &manifest.output.partition {
        let path = base.join(partition);
        let image = pack_dir(&binaries_dir)
            .with_context(|| format!("Failed to pack {}", binaries_dir.display()))?;
        write_atomic(&path, &image)?;
        info!("Wrote partition image {} ({} bytes)", path.display(), image.len());
        summary.partition = Some(path);
    }

    Ok(summary)
}

/// `all.h`: includes every generated font header
pub fn aggregate_header(names: &[&str]) -> String {
    let mut out = String::from("#pragma once\n");
    for name in names {
        let _ = writeln!(out, "#include \"{}.h\"", name);
    }
    out
}
