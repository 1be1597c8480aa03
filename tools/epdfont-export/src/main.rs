//! epdfont-export - e-paper font toolchain
//!
//! Compiles TTF/OTF fonts to C headers or `.fontbin` files, packs `.fontbin`
//! files into a partition image, verifies compressed headers, and builds the
//! CJK frequency table.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use epdfont_common::formats::{CodepointInterval, PartitionImage};
use epdfont_common::BitDepth;

// Use modules from library
use epdfont_export::config::{
    parse_interval, CompileOptions, OutputMode, DEFAULT_DPI, DEFAULT_GROUP_SIZE,
};
use epdfont_export::emit::{render_header, to_fontbin, Banner};
use epdfont_export::output::write_atomic;
use epdfont_export::rank_table::{build_ranking, RankSources};
use epdfont_export::{compile_from_files, manifest, partition, verify};

#[derive(Parser)]
#[command(name = "epdfont-export")]
#[command(about = "E-paper font compiler, partition packer and verifier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one font to a C header or a .fontbin
    Compile {
        /// Font name (prefixes every generated array)
        name: String,

        /// Point size
        size: u32,

        /// Font files, highest fallback priority first
        #[arg(required = true)]
        fonts: Vec<PathBuf>,

        /// Generate 2-bit (4 gray level) glyphs instead of 1-bit
        #[arg(long = "2bit")]
        two_bit: bool,

        /// Compress glyph groups with raw DEFLATE (requires --2bit)
        #[arg(long)]
        compress: bool,

        /// Extra code point range to include, e.g. 0x4E00,0x9FFF (repeatable)
        #[arg(long = "additional-intervals", value_parser = parse_interval)]
        additional_intervals: Vec<CodepointInterval>,

        /// Tab-separated code point/rank table enabling frequency grouping
        #[arg(long)]
        frequency_table: Option<PathBuf>,

        /// Glyphs per frequency group
        #[arg(long, default_value_t = DEFAULT_GROUP_SIZE)]
        group_size: usize,

        /// Number of groups holding only the most frequent glyphs
        #[arg(long, default_value_t = 0)]
        pin_groups: usize,

        /// Glyphs per non-pinned frequency group (0 = --group-size)
        #[arg(long, default_value_t = 0)]
        non_pinned_group_size: usize,

        /// Keep only the N most frequent CJK ideographs (0 = all)
        #[arg(long, default_value_t = 0)]
        max_cjk_ideographs: usize,

        /// Keep only the N most frequent Hangul syllables (0 = all)
        #[arg(long, default_value_t = 0)]
        max_hangul: usize,

        /// Panel density used to convert points to pixels
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u32,

        /// Emit a .fontbin instead of a header (requires -o and --group)
        #[arg(long, requires_all = ["group", "output"])]
        binary: bool,

        /// Partition group tag stored in the .fontbin
        #[arg(long, requires = "binary")]
        group: Option<String>,

        /// Output file (header defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pack a directory of .fontbin files into a partition image
    Pack {
        /// Directory holding .fontbin files
        input: PathBuf,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify every compressed header in a directory
    Verify {
        /// Directory holding generated .h files
        dir: PathBuf,
    },

    /// List the groups and fonts of a partition image
    Inspect {
        /// Partition image
        image: PathBuf,
    },

    /// Build the CJK frequency table from character frequency lists
    FreqTable {
        /// Chinese character frequency CSV (`character` and `frequency_rank` columns)
        #[arg(long)]
        hanzi: PathBuf,

        /// Jōyō kanji list, one kanji at the start of each line
        #[arg(long)]
        joyo: PathBuf,

        /// Tab-separated Traditional→Simplified code point mapping
        #[arg(long)]
        trad_to_simp: Option<PathBuf>,

        /// Output table
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build every font listed in a manifest
    Build {
        /// Path to fonts.toml manifest
        #[arg(default_value = "fonts.toml")]
        manifest: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize logging; stdout is reserved for generated output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            name,
            size,
            fonts,
            two_bit,
            compress,
            additional_intervals,
            frequency_table,
            group_size,
            pin_groups,
            non_pinned_group_size,
            max_cjk_ideographs,
            max_hangul,
            dpi,
            binary,
            group,
            output,
        } => {
            let options = CompileOptions {
                name,
                size,
                font_paths: fonts,
                depth: BitDepth::from_is_2bit(two_bit),
                compress,
                additional_intervals,
                frequency_table,
                group_size,
                pin_groups,
                non_pinned_group_size,
                max_cjk_ideographs,
                max_hangul,
                dpi,
                output: match (binary, group) {
                    (true, Some(group)) => OutputMode::Binary { group },
                    _ => OutputMode::Header,
                },
            };
            options.validate()?;

            let font = compile_from_files(&options)
                .with_context(|| format!("Failed to compile font '{}'", options.name))?;

            match (&options.output, output) {
                (OutputMode::Binary { group }, Some(path)) => {
                    let bin = to_fontbin(&font, group)?;
                    write_atomic(&path, &bin.to_bytes())?;
                    tracing::info!(
                        "Wrote {} ({} glyphs, group '{}')",
                        path.display(),
                        font.glyphs.len(),
                        group
                    );
                }
                (OutputMode::Binary { .. }, None) => anyhow::bail!("--binary requires -o"),
                (OutputMode::Header, output) => {
                    let banner = Banner {
                        size: options.size,
                        command: std::env::args().collect::<Vec<_>>().join(" "),
                    };
                    let text = render_header(&font, &banner)?;
                    match output {
                        Some(path) => {
                            write_atomic(&path, text.as_bytes())?;
                            tracing::info!("Wrote {}", path.display());
                        }
                        None => std::io::stdout()
                            .lock()
                            .write_all(text.as_bytes())
                            .context("Failed to write header to stdout")?,
                    }
                }
            }
        }

        Commands::Pack { input, output } => {
            tracing::info!("Packing {} -> {}", input.display(), output.display());
            let image = partition::pack_dir(&input)?;
            write_atomic(&output, &image)?;
            tracing::info!("Done!");
        }

        Commands::Verify { dir } => {
            if !dir.is_dir() {
                anyhow::bail!("{} is not a directory", dir.display());
            }
            let report = verify::verify_dir(&dir)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            print!("{}", report.render());
            if report.failed() > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Inspect { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read image: {}", image.display()))?;
            let parsed = PartitionImage::parse(&bytes)
                .with_context(|| format!("Invalid partition image: {}", image.display()))?;
            print!("{}", describe_image(&parsed)?);
        }

        Commands::FreqTable {
            hanzi,
            joyo,
            trad_to_simp,
            output,
        } => {
            let sources = RankSources::load(&hanzi, &joyo, trad_to_simp.as_deref())
                .context("Failed to load frequency sources")?;
            let ranking = build_ranking(&sources);
            write_atomic(&output, ranking.to_tsv().as_bytes())?;
            tracing::info!(
                "Wrote {} ({} entries)",
                output.display(),
                ranking.codepoints.len()
            );
        }

        Commands::Build { manifest: path } => {
            tracing::info!("Building fonts from {}", path.display());
            let config = manifest::load(&path)?;
            let base = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let summary = manifest::build_all(&config, &base)?;
            tracing::info!(
                "Build complete: {} headers, {} binaries{}",
                summary.headers.len(),
                summary.binaries.len(),
                if summary.partition.is_some() { ", 1 partition image" } else { "" }
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Human-readable listing of a partition image's directories
fn describe_image(image: &PartitionImage<'_>) -> Result<String> {
    use std::fmt::Write as FmtWrite;

    let mut out = String::new();
    let header = &image.header;
    writeln!(
        out,
        "Partition v{}: {} groups, {} fonts, {} bytes",
        header.version, header.group_count, header.font_count, header.total_data_size
    )?;
    writeln!(out, "Groups:")?;
    for group in &image.groups {
        writeln!(
            out,
            "  {:<16} offset {:#010x}  size {}",
            group.name(),
            group.data_offset,
            group.data_size
        )?;
    }
    writeln!(out, "Fonts:")?;
    for font in &image.fonts {
        writeln!(
            out,
            "  {:<32} group {:<16} {} glyphs, {} intervals, {} bitmap bytes, {}",
            font.name(),
            image.group_of(font).map(|g| g.name()).unwrap_or_default(),
            font.glyph_count,
            font.interval_count,
            font.bitmap_size,
            if font.is_2bit { "2-bit" } else { "1-bit" }
        )?;
    }
    Ok(out)
}
