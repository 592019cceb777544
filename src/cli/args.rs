//! Command-line surface: `compile` and `match` subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::scanner::MatchOptions;
use crate::transform::TransformFlags;

#[derive(Debug, Parser)]
#[command(name = "litmatch", version, about = "Compile literal pattern lists and scan haystacks")]
pub struct Cli {
    /// Print statistics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a newline-separated pattern list into an index.
    Compile(CompileArgs),
    /// Report every pattern occurrence in a haystack.
    Match(MatchArgs),
}

/// Normalisation switches shared by both subcommands. At match time they
/// only take effect when the input still needs compiling; a compiled index
/// carries its own flags.
#[derive(Debug, Args)]
pub struct TransformArgs {
    /// Fold patterns and haystack to upper case.
    #[arg(long)]
    pub ignore_case: bool,

    /// Strip punctuation from patterns and haystack.
    #[arg(long)]
    pub ignore_punctuation: bool,

    /// Collapse whitespace runs in patterns and haystack.
    #[arg(long)]
    pub elide_whitespace: bool,
}

impl TransformArgs {
    pub fn flags(&self) -> TransformFlags {
        TransformFlags {
            ignore_case: self.ignore_case,
            ignore_punctuation: self.ignore_punctuation,
            elide_whitespace: self.elide_whitespace,
        }
    }
}

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Output index file.
    pub compiled: PathBuf,

    /// Input pattern list (one pattern per line).
    pub patterns: PathBuf,

    #[command(flatten)]
    pub transform: TransformArgs,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Compiled index, or a raw pattern list to compile on the fly.
    pub compiled: PathBuf,

    /// Haystack file to scan.
    pub haystack: PathBuf,

    #[command(flatten)]
    pub transform: TransformArgs,

    /// Only return the longest match at each offset.
    #[arg(long = "longest")]
    pub longest_only: bool,

    /// Suppress overlapping matches.
    #[arg(long)]
    pub no_overlap: bool,

    /// Only match at word boundaries.
    #[arg(long)]
    pub word_boundary: bool,

    /// Only match at word starts.
    #[arg(long)]
    pub word_prefix: bool,

    /// Only match at word ends.
    #[arg(long)]
    pub word_suffix: bool,

    /// Only match at the start of a line.
    #[arg(long)]
    pub line_start: bool,

    /// Only match at the end of a line.
    #[arg(long)]
    pub line_end: bool,

    /// Worker threads (default: all hardware threads).
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Offsets per worker chunk, rounded up to a power of two.
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Write results to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl MatchArgs {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            longest_only: self.longest_only,
            no_overlap: self.no_overlap,
            word_boundary: self.word_boundary,
            word_prefix: self.word_prefix,
            word_suffix: self.word_suffix,
            line_start: self.line_start,
            line_end: self.line_end,
        }
    }
}
