//! Compiled literal-list matching.
//!
//! This crate compiles a (possibly very large) list of literal byte-string
//! patterns into a compact, memory-mappable index, and reports every
//! occurrence of any pattern in a byte haystack. Compilation is a one-time
//! cost; scanning is the hot path, parallel over the haystack, and reads the
//! index zero-copy out of one immutable mapping.
//!
//! ```no_run
//! use litmatch::{compile_patterns, MatchOptions, Matcher, TransformFlags};
//!
//! # fn main() -> litmatch::Result<()> {
//! compile_patterns(
//!     "words.idx".as_ref(),
//!     b"cat\ncats\nat\n",
//!     TransformFlags::default(),
//! )?;
//! let matcher = Matcher::open("words.idx".as_ref())?;
//! for m in matcher.find(b"cats", &MatchOptions::default())? {
//!     println!("{}: {:?}", m.offset, m.bytes);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bloom;
pub mod cli;
pub mod compiler;
pub mod dedup;
pub mod error;
pub mod format;
pub mod hash;
pub mod hash_table;
pub mod index;
pub mod mapping;
pub mod matcher;
pub mod pattern_store;
pub mod results;
pub mod scanner;
pub mod short_matcher;
pub mod stats;
pub mod transform;

// ── Primary API re-exports ───────────────────────────────────────────────────

/// Streaming index compiler.
pub use compiler::Compiler;
/// Compile a newline-separated pattern buffer into an index file.
pub use compiler::compile_patterns;
/// Compile a newline-separated pattern file into an index file.
pub use compiler::compile_patterns_file;
/// Sniff whether a file is a compiled index.
pub use compiler::is_compiled;

/// Loaded index plus scan configuration.
pub use matcher::Matcher;
/// Boundary and post-filter switches for one scan.
pub use scanner::MatchOptions;
/// One reported occurrence.
pub use results::Match;

/// Error taxonomy and result alias.
pub use error::{MatchError, Result};

/// Normalisation switches recorded in the index header.
pub use transform::TransformFlags;

/// Scan counters and compile-time pattern statistics.
pub use stats::{MatchStats, PatternStoreStats};

/// The fixed 72-byte index header.
pub use format::Header;
