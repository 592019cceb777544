//! Public matcher: owns the mapped index for its lifetime, carries the
//! thread/chunk configuration, and drives the core scanner — directly for
//! plain indexes, or through the windowed normaliser when the index was
//! compiled with a transform.

use std::path::Path;

use tempfile::NamedTempFile;

use crate::compiler::{compile_patterns_file, is_compiled};
use crate::error::{MatchError, Result};
use crate::format::Header;
use crate::index::Index;
use crate::results::{
    retain_longest_only, retain_no_overlap, sort_canonical, Match, RawMatch,
};
use crate::scanner::{scan, MatchOptions};
use crate::stats::{MatchStats, PatternStoreStats};
use crate::transform::{StreamNormalizer, TransformFlags, TransformTable};

/// Default chunk of contiguous offsets assigned to one worker.
const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Normalised-window span for transform-compiled indexes.
const TRANSFORM_WINDOW: usize = 4 * 1024 * 1024;

/// A loaded index ready to scan haystacks.
pub struct Matcher {
    index: Index,
    transform: Option<TransformTable>,
    threads: usize,
    chunk_size: usize,
    compile_stats: Option<PatternStoreStats>,
    /// Keeps an on-the-fly-compiled index alive (and deletes it on drop).
    _temp: Option<NamedTempFile>,
}

impl Matcher {
    /// Open a compiled index.
    pub fn open(path: &Path) -> Result<Matcher> {
        let index = Index::open(path)?;
        let transform = index
            .header()
            .has_transform()
            .then(|| TransformTable::new(TransformFlags::from_bits(index.header().flags)));
        Ok(Matcher {
            index,
            transform,
            threads: num_cpus::get().max(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compile_stats: None,
            _temp: None,
        })
    }

    /// Open `path` as a compiled index, or — when it is not one — treat it
    /// as a newline-separated pattern list, compile it into a temp file, and
    /// open that. The temp index is removed when the matcher drops.
    pub fn open_or_compile(path: &Path, flags: TransformFlags) -> Result<Matcher> {
        if is_compiled(path) {
            return Matcher::open(path);
        }
        let temp = NamedTempFile::new()?;
        let stats = compile_patterns_file(temp.path(), path, flags)?;
        let mut matcher = Matcher::open(temp.path())?;
        matcher.compile_stats = Some(stats);
        matcher._temp = Some(temp);
        Ok(matcher)
    }

    /// The validated index header (sizes, statistics, flags).
    pub fn header(&self) -> &Header {
        self.index.header()
    }

    /// Pattern-store statistics from an on-the-fly compile, when this
    /// matcher was built from a raw pattern list.
    pub fn compile_stats(&self) -> Option<&PatternStoreStats> {
        self.compile_stats.as_ref()
    }

    /// Set the worker count; `0` selects the number of hardware threads.
    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        let max = num_cpus::get().max(1);
        if threads == 0 {
            self.threads = max;
        } else if threads > max {
            return Err(MatchError::InvalidArgument(
                "thread count exceeds hardware threads",
            ));
        } else {
            self.threads = threads;
        }
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Set the per-worker chunk size in bytes; `0` selects the default.
    /// Sizes are rounded up to the next power of two.
    pub fn set_chunk_size(&mut self, chunk: usize) -> Result<()> {
        self.chunk_size = if chunk == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk.next_power_of_two()
        };
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Find every occurrence of any pattern in `haystack`, in canonical
    /// `(−len, offset)` order, post-filtered per `opts`.
    pub fn find<'h>(&self, haystack: &'h [u8], opts: &MatchOptions) -> Result<Vec<Match<'h>>> {
        let mut stats = MatchStats::default();
        self.find_with_stats(haystack, opts, &mut stats)
    }

    /// As [`find`](Matcher::find), additionally accumulating scan counters
    /// into `stats`.
    pub fn find_with_stats<'h>(
        &self,
        haystack: &'h [u8],
        opts: &MatchOptions,
        stats: &mut MatchStats,
    ) -> Result<Vec<Match<'h>>> {
        let mut raw = match &self.transform {
            None => {
                let (raw, scan_stats) =
                    scan(&self.index.views(), haystack, opts, self.threads, self.chunk_size)?;
                stats.merge(&scan_stats);
                raw
            }
            Some(table) => self.scan_normalized(table, haystack, opts, stats)?,
        };

        sort_canonical(&mut raw);
        if opts.longest_only {
            retain_longest_only(&mut raw);
        }
        if opts.no_overlap {
            retain_no_overlap(&mut raw);
        }

        Ok(raw
            .into_iter()
            .map(|m| {
                let offset = m.offset as usize;
                Match {
                    offset,
                    len: m.len,
                    bytes: &haystack[offset..offset + m.len as usize],
                }
            })
            .collect())
    }

    /// Windowed scan for transform-compiled indexes.
    ///
    /// The haystack is normalised into a sliding buffer of one window plus
    /// `largest_pattern_length − 1` bytes of lookahead, so a match that
    /// straddles a window edge is always wholly visible to the window that
    /// contains its start. One byte of left context is kept across the slide
    /// for the boundary predicates. Matches are deduplicated by claiming
    /// window-sized spans of the normalised stream in order.
    fn scan_normalized(
        &self,
        table: &TransformTable,
        haystack: &[u8],
        opts: &MatchOptions,
        stats: &mut MatchStats,
    ) -> Result<Vec<RawMatch>> {
        let header = self.index.header();
        let flags = TransformFlags::from_bits(header.flags);
        let identity = flags.is_identity_mapping();
        let overlap = (header.largest_pattern_length as usize).saturating_sub(1);
        let views = self.index.views();

        let mut normalizer = StreamNormalizer::new(table);
        let mut norm: Vec<u8> = Vec::new();
        let mut backmap: Vec<usize> = Vec::new();

        let mut all = Vec::new();
        let mut src_pos = 0usize;
        // Absolute normalised-stream offset of `norm[0]`, and the absolute
        // offset below which matches have already been claimed.
        let mut norm_base = 0usize;
        let mut claimed = 0usize;

        loop {
            let target_len = (claimed - norm_base) + TRANSFORM_WINDOW + overlap;
            let consumed = normalizer.feed(
                &haystack[src_pos..],
                src_pos,
                target_len,
                &mut norm,
                (!identity).then_some(&mut backmap),
            );
            src_pos += consumed;
            let exhausted = src_pos == haystack.len();
            if norm.is_empty() {
                break;
            }

            let (raw, scan_stats) = scan(&views, &norm, opts, self.threads, self.chunk_size)?;
            stats.merge(&scan_stats);

            let keep_upto = if exhausted {
                norm_base + norm.len()
            } else {
                claimed + TRANSFORM_WINDOW
            };
            for m in raw {
                let abs = norm_base + m.offset as usize;
                if abs < claimed || abs >= keep_upto {
                    continue;
                }
                if identity {
                    // Case folding is 1:1, so normalised offsets are
                    // haystack offsets.
                    all.push(RawMatch {
                        offset: abs as u64,
                        len: m.len,
                    });
                } else {
                    let rel = m.offset as usize;
                    let start = backmap[rel];
                    let end = backmap[rel + m.len as usize - 1];
                    all.push(RawMatch {
                        offset: start as u64,
                        len: (end - start + 1) as u32,
                    });
                }
            }

            if exhausted {
                break;
            }

            claimed = keep_upto;
            // Slide, keeping the lookahead plus one byte of left context.
            let cut = claimed - 1 - norm_base;
            norm.copy_within(cut.., 0);
            norm.truncate(norm.len() - cut);
            if !identity {
                backmap.copy_within(cut.., 0);
                backmap.truncate(backmap.len() - cut);
            }
            norm_base += cut;
        }

        Ok(all)
    }

    /// Crate version string, for the CLI banner.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_patterns;

    fn compile(patterns: &[u8], flags: TransformFlags) -> (tempfile::TempDir, Matcher) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        compile_patterns(&path, patterns, flags).unwrap();
        let matcher = Matcher::open(&path).unwrap();
        (dir, matcher)
    }

    fn hits(matches: &[Match<'_>]) -> Vec<(usize, Vec<u8>)> {
        matches
            .iter()
            .map(|m| (m.offset, m.bytes.to_vec()))
            .collect()
    }

    #[test]
    fn plain_match_is_sorted_canonically() {
        let (_dir, m) = compile(b"cats\ncat\nat\n", TransformFlags::default());
        let found = m.find(b"cats", &MatchOptions::default()).unwrap();
        assert_eq!(
            hits(&found),
            vec![
                (0, b"cats".to_vec()),
                (0, b"cat".to_vec()),
                (1, b"at".to_vec()),
            ]
        );
    }

    #[test]
    fn longest_only_and_no_overlap() {
        let (_dir, m) = compile(b"cats\ncat\nat\n", TransformFlags::default());

        let longest = m
            .find(
                b"cats",
                &MatchOptions {
                    longest_only: true,
                    ..MatchOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            hits(&longest),
            vec![(0, b"cats".to_vec()), (1, b"at".to_vec())]
        );

        let no_overlap = m
            .find(
                b"cats",
                &MatchOptions {
                    no_overlap: true,
                    ..MatchOptions::default()
                },
            )
            .unwrap();
        assert_eq!(hits(&no_overlap), vec![(0, b"cats".to_vec())]);
    }

    #[test]
    fn ignore_case_matches_all_spellings() {
        let flags = TransformFlags {
            ignore_case: true,
            ..TransformFlags::default()
        };
        let (_dir, m) = compile(b"HELLO\n", flags);
        let found = m
            .find(b"hello Hello HELLO", &MatchOptions::default())
            .unwrap();
        assert_eq!(
            hits(&found),
            vec![
                (0, b"hello".to_vec()),
                (6, b"Hello".to_vec()),
                (12, b"HELLO".to_vec()),
            ]
        );
    }

    #[test]
    fn elide_whitespace_reports_original_span() {
        let flags = TransformFlags {
            elide_whitespace: true,
            ..TransformFlags::default()
        };
        let (_dir, m) = compile(b"foo bar\n", flags);
        let found = m
            .find(b"foo   bar   foo\tbar", &MatchOptions::default())
            .unwrap();
        assert_eq!(
            hits(&found),
            vec![(0, b"foo   bar".to_vec()), (12, b"foo\tbar".to_vec())]
        );
    }

    #[test]
    fn open_or_compile_accepts_raw_pattern_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("patterns.txt");
        std::fs::write(&list, b"alpha\nbeta\n").unwrap();
        let m = Matcher::open_or_compile(&list, TransformFlags::default()).unwrap();
        let found = m.find(b"alpha and beta", &MatchOptions::default()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn thread_and_chunk_config_validate() {
        let (_dir, mut m) = compile(b"abcdef\n", TransformFlags::default());
        m.set_threads(0).unwrap();
        assert!(m.threads() >= 1);
        m.set_threads(1).unwrap();
        assert_eq!(m.threads(), 1);
        assert!(m.set_threads(100_000).is_err());

        m.set_chunk_size(0).unwrap();
        assert_eq!(m.chunk_size(), 4096);
        m.set_chunk_size(5000).unwrap();
        assert_eq!(m.chunk_size(), 8192);
    }

    #[test]
    fn determinism_across_threads_and_chunks() {
        let (_dir, mut m) = compile(b"abcdef\ncdef\nef\nf\n", TransformFlags::default());
        let haystack = b"abcdefabcdefxyzabcdef".repeat(50);

        let baseline = m.find(&haystack, &MatchOptions::default()).unwrap();
        for threads in [1, num_cpus::get().max(1)] {
            for chunk in [64, 1024] {
                m.set_threads(threads).unwrap();
                m.set_chunk_size(chunk).unwrap();
                let run = m.find(&haystack, &MatchOptions::default()).unwrap();
                assert_eq!(run, baseline, "threads={threads} chunk={chunk}");
            }
        }
    }
}
