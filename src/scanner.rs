//! The per-offset scan engine.
//!
//! For each haystack offset the scanner decides in roughly O(1) amortised
//! whether any pattern can start there: long patterns go Bloom filter →
//! hash-table probe → byte-equality confirm against the pattern store, and
//! short patterns go through the bitmap/array lookups. The haystack is
//! partitioned statically into chunks scanned in parallel; each chunk writes
//! to its own match vector and counter set, merged after the join, so the
//! externally observable result is independent of thread count and chunk
//! size.

use rayon::prelude::*;

use crate::error::{MatchError, Result};
use crate::hash::pack_gram;
use crate::index::IndexViews;
use crate::results::RawMatch;
use crate::stats::MatchStats;

/// Boundary and post-filter switches for one scan call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Keep only the longest match at each offset.
    pub longest_only: bool,
    /// Drop matches overlapping an earlier (longer) one.
    pub no_overlap: bool,
    /// Match only where the word/non-word class changes at the start and the
    /// match is not followed by a word character.
    pub word_boundary: bool,
    /// Match only at the start of a word.
    pub word_prefix: bool,
    /// Match only at the end of a word.
    pub word_suffix: bool,
    /// Match only at the start of a line.
    pub line_start: bool,
    /// Match only at the end of a line.
    pub line_end: bool,
}

/// Word class used by the boundary filters: `[A-Za-z0-9_]`.
#[inline(always)]
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline(always)]
fn is_line_end_byte(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

#[inline(always)]
fn at_line_start(haystack: &[u8], pos: usize) -> bool {
    pos == 0 || is_line_end_byte(haystack[pos - 1])
}

#[inline(always)]
fn at_line_end(haystack: &[u8], pos: usize, len: usize) -> bool {
    pos + len >= haystack.len() || is_line_end_byte(haystack[pos + len])
}

/// Boundary predicates applied to a confirmed candidate `(pos, len)`.
/// Any failed predicate drops the candidate silently.
#[inline(always)]
fn passes_filters(haystack: &[u8], pos: usize, len: usize, opts: &MatchOptions) -> bool {
    if opts.word_boundary && pos + len < haystack.len() && is_word_byte(haystack[pos + len]) {
        return false;
    }
    if opts.word_prefix && !(pos == 0 || !is_word_byte(haystack[pos - 1])) {
        return false;
    }
    if opts.word_suffix
        && !(pos + len == haystack.len() || !is_word_byte(haystack[pos + len]))
    {
        return false;
    }
    if opts.line_start && !at_line_start(haystack, pos) {
        return false;
    }
    if opts.line_end && !at_line_end(haystack, pos, len) {
        return false;
    }
    true
}

/// Scan `haystack` against the index views, statically partitioned into
/// `chunk_size`-byte ranges over `threads` workers. Returns the raw matches
/// (unordered) and the scan counters.
pub fn scan(
    views: &IndexViews<'_>,
    haystack: &[u8],
    opts: &MatchOptions,
    threads: usize,
    chunk_size: usize,
) -> Result<(Vec<RawMatch>, MatchStats)> {
    if haystack.is_empty() {
        return Ok((Vec::new(), MatchStats::default()));
    }

    let ranges: Vec<(usize, usize)> = (0..haystack.len())
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(haystack.len())))
        .collect();

    let chunks: Vec<(Vec<RawMatch>, MatchStats)> = if threads <= 1 || ranges.len() == 1 {
        ranges
            .iter()
            .map(|&(start, end)| scan_range(views, haystack, opts, start, end))
            .collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| MatchError::Io(std::io::Error::other(e)))?;
        pool.install(|| {
            ranges
                .par_iter()
                .map(|&(start, end)| scan_range(views, haystack, opts, start, end))
                .collect()
        })
    };

    let total: usize = chunks.iter().map(|(v, _)| v.len()).sum();
    let mut matches = Vec::with_capacity(total);
    let mut stats = MatchStats::default();
    for (chunk_matches, chunk_stats) in chunks {
        matches.extend(chunk_matches);
        stats.merge(&chunk_stats);
    }
    Ok((matches, stats))
}

/// Scan one contiguous offset range. Candidates may extend past `end`; the
/// range only bounds where matches *start*.
fn scan_range(
    views: &IndexViews<'_>,
    haystack: &[u8],
    opts: &MatchOptions,
    start: usize,
    end: usize,
) -> (Vec<RawMatch>, MatchStats) {
    let mut local = Vec::new();
    let mut stats = MatchStats::default();
    let hsize = haystack.len();

    let largest = views.header.largest_pattern_length;
    let smallest = views.header.smallest_pattern_length;
    let use_long = largest >= 5;
    let short = if smallest <= 4 { views.short } else { None };

    for pos in start..end {
        if opts.word_boundary {
            // An offset where the word class does not change cannot start a
            // word-boundary match; skip it before any probe.
            let prev_is_word = pos > 0 && is_word_byte(haystack[pos - 1]);
            if is_word_byte(haystack[pos]) == prev_is_word {
                continue;
            }
        }

        if use_long && pos + 4 <= hsize {
            stats.total_attempts += 1;
            let cand = pack_gram(&haystack[pos..]);
            if !views.bloom.query(cand) {
                stats.total_filtered += 1;
            } else if let Some(slot) = views.probe(cand) {
                stats.total_hits += 1;
                scan_bucket(views, slot, haystack, pos, opts, &mut local, &mut stats);
            } else {
                stats.total_misses += 1;
            }
        }

        if let Some(sm) = short {
            // Length classes in 4,3,2,1 order.
            if sm.len4 > 0 && pos + 4 <= hsize && sm.query4(&haystack[pos..]) {
                emit_short(haystack, pos, 4, opts, &mut local, &mut stats);
            }
            if sm.len3 > 0 && pos + 3 <= hsize && sm.query3(&haystack[pos..]) {
                emit_short(haystack, pos, 3, opts, &mut local, &mut stats);
            }
            if sm.len2 > 0 && pos + 2 <= hsize && sm.query2(&haystack[pos..]) {
                emit_short(haystack, pos, 2, opts, &mut local, &mut stats);
            }
            if sm.len1 > 0 && sm.query1(haystack[pos]) {
                emit_short(haystack, pos, 1, opts, &mut local, &mut stats);
            }
        }
    }

    (local, stats)
}

/// Confirm and append matches from one bucket. Records are stored
/// longest-first, so longer candidates are tested before shorter ones.
fn scan_bucket(
    views: &IndexViews<'_>,
    slot: u32,
    haystack: &[u8],
    pos: usize,
    opts: &MatchOptions,
    local: &mut Vec<RawMatch>,
    stats: &mut MatchStats,
) {
    let count = views.bucket_len(slot);
    for j in 0..count {
        let (offset, len) = views.bucket_record(slot, j);
        let len_usize = len as usize;
        if pos + len_usize > haystack.len() {
            continue;
        }
        stats.total_comparisons += 1;

        let stored = &views.pattern_store[offset as usize..offset as usize + len_usize];
        let window = &haystack[pos..pos + len_usize];
        // Every record here shares its leading gram with the probe key, so
        // the tail byte is the cheapest discriminator before the full
        // compare.
        if window[len_usize - 1] != stored[len_usize - 1] || window != stored {
            continue;
        }
        if passes_filters(haystack, pos, len_usize, opts) {
            local.push(RawMatch {
                offset: pos as u64,
                len,
            });
        }
    }
}

#[inline]
fn emit_short(
    haystack: &[u8],
    pos: usize,
    len: usize,
    opts: &MatchOptions,
    local: &mut Vec<RawMatch>,
    stats: &mut MatchStats,
) {
    if passes_filters(haystack, pos, len, opts) {
        stats.total_hits += 1;
        local.push(RawMatch {
            offset: pos as u64,
            len: len as u32,
        });
    } else {
        stats.total_misses += 1;
    }
}
