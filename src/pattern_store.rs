//! Append-only pattern body store.
//!
//! Long patterns are written to the output file in arrival order, packed with
//! no padding; each append returns the store-relative byte offset that the
//! hash-table record will carry. A content-addressed set rejects duplicates
//! before anything hits the file.

use std::io::{self, Write};

use crate::dedup::DedupSet;
use crate::stats::PatternStoreStats;

/// Streaming pattern writer. Owns only the dedup set and the running cursor;
/// the output handle is the compiler's and is borrowed per append, matching
/// how the store section is interleaved with the rest of the file.
pub struct PatternStore {
    cursor: u64,
    dedup: DedupSet,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore {
    pub fn new() -> PatternStore {
        PatternStore {
            cursor: 0,
            dedup: DedupSet::new(),
        }
    }

    /// Total bytes appended so far (the final `pattern_store_size`).
    pub fn size(&self) -> u64 {
        self.cursor
    }

    /// Append `pattern` and return its store-relative offset, or `None` when
    /// an identical pattern was already stored (counted in
    /// `stats.duplicate_patterns`).
    pub fn append(
        &mut self,
        out: &mut dyn Write,
        pattern: &[u8],
        stats: &mut PatternStoreStats,
    ) -> io::Result<Option<u64>> {
        if !self.dedup.insert(pattern) {
            stats.duplicate_patterns += 1;
            return Ok(None);
        }

        let offset = self.cursor;
        out.write_all(pattern)?;
        self.cursor += pattern.len() as u64;

        let len = pattern.len() as u32;
        if len < stats.smallest_pattern_length {
            stats.smallest_pattern_length = len;
        }
        if len > stats.largest_pattern_length {
            stats.largest_pattern_length = len;
        }
        stats.stored_pattern_count += 1;
        stats.total_input_bytes += u64::from(len);
        stats.total_stored_bytes = self.cursor;

        Ok(Some(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_advance_by_pattern_length() {
        let mut store = PatternStore::new();
        let mut out = Vec::new();
        let mut stats = PatternStoreStats::default();

        assert_eq!(
            store.append(&mut out, b"hello", &mut stats).unwrap(),
            Some(0)
        );
        assert_eq!(
            store.append(&mut out, b"worlds", &mut stats).unwrap(),
            Some(5)
        );
        assert_eq!(out, b"helloworlds");
        assert_eq!(store.size(), 11);
    }

    #[test]
    fn duplicate_is_not_written() {
        let mut store = PatternStore::new();
        let mut out = Vec::new();
        let mut stats = PatternStoreStats::default();

        assert!(store.append(&mut out, b"hello", &mut stats).unwrap().is_some());
        assert!(store.append(&mut out, b"hello", &mut stats).unwrap().is_none());
        assert_eq!(out, b"hello");
        assert_eq!(stats.duplicate_patterns, 1);
        assert_eq!(stats.stored_pattern_count, 1);
    }

    #[test]
    fn stats_track_lengths_and_bytes() {
        let mut store = PatternStore::new();
        let mut out = Vec::new();
        let mut stats = PatternStoreStats::default();

        store.append(&mut out, b"abcdefgh", &mut stats).unwrap();
        store.append(&mut out, b"abcde", &mut stats).unwrap();

        assert_eq!(stats.smallest_pattern_length, 5);
        assert_eq!(stats.largest_pattern_length, 8);
        assert_eq!(stats.total_input_bytes, 13);
        assert_eq!(stats.total_stored_bytes, 13);
    }
}
