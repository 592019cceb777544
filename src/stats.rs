//! Observable counters for compilation and scanning.

use crate::format::format_u64;

/// Byte- and pattern-level statistics accumulated while compiling.
///
/// `stored_pattern_count` counts long (≥ 5 byte) patterns written to the
/// pattern store; short patterns are tracked separately in
/// `short_pattern_count`. Duplicates of either class land in
/// `duplicate_patterns` and are not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternStoreStats {
    pub total_input_bytes: u64,
    pub total_stored_bytes: u64,
    pub stored_pattern_count: u32,
    pub short_pattern_count: u32,
    pub duplicate_patterns: u32,
    pub smallest_pattern_length: u32,
    pub largest_pattern_length: u32,
}

impl Default for PatternStoreStats {
    fn default() -> Self {
        PatternStoreStats {
            total_input_bytes: 0,
            total_stored_bytes: 0,
            stored_pattern_count: 0,
            short_pattern_count: 0,
            duplicate_patterns: 0,
            // Sentinel until the first pattern arrives.
            smallest_pattern_length: u32::MAX,
            largest_pattern_length: 0,
        }
    }
}

impl PatternStoreStats {
    /// The verbose one-liner printed after a compile.
    pub fn summary_line(&self) -> String {
        let ratio = if self.total_input_bytes == 0 {
            0.0
        } else {
            self.total_stored_bytes as f32 / self.total_input_bytes as f32
        };
        format!(
            "Stored pattern count: {}, smallest {}, largest {}, duplicates removed: {}, \
             input bytes: {}, stored bytes: {}, ratio: {:.2}",
            format_u64(u64::from(self.stored_pattern_count)),
            format_u64(u64::from(self.smallest_pattern_length)),
            format_u64(u64::from(self.largest_pattern_length)),
            format_u64(u64::from(self.duplicate_patterns)),
            format_u64(self.total_input_bytes),
            format_u64(self.total_stored_bytes),
            ratio,
        )
    }
}

/// Scan-path counters, accumulated over one `find` call.
///
/// Always populated, even when the scan returns early; the values reflect
/// whatever work completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Offsets where the long-pattern path was attempted.
    pub total_attempts: u64,
    /// Bucket hits plus accepted short-pattern candidates.
    pub total_hits: u64,
    /// Probe misses plus short-pattern candidates dropped by a filter.
    pub total_misses: u64,
    /// Offsets rejected by the Bloom filter before any probe.
    pub total_filtered: u64,
    /// Byte-equality comparisons against pattern-store records.
    pub total_comparisons: u64,
}

impl MatchStats {
    pub fn merge(&mut self, other: &MatchStats) {
        self.total_attempts += other.total_attempts;
        self.total_hits += other.total_hits;
        self.total_misses += other.total_misses;
        self.total_filtered += other.total_filtered;
        self.total_comparisons += other.total_comparisons;
    }

    /// The verbose one-liner printed after a match run.
    pub fn summary_line(&self, match_count: usize) -> String {
        let ratio = if match_count == 0 {
            0.0
        } else {
            self.total_comparisons as f32 / match_count as f32
        };
        format!(
            "Total attempts: {}, filtered: {}, misses: {}, hits: {}, compares: {}, \
             matches: {}, compare to match ratio: {:.2}",
            format_u64(self.total_attempts),
            format_u64(self.total_filtered),
            format_u64(self.total_misses),
            format_u64(self.total_hits),
            format_u64(self.total_comparisons),
            format_u64(match_count as u64),
            ratio,
        )
    }
}
