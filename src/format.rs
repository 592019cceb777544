//! On-disk index layout: magics, flag bits, the fixed 72-byte header, and
//! the little-endian field helpers every section writer/reader shares.
//!
//! The file is little-endian throughout; the only big-endian packing in the
//! format is the 4-gram key itself (see [`crate::hash::pack_gram`]), which is
//! a key-derivation rule rather than a serialisation rule.
//!
//! Section order is fixed:
//!
//! 1. header (72 bytes)
//! 2. pattern store (`pattern_store_size` bytes of concatenated bodies)
//! 3. Bloom section: magic(8) | bit_size:u32 | bits
//! 4. hash section: magic(8) | idx:u32[table_size] | bucket blob
//! 5. optional short-matcher section: magic(8) | bitmap1[32] | bitmap2[8192]
//!    | len1..len4:u32 | arr3 | arr4

use std::io::{self, Write};

// ── Magics and version ───────────────────────────────────────────────────────

/// File-level magic, first 8 bytes of every compiled index.
pub const HEADER_MAGIC: &[u8; 8] = b"0MGM4tCH";

/// Magic introducing the Bloom section.
pub const BLOOM_MAGIC: &[u8; 8] = b"0MG8L0oM";

/// Magic introducing the hash section.
pub const HASH_MAGIC: &[u8; 8] = b"0MG*H4sH";

/// Magic introducing the optional short-matcher section.
pub const SHORT_MAGIC: &[u8; 8] = b"0MG5HOrT";

/// Current index format version.
pub const FORMAT_VERSION: u32 = 1;

/// Serialised header size in bytes.
pub const HEADER_SIZE: usize = 72;

/// Serialised size of one long-pattern record: offset:u64, len:u32, pad:u32.
pub const RECORD_SIZE: usize = 16;

/// Empty-slot sentinel in the serialised `idx[]` array.
pub const EMPTY_SLOT: u32 = 0xFFFF_FFFF;

// ── Header flag bits (bit 0 reserved) ────────────────────────────────────────

pub const FLAG_IGNORE_CASE: u32 = 1 << 1;
pub const FLAG_IGNORE_PUNCTUATION: u32 = 1 << 2;
pub const FLAG_ELIDE_WHITESPACE: u32 = 1 << 3;

/// Mask of all transform flags.
pub const FLAG_TRANSFORM_MASK: u32 =
    FLAG_IGNORE_CASE | FLAG_IGNORE_PUNCTUATION | FLAG_ELIDE_WHITESPACE;

// ── Little-endian field helpers ──────────────────────────────────────────────

/// Read a little-endian `u32` from `src` at byte `offset`.
#[inline]
pub fn read_le32(src: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        src[offset],
        src[offset + 1],
        src[offset + 2],
        src[offset + 3],
    ])
}

/// Read a little-endian `u64` from `src` at byte `offset`.
#[inline]
pub fn read_le64(src: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&src[offset..offset + 8]);
    u64::from_le_bytes(b)
}

/// Write a little-endian `u32` into `dst` at byte `offset`.
#[inline]
pub fn write_le32(dst: &mut [u8], offset: usize, value: u32) {
    dst[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Write a little-endian `u64` into `dst` at byte `offset`.
#[inline]
pub fn write_le64(dst: &mut [u8], offset: usize, value: u64) {
    dst[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

// ── Compiled header ──────────────────────────────────────────────────────────

/// The fixed 72-byte header at the start of every compiled index.
///
/// Written zeroed when the output file is created, then rewritten in place at
/// finalise once every section size is known.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Header {
    pub version: u32,
    pub flags: u32,
    pub pattern_store_size: u64,
    pub stored_pattern_count: u32,
    pub smallest_pattern_length: u32,
    pub largest_pattern_length: u32,
    /// Size of the Bloom bit array in bytes (excludes magic and bit_size).
    pub bloom_filter_size: u32,
    /// Size of the bucket blob in bytes (excludes magic and idx array).
    pub hash_buckets_size: u32,
    pub table_size: u32,
    pub num_occupied_buckets: u32,
    pub min_bucket_size: u32,
    pub max_bucket_size: u32,
    pub short_matcher_size: u32,
    pub load_factor: f32,
    pub avg_bucket_size: f32,
}

impl Header {
    /// Serialise into the fixed 72-byte layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(HEADER_MAGIC);
        write_le32(&mut buf, 8, self.version);
        write_le32(&mut buf, 12, self.flags);
        write_le64(&mut buf, 16, self.pattern_store_size);
        write_le32(&mut buf, 24, self.stored_pattern_count);
        write_le32(&mut buf, 28, self.smallest_pattern_length);
        write_le32(&mut buf, 32, self.largest_pattern_length);
        write_le32(&mut buf, 36, self.bloom_filter_size);
        write_le32(&mut buf, 40, self.hash_buckets_size);
        write_le32(&mut buf, 44, self.table_size);
        write_le32(&mut buf, 48, self.num_occupied_buckets);
        write_le32(&mut buf, 52, self.min_bucket_size);
        write_le32(&mut buf, 56, self.max_bucket_size);
        write_le32(&mut buf, 60, self.short_matcher_size);
        write_le32(&mut buf, 64, self.load_factor.to_bits());
        write_le32(&mut buf, 68, self.avg_bucket_size.to_bits());
        buf
    }

    /// Decode a header from the start of a mapped index.
    ///
    /// Returns `None` when the buffer is too small or the magic is wrong;
    /// version checking is the loader's business.
    pub fn decode(src: &[u8]) -> Option<Header> {
        if src.len() < HEADER_SIZE || &src[0..8] != HEADER_MAGIC {
            return None;
        }
        Some(Header {
            version: read_le32(src, 8),
            flags: read_le32(src, 12),
            pattern_store_size: read_le64(src, 16),
            stored_pattern_count: read_le32(src, 24),
            smallest_pattern_length: read_le32(src, 28),
            largest_pattern_length: read_le32(src, 32),
            bloom_filter_size: read_le32(src, 36),
            hash_buckets_size: read_le32(src, 40),
            table_size: read_le32(src, 44),
            num_occupied_buckets: read_le32(src, 48),
            min_bucket_size: read_le32(src, 52),
            max_bucket_size: read_le32(src, 56),
            short_matcher_size: read_le32(src, 60),
            load_factor: f32::from_bits(read_le32(src, 64)),
            avg_bucket_size: f32::from_bits(read_le32(src, 68)),
        })
    }

    /// True when the index was compiled with any normalising transform.
    #[inline]
    pub fn has_transform(&self) -> bool {
        self.flags & FLAG_TRANSFORM_MASK != 0
    }

    /// One-line human summary of the header statistics, written under `-v`.
    pub fn emit_info(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Header v{} stats: total_patterns={}, smallest_pattern_length={}, \
             largest_pattern_length={}, case_insensitive_support={}, \
             string_store_size={}, bloom_filter_size={}, num_occupied_buckets={}, \
             table_size={}, min_bucket_size={}, max_bucket_size={}, \
             load_factor={:.2}, avg_bucket_size={:.2}",
            self.version,
            format_u64(u64::from(self.stored_pattern_count)),
            format_u64(u64::from(self.smallest_pattern_length)),
            format_u64(u64::from(self.largest_pattern_length)),
            if self.flags & FLAG_IGNORE_CASE != 0 { "yes" } else { "no" },
            format_u64(self.pattern_store_size),
            format_u64(u64::from(self.bloom_filter_size)),
            format_u64(u64::from(self.num_occupied_buckets)),
            format_u64(u64::from(self.table_size)),
            format_u64(u64::from(self.min_bucket_size)),
            format_u64(u64::from(self.max_bucket_size)),
            self.load_factor,
            self.avg_bucket_size,
        )
    }
}

/// Format a number with thousands separators for the verbose stat lines.
pub fn format_u64(v: u64) -> String {
    let digits = v.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let lead = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
