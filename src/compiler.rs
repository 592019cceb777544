//! Streaming index compiler.
//!
//! `create` opens the output file and reserves a zeroed header; `add_pattern`
//! routes each (optionally normalised) pattern to the short matcher or to the
//! pattern store + hash table; `finish` serialises everything in section
//! order and rewrites the header in place.
//!
//! Serialisation is two-pass by necessity: the `idx[]` array can only be
//! filled once every bucket's byte offset is known, and the header once every
//! section size is known, so both are reserved first and rewritten with a
//! seek. No scratch file is involved.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::bloom::BloomFilter;
use crate::error::{MatchError, Result};
use crate::format::{Header, EMPTY_SLOT, FORMAT_VERSION, HASH_MAGIC, HEADER_MAGIC, HEADER_SIZE};
use crate::hash::pack_gram;
use crate::hash_table::HashTable;
use crate::mapping::map_path;
use crate::pattern_store::PatternStore;
use crate::short_matcher::ShortMatcherBuilder;
use crate::stats::PatternStoreStats;
use crate::transform::{TransformFlags, TransformTable};

/// Bloom bits allotted per hash-table slot.
const BLOOM_BITS_PER_SLOT: u32 = 16;

/// Longest pattern class handled by the short matcher.
const SHORT_PATTERN_MAX: usize = 4;

/// Streaming compiler; one instance per output index.
pub struct Compiler {
    out: BufWriter<File>,
    table: HashTable,
    store: PatternStore,
    short: ShortMatcherBuilder,
    transform: Option<TransformTable>,
    norm_buf: Vec<u8>,
    flags: TransformFlags,
    stats: PatternStoreStats,
}

impl Compiler {
    /// Open `path` for writing and reserve the header.
    pub fn create(path: &Path, flags: TransformFlags) -> Result<Compiler> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        out.write_all(&[0u8; HEADER_SIZE])?;

        Ok(Compiler {
            out,
            table: HashTable::new(),
            store: PatternStore::new(),
            short: ShortMatcherBuilder::new(),
            transform: flags.any().then(|| TransformTable::new(flags)),
            norm_buf: Vec::new(),
            flags,
            stats: PatternStoreStats::default(),
        })
    }

    /// Add one literal pattern.
    ///
    /// Rejects empty patterns, and patterns whose normalised form is empty
    /// when a transform is active. Duplicates are counted and dropped.
    pub fn add_pattern(&mut self, pattern: &[u8]) -> Result<()> {
        if pattern.is_empty() {
            return Err(MatchError::InvalidArgument("zero-length pattern"));
        }

        let pat: &[u8] = match &self.transform {
            Some(table) => {
                table.apply(pattern, &mut self.norm_buf, None);
                if self.norm_buf.is_empty() {
                    return Err(MatchError::InvalidArgument(
                        "pattern normalises to nothing",
                    ));
                }
                &self.norm_buf
            }
            None => pattern,
        };

        if pat.len() <= SHORT_PATTERN_MAX {
            if self.short.add(pat) {
                let len = pat.len() as u32;
                if len < self.stats.smallest_pattern_length {
                    self.stats.smallest_pattern_length = len;
                }
                if len > self.stats.largest_pattern_length {
                    self.stats.largest_pattern_length = len;
                }
                self.stats.short_pattern_count += 1;
                self.stats.total_input_bytes += u64::from(len);
            } else {
                self.stats.duplicate_patterns += 1;
            }
        } else if let Some(offset) = self.store.append(&mut self.out, pat, &mut self.stats)? {
            self.table.insert(pack_gram(pat), offset, pat.len() as u32);
        }

        Ok(())
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> &PatternStoreStats {
        &self.stats
    }

    /// Serialise the remaining sections, rewrite the header, flush, close.
    pub fn finish(self) -> Result<PatternStoreStats> {
        let Compiler {
            mut out,
            mut table,
            store,
            mut short,
            flags,
            stats,
            ..
        } = self;

        let mut header = Header {
            version: FORMAT_VERSION,
            flags: flags.bits(),
            pattern_store_size: store.size(),
            stored_pattern_count: stats.stored_pattern_count,
            smallest_pattern_length: stats.smallest_pattern_length,
            largest_pattern_length: stats.largest_pattern_length,
            ..Header::default()
        };

        // Bloom filter over the occupied bucket keys; bucket min/max fall out
        // of the same walk, and each bucket is put in longest-first order for
        // the scanner.
        table.sort_buckets_longest_first();
        let mut bloom = BloomFilter::new(table.size().saturating_mul(BLOOM_BITS_PER_SLOT));
        let mut min_bucket = u32::MAX;
        let mut max_bucket = 0u32;
        for (key, records) in table.slots().flatten() {
            bloom.add(key);
            let count = records.len() as u32;
            min_bucket = min_bucket.min(count);
            max_bucket = max_bucket.max(count);
        }

        header.bloom_filter_size = bloom.size_bytes();
        header.table_size = table.size();
        header.num_occupied_buckets = table.used();
        header.min_bucket_size = if min_bucket == u32::MAX { 0 } else { min_bucket };
        header.max_bucket_size = max_bucket;
        header.load_factor = table.used() as f32 / table.size() as f32;
        header.avg_bucket_size = if table.used() == 0 {
            0.0
        } else {
            stats.stored_pattern_count as f32 / table.used() as f32
        };

        bloom.write_to(&mut out)?;

        // Hash section: magic, then a reserved index array, then the bucket
        // blob; the index array is rewritten once the blob offsets are known.
        out.write_all(HASH_MAGIC)?;
        let index_array_start = out.stream_position()?;
        out.write_all(&vec![0u8; table.size() as usize * 4])?;

        let mut idx_arr = vec![EMPTY_SLOT; table.size() as usize];
        let mut cursor = 0u64;
        for (i, slot) in table.slots().enumerate() {
            let Some((key, records)) = slot else { continue };
            idx_arr[i] = cursor as u32;
            out.write_all(&key.to_le_bytes())?;
            out.write_all(&(records.len() as u32).to_le_bytes())?;
            for r in records {
                out.write_all(&r.offset.to_le_bytes())?;
                out.write_all(&r.len.to_le_bytes())?;
                out.write_all(&[0u8; 4])?;
            }
            cursor += 8 + 16 * records.len() as u64;
        }
        header.hash_buckets_size = cursor as u32;

        out.seek(SeekFrom::Start(index_array_start))?;
        for v in &idx_arr {
            out.write_all(&v.to_le_bytes())?;
        }
        out.seek(SeekFrom::End(0))?;

        if !short.is_empty() {
            header.short_matcher_size = short.write_to(&mut out)?;
        }

        out.seek(SeekFrom::Start(0))?;
        out.write_all(&header.encode())?;
        out.flush()?;

        debug!(
            "index finished: {} stored, {} short, {} duplicates, {} buckets over {} slots",
            stats.stored_pattern_count,
            stats.short_pattern_count,
            stats.duplicate_patterns,
            table.used(),
            table.size(),
        );

        Ok(stats)
    }
}

/// Compile a newline-separated pattern buffer into `out_path`.
///
/// A trailing `\r` on each line is dropped; empty lines are skipped.
pub fn compile_patterns(
    out_path: &Path,
    patterns: &[u8],
    flags: TransformFlags,
) -> Result<PatternStoreStats> {
    let mut compiler = Compiler::create(out_path, flags)?;
    for line in patterns.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !line.is_empty() {
            compiler.add_pattern(line)?;
        }
    }
    compiler.finish()
}

/// Compile a newline-separated pattern file into `out_path`.
pub fn compile_patterns_file(
    out_path: &Path,
    patterns_path: &Path,
    flags: TransformFlags,
) -> Result<PatternStoreStats> {
    let map = map_path(patterns_path, true)?;
    compile_patterns(out_path, &map, flags)
}

/// True when `path` starts with the compiled-index magic.
pub fn is_compiled(path: &Path) -> bool {
    use std::io::Read;
    let mut magic = [0u8; 8];
    match File::open(path) {
        Ok(mut f) => f.read_exact(&mut magic).is_ok() && &magic == HEADER_MAGIC,
        Err(_) => false,
    }
}
