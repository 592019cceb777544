//! Compiled-index loader: validation and zero-copy section views.
//!
//! The loader memory-maps the file once, walks the section chain checking
//! every magic and that the section sizes sum exactly to the file size, and
//! then binds borrowed views the scanner reads directly out of the mapping.
//! Nothing is copied; a validation failure drops the mapping and reports
//! [`MatchError::Corrupt`].

use std::ops::Range;
use std::path::Path;

use log::debug;
use memmap2::Mmap;

use crate::bloom::BloomView;
use crate::error::{MatchError, Result};
use crate::format::{
    read_le32, Header, BLOOM_MAGIC, EMPTY_SLOT, FORMAT_VERSION, HASH_MAGIC, HEADER_SIZE,
    RECORD_SIZE, SHORT_MAGIC,
};
use crate::hash::hash_u32;
use crate::mapping::map_path;
use crate::short_matcher::ShortView;

/// A validated, memory-mapped index.
pub struct Index {
    map: Mmap,
    header: Header,
    pattern_store: Range<usize>,
    bloom_bits: Range<usize>,
    bloom_bit_size: u32,
    idx: Range<usize>,
    blob: Range<usize>,
    /// Short-matcher section body (after its magic), when present.
    short: Option<Range<usize>>,
}

impl Index {
    /// Map and validate a compiled index.
    pub fn open(path: &Path) -> Result<Index> {
        let map = map_path(path, false)?;
        let index = Index::from_map(map)?;
        debug!(
            "index loaded: {} stored patterns, table_size {}, short section: {}",
            index.header.stored_pattern_count,
            index.header.table_size,
            index.short.is_some(),
        );
        Ok(index)
    }

    fn from_map(map: Mmap) -> Result<Index> {
        let bytes: &[u8] = &map;
        let file_size = bytes.len();

        let header = Header::decode(bytes).ok_or(MatchError::Corrupt("bad header magic"))?;
        if header.version != FORMAT_VERSION {
            return Err(MatchError::Corrupt("unsupported format version"));
        }
        if header.table_size == 0 || !header.table_size.is_power_of_two() {
            return Err(MatchError::Corrupt("table size is not a power of two"));
        }

        let mut offset = HEADER_SIZE;

        let pattern_store = take(&mut offset, header.pattern_store_size as usize, file_size)
            .ok_or(MatchError::Corrupt("pattern store overruns file"))?;

        // Bloom section: magic | bit_size | bits.
        let magic = take(&mut offset, 8, file_size)
            .ok_or(MatchError::Corrupt("missing bloom section"))?;
        if &bytes[magic] != BLOOM_MAGIC {
            return Err(MatchError::Corrupt("bad bloom section magic"));
        }
        let bit_size_at = take(&mut offset, 4, file_size)
            .ok_or(MatchError::Corrupt("missing bloom bit size"))?;
        let bloom_bit_size = read_le32(bytes, bit_size_at.start);
        if bloom_bit_size >> 3 != header.bloom_filter_size {
            return Err(MatchError::Corrupt("bloom size disagrees with header"));
        }
        let bloom_bits = take(&mut offset, header.bloom_filter_size as usize, file_size)
            .ok_or(MatchError::Corrupt("bloom bits overrun file"))?;

        // Hash section: magic | idx array | bucket blob.
        let magic = take(&mut offset, 8, file_size)
            .ok_or(MatchError::Corrupt("missing hash section"))?;
        if &bytes[magic] != HASH_MAGIC {
            return Err(MatchError::Corrupt("bad hash section magic"));
        }
        let idx = take(&mut offset, header.table_size as usize * 4, file_size)
            .ok_or(MatchError::Corrupt("hash index array overruns file"))?;
        let blob = take(&mut offset, header.hash_buckets_size as usize, file_size)
            .ok_or(MatchError::Corrupt("bucket data overruns file"))?;

        // Optional short-matcher section.
        let short = if header.short_matcher_size > 0 {
            if (header.short_matcher_size as usize) < 8 {
                return Err(MatchError::Corrupt("short matcher section too small"));
            }
            let magic = take(&mut offset, 8, file_size)
                .ok_or(MatchError::Corrupt("missing short matcher section"))?;
            if &bytes[magic] != SHORT_MAGIC {
                return Err(MatchError::Corrupt("bad short matcher magic"));
            }
            let body = take(&mut offset, header.short_matcher_size as usize - 8, file_size)
                .ok_or(MatchError::Corrupt("short matcher overruns file"))?;
            if ShortView::parse(&bytes[body.clone()]).is_none() {
                return Err(MatchError::Corrupt("short matcher internally inconsistent"));
            }
            Some(body)
        } else {
            None
        };

        if offset != file_size {
            return Err(MatchError::Corrupt("section sizes do not sum to file size"));
        }

        // Every occupied idx slot must point at a bucket that fits inside the
        // blob, so the scanner can trust offsets without rechecking.
        let idx_bytes = &bytes[idx.clone()];
        let blob_bytes = &bytes[blob.clone()];
        for i in 0..header.table_size as usize {
            let slot = read_le32(idx_bytes, i * 4);
            if slot == EMPTY_SLOT {
                continue;
            }
            let start = slot as usize;
            if start + 8 > blob_bytes.len() {
                return Err(MatchError::Corrupt("bucket offset outside blob"));
            }
            let count = read_le32(blob_bytes, start + 4) as usize;
            if count == 0 || start + 8 + count * RECORD_SIZE > blob_bytes.len() {
                return Err(MatchError::Corrupt("bucket records overrun blob"));
            }
        }

        Ok(Index {
            map,
            header,
            pattern_store,
            bloom_bits,
            bloom_bit_size,
            idx,
            blob,
            short,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Bind the borrowed views the scanner works against.
    pub fn views(&self) -> IndexViews<'_> {
        let bytes: &[u8] = &self.map;
        IndexViews {
            header: self.header,
            pattern_store: &bytes[self.pattern_store.clone()],
            bloom: BloomView::new(&bytes[self.bloom_bits.clone()], self.bloom_bit_size),
            idx: &bytes[self.idx.clone()],
            blob: &bytes[self.blob.clone()],
            short: self
                .short
                .clone()
                .and_then(|r| ShortView::parse(&bytes[r])),
            table_mask: self.header.table_size - 1,
        }
    }
}

/// Advance `*offset` by `len`, returning the consumed range, or `None` when
/// it would pass `end`.
fn take(offset: &mut usize, len: usize, end: usize) -> Option<Range<usize>> {
    let start = *offset;
    let stop = start.checked_add(len)?;
    if stop > end {
        return None;
    }
    *offset = stop;
    Some(start..stop)
}

/// Borrowed views over one mapped index, shared read-only by every scan task.
#[derive(Clone, Copy)]
pub struct IndexViews<'a> {
    pub header: Header,
    pub pattern_store: &'a [u8],
    pub bloom: BloomView<'a>,
    pub idx: &'a [u8],
    pub blob: &'a [u8],
    pub short: Option<ShortView<'a>>,
    pub table_mask: u32,
}

impl<'a> IndexViews<'a> {
    /// Linear-probe the index array for the bucket keyed by `cand`.
    /// Returns the bucket's byte offset in the blob.
    ///
    /// Robin-Hood displacement on the build side only changes where an entry
    /// lives, not whether a plain linear probe finds it, so no probe-distance
    /// bookkeeping is needed here.
    #[inline]
    pub fn probe(&self, cand: u32) -> Option<u32> {
        let mask = self.table_mask;
        let mut idx = hash_u32(cand) & mask;
        let mut probes = 0u32;
        while probes <= mask {
            let slot = read_le32(self.idx, idx as usize * 4);
            if slot == EMPTY_SLOT {
                return None;
            }
            if read_le32(self.blob, slot as usize) == cand {
                return Some(slot);
            }
            probes += 1;
            idx = (idx + 1) & mask;
        }
        None
    }

    /// Number of records in the bucket at `slot`.
    #[inline]
    pub fn bucket_len(&self, slot: u32) -> u32 {
        read_le32(self.blob, slot as usize + 4)
    }

    /// The `j`-th record of the bucket at `slot`.
    #[inline]
    pub fn bucket_record(&self, slot: u32, j: u32) -> (u64, u32) {
        let at = slot as usize + 8 + j as usize * RECORD_SIZE;
        (
            crate::format::read_le64(self.blob, at),
            read_le32(self.blob, at + 8),
        )
    }
}
