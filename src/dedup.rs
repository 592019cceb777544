//! Content-addressed set used to reject duplicate patterns.
//!
//! Open addressing with Robin-Hood displacement at a 0.9 load factor; the
//! table size is always a power of two so slot selection is a mask. Patterns
//! are never empty, so an empty stored buffer marks a free slot.

use crate::hash::hash_bytes;

const INITIAL_CAPACITY: usize = 8192;
const LOAD_FACTOR: f32 = 0.9;

#[derive(Default, Clone)]
struct Entry {
    hash: u32,
    dist: u32,
    buf: Vec<u8>,
}

impl Entry {
    #[inline]
    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Robin-Hood set over pattern bytes.
pub struct DedupSet {
    entries: Vec<Entry>,
    used: usize,
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupSet {
    pub fn new() -> DedupSet {
        DedupSet {
            entries: vec![Entry::default(); INITIAL_CAPACITY],
            used: 0,
        }
    }

    /// Number of distinct patterns stored.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Add `buf` to the set. Returns `true` when newly inserted, `false`
    /// when an identical pattern was already present.
    pub fn insert(&mut self, buf: &[u8]) -> bool {
        debug_assert!(!buf.is_empty());
        if (self.used + 1) as f32 / self.entries.len() as f32 > LOAD_FACTOR {
            self.resize();
        }

        let mask = self.entries.len() - 1;
        let h = hash_bytes(buf);
        let mut pos = h as usize & mask;
        let mut incoming: Option<Entry> = None;
        let mut dist: u32 = 0;

        loop {
            let entry = &mut self.entries[pos];
            if entry.is_empty() {
                *entry = incoming.unwrap_or_else(|| Entry {
                    hash: h,
                    dist,
                    buf: buf.to_vec(),
                });
                entry.dist = dist;
                self.used += 1;
                return true;
            }

            if incoming.is_none()
                && entry.hash == h
                && entry.buf.len() == buf.len()
                && entry.buf == buf
            {
                return false;
            }

            if dist > entry.dist {
                // Rich entry found a poorer slot: displace it forward.
                let evicted = std::mem::replace(
                    entry,
                    incoming.take().unwrap_or_else(|| Entry {
                        hash: h,
                        dist,
                        buf: buf.to_vec(),
                    }),
                );
                self.entries[pos].dist = dist;
                dist = evicted.dist;
                incoming = Some(evicted);
            }

            dist += 1;
            pos = (pos + 1) & mask;
        }
    }

    fn resize(&mut self) {
        let new_size = self.entries.len() << 1;
        let old = std::mem::replace(&mut self.entries, vec![Entry::default(); new_size]);
        self.used = 0;
        let mask = new_size - 1;

        for mut entry in old.into_iter().filter(|e| !e.is_empty()) {
            entry.dist = 0;
            let mut pos = entry.hash as usize & mask;
            let mut dist: u32 = 0;
            loop {
                if self.entries[pos].is_empty() {
                    entry.dist = dist;
                    self.entries[pos] = entry;
                    self.used += 1;
                    break;
                }
                if dist > self.entries[pos].dist {
                    entry.dist = dist;
                    std::mem::swap(&mut self.entries[pos], &mut entry);
                    dist = entry.dist;
                }
                dist += 1;
                pos = (pos + 1) & mask;
            }
        }
    }
}
