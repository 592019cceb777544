//! Build-side hash table mapping 4-gram keys to buckets of long patterns.
//!
//! Open addressing with Robin-Hood displacement bounds the worst-case probe
//! length, which keeps the read-side linear probe predictable. The table is
//! only ever consulted through [`crate::index`] views after serialisation;
//! this structure exists to accumulate buckets during compilation.

use crate::hash::hash_u32;

const INITIAL_CAPACITY: u32 = 8192;
const LOAD_FACTOR: f32 = 0.9;
const INITIAL_BUCKET_CAPACITY: usize = 4;

/// One long-pattern record: a byte offset into the pattern store and the
/// pattern length. Serialised as 16 packed bytes (offset, len, pad).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRecord {
    pub offset: u64,
    pub len: u32,
}

struct Entry {
    key: u32,
    dist: u32,
    records: Vec<PatternRecord>,
}

/// Gram-keyed Robin-Hood table; one entry per distinct leading 4-gram.
pub struct HashTable {
    entries: Vec<Option<Entry>>,
    used: u32,
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HashTable {
    pub fn new() -> HashTable {
        HashTable {
            entries: (0..INITIAL_CAPACITY).map(|_| None).collect(),
            used: 0,
        }
    }

    /// Power-of-two slot count.
    pub fn size(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Number of occupied buckets.
    pub fn used(&self) -> u32 {
        self.used
    }

    /// Append a pattern record under `key`, creating the bucket on first use.
    pub fn insert(&mut self, key: u32, offset: u64, len: u32) {
        if (self.used + 1) as f32 / self.entries.len() as f32 > LOAD_FACTOR {
            self.resize();
        }

        let mask = self.entries.len() - 1;
        let home = hash_u32(key) as usize & mask;

        // Existing bucket first: probe until the key or an empty slot.
        let mut pos = home;
        loop {
            match &mut self.entries[pos] {
                None => break,
                Some(entry) if entry.key == key => {
                    entry.records.push(PatternRecord { offset, len });
                    return;
                }
                Some(_) => pos = (pos + 1) & mask,
            }
        }

        // New bucket: Robin-Hood insertion from the home slot.
        let mut records = Vec::with_capacity(INITIAL_BUCKET_CAPACITY);
        records.push(PatternRecord { offset, len });
        self.place(Entry {
            key,
            dist: 0,
            records,
        });
        self.used += 1;
    }

    fn place(&mut self, mut entry: Entry) {
        let mask = self.entries.len() - 1;
        let mut pos = hash_u32(entry.key) as usize & mask;
        let mut dist: u32 = 0;
        loop {
            match self.entries[pos].as_mut() {
                None => {
                    entry.dist = dist;
                    self.entries[pos] = Some(entry);
                    return;
                }
                Some(occupant) => {
                    if dist > occupant.dist {
                        entry.dist = dist;
                        std::mem::swap(occupant, &mut entry);
                        dist = entry.dist;
                    }
                    dist += 1;
                    pos = (pos + 1) & mask;
                }
            }
        }
    }

    fn resize(&mut self) {
        let new_size = self.entries.len() << 1;
        let old = std::mem::replace(
            &mut self.entries,
            (0..new_size).map(|_| None).collect(),
        );
        for entry in old.into_iter().flatten() {
            self.place(Entry { dist: 0, ..entry });
        }
    }

    /// Sort every bucket's records by descending length so the scanner tests
    /// long candidates first. Stable, so equal-length records keep insertion
    /// order.
    pub fn sort_buckets_longest_first(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            entry.records.sort_by_key(|r| std::cmp::Reverse(r.len));
        }
    }

    /// Iterate slots in table order; `None` for empty slots.
    pub fn slots(&self) -> impl Iterator<Item = Option<(u32, &[PatternRecord])>> {
        self.entries
            .iter()
            .map(|slot| slot.as_ref().map(|e| (e.key, e.records.as_slice())))
    }
}
