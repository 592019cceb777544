//! Three-hash Bloom filter keyed by 4-gram values.
//!
//! The filter sits in front of the hash table on the per-offset hot path: a
//! negative answer lets the scanner skip the probe entirely, which is the
//! common case for haystack bytes that start no pattern. Bit addressing is a
//! mask (the bit count is always a power of two), never a modulo.
//!
//! The three bit positions for key `k` are derived from `h1 = gram_hash(k)`
//! and `h2 = k × 0x9E3779B1` as `h1`, `h1 + h2`, `h1 + 2·h2`, each masked.

use std::io::{self, Write};

use crate::format::{read_le64, BLOOM_MAGIC};
use crate::hash::gram_hash;

const GOLDEN_RATIO_32: u32 = 0x9e37_79b1;

/// Build-side Bloom filter; serialised at finalise.
pub struct BloomFilter {
    bit_size: u32,
    bits: Vec<u64>,
}

impl BloomFilter {
    /// Create a filter of at least `expected_bits` bits, rounded up so the
    /// byte size is a power of two (and therefore the bit size as well).
    pub fn new(expected_bits: u32) -> BloomFilter {
        let byte_size = (((expected_bits as u64 + 63) & !63) >> 3) as u32;
        let byte_size = byte_size.next_power_of_two();
        let bit_size = byte_size << 3;
        BloomFilter {
            bit_size,
            bits: vec![0u64; (bit_size >> 6) as usize],
        }
    }

    /// Size of the bit array in bytes (the header's `bloom_filter_size`).
    pub fn size_bytes(&self) -> u32 {
        self.bit_size >> 3
    }

    /// Insert a gram key.
    pub fn add(&mut self, key: u32) {
        let h1 = gram_hash(key);
        let h2 = key.wrapping_mul(GOLDEN_RATIO_32);
        let mask = self.bit_size - 1;

        let mut bit = h1 & mask;
        self.bits[(bit >> 6) as usize] |= 1u64 << (bit & 63);
        bit = bit.wrapping_add(h2) & mask;
        self.bits[(bit >> 6) as usize] |= 1u64 << (bit & 63);
        bit = bit.wrapping_add(h2) & mask;
        self.bits[(bit >> 6) as usize] |= 1u64 << (bit & 63);
    }

    /// Membership test on the build side (used by tests; the scanner goes
    /// through [`BloomView`]).
    pub fn query(&self, key: u32) -> bool {
        let h1 = gram_hash(key);
        let h2 = key.wrapping_mul(GOLDEN_RATIO_32);
        let mask = self.bit_size - 1;

        let p0 = h1 & mask;
        let p1 = h1.wrapping_add(h2) & mask;
        let p2 = h1.wrapping_add(h2.wrapping_mul(2)) & mask;

        (self.bits[(p0 >> 6) as usize] >> (p0 & 63)) & 1 != 0
            && (self.bits[(p1 >> 6) as usize] >> (p1 & 63)) & 1 != 0
            && (self.bits[(p2 >> 6) as usize] >> (p2 & 63)) & 1 != 0
    }

    /// Emit the Bloom section: magic, bit size, then the bit words.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(BLOOM_MAGIC)?;
        out.write_all(&self.bit_size.to_le_bytes())?;
        for word in &self.bits {
            out.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Zero-copy query view over the mapped bit array.
///
/// The section start is unaligned in general (it follows the byte-packed
/// pattern store), so words are decoded rather than transmuted.
#[derive(Clone, Copy)]
pub struct BloomView<'a> {
    bits: &'a [u8],
    mask: u32,
}

impl<'a> BloomView<'a> {
    /// Bind a view over `bits` (the raw bit-array bytes) with the bit count
    /// recorded in the section header.
    pub fn new(bits: &'a [u8], bit_size: u32) -> BloomView<'a> {
        debug_assert_eq!(bits.len(), (bit_size >> 3) as usize);
        BloomView {
            bits,
            mask: bit_size - 1,
        }
    }

    /// Membership test; false means no pattern can start with this gram.
    #[inline(always)]
    pub fn query(&self, key: u32) -> bool {
        let h1 = gram_hash(key);
        let h2 = key.wrapping_mul(GOLDEN_RATIO_32);

        let p0 = h1 & self.mask;
        let p1 = h1.wrapping_add(h2) & self.mask;
        let p2 = h1.wrapping_add(h2.wrapping_mul(2)) & self.mask;

        (read_le64(self.bits, ((p0 >> 6) << 3) as usize) >> (p0 & 63)) & 1 != 0
            && (read_le64(self.bits, ((p1 >> 6) << 3) as usize) >> (p1 & 63)) & 1 != 0
            && (read_le64(self.bits, ((p2 >> 6) << 3) as usize) >> (p2 & 63)) & 1 != 0
    }
}
