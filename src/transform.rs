//! Canonicalising byte transform: case folding, punctuation stripping,
//! whitespace collapsing.
//!
//! The transform is a 256-entry map from input byte to an action — rewrite,
//! drop, or collapse-a-whitespace-run — applied identically to patterns at
//! compile time and to the haystack at scan time, so the index recognises
//! canonicalised forms. When the transform can shrink the text (punctuation
//! or whitespace modes) an offset back-map is produced alongside, mapping
//! each output byte to the source byte that produced it.

use crate::format::{FLAG_ELIDE_WHITESPACE, FLAG_IGNORE_CASE, FLAG_IGNORE_PUNCTUATION};

const SKIP: i16 = -1;
const ELIDE_SPACE: i16 = -2;

/// Which normalisations are active. Stored in the index header so a matcher
/// reproduces the compile-time transform exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformFlags {
    /// Fold letters to upper case.
    pub ignore_case: bool,
    /// Drop punctuation bytes entirely.
    pub ignore_punctuation: bool,
    /// Collapse whitespace runs to a single `' '`.
    pub elide_whitespace: bool,
}

impl TransformFlags {
    /// True when any normalisation is active.
    pub fn any(&self) -> bool {
        self.ignore_case || self.ignore_punctuation || self.elide_whitespace
    }

    /// True when the transform is length-preserving (case folding only), so
    /// offsets map 1:1 and no back-map is needed.
    pub fn is_identity_mapping(&self) -> bool {
        !self.ignore_punctuation && !self.elide_whitespace
    }

    /// Header flag bits.
    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.ignore_case {
            bits |= FLAG_IGNORE_CASE;
        }
        if self.ignore_punctuation {
            bits |= FLAG_IGNORE_PUNCTUATION;
        }
        if self.elide_whitespace {
            bits |= FLAG_ELIDE_WHITESPACE;
        }
        bits
    }

    /// Decode from header flag bits.
    pub fn from_bits(bits: u32) -> TransformFlags {
        TransformFlags {
            ignore_case: bits & FLAG_IGNORE_CASE != 0,
            ignore_punctuation: bits & FLAG_IGNORE_PUNCTUATION != 0,
            elide_whitespace: bits & FLAG_ELIDE_WHITESPACE != 0,
        }
    }
}

/// Whitespace class for elision: the usual C escapes plus bell and backspace.
#[inline(always)]
pub fn is_space_byte(b: u8) -> bool {
    matches!(b, 0x07..=0x0D | b' ')
}

/// Punctuation class for stripping. Underscore is a word character and is
/// deliberately not included.
#[inline(always)]
pub fn is_punct_byte(b: u8) -> bool {
    matches!(b, b'!'..=b'/' | b':'..=b'@' | b'['..=b'^' | b'`' | b'{'..=b'~')
}

/// Precomputed per-byte remap.
pub struct TransformTable {
    table: [i16; 256],
}

impl TransformTable {
    pub fn new(flags: TransformFlags) -> TransformTable {
        let mut table = [0i16; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let b = i as u8;
            *slot = if flags.elide_whitespace && is_space_byte(b) {
                ELIDE_SPACE
            } else if flags.ignore_punctuation && is_punct_byte(b) {
                SKIP
            } else if flags.ignore_case {
                i16::from(b.to_ascii_uppercase())
            } else {
                i16::from(b)
            };
        }
        TransformTable { table }
    }

    /// Normalise `src` into `out` in a single pass, optionally recording a
    /// back-map (`backmap[j]` = index in `src` that produced `out[j]`; a
    /// collapsed whitespace run maps to its first byte). A trailing space is
    /// stripped. Both vectors are cleared first and may be reused across
    /// calls.
    pub fn apply(&self, src: &[u8], out: &mut Vec<u8>, mut backmap: Option<&mut Vec<usize>>) {
        out.clear();
        if let Some(map) = backmap.as_deref_mut() {
            map.clear();
        }

        let mut in_space = false;
        for (i, &b) in src.iter().enumerate() {
            match self.table[usize::from(b)] {
                SKIP => {}
                ELIDE_SPACE => {
                    if !in_space {
                        out.push(b' ');
                        if let Some(map) = backmap.as_deref_mut() {
                            map.push(i);
                        }
                        in_space = true;
                    }
                }
                mapped => {
                    out.push(mapped as u8);
                    if let Some(map) = backmap.as_deref_mut() {
                        map.push(i);
                    }
                    in_space = false;
                }
            }
        }

        if out.last() == Some(&b' ') {
            out.pop();
            if let Some(map) = backmap.as_deref_mut() {
                map.pop();
            }
        }
    }
}

/// Incremental normaliser for the scan-side window loop.
///
/// Unlike [`TransformTable::apply`] this carries the in-whitespace state
/// across calls, so a whitespace run that spans two windows still collapses
/// to one output byte, and nothing is stripped at window edges. The back-map
/// records *absolute* source offsets.
pub struct StreamNormalizer<'a> {
    table: &'a TransformTable,
    in_space: bool,
}

impl<'a> StreamNormalizer<'a> {
    pub fn new(table: &'a TransformTable) -> StreamNormalizer<'a> {
        StreamNormalizer {
            table,
            in_space: false,
        }
    }

    /// Consume source bytes (which sit at absolute offset `base` in the
    /// haystack) until `out` holds `limit` bytes or `src` is exhausted.
    /// Returns the number of source bytes consumed.
    pub fn feed(
        &mut self,
        src: &[u8],
        base: usize,
        limit: usize,
        out: &mut Vec<u8>,
        mut backmap: Option<&mut Vec<usize>>,
    ) -> usize {
        let mut consumed = 0;
        for &b in src {
            if out.len() >= limit {
                break;
            }
            match self.table.table[usize::from(b)] {
                SKIP => {}
                ELIDE_SPACE => {
                    if !self.in_space {
                        out.push(b' ');
                        if let Some(map) = backmap.as_deref_mut() {
                            map.push(base + consumed);
                        }
                        self.in_space = true;
                    }
                }
                mapped => {
                    out.push(mapped as u8);
                    if let Some(map) = backmap.as_deref_mut() {
                        map.push(base + consumed);
                    }
                    self.in_space = false;
                }
            }
            consumed += 1;
        }
        consumed
    }
}
