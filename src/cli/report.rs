//! Result and statistics output.
//!
//! Matches are printed one per line as `<offset>:<matched-bytes>` through a
//! wide buffered writer; matched bytes are written raw (they are arbitrary
//! haystack bytes, not necessarily UTF-8).

use std::io::{self, Write};

use crate::results::Match;

const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Write all matches to `out` in their delivered (canonical) order.
pub fn print_matches(out: &mut dyn Write, matches: &[Match<'_>]) -> io::Result<()> {
    let mut buffered = io::BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, out);
    for m in matches {
        write!(buffered, "{}:", m.offset)?;
        buffered.write_all(m.bytes)?;
        buffered.write_all(b"\n")?;
    }
    buffered.flush()
}
