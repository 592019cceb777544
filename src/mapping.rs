//! File memory-mapping helpers.
//!
//! Both the compiled index and the haystack are consumed as single immutable
//! mappings; every structure the scanner touches is a zero-copy view into
//! one of them.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

/// Map a file read-only. `sequential` asks the OS to prefetch ahead of a
/// linear read (used for haystacks and pattern lists, not for the index).
///
/// Empty files cannot be mapped; callers that can meaningfully handle an
/// empty input check the length first.
pub fn map_path(path: &Path, sequential: bool) -> io::Result<Mmap> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "cannot map an empty file",
        ));
    }

    // Safety: the mapping is read-only and lives as long as the returned
    // Mmap; mutating the file behind a live map is the caller's hazard, as
    // with any mapped I/O.
    let map = unsafe { Mmap::map(&file)? };

    #[cfg(unix)]
    if sequential {
        // Advisory only; a refusal changes nothing functionally.
        let _ = map.advise(memmap2::Advice::Sequential);
    }
    #[cfg(not(unix))]
    let _ = sequential;

    Ok(map)
}
