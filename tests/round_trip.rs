// Compile/scan laws over generated corpora: round-trip completeness, parity
// with a naive reference scan, output determinism across thread and chunk
// configurations, and the filter laws.

use std::collections::HashSet;

use litmatch::{compile_patterns, MatchOptions, Matcher, TransformFlags};

/// Deterministic xorshift; tests must not vary between runs.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next() as usize) % (hi - lo)
    }
}

fn random_patterns(rng: &mut Rng, count: usize, min_len: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut seen = HashSet::new();
    let mut patterns = Vec::new();
    while patterns.len() < count {
        let len = rng.range(min_len, max_len + 1);
        let p: Vec<u8> = (0..len).map(|_| b'a' + (rng.next() % 26) as u8).collect();
        if seen.insert(p.clone()) {
            patterns.push(p);
        }
    }
    patterns
}

fn pattern_list(patterns: &[Vec<u8>]) -> Vec<u8> {
    let mut list = Vec::new();
    for p in patterns {
        list.extend_from_slice(p);
        list.push(b'\n');
    }
    list
}

fn compile(patterns: &[Vec<u8>]) -> (tempfile::TempDir, Matcher) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generated.idx");
    compile_patterns(&path, &pattern_list(patterns), TransformFlags::default()).unwrap();
    let matcher = Matcher::open(&path).unwrap();
    (dir, matcher)
}

/// Every occurrence of every pattern, by definition.
fn naive_scan(patterns: &[Vec<u8>], haystack: &[u8]) -> Vec<(usize, u32)> {
    let mut hits = Vec::new();
    for p in patterns {
        if p.len() > haystack.len() {
            continue;
        }
        for pos in 0..=haystack.len() - p.len() {
            if &haystack[pos..pos + p.len()] == p.as_slice() {
                hits.push((pos, p.len() as u32));
            }
        }
    }
    hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hits
}

#[test]
fn every_compiled_pattern_is_found_in_its_own_listing() {
    let mut rng = Rng(0xDEAD_BEEF_0001);
    let patterns = random_patterns(&mut rng, 200, 1, 12);
    let (_dir, matcher) = compile(&patterns);

    // Concatenate with a separator byte that no pattern contains.
    let mut haystack = Vec::new();
    let mut starts = Vec::new();
    for p in &patterns {
        starts.push(haystack.len());
        haystack.extend_from_slice(p);
        haystack.push(b'\x00');
    }

    let found: HashSet<(usize, u32)> = matcher
        .find(&haystack, &MatchOptions::default())
        .unwrap()
        .iter()
        .map(|m| (m.offset, m.len))
        .collect();

    for (p, &start) in patterns.iter().zip(&starts) {
        assert!(
            found.contains(&(start, p.len() as u32)),
            "pattern {:?} missing at its own offset {start}",
            String::from_utf8_lossy(p),
        );
    }
}

#[test]
fn matches_agree_with_naive_reference() {
    let mut rng = Rng(0xDEAD_BEEF_0002);
    let patterns = random_patterns(&mut rng, 300, 5, 40);

    // Random haystack with patterns seeded into disjoint 64-byte slots.
    let mut haystack: Vec<u8> = (0..128 * 1024)
        .map(|_| b'a' + (rng.next() % 26) as u8)
        .collect();
    let mut injected = Vec::new();
    for (i, p) in patterns.iter().enumerate().take(1000) {
        let slot = rng.range(0, haystack.len() / 64);
        let at = slot * 64;
        haystack[at..at + p.len()].copy_from_slice(p);
        injected.push((i, at));
    }

    let (_dir, matcher) = compile(&patterns);
    let found: Vec<(usize, u32)> = matcher
        .find(&haystack, &MatchOptions::default())
        .unwrap()
        .iter()
        .map(|m| (m.offset, m.len))
        .collect();

    let expected = naive_scan(&patterns, &haystack);
    assert_eq!(found, expected);

    // Injections that survived later overwrites must all be reported.
    let found_set: HashSet<(usize, u32)> = found.into_iter().collect();
    for (i, at) in injected {
        let p = &patterns[i];
        if &haystack[at..at + p.len()] == p.as_slice() {
            assert!(found_set.contains(&(at, p.len() as u32)));
        }
    }
}

#[test]
fn output_is_deterministic_across_threads_and_chunks() {
    let mut rng = Rng(0xDEAD_BEEF_0003);
    let patterns = random_patterns(&mut rng, 100, 2, 20);
    let haystack: Vec<u8> = {
        let mut hay: Vec<u8> = (0..128 * 1024)
            .map(|_| b'a' + (rng.next() % 4) as u8)
            .collect();
        for p in &patterns {
            let at = rng.range(0, hay.len() - p.len());
            hay[at..at + p.len()].copy_from_slice(p);
        }
        hay
    };

    let (_dir, mut matcher) = compile(&patterns);
    let baseline = matcher.find(&haystack, &MatchOptions::default()).unwrap();
    assert!(!baseline.is_empty());

    for threads in [1, num_cpus::get().max(1)] {
        for chunk in [1, 64, 4096, 1 << 20] {
            matcher.set_threads(threads).unwrap();
            matcher.set_chunk_size(chunk).unwrap();
            let run = matcher.find(&haystack, &MatchOptions::default()).unwrap();
            assert_eq!(run, baseline, "threads={threads} chunk={chunk}");
        }
    }
}

#[test]
fn result_order_is_canonical_and_duplicate_free() {
    let mut rng = Rng(0xDEAD_BEEF_0004);
    let patterns = random_patterns(&mut rng, 50, 1, 8);
    let haystack: Vec<u8> = (0..64 * 1024)
        .map(|_| b'a' + (rng.next() % 3) as u8)
        .collect();

    let (_dir, matcher) = compile(&patterns);
    let found = matcher.find(&haystack, &MatchOptions::default()).unwrap();

    let mut seen = HashSet::new();
    for pair in found.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.len > b.len || (a.len == b.len && a.offset <= b.offset),
            "order violated: ({},{}) before ({},{})",
            a.offset,
            a.len,
            b.offset,
            b.len
        );
    }
    for m in &found {
        assert!(seen.insert((m.offset, m.len)), "duplicate match emitted");
    }
}

#[test]
fn longest_only_is_idempotent_and_unique_per_offset() {
    let mut rng = Rng(0xDEAD_BEEF_0005);
    let patterns = random_patterns(&mut rng, 60, 1, 10);
    let haystack: Vec<u8> = (0..32 * 1024)
        .map(|_| b'a' + (rng.next() % 3) as u8)
        .collect();

    let (_dir, matcher) = compile(&patterns);
    let opts = MatchOptions {
        longest_only: true,
        ..MatchOptions::default()
    };
    let found = matcher.find(&haystack, &opts).unwrap();

    let mut offsets = HashSet::new();
    for m in &found {
        assert!(offsets.insert(m.offset), "two matches share an offset");
    }
}

#[test]
fn no_overlap_never_overlaps() {
    let mut rng = Rng(0xDEAD_BEEF_0006);
    let patterns = random_patterns(&mut rng, 60, 1, 10);
    let haystack: Vec<u8> = (0..32 * 1024)
        .map(|_| b'a' + (rng.next() % 3) as u8)
        .collect();

    let (_dir, matcher) = compile(&patterns);
    let opts = MatchOptions {
        no_overlap: true,
        ..MatchOptions::default()
    };
    let found = matcher.find(&haystack, &opts).unwrap();
    assert!(!found.is_empty());

    for pair in found.windows(2) {
        assert!(
            pair[1].offset >= pair[0].offset + pair[0].len as usize,
            "overlap between ({},{}) and ({},{})",
            pair[0].offset,
            pair[0].len,
            pair[1].offset,
            pair[1].len
        );
    }
}
