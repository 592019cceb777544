// Normalising-transform behaviour through the full compile/scan pipeline,
// including matches that straddle the 4 MiB normalised-window edge.

use litmatch::transform::TransformTable;
use litmatch::{compile_patterns, MatchOptions, Matcher, TransformFlags};

const WINDOW: usize = 4 * 1024 * 1024;

fn compile(patterns: &str, flags: TransformFlags) -> (tempfile::TempDir, Matcher) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transform.idx");
    compile_patterns(&path, patterns.as_bytes(), flags).unwrap();
    let matcher = Matcher::open(&path).unwrap();
    (dir, matcher)
}

fn offsets(matcher: &Matcher, haystack: &[u8]) -> Vec<(usize, u32)> {
    matcher
        .find(haystack, &MatchOptions::default())
        .unwrap()
        .iter()
        .map(|m| (m.offset, m.len))
        .collect()
}

#[test]
fn case_and_punctuation_combine() {
    let flags = TransformFlags {
        ignore_case: true,
        ignore_punctuation: true,
        elide_whitespace: false,
    };
    let (_dir, m) = compile("dont\n", flags);
    // Canonical order sorts on the remapped (original-span) lengths.
    assert_eq!(
        offsets(&m, b"Don't DONT d.o.n.t"),
        vec![(11, 7), (0, 5), (6, 4)]
    );
}

#[test]
fn equivalent_patterns_deduplicate_under_transform() {
    let flags = TransformFlags {
        ignore_case: true,
        ..TransformFlags::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dedup.idx");
    let stats = compile_patterns(&path, b"hello\nHELLO\nHeLLo\n", flags).unwrap();
    assert_eq!(stats.stored_pattern_count, 1);
    assert_eq!(stats.duplicate_patterns, 2);
}

#[test]
fn reported_spans_normalise_back_to_the_pattern() {
    // Testable property: normalising a reported span reproduces the
    // normalised pattern.
    let flags = TransformFlags {
        ignore_case: true,
        ignore_punctuation: false,
        elide_whitespace: true,
    };
    let (_dir, m) = compile("foo bar\n", flags);
    let haystack = b"FOO\t\tbar and foo      BAR";
    let table = TransformTable::new(flags);

    let found = m.find(haystack, &MatchOptions::default()).unwrap();
    assert_eq!(found.len(), 2);
    for mt in &found {
        let mut norm = Vec::new();
        table.apply(mt.bytes, &mut norm, None);
        assert_eq!(norm, b"FOO BAR");
    }
}

#[test]
fn identity_transform_matches_across_window_edge() {
    // Case folding maps offsets 1:1; plant matches just before, exactly on,
    // and after the window boundary so the lookahead and the window claim
    // logic are both exercised.
    let flags = TransformFlags {
        ignore_case: true,
        ..TransformFlags::default()
    };
    let (_dir, m) = compile("boundarypattern\n", flags);

    let mut haystack = vec![b'x'; WINDOW + 4096];
    // Straddling the edge, starting just past it, and well inside the
    // second window; the first two plants are adjacent but disjoint.
    let plants = [WINDOW - 7, WINDOW + 8, WINDOW + 1000];
    for &at in &plants {
        haystack[at..at + 15].copy_from_slice(b"BoundaryPattern");
    }

    let found = offsets(&m, &haystack);
    assert_eq!(
        found,
        plants.iter().map(|&at| (at, 15)).collect::<Vec<_>>()
    );
}

#[test]
fn shrinking_transform_matches_across_window_edge() {
    // With whitespace elision the normalised stream is shorter than the
    // source, so the window edge falls at an unaligned source offset. The
    // filler alphabet shares no bytes with the pattern, making the planted
    // occurrences the only possible matches.
    let flags = TransformFlags {
        elide_whitespace: true,
        ..TransformFlags::default()
    };
    let (_dir, m) = compile("foo bar\n", flags);

    // "aa  " normalises to "aa " (4 → 3 bytes); ~5.8 MB of source crosses
    // the 4 MiB normalised boundary. Planting "foo   bar" over nine filler
    // bytes keeps the normalised length unchanged (both reduce to 7 bytes),
    // so a filler-phase offset s lands at normalised offset 3·s/4.
    let mut haystack = b"aa  ".repeat(1_450_000);
    let mut plants = Vec::new();
    let mut at = 100_000;
    while at < haystack.len() - 16 {
        haystack[at..at + 9].copy_from_slice(b"foo   bar");
        plants.push(at);
        at += 600_000;
    }
    // One plant whose normalised span crosses the window edge exactly:
    // 3 · 5_592_400 / 4 = 4_194_300, four bytes shy of the 4 MiB boundary.
    let straddle = 5_592_400;
    haystack[straddle..straddle + 9].copy_from_slice(b"foo   bar");
    plants.push(straddle);

    let found = offsets(&m, &haystack);
    assert_eq!(
        found,
        plants.iter().map(|&p| (p, 9)).collect::<Vec<_>>()
    );
}

#[test]
fn transform_haystack_smaller_than_window_is_fine() {
    let flags = TransformFlags {
        elide_whitespace: true,
        ..TransformFlags::default()
    };
    let (_dir, m) = compile("a b\n", flags);
    assert_eq!(offsets(&m, b"a    b"), vec![(0, 6)]);
    assert_eq!(offsets(&m, b""), vec![]);
}
