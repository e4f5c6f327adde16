use binstr_core::fixtures::ElfBuilder;
use binstr_core::scanner::{substitute, MatchMode, Replacement, ScanOutcome};
use binstr_core::word::{Endianness, WordWidth};
use binstr_core::{replace_file, run, PatchConfig, RunOutput};
use binstr_utils::errors::PatchError;
use std::fs;
use tempfile::TempDir;

const TABLE: &[u8; 14] = b"hello\0world\0\0\0";

fn patch(search: &str, replace: &str, mode: MatchMode) -> ([u8; 14], ScanOutcome) {
    let mut table = *TABLE;
    let result = substitute(&mut table, search.as_bytes(), replace.as_bytes(), mode).unwrap();
    (table, result.outcome)
}

#[test]
fn shrinking_a_string_zero_fills_its_tail() {
    let (table, outcome) = patch("hello", "hi", MatchMode::Substring);
    assert_eq!(outcome, ScanOutcome::Replaced);
    assert_eq!(&table, b"hi\0\0\0\0world\0\0\0");
}

#[test]
fn exact_match_of_an_equal_length_string() {
    let (table, outcome) = patch("world", "globe", MatchMode::Exact);
    assert_eq!(outcome, ScanOutcome::Replaced);
    assert_eq!(&table, b"hello\0globe\0\0\0");
}

#[test]
fn missing_pattern_leaves_the_table_alone() {
    let (table, outcome) = patch("x", "y", MatchMode::Substring);
    assert_eq!(outcome, ScanOutcome::NotFound);
    assert_eq!(&table, TABLE);
}

#[test]
fn growing_past_the_padding_is_refused() {
    let (table, outcome) = patch("hello", "greetings", MatchMode::Substring);
    assert_eq!(outcome, ScanOutcome::DoesNotFit);
    assert_eq!(&table, TABLE);
}

#[test]
fn growing_into_the_padding_is_allowed() {
    // "world" owns its 5 bytes plus two of the three padding bytes.
    let (table, outcome) = patch("world", "worlds!", MatchMode::Substring);
    assert_eq!(outcome, ScanOutcome::Replaced);
    assert_eq!(&table, b"hello\0worlds!\0");

    let (_, outcome) = patch("world", "worlds!!", MatchMode::Substring);
    assert_eq!(outcome, ScanOutcome::DoesNotFit);
}

#[test]
fn exact_mode_ignores_substrings() {
    let (table, outcome) = patch("hell", "HELL", MatchMode::Exact);
    assert_eq!(outcome, ScanOutcome::NotFound);
    assert_eq!(&table, TABLE);
}

#[test]
fn scenarios_through_files() {
    crate::init_tracing();
    let dir = TempDir::new().unwrap();
    let image = ElfBuilder::new(WordWidth::Wide, Endianness::Little)
        .section(".rodata", TABLE)
        .build();
    let loc = image.location(".rodata");
    let section = |bytes: &[u8]| bytes[loc.offset as usize..loc.end() as usize].to_vec();

    let path = dir.path().join("a.out");
    let cases: [(&str, &str, bool, Result<&[u8], i32>); 4] = [
        ("hello", "hi", false, Ok(&b"hi\0\0\0\0world\0\0\0"[..])),
        ("world", "globe", true, Ok(&b"hello\0globe\0\0\0"[..])),
        ("x", "y", false, Err(1)),
        ("hello", "greetings", false, Err(2)),
    ];

    for (search, replace, exact, expected) in cases {
        fs::write(&path, &image.bytes).unwrap();
        let config = PatchConfig::replacing(&path, search, replace).exact(exact);
        let RunOutput::Replaced(report) = run(&config).unwrap() else {
            panic!("expected a replace report");
        };
        let patched = section(&fs::read(&path).unwrap());
        match expected {
            Ok(bytes) => {
                assert!(report.ensure_complete().is_ok(), "{search}");
                assert_eq!(patched, bytes, "{search}");
            }
            Err(code) => {
                let err = report.ensure_complete().unwrap_err();
                assert_eq!(err.exit_code(), code, "{search}");
                assert_eq!(patched, TABLE, "{search}");
            }
        }
    }
}

#[test]
fn rejected_runs_win_over_replaced_ones() {
    let dir = TempDir::new().unwrap();
    let image = ElfBuilder::new(WordWidth::Narrow, Endianness::Little)
        .section(".rodata", b"ab\0\0\0\0ab\0x\0")
        .build();
    let path = dir.path().join("a.out");
    fs::write(&path, &image.bytes).unwrap();

    let replacement = Replacement::new("ab", "abcd", MatchMode::Substring).unwrap();
    let report = replace_file(&path, None, None, &replacement).unwrap();
    assert_eq!(report.outcome, ScanOutcome::DoesNotFit);
    assert_eq!((report.replaced, report.rejected), (1, 1));
    assert!(matches!(
        report.ensure_complete(),
        Err(PatchError::ReplacementDoesNotFit)
    ));

    // The string that did fit was still written back.
    let loc = image.location(".rodata");
    let bytes = fs::read(&path).unwrap();
    assert_eq!(
        &bytes[loc.offset as usize..loc.end() as usize],
        b"abcd\0\0ab\0x\0"
    );
}
