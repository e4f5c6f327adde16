//! Seeded randomized checks of the substitution engine and the enumerator.

use binstr_core::scanner::{available_room, MatchMode, Replacement, ScanOutcome};
use binstr_core::strings::entries;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const ROUNDS: usize = 500;

/// A table of short strings over a tiny alphabet, so that patterns match
/// often, separated by one to four zero bytes. Sometimes the last string is
/// left unterminated.
fn random_table(rng: &mut SmallRng) -> Vec<u8> {
    let mut table = Vec::new();
    if rng.random_bool(0.2) {
        table.push(0);
    }
    for _ in 0..rng.random_range(0..12) {
        for _ in 0..rng.random_range(1..8) {
            table.push(b"abc"[rng.random_range(0..3)]);
        }
        for _ in 0..rng.random_range(1..5) {
            table.push(0);
        }
    }
    if rng.random_bool(0.1) {
        table.extend_from_slice(b"ab");
    }
    table
}

fn random_word(rng: &mut SmallRng, len: std::ops::Range<usize>) -> Vec<u8> {
    (0..rng.random_range(len))
        .map(|_| b"abcx"[rng.random_range(0..4)])
        .collect()
}

fn starts(table: &[u8]) -> Vec<u64> {
    entries(table, 0).map(|e| e.offset).collect()
}

#[test]
fn table_length_never_changes() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..ROUNDS {
        let mut table = random_table(&mut rng);
        let len = table.len();
        let search = random_word(&mut rng, 1..4);
        let replace = random_word(&mut rng, 0..6);
        let mode = if rng.random_bool(0.5) {
            MatchMode::Exact
        } else {
            MatchMode::Substring
        };
        Replacement::new(search, replace, mode)
            .unwrap()
            .apply(&mut table);
        assert_eq!(table.len(), len);
    }
}

#[test]
fn strings_never_move_or_merge() {
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..ROUNDS {
        let mut table = random_table(&mut rng);
        let before = starts(&table);
        let replacement = Replacement::new(
            random_word(&mut rng, 1..4),
            random_word(&mut rng, 1..8),
            MatchMode::Substring,
        )
        .unwrap();
        replacement.apply(&mut table);

        // A rewritten string keeps its start and stays clear of its neighbour,
        // so no new start can appear.
        let after = starts(&table);
        assert_eq!(after, before, "table {table:?}");
    }
}

#[test]
fn replacing_with_shorter_text_is_idempotent() {
    let mut rng = SmallRng::seed_from_u64(23);
    let replacement = Replacement::new("ab", "x", MatchMode::Substring).unwrap();
    for _ in 0..ROUNDS {
        let mut table = random_table(&mut rng);
        let had_match = table.windows(2).any(|w| w == b"ab");

        let first = replacement.apply(&mut table);
        let expected = if had_match {
            ScanOutcome::Replaced
        } else {
            ScanOutcome::NotFound
        };
        assert_eq!(first.outcome, expected);

        let snapshot = table.clone();
        let second = replacement.apply(&mut table);
        assert_eq!(second.outcome, ScanOutcome::NotFound);
        assert_eq!(table, snapshot);
    }
}

#[test]
fn enumeration_covers_every_non_zero_byte() {
    let mut rng = SmallRng::seed_from_u64(31);
    for _ in 0..ROUNDS {
        let table = random_table(&mut rng);
        let base = rng.random_range(0..0x10000u64);

        let mut covered = vec![false; table.len()];
        let mut last_end = 0;
        for entry in entries(&table, base) {
            let start = (entry.offset - base) as usize;
            assert!(start >= last_end, "entries out of order");
            assert!(start == 0 || table[start - 1] == 0);
            let end = start + entry.len();
            assert!(end == table.len() || table[end] == 0);
            assert!(entry.bytes.iter().all(|&b| b != 0));
            covered[start..end].fill(true);
            last_end = end;
        }
        for (i, &b) in table.iter().enumerate() {
            assert_eq!(covered[i], b != 0, "byte {i} of {table:?}");
        }
    }
}

#[test]
fn exact_mode_only_touches_equal_strings() {
    let mut rng = SmallRng::seed_from_u64(47);
    for _ in 0..ROUNDS {
        let original = random_table(&mut rng);
        let search = random_word(&mut rng, 1..4);
        let replace = random_word(&mut rng, 1..6);
        let mut table = original.clone();
        Replacement::new(search.clone(), replace.clone(), MatchMode::Exact)
            .unwrap()
            .apply(&mut table);

        for entry in entries(&original, 0) {
            let start = entry.offset as usize;
            let end = start + entry.len();
            let terminated = end < original.len();
            let room = available_room(&original, start, end);
            let rewritten =
                entry.bytes == search.as_slice() && terminated && replace.len() <= room;

            let now = &table[start..start + room.max(entry.len())];
            if rewritten {
                assert_eq!(&now[..replace.len()], replace.as_slice());
                assert!(now[replace.len()..].iter().all(|&b| b == 0));
            } else {
                assert_eq!(&now[..entry.len()], entry.bytes, "table {original:?}");
            }
        }
    }
}
