//! In-place substitution inside a table of NUL-terminated strings.
//!
//! A string may shrink or keep its length, never grow past the room it
//! already owns: its own bytes plus the zero padding that follows it, minus
//! one byte kept as the terminator. Freed bytes are zero-filled so the table
//! keeps its exact length and every neighbouring string keeps its offset.
//!
//! # Usage
//! ```
//! use binstr_core::scanner::{substitute, MatchMode, ScanOutcome};
//!
//! let mut table = *b"hello\0world\0\0\0";
//! let result = substitute(&mut table, b"hello", b"hi", MatchMode::Substring).unwrap();
//! assert_eq!(result.outcome, ScanOutcome::Replaced);
//! assert_eq!(&table, b"hi\0\0\0\0world\0\0\0");
//! ```

use crate::strings::next_run;
use binstr_utils::errors::ScanError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How a search pattern has to relate to a string for it to be rewritten.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every occurrence of the pattern anywhere in a string is replaced.
    #[default]
    Substring,
    /// A string is replaced only when it is exactly the pattern.
    Exact,
}

/// Overall result of a substitution pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// At least one string was rewritten and none was refused.
    Replaced,
    /// No string matched.
    NotFound,
    /// At least one matching string had too little room for its replacement.
    DoesNotFit,
}

/// Summary of a substitution pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub outcome: ScanOutcome,
    /// Strings that were rewritten.
    pub replaced: usize,
    /// Matching strings left untouched because the result would not fit.
    pub rejected: usize,
}

impl Substitution {
    const fn new(replaced: usize, rejected: usize) -> Self {
        let outcome = if rejected > 0 {
            ScanOutcome::DoesNotFit
        } else if replaced > 0 {
            ScanOutcome::Replaced
        } else {
            ScanOutcome::NotFound
        };
        Self {
            outcome,
            replaced,
            rejected,
        }
    }
}

/// A validated search/replace request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub search: Vec<u8>,
    pub replace: Vec<u8>,
    pub mode: MatchMode,
}

impl Replacement {
    /// Checks that `search` is non-empty and that neither pattern holds a NUL,
    /// which would split a string in two.
    pub fn new(
        search: impl Into<Vec<u8>>,
        replace: impl Into<Vec<u8>>,
        mode: MatchMode,
    ) -> Result<Self, ScanError> {
        let search = search.into();
        let replace = replace.into();
        if search.is_empty() {
            return Err(ScanError::EmptySearch);
        }
        if let Some(at) = search.iter().chain(&replace).position(|&b| b == 0) {
            return Err(ScanError::NulInPattern(at));
        }
        Ok(Self {
            search,
            replace,
            mode,
        })
    }

    /// Rewrites `table` in place. Its length never changes.
    pub fn apply(&self, table: &mut [u8]) -> Substitution {
        let len = table.len();
        let result = match self.mode {
            MatchMode::Substring => replace_substrings(table, &self.search, &self.replace),
            MatchMode::Exact => replace_exact(table, &self.search, &self.replace),
        };
        debug_assert_eq!(table.len(), len);
        result
    }
}

/// Validates the patterns and runs one substitution pass over `table`.
pub fn substitute(
    table: &mut [u8],
    search: &[u8],
    replace: &[u8],
    mode: MatchMode,
) -> Result<Substitution, ScanError> {
    Ok(Replacement::new(search, replace, mode)?.apply(table))
}

/// Bytes a string starting at `start` and ending (exclusive) at `end` may
/// occupy: up to, but not including, the byte before the next string.
/// A string touching the end of the table gets everything but the last byte.
///
/// # Panics
/// If `start..end` is not a non-empty range inside `table`.
pub fn available_room(table: &[u8], start: usize, end: usize) -> usize {
    let next = table[end..]
        .iter()
        .position(|&b| b != 0)
        .map_or(table.len(), |gap| end + gap);
    next - start - 1
}

/// Start offsets of the non-overlapping occurrences of `needle`, left to right.
fn occurrences(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            hits.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    hits
}

fn replace_substrings(table: &mut [u8], search: &[u8], replace: &[u8]) -> Substitution {
    let (mut replaced, mut rejected) = (0, 0);
    let mut scratch = Vec::new();
    let mut pos = 0;

    while let Some(run) = next_run(table, pos) {
        pos = run.end;
        let hits = occurrences(&table[run.clone()], search);
        if hits.is_empty() {
            continue;
        }

        let current = run.len();
        let new_len = current - hits.len() * search.len() + hits.len() * replace.len();
        let available = available_room(table, run.start, run.end);
        if new_len > available {
            warn!(
                offset = run.start,
                needed = new_len,
                available,
                "replacement does not fit"
            );
            rejected += 1;
            continue;
        }

        scratch.clear();
        let mut cursor = run.start;
        for hit in hits {
            scratch.extend_from_slice(&table[cursor..run.start + hit]);
            scratch.extend_from_slice(replace);
            cursor = run.start + hit + search.len();
        }
        scratch.extend_from_slice(&table[cursor..run.end]);

        // An unterminated string at the end of the table owns its last byte too.
        let fill_end = run.start + available.max(current);
        table[run.start..run.start + new_len].copy_from_slice(&scratch);
        table[run.start + new_len..fill_end].fill(0);
        debug!(offset = run.start, old_len = current, new_len, "rewrote string");

        replaced += 1;
        pos = fill_end;
    }

    Substitution::new(replaced, rejected)
}

fn replace_exact(table: &mut [u8], search: &[u8], replace: &[u8]) -> Substitution {
    let (mut replaced, mut rejected) = (0, 0);
    let mut pos = 0;

    while let Some(run) = next_run(table, pos) {
        pos = run.end;
        // The terminating NUL is part of the match.
        if run.end == table.len() || &table[run.clone()] != search {
            continue;
        }

        let available = available_room(table, run.start, run.end);
        if replace.len() > available {
            warn!(
                offset = run.start,
                needed = replace.len(),
                available,
                "replacement does not fit"
            );
            rejected += 1;
            continue;
        }

        let end = run.start + replace.len();
        table[run.start..end].copy_from_slice(replace);
        table[end..run.start + available].fill(0);
        debug!(offset = run.start, new_len = replace.len(), "rewrote string");

        replaced += 1;
        pos = run.start + available;
    }

    Substitution::new(replaced, rejected)
}
