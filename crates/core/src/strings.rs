//! Splitting a string table into its NUL-delimited strings.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};
use std::ops::Range;

/// Range of the next maximal run of non-zero bytes at or after `from`.
pub fn next_run(buffer: &[u8], from: usize) -> Option<Range<usize>> {
    let tail = buffer.get(from..)?;
    let start = from + tail.iter().position(|&b| b != 0)?;
    let end = buffer[start..]
        .iter()
        .position(|&b| b == 0)
        .map_or(buffer.len(), |len| start + len);
    Some(start..end)
}

/// One string found in a section, with its absolute file offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringEntry<'a> {
    pub offset: u64,
    pub bytes: &'a [u8],
}

impl<'a> StringEntry<'a> {
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The string as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.bytes)
    }

    /// Writes `OFFSET:bytes` followed by a newline, passing the bytes through
    /// untouched even when they are not printable.
    pub fn write_line<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{:08X}:", self.offset)?;
        out.write_all(self.bytes)?;
        out.write_all(b"\n")
    }
}

impl fmt::Display for StringEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}:{}", self.offset, self.text())
    }
}

impl Serialize for StringEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entry = serializer.serialize_struct("StringEntry", 3)?;
        entry.serialize_field("offset", &self.offset)?;
        entry.serialize_field("length", &self.len())?;
        entry.serialize_field("text", &self.text())?;
        entry.end()
    }
}

/// Iterator over the non-empty strings of a buffer, in ascending offset order.
#[derive(Debug, Clone)]
pub struct Strings<'a> {
    buffer: &'a [u8],
    base: u64,
    pos: usize,
}

impl<'a> Iterator for Strings<'a> {
    type Item = StringEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let run = next_run(self.buffer, self.pos)?;
        self.pos = run.end;
        Some(StringEntry {
            offset: self.base + run.start as u64,
            bytes: &self.buffer[run],
        })
    }
}

/// Lists every non-empty string in `buffer`; `base` is the buffer's file offset.
pub const fn entries(buffer: &[u8], base: u64) -> Strings<'_> {
    Strings {
        buffer,
        base,
        pos: 0,
    }
}
