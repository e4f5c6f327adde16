//! Locates a named section in an ELF executable by walking its section header
//! table and resolving names through `.shstrtab`.
//!
//! The reader is expected to sit just past the 4-byte `\x7fELF` magic, which
//! is where [`crate::format::ExecutableFormat::detect`] leaves it. Header
//! fields are reached by relative skips from there, and section entries by
//! absolute seeks from `e_shoff`.

use crate::section::{LocatedSection, SectionLocation};
use crate::word::{FormatAttributes, WordWidth};
use binstr_utils::errors::LocateError;
use byteorder::ReadBytesExt;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Section searched when the caller does not name one.
pub const DEFAULT_SECTION: &str = ".rodata";

/// The four identification bytes every ELF file starts with.
pub const MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Bytes between the end of `e_ident[EI_DATA]` and `e_shoff`.
const fn shoff_skip(width: WordWidth) -> i64 {
    match width {
        WordWidth::Narrow => 26,
        WordWidth::Wide => 34,
    }
}

/// Bytes between the end of `e_shoff` and `e_shentsize`.
const SHENTSIZE_SKIP: i64 = 10;

/// Offset of `sh_offset` inside a section header.
const fn sh_offset_at(width: WordWidth) -> u64 {
    match width {
        WordWidth::Narrow => 16,
        WordWidth::Wide => 24,
    }
}

/// Header fields needed to walk the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTable {
    pub offset: u64,
    pub entry_size: u16,
    pub entry_count: u16,
    pub names_index: u16,
}

impl SectionTable {
    fn entry(&self, index: u16) -> Result<u64, LocateError> {
        u64::from(index)
            .checked_mul(u64::from(self.entry_size))
            .and_then(|rel| rel.checked_add(self.offset))
            .ok_or_else(|| {
                LocateError::SectionTableSeek(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "section header offset overflows",
                ))
            })
    }
}

/// Reads class/data identification bytes and the section table fields.
pub fn read_header<R: Read + Seek>(
    reader: &mut R,
) -> Result<(FormatAttributes, SectionTable), LocateError> {
    let class = reader.read_u8().map_err(LocateError::HeaderRead)?;
    let data = reader.read_u8().map_err(LocateError::HeaderRead)?;
    let attrs = FormatAttributes::from_elf_ident(class, data);

    reader
        .seek(SeekFrom::Current(shoff_skip(attrs.word_width)))
        .map_err(LocateError::HeaderRead)?;
    let offset = attrs
        .read_word(reader)
        .map_err(LocateError::HeaderRead)?
        .to_offset();

    reader
        .seek(SeekFrom::Current(SHENTSIZE_SKIP))
        .map_err(LocateError::HeaderRead)?;
    let entry_size = attrs
        .endianness
        .read_u16(reader)
        .map_err(LocateError::HeaderRead)?;
    let entry_count = attrs
        .endianness
        .read_u16(reader)
        .map_err(LocateError::HeaderRead)?;
    let names_index = attrs
        .endianness
        .read_u16(reader)
        .map_err(LocateError::HeaderRead)?;

    let table = SectionTable {
        offset,
        entry_size,
        entry_count,
        names_index,
    };
    debug!(class, data, ?attrs, ?table, "parsed ELF header");
    Ok((attrs, table))
}

/// Reads the `sh_offset`/`sh_size` pair of the header starting at `entry`.
fn read_span<R: Read + Seek>(
    reader: &mut R,
    attrs: FormatAttributes,
    entry: u64,
) -> std::io::Result<SectionLocation> {
    let at = entry
        .checked_add(sh_offset_at(attrs.word_width))
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "section header offset overflows",
            )
        })?;
    reader.seek(SeekFrom::Start(at))?;
    let offset = attrs.read_word(reader)?.to_offset();
    let length = attrs.read_word(reader)?.to_offset();
    Ok(SectionLocation::new(offset, length))
}

/// Loads the section names table into memory.
///
/// Its location comes from the `sh_offset`/`sh_size` fields of the header
/// selected by `e_shstrndx`.
fn read_names<R: Read + Seek>(
    reader: &mut R,
    attrs: FormatAttributes,
    table: &SectionTable,
) -> Result<Vec<u8>, LocateError> {
    let header = table.entry(table.names_index)?;
    let span = read_span(reader, attrs, header).map_err(LocateError::SectionTableSeek)?;
    debug!(?span, "section names table");

    reader
        .seek(SeekFrom::Start(span.offset))
        .map_err(LocateError::SectionTableSeek)?;

    let len = usize::try_from(span.length)
        .map_err(|_| LocateError::NameTableAlloc { len: span.length })?;
    let mut names = Vec::new();
    names
        .try_reserve_exact(len)
        .map_err(|_| LocateError::NameTableAlloc { len: span.length })?;
    names.resize(len, 0);
    reader
        .read_exact(&mut names)
        .map_err(LocateError::NameTableRead)?;
    Ok(names)
}

/// NUL-terminated name at `index` inside the names table, if the index is in range.
fn name_at(names: &[u8], index: u32) -> Option<&[u8]> {
    let tail = names.get(usize::try_from(index).ok()?..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Some(&tail[..end])
}

/// Finds the section called `section` and returns its file range.
///
/// Names are compared byte-for-byte and case-sensitively. Running out of
/// entries, or matching a header whose offset or size is zero, yields
/// [`LocateError::SectionNotFound`].
pub fn locate_section<R: Read + Seek>(
    reader: &mut R,
    section: &str,
) -> Result<LocatedSection, LocateError> {
    let (attrs, table) = read_header(reader)?;
    let names = read_names(reader, attrs, &table)?;

    let mut location = SectionLocation::NOT_FOUND;
    for index in 0..table.entry_count {
        let entry = table.entry(index)?;
        reader
            .seek(SeekFrom::Start(entry))
            .map_err(LocateError::SectionIterate)?;
        let name_index = attrs
            .endianness
            .read_u32(reader)
            .map_err(LocateError::SectionIterate)?;

        if name_at(&names, name_index) == Some(section.as_bytes()) {
            location = read_span(reader, attrs, entry).map_err(LocateError::SectionIterate)?;
            debug!(index, section, ?location, "matched section header");
            break;
        }
    }

    if !location.is_found() {
        return Err(LocateError::SectionNotFound(section.to_string()));
    }
    Ok(LocatedSection {
        location,
        attributes: attrs,
    })
}
