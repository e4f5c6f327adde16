//! Locates a named section in a PE executable through the COFF section table.
//!
//! PE section headers are fixed 40-byte records whose size and pointer fields
//! are always 32-bit little-endian, so no word width or byte order has to be
//! discovered first. All seeks are absolute.

use crate::section::{LocatedSection, SectionLocation};
use crate::word::FormatAttributes;
use binstr_utils::errors::LocateError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Section searched when the caller does not name one.
pub const DEFAULT_SECTION: &str = ".rdata";

/// DOS header magic.
pub const MAGIC: [u8; 2] = *b"MZ";

/// Expected bytes at `e_lfanew`.
pub const SIGNATURE: [u8; 4] = *b"PE\0\0";

/// Offset of `e_lfanew` in the DOS header.
const HEADER_POINTER_AT: u64 = 0x3c;

/// Size of one section table record.
const SECTION_ENTRY_SIZE: u64 = 40;

/// Size of the signature plus the COFF file header.
const HEADERS_SIZE: u64 = 24;

/// Length of the fixed-width section name.
const NAME_LEN: usize = 8;

/// COFF header fields needed to reach the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoffHeader {
    /// Absolute offset of the `PE\0\0` signature.
    pub offset: u64,
    pub section_count: u16,
    pub optional_header_size: u16,
}

impl CoffHeader {
    /// Absolute offset of the first section table record.
    pub fn section_table(&self) -> u64 {
        self.offset + HEADERS_SIZE + u64::from(self.optional_header_size)
    }
}

/// Follows `e_lfanew`, checks the signature and reads the COFF header.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<CoffHeader, LocateError> {
    reader
        .seek(SeekFrom::Start(HEADER_POINTER_AT))
        .map_err(LocateError::HeaderRead)?;
    let offset = u64::from(
        reader
            .read_u32::<LittleEndian>()
            .map_err(LocateError::HeaderRead)?,
    );

    reader
        .seek(SeekFrom::Start(offset))
        .map_err(LocateError::HeaderRead)?;
    let mut signature = [0u8; 4];
    reader
        .read_exact(&mut signature)
        .map_err(LocateError::HeaderRead)?;
    if signature != SIGNATURE {
        return Err(LocateError::BadSignature(signature));
    }

    // Machine, then NumberOfSections.
    reader
        .seek(SeekFrom::Current(2))
        .map_err(LocateError::HeaderRead)?;
    let section_count = reader
        .read_u16::<LittleEndian>()
        .map_err(LocateError::HeaderRead)?;

    // TimeDateStamp, PointerToSymbolTable, NumberOfSymbols.
    reader
        .seek(SeekFrom::Current(12))
        .map_err(LocateError::HeaderRead)?;
    let optional_header_size = reader
        .read_u16::<LittleEndian>()
        .map_err(LocateError::HeaderRead)?;

    let header = CoffHeader {
        offset,
        section_count,
        optional_header_size,
    };
    debug!(?header, "parsed PE header");
    Ok(header)
}

/// Compares a fixed-width section name the way `strncmp(target, name, 8)` does:
/// only the first eight bytes of `target` count and comparison stops at the
/// first NUL present in both.
pub fn name_matches(name: &[u8; NAME_LEN], target: &[u8]) -> bool {
    for (i, &have) in name.iter().enumerate() {
        let want = target.get(i).copied().unwrap_or(0);
        if have != want {
            return false;
        }
        if want == 0 {
            return true;
        }
    }
    true
}

/// Finds the section called `section` and returns its raw-data range.
pub fn locate_section<R: Read + Seek>(
    reader: &mut R,
    section: &str,
) -> Result<LocatedSection, LocateError> {
    let header = read_header(reader)?;
    let table = header.section_table();

    let mut location = SectionLocation::NOT_FOUND;
    for index in 0..u64::from(header.section_count) {
        let entry = table + index * SECTION_ENTRY_SIZE;
        reader
            .seek(SeekFrom::Start(entry))
            .map_err(LocateError::SectionIterate)?;
        let mut name = [0u8; NAME_LEN];
        reader
            .read_exact(&mut name)
            .map_err(LocateError::SectionIterate)?;
        if !name_matches(&name, section.as_bytes()) {
            continue;
        }

        // VirtualSize, VirtualAddress, then SizeOfRawData and PointerToRawData.
        reader
            .seek(SeekFrom::Current(8))
            .map_err(LocateError::SectionIterate)?;
        let length = reader
            .read_u32::<LittleEndian>()
            .map_err(LocateError::SectionIterate)?;
        let offset = reader
            .read_u32::<LittleEndian>()
            .map_err(LocateError::SectionIterate)?;
        location = SectionLocation::new(offset.into(), length.into());
        debug!(index, section, ?location, "matched section header");
        break;
    }

    if !location.is_found() {
        return Err(LocateError::SectionNotFound(section.to_string()));
    }
    Ok(LocatedSection {
        location,
        attributes: FormatAttributes::PE,
    })
}
