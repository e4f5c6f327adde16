//! Executable format detection by magic number.

use crate::section::LocatedSection;
use crate::{elf, pe};
use binstr_utils::errors::{LocateError, PatchError};
use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

/// Executable formats whose section tables can be walked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ExecutableFormat {
    Elf,
    Pe,
}

impl ExecutableFormat {
    /// Reads up to four bytes and classifies them.
    ///
    /// Leaves the reader just past the bytes read.
    pub fn detect<R: Read>(reader: &mut R) -> Result<Self, PatchError> {
        let mut magic = Vec::with_capacity(elf::MAGIC.len());
        reader
            .take(elf::MAGIC.len() as u64)
            .read_to_end(&mut magic)
            .map_err(|e| PatchError::Locate(LocateError::HeaderRead(e)))?;
        Self::from_magic(&magic).ok_or(PatchError::UnrecognizedFormat(magic))
    }

    /// Classifies the leading bytes of a file.
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(&elf::MAGIC) {
            Some(ExecutableFormat::Elf)
        } else if magic.starts_with(&pe::MAGIC) {
            Some(ExecutableFormat::Pe)
        } else {
            None
        }
    }

    /// Section used when the caller does not name one.
    pub const fn default_section(self) -> &'static str {
        match self {
            ExecutableFormat::Elf => elf::DEFAULT_SECTION,
            ExecutableFormat::Pe => pe::DEFAULT_SECTION,
        }
    }

    /// Runs this format's navigator from wherever the reader currently is.
    pub fn locate<R: Read + Seek>(
        self,
        reader: &mut R,
        section: &str,
    ) -> Result<LocatedSection, LocateError> {
        match self {
            ExecutableFormat::Elf => {
                reader
                    .seek(SeekFrom::Start(elf::MAGIC.len() as u64))
                    .map_err(LocateError::HeaderRead)?;
                elf::locate_section(reader, section)
            }
            ExecutableFormat::Pe => pe::locate_section(reader, section),
        }
    }
}

impl fmt::Display for ExecutableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutableFormat::Elf => f.write_str("ELF"),
            ExecutableFormat::Pe => f.write_str("PE"),
        }
    }
}
