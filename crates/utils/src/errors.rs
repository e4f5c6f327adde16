use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while walking an executable's header chain to find a section.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The fixed executable header could not be read.
    #[error("failed to read executable header: {0}")]
    HeaderRead(#[source] io::Error),
    /// Seeking to the section header table (or the names table) failed.
    #[error("failed to go to the section headers table: {0}")]
    SectionTableSeek(#[source] io::Error),
    /// The section names table could not be allocated.
    #[error("failed to allocate {len} bytes for section names")]
    NameTableAlloc { len: u64 },
    /// The section names table could not be read.
    #[error("failed to read the section names: {0}")]
    NameTableRead(#[source] io::Error),
    /// Reading an entry of the section table failed.
    #[error("failed to iterate over the list of sections: {0}")]
    SectionIterate(#[source] io::Error),
    /// The PE header did not start with `PE\0\0`.
    #[error("bad PE header signature: {}", hex::encode_upper(.0))]
    BadSignature([u8; 4]),
    /// No section header carries the requested name.
    #[error("failed to find section named {0}")]
    SectionNotFound(String),
}

/// Errors raised while copying the bytes surrounding a section.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to read from the input file: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write to the output file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to determine the end of the input file: {0}")]
    Seek(#[source] io::Error),
}

/// Errors raised when the search/replace patterns cannot describe a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("search pattern is empty")]
    EmptySearch,
    #[error("pattern contains a NUL byte at index {0}")]
    NulInPattern(usize),
}

/// Pipeline step in which an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    HeaderParsed,
    PrefixCopied,
    SectionLoaded,
    Substituted,
    Listed,
    Written,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::HeaderParsed => "header-parsed",
            Stage::PrefixCopied => "prefix-copy",
            Stage::SectionLoaded => "section-load",
            Stage::Substituted => "substitute",
            Stage::Listed => "list",
            Stage::Written => "write-back",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Top-level error for a list/replace run.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the input and the output can't be the same: {0}")]
    SameFileAsOutput(PathBuf),
    #[error("executable format unrecognized: {}", hex::encode_upper(.0))]
    UnrecognizedFormat(Vec<u8>),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("{stage} failed: {source}")]
    Transfer {
        stage: Stage,
        #[source]
        source: TransferError,
    },
    #[error("failed to go to the strings section: {0}")]
    SectionSeek(#[source] io::Error),
    #[error("failed to allocate {len} bytes for the strings table")]
    Allocation { len: u64 },
    #[error("failed to read the strings table: {0}")]
    SectionRead(#[source] io::Error),
    #[error("failed to write to the input file: {0}")]
    InPlaceWrite(#[source] io::Error),
    #[error("invalid pattern: {0}")]
    Scan(#[from] ScanError),
    #[error("string not found")]
    PatternNotFound,
    #[error("the replacement couldn't fit in at least one string")]
    ReplacementDoesNotFit,
}

impl PatchError {
    /// Process exit code reported for this error.
    ///
    /// Codes 1 and 2 are reserved for the two soft outcomes so scripts can
    /// tell "not found" from "would not fit" from an I/O problem.
    pub fn exit_code(&self) -> i32 {
        match self {
            PatchError::PatternNotFound => 1,
            PatchError::ReplacementDoesNotFit => 2,
            PatchError::Open { .. } => 3,
            PatchError::UnrecognizedFormat(_) => 4,
            PatchError::Locate(err) => match err {
                LocateError::BadSignature(_) => 4,
                LocateError::HeaderRead(_) => 5,
                LocateError::SectionTableSeek(_) => 6,
                LocateError::NameTableAlloc { .. } | LocateError::NameTableRead(_) => 7,
                LocateError::SectionIterate(_) => 8,
                LocateError::SectionNotFound(_) => 9,
            },
            PatchError::SectionSeek(_) => 10,
            PatchError::Scan(_) => 11,
            PatchError::SameFileAsOutput(_) => 12,
            PatchError::Allocation { .. } | PatchError::SectionRead(_) => 13,
            PatchError::Transfer { .. } => 14,
            PatchError::InPlaceWrite(_) => 15,
        }
    }
}
