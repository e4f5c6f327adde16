//! Drives a list or replace run end to end: sniff the format, locate the
//! section, load it, rewrite or enumerate its strings, and write the result.
//!
//! Stages advance `Start → HeaderParsed → PrefixCopied → SectionLoaded →
//! {Substituted | Listed} → Written → Done`. In-place runs skip the prefix
//! copy since the bytes around the section never move. The first failure
//! aborts the run; nothing is retried.

use crate::config::{PatchConfig, Request};
use crate::format::ExecutableFormat;
use crate::scanner::{Replacement, ScanOutcome, Substitution};
use crate::section::{LocatedSection, SectionLocation};
use crate::strings::{self, Strings};
use crate::transfer::{copy_to_end, copy_until};
use crate::word::FormatAttributes;
use binstr_utils::errors::{PatchError, TransferError};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use binstr_utils::errors::Stage;

/// What a replace run did to the section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub format: ExecutableFormat,
    pub section: String,
    pub location: SectionLocation,
    pub attributes: FormatAttributes,
    pub outcome: ScanOutcome,
    pub replaced: usize,
    pub rejected: usize,
}

impl PatchReport {
    fn new(
        format: ExecutableFormat,
        section: String,
        located: LocatedSection,
        substitution: Substitution,
    ) -> Self {
        Self {
            format,
            section,
            location: located.location,
            attributes: located.attributes,
            outcome: substitution.outcome,
            replaced: substitution.replaced,
            rejected: substitution.rejected,
        }
    }

    /// Turns the two soft outcomes into errors.
    ///
    /// The section has already been written back by the time a report
    /// exists, so a `DoesNotFit` file may still carry some replaced strings.
    pub fn ensure_complete(&self) -> Result<(), PatchError> {
        match self.outcome {
            ScanOutcome::Replaced => Ok(()),
            ScanOutcome::NotFound => Err(PatchError::PatternNotFound),
            ScanOutcome::DoesNotFit => Err(PatchError::ReplacementDoesNotFit),
        }
    }
}

/// A loaded section, ready to be enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub format: ExecutableFormat,
    pub section: String,
    pub location: SectionLocation,
    pub attributes: FormatAttributes,
    table: Vec<u8>,
}

impl Listing {
    /// Non-empty strings of the section with their absolute file offsets.
    pub fn entries(&self) -> Strings<'_> {
        strings::entries(&self.table, self.location.offset)
    }

    /// Raw bytes of the section.
    pub fn table(&self) -> &[u8] {
        &self.table
    }
}

impl Serialize for Listing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut listing = serializer.serialize_struct("Listing", 5)?;
        listing.serialize_field("format", &self.format)?;
        listing.serialize_field("section", &self.section)?;
        listing.serialize_field("location", &self.location)?;
        listing.serialize_field("attributes", &self.attributes)?;
        listing.serialize_field("strings", &self.entries().collect::<Vec<_>>())?;
        listing.end()
    }
}

/// Result of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    List(Listing),
    Replaced(PatchReport),
}

fn transfer_failed(stage: Stage) -> impl Fn(TransferError) -> PatchError {
    move |source| PatchError::Transfer { stage, source }
}

/// Runs the format's navigator for `section`, or for the format's default.
fn locate<R: Read + Seek>(
    reader: &mut R,
    format: ExecutableFormat,
    section: Option<&str>,
) -> Result<(String, LocatedSection), PatchError> {
    let name = section.unwrap_or(format.default_section());
    let located = format.locate(reader, name)?;
    debug!(
        stage = %Stage::HeaderParsed,
        %format,
        section = name,
        offset = located.location.offset,
        length = located.location.length,
        "located section"
    );
    Ok((name.to_string(), located))
}

/// Reads the whole section into a freshly allocated buffer.
fn load_section<R: Read + Seek>(
    reader: &mut R,
    location: SectionLocation,
) -> Result<Vec<u8>, PatchError> {
    reader
        .seek(SeekFrom::Start(location.offset))
        .map_err(PatchError::SectionSeek)?;

    let len = usize::try_from(location.length).map_err(|_| PatchError::Allocation {
        len: location.length,
    })?;
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| PatchError::Allocation {
            len: location.length,
        })?;
    table.resize(len, 0);
    reader
        .read_exact(&mut table)
        .map_err(PatchError::SectionRead)?;

    debug!(stage = %Stage::SectionLoaded, bytes = len, "loaded section");
    Ok(table)
}

fn log_substitution(substitution: &Substitution) {
    debug!(
        stage = %Stage::Substituted,
        outcome = ?substitution.outcome,
        replaced = substitution.replaced,
        rejected = substitution.rejected,
        "substitution pass finished"
    );
    if substitution.rejected > 0 {
        warn!(
            rejected = substitution.rejected,
            "replacement did not fit in every matching string"
        );
    }
}

/// Loads `section` (or the format default) and hands it back for enumeration.
pub fn list_strings<R: Read + Seek>(
    reader: &mut R,
    format: ExecutableFormat,
    section: Option<&str>,
) -> Result<Listing, PatchError> {
    let (name, located) = locate(reader, format, section)?;
    let table = load_section(reader, located.location)?;
    debug!(stage = %Stage::Listed, "section ready for listing");
    Ok(Listing {
        format,
        section: name,
        location: located.location,
        attributes: located.attributes,
        table,
    })
}

/// Patches the section inside `file` itself, overwriting only its byte range.
///
/// A crash between the seek and the write can leave the section half
/// written; use [`replace_to_output`] when that matters.
pub fn replace_in_place<F: Read + Write + Seek>(
    file: &mut F,
    format: ExecutableFormat,
    section: Option<&str>,
    replacement: &Replacement,
) -> Result<PatchReport, PatchError> {
    let (name, located) = locate(file, format, section)?;
    let mut table = load_section(file, located.location)?;
    let substitution = replacement.apply(&mut table);
    log_substitution(&substitution);

    file.seek(SeekFrom::Start(located.location.offset))
        .map_err(PatchError::SectionSeek)?;
    file.write_all(&table).map_err(PatchError::InPlaceWrite)?;
    file.flush().map_err(PatchError::InPlaceWrite)?;
    debug!(stage = %Stage::Written, bytes = table.len(), "rewrote section in place");

    Ok(PatchReport::new(format, name, located, substitution))
}

/// Writes a patched copy of `input` to `output`: the bytes before the
/// section, the rewritten section, then everything after it.
pub fn replace_to_output<R, W>(
    input: &mut R,
    output: &mut W,
    format: ExecutableFormat,
    section: Option<&str>,
    replacement: &Replacement,
) -> Result<PatchReport, PatchError>
where
    R: Read + Seek,
    W: Write,
{
    let (name, located) = locate(input, format, section)?;
    let location = located.location;

    input
        .seek(SeekFrom::Start(0))
        .map_err(|e| transfer_failed(Stage::PrefixCopied)(TransferError::Seek(e)))?;
    copy_until(input, output, location.offset).map_err(transfer_failed(Stage::PrefixCopied))?;
    debug!(stage = %Stage::PrefixCopied, bytes = location.offset, "copied prefix");

    let mut table = load_section(input, location)?;
    let substitution = replacement.apply(&mut table);
    log_substitution(&substitution);

    output
        .write_all(&table)
        .map_err(|e| transfer_failed(Stage::Written)(TransferError::Write(e)))?;
    let suffix = copy_to_end(input, output).map_err(transfer_failed(Stage::Written))?;
    output
        .flush()
        .map_err(|e| transfer_failed(Stage::Written)(TransferError::Write(e)))?;
    debug!(stage = %Stage::Written, suffix, "wrote section and suffix");

    Ok(PatchReport::new(format, name, located, substitution))
}

fn open_read(path: &Path) -> Result<File, PatchError> {
    File::open(path).map_err(|source| PatchError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether two paths name the same file, either literally or once resolved.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn reject_same_file(input: &Path, output: &Path) -> Result<(), PatchError> {
    if same_file(input, output) {
        return Err(PatchError::SameFileAsOutput(PathBuf::from(output)));
    }
    Ok(())
}

/// Opens `path` read-only and lists the strings of `section`.
pub fn list_file(path: &Path, section: Option<&str>) -> Result<Listing, PatchError> {
    let mut input = open_read(path)?;
    let format = ExecutableFormat::detect(&mut input)?;
    list_strings(&mut input, format, section)
}

/// Patches `input`, either in place or into a fresh `output`.
///
/// The output is created before the input is opened, and must not name the
/// input itself.
pub fn replace_file(
    input: &Path,
    output: Option<&Path>,
    section: Option<&str>,
    replacement: &Replacement,
) -> Result<PatchReport, PatchError> {
    match output {
        Some(output_path) => {
            reject_same_file(input, output_path)?;
            let output = File::create(output_path).map_err(|source| PatchError::Open {
                path: output_path.to_path_buf(),
                source,
            })?;
            let mut input = open_read(input)?;
            let format = ExecutableFormat::detect(&mut input)?;
            let mut output = BufWriter::new(output);
            replace_to_output(&mut input, &mut output, format, section, replacement)
        }
        None => {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(input)
                .map_err(|source| PatchError::Open {
                    path: input.to_path_buf(),
                    source,
                })?;
            let format = ExecutableFormat::detect(&mut file)?;
            replace_in_place(&mut file, format, section, replacement)
        }
    }
}

/// Opens the files a configuration names and performs the run it asks for.
///
/// A replace run that finds nothing, or that cannot fit every match, still
/// writes its output and returns `Ok`; see [`PatchReport::ensure_complete`].
pub fn run(config: &PatchConfig) -> Result<RunOutput, PatchError> {
    debug!(stage = %Stage::Start, input = %config.input.display(), "starting run");

    let section = config.section.as_deref();
    let output = match config.request()? {
        Request::List => {
            if let Some(output) = &config.output {
                debug!(output = %output.display(), "listing ignores the output path");
            }
            RunOutput::List(list_file(&config.input, section)?)
        }
        Request::Replace(replacement) => RunOutput::Replaced(replace_file(
            &config.input,
            config.output.as_deref(),
            section,
            &replacement,
        )?),
    };

    debug!(stage = %Stage::Done, "run finished");
    Ok(output)
}
