/// Module for the `replace` subcommand, which rewrites matching strings of a
/// section without changing the size of the file.
///
/// A replacement may be shorter than what it replaces, or as long as the
/// string plus its trailing zero padding minus one terminator byte. Freed
/// bytes are zeroed so every other string keeps its offset.
use binstr_core::replace_file;
use binstr_core::scanner::{MatchMode, Replacement};
use binstr_utils::errors::{PatchError, Stage};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;

/// Arguments for the `replace` subcommand.
#[derive(Args)]
pub struct ReplaceArgs {
    /// ELF or PE executable to patch
    pub file: PathBuf,
    /// Text to look for
    pub search: String,
    /// Text to put in its place
    pub replace: String,
    /// Only replace strings that are exactly SEARCH
    #[arg(short, long)]
    pub exact: bool,
    /// Section to patch (default: .rodata for ELF, .rdata for PE)
    #[arg(short, long)]
    pub section: Option<String>,
    /// Write a patched copy here instead of modifying FILE in place.
    /// In-place patching is not safe against crashes mid-write.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print the patch report as JSON
    #[arg(long)]
    pub json: bool,
}

impl super::Command for ReplaceArgs {
    fn execute(self) -> Result<(), PatchError> {
        let mode = if self.exact {
            MatchMode::Exact
        } else {
            MatchMode::Substring
        };
        tracing::debug!(
            file = %self.file.display(),
            in_place = self.output.is_none(),
            ?mode,
            "replace requested"
        );
        let replacement = Replacement::new(self.search, self.replace, mode)?;
        let report = replace_file(
            &self.file,
            self.output.as_deref(),
            self.section.as_deref(),
            &replacement,
        )?;

        let mut out = io::stdout().lock();
        let printed = if self.json {
            serde_json::to_string_pretty(&report)
                .map_err(io::Error::from)
                .and_then(|text| writeln!(out, "{text}"))
        } else if report.replaced > 0 {
            writeln!(
                out,
                "replaced {} string(s) in {} at {:#010x}",
                report.replaced, report.section, report.location.offset
            )
        } else {
            Ok(())
        };
        printed.map_err(super::stdout_failed(Stage::Written))?;

        report.ensure_complete()
    }
}
