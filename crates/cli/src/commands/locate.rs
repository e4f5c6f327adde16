/// Module for the `locate` subcommand, which reports a section's file range
/// and the word size and byte order its headers were read with.
use binstr_core::list_file;
use binstr_utils::errors::{PatchError, Stage};
use clap::Args;
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;

/// Arguments for the `locate` subcommand.
#[derive(Args)]
pub struct LocateArgs {
    /// ELF or PE executable to read
    pub file: PathBuf,
    /// Section to look for (default: .rodata for ELF, .rdata for PE)
    #[arg(short, long)]
    pub section: Option<String>,
    /// Print the location as JSON
    #[arg(long)]
    pub json: bool,
}

impl super::Command for LocateArgs {
    fn execute(self) -> Result<(), PatchError> {
        let listing = list_file(&self.file, self.section.as_deref())?;
        let location = listing.location;

        let mut out = io::stdout().lock();
        let printed = if self.json {
            let value = json!({
                "format": listing.format,
                "section": listing.section,
                "offset": location.offset,
                "length": location.length,
                "attributes": listing.attributes,
                "strings": listing.entries().count(),
            });
            writeln!(out, "{value:#}")
        } else {
            writeln!(
                out,
                "{} {} at {:#010x}, {} bytes ({})",
                listing.format, listing.section, location.offset, location.length, listing.attributes
            )
        };
        printed.map_err(super::stdout_failed(Stage::Listed))
    }
}
