/// Module for the `list` subcommand, which prints the strings of a section.
///
/// Each string is printed as its absolute file offset in hex, a colon, then
/// the raw bytes of the string. Bytes are not escaped, so binary content
/// reaches stdout as-is.
use binstr_core::{list_file, Listing};
use binstr_utils::errors::{PatchError, Stage};
use clap::Args;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the `list` subcommand.
#[derive(Args)]
pub struct ListArgs {
    /// ELF or PE executable to read
    pub file: PathBuf,
    /// Section to list (default: .rodata for ELF, .rdata for PE)
    #[arg(short, long)]
    pub section: Option<String>,
    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

fn print(listing: &Listing, json: bool) -> io::Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    if json {
        serde_json::to_writer_pretty(&mut out, listing)?;
        writeln!(out)?;
    } else {
        for entry in listing.entries() {
            entry.write_line(&mut out)?;
        }
    }
    out.flush()
}

impl super::Command for ListArgs {
    fn execute(self) -> Result<(), PatchError> {
        let listing = list_file(&self.file, self.section.as_deref())?;
        print(&listing, self.json).map_err(super::stdout_failed(Stage::Listed))
    }
}
