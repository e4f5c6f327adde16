use binstr_utils::errors::{PatchError, Stage, TransferError};
use clap::Subcommand;
use std::io;

pub mod list;
pub mod locate;
pub mod replace;

#[derive(Subcommand)]
pub enum Cmd {
    /// Print every string of a section as OFFSET:text
    List(list::ListArgs),

    /// Show where a section lives in the file
    Locate(locate::LocateArgs),

    /// Replace a string without growing the file
    Replace(replace::ReplaceArgs),
}

pub trait Command {
    fn execute(self) -> Result<(), PatchError>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), PatchError> {
        match self {
            Cmd::List(args) => args.execute(),
            Cmd::Locate(args) => args.execute(),
            Cmd::Replace(args) => args.execute(),
        }
    }
}

/// Wraps a failure to print results on stdout.
fn stdout_failed(stage: Stage) -> impl Fn(io::Error) -> PatchError {
    move |e| PatchError::Transfer {
        stage,
        source: TransferError::Write(e),
    }
}
