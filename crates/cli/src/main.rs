/// Entry point for binstr, a tool that lists and patches the strings of ELF
/// and PE executables without moving a single byte of the file around.
///
/// Parses the command line, installs logging on stderr and maps failures onto
/// the exit codes scripts rely on.
use binstr_cli::commands::{Cmd, Command};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

/// Exit code for command lines that cannot be parsed.
const USAGE_EXIT_CODE: i32 = 11;

/// Command-line interface for binstr.
#[derive(Parser)]
#[command(name = "binstr")]
#[command(about = "binstr: list and replace strings inside ELF and PE executables")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Log every pipeline stage to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { USAGE_EXIT_CODE } else { 0 });
        }
    };
    init_tracing(cli.verbose);

    if let Err(err) = cli.command.execute() {
        eprintln!("binstr: {err}");
        process::exit(err.exit_code());
    }
}
