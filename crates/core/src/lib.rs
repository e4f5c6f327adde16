pub mod config;
pub mod elf;
pub mod format;
pub mod orchestrator;
pub mod pe;
pub mod scanner;
pub mod section;
pub mod strings;
pub mod transfer;
pub mod word;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use config::PatchConfig;
pub use format::ExecutableFormat;
pub use orchestrator::{list_file, replace_file, run, Listing, PatchReport, RunOutput};
