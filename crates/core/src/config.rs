//! Run configuration: which file, which section, and what to do with its strings.

use crate::scanner::{MatchMode, Replacement};
use binstr_utils::errors::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything needed to list or patch the strings of one executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Executable to read (and to patch in place when `output` is unset).
    pub input: PathBuf,

    /// Where to write the patched copy. Ignored when only listing.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Section to work on; the format's default (`.rodata` / `.rdata`) when unset.
    #[serde(default)]
    pub section: Option<String>,

    /// Pattern to look for.
    #[serde(default)]
    pub search: Option<String>,

    /// Replacement text. Without it the strings are only listed.
    #[serde(default)]
    pub replace: Option<String>,

    /// Replace whole strings only instead of any occurrence.
    #[serde(default)]
    pub exact: bool,
}

/// What a configuration asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    Replace(Replacement),
}

impl PatchConfig {
    /// Lists the strings of `input`.
    pub fn listing(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            section: None,
            search: None,
            replace: None,
            exact: false,
        }
    }

    /// Replaces `search` with `replace` in `input`, in place unless an output is set.
    pub fn replacing(
        input: impl Into<PathBuf>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            search: Some(search.into()),
            replace: Some(replace.into()),
            ..Self::listing(input)
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub const fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub const fn mode(&self) -> MatchMode {
        if self.exact {
            MatchMode::Exact
        } else {
            MatchMode::Substring
        }
    }

    /// Classifies the configuration. A search pattern without a replacement
    /// still only lists.
    pub fn request(&self) -> Result<Request, ScanError> {
        match (&self.search, &self.replace) {
            (Some(search), Some(replace)) => Ok(Request::Replace(Replacement::new(
                search.as_bytes(),
                replace.as_bytes(),
                self.mode(),
            )?)),
            _ => Ok(Request::List),
        }
    }
}
