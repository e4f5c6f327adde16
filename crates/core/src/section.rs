use crate::word::FormatAttributes;
use serde::Serialize;

/// Absolute byte range of a section's raw data inside an executable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionLocation {
    pub offset: u64,
    pub length: u64,
}

impl SectionLocation {
    /// Placeholder held by a navigator until a matching header is found.
    pub const NOT_FOUND: Self = Self {
        offset: 0,
        length: 0,
    };

    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// A location is only usable when both offset and length are non-zero.
    pub const fn is_found(self) -> bool {
        self.offset > 0 && self.length > 0
    }

    /// Offset of the first byte after the section.
    pub const fn end(self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// What a navigator hands back: where the section lives and how the header was encoded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocatedSection {
    pub location: SectionLocation,
    pub attributes: FormatAttributes,
}
