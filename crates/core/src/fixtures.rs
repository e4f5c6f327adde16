//! Builders for minimal, structurally valid ELF and PE images.
//!
//! The images carry just enough header structure for the navigators to walk:
//! an ELF header plus section header table and `.shstrtab`, or a DOS stub,
//! COFF header, zeroed optional header and section table. Nothing in them is
//! executable.

use crate::section::SectionLocation;
use crate::word::{Endianness, FormatAttributes, WordWidth};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// A built image together with where each named section landed.
#[derive(Debug, Clone)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub sections: Vec<(String, SectionLocation)>,
}

impl Image {
    /// Location of the section called `name`.
    ///
    /// # Panics
    /// If no section with that name was added to the builder.
    pub fn location(&self, name: &str) -> SectionLocation {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, loc)| *loc)
            .unwrap_or_else(|| panic!("fixture has no section {name}"))
    }

    /// Raw bytes of the section called `name`.
    pub fn section_bytes(&self, name: &str) -> &[u8] {
        let loc = self.location(name);
        &self.bytes[loc.offset as usize..loc.end() as usize]
    }
}

struct Put<'a> {
    buf: &'a mut Vec<u8>,
    endianness: Endianness,
}

impl Put<'_> {
    fn grow(&mut self, end: usize) {
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
    }

    fn bytes(&mut self, at: usize, data: &[u8]) {
        self.grow(at + data.len());
        self.buf[at..at + data.len()].copy_from_slice(data);
    }

    fn u16(&mut self, at: usize, v: u16) {
        self.grow(at + 2);
        match self.endianness {
            Endianness::Little => LittleEndian::write_u16(&mut self.buf[at..], v),
            Endianness::Big => BigEndian::write_u16(&mut self.buf[at..], v),
        }
    }

    fn u32(&mut self, at: usize, v: u32) {
        self.grow(at + 4);
        match self.endianness {
            Endianness::Little => LittleEndian::write_u32(&mut self.buf[at..], v),
            Endianness::Big => BigEndian::write_u32(&mut self.buf[at..], v),
        }
    }

    fn u64(&mut self, at: usize, v: u64) {
        self.grow(at + 8);
        match self.endianness {
            Endianness::Little => LittleEndian::write_u64(&mut self.buf[at..], v),
            Endianness::Big => BigEndian::write_u64(&mut self.buf[at..], v),
        }
    }

    fn word(&mut self, width: WordWidth, at: usize, v: u64) {
        match width {
            WordWidth::Narrow => self.u32(at, v as u32),
            WordWidth::Wide => self.u64(at, v),
        }
    }
}

const fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

/// Builds an ELF image with the given sections, followed by `.shstrtab` and
/// the section header table.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    attrs: FormatAttributes,
    sections: Vec<(String, Vec<u8>)>,
    trailer: Vec<u8>,
}

impl ElfBuilder {
    pub fn new(word_width: WordWidth, endianness: Endianness) -> Self {
        Self {
            attrs: FormatAttributes {
                word_width,
                endianness,
            },
            sections: Vec::new(),
            trailer: Vec::new(),
        }
    }

    pub fn section(mut self, name: &str, data: &[u8]) -> Self {
        self.sections.push((name.to_string(), data.to_vec()));
        self
    }

    /// Bytes appended after the section header table.
    pub fn trailer(mut self, data: &[u8]) -> Self {
        self.trailer = data.to_vec();
        self
    }

    pub fn build(&self) -> Image {
        let width = self.attrs.word_width;
        let (ehsize, shentsize) = match width {
            WordWidth::Narrow => (52usize, 40usize),
            WordWidth::Wide => (64, 64),
        };

        let mut bytes = vec![0u8; ehsize];
        let mut sections = Vec::new();

        // Names table: leading NUL for the null section, then every name.
        let mut shstrtab = vec![0u8];
        let mut name_indices = Vec::new();
        for (name, data) in &self.sections {
            name_indices.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);

            let loc = SectionLocation::new(bytes.len() as u64, data.len() as u64);
            bytes.extend_from_slice(data);
            sections.push((name.clone(), loc));
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");
        let shstrtab_loc = SectionLocation::new(bytes.len() as u64, shstrtab.len() as u64);
        bytes.extend_from_slice(&shstrtab);

        let shoff = align(bytes.len(), 8);
        let shnum = self.sections.len() + 2;
        bytes.resize(shoff + shnum * shentsize, 0);

        let mut put = Put {
            buf: &mut bytes,
            endianness: self.attrs.endianness,
        };
        put.bytes(0, &[0x7f, b'E', b'L', b'F']);
        put.bytes(
            4,
            &[
                if width == WordWidth::Narrow { 1 } else { 2 },
                if self.attrs.endianness == Endianness::Big { 2 } else { 1 },
                1,
            ],
        );
        put.u16(16, 2); // ET_EXEC
        put.u32(20, 1);
        let (shoff_at, flags_tail) = match width {
            WordWidth::Narrow => (32, 36),
            WordWidth::Wide => (40, 48),
        };
        put.word(width, shoff_at, shoff as u64);
        put.u16(flags_tail + 4, ehsize as u16);
        put.u16(flags_tail + 10, shentsize as u16);
        put.u16(flags_tail + 12, shnum as u16);
        put.u16(flags_tail + 14, (shnum - 1) as u16);

        let (offset_at, size_at) = match width {
            WordWidth::Narrow => (16, 20),
            WordWidth::Wide => (24, 32),
        };
        let entries = sections
            .iter()
            .zip(&name_indices)
            .map(|((_, loc), idx)| (*idx, *loc))
            .chain(std::iter::once((shstrtab_name, shstrtab_loc)));
        for (i, (name_idx, loc)) in entries.enumerate() {
            let entry = shoff + (i + 1) * shentsize;
            put.u32(entry, name_idx);
            put.u32(entry + 4, 1); // SHT_PROGBITS
            put.word(width, entry + offset_at, loc.offset);
            put.word(width, entry + size_at, loc.length);
        }

        bytes.extend_from_slice(&self.trailer);
        Image { bytes, sections }
    }
}

/// Builds a PE image: DOS stub, `PE\0\0`, COFF header, zeroed optional header,
/// section table and file-aligned raw section data.
#[derive(Debug, Clone)]
pub struct PeBuilder {
    signature: [u8; 4],
    optional_header_size: u16,
    sections: Vec<(Vec<u8>, Vec<u8>)>,
    trailer: Vec<u8>,
}

impl Default for PeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PeBuilder {
    pub const HEADER_OFFSET: usize = 0x80;
    const FILE_ALIGNMENT: usize = 0x200;

    pub fn new() -> Self {
        Self {
            signature: *b"PE\0\0",
            optional_header_size: 0xE0,
            sections: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// Adds a section; the name is stored truncated/NUL-padded to 8 bytes.
    pub fn section(mut self, name: &[u8], data: &[u8]) -> Self {
        self.sections.push((name.to_vec(), data.to_vec()));
        self
    }

    pub fn signature(mut self, signature: [u8; 4]) -> Self {
        self.signature = signature;
        self
    }

    pub fn optional_header_size(mut self, size: u16) -> Self {
        self.optional_header_size = size;
        self
    }

    pub fn trailer(mut self, data: &[u8]) -> Self {
        self.trailer = data.to_vec();
        self
    }

    pub fn build(&self) -> Image {
        let pe = Self::HEADER_OFFSET;
        let table = pe + 24 + self.optional_header_size as usize;
        let mut raw = align(table + self.sections.len() * 40, Self::FILE_ALIGNMENT);

        let mut bytes = Vec::new();
        let mut sections = Vec::new();
        let mut put = Put {
            buf: &mut bytes,
            endianness: Endianness::Little,
        };
        put.bytes(0, b"MZ");
        put.u32(0x3c, pe as u32);
        put.bytes(pe, &self.signature);
        put.u16(pe + 4, 0x014c);
        put.u16(pe + 6, self.sections.len() as u16);
        put.u16(pe + 20, self.optional_header_size);
        put.u16(pe + 22, 0x0102);
        if self.optional_header_size >= 2 {
            put.u16(pe + 24, 0x010b);
        }

        for (i, (name, data)) in self.sections.iter().enumerate() {
            let entry = table + i * 40;
            let mut fixed = [0u8; 8];
            let n = name.len().min(8);
            fixed[..n].copy_from_slice(&name[..n]);
            put.bytes(entry, &fixed);
            put.u32(entry + 8, data.len() as u32);
            put.u32(entry + 12, (0x1000 * (i + 1)) as u32);
            put.u32(entry + 16, data.len() as u32);
            put.u32(entry + 20, raw as u32);

            put.bytes(raw, data);
            sections.push((
                String::from_utf8_lossy(name).into_owned(),
                SectionLocation::new(raw as u64, data.len() as u64),
            ));
            raw = align(raw + data.len(), Self::FILE_ALIGNMENT);
        }
        put.grow(raw);

        bytes.extend_from_slice(&self.trailer);
        Image { bytes, sections }
    }
}
