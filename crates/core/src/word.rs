//! Header words whose width and byte order are only known once an executable's
//! identification bytes have been read.

use byteorder::{BigEndian, LittleEndian, NativeEndian, ReadBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read};

/// Width of an address-sized header field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum WordWidth {
    /// 32-bit words.
    Narrow,
    /// 64-bit words.
    Wide,
}

impl WordWidth {
    /// Number of bytes a word of this width occupies on disk.
    pub const fn size(self) -> usize {
        match self {
            WordWidth::Narrow => 4,
            WordWidth::Wide => 8,
        }
    }

    /// Number of bits, as shown to users.
    pub const fn bits(self) -> u32 {
        match self {
            WordWidth::Narrow => 32,
            WordWidth::Wide => 64,
        }
    }
}

/// Byte order of multi-byte header fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the machine running this code.
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    /// Reads a 16-bit field in this byte order.
    pub fn read_u16<R: Read + ?Sized>(self, reader: &mut R) -> io::Result<u16> {
        match self {
            Endianness::Little => reader.read_u16::<LittleEndian>(),
            Endianness::Big => reader.read_u16::<BigEndian>(),
        }
    }

    /// Reads a 32-bit field in this byte order.
    pub fn read_u32<R: Read + ?Sized>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Endianness::Little => reader.read_u32::<LittleEndian>(),
            Endianness::Big => reader.read_u32::<BigEndian>(),
        }
    }
}

/// Word size and byte order of an executable, fixed once its header is parsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormatAttributes {
    pub word_width: WordWidth,
    pub endianness: Endianness,
}

impl FormatAttributes {
    /// PE section table fields are always 32-bit little-endian.
    pub const PE: Self = Self {
        word_width: WordWidth::Narrow,
        endianness: Endianness::Little,
    };

    /// Interprets the ELF class and data identification bytes.
    ///
    /// Class `1` selects 32-bit words and data `2` selects big-endian; every
    /// other value falls back to 64-bit and little-endian respectively.
    pub const fn from_elf_ident(class: u8, data: u8) -> Self {
        let word_width = if class == 1 {
            WordWidth::Narrow
        } else {
            WordWidth::Wide
        };
        let endianness = if data == 2 {
            Endianness::Big
        } else {
            Endianness::Little
        };
        Self {
            word_width,
            endianness,
        }
    }

    /// Reads one word in this format's width and byte order.
    pub fn read_word<R: Read + ?Sized>(self, reader: &mut R) -> io::Result<Word> {
        Word::read(reader, self.word_width, self.endianness)
    }
}

impl fmt::Display for FormatAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.endianness {
            Endianness::Little => "little-endian",
            Endianness::Big => "big-endian",
        };
        write!(f, "{}-bit {order}", self.word_width.bits())
    }
}

/// A header word of runtime-selected width.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Word {
    Narrow(u32),
    Wide(u64),
}

impl Word {
    /// Reads a word exactly as laid out on disk, interpreted in host byte order.
    pub fn read_raw<R: Read + ?Sized>(reader: &mut R, width: WordWidth) -> io::Result<Self> {
        Ok(match width {
            WordWidth::Narrow => Word::Narrow(reader.read_u32::<NativeEndian>()?),
            WordWidth::Wide => Word::Wide(reader.read_u64::<NativeEndian>()?),
        })
    }

    /// Reads a word stored in `endianness` and returns its native value.
    pub fn read<R: Read + ?Sized>(
        reader: &mut R,
        width: WordWidth,
        endianness: Endianness,
    ) -> io::Result<Self> {
        Ok(Self::read_raw(reader, width)?.into_host_order(endianness))
    }

    /// Reverses the byte order of the word.
    pub const fn swap_bytes(self) -> Self {
        match self {
            Word::Narrow(v) => Word::Narrow(v.swap_bytes()),
            Word::Wide(v) => Word::Wide(v.swap_bytes()),
        }
    }

    /// Converts a raw word stored in `source` order to host order.
    pub fn into_host_order(self, source: Endianness) -> Self {
        if source == Endianness::host() {
            self
        } else {
            self.swap_bytes()
        }
    }

    pub const fn width(self) -> WordWidth {
        match self {
            Word::Narrow(_) => WordWidth::Narrow,
            Word::Wide(_) => WordWidth::Wide,
        }
    }

    /// Widens the word to an absolute file offset or length.
    pub const fn to_offset(self) -> u64 {
        match self {
            Word::Narrow(v) => v as u64,
            Word::Wide(v) => v,
        }
    }
}
