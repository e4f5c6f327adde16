//! Verbatim copying of the bytes that surround a patched section.

use binstr_utils::errors::TransferError;
use std::io::{Read, Seek, SeekFrom, Write};

/// Size of the bounce buffer used for copies.
pub const CHUNK_SIZE: usize = 1024;

/// Copies exactly `count` bytes from the input's current position to the output.
///
/// Never reads past `count`. A short read is a [`TransferError::Read`]; the
/// bytes already forwarded stay written.
pub fn copy_until<R, W>(input: &mut R, output: &mut W, count: u64) -> Result<u64, TransferError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(CHUNK_SIZE as u64) as usize;
        input
            .read_exact(&mut buffer[..chunk])
            .map_err(TransferError::Read)?;
        output
            .write_all(&buffer[..chunk])
            .map_err(TransferError::Write)?;
        remaining -= chunk as u64;
    }
    Ok(count)
}

/// Copies everything from the input's current position to its end.
///
/// The end is found by seeking there and back, so the input must be seekable.
pub fn copy_to_end<R, W>(input: &mut R, output: &mut W) -> Result<u64, TransferError>
where
    R: Read + Seek + ?Sized,
    W: Write + ?Sized,
{
    let start = input.stream_position().map_err(TransferError::Seek)?;
    let end = input.seek(SeekFrom::End(0)).map_err(TransferError::Seek)?;
    input
        .seek(SeekFrom::Start(start))
        .map_err(TransferError::Seek)?;
    copy_until(input, output, end.saturating_sub(start))
}
