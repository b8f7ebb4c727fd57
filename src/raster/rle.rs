//! Run-length encoded rows and the row offset index appended to RLE images.
//!
//! A row is a sequence of runs. Each run starts with a counter byte `c`:
//! when `c > 0` one value follows and is repeated `c` times, when `c == 0`
//! the next byte `n` tells how many literal values follow.
//!
//! Images may end with a 32-byte trailer pointing to a chain of section
//! headers. The section of type 2 lists the start offset of every row.

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

const TRAILER_SIZE: u64 = 32;
const SECTION_HEADER_SIZE: u64 = 32;
const ROW_OFFSETS_SECTION: u32 = 2;

fn corrupt(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Decode one row of `width` pixels of `bpp` bytes into `out`.
///
/// `out` receives the little-endian pixel bytes and must hold exactly
/// `width * bpp` bytes. The reader is left right after the row.
pub(crate) fn decode_row<R: Read>(
    reader: &mut R,
    width: usize,
    bpp: usize,
    out: &mut [u8],
) -> io::Result<()> {
    debug_assert_eq!(out.len(), width * bpp);

    let mut filled = 0;
    while filled < width {
        let counter = reader.read_u8()? as usize;
        if counter == 0 {
            let literals = reader.read_u8()? as usize;
            if filled + literals > width {
                return Err(corrupt("literal run exceeds the row width"));
            }
            reader.read_exact(&mut out[filled * bpp..(filled + literals) * bpp])?;
            filled += literals;
        } else {
            if filled + counter > width {
                return Err(corrupt("repeated run exceeds the row width"));
            }
            let mut value = [0u8; 8];
            reader.read_exact(&mut value[..bpp])?;
            for pixel in out[filled * bpp..(filled + counter) * bpp].chunks_exact_mut(bpp) {
                pixel.copy_from_slice(&value[..bpp]);
            }
            filled += counter;
        }
    }
    Ok(())
}

/// Whether `signature` looks like `IMG 1.x`.
fn is_img_signature(signature: &[u8; 8]) -> bool {
    &signature[..4] == b"IMG " && signature[4] == b'1' && signature[5] == b'.'
}

/// Read the row offset index of an RLE image, if it has one.
///
/// `Ok(None)` when the file carries no usable index. An index whose offsets
/// don't increase strictly is an error.
pub(crate) fn read_row_offsets<R: Read + Seek>(
    reader: &mut R,
    height: usize,
) -> io::Result<Option<Vec<u64>>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    // An index needs at least one section header, one byte per row and the trailer.
    if file_size < (SECTION_HEADER_SIZE + TRAILER_SIZE).saturating_add(height as u64) {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(file_size - TRAILER_SIZE))?;
    let mut zeros = [0u8; 16];
    reader.read_exact(&mut zeros)?;
    if zeros.iter().any(|b| *b != 0) {
        return Ok(None);
    }
    let mut signature = [0u8; 8];
    reader.read_exact(&mut signature)?;
    if !is_img_signature(&signature) {
        return Ok(None);
    }
    let mut header = reader.read_u64::<LittleEndian>()?;
    let mut visited = HashSet::new();

    let offset_size = loop {
        let in_file = header
            .checked_add(SECTION_HEADER_SIZE)
            .is_some_and(|end| end <= file_size);
        if header == 0 || !in_file {
            return Ok(None);
        }
        if !visited.insert(header) {
            debug!("section header chain loops back to offset {header}");
            return Ok(None);
        }
        reader.seek(SeekFrom::Start(header))?;
        reader.read_exact(&mut signature)?;
        if !is_img_signature(&signature) {
            return Ok(None);
        }
        let section_type = reader.read_u32::<LittleEndian>()?;
        if section_type == ROW_OFFSETS_SECTION {
            break reader.read_u32::<LittleEndian>()?;
        }
        reader.seek(SeekFrom::Start(header + 24))?;
        header = reader.read_u64::<LittleEndian>()?;
    };

    if !matches!(offset_size, 1 | 2 | 4 | 8) {
        debug!("unsupported row offset size {offset_size}");
        return Ok(None);
    }
    let fits = (offset_size as u64)
        .checked_mul(height as u64)
        .and_then(|len| len.checked_add(header + SECTION_HEADER_SIZE))
        .and_then(|end| end.checked_add(TRAILER_SIZE))
        .is_some_and(|end| end <= file_size);
    if !fits {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(header + SECTION_HEADER_SIZE))?;
    let mut offsets = Vec::with_capacity(height);
    for _ in 0..height {
        let offset = match offset_size {
            1 => reader.read_u8()? as u64,
            2 => reader.read_u16::<LittleEndian>()? as u64,
            4 => reader.read_u32::<LittleEndian>()? as u64,
            _ => reader.read_u64::<LittleEndian>()?,
        };
        if offsets.last().is_some_and(|last| *last >= offset) {
            return Err(corrupt("row offsets are not increasing"));
        }
        offsets.push(offset);
    }
    Ok(Some(offsets))
}

/// Compute row start offsets by decoding every row once.
pub(crate) fn scan_row_offsets<R: Read + Seek>(
    reader: &mut R,
    width: usize,
    height: usize,
    bpp: usize,
) -> io::Result<Vec<u64>> {
    let mut row = vec![0u8; width * bpp];
    let mut offsets = Vec::with_capacity(height);
    reader.seek(SeekFrom::Start(0))?;
    for _ in 0..height {
        offsets.push(reader.stream_position()?);
        decode_row(reader, width, bpp, &mut row)?;
    }
    Ok(offsets)
}
