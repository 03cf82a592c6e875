//! Byte order aware reads and writes of unsigned integers of 1, 2, 4 or 8 bytes.
//!
//! Callers validate the size first; anything else is an [`ValueError::UnsupportedSize`].

use crate::data_handle::Endianness;
use crate::err::{Result, ValueError};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

fn check_size(what: &'static str, size: usize) -> Result<()> {
    match size {
        1 | 2 | 4 | 8 => Ok(()),
        _ => Err(ValueError::UnsupportedSize { what, size }),
    }
}

/// Reads an unsigned integer of `buf.len()` bytes.
pub(crate) fn read_uint(what: &'static str, buf: &[u8], endianness: Endianness) -> Result<u64> {
    check_size(what, buf.len())?;

    Ok(match endianness.resolve() {
        Endianness::BigEndian => BigEndian::read_uint(buf, buf.len()),
        _ => LittleEndian::read_uint(buf, buf.len()),
    })
}

/// Writes the low `size` bytes of `value`.
pub(crate) fn write_uint(
    what: &'static str,
    value: u64,
    size: usize,
    endianness: Endianness,
) -> Result<Vec<u8>> {
    check_size(what, size)?;

    let mut buf = vec![0_u8; size];
    let mask = if size == 8 { u64::MAX } else { (1_u64 << (size * 8)) - 1 };
    match endianness.resolve() {
        Endianness::BigEndian => BigEndian::write_uint(&mut buf, value & mask, size),
        _ => LittleEndian::write_uint(&mut buf, value & mask, size),
    }

    Ok(buf)
}
