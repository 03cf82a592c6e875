use crate::data_handle::{DataEncoding, Endianness};
use crate::err::{Result, ValueError, conversion};

use std::io::Cursor;
use winstructs::security::Sid;

/// An NT security identifier. Only the little-endian layout exists on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SidValue {
    bytes: Vec<u8>,
}

fn parse(bytes: &[u8]) -> Result<(Sid, usize)> {
    let mut cursor = Cursor::new(bytes);
    let sid = Sid::from_reader(&mut cursor).map_err(|e| conversion("nt security identifier", e))?;
    Ok((sid, cursor.position() as usize))
}

impl SidValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        if encoding.endianness() != Some(Endianness::LittleEndian) {
            return Err(ValueError::UnsupportedEncoding {
                what: "nt security identifier",
                encoding: encoding.to_string(),
            });
        }
        let (_, consumed) = parse(data)?;
        self.bytes = data[..consumed].to_vec();
        Ok(())
    }

    pub fn to_text(&self) -> Result<String> {
        let (sid, _) = parse(&self.bytes)?;
        Ok(sid.to_string())
    }
}
