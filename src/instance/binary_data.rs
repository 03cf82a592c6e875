//! Binary data leaf, rendered as base16, base32 or base64.

use crate::data_handle::DataEncoding;
use crate::err::{Result, ValueError};
use crate::utils::base_n::{self, Base};

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BinaryDataFormat: u32 {
        const BASE16 = 0x0000_0001;
        const BASE32 = 0x0000_0002;
        const BASE64 = 0x0000_0003;

        const LOWER_CASE = 0x0000_0100;
        const UPPER_CASE = 0x0000_0200;
    }
}

impl Default for BinaryDataFormat {
    fn default() -> Self {
        BinaryDataFormat::BASE16 | BinaryDataFormat::UPPER_CASE
    }
}

const FORMAT_TYPE_MASK: u32 = 0x0000_00ff;
const CASE_MASK: u32 = 0x0000_0300;

fn parse_format(flags: u32) -> Result<(Base, bool)> {
    let unsupported = ValueError::UnsupportedFormat {
        what: "binary data format",
        flags,
    };
    if flags & !(FORMAT_TYPE_MASK | CASE_MASK) != 0 {
        return Err(unsupported);
    }

    let base = match flags & FORMAT_TYPE_MASK {
        0x01 => Base::Base16,
        0x02 => Base::Base32,
        0x03 => Base::Base64,
        _ => return Err(unsupported),
    };
    let upper_case = match (base, flags & CASE_MASK) {
        (Base::Base64, 0) => false,
        (Base::Base64, _) => return Err(unsupported),
        (_, 0x0100) => false,
        (_, 0x0200) => true,
        _ => return Err(unsupported),
    };

    Ok((base, upper_case))
}

/// Holds its own copy of the bytes, independent of the buffer they were read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryData {
    data: Vec<u8>,
}

impl BinaryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        if encoding != DataEncoding::None {
            return Err(ValueError::UnsupportedEncoding {
                what: "binary data",
                encoding: encoding.to_string(),
            });
        }
        self.data = data.to_vec();
        Ok(())
    }

    pub fn copy_to_byte_stream(&self, encoding: DataEncoding) -> Result<Vec<u8>> {
        if encoding != DataEncoding::None {
            return Err(ValueError::UnsupportedEncoding {
                what: "binary data",
                encoding: encoding.to_string(),
            });
        }
        Ok(self.data.clone())
    }

    /// Number of characters of the rendering, terminator included.
    pub fn string_size(&self, flags: u32) -> Result<usize> {
        let (base, _) = parse_format(flags)?;
        Ok(base_n::encoded_len(self.data.len(), base) + 1)
    }

    pub fn to_text(&self, flags: u32) -> Result<String> {
        let (base, upper_case) = parse_format(flags)?;
        Ok(base_n::encode(&self.data, base, upper_case))
    }

    pub fn from_text(&mut self, text: &str, flags: u32) -> Result<()> {
        let (base, _) = parse_format(flags)?;
        self.data = base_n::decode(text, base)?;
        Ok(())
    }
}
