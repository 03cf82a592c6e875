use crate::data_handle::{DataEncoding, Endianness};
use crate::err::{Result, ValueError, conversion};

use bitflags::bitflags;
use winstructs::guid::Guid;

bitflags! {
    /// Rendering flags of GUIDs. Without flags a GUID renders lower case without braces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GuidFormat: u32 {
        const UPPER_CASE = 0x0000_0001;
        const SURROUNDING_BRACES = 0x0000_0002;
    }
}

impl Default for GuidFormat {
    fn default() -> Self {
        GuidFormat::empty()
    }
}

/// A GUID, kept in its little-endian on-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GuidValue {
    bytes: [u8; 16],
}

impl GuidValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what: "guid",
                encoding: encoding.to_string(),
            })?;
        let mut bytes: [u8; 16] = data.try_into().map_err(|_| ValueError::UnsupportedSize {
            what: "guid",
            size: data.len(),
        })?;

        if endianness == Endianness::BigEndian {
            bytes[..4].reverse();
            bytes[4..6].reverse();
            bytes[6..8].reverse();
        }
        Guid::from_buffer(&bytes).map_err(|e| conversion("guid", e))?;

        self.bytes = bytes;
        Ok(())
    }

    pub fn to_text(&self, flags: u32) -> Result<String> {
        let format = GuidFormat::from_bits(flags).ok_or(ValueError::UnsupportedFormat {
            what: "guid format",
            flags,
        })?;
        let guid = Guid::from_buffer(&self.bytes).map_err(|e| conversion("guid", e))?;

        let text = guid.to_string();
        let text = text.trim_matches(|c| c == '{' || c == '}');
        let text = if format.contains(GuidFormat::UPPER_CASE) {
            text.to_ascii_uppercase()
        } else {
            text.to_ascii_lowercase()
        };

        Ok(if format.contains(GuidFormat::SURROUNDING_BRACES) {
            format!("{{{}}}", text)
        } else {
            text
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LITTLE_ENDIAN_GUID: [u8; 16] = [
        0x25, 0x96, 0x84, 0x54, 0x78, 0x54, 0x94, 0x49, 0xa5, 0xba, 0x3e, 0x3b, 0x03, 0x28, 0xc3,
        0x0d,
    ];

    #[test]
    fn test_renders_lower_case_by_default() {
        let mut guid = GuidValue::new();
        guid.copy_from_byte_stream(
            &LITTLE_ENDIAN_GUID,
            DataEncoding::Endianness(Endianness::LittleEndian),
        )
        .unwrap();
        assert_eq!(guid.to_text(0).unwrap(), "54849625-5478-4994-a5ba-3e3b0328c30d");
        assert_eq!(
            guid.to_text((GuidFormat::UPPER_CASE | GuidFormat::SURROUNDING_BRACES).bits())
                .unwrap(),
            "{54849625-5478-4994-A5BA-3E3B0328C30D}"
        );
        assert!(guid.to_text(0x10).is_err());
    }

    #[test]
    fn test_big_endian_input() {
        let big_endian = [
            0x54, 0x84, 0x96, 0x25, 0x54, 0x78, 0x49, 0x94, 0xa5, 0xba, 0x3e, 0x3b, 0x03, 0x28,
            0xc3, 0x0d,
        ];
        let mut guid = GuidValue::new();
        guid.copy_from_byte_stream(&big_endian, DataEncoding::Endianness(Endianness::BigEndian))
            .unwrap();
        assert_eq!(guid.as_bytes(), &LITTLE_ENDIAN_GUID);

        assert!(
            guid.copy_from_byte_stream(
                &big_endian[..15],
                DataEncoding::Endianness(Endianness::BigEndian)
            )
            .is_err()
        );
    }
}
