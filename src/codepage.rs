//! Codepages a string value can be tagged with.
//!
//! Unicode transforms are handled in-crate, everything else goes through the `encoding`
//! crate's Windows codepage table.

use crate::err::{Result, ValueError, conversion};
use crate::utils::unicode::{utf7_decode, utf7_encode};

use encoding::all::ASCII;
use encoding::label::encoding_from_windows_code_page;
use encoding::{DecoderTrap, EncoderTrap, Encoding, EncodingRef};
use log::warn;

macro_rules! codepages {
    ($($variant:ident = $id:literal => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Codepage {
            $($variant),+
        }

        impl Codepage {
            /// Every known codepage, in declaration order.
            pub const ALL: &'static [Codepage] = &[$(Codepage::$variant),+];

            pub fn from_id(id: u32) -> Result<Codepage> {
                match id {
                    $($id => Ok(Codepage::$variant),)+
                    _ => Err(ValueError::UnsupportedCodepage { codepage: id }),
                }
            }

            pub fn id(self) -> u32 {
                match self {
                    $(Codepage::$variant => $id),+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Codepage::$variant => $name),+
                }
            }
        }
    };
}

/// Identifier of the SCSU pseudo codepage. Not a Windows codepage.
pub const CODEPAGE_SCSU: u32 = 0x0001_0000;
/// Identifier of UTF-16 little-endian with ASCII fallback. Not a Windows codepage.
pub const CODEPAGE_UTF16_LITTLE_ENDIAN_MIXED: u32 = 0x0001_04b0;

codepages! {
    Ascii = 20127 => "ascii",
    Iso8859_1 = 28591 => "iso-8859-1",
    Iso8859_2 = 28592 => "iso-8859-2",
    Iso8859_3 = 28593 => "iso-8859-3",
    Iso8859_4 = 28594 => "iso-8859-4",
    Iso8859_5 = 28595 => "iso-8859-5",
    Iso8859_6 = 28596 => "iso-8859-6",
    Iso8859_7 = 28597 => "iso-8859-7",
    Iso8859_8 = 28598 => "iso-8859-8",
    Iso8859_9 = 28599 => "iso-8859-9",
    Iso8859_10 = 28600 => "iso-8859-10",
    Iso8859_11 = 28601 => "iso-8859-11",
    Iso8859_13 = 28603 => "iso-8859-13",
    Iso8859_14 = 28604 => "iso-8859-14",
    Iso8859_15 = 28605 => "iso-8859-15",
    Iso8859_16 = 28606 => "iso-8859-16",
    Koi8R = 20866 => "koi8-r",
    Koi8U = 21866 => "koi8-u",
    Utf7 = 65000 => "utf-7",
    Utf8 = 65001 => "utf-8",
    Utf16LittleEndian = 1200 => "utf-16le",
    Utf16BigEndian = 1201 => "utf-16be",
    Utf32LittleEndian = 12000 => "utf-32le",
    Utf32BigEndian = 12001 => "utf-32be",
    Windows874 = 874 => "windows-874",
    Windows932 = 932 => "windows-932",
    Windows936 = 936 => "windows-936",
    Windows949 = 949 => "windows-949",
    Windows950 = 950 => "windows-950",
    Windows1250 = 1250 => "windows-1250",
    Windows1251 = 1251 => "windows-1251",
    Windows1252 = 1252 => "windows-1252",
    Windows1253 = 1253 => "windows-1253",
    Windows1254 = 1254 => "windows-1254",
    Windows1255 = 1255 => "windows-1255",
    Windows1256 = 1256 => "windows-1256",
    Windows1257 = 1257 => "windows-1257",
    Windows1258 = 1258 => "windows-1258",
    Scsu = 0x0001_0000 => "scsu",
    Utf16LittleEndianMixed = 0x0001_04b0 => "utf-16le-mixed",
}

impl Codepage {
    /// Size in bytes of one code unit, which is also the size of the terminator.
    pub fn code_unit_size(self) -> usize {
        match self {
            Codepage::Utf16LittleEndian
            | Codepage::Utf16BigEndian
            | Codepage::Utf16LittleEndianMixed => 2,
            Codepage::Utf32LittleEndian | Codepage::Utf32BigEndian => 4,
            _ => 1,
        }
    }

    fn single_byte_codec(self) -> Result<EncodingRef> {
        if self == Codepage::Ascii {
            return Ok(ASCII as EncodingRef);
        }
        encoding_from_windows_code_page(self.id() as usize)
            .ok_or(ValueError::UnsupportedCodepage { codepage: self.id() })
    }

    /// Decodes `data` up to the first NUL code unit.
    pub fn decode(self, data: &[u8]) -> Result<String> {
        let data = truncate_at_nul(data, self.code_unit_size());

        match self {
            Codepage::Utf8 => std::str::from_utf8(data)
                .map(str::to_owned)
                .map_err(|e| conversion("utf-8 string", e)),
            Codepage::Utf7 => utf7_decode(data),
            Codepage::Utf16LittleEndian => decode_utf16(data, u16::from_le_bytes),
            Codepage::Utf16BigEndian => decode_utf16(data, u16::from_be_bytes),
            Codepage::Utf32LittleEndian => decode_utf32(data, u32::from_le_bytes),
            Codepage::Utf32BigEndian => decode_utf32(data, u32::from_be_bytes),
            Codepage::Utf16LittleEndianMixed => match decode_utf16(data, u16::from_le_bytes) {
                Ok(text) => Ok(text),
                Err(e) => {
                    warn!("{}; falling back to ascii", e);
                    let data = truncate_at_nul(data, 1);
                    ASCII
                        .decode(data, DecoderTrap::Replace)
                        .map_err(|e| conversion("ascii string", e))
                }
            },
            Codepage::Iso8859_1 => Ok(data.iter().map(|&b| char::from(b)).collect()),
            Codepage::Scsu => Err(ValueError::Unimplemented {
                operation: crate::err::RuntimeOperation::Copy,
                what: "scsu string",
            }),
            _ => self
                .single_byte_codec()?
                .decode(data, DecoderTrap::Strict)
                .map_err(|e| conversion("codepage string", e)),
        }
    }

    /// Encodes `text` without a terminator.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Codepage::Utf8 => Ok(text.as_bytes().to_vec()),
            Codepage::Utf7 => Ok(utf7_encode(text)),
            Codepage::Utf16LittleEndian => {
                Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect())
            }
            Codepage::Utf16BigEndian => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Codepage::Utf32LittleEndian => {
                Ok(text.chars().flat_map(|c| u32::from(c).to_le_bytes()).collect())
            }
            Codepage::Utf32BigEndian => {
                Ok(text.chars().flat_map(|c| u32::from(c).to_be_bytes()).collect())
            }
            Codepage::Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)))
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map_err(|e| conversion("iso-8859-1 string", e)),
            Codepage::Scsu | Codepage::Utf16LittleEndianMixed => Err(ValueError::Unimplemented {
                operation: crate::err::RuntimeOperation::Copy,
                what: "string into codepage",
            }),
            _ => self
                .single_byte_codec()?
                .encode(text, EncoderTrap::Strict)
                .map_err(|e| conversion("codepage string", e)),
        }
    }
}

fn truncate_at_nul(data: &[u8], unit_size: usize) -> &[u8] {
    let end = data
        .chunks_exact(unit_size)
        .position(|unit| unit.iter().all(|&b| b == 0))
        .map_or(data.len(), |position| position * unit_size);
    &data[..end]
}

fn decode_utf16(data: &[u8], read: fn([u8; 2]) -> u16) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(conversion(
            "utf-16 string",
            format!("odd byte count {}", data.len()),
        ));
    }
    let units = data.chunks_exact(2).map(|pair| read([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| conversion("utf-16 string", e))
}

fn decode_utf32(data: &[u8], read: fn([u8; 4]) -> u32) -> Result<String> {
    if data.len() % 4 != 0 {
        return Err(conversion(
            "utf-32 string",
            format!("byte count {} is not a multiple of 4", data.len()),
        ));
    }
    data.chunks_exact(4)
        .map(|quad| {
            let unit = read([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(unit)
                .ok_or_else(|| conversion("utf-32 string", format!("invalid scalar 0x{:x}", unit)))
        })
        .collect()
}
