//! String leaf: text decoded from a codepage tagged byte stream.

use crate::codepage::Codepage;
use crate::data_handle::{DataEncoding, Endianness};
use crate::err::{Result, ValueError};

use log::trace;

/// The string value types, they differ in the encodings they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// Any codepage, the encoding must name it.
    ByteStream,
    Utf8,
    Utf16,
    Utf32,
}

impl StringKind {
    /// The codepage `encoding` selects for this kind of string.
    ///
    /// Unicode kinds accept a byte order (UTF-16 and UTF-32) or a matching codepage, and
    /// default to UTF-8 or little-endian when no encoding is given.
    pub fn codepage(self, encoding: DataEncoding) -> Result<Codepage> {
        let unsupported = || ValueError::UnsupportedEncoding {
            what: "string byte stream",
            encoding: encoding.to_string(),
        };

        let codepage = match (self, encoding) {
            (StringKind::ByteStream, DataEncoding::Codepage(codepage)) => codepage,
            (StringKind::ByteStream, _) => return Err(unsupported()),

            (StringKind::Utf8, DataEncoding::None | DataEncoding::Endianness(_)) => Codepage::Utf8,
            (StringKind::Utf8, DataEncoding::Codepage(cp @ (Codepage::Utf8 | Codepage::Utf7))) => {
                cp
            }

            (StringKind::Utf16, DataEncoding::None) => Codepage::Utf16LittleEndian,
            (StringKind::Utf16, DataEncoding::Endianness(e)) => match e.resolve() {
                Endianness::BigEndian => Codepage::Utf16BigEndian,
                _ => Codepage::Utf16LittleEndian,
            },
            (
                StringKind::Utf16,
                DataEncoding::Codepage(
                    cp @ (Codepage::Utf16LittleEndian
                    | Codepage::Utf16BigEndian
                    | Codepage::Utf16LittleEndianMixed),
                ),
            ) => cp,

            (StringKind::Utf32, DataEncoding::None) => Codepage::Utf32LittleEndian,
            (StringKind::Utf32, DataEncoding::Endianness(e)) => match e.resolve() {
                Endianness::BigEndian => Codepage::Utf32BigEndian,
                _ => Codepage::Utf32LittleEndian,
            },
            (
                StringKind::Utf32,
                DataEncoding::Codepage(cp @ (Codepage::Utf32LittleEndian | Codepage::Utf32BigEndian)),
            ) => cp,

            _ => return Err(unsupported()),
        };

        Ok(codepage)
    }

    fn default_codepage(self) -> Codepage {
        match self {
            StringKind::ByteStream => Codepage::Ascii,
            StringKind::Utf8 => Codepage::Utf8,
            StringKind::Utf16 => Codepage::Utf16LittleEndian,
            StringKind::Utf32 => Codepage::Utf32LittleEndian,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringValue {
    kind: StringKind,
    codepage: Codepage,
    text: String,
}

impl StringValue {
    pub fn new(kind: StringKind) -> Self {
        StringValue {
            kind,
            codepage: kind.default_codepage(),
            text: String::new(),
        }
    }

    pub fn kind(&self) -> StringKind {
        self.kind
    }

    pub fn codepage(&self) -> Codepage {
        self.codepage
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let codepage = self.kind.codepage(encoding)?;
        let text = codepage.decode(data)?;
        trace!(
            "decoded {} bytes of {} into {} characters",
            data.len(),
            codepage.name(),
            text.chars().count()
        );

        self.codepage = codepage;
        self.text = text;
        Ok(())
    }

    /// The text encoded in `encoding` (or the codepage it was read with), no terminator.
    pub fn copy_to_byte_stream(&self, encoding: DataEncoding) -> Result<Vec<u8>> {
        let codepage = match encoding {
            DataEncoding::None => self.codepage,
            _ => self.kind.codepage(encoding)?,
        };
        codepage.encode(&self.text)
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    /// Replaces the text. It must be representable in the string's codepage.
    pub fn from_text(&mut self, text: &str) -> Result<()> {
        self.codepage.encode(text)?;
        self.text = text.to_owned();
        Ok(())
    }
}
