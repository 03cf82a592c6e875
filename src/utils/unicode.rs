//! Code unit abstraction over UTF-8, UTF-16 and UTF-32 buffers, plus the UTF-7 transform.

use crate::err::{Result, conversion, out_of_bounds};
use crate::instance::{InstanceOps, StringOps};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;

/// A code unit of a Unicode transform format: `u8` for UTF-8, `u16` for UTF-16 and `u32`
/// for UTF-32. A zero code unit is the string terminator.
pub trait CodeUnit: Copy + Default + Eq + From<u8> + Into<u32> + fmt::Debug + 'static {
    const NAME: &'static str;

    /// Number of code units `text` encodes to, without terminator.
    fn encoded_len(text: &str) -> usize;

    fn encode_into(text: &str, out: &mut Vec<Self>);

    fn decode(units: &[Self]) -> Result<String>;

    /// The string conversions of `ops` for this code unit.
    fn string_ops(ops: &InstanceOps) -> Option<&StringOps<Self>>;

    fn is_nul(self) -> bool {
        self == Self::default()
    }
}

impl CodeUnit for u8 {
    const NAME: &'static str = "utf-8";

    fn encoded_len(text: &str) -> usize {
        text.len()
    }

    fn encode_into(text: &str, out: &mut Vec<u8>) {
        out.extend_from_slice(text.as_bytes());
    }

    fn decode(units: &[u8]) -> Result<String> {
        std::str::from_utf8(units)
            .map(str::to_owned)
            .map_err(|e| conversion("utf-8 string", e))
    }

    fn string_ops(ops: &InstanceOps) -> Option<&StringOps<u8>> {
        ops.utf8.as_ref()
    }
}

impl CodeUnit for u16 {
    const NAME: &'static str = "utf-16";

    fn encoded_len(text: &str) -> usize {
        text.encode_utf16().count()
    }

    fn encode_into(text: &str, out: &mut Vec<u16>) {
        out.extend(text.encode_utf16());
    }

    fn decode(units: &[u16]) -> Result<String> {
        String::from_utf16(units).map_err(|e| conversion("utf-16 string", e))
    }

    fn string_ops(ops: &InstanceOps) -> Option<&StringOps<u16>> {
        ops.utf16.as_ref()
    }
}

impl CodeUnit for u32 {
    const NAME: &'static str = "utf-32";

    fn encoded_len(text: &str) -> usize {
        text.chars().count()
    }

    fn encode_into(text: &str, out: &mut Vec<u32>) {
        out.extend(text.chars().map(u32::from));
    }

    fn decode(units: &[u32]) -> Result<String> {
        units
            .iter()
            .map(|&unit| {
                char::from_u32(unit).ok_or_else(|| {
                    conversion("utf-32 string", format!("invalid scalar 0x{:x}", unit))
                })
            })
            .collect()
    }

    fn string_ops(ops: &InstanceOps) -> Option<&StringOps<u32>> {
        ops.utf32.as_ref()
    }
}

/// Writes `text` and a terminator at `*index`, then advances `*index` past the terminator.
pub(crate) fn write_str_with_index<U: CodeUnit>(
    text: &str,
    out: &mut [U],
    index: &mut usize,
) -> Result<()> {
    let needed = U::encoded_len(text) + 1;
    let end = index
        .checked_add(needed)
        .ok_or_else(|| out_of_bounds("string index", *index, out.len()))?;
    if end > out.len() {
        return Err(out_of_bounds("string end", end, out.len()));
    }

    let mut units = Vec::with_capacity(needed);
    U::encode_into(text, &mut units);
    units.push(U::default());
    out[*index..end].copy_from_slice(&units);
    *index = end;

    Ok(())
}

/// Same as [`write_str_with_index`] for text that is known to be ASCII.
pub(crate) fn write_ascii_with_index<U: CodeUnit>(
    ascii: &[u8],
    out: &mut [U],
    index: &mut usize,
) -> Result<()> {
    let end = index
        .checked_add(ascii.len() + 1)
        .ok_or_else(|| out_of_bounds("string index", *index, out.len()))?;
    if end > out.len() {
        return Err(out_of_bounds("string end", end, out.len()));
    }

    for (slot, &b) in out[*index..end - 1].iter_mut().zip(ascii) {
        *slot = U::from(b);
    }
    out[end - 1] = U::default();
    *index = end;

    Ok(())
}

/// The code units at `*index` up to (not including) the next terminator or the end of
/// `input`. Advances `*index` past the terminator when there is one.
pub(crate) fn units_with_index<'a, U: CodeUnit>(input: &'a [U], index: &mut usize) -> Result<&'a [U]> {
    let rest = input
        .get(*index..)
        .ok_or_else(|| out_of_bounds("string index", *index, input.len()))?;

    match rest.iter().position(|unit| unit.is_nul()) {
        Some(nul) => {
            *index += nul + 1;
            Ok(&rest[..nul])
        }
        None => {
            *index = input.len();
            Ok(rest)
        }
    }
}

/// Decodes the string at `*index`, see [`units_with_index`].
pub(crate) fn read_str_with_index<U: CodeUnit>(input: &[U], index: &mut usize) -> Result<String> {
    let mut position = *index;
    let units = units_with_index(input, &mut position)?;
    let text = U::decode(units)?;
    *index = position;
    Ok(text)
}

/// Modified base64 of RFC 2152: standard alphabet, never padded.
const UTF7_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

fn is_utf7_direct(c: char) -> bool {
    c.is_ascii_alphanumeric() || "'(),-./:? \t\r\n".contains(c)
}

fn is_utf7_base64(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

pub(crate) fn utf7_encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut shifted: Vec<u8> = Vec::new();

    let flush = |shifted: &mut Vec<u8>, out: &mut Vec<u8>| {
        if !shifted.is_empty() {
            out.push(b'+');
            out.extend_from_slice(UTF7_BASE64.encode(shifted.as_slice()).as_bytes());
            out.push(b'-');
            shifted.clear();
        }
    };

    for c in text.chars() {
        if c == '+' {
            flush(&mut shifted, &mut out);
            out.extend_from_slice(b"+-");
        } else if is_utf7_direct(c) {
            flush(&mut shifted, &mut out);
            out.push(c as u8);
        } else {
            let mut units = [0_u16; 2];
            for unit in c.encode_utf16(&mut units) {
                shifted.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
    flush(&mut shifted, &mut out);

    out
}

pub(crate) fn utf7_decode(data: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        if b != b'+' {
            if !b.is_ascii() {
                return Err(conversion(
                    "utf-7 string",
                    format!("non-ascii byte 0x{:02x} at offset {}", b, i),
                ));
            }
            units.push(u16::from(b));
            i += 1;
            continue;
        }

        let start = i + 1;
        let end = data[start..]
            .iter()
            .position(|&b| !is_utf7_base64(b))
            .map_or(data.len(), |p| start + p);

        if start == end {
            // "+-" is a literal plus; a lone "+" is taken literally as well.
            units.push(u16::from(b'+'));
        } else {
            let bytes = UTF7_BASE64
                .decode(&data[start..end])
                .map_err(|e| conversion("utf-7 string", e))?;
            if bytes.len() % 2 != 0 {
                return Err(conversion(
                    "utf-7 string",
                    format!("odd number of bytes in base64 run at offset {}", start),
                ));
            }
            units.extend(
                bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            );
        }

        i = end;
        if data.get(i) == Some(&b'-') {
            i += 1;
        }
    }

    String::from_utf16(&units).map_err(|e| conversion("utf-7 string", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_str_advances_past_terminator() {
        let mut out = [0xffff_u16; 8];
        let mut index = 1;
        write_str_with_index("h\u{e9}", &mut out, &mut index).unwrap();
        assert_eq!(index, 4);
        assert_eq!(&out[1..4], &[0x68, 0xe9, 0]);

        let mut short = [0_u8; 3];
        let mut index = 0;
        assert!(write_str_with_index("abc", &mut short, &mut index).is_err());
        assert_eq!(index, 0);
    }

    #[test]
    fn test_read_str_consumes_one_string() {
        let input = [b'a' as u32, b'b' as u32, 0, b'c' as u32];
        let mut index = 0;
        assert_eq!(read_str_with_index(&input, &mut index).unwrap(), "ab");
        assert_eq!(index, 3);
        assert_eq!(read_str_with_index(&input, &mut index).unwrap(), "c");
        assert_eq!(index, 4);
        assert!(read_str_with_index(&input, &mut 5).is_err());
    }

    #[test]
    fn test_utf7_rfc_samples() {
        assert_eq!(utf7_decode(b"Hi Mom -+Jjo--!").unwrap(), "Hi Mom -\u{263a}-!");
        assert_eq!(utf7_decode(b"A+ImIDkQ.").unwrap(), "A\u{2262}\u{391}.");
        assert_eq!(utf7_decode(b"1 +- 1").unwrap(), "1 + 1");
    }

    #[test]
    fn test_utf7_rejects_partial_code_unit() {
        // Four base64 characters decode to three bytes.
        assert!(utf7_decode(b"a+AGEA-b").is_err());
        assert_eq!(utf7_decode(b"+AGE-").unwrap(), "a");
    }

    #[test]
    fn test_utf7_encode_round_trips() {
        for text in ["A\u{2262}\u{391}.", "a + b", "\u{65e5}\u{672c}\u{8a9e}", "\u{1f600}!"] {
            let encoded = utf7_encode(text);
            assert!(encoded.is_ascii());
            assert_eq!(utf7_decode(&encoded).unwrap(), text);
        }
        assert_eq!(utf7_encode("A\u{2262}\u{391}."), b"A+ImIDkQ-.");
    }
}
