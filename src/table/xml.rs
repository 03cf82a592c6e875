//! A lenient single-pass scanner for `<table><identifier>text</identifier>...</table>`.
//!
//! This is not an XML parser: attributes are skipped, entities are not expanded, nesting
//! inside a value is taken as text, and the first NUL byte ends the input.

use crate::codepage::Codepage;
use crate::data_handle::{DataEncoding, Endianness};
use crate::err::{Result, conversion, invalid_argument};
use crate::value_type::ValueType;

use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState<'x> {
    SearchingTable,
    InTable,
    InValue {
        identifier: &'x [u8],
        text_start: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tag<'x> {
    name: &'x [u8],
    closing: bool,
    self_closing: bool,
    /// Index just past the `>`.
    end: usize,
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

/// Reads the tag whose `<` is at `start`. `None` when the input ends inside the tag.
fn read_tag(xml: &[u8], start: usize) -> Option<Tag<'_>> {
    let mut position = start + 1;
    let closing = xml.get(position) == Some(&b'/');
    if closing {
        position += 1;
    }

    let name_start = position;
    while position < xml.len() && !is_name_end(xml[position]) {
        position += 1;
    }
    let name = &xml[name_start..position];

    let close = position + xml[position..].iter().position(|&b| b == b'>')?;
    let self_closing = !closing && close > name_start && xml[close - 1] == b'/';

    Some(Tag {
        name,
        closing,
        self_closing,
        end: close + 1,
    })
}

/// Start of the first `</name` at or after `from` that is followed by `>` or whitespace.
fn find_close_tag(xml: &[u8], from: usize, name: &[u8]) -> Option<usize> {
    let mut position = from;
    while let Some(offset) = xml[position..].windows(2).position(|w| w == b"</") {
        let start = position + offset;
        let after = start + 2 + name.len();
        if xml[start + 2..].starts_with(name)
            && xml
                .get(after)
                .is_some_and(|&b| b == b'>' || b.is_ascii_whitespace())
        {
            return Some(start);
        }
        position = start + 2;
    }
    None
}

fn next_open_bracket(xml: &[u8], from: usize) -> Option<usize> {
    xml[from..].iter().position(|&b| b == b'<').map(|offset| from + offset)
}

/// Scans `xml` for the `table_tag` element and calls `on_value` for each child with its
/// name and text, `None` text for a self-closing child.
///
/// Returns `true` when the table element was found and closed.
pub(super) fn scan<'x, F>(xml: &'x [u8], table_tag: &[u8], mut on_value: F) -> Result<bool>
where
    F: FnMut(&'x [u8], Option<&'x [u8]>) -> Result<()>,
{
    let xml = match xml.iter().position(|&b| b == 0) {
        Some(nul) => &xml[..nul],
        None => xml,
    };
    let table_name = String::from_utf8_lossy(table_tag);
    let unterminated = || {
        warn!("input ended before the `{}` table was closed", table_name);
        Ok(false)
    };

    let mut state = ScanState::SearchingTable;
    let mut position = 0;
    let mut count = 0;

    loop {
        match state {
            ScanState::SearchingTable => {
                let Some(tag) = next_open_bracket(xml, position).and_then(|at| read_tag(xml, at))
                else {
                    debug!("no `{}` table in {} bytes of input", table_name, xml.len());
                    return Ok(false);
                };
                position = tag.end;

                if !tag.closing && tag.name == table_tag {
                    if tag.self_closing {
                        return Ok(true);
                    }
                    state = ScanState::InTable;
                }
            }
            ScanState::InTable => {
                let Some(tag) = next_open_bracket(xml, position).and_then(|at| read_tag(xml, at))
                else {
                    return unterminated();
                };
                position = tag.end;

                if tag.closing {
                    if tag.name == table_tag {
                        trace!("read {} values from the `{}` table", count, table_name);
                        return Ok(true);
                    }
                    continue;
                }
                // Comments, processing instructions and empty names.
                if tag.name.is_empty() || tag.name[0] == b'!' || tag.name[0] == b'?' {
                    continue;
                }

                if tag.self_closing {
                    on_value(tag.name, None)?;
                    count += 1;
                } else {
                    state = ScanState::InValue {
                        identifier: tag.name,
                        text_start: tag.end,
                    };
                }
            }
            ScanState::InValue {
                identifier,
                text_start,
            } => {
                let Some(close) = find_close_tag(xml, text_start, identifier) else {
                    return unterminated();
                };
                on_value(identifier, Some(&xml[text_start..close]))?;
                count += 1;

                let Some(end) = xml[close..].iter().position(|&b| b == b'>') else {
                    return unterminated();
                };
                position = close + end + 1;
                state = ScanState::InTable;
            }
        }
    }
}

/// The data and encoding a string value of `value_type` stores `text` with, terminator
/// included.
pub(super) fn encode_text(value_type: ValueType, text: &[u8]) -> Result<(Vec<u8>, DataEncoding)> {
    let little_endian = DataEncoding::Endianness(Endianness::LittleEndian);

    match value_type {
        ValueType::StringByteStream | ValueType::StringUtf8 => {
            let mut data = Vec::with_capacity(text.len() + 1);
            data.extend_from_slice(text);
            data.push(0);
            Ok((data, DataEncoding::Codepage(Codepage::Utf8)))
        }
        ValueType::StringUtf16 => {
            let text = std::str::from_utf8(text).map_err(|e| conversion("xml value text", e))?;
            let mut data: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
            data.extend_from_slice(&[0, 0]);
            Ok((data, little_endian))
        }
        ValueType::StringUtf32 => {
            let text = std::str::from_utf8(text).map_err(|e| conversion("xml value text", e))?;
            let mut data: Vec<u8> = text.chars().flat_map(|c| u32::from(c).to_le_bytes()).collect();
            data.extend_from_slice(&[0, 0, 0, 0]);
            Ok((data, little_endian))
        }
        other => Err(invalid_argument(
            "value_type",
            format!("{} is not a string type", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Collected = Vec<(String, Option<String>)>;

    fn collect(xml: &[u8], table_tag: &[u8]) -> (bool, Collected) {
        let mut values = Vec::new();
        let closed = scan(xml, table_tag, |identifier, text| {
            values.push((
                String::from_utf8_lossy(identifier).into_owned(),
                text.map(|t| String::from_utf8_lossy(t).into_owned()),
            ));
            Ok(())
        })
        .unwrap();
        (closed, values)
    }

    fn value(identifier: &str, text: Option<&str>) -> (String, Option<String>) {
        (identifier.to_string(), text.map(str::to_string))
    }

    #[test]
    fn test_two_values() {
        let (closed, values) = collect(b"<root><a>1</a><b>2</b></root>", b"root");
        assert!(closed);
        assert_eq!(values, vec![value("a", Some("1")), value("b", Some("2"))]);
    }

    #[test]
    fn test_truncated_input_keeps_values() {
        let (closed, values) = collect(b"<root><a>1</a><b>2", b"root");
        assert!(!closed);
        assert_eq!(values, vec![value("a", Some("1"))]);

        let (closed, values) = collect(b"<root><a>1</a>", b"root");
        assert!(!closed);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_attributes_and_prolog_are_skipped() {
        let xml = b"<?xml version=\"1.0\"?>\n<other/><root version=\"2\">\n  <!-- note -->\n  <a kind=\"x\">text</a >\n  <empty/>\n</root>";
        let (closed, values) = collect(xml, b"root");
        assert!(closed);
        assert_eq!(values, vec![value("a", Some("text")), value("empty", None)]);
    }

    #[test]
    fn test_value_text_is_verbatim() {
        let (_, values) = collect(b"<t><a>x <ab>y</ab> &amp;</a></t>", b"t");
        assert_eq!(values, vec![value("a", Some("x <ab>y</ab> &amp;"))]);
    }

    #[test]
    fn test_nul_ends_input() {
        let (closed, values) = collect(b"<t><a>1</a>\0<b>2</b></t>", b"t");
        assert!(!closed);
        assert_eq!(values, vec![value("a", Some("1"))]);
    }

    #[test]
    fn test_table_tag_must_match_exactly() {
        let (closed, values) = collect(b"<rootx><a>1</a></rootx>", b"root");
        assert!(!closed);
        assert!(values.is_empty());

        let (closed, _) = collect(b"<root/>", b"root");
        assert!(closed);
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(
            encode_text(ValueType::StringUtf8, b"ab").unwrap(),
            (b"ab\0".to_vec(), DataEncoding::Codepage(Codepage::Utf8))
        );
        assert_eq!(
            encode_text(ValueType::StringUtf16, b"ab").unwrap().0,
            b"a\0b\0\0\0".to_vec()
        );
        assert!(encode_text(ValueType::Guid, b"ab").is_err());
    }
}
