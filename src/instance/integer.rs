//! Integer leaf: a value widened to 64 bits plus the bit width it was read with.

use crate::data_handle::DataEncoding;
use crate::err::{Result, RuntimeOperation, ValueError, invalid_argument};
use crate::utils::bytes::{read_uint, write_uint};
use crate::utils::unicode::CodeUnit;

use bitflags::bitflags;

bitflags! {
    /// Rendering flags of integers. The low byte selects the format type, the remaining
    /// bits are modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntegerFormat: u32 {
        const DECIMAL = 0x0000_0001;
        const HEXADECIMAL = 0x0000_0002;
        const BOOLEAN = 0x0000_0003;

        const SIGNED = 0x0000_0100;
        const UNSIGNED = 0x0000_0200;

        const NO_BASE_INDICATOR = 0x0001_0000;
    }
}

const FORMAT_TYPE_MASK: u32 = 0x0000_00ff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatType {
    Decimal,
    Hexadecimal,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Format {
    format_type: FormatType,
    signed: bool,
    base_indicator: bool,
}

impl Format {
    fn parse(flags: u32) -> Result<Format> {
        let unsupported = ValueError::UnsupportedFormat {
            what: "integer format",
            flags,
        };
        if flags & !(FORMAT_TYPE_MASK | IntegerFormat::all().bits()) != 0 {
            return Err(unsupported);
        }

        let format_type = match flags & FORMAT_TYPE_MASK {
            0x01 => FormatType::Decimal,
            0x02 => FormatType::Hexadecimal,
            0x03 => FormatType::Boolean,
            _ => return Err(unsupported),
        };

        let modifiers = IntegerFormat::from_bits_truncate(flags & !FORMAT_TYPE_MASK);
        if modifiers.contains(IntegerFormat::SIGNED | IntegerFormat::UNSIGNED) {
            return Err(unsupported);
        }

        Ok(Format {
            format_type,
            signed: modifiers.contains(IntegerFormat::SIGNED),
            base_indicator: !modifiers.contains(IntegerFormat::NO_BASE_INDICATOR),
        })
    }
}

fn check_bit_width(bit_width: usize) -> Result<()> {
    match bit_width {
        8 | 16 | 32 | 64 => Ok(()),
        _ => Err(ValueError::UnsupportedBitWidth { bit_width }),
    }
}

fn mask(bit_width: usize) -> u64 {
    if bit_width >= 64 {
        u64::MAX
    } else {
        (1_u64 << bit_width) - 1
    }
}

/// Largest number of decimal digits an unsigned value of `bit_width` bits can need.
fn max_decimal_digits(bit_width: usize) -> usize {
    match bit_width {
        8 => 3,
        16 => 5,
        32 => 10,
        _ => 20,
    }
}

/// The power of ten of the most significant digit of `magnitude` and the number of digits.
///
/// Both the size query and the digit emission go through this, so they cannot disagree.
fn decimal_divider(magnitude: u64) -> (u64, usize) {
    let mut divider = 1_u64;
    let mut digits = 1;
    while magnitude / divider >= 10 {
        divider *= 10;
        digits += 1;
    }
    (divider, digits)
}

/// Longest rendering: sign and 20 digits.
const MAX_RENDERED_LEN: usize = 21;

/// An ASCII rendering of an integer, without terminator.
pub(crate) struct Rendered {
    buf: [u8; MAX_RENDERED_LEN],
    len: usize,
}

impl Rendered {
    fn new() -> Self {
        Rendered {
            buf: [0; MAX_RENDERED_LEN],
            len: 0,
        }
    }

    fn push(&mut self, b: u8) {
        self.buf[self.len] = b;
        self.len += 1;
    }

    fn extend(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&b| self.push(b));
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub(crate) fn as_str(&self) -> &str {
        // Only ASCII is ever pushed.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Integer {
    value: u64,
    bit_width: usize,
}

impl Default for Integer {
    fn default() -> Self {
        Integer::new(64)
    }
}

impl Integer {
    pub fn new(bit_width: usize) -> Self {
        Integer {
            value: 0,
            bit_width,
        }
    }

    pub fn with_value(value: u64, bit_width: usize) -> Result<Self> {
        let mut integer = Integer::new(bit_width);
        integer.copy_from_integer(value, bit_width)?;
        Ok(integer)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    /// The value sign-extended from its bit width.
    pub fn as_signed(&self) -> i64 {
        let shift = 64 - self.bit_width.clamp(1, 64);
        ((self.value << shift) as i64) >> shift
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what: "integer byte stream",
                encoding: encoding.to_string(),
            })?;

        self.value = read_uint("integer byte stream", data, endianness)?;
        self.bit_width = data.len() * 8;
        Ok(())
    }

    pub fn copy_to_byte_stream(&self, encoding: DataEncoding) -> Result<Vec<u8>> {
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what: "integer byte stream",
                encoding: encoding.to_string(),
            })?;

        write_uint("integer byte stream", self.value, self.bit_width / 8, endianness)
    }

    pub fn copy_from_integer(&mut self, value: u64, bit_width: usize) -> Result<()> {
        check_bit_width(bit_width)?;
        self.value = value & mask(bit_width);
        self.bit_width = bit_width;
        Ok(())
    }

    pub fn copy_to_integer(&self) -> (u64, usize) {
        (self.value, self.bit_width)
    }

    pub(crate) fn render(&self, flags: u32) -> Result<Rendered> {
        check_bit_width(self.bit_width)?;
        let format = Format::parse(flags)?;
        let mut out = Rendered::new();

        match format.format_type {
            FormatType::Boolean => {
                out.extend(if self.value != 0 { &b"true"[..] } else { &b"false"[..] });
            }
            FormatType::Hexadecimal => {
                if format.base_indicator {
                    out.extend(b"0x");
                }
                for nibble in (0..self.bit_width / 4).rev() {
                    let digit = ((self.value >> (nibble * 4)) & 0x0f) as u8;
                    out.push(match digit {
                        0..=9 => b'0' + digit,
                        _ => b'a' + digit - 10,
                    });
                }
            }
            FormatType::Decimal => {
                let mut magnitude = self.value & mask(self.bit_width);
                if format.signed && (magnitude >> (self.bit_width - 1)) & 1 == 1 {
                    magnitude = (!magnitude).wrapping_add(1) & mask(self.bit_width);
                    out.push(b'-');
                }

                let (mut divider, _) = decimal_divider(magnitude);
                while divider > 0 {
                    out.push(b'0' + ((magnitude / divider) % 10) as u8);
                    divider /= 10;
                }
            }
        }

        Ok(out)
    }

    /// Number of code units the rendering takes, terminator included.
    pub fn string_size(&self, flags: u32) -> Result<usize> {
        check_bit_width(self.bit_width)?;
        let format = Format::parse(flags)?;

        let size = match format.format_type {
            FormatType::Boolean if self.value != 0 => 4,
            FormatType::Boolean => 5,
            FormatType::Hexadecimal => {
                self.bit_width / 4 + if format.base_indicator { 2 } else { 0 }
            }
            FormatType::Decimal => {
                let mut magnitude = self.value & mask(self.bit_width);
                let mut sign = 0;
                if format.signed && (magnitude >> (self.bit_width - 1)) & 1 == 1 {
                    magnitude = (!magnitude).wrapping_add(1) & mask(self.bit_width);
                    sign = 1;
                }
                sign + decimal_divider(magnitude).1
            }
        };

        Ok(size + 1)
    }

    /// Parses the code units of one string (terminator excluded) into the value, keeping
    /// the current bit width.
    pub(crate) fn parse_units<U: CodeUnit>(&mut self, units: &[U], flags: u32) -> Result<()> {
        check_bit_width(self.bit_width)?;
        let format = Format::parse(flags)?;

        let value = match format.format_type {
            FormatType::Boolean => parse_boolean(units)?,
            FormatType::Hexadecimal => parse_hexadecimal(units, self.bit_width)?,
            FormatType::Decimal => parse_decimal(units, self.bit_width, format.signed)?,
        };

        self.value = value & mask(self.bit_width);
        Ok(())
    }
}

fn unit(units: &[impl CodeUnit], index: usize) -> Option<u32> {
    units.get(index).map(|&u| u.into())
}

fn parse_boolean<U: CodeUnit>(units: &[U]) -> Result<u64> {
    let matches = |literal: &[u8]| {
        units.len() == literal.len()
            && units
                .iter()
                .zip(literal)
                .all(|(&u, &b)| Into::<u32>::into(u) == u32::from(b))
    };

    if matches(b"true") {
        Ok(1)
    } else if matches(b"false") {
        Ok(0)
    } else {
        Err(ValueError::Runtime {
            operation: RuntimeOperation::Copy,
            what: "boolean string",
            reason: "expected `true` or `false`".to_string(),
        })
    }
}

fn parse_hexadecimal<U: CodeUnit>(units: &[U], bit_width: usize) -> Result<u64> {
    let mut index = 0;
    // Only the lower case marker is recognised.
    if unit(units, 0) == Some(u32::from(b'0')) && unit(units, 1) == Some(u32::from(b'x')) {
        index = 2;
    } else if unit(units, 0) == Some(u32::from(b'x')) {
        index = 1;
    }

    let digits = &units[index..];
    let max_digits = bit_width / 4;
    if digits.is_empty() {
        return Err(invalid_argument("string", "missing hexadecimal digits"));
    }
    if digits.len() > max_digits {
        return Err(ValueError::StringTooLarge {
            what: "hexadecimal integer string",
            max_digits,
        });
    }

    let mut value = 0_u64;
    for (offset, &u) in digits.iter().enumerate() {
        let character: u32 = u.into();
        let digit = char::from_u32(character)
            .and_then(|c| c.to_digit(16))
            .ok_or(ValueError::UnsupportedCharacter {
                what: "hexadecimal integer string",
                character,
                index: index + offset,
            })?;
        value = (value << 4) | u64::from(digit);
    }

    Ok(value)
}

fn parse_decimal<U: CodeUnit>(units: &[U], bit_width: usize, signed: bool) -> Result<u64> {
    let mut index = 0;
    let mut negative = false;
    match unit(units, 0).and_then(char::from_u32) {
        Some('-') => {
            negative = true;
            index = 1;
        }
        Some('+') => index = 1,
        _ => {}
    }

    let digits = &units[index..];
    let max_digits = max_decimal_digits(bit_width);
    if digits.is_empty() {
        return Err(invalid_argument("string", "missing decimal digits"));
    }
    if digits.len() > max_digits {
        return Err(ValueError::StringTooLarge {
            what: "decimal integer string",
            max_digits,
        });
    }

    let mut magnitude = 0_u64;
    for (offset, &u) in digits.iter().enumerate() {
        let character: u32 = u.into();
        let digit = char::from_u32(character)
            .and_then(|c| c.to_digit(10))
            .ok_or(ValueError::UnsupportedCharacter {
                what: "decimal integer string",
                character,
                index: index + offset,
            })?;
        magnitude = magnitude
            .checked_mul(10)
            .and_then(|m| m.checked_add(u64::from(digit)))
            .ok_or(ValueError::ValueOutOfRange {
                value: magnitude,
                bit_width,
            })?;
    }

    let signed_limit = 1_u64 << (bit_width - 1);
    let out_of_range = ValueError::ValueOutOfRange {
        value: magnitude,
        bit_width,
    };

    if negative {
        if magnitude > signed_limit {
            return Err(out_of_range);
        }
        if magnitude == 0 {
            return Ok(0);
        }
        Ok(!(magnitude - 1) & mask(bit_width))
    } else if (signed && magnitude >= signed_limit) || magnitude > mask(bit_width) {
        Err(out_of_range)
    } else {
        Ok(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handle::Endianness;
    use crate::err::ErrorDomain;
    use pretty_assertions::assert_eq;

    const UNSIGNED_DECIMAL: u32 = IntegerFormat::DECIMAL.bits() | IntegerFormat::UNSIGNED.bits();
    const SIGNED_DECIMAL: u32 = IntegerFormat::DECIMAL.bits() | IntegerFormat::SIGNED.bits();
    const BARE_HEX: u32 =
        IntegerFormat::HEXADECIMAL.bits() | IntegerFormat::NO_BASE_INDICATOR.bits();

    fn render(value: u64, bit_width: usize, flags: u32) -> String {
        let integer = Integer::with_value(value, bit_width).unwrap();
        let rendered = integer.render(flags).unwrap();
        assert_eq!(
            integer.string_size(flags).unwrap(),
            rendered.as_bytes().len() + 1
        );
        rendered.as_str().to_string()
    }

    fn parse(text: &str, bit_width: usize, flags: u32) -> Result<u64> {
        let mut integer = Integer::new(bit_width);
        integer.parse_units(text.as_bytes(), flags)?;
        Ok(integer.value())
    }

    #[test]
    fn test_renders_decimal_and_hexadecimal() {
        assert_eq!(render(42, 32, UNSIGNED_DECIMAL), "42");
        assert_eq!(render(42, 32, BARE_HEX), "0000002a");
        assert_eq!(render(42, 16, IntegerFormat::HEXADECIMAL.bits()), "0x002a");
        assert_eq!(render(0, 8, UNSIGNED_DECIMAL), "0");
        assert_eq!(render(u64::MAX, 64, UNSIGNED_DECIMAL), "18446744073709551615");
    }

    #[test]
    fn test_renders_signed_decimal() {
        assert_eq!(render(0xff, 8, SIGNED_DECIMAL), "-1");
        assert_eq!(render(0x80, 8, SIGNED_DECIMAL), "-128");
        assert_eq!(render(0x7f, 8, SIGNED_DECIMAL), "127");
        assert_eq!(render(0xff, 8, UNSIGNED_DECIMAL), "255");
        assert_eq!(render(1 << 63, 64, SIGNED_DECIMAL), "-9223372036854775808");
    }

    #[test]
    fn test_renders_boolean() {
        let boolean = IntegerFormat::BOOLEAN.bits();
        assert_eq!(render(0, 8, boolean), "false");
        assert_eq!(render(1, 8, boolean), "true");
        assert_eq!(Integer::with_value(0, 8).unwrap().string_size(boolean).unwrap(), 6);
        assert_eq!(Integer::with_value(1, 8).unwrap().string_size(boolean).unwrap(), 5);
    }

    #[test]
    fn test_rejects_bad_flags() {
        let integer = Integer::with_value(1, 32).unwrap();
        assert!(integer.render(0).is_err());
        assert!(integer.render(0x04).is_err());
        assert!(integer.render(SIGNED_DECIMAL | IntegerFormat::UNSIGNED.bits()).is_err());
        assert!(integer.string_size(0x0100_0001).is_err());
    }

    #[test]
    fn test_parses_hexadecimal() {
        assert_eq!(parse("0x2A", 32, BARE_HEX).unwrap(), 42);
        assert_eq!(parse("x2a", 32, BARE_HEX).unwrap(), 42);
        assert_eq!(parse("ff", 8, BARE_HEX).unwrap(), 255);

        // The marker is case sensitive.
        let err = parse("0X2a", 32, BARE_HEX).unwrap_err();
        assert!(matches!(err, ValueError::UnsupportedCharacter { character: 0x58, index: 1, .. }));

        let err = parse("123", 8, BARE_HEX).unwrap_err();
        assert!(matches!(err, ValueError::StringTooLarge { max_digits: 2, .. }));
    }

    #[test]
    fn test_parses_decimal() {
        assert_eq!(parse("42", 32, UNSIGNED_DECIMAL).unwrap(), 42);
        assert_eq!(parse("+42", 32, UNSIGNED_DECIMAL).unwrap(), 42);
        assert_eq!(parse("-1", 8, SIGNED_DECIMAL).unwrap(), 0xff);
        assert_eq!(parse("-128", 8, SIGNED_DECIMAL).unwrap(), 0x80);
        assert_eq!(parse("-0", 8, SIGNED_DECIMAL).unwrap(), 0);
        assert_eq!(
            parse("18446744073709551615", 64, UNSIGNED_DECIMAL).unwrap(),
            u64::MAX
        );

        assert!(matches!(
            parse("1234", 8, UNSIGNED_DECIMAL).unwrap_err(),
            ValueError::StringTooLarge { max_digits: 3, .. }
        ));
        assert!(matches!(
            parse("256", 8, UNSIGNED_DECIMAL).unwrap_err(),
            ValueError::ValueOutOfRange { .. }
        ));
        assert!(matches!(
            parse("128", 8, SIGNED_DECIMAL).unwrap_err(),
            ValueError::ValueOutOfRange { .. }
        ));
        assert!(matches!(
            parse("18446744073709551616", 64, UNSIGNED_DECIMAL).unwrap_err(),
            ValueError::ValueOutOfRange { .. }
        ));
        let err = parse("4a", 32, UNSIGNED_DECIMAL).unwrap_err();
        assert_eq!(err.domain(), ErrorDomain::Runtime);
    }

    #[test]
    fn test_parses_boolean() {
        let boolean = IntegerFormat::BOOLEAN.bits();
        assert_eq!(parse("true", 8, boolean).unwrap(), 1);
        assert_eq!(parse("false", 8, boolean).unwrap(), 0);
        assert!(parse("TRUE", 8, boolean).is_err());
    }

    #[test]
    fn test_byte_stream() {
        let le = DataEncoding::Endianness(Endianness::LittleEndian);
        let mut integer = Integer::new(8);
        integer.copy_from_byte_stream(&[0x2a, 0, 0, 0], le).unwrap();
        assert_eq!(integer.copy_to_integer(), (42, 32));
        assert_eq!(
            integer
                .copy_to_byte_stream(DataEncoding::Endianness(Endianness::BigEndian))
                .unwrap(),
            vec![0, 0, 0, 0x2a]
        );

        assert!(integer.copy_from_byte_stream(&[0; 3], le).is_err());
        assert!(integer.copy_from_byte_stream(&[0; 4], DataEncoding::None).is_err());
        assert_eq!(integer.copy_to_integer(), (42, 32));
    }

    #[test]
    fn test_copy_from_integer_masks_to_width() {
        let mut integer = Integer::new(8);
        integer.copy_from_integer(0x1ff, 8).unwrap();
        assert_eq!(integer.value(), 0xff);
        assert_eq!(integer.as_signed(), -1);
        assert!(matches!(
            integer.copy_from_integer(1, 12).unwrap_err(),
            ValueError::UnsupportedBitWidth { bit_width: 12 }
        ));
    }
}
