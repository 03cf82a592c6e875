//! IEEE 754 binary32/binary64 leaf.

use crate::data_handle::DataEncoding;
use crate::err::{Result, RuntimeOperation, ValueError, conversion};
use crate::utils::bytes::{read_uint, write_uint};

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FloatingPointFormat: u32 {
        const DECIMAL = 0x0000_0001;
        const HEXADECIMAL = 0x0000_0002;

        const NO_BASE_INDICATOR = 0x0001_0000;
    }
}

const FORMAT_TYPE_MASK: u32 = 0x0000_00ff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatingPoint {
    bits: u64,
    bit_width: usize,
}

impl Default for FloatingPoint {
    fn default() -> Self {
        FloatingPoint::new(64)
    }
}

fn check_bit_width(bit_width: usize) -> Result<()> {
    match bit_width {
        32 | 64 => Ok(()),
        _ => Err(ValueError::UnsupportedBitWidth { bit_width }),
    }
}

/// Splits the flags into "is hexadecimal" and "with base indicator".
fn parse_format(flags: u32) -> Result<(bool, bool)> {
    let unsupported = ValueError::UnsupportedFormat {
        what: "floating point format",
        flags,
    };
    if flags & !(FORMAT_TYPE_MASK | FloatingPointFormat::all().bits()) != 0 {
        return Err(unsupported);
    }
    let hexadecimal = match flags & FORMAT_TYPE_MASK {
        0x01 => false,
        0x02 => true,
        _ => return Err(unsupported),
    };
    let base_indicator = flags & FloatingPointFormat::NO_BASE_INDICATOR.bits() == 0;
    Ok((hexadecimal, base_indicator))
}

impl FloatingPoint {
    pub fn new(bit_width: usize) -> Self {
        FloatingPoint { bits: 0, bit_width }
    }

    pub fn bit_width(&self) -> usize {
        self.bit_width
    }

    pub fn value(&self) -> f64 {
        if self.bit_width == 32 {
            f64::from(f32::from_bits(self.bits as u32))
        } else {
            f64::from_bits(self.bits)
        }
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what: "floating point byte stream",
                encoding: encoding.to_string(),
            })?;
        let bit_width = data.len() * 8;
        if check_bit_width(bit_width).is_err() {
            return Err(ValueError::UnsupportedSize {
                what: "floating point byte stream",
                size: data.len(),
            });
        }

        self.bits = read_uint("floating point byte stream", data, endianness)?;
        self.bit_width = bit_width;
        Ok(())
    }

    pub fn copy_to_byte_stream(&self, encoding: DataEncoding) -> Result<Vec<u8>> {
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what: "floating point byte stream",
                encoding: encoding.to_string(),
            })?;
        write_uint(
            "floating point byte stream",
            self.bits,
            self.bit_width / 8,
            endianness,
        )
    }

    pub fn copy_from_floating_point(&mut self, value: f64, bit_width: usize) -> Result<()> {
        check_bit_width(bit_width)?;
        self.bits = if bit_width == 32 {
            u64::from((value as f32).to_bits())
        } else {
            value.to_bits()
        };
        self.bit_width = bit_width;
        Ok(())
    }

    pub fn copy_to_floating_point(&self) -> (f64, usize) {
        (self.value(), self.bit_width)
    }

    /// Stores the integer as a floating point value of the current width.
    pub fn copy_from_integer(&mut self, value: u64, _bit_width: usize) -> Result<()> {
        self.copy_from_floating_point(value as f64, self.bit_width)
    }

    /// Truncates towards zero. Negative values come back as 64-bit two's complement.
    pub fn copy_to_integer(&self) -> Result<(u64, usize)> {
        let value = self.value().trunc();
        let not_representable = || ValueError::Runtime {
            operation: RuntimeOperation::Copy,
            what: "floating point to integer",
            reason: format!("{} is not representable as a 64-bit integer", value),
        };

        if !value.is_finite() {
            return Err(not_representable());
        }
        if value < 0.0 {
            if value < i64::MIN as f64 {
                return Err(not_representable());
            }
            Ok(((value as i64) as u64, 64))
        } else if value >= u64::MAX as f64 {
            Err(not_representable())
        } else {
            Ok((value as u64, 64))
        }
    }

    pub fn to_text(&self, flags: u32) -> Result<String> {
        check_bit_width(self.bit_width)?;
        let (hexadecimal, base_indicator) = parse_format(flags)?;

        if hexadecimal {
            let digits = self.bit_width / 4;
            let prefix = if base_indicator { "0x" } else { "" };
            return Ok(format!("{}{:0width$x}", prefix, self.bits, width = digits));
        }

        let value = self.value();
        if value.is_nan() {
            return Ok("NaN".to_string());
        }
        if value.is_infinite() {
            return Ok(if value < 0.0 { "-Inf" } else { "Inf" }.to_string());
        }

        // Rust renders "1.000000e0", the exponent gets a sign and at least two digits.
        let rendered = format!("{:.6e}", value);
        let (mantissa, exponent) = rendered.split_once('e').unwrap_or((rendered.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or_default();
        let sign = if exponent < 0 { '-' } else { '+' };
        Ok(format!("{}e{}{:02}", mantissa, sign, exponent.abs()))
    }

    pub fn from_text(&mut self, text: &str, flags: u32) -> Result<()> {
        check_bit_width(self.bit_width)?;
        let (hexadecimal, _) = parse_format(flags)?;

        if hexadecimal {
            let digits = text.strip_prefix("0x").unwrap_or(text);
            let max_digits = self.bit_width / 4;
            if digits.len() > max_digits {
                return Err(ValueError::StringTooLarge {
                    what: "hexadecimal floating point string",
                    max_digits,
                });
            }
            self.bits = u64::from_str_radix(digits, 16)
                .map_err(|e| conversion("hexadecimal floating point string", e))?;
            return Ok(());
        }

        let value = match text {
            "Inf" => f64::INFINITY,
            "-Inf" => f64::NEG_INFINITY,
            _ => text
                .parse::<f64>()
                .map_err(|e| conversion("decimal floating point string", e))?,
        };
        self.copy_from_floating_point(value, self.bit_width)
    }
}
