//! Date-time leaves: FAT date time, FILETIME, floatingtime, NSF timedate, POSIX time and
//! SYSTEMTIME.
//!
//! The raw value is always kept. A raw value that does not describe a valid date and time
//! still makes an instance, it renders as its hexadecimal raw value.

use crate::data_handle::{DataEncoding, Endianness};
use crate::err::{Result, RuntimeOperation, ValueError};
use crate::utils::bytes::read_uint;
use crate::utils::windows::{
    fat_date_time, filetime_to_datetime, floatingtime_to_datetime, nsf_timedate_to_datetime,
    posix_time_to_datetime, systime_from_bytes,
};

use bitflags::bitflags;
use jiff::civil::DateTime;
use log::debug;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DateTimeFormat: u32 {
        const CTIME = 0x0000_0001;
        const ISO8601 = 0x0000_0002;

        const MILLI_SECONDS = 0x0000_0100;
        const MICRO_SECONDS = 0x0000_0200;
        const NANO_SECONDS = 0x0000_0400;

        const TIMEZONE_INDICATOR = 0x0000_1000;
    }
}

impl Default for DateTimeFormat {
    fn default() -> Self {
        DateTimeFormat::ISO8601 | DateTimeFormat::NANO_SECONDS | DateTimeFormat::TIMEZONE_INDICATOR
    }
}

const FORMAT_TYPE_MASK: u32 = 0x0000_00ff;
const PRECISION_MASK: u32 = 0x0000_0700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    FatDateTime,
    Filetime,
    Floatingtime,
    NsfTimedate,
    PosixTime,
    Systemtime,
}

impl DateTimeKind {
    fn name(self) -> &'static str {
        match self {
            DateTimeKind::FatDateTime => "fat date time",
            DateTimeKind::Filetime => "filetime",
            DateTimeKind::Floatingtime => "floatingtime",
            DateTimeKind::NsfTimedate => "nsf timedate",
            DateTimeKind::PosixTime => "posix time",
            DateTimeKind::Systemtime => "systemtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTimeValue {
    kind: DateTimeKind,
    /// The bytes as read.
    raw: Vec<u8>,
    /// The raw value as a number, for the kinds that are one.
    raw_value: u64,
    date_time: Option<DateTime>,
    is_utc: bool,
}

impl DateTimeValue {
    pub fn new(kind: DateTimeKind) -> Self {
        DateTimeValue {
            kind,
            raw: Vec::new(),
            raw_value: 0,
            date_time: None,
            is_utc: kind != DateTimeKind::FatDateTime,
        }
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }

    /// `None` when the raw value is not a valid date and time.
    pub fn date_time(&self) -> Option<DateTime> {
        self.date_time
    }

    /// FAT date times are local time, every other representation is UTC.
    pub fn is_utc(&self) -> bool {
        self.is_utc
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let what = self.kind.name();
        let unsupported_size = || ValueError::UnsupportedSize {
            what,
            size: data.len(),
        };
        let endianness = encoding
            .endianness()
            .ok_or_else(|| ValueError::UnsupportedEncoding {
                what,
                encoding: encoding.to_string(),
            })?;

        let mut raw_value = 0;
        let converted = match self.kind {
            DateTimeKind::FatDateTime => {
                if data.len() != 4 {
                    return Err(unsupported_size());
                }
                let date = read_uint(what, &data[..2], endianness)? as u16;
                let time = read_uint(what, &data[2..], endianness)? as u16;
                fat_date_time(date, time)
            }
            DateTimeKind::Filetime => {
                if data.len() != 8 {
                    return Err(unsupported_size());
                }
                raw_value = read_uint(what, data, endianness)?;
                filetime_to_datetime(raw_value)
            }
            DateTimeKind::Floatingtime => {
                if data.len() != 8 {
                    return Err(unsupported_size());
                }
                raw_value = read_uint(what, data, endianness)?;
                floatingtime_to_datetime(f64::from_bits(raw_value))
            }
            DateTimeKind::NsfTimedate => {
                if data.len() != 8 {
                    return Err(unsupported_size());
                }
                let lower = read_uint(what, &data[..4], endianness)?;
                let upper = read_uint(what, &data[4..], endianness)?;
                raw_value = (upper << 32) | lower;
                nsf_timedate_to_datetime(raw_value)
            }
            DateTimeKind::PosixTime => {
                let secs = match data.len() {
                    4 => i64::from(read_uint(what, data, endianness)? as u32 as i32),
                    8 => read_uint(what, data, endianness)? as i64,
                    _ => return Err(unsupported_size()),
                };
                raw_value = secs as u64;
                posix_time_to_datetime(secs)
            }
            DateTimeKind::Systemtime => {
                if endianness != Endianness::LittleEndian {
                    return Err(ValueError::UnsupportedEncoding {
                        what,
                        encoding: encoding.to_string(),
                    });
                }
                let bytes: &[u8; 16] = data.try_into().map_err(|_| unsupported_size())?;
                systime_from_bytes(bytes)
            }
        };

        self.date_time = match converted {
            Ok(date_time) => Some(date_time),
            Err(e) => {
                debug!("{}, keeping the raw value", e);
                None
            }
        };
        self.raw = data.to_vec();
        self.raw_value = raw_value;
        Ok(())
    }

    fn filetime_only(&self, operation: RuntimeOperation) -> Result<()> {
        if self.kind == DateTimeKind::Filetime {
            Ok(())
        } else {
            Err(ValueError::Unimplemented {
                operation,
                what: "integer conversion of a non-filetime date time",
            })
        }
    }

    /// The raw 100ns tick count of a FILETIME.
    pub fn copy_to_integer(&self) -> Result<(u64, usize)> {
        self.filetime_only(RuntimeOperation::Copy)?;
        Ok((self.raw_value, 64))
    }

    pub fn copy_from_integer(&mut self, value: u64, bit_width: usize) -> Result<()> {
        self.filetime_only(RuntimeOperation::Set)?;
        if bit_width != 64 {
            return Err(ValueError::UnsupportedBitWidth { bit_width });
        }
        self.copy_from_byte_stream(
            &value.to_le_bytes(),
            DataEncoding::Endianness(Endianness::LittleEndian),
        )
    }

    pub fn to_text(&self, flags: u32) -> Result<String> {
        let unsupported = ValueError::UnsupportedFormat {
            what: "date time format",
            flags,
        };
        if flags & !(FORMAT_TYPE_MASK | DateTimeFormat::all().bits()) != 0 {
            return Err(unsupported);
        }
        let ctime = match flags & FORMAT_TYPE_MASK {
            0x01 => true,
            0x02 => false,
            _ => return Err(unsupported),
        };
        let fraction_digits = match flags & PRECISION_MASK {
            0 => 0,
            0x100 => 3,
            0x200 => 6,
            0x400 => 9,
            _ => return Err(unsupported),
        };
        let timezone = flags & DateTimeFormat::TIMEZONE_INDICATOR.bits() != 0 && self.is_utc;

        let Some(dt) = self.date_time else {
            return Ok(self.raw.iter().fold(String::from("(0x"), |mut acc, b| {
                push_hex_byte(&mut acc, *b);
                acc
            }) + ")");
        };

        let mut out = String::with_capacity(40);
        if ctime {
            out.push_str(MONTHS[usize::from(dt.month() as u8).saturating_sub(1) % 12]);
            out.push(' ');
            push_digits(&mut out, dt.day() as u32, 2);
            out.push_str(", ");
            push_year(&mut out, dt.year());
            out.push(' ');
        } else {
            push_year(&mut out, dt.year());
            out.push('-');
            push_digits(&mut out, dt.month() as u32, 2);
            out.push('-');
            push_digits(&mut out, dt.day() as u32, 2);
            out.push('T');
        }
        push_digits(&mut out, dt.hour() as u32, 2);
        out.push(':');
        push_digits(&mut out, dt.minute() as u32, 2);
        out.push(':');
        push_digits(&mut out, dt.second() as u32, 2);
        if fraction_digits > 0 {
            out.push('.');
            let nanos = dt.subsec_nanosecond() as u32;
            push_digits(&mut out, nanos / 10_u32.pow(9 - fraction_digits), fraction_digits as usize);
        }
        if timezone {
            out.push_str(if ctime { " UTC" } else { "Z" });
        }

        Ok(out)
    }
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn push_year(out: &mut String, year: i16) {
    if year < 0 {
        out.push('-');
    }
    push_digits(out, u32::from(year.unsigned_abs()), 4);
}

/// Pushes the lowest `width` decimal digits of `value`, zero padded.
fn push_digits(out: &mut String, value: u32, width: usize) {
    let mut divider = 10_u32.pow(width as u32 - 1);
    while divider > 0 {
        out.push(char::from(b'0' + ((value / divider) % 10) as u8));
        divider /= 10;
    }
}

fn push_hex_byte(out: &mut String, b: u8) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    out.push(char::from(DIGITS[usize::from(b >> 4)]));
    out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
}
