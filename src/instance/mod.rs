//! Decoded value instances and the table of conversions a value type supports.
//!
//! Every leaf codec is a variant of [`ValueInstance`]. What a value type can do with its
//! instances is described by an [`InstanceOps`]: each conversion is an optional function
//! pointer, and an absent one means the conversion does not apply to the type.

pub mod binary_data;
pub mod date_time;
pub mod floating_point;
pub mod guid;
pub mod integer;
pub mod sid;
pub mod string;

pub use self::binary_data::{BinaryData, BinaryDataFormat};
pub use self::date_time::{DateTimeFormat, DateTimeKind, DateTimeValue};
pub use self::floating_point::{FloatingPoint, FloatingPointFormat};
pub use self::guid::{GuidFormat, GuidValue};
pub use self::integer::{Integer, IntegerFormat};
pub use self::sid::SidValue;
pub use self::string::{StringKind, StringValue};

use crate::data_handle::DataEncoding;
use crate::err::{Result, RuntimeOperation, ValueError};
use crate::utils::unicode::{
    CodeUnit, read_str_with_index, units_with_index, write_ascii_with_index, write_str_with_index,
};

/// The decoded form of one value entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueInstance {
    Integer(Integer),
    FloatingPoint(FloatingPoint),
    String(StringValue),
    BinaryData(BinaryData),
    DateTime(DateTimeValue),
    Guid(GuidValue),
    Sid(SidValue),
}

impl ValueInstance {
    fn name(&self) -> &'static str {
        match self {
            ValueInstance::Integer(_) => "integer",
            ValueInstance::FloatingPoint(_) => "floating point",
            ValueInstance::String(_) => "string",
            ValueInstance::BinaryData(_) => "binary data",
            ValueInstance::DateTime(_) => "date time",
            ValueInstance::Guid(_) => "guid",
            ValueInstance::Sid(_) => "nt security identifier",
        }
    }

    fn unimplemented(&self, operation: RuntimeOperation) -> ValueError {
        ValueError::Unimplemented {
            operation,
            what: self.name(),
        }
    }

    pub fn copy_from_byte_stream(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        match self {
            ValueInstance::Integer(integer) => integer.copy_from_byte_stream(data, encoding),
            ValueInstance::FloatingPoint(float) => float.copy_from_byte_stream(data, encoding),
            ValueInstance::String(string) => string.copy_from_byte_stream(data, encoding),
            ValueInstance::BinaryData(binary) => binary.copy_from_byte_stream(data, encoding),
            ValueInstance::DateTime(date_time) => date_time.copy_from_byte_stream(data, encoding),
            ValueInstance::Guid(guid) => guid.copy_from_byte_stream(data, encoding),
            ValueInstance::Sid(sid) => sid.copy_from_byte_stream(data, encoding),
        }
    }

    pub fn copy_to_byte_stream(&self, encoding: DataEncoding) -> Result<Vec<u8>> {
        match self {
            ValueInstance::Integer(integer) => integer.copy_to_byte_stream(encoding),
            ValueInstance::FloatingPoint(float) => float.copy_to_byte_stream(encoding),
            ValueInstance::String(string) => string.copy_to_byte_stream(encoding),
            ValueInstance::BinaryData(binary) => binary.copy_to_byte_stream(encoding),
            _ => Err(self.unimplemented(RuntimeOperation::Copy)),
        }
    }

    pub fn copy_from_integer(&mut self, value: u64, bit_width: usize) -> Result<()> {
        match self {
            ValueInstance::Integer(integer) => integer.copy_from_integer(value, bit_width),
            ValueInstance::FloatingPoint(float) => float.copy_from_integer(value, bit_width),
            ValueInstance::DateTime(date_time) => date_time.copy_from_integer(value, bit_width),
            _ => Err(self.unimplemented(RuntimeOperation::Set)),
        }
    }

    pub fn copy_to_integer(&self) -> Result<(u64, usize)> {
        match self {
            ValueInstance::Integer(integer) => Ok(integer.copy_to_integer()),
            ValueInstance::FloatingPoint(float) => float.copy_to_integer(),
            ValueInstance::DateTime(date_time) => date_time.copy_to_integer(),
            _ => Err(self.unimplemented(RuntimeOperation::Copy)),
        }
    }

    pub fn copy_from_floating_point(&mut self, value: f64, bit_width: usize) -> Result<()> {
        match self {
            ValueInstance::FloatingPoint(float) => float.copy_from_floating_point(value, bit_width),
            _ => Err(self.unimplemented(RuntimeOperation::Set)),
        }
    }

    pub fn copy_to_floating_point(&self) -> Result<(f64, usize)> {
        match self {
            ValueInstance::FloatingPoint(float) => Ok(float.copy_to_floating_point()),
            _ => Err(self.unimplemented(RuntimeOperation::Copy)),
        }
    }

    /// The string form of the instance under the given format flags.
    pub fn to_text(&self, format_flags: u32) -> Result<String> {
        match self {
            ValueInstance::Integer(integer) => {
                Ok(integer.render(format_flags)?.as_str().to_owned())
            }
            ValueInstance::FloatingPoint(float) => float.to_text(format_flags),
            ValueInstance::String(string) => string.to_text(),
            ValueInstance::BinaryData(binary) => binary.to_text(format_flags),
            ValueInstance::DateTime(date_time) => date_time.to_text(format_flags),
            ValueInstance::Guid(guid) => guid.to_text(format_flags),
            ValueInstance::Sid(sid) => sid.to_text(),
        }
    }

    /// Number of code units of the string form, terminator included.
    pub fn string_size<U: CodeUnit>(&self, format_flags: u32) -> Result<usize> {
        match self {
            ValueInstance::Integer(integer) => integer.string_size(format_flags),
            ValueInstance::BinaryData(binary) => binary.string_size(format_flags),
            _ => Ok(U::encoded_len(&self.to_text(format_flags)?) + 1),
        }
    }

    /// Writes the string form and its terminator at `*index` and advances `*index`.
    pub fn copy_to_string_with_index<U: CodeUnit>(
        &self,
        out: &mut [U],
        index: &mut usize,
        format_flags: u32,
    ) -> Result<()> {
        match self {
            ValueInstance::Integer(integer) => {
                write_ascii_with_index(integer.render(format_flags)?.as_bytes(), out, index)
            }
            _ => write_str_with_index(&self.to_text(format_flags)?, out, index),
        }
    }

    /// Parses the string at `*index` into the instance. `*index` only advances on success.
    pub fn copy_from_string_with_index<U: CodeUnit>(
        &mut self,
        input: &[U],
        index: &mut usize,
        format_flags: u32,
    ) -> Result<()> {
        let mut position = *index;

        match self {
            ValueInstance::Integer(integer) => {
                let units = units_with_index(input, &mut position)?;
                integer.parse_units(units, format_flags)?
            }
            ValueInstance::FloatingPoint(float) => {
                float.from_text(&read_str_with_index(input, &mut position)?, format_flags)?
            }
            ValueInstance::String(string) => {
                string.from_text(&read_str_with_index(input, &mut position)?)?
            }
            ValueInstance::BinaryData(binary) => {
                binary.from_text(&read_str_with_index(input, &mut position)?, format_flags)?
            }
            _ => return Err(self.unimplemented(RuntimeOperation::Set)),
        }

        *index = position;
        Ok(())
    }
}

/// The string conversions of a value type for one code unit width.
#[derive(Debug, Clone, Copy)]
pub struct StringOps<U: 'static> {
    /// Absent for types that can be rendered but not parsed.
    pub copy_from: Option<fn(&mut ValueInstance, &[U], &mut usize, u32) -> Result<()>>,
    pub get_size: fn(&ValueInstance, u32) -> Result<usize>,
    pub copy_to: fn(&ValueInstance, &mut [U], &mut usize, u32) -> Result<()>,
}

impl<U: CodeUnit> StringOps<U> {
    pub const FULL: StringOps<U> = StringOps {
        copy_from: Some(ValueInstance::copy_from_string_with_index::<U>),
        get_size: ValueInstance::string_size::<U>,
        copy_to: ValueInstance::copy_to_string_with_index::<U>,
    };

    pub const RENDER_ONLY: StringOps<U> = StringOps {
        copy_from: None,
        get_size: ValueInstance::string_size::<U>,
        copy_to: ValueInstance::copy_to_string_with_index::<U>,
    };
}

/// The conversions a value type supports. Freeing and cloning instances are `Drop` and
/// `Clone` of [`ValueInstance`].
#[derive(Debug, Clone, Copy)]
pub struct InstanceOps {
    pub initialize: Option<fn() -> ValueInstance>,
    pub copy_from_byte_stream: Option<fn(&mut ValueInstance, &[u8], DataEncoding) -> Result<()>>,
    pub copy_to_byte_stream: Option<fn(&ValueInstance, DataEncoding) -> Result<Vec<u8>>>,
    pub copy_from_integer: Option<fn(&mut ValueInstance, u64, usize) -> Result<()>>,
    pub copy_to_integer: Option<fn(&ValueInstance) -> Result<(u64, usize)>>,
    pub copy_from_floating_point: Option<fn(&mut ValueInstance, f64, usize) -> Result<()>>,
    pub copy_to_floating_point: Option<fn(&ValueInstance) -> Result<(f64, usize)>>,
    pub utf8: Option<StringOps<u8>>,
    pub utf16: Option<StringOps<u16>>,
    pub utf32: Option<StringOps<u32>>,
}

impl InstanceOps {
    /// No conversions at all, a type without instances.
    pub const NONE: InstanceOps = InstanceOps {
        initialize: None,
        copy_from_byte_stream: None,
        copy_to_byte_stream: None,
        copy_from_integer: None,
        copy_to_integer: None,
        copy_from_floating_point: None,
        copy_to_floating_point: None,
        utf8: None,
        utf16: None,
        utf32: None,
    };
}

pub(crate) fn initialize_integer<const BITS: usize>() -> ValueInstance {
    ValueInstance::Integer(Integer::new(BITS))
}

pub(crate) fn initialize_floating_point<const BITS: usize>() -> ValueInstance {
    ValueInstance::FloatingPoint(FloatingPoint::new(BITS))
}

pub(crate) fn initialize_binary_data() -> ValueInstance {
    ValueInstance::BinaryData(BinaryData::new())
}

pub(crate) fn initialize_byte_stream_string() -> ValueInstance {
    ValueInstance::String(StringValue::new(StringKind::ByteStream))
}

pub(crate) fn initialize_utf8_string() -> ValueInstance {
    ValueInstance::String(StringValue::new(StringKind::Utf8))
}

pub(crate) fn initialize_utf16_string() -> ValueInstance {
    ValueInstance::String(StringValue::new(StringKind::Utf16))
}

pub(crate) fn initialize_utf32_string() -> ValueInstance {
    ValueInstance::String(StringValue::new(StringKind::Utf32))
}

pub(crate) fn initialize_fat_date_time() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::FatDateTime))
}

pub(crate) fn initialize_filetime() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::Filetime))
}

pub(crate) fn initialize_floatingtime() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::Floatingtime))
}

pub(crate) fn initialize_nsf_timedate() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::NsfTimedate))
}

pub(crate) fn initialize_posix_time() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::PosixTime))
}

pub(crate) fn initialize_systemtime() -> ValueInstance {
    ValueInstance::DateTime(DateTimeValue::new(DateTimeKind::Systemtime))
}

pub(crate) fn initialize_guid() -> ValueInstance {
    ValueInstance::Guid(GuidValue::new())
}

pub(crate) fn initialize_sid() -> ValueInstance {
    ValueInstance::Sid(SidValue::new())
}
