//! Value types and the factory binding each of them to its instance conversions.

use crate::data_handle::{DataEncoding, DataHandle};
use crate::err::{Result, ValueError, invalid_argument};
use crate::instance::*;
use crate::settings::ValueSettings;
use crate::value::Value;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    BinaryData,
    Boolean,
    Integer8,
    Integer16,
    Integer32,
    Integer64,
    UnsignedInteger8,
    UnsignedInteger16,
    UnsignedInteger32,
    UnsignedInteger64,
    FloatingPoint32,
    FloatingPoint64,
    Null,
    StringByteStream,
    StringUtf8,
    StringUtf16,
    StringUtf32,
    FatDateTime,
    Filetime,
    Floatingtime,
    NsfTimedate,
    PosixTime,
    Systemtime,
    Guid,
    NtSecurityIdentifier,
}

impl ValueType {
    pub const ALL: [ValueType; 25] = [
        ValueType::BinaryData,
        ValueType::Boolean,
        ValueType::Integer8,
        ValueType::Integer16,
        ValueType::Integer32,
        ValueType::Integer64,
        ValueType::UnsignedInteger8,
        ValueType::UnsignedInteger16,
        ValueType::UnsignedInteger32,
        ValueType::UnsignedInteger64,
        ValueType::FloatingPoint32,
        ValueType::FloatingPoint64,
        ValueType::Null,
        ValueType::StringByteStream,
        ValueType::StringUtf8,
        ValueType::StringUtf16,
        ValueType::StringUtf32,
        ValueType::FatDateTime,
        ValueType::Filetime,
        ValueType::Floatingtime,
        ValueType::NsfTimedate,
        ValueType::PosixTime,
        ValueType::Systemtime,
        ValueType::Guid,
        ValueType::NtSecurityIdentifier,
    ];

    /// Short name, used as the `type` attribute when printing values.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::BinaryData => "binary_data",
            ValueType::Boolean => "boolean",
            ValueType::Integer8 => "int8",
            ValueType::Integer16 => "int16",
            ValueType::Integer32 => "int32",
            ValueType::Integer64 => "int64",
            ValueType::UnsignedInteger8 => "uint8",
            ValueType::UnsignedInteger16 => "uint16",
            ValueType::UnsignedInteger32 => "uint32",
            ValueType::UnsignedInteger64 => "uint64",
            ValueType::FloatingPoint32 => "float32",
            ValueType::FloatingPoint64 => "float64",
            ValueType::Null => "null",
            ValueType::StringByteStream => "byte_stream_string",
            ValueType::StringUtf8 => "utf8_string",
            ValueType::StringUtf16 => "utf16_string",
            ValueType::StringUtf32 => "utf32_string",
            ValueType::FatDateTime => "fat_date_time",
            ValueType::Filetime => "filetime",
            ValueType::Floatingtime => "floatingtime",
            ValueType::NsfTimedate => "nsf_timedate",
            ValueType::PosixTime => "posix_time",
            ValueType::Systemtime => "systemtime",
            ValueType::Guid => "guid",
            ValueType::NtSecurityIdentifier => "nt_sid",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ValueType::BinaryData => "Binary data",
            ValueType::Boolean => "Boolean",
            ValueType::Integer8 => "Integer 8-bit signed",
            ValueType::Integer16 => "Integer 16-bit signed",
            ValueType::Integer32 => "Integer 32-bit signed",
            ValueType::Integer64 => "Integer 64-bit signed",
            ValueType::UnsignedInteger8 => "Integer 8-bit unsigned",
            ValueType::UnsignedInteger16 => "Integer 16-bit unsigned",
            ValueType::UnsignedInteger32 => "Integer 32-bit unsigned",
            ValueType::UnsignedInteger64 => "Integer 64-bit unsigned",
            ValueType::FloatingPoint32 => "Floating point 32-bit",
            ValueType::FloatingPoint64 => "Floating point 64-bit",
            ValueType::Null => "Null",
            ValueType::StringByteStream => "Byte stream string",
            ValueType::StringUtf8 => "UTF-8 string",
            ValueType::StringUtf16 => "UTF-16 string",
            ValueType::StringUtf32 => "UTF-32 string",
            ValueType::FatDateTime => "FAT date time",
            ValueType::Filetime => "Filetime",
            ValueType::Floatingtime => "Floatingtime",
            ValueType::NsfTimedate => "NSF timedate",
            ValueType::PosixTime => "POSIX time",
            ValueType::Systemtime => "Systemtime",
            ValueType::Guid => "Globally unique identifier (GUID)",
            ValueType::NtSecurityIdentifier => "NT security identifier (SID)",
        }
    }

    /// The conversions values of this type support.
    pub fn ops(self) -> &'static InstanceOps {
        match self {
            ValueType::BinaryData => &BINARY_DATA_OPS,
            ValueType::Boolean | ValueType::Integer8 | ValueType::UnsignedInteger8 => {
                &INTEGER_8_OPS
            }
            ValueType::Integer16 | ValueType::UnsignedInteger16 => &INTEGER_16_OPS,
            ValueType::Integer32 | ValueType::UnsignedInteger32 => &INTEGER_32_OPS,
            ValueType::Integer64 | ValueType::UnsignedInteger64 => &INTEGER_64_OPS,
            ValueType::FloatingPoint32 => &FLOATING_POINT_32_OPS,
            ValueType::FloatingPoint64 => &FLOATING_POINT_64_OPS,
            ValueType::Null => &InstanceOps::NONE,
            ValueType::StringByteStream => &BYTE_STREAM_STRING_OPS,
            ValueType::StringUtf8 => &UTF8_STRING_OPS,
            ValueType::StringUtf16 => &UTF16_STRING_OPS,
            ValueType::StringUtf32 => &UTF32_STRING_OPS,
            ValueType::FatDateTime => &FAT_DATE_TIME_OPS,
            ValueType::Filetime => &FILETIME_OPS,
            ValueType::Floatingtime => &FLOATINGTIME_OPS,
            ValueType::NsfTimedate => &NSF_TIMEDATE_OPS,
            ValueType::PosixTime => &POSIX_TIME_OPS,
            ValueType::Systemtime => &SYSTEMTIME_OPS,
            ValueType::Guid => &GUID_OPS,
            ValueType::NtSecurityIdentifier => &SID_OPS,
        }
    }

    /// The rendering flags new values of this type start with.
    pub fn default_format_flags(self) -> u32 {
        match self {
            ValueType::BinaryData => BinaryDataFormat::default().bits(),
            ValueType::Boolean => IntegerFormat::BOOLEAN.bits(),
            ValueType::Integer8
            | ValueType::Integer16
            | ValueType::Integer32
            | ValueType::Integer64 => (IntegerFormat::DECIMAL | IntegerFormat::SIGNED).bits(),
            ValueType::UnsignedInteger8
            | ValueType::UnsignedInteger16
            | ValueType::UnsignedInteger32
            | ValueType::UnsignedInteger64 => {
                (IntegerFormat::DECIMAL | IntegerFormat::UNSIGNED).bits()
            }
            ValueType::FloatingPoint32 | ValueType::FloatingPoint64 => {
                FloatingPointFormat::DECIMAL.bits()
            }
            ValueType::FatDateTime
            | ValueType::Filetime
            | ValueType::Floatingtime
            | ValueType::NsfTimedate
            | ValueType::PosixTime
            | ValueType::Systemtime => DateTimeFormat::default().bits(),
            ValueType::Guid => GuidFormat::default().bits(),
            ValueType::Null
            | ValueType::StringByteStream
            | ValueType::StringUtf8
            | ValueType::StringUtf16
            | ValueType::StringUtf32
            | ValueType::NtSecurityIdentifier => 0,
        }
    }

    /// Booleans and the signed and unsigned integer types.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueType::Boolean
                | ValueType::Integer8
                | ValueType::Integer16
                | ValueType::Integer32
                | ValueType::Integer64
                | ValueType::UnsignedInteger8
                | ValueType::UnsignedInteger16
                | ValueType::UnsignedInteger32
                | ValueType::UnsignedInteger64
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, ValueType::FloatingPoint32 | ValueType::FloatingPoint64)
    }

    pub fn is_string(self) -> bool {
        self.string_terminator_width().is_some()
    }

    pub fn is_date_time(self) -> bool {
        matches!(
            self,
            ValueType::FatDateTime
                | ValueType::Filetime
                | ValueType::Floatingtime
                | ValueType::NsfTimedate
                | ValueType::PosixTime
                | ValueType::Systemtime
        )
    }

    /// Byte width of the string terminator, `None` for non-string types.
    pub fn string_terminator_width(self) -> Option<usize> {
        match self {
            ValueType::StringByteStream | ValueType::StringUtf8 => Some(1),
            ValueType::StringUtf16 => Some(2),
            ValueType::StringUtf32 => Some(4),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const fn integer_ops(initialize: fn() -> ValueInstance) -> InstanceOps {
    InstanceOps {
        initialize: Some(initialize),
        copy_from_byte_stream: Some(ValueInstance::copy_from_byte_stream),
        copy_to_byte_stream: Some(ValueInstance::copy_to_byte_stream),
        copy_from_integer: Some(ValueInstance::copy_from_integer),
        copy_to_integer: Some(ValueInstance::copy_to_integer),
        utf8: Some(StringOps::FULL),
        utf16: Some(StringOps::FULL),
        utf32: Some(StringOps::FULL),
        ..InstanceOps::NONE
    }
}

const fn floating_point_ops(initialize: fn() -> ValueInstance) -> InstanceOps {
    InstanceOps {
        copy_from_floating_point: Some(ValueInstance::copy_from_floating_point),
        copy_to_floating_point: Some(ValueInstance::copy_to_floating_point),
        ..integer_ops(initialize)
    }
}

const fn string_ops(initialize: fn() -> ValueInstance) -> InstanceOps {
    InstanceOps {
        initialize: Some(initialize),
        copy_from_byte_stream: Some(ValueInstance::copy_from_byte_stream),
        copy_to_byte_stream: Some(ValueInstance::copy_to_byte_stream),
        utf8: Some(StringOps::FULL),
        utf16: Some(StringOps::FULL),
        utf32: Some(StringOps::FULL),
        ..InstanceOps::NONE
    }
}

/// Types decoded from a byte stream and rendered, but never parsed back.
const fn render_only_ops(initialize: fn() -> ValueInstance) -> InstanceOps {
    InstanceOps {
        initialize: Some(initialize),
        copy_from_byte_stream: Some(ValueInstance::copy_from_byte_stream),
        utf8: Some(StringOps::RENDER_ONLY),
        utf16: Some(StringOps::RENDER_ONLY),
        utf32: Some(StringOps::RENDER_ONLY),
        ..InstanceOps::NONE
    }
}

static INTEGER_8_OPS: InstanceOps = integer_ops(initialize_integer::<8>);
static INTEGER_16_OPS: InstanceOps = integer_ops(initialize_integer::<16>);
static INTEGER_32_OPS: InstanceOps = integer_ops(initialize_integer::<32>);
static INTEGER_64_OPS: InstanceOps = integer_ops(initialize_integer::<64>);

static FLOATING_POINT_32_OPS: InstanceOps = floating_point_ops(initialize_floating_point::<32>);
static FLOATING_POINT_64_OPS: InstanceOps = floating_point_ops(initialize_floating_point::<64>);

static BINARY_DATA_OPS: InstanceOps = string_ops(initialize_binary_data);
static BYTE_STREAM_STRING_OPS: InstanceOps = string_ops(initialize_byte_stream_string);
static UTF8_STRING_OPS: InstanceOps = string_ops(initialize_utf8_string);
static UTF16_STRING_OPS: InstanceOps = string_ops(initialize_utf16_string);
static UTF32_STRING_OPS: InstanceOps = string_ops(initialize_utf32_string);

static FAT_DATE_TIME_OPS: InstanceOps = render_only_ops(initialize_fat_date_time);
static FILETIME_OPS: InstanceOps = InstanceOps {
    copy_from_integer: Some(ValueInstance::copy_from_integer),
    copy_to_integer: Some(ValueInstance::copy_to_integer),
    ..render_only_ops(initialize_filetime)
};
static FLOATINGTIME_OPS: InstanceOps = render_only_ops(initialize_floatingtime);
static NSF_TIMEDATE_OPS: InstanceOps = render_only_ops(initialize_nsf_timedate);
static POSIX_TIME_OPS: InstanceOps = render_only_ops(initialize_posix_time);
static SYSTEMTIME_OPS: InstanceOps = render_only_ops(initialize_systemtime);
static GUID_OPS: InstanceOps = render_only_ops(initialize_guid);
static SID_OPS: InstanceOps = render_only_ops(initialize_sid);

/// Creates an empty value of `value_type` that owns a new data handle.
pub fn new_value<'a>(value_type: ValueType) -> Value<'a> {
    Value::with_ops(
        value_type,
        None,
        value_type.ops(),
        value_type.default_format_flags(),
    )
}

/// Creates a value of `value_type` over an existing data handle.
pub fn new_value_with_data_handle(value_type: ValueType, data_handle: DataHandle<'_>) -> Value<'_> {
    Value::with_ops(
        value_type,
        Some(data_handle),
        value_type.ops(),
        value_type.default_format_flags(),
    )
}

/// Creates an empty value whose format flags come from `settings`.
pub fn new_value_with_settings<'a>(value_type: ValueType, settings: &ValueSettings) -> Value<'a> {
    Value::with_ops(
        value_type,
        None,
        value_type.ops(),
        settings.format_flags_for(value_type),
    )
}

fn terminator_width(value_type: ValueType) -> Result<usize> {
    value_type.string_terminator_width().ok_or_else(|| {
        invalid_argument(
            "value_type",
            format!("{} is not a string type", value_type.name()),
        )
    })
}

fn string_size_with_width(data: &[u8], width: usize) -> Option<usize> {
    if data.len() < width {
        return None;
    }
    let size = data
        .chunks_exact(width)
        .position(|unit| unit.iter().all(|&b| b == 0))
        .map_or(data.len() - data.len() % width, |index| (index + 1) * width);
    Some(size)
}

/// Size in bytes of the string at the start of `data`, terminator included.
///
/// The terminator is one, two or four NUL bytes, aligned to its width. Without a
/// terminator the string runs to the last complete code unit of `data`.
pub fn get_string_size(value_type: ValueType, data: &[u8]) -> Result<usize> {
    let width = terminator_width(value_type)?;

    string_size_with_width(data, width).ok_or(ValueError::UnsupportedSize {
        what: "string data",
        size: data.len(),
    })
}

/// Sets the data of `value` to the string at the start of `data`. Returns the string size.
pub fn set_data_string(value: &mut Value<'_>, data: &[u8], encoding: DataEncoding) -> Result<usize> {
    let size = get_string_size(value.value_type(), data)?;
    value.set_data(&data[..size], encoding)?;
    Ok(size)
}

/// Appends the string at the start of `data` as a new entry. Returns the entry index.
pub fn append_data_string(
    value: &mut Value<'_>,
    data: &[u8],
    encoding: DataEncoding,
) -> Result<usize> {
    let size = get_string_size(value.value_type(), data)?;
    value.append_entry_data(&data[..size], encoding)
}

/// Replaces the data of `value` by the strings packed in `data`, one entry per string.
///
/// An empty string or the end of `data` ends the array. Returns the number of entries.
/// Data shorter than one terminator is an error and leaves `value` unchanged.
pub fn set_data_strings_array(
    value: &mut Value<'_>,
    data: &[u8],
    encoding: DataEncoding,
) -> Result<usize> {
    let width = terminator_width(value.value_type())?;
    if data.len() < width {
        return Err(ValueError::UnsupportedSize {
            what: "string array data",
            size: data.len(),
        });
    }

    let mut strings = Vec::new();
    let mut offset = 0;
    while let Some(size) = string_size_with_width(&data[offset..], width) {
        if size == width && data[offset..offset + width].iter().all(|&b| b == 0) {
            break;
        }
        strings.push(&data[offset..offset + size]);
        offset += size;
    }
    trace!(
        "{} strings in {} bytes of {} array data",
        strings.len(),
        data.len(),
        value.value_type()
    );

    value.clear_data();
    for string in &strings {
        value.append_entry_data(string, encoding)?;
    }

    Ok(strings.len())
}
