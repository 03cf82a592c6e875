mod fixtures;
use fixtures::*;

use fvalue::{
    BinaryDataFormat, Codepage, DataEncoding, ErrorDomain, GuidFormat, IntegerFormat, Value,
    ValueError, ValueSettings, ValueType, new_value_with_settings, set_data_strings_array,
};
use pretty_assertions::assert_eq;

#[test]
fn test_filetime() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::Filetime, &FILETIME_2018.to_le_bytes(), LE);

    assert_eq!(rendered(&value, 0), "2018-05-03T17:42:11.479617400Z");
    assert_eq!(value.copy_to_integer(0).unwrap(), Some((FILETIME_2018, 64)));
    assert_eq!(value.type_name(), "filetime");
    assert_eq!(value.copy_to_floating_point(0).unwrap(), None);
}

#[test]
fn test_filetime_big_endian() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::Filetime, &FILETIME_2018.to_be_bytes(), BE);
    assert_eq!(rendered(&value, 0), "2018-05-03T17:42:11.479617400Z");
}

#[test]
fn test_guid_formats_from_settings() {
    ensure_env_logger_initialized();
    let mut value = value_with_data(ValueType::Guid, &GUID_BYTES, LE);
    assert_eq!(rendered(&value, 0), "54849625-5478-4994-a5ba-3e3b0328c30d");

    let settings =
        ValueSettings::new().guid_format(GuidFormat::UPPER_CASE | GuidFormat::SURROUNDING_BRACES);
    value.set_format_flags(settings.format_flags_for(ValueType::Guid));
    assert_eq!(rendered(&value, 0), "{54849625-5478-4994-A5BA-3E3B0328C30D}");
    assert_eq!(value.get_utf8_string_size(0).unwrap(), Some(39));
}

#[test]
fn test_sid() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::NtSecurityIdentifier, &ADMINISTRATOR_SID, LE);
    assert_eq!(rendered(&value, 0), "S-1-5-21-1-2-3-500");
    assert_eq!(value.copy_to_integer(0).unwrap(), None);
}

#[test]
fn test_floating_point() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::FloatingPoint64, &1.0_f64.to_le_bytes(), LE);
    assert_eq!(rendered(&value, 0), "1.000000e+00");
    assert_eq!(value.copy_to_float(0).unwrap(), Some(1.0));

    let huge = value_with_data(ValueType::FloatingPoint64, &1e300_f64.to_le_bytes(), LE);
    assert_eq!(huge.copy_to_double(0).unwrap(), Some(1e300));
    assert!(matches!(
        huge.copy_to_float(0),
        Err(ValueError::ValueOutOfRange { bit_width: 32, .. })
    ));

    let mut written = Value::new(ValueType::FloatingPoint32);
    assert!(written.copy_from_float(0, 0.5).unwrap());
    assert_eq!(written.copy_to_double(0).unwrap(), Some(0.5));
}

#[test]
fn test_integer_narrowing() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::UnsignedInteger32, &300_u32.to_le_bytes(), LE);
    assert_eq!(value.copy_to_32bit(0).unwrap(), Some(300));
    assert_eq!(value.copy_to_16bit(0).unwrap(), Some(300));
    assert!(matches!(
        value.copy_to_8bit(0),
        Err(ValueError::ValueOutOfRange { value: 300, bit_width: 8 })
    ));
    assert_eq!(value.copy_to_boolean(0).unwrap(), Some(true));
}

#[test]
fn test_integer_without_data() {
    ensure_env_logger_initialized();
    let mut value = Value::new(ValueType::UnsignedInteger16);
    assert_eq!(value.copy_to_16bit(0).unwrap(), None);

    assert!(value.copy_from_16bit(0, 0xbeef).unwrap());
    assert_eq!(value.copy_to_16bit(0).unwrap(), Some(0xbeef));

    value.set_format_flags(IntegerFormat::HEXADECIMAL.bits());
    assert_eq!(rendered(&value, 0), "0xbeef");
    assert!(!value.has_data());
}

#[test]
fn test_integer_format_from_settings() {
    ensure_env_logger_initialized();
    let settings = ValueSettings::new().integer_format(IntegerFormat::HEXADECIMAL);
    let mut value = new_value_with_settings(ValueType::UnsignedInteger8, &settings);
    value.set_data(&[0x0f], LE).unwrap();
    assert_eq!(rendered(&value, 0), "0x0f");

    let mut flag = new_value_with_settings(ValueType::Boolean, &settings);
    flag.set_data(&[0], LE).unwrap();
    assert_eq!(rendered(&flag, 0), "false");
}

#[test]
fn test_byte_stream_strings_follow_their_codepage() {
    ensure_env_logger_initialized();
    let value = value_with_data(
        ValueType::StringByteStream,
        b"caf\xe9\0",
        DataEncoding::Codepage(Codepage::Windows1252),
    );
    assert_eq!(rendered(&value, 0), "caf\u{e9}");
    assert_eq!(value.get_utf8_string_size(0).unwrap(), Some(6));
    assert_eq!(value.get_utf16_string_size(0).unwrap(), Some(5));

    let missing_codepage = value_with_data(ValueType::StringByteStream, b"abc\0", DataEncoding::None);
    let err = missing_codepage.to_utf8_string(0).unwrap_err();
    assert_eq!(err.domain(), ErrorDomain::Arguments);
}

#[test]
fn test_utf16_strings_array() {
    ensure_env_logger_initialized();
    let mut value = Value::new(ValueType::StringUtf16);
    let count = set_data_strings_array(&mut value, b"o\0n\0e\0\0\0t\0w\0o\0\0\0\0\0", LE).unwrap();

    assert_eq!(count, 2);
    assert_eq!(rendered(&value, 1), "two");
    let json = serde_json::to_string(&value.to_json().unwrap()).unwrap();
    assert_eq!(json, r#"["one","two"]"#);
}

#[test]
fn test_binary_data_formats() {
    ensure_env_logger_initialized();
    let mut value = value_with_data(ValueType::BinaryData, b"\xde\xad\xbe\xef", DataEncoding::None);
    assert_eq!(rendered(&value, 0), "DEADBEEF");

    let settings = ValueSettings::new().binary_data_format(BinaryDataFormat::BASE64);
    value.set_format_flags(settings.format_flags_for(ValueType::BinaryData));
    assert_eq!(rendered(&value, 0), "3q2+7w==");
    assert_eq!(
        value.copy_to_byte_stream(0, DataEncoding::None).unwrap(),
        Some(b"\xde\xad\xbe\xef".to_vec())
    );
}

#[test]
fn test_null_has_no_instances() {
    ensure_env_logger_initialized();
    let mut value = Value::new(ValueType::Null);
    assert!(value.value_instance(0).unwrap().is_none());
    assert!(!value.copy_from_32bit(0, 1).unwrap());
    assert_eq!(value.copy_to_integer(0).unwrap(), None);
}
