#![allow(dead_code)]
use fvalue::{DataEncoding, Endianness, Value, ValueType};

use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

pub const LE: DataEncoding = DataEncoding::Endianness(Endianness::LittleEndian);
pub const BE: DataEncoding = DataEncoding::Endianness(Endianness::BigEndian);

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

/// A value of `value_type` holding a copy of `data`.
pub fn value_with_data(value_type: ValueType, data: &[u8], encoding: DataEncoding) -> Value<'static> {
    let mut value = Value::new(value_type);
    value.set_data(data, encoding).unwrap();
    value
}

/// Same as [`value_with_data`], with an identifier.
pub fn named_value(
    identifier: &str,
    value_type: ValueType,
    data: &[u8],
    encoding: DataEncoding,
) -> Value<'static> {
    let mut value = value_with_data(value_type, data, encoding);
    value.set_identifier(identifier.as_bytes()).unwrap();
    value
}

/// The UTF-8 rendering of entry `index`, panics when the value has none.
pub fn rendered(value: &Value<'_>, index: usize) -> String {
    value
        .to_utf8_string(index)
        .unwrap()
        .expect("value should render entry")
}

/// A FILETIME of 2018-05-03 17:42:11.4796174 UTC.
pub const FILETIME_2018: u64 = 0x01d3_e306_10c9_0a8e;

/// The GUID 54849625-5478-4994-a5ba-3e3b0328c30d in its on-disk layout.
pub const GUID_BYTES: [u8; 16] = [
    0x25, 0x96, 0x84, 0x54, 0x78, 0x54, 0x94, 0x49, 0xa5, 0xba, 0x3e, 0x3b, 0x03, 0x28, 0xc3, 0x0d,
];

/// S-1-5-21-1-2-3-500
pub const ADMINISTRATOR_SID: [u8; 28] = [
    1, 5, 0, 0, 0, 0, 0, 5, 21, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0xf4, 1, 0, 0,
];
