#![deny(unused_must_use)]
#![forbid(unsafe_code)]
//! Typed values over raw byte buffers, for parsers of forensic formats.
//!
//! A parser stores the bytes of a field in a [`DataHandle`] (copied or borrowed), optionally
//! splits them into value entries, wraps them in a [`Value`] of some [`ValueType`] and files
//! the value under an identifier in a [`Table`]. Decoding into an integer, string, date
//! time or GUID happens on first access.
//!
//! ```
//! use fvalue::{DataEncoding, Endianness, Table, TableFlags, Value, ValueType};
//!
//! let mut value = Value::new(ValueType::UnsignedInteger32);
//! value.set_identifier(b"size")?;
//! value.set_data(&42_u32.to_le_bytes(), DataEncoding::Endianness(Endianness::LittleEndian))?;
//!
//! let mut table = Table::new();
//! table.set_value(value)?;
//!
//! let size = table
//!     .get_value_by_identifier(b"size", TableFlags::empty())?
//!     .and_then(|value| value.to_utf8_string(0).transpose())
//!     .transpose()?;
//! assert_eq!(size.as_deref(), Some("42"));
//! # Ok::<(), fvalue::ValueError>(())
//! ```

pub mod codepage;
pub mod data_handle;
pub mod err;
pub mod instance;
pub mod settings;
pub mod table;
pub mod value;
pub mod value_entry;
pub mod value_type;

mod utils;

pub use codepage::Codepage;
pub use data_handle::{DataEncoding, DataHandle, Endianness, EntriesReader};
pub use err::{ErrorDomain, Result, RuntimeOperation, ValueError};
pub use instance::{
    BinaryDataFormat, DateTimeFormat, FloatingPointFormat, GuidFormat, InstanceOps,
    IntegerFormat, StringOps, ValueInstance,
};
pub use settings::ValueSettings;
pub use table::{Table, TableFlags, TableValueMut, compare_identifier};
pub use utils::CodeUnit;
pub use value::Value;
pub use value_entry::ValueEntry;
pub use value_type::{
    ValueType, append_data_string, get_string_size, new_value, new_value_with_data_handle,
    new_value_with_settings, set_data_string, set_data_strings_array,
};

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Tests run concurrently, the logger must only be installed once.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
