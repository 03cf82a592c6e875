use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValueError>;

/// The broad class an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// The caller passed an invalid or out-of-range argument.
    Arguments,
    /// An internal invariant did not hold (missing data, already set value, overflow...).
    Runtime,
    /// External-format input could not be transcoded.
    Conversion,
    Io,
}

/// The operation a runtime error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOperation {
    Get,
    Set,
    Copy,
    Append,
    Initialize,
    Finalize,
}

impl fmt::Display for RuntimeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeOperation::Get => "get",
            RuntimeOperation::Set => "set",
            RuntimeOperation::Copy => "copy",
            RuntimeOperation::Append => "append",
            RuntimeOperation::Initialize => "initialize",
            RuntimeOperation::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ValueError {
    /// Errors related to arguments
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("{what} {value} out of bounds (limit {limit})")]
    OutOfBounds {
        what: &'static str,
        value: usize,
        limit: usize,
    },

    #[error("unsupported {what} flags 0x{flags:08x}")]
    UnsupportedFormat { what: &'static str, flags: u32 },

    #[error("unsupported encoding {encoding} for {what}")]
    UnsupportedEncoding { what: &'static str, encoding: String },

    #[error("unsupported {what} size {size}")]
    UnsupportedSize { what: &'static str, size: usize },

    #[error("value entry {index} (offset {offset}, size {size}) exceeds data size {data_size}")]
    EntryOutOfRange {
        index: usize,
        offset: usize,
        size: usize,
        data_size: usize,
    },

    /// Errors related to internal state
    #[error("unable to {operation} {what}: missing {missing}")]
    Missing {
        operation: RuntimeOperation,
        what: &'static str,
        missing: &'static str,
    },

    #[error("{what} already set")]
    AlreadySet { what: &'static str },

    #[error("value entry {index} has size {size}, cannot write {requested} bytes into it")]
    EntrySizeMismatch {
        index: usize,
        size: usize,
        requested: usize,
    },

    #[error("value 0x{value:x} exceeds the {bit_width}-bit range")]
    ValueOutOfRange { value: u64, bit_width: usize },

    #[error("unsupported bit width {bit_width}")]
    UnsupportedBitWidth { bit_width: usize },

    #[error("unsupported character 0x{character:x} in {what} at index {index}")]
    UnsupportedCharacter {
        what: &'static str,
        character: u32,
        index: usize,
    },

    #[error("{what} exceeds the maximum of {max_digits} digits")]
    StringTooLarge { what: &'static str, max_digits: usize },

    #[error("unable to {operation} {what}: not implemented")]
    Unimplemented {
        operation: RuntimeOperation,
        what: &'static str,
    },

    #[error("unable to {operation} {what}: {reason}")]
    Runtime {
        operation: RuntimeOperation,
        what: &'static str,
        reason: String,
    },

    /// Errors related to transcoding
    #[error("failed to convert {what}: {reason}")]
    Conversion { what: &'static str, reason: String },

    #[error("unsupported codepage {codepage}")]
    UnsupportedCodepage { codepage: u32 },

    #[error("An I/O error has occurred: {0}")]
    Io(#[from] io::Error),
}

impl ValueError {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            ValueError::InvalidArgument { .. }
            | ValueError::OutOfBounds { .. }
            | ValueError::UnsupportedFormat { .. }
            | ValueError::UnsupportedEncoding { .. }
            | ValueError::UnsupportedSize { .. }
            | ValueError::EntryOutOfRange { .. } => ErrorDomain::Arguments,

            ValueError::Missing { .. }
            | ValueError::AlreadySet { .. }
            | ValueError::EntrySizeMismatch { .. }
            | ValueError::ValueOutOfRange { .. }
            | ValueError::UnsupportedBitWidth { .. }
            | ValueError::UnsupportedCharacter { .. }
            | ValueError::StringTooLarge { .. }
            | ValueError::Unimplemented { .. }
            | ValueError::Runtime { .. } => ErrorDomain::Runtime,

            ValueError::Conversion { .. } | ValueError::UnsupportedCodepage { .. } => {
                ErrorDomain::Conversion
            }

            ValueError::Io(_) => ErrorDomain::Io,
        }
    }

    /// The sub-kind of a runtime error, if it carries one.
    pub fn operation(&self) -> Option<RuntimeOperation> {
        match self {
            ValueError::Missing { operation, .. }
            | ValueError::Unimplemented { operation, .. }
            | ValueError::Runtime { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

#[inline]
pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> ValueError {
    ValueError::InvalidArgument {
        name,
        reason: reason.into(),
    }
}

#[inline]
pub(crate) fn conversion(what: &'static str, reason: impl fmt::Display) -> ValueError {
    ValueError::Conversion {
        what,
        reason: reason.to_string(),
    }
}

#[inline]
pub(crate) fn out_of_bounds(what: &'static str, value: usize, limit: usize) -> ValueError {
    ValueError::OutOfBounds { what, value, limit }
}
