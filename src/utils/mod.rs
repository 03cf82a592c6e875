pub(crate) mod base_n;
pub(crate) mod bytes;
pub mod unicode;
pub(crate) mod windows;

pub use self::unicode::CodeUnit;
