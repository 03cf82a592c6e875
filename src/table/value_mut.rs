use crate::data_handle::DataEncoding;
use crate::err::Result;
use crate::value::Value;

use std::ops::Deref;

/// Mutable access to a value owned by a [`Table`](super::Table).
///
/// The data, entries, instances and format flags can change. The identifier cannot, the
/// table keeps its values sorted and unique by identifier, so there is no `clear` or
/// `set_identifier` here:
///
/// ```compile_fail
/// use fvalue::{Table, TableFlags};
///
/// let mut table = Table::new();
/// if let Some(mut value) = table.get_value_by_identifier_mut(b"a", TableFlags::empty()).unwrap() {
///     value.clear();
/// }
/// ```
#[derive(Debug)]
pub struct TableValueMut<'t, 'a> {
    value: &'t mut Value<'a>,
}

impl<'t, 'a> TableValueMut<'t, 'a> {
    pub(super) fn new(value: &'t mut Value<'a>) -> Self {
        TableValueMut { value }
    }

    pub fn set_format_flags(&mut self, format_flags: u32) {
        self.value.set_format_flags(format_flags)
    }

    pub fn initialize_data(&mut self, size: usize) -> Result<()> {
        self.value.initialize_data(size)
    }

    pub fn set_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        self.value.set_data(data, encoding)
    }

    pub fn set_data_by_reference(&mut self, data: &'a [u8], encoding: DataEncoding) -> Result<()> {
        self.value.set_data_by_reference(data, encoding)
    }

    pub fn set_data_owned(&mut self, data: Vec<u8>, encoding: DataEncoding) -> Result<()> {
        self.value.set_data_owned(data, encoding)
    }

    /// Drops the data, the value stays in the table under its identifier.
    pub fn clear_data(&mut self) {
        self.value.clear_data()
    }

    pub fn set_value_entry(&mut self, index: usize, offset: usize, size: usize) -> Result<()> {
        self.value.set_value_entry(index, offset, size)
    }

    pub fn append_value_entry(&mut self, offset: usize, size: usize) -> Result<usize> {
        self.value.append_value_entry(offset, size)
    }

    pub fn set_entry_data(&mut self, index: usize, data: &[u8], encoding: DataEncoding) -> Result<()> {
        self.value.set_entry_data(index, data, encoding)
    }

    pub fn append_entry_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<usize> {
        self.value.append_entry_data(data, encoding)
    }

    pub fn copy_from_integer(&mut self, index: usize, value: u64, bit_width: usize) -> Result<bool> {
        self.value.copy_from_integer(index, value, bit_width)
    }

    pub fn copy_from_boolean(&mut self, index: usize, value: bool) -> Result<bool> {
        self.value.copy_from_boolean(index, value)
    }

    pub fn copy_from_8bit(&mut self, index: usize, value: u8) -> Result<bool> {
        self.value.copy_from_8bit(index, value)
    }

    pub fn copy_from_16bit(&mut self, index: usize, value: u16) -> Result<bool> {
        self.value.copy_from_16bit(index, value)
    }

    pub fn copy_from_32bit(&mut self, index: usize, value: u32) -> Result<bool> {
        self.value.copy_from_32bit(index, value)
    }

    pub fn copy_from_64bit(&mut self, index: usize, value: u64) -> Result<bool> {
        self.value.copy_from_64bit(index, value)
    }

    pub fn copy_from_floating_point(
        &mut self,
        index: usize,
        value: f64,
        bit_width: usize,
    ) -> Result<bool> {
        self.value.copy_from_floating_point(index, value, bit_width)
    }

    pub fn copy_from_float(&mut self, index: usize, value: f32) -> Result<bool> {
        self.value.copy_from_float(index, value)
    }

    pub fn copy_from_double(&mut self, index: usize, value: f64) -> Result<bool> {
        self.value.copy_from_double(index, value)
    }

    pub fn copy_from_utf8_string_with_index(
        &mut self,
        index: usize,
        input: &[u8],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.value.copy_from_utf8_string_with_index(index, input, input_index)
    }

    pub fn copy_from_utf16_string_with_index(
        &mut self,
        index: usize,
        input: &[u16],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.value.copy_from_utf16_string_with_index(index, input, input_index)
    }

    pub fn copy_from_utf32_string_with_index(
        &mut self,
        index: usize,
        input: &[u32],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.value.copy_from_utf32_string_with_index(index, input, input_index)
    }
}

impl<'a> Deref for TableValueMut<'_, 'a> {
    type Target = Value<'a>;

    fn deref(&self) -> &Value<'a> {
        self.value
    }
}
