//! A typed value: one data handle bound to the conversions of one value type.
//!
//! Decoding is lazy. The first request for an entry's instance decodes the entry bytes and
//! caches the result; every operation that changes or reallocates the data evicts the
//! instances it affects before returning.

use crate::data_handle::{DataEncoding, DataHandle};
use crate::err::{Result, ValueError, invalid_argument, out_of_bounds};
use crate::instance::{InstanceOps, IntegerFormat, ValueInstance};
use crate::utils::unicode::CodeUnit;
use crate::value_entry::ValueEntry;
use crate::value_type::ValueType;

use log::{debug, trace};
use quick_xml::escape::escape;
use serde_json::json;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::fmt::Write as FmtWrite;
use std::io;

const INTEGER_FORMAT_TYPE_MASK: u32 = 0x0000_00ff;

#[derive(Debug)]
pub struct Value<'a> {
    identifier: Option<Cow<'a, [u8]>>,
    value_type: ValueType,
    data_handle: DataHandle<'a>,
    ops: &'static InstanceOps,
    /// One slot per value entry.
    instances: Vec<OnceCell<ValueInstance>>,
    format_flags: u32,
}

impl<'a> Value<'a> {
    /// An empty value of `value_type`, see [`crate::value_type::new_value`].
    pub fn new(value_type: ValueType) -> Self {
        crate::value_type::new_value(value_type)
    }

    /// Binds a data handle to a set of conversions. Without a handle the value creates
    /// and owns an empty one.
    pub fn with_ops(
        value_type: ValueType,
        data_handle: Option<DataHandle<'a>>,
        ops: &'static InstanceOps,
        format_flags: u32,
    ) -> Self {
        let mut value = Value {
            identifier: None,
            value_type,
            data_handle: data_handle.unwrap_or_default(),
            ops,
            instances: Vec::new(),
            format_flags,
        };
        value.reset_instances();
        value
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type.name()
    }

    pub fn type_description(&self) -> &'static str {
        self.value_type.description()
    }

    pub fn ops(&self) -> &'static InstanceOps {
        self.ops
    }

    pub fn format_flags(&self) -> u32 {
        self.format_flags
    }

    /// Format flags only affect rendering, cached instances stay valid.
    pub fn set_format_flags(&mut self, format_flags: u32) {
        self.format_flags = format_flags;
    }

    pub fn data_handle(&self) -> &DataHandle<'a> {
        &self.data_handle
    }

    pub fn into_data_handle(self) -> DataHandle<'a> {
        self.data_handle
    }

    /// Sizes the cache to the entries of the data, dropping every cached instance.
    fn reset_instances(&mut self) {
        let cached = self.instances.iter().filter(|slot| slot.get().is_some()).count();
        if cached > 0 {
            debug!("evicting {} cached {} instances", cached, self.value_type);
        }
        self.instances.clear();
        self.instances
            .resize_with(self.data_handle.number_of_value_entries(), OnceCell::new);
    }

    fn evict_instance(&mut self, index: usize) {
        if let Some(slot) = self.instances.get_mut(index) {
            if slot.take().is_some() {
                debug!("evicting cached {} instance {}", self.value_type, index);
            }
        }
    }

    pub fn identifier(&self) -> Option<&[u8]> {
        self.identifier.as_deref()
    }

    /// Copies `identifier` into the value. An identifier can only be set once.
    pub fn set_identifier(&mut self, identifier: &[u8]) -> Result<()> {
        self.replace_identifier(Cow::Owned(identifier.to_vec()))
    }

    /// Borrows `identifier` for the lifetime of the value.
    pub fn set_identifier_by_reference(&mut self, identifier: &'a [u8]) -> Result<()> {
        self.replace_identifier(Cow::Borrowed(identifier))
    }

    fn replace_identifier(&mut self, identifier: Cow<'a, [u8]>) -> Result<()> {
        if identifier.is_empty() {
            return Err(invalid_argument("identifier", "identifier must not be empty"));
        }
        if self.identifier.is_some() {
            return Err(ValueError::AlreadySet {
                what: "value identifier",
            });
        }
        self.identifier = Some(identifier);
        Ok(())
    }

    /// Drops the identifier, the data and every cached instance.
    pub fn clear(&mut self) {
        self.identifier = None;
        self.data_handle.clear();
        self.reset_instances();
    }

    pub fn has_data(&self) -> bool {
        self.data_handle.has_data()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data_handle.data()
    }

    pub fn data_size(&self) -> usize {
        self.data_handle.data_size()
    }

    pub fn encoding(&self) -> DataEncoding {
        self.data_handle.encoding()
    }

    /// Allocates `size` zeroed bytes of data. Only allowed while the value has no data.
    pub fn initialize_data(&mut self, size: usize) -> Result<()> {
        if self.has_data() {
            return Err(ValueError::AlreadySet { what: "value data" });
        }
        if size == 0 {
            return Err(invalid_argument("size", "data size must be greater than zero"));
        }
        let encoding = self.data_handle.encoding();
        self.data_handle.set_data_owned(vec![0; size], encoding)?;
        self.reset_instances();
        Ok(())
    }

    /// Copies `data` into the value, replacing the previous data.
    pub fn set_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        if self.has_data() {
            debug!(
                "replacing {} bytes of {} data",
                self.data_size(),
                self.value_type
            );
        }
        self.data_handle.set_data(data, encoding)?;
        self.reset_instances();
        Ok(())
    }

    pub fn set_data_by_reference(&mut self, data: &'a [u8], encoding: DataEncoding) -> Result<()> {
        self.data_handle.set_data_by_reference(data, encoding)?;
        self.reset_instances();
        Ok(())
    }

    pub fn set_data_owned(&mut self, data: Vec<u8>, encoding: DataEncoding) -> Result<()> {
        self.data_handle.set_data_owned(data, encoding)?;
        self.reset_instances();
        Ok(())
    }

    /// Drops the data and the cached instances, keeps the identifier.
    pub fn clear_data(&mut self) {
        self.data_handle.clear_data();
        self.reset_instances();
    }

    /// Copies the data into `out`, returns the number of bytes copied.
    pub fn copy_data(&self, out: &mut [u8]) -> Result<usize> {
        let data = self.data().ok_or(ValueError::Missing {
            operation: crate::err::RuntimeOperation::Copy,
            what: "value data",
            missing: "data",
        })?;
        if out.len() < data.len() {
            return Err(out_of_bounds("data buffer size", out.len(), data.len()));
        }
        out[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Number of entries, including an entry that only exists as a written instance.
    pub fn number_of_value_entries(&self) -> usize {
        self.instances.len()
    }

    pub fn value_entry(&self, index: usize) -> Result<ValueEntry> {
        self.data_handle.value_entry(index)
    }

    pub fn set_value_entry(&mut self, index: usize, offset: usize, size: usize) -> Result<()> {
        self.data_handle.set_value_entry(index, offset, size)?;
        self.evict_instance(index);
        Ok(())
    }

    pub fn append_value_entry(&mut self, offset: usize, size: usize) -> Result<usize> {
        let index = self.data_handle.append_value_entry(offset, size)?;
        self.instances.resize_with(index + 1, OnceCell::new);
        Ok(index)
    }

    pub fn entry_data(&self, index: usize) -> Result<(&[u8], DataEncoding)> {
        self.data_handle.value_entry_data(index)
    }

    /// Overwrites the bytes of one entry, see [`DataHandle::set_value_entry_data`].
    pub fn set_entry_data(&mut self, index: usize, data: &[u8], encoding: DataEncoding) -> Result<()> {
        let had_data = self.has_data();
        self.data_handle.set_value_entry_data(index, data, encoding)?;
        if had_data {
            self.evict_instance(index);
        } else {
            self.reset_instances();
        }
        Ok(())
    }

    /// Appends `data` as a new entry. The buffer is reallocated, so every cached instance
    /// is evicted.
    pub fn append_entry_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<usize> {
        let index = self.data_handle.append_value_entry_data(data, encoding)?;
        self.reset_instances();
        Ok(index)
    }

    /// The decoded instance of entry `index`.
    ///
    /// `None` when the value has no data or its type has no instances. Decode errors are
    /// not cached, asking again decodes again.
    pub fn value_instance(&self, index: usize) -> Result<Option<&ValueInstance>> {
        if let Some(instance) = self.instances.get(index).and_then(OnceCell::get) {
            return Ok(Some(instance));
        }
        if !self.has_data() {
            return Ok(None);
        }
        let slot = self
            .instances
            .get(index)
            .ok_or_else(|| out_of_bounds("value entry index", index, self.instances.len()))?;
        let (Some(initialize), Some(copy_from_byte_stream)) =
            (self.ops.initialize, self.ops.copy_from_byte_stream)
        else {
            return Ok(None);
        };

        let (data, encoding) = self.data_handle.value_entry_data(index)?;
        trace!(
            "decoding {} entry {} ({} bytes, {})",
            self.value_type,
            index,
            data.len(),
            encoding
        );
        let mut instance = initialize();
        copy_from_byte_stream(&mut instance, data, encoding)?;

        Ok(Some(slot.get_or_init(|| instance)))
    }

    /// The instance a write goes into, created when missing. A value without data gets a
    /// slot for entry 0.
    fn instance_for_write(&mut self, index: usize) -> Result<Option<&mut ValueInstance>> {
        let Some(initialize) = self.ops.initialize else {
            return Ok(None);
        };
        if index >= self.instances.len() {
            if self.has_data() || index != 0 {
                return Err(out_of_bounds(
                    "value entry index",
                    index,
                    self.instances.len(),
                ));
            }
            self.instances.push(OnceCell::new());
        }

        let slot = &mut self.instances[index];
        slot.get_or_init(initialize);
        Ok(slot.get_mut())
    }

    pub fn copy_to_byte_stream(&self, index: usize, encoding: DataEncoding) -> Result<Option<Vec<u8>>> {
        let Some(copy_to_byte_stream) = self.ops.copy_to_byte_stream else {
            return Ok(None);
        };
        match self.value_instance(index)? {
            Some(instance) => copy_to_byte_stream(instance, encoding).map(Some),
            None => Ok(None),
        }
    }

    /// The integer value of entry `index` and its bit width.
    pub fn copy_to_integer(&self, index: usize) -> Result<Option<(u64, usize)>> {
        let Some(copy_to_integer) = self.ops.copy_to_integer else {
            return Ok(None);
        };
        match self.value_instance(index)? {
            Some(instance) => copy_to_integer(instance).map(Some),
            None => Ok(None),
        }
    }

    /// Stores an integer into the instance of entry `index`. `false` when the type has no
    /// integer form.
    pub fn copy_from_integer(&mut self, index: usize, value: u64, bit_width: usize) -> Result<bool> {
        let Some(copy_from_integer) = self.ops.copy_from_integer else {
            return Ok(false);
        };
        match self.instance_for_write(index)? {
            Some(instance) => {
                copy_from_integer(instance, value, bit_width)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn copy_to_narrow_integer(&self, index: usize, bit_width: usize) -> Result<Option<u64>> {
        let Some((value, _)) = self.copy_to_integer(index)? else {
            return Ok(None);
        };
        if bit_width < 64 && value >> bit_width != 0 {
            return Err(ValueError::ValueOutOfRange { value, bit_width });
        }
        Ok(Some(value))
    }

    pub fn copy_to_boolean(&self, index: usize) -> Result<Option<bool>> {
        Ok(self.copy_to_integer(index)?.map(|(value, _)| value != 0))
    }

    pub fn copy_to_8bit(&self, index: usize) -> Result<Option<u8>> {
        Ok(self.copy_to_narrow_integer(index, 8)?.map(|value| value as u8))
    }

    pub fn copy_to_16bit(&self, index: usize) -> Result<Option<u16>> {
        Ok(self.copy_to_narrow_integer(index, 16)?.map(|value| value as u16))
    }

    pub fn copy_to_32bit(&self, index: usize) -> Result<Option<u32>> {
        Ok(self.copy_to_narrow_integer(index, 32)?.map(|value| value as u32))
    }

    pub fn copy_to_64bit(&self, index: usize) -> Result<Option<u64>> {
        self.copy_to_narrow_integer(index, 64)
    }

    pub fn copy_from_boolean(&mut self, index: usize, value: bool) -> Result<bool> {
        self.copy_from_integer(index, u64::from(value), 8)
    }

    pub fn copy_from_8bit(&mut self, index: usize, value: u8) -> Result<bool> {
        self.copy_from_integer(index, u64::from(value), 8)
    }

    pub fn copy_from_16bit(&mut self, index: usize, value: u16) -> Result<bool> {
        self.copy_from_integer(index, u64::from(value), 16)
    }

    pub fn copy_from_32bit(&mut self, index: usize, value: u32) -> Result<bool> {
        self.copy_from_integer(index, u64::from(value), 32)
    }

    pub fn copy_from_64bit(&mut self, index: usize, value: u64) -> Result<bool> {
        self.copy_from_integer(index, value, 64)
    }

    pub fn copy_to_floating_point(&self, index: usize) -> Result<Option<(f64, usize)>> {
        let Some(copy_to_floating_point) = self.ops.copy_to_floating_point else {
            return Ok(None);
        };
        match self.value_instance(index)? {
            Some(instance) => copy_to_floating_point(instance).map(Some),
            None => Ok(None),
        }
    }

    pub fn copy_from_floating_point(
        &mut self,
        index: usize,
        value: f64,
        bit_width: usize,
    ) -> Result<bool> {
        let Some(copy_from_floating_point) = self.ops.copy_from_floating_point else {
            return Ok(false);
        };
        match self.instance_for_write(index)? {
            Some(instance) => {
                copy_from_floating_point(instance, value, bit_width)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fails when a finite value does not fit a single precision float.
    pub fn copy_to_float(&self, index: usize) -> Result<Option<f32>> {
        let Some((value, _)) = self.copy_to_floating_point(index)? else {
            return Ok(None);
        };
        if value.is_finite() && value.abs() > f64::from(f32::MAX) {
            return Err(ValueError::ValueOutOfRange {
                value: value.to_bits(),
                bit_width: 32,
            });
        }
        Ok(Some(value as f32))
    }

    pub fn copy_to_double(&self, index: usize) -> Result<Option<f64>> {
        Ok(self.copy_to_floating_point(index)?.map(|(value, _)| value))
    }

    pub fn copy_from_float(&mut self, index: usize, value: f32) -> Result<bool> {
        self.copy_from_floating_point(index, f64::from(value), 32)
    }

    pub fn copy_from_double(&mut self, index: usize, value: f64) -> Result<bool> {
        self.copy_from_floating_point(index, value, 64)
    }

    /// Number of code units of the string form of entry `index`, terminator included.
    pub fn get_string_size<U: CodeUnit>(&self, index: usize) -> Result<Option<usize>> {
        let Some(string_ops) = U::string_ops(self.ops) else {
            return Ok(None);
        };
        match self.value_instance(index)? {
            Some(instance) => (string_ops.get_size)(instance, self.format_flags).map(Some),
            None => Ok(None),
        }
    }

    /// Writes the string form of entry `index` and its terminator into `out` at `*out_index`.
    pub fn copy_to_string_with_index<U: CodeUnit>(
        &self,
        index: usize,
        out: &mut [U],
        out_index: &mut usize,
    ) -> Result<bool> {
        let Some(string_ops) = U::string_ops(self.ops) else {
            return Ok(false);
        };
        match self.value_instance(index)? {
            Some(instance) => {
                (string_ops.copy_to)(instance, out, out_index, self.format_flags)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Parses the string at `*input_index` into the instance of entry `index`.
    pub fn copy_from_string_with_index<U: CodeUnit>(
        &mut self,
        index: usize,
        input: &[U],
        input_index: &mut usize,
    ) -> Result<bool> {
        let Some(copy_from) = U::string_ops(self.ops).and_then(|string_ops| string_ops.copy_from)
        else {
            return Ok(false);
        };
        let format_flags = self.format_flags;
        match self.instance_for_write(index)? {
            Some(instance) => {
                copy_from(instance, input, input_index, format_flags)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get_utf8_string_size(&self, index: usize) -> Result<Option<usize>> {
        self.get_string_size::<u8>(index)
    }

    pub fn copy_to_utf8_string_with_index(
        &self,
        index: usize,
        out: &mut [u8],
        out_index: &mut usize,
    ) -> Result<bool> {
        self.copy_to_string_with_index(index, out, out_index)
    }

    pub fn copy_from_utf8_string_with_index(
        &mut self,
        index: usize,
        input: &[u8],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.copy_from_string_with_index(index, input, input_index)
    }

    pub fn get_utf16_string_size(&self, index: usize) -> Result<Option<usize>> {
        self.get_string_size::<u16>(index)
    }

    pub fn copy_to_utf16_string_with_index(
        &self,
        index: usize,
        out: &mut [u16],
        out_index: &mut usize,
    ) -> Result<bool> {
        self.copy_to_string_with_index(index, out, out_index)
    }

    pub fn copy_from_utf16_string_with_index(
        &mut self,
        index: usize,
        input: &[u16],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.copy_from_string_with_index(index, input, input_index)
    }

    pub fn get_utf32_string_size(&self, index: usize) -> Result<Option<usize>> {
        self.get_string_size::<u32>(index)
    }

    pub fn copy_to_utf32_string_with_index(
        &self,
        index: usize,
        out: &mut [u32],
        out_index: &mut usize,
    ) -> Result<bool> {
        self.copy_to_string_with_index(index, out, out_index)
    }

    pub fn copy_from_utf32_string_with_index(
        &mut self,
        index: usize,
        input: &[u32],
        input_index: &mut usize,
    ) -> Result<bool> {
        self.copy_from_string_with_index(index, input, input_index)
    }

    /// The string form of entry `index`, through the UTF-8 conversions of the type.
    pub fn to_utf8_string(&self, index: usize) -> Result<Option<String>> {
        let Some(size) = self.get_utf8_string_size(index)? else {
            return Ok(None);
        };
        let mut buffer = vec![0_u8; size];
        let mut position = 0;
        if !self.copy_to_utf8_string_with_index(index, &mut buffer, &mut position)? {
            return Ok(None);
        }
        buffer.truncate(position.saturating_sub(1));

        String::from_utf8(buffer)
            .map(Some)
            .map_err(|e| crate::err::conversion("utf-8 string", e))
    }

    fn identifier_text(&self) -> Cow<'_, str> {
        match self.identifier() {
            Some(identifier) => String::from_utf8_lossy(identifier),
            None => Cow::Borrowed("value"),
        }
    }

    /// Renders the value as `<identifier type="name">entry,entry</identifier>`.
    pub fn print(&self) -> Result<String> {
        let identifier = self.identifier_text();
        let mut out = String::new();
        write!(
            &mut out,
            "<{} type=\"{}\">",
            escape(&*identifier),
            self.type_name()
        )
        .expect("writing to a String cannot fail");

        for index in 0..self.number_of_value_entries() {
            if index > 0 {
                out.push(',');
            }
            if let Some(text) = self.to_utf8_string(index)? {
                out.push_str(&escape(text.as_str()));
            }
        }

        write!(&mut out, "</{}>", escape(&*identifier))
            .expect("writing to a String cannot fail");
        Ok(out)
    }

    pub fn write_to_stream<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let rendered = self.print()?;
        writer.write_all(rendered.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn entry_to_json(&self, index: usize) -> Result<serde_json::Value> {
        if self.value_type.is_integer() {
            let Some(instance) = self.value_instance(index)? else {
                return Ok(serde_json::Value::Null);
            };
            if let ValueInstance::Integer(integer) = instance {
                let format = self.format_flags;
                return Ok(if format & INTEGER_FORMAT_TYPE_MASK == IntegerFormat::BOOLEAN.bits() {
                    json!(integer.value() != 0)
                } else if IntegerFormat::from_bits_truncate(format).contains(IntegerFormat::SIGNED) {
                    json!(integer.as_signed())
                } else {
                    json!(integer.value())
                });
            }
        }
        if self.value_type.is_floating_point() {
            return Ok(match self.copy_to_double(index)? {
                Some(value) => json!(value),
                None => serde_json::Value::Null,
            });
        }

        Ok(match self.to_utf8_string(index)? {
            Some(text) => json!(text),
            None => serde_json::Value::Null,
        })
    }

    /// A single entry becomes a scalar, several entries an array, no data `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self.number_of_value_entries() {
            0 => Ok(serde_json::Value::Null),
            1 => self.entry_to_json(0),
            count => (0..count)
                .map(|index| self.entry_to_json(index))
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
        }
    }

    /// Converts a value borrowing its identifier or data into one that owns both.
    pub fn into_owned(self) -> Value<'static> {
        Value {
            identifier: self.identifier.map(|id| Cow::Owned(id.into_owned())),
            value_type: self.value_type,
            data_handle: self.data_handle.into_owned(),
            ops: self.ops,
            instances: self.instances,
            format_flags: self.format_flags,
        }
    }
}

/// Deep copy of the identifier and data. Instances are not copied, the clone decodes them
/// again on first access.
impl Clone for Value<'_> {
    fn clone(&self) -> Self {
        let mut value = Value {
            identifier: self
                .identifier
                .as_ref()
                .map(|identifier| Cow::Owned(identifier.to_vec())),
            value_type: self.value_type,
            data_handle: self.data_handle.clone(),
            ops: self.ops,
            instances: Vec::new(),
            format_flags: self.format_flags,
        };
        value.reset_instances();
        value
    }
}
