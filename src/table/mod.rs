//! An identifier keyed, ordered collection of values.

mod value_mut;
mod xml;

pub use self::value_mut::TableValueMut;

use crate::err::{Result, ValueError, invalid_argument, out_of_bounds};
use crate::settings::ValueSettings;
use crate::value::Value;
use crate::value_type::new_value_with_settings;

use bitflags::bitflags;
use log::{debug, trace};
use std::cmp::Ordering;
use std::fmt::Write as FmtWrite;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TableFlags: u32 {
        /// Compare identifiers only up to the length of the shorter one.
        const ALLOW_PARTIAL_MATCH = 0x0000_0001;
    }
}

/// Compares the common prefix of two identifiers, then their lengths.
pub fn compare_identifier(first: &[u8], second: &[u8]) -> Ordering {
    let common = first.len().min(second.len());
    first[..common]
        .cmp(&second[..common])
        .then(first.len().cmp(&second.len()))
}

fn matches_identifier(candidate: &[u8], identifier: &[u8], flags: TableFlags) -> bool {
    if flags.contains(TableFlags::ALLOW_PARTIAL_MATCH) {
        let common = candidate.len().min(identifier.len());
        candidate[..common] == identifier[..common]
    } else {
        candidate == identifier
    }
}

/// Values sorted by identifier, at most one value per identifier.
#[derive(Debug, Clone, Default)]
pub struct Table<'a> {
    values: Vec<Value<'a>>,
}

impl<'a> Table<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value<'a>] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value<'a>> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Index of the first value whose identifier matches, `None` when nothing matches.
    pub fn get_index_by_identifier(
        &self,
        identifier: &[u8],
        flags: TableFlags,
    ) -> Result<Option<usize>> {
        if identifier.is_empty() {
            return Err(invalid_argument("identifier", "identifier must not be empty"));
        }

        Ok(self.values.iter().position(|value| {
            value
                .identifier()
                .is_some_and(|candidate| matches_identifier(candidate, identifier, flags))
        }))
    }

    pub fn get_value_by_index(&self, index: usize) -> Result<&Value<'a>> {
        let len = self.values.len();
        self.values
            .get(index)
            .ok_or_else(|| out_of_bounds("value index", index, len))
    }

    /// The value at `index`, with its identifier fixed.
    pub fn get_value_by_index_mut(&mut self, index: usize) -> Result<TableValueMut<'_, 'a>> {
        let len = self.values.len();
        self.values
            .get_mut(index)
            .map(TableValueMut::new)
            .ok_or_else(|| out_of_bounds("value index", index, len))
    }

    pub fn get_value_by_identifier(
        &self,
        identifier: &[u8],
        flags: TableFlags,
    ) -> Result<Option<&Value<'a>>> {
        Ok(self
            .get_index_by_identifier(identifier, flags)?
            .map(|index| &self.values[index]))
    }

    pub fn get_value_by_identifier_mut(
        &mut self,
        identifier: &[u8],
        flags: TableFlags,
    ) -> Result<Option<TableValueMut<'_, 'a>>> {
        Ok(self
            .get_index_by_identifier(identifier, flags)?
            .map(|index| TableValueMut::new(&mut self.values[index])))
    }

    /// Inserts `value` in identifier order, or replaces the value with the same identifier.
    /// Returns the index of the value.
    pub fn set_value(&mut self, value: Value<'a>) -> Result<usize> {
        let identifier = value.identifier().ok_or(ValueError::Missing {
            operation: crate::err::RuntimeOperation::Set,
            what: "table value",
            missing: "identifier",
        })?;

        let search = self.values.binary_search_by(|candidate| {
            compare_identifier(candidate.identifier().unwrap_or_default(), identifier)
        });
        match search {
            Ok(index) => {
                debug!(
                    "replacing table value `{}`",
                    String::from_utf8_lossy(identifier)
                );
                self.values[index] = value;
                Ok(index)
            }
            Err(index) => {
                trace!(
                    "inserting table value `{}` at {}",
                    String::from_utf8_lossy(identifier),
                    index
                );
                self.values.insert(index, value);
                Ok(index)
            }
        }
    }

    /// Removes the value with exactly this identifier.
    pub fn remove_value_by_identifier(&mut self, identifier: &[u8]) -> Result<Option<Value<'a>>> {
        Ok(self
            .get_index_by_identifier(identifier, TableFlags::empty())?
            .map(|index| self.values.remove(index)))
    }

    /// Reads `<table_tag_name><identifier>text</identifier>...</table_tag_name>` into
    /// UTF-8 string values, see [`Table::copy_from_utf8_xml_string_with_settings`].
    pub fn copy_from_utf8_xml_string(&mut self, xml: &[u8], table_tag_name: &[u8]) -> Result<bool> {
        self.copy_from_utf8_xml_string_with_settings(xml, table_tag_name, &ValueSettings::default())
    }

    /// Reads the children of the first `<table_tag_name>` element as values.
    ///
    /// The text between a child's open and close tags becomes the string data of the
    /// value with the child's name, created with the settings' XML value type when the
    /// table does not have it yet. Attributes are skipped. Returns `false` when the input
    /// ends before the table element is closed; values read until then stay in the table.
    pub fn copy_from_utf8_xml_string_with_settings(
        &mut self,
        xml: &[u8],
        table_tag_name: &[u8],
        settings: &ValueSettings,
    ) -> Result<bool> {
        let xml_value_type = settings.get_xml_value_type();
        if !xml_value_type.is_string() {
            return Err(invalid_argument(
                "xml_value_type",
                format!("{} is not a string type", xml_value_type),
            ));
        }
        if table_tag_name.is_empty() {
            return Err(invalid_argument(
                "table_tag_name",
                "table tag name must not be empty",
            ));
        }

        xml::scan(xml, table_tag_name, |identifier, text| {
            let index = match self.get_index_by_identifier(identifier, TableFlags::empty())? {
                Some(index) => index,
                None => {
                    let mut value = new_value_with_settings(xml_value_type, settings);
                    value.set_identifier(identifier)?;
                    self.set_value(value)?
                }
            };

            let value = &mut self.values[index];
            match text {
                Some(text) => {
                    let value_type = if value.value_type().is_string() {
                        value.value_type()
                    } else {
                        xml_value_type
                    };
                    let (data, encoding) = xml::encode_text(value_type, text)?;
                    value.set_data_owned(data, encoding)
                }
                None => {
                    value.clear_data();
                    Ok(())
                }
            }
        })
    }

    /// Writes the table the way [`Table::copy_from_utf8_xml_string`] reads it. Text is
    /// written as is, entries of one value are joined by `,`.
    pub fn write_utf8_xml_string(&self, table_tag_name: &str) -> Result<String> {
        let mut out = String::new();
        write!(&mut out, "<{}>", table_tag_name).expect("writing to a String cannot fail");

        for value in &self.values {
            let identifier = String::from_utf8_lossy(value.identifier().unwrap_or_default());
            let mut texts = Vec::with_capacity(value.number_of_value_entries());
            for index in 0..value.number_of_value_entries() {
                texts.push(value.to_utf8_string(index)?.unwrap_or_default());
            }
            write!(&mut out, "<{0}>{1}</{0}>", identifier, texts.join(","))
                .expect("writing to a String cannot fail");
        }

        write!(&mut out, "</{}>", table_tag_name).expect("writing to a String cannot fail");
        Ok(out)
    }

    /// An object of identifier to [`Value::to_json`], in table order.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut map = serde_json::Map::with_capacity(self.values.len());
        for value in &self.values {
            let identifier = String::from_utf8_lossy(value.identifier().unwrap_or_default());
            map.insert(identifier.into_owned(), value.to_json()?);
        }
        Ok(serde_json::Value::Object(map))
    }
}

impl<'t, 'a> IntoIterator for &'t Table<'a> {
    type Item = &'t Value<'a>;
    type IntoIter = std::slice::Iter<'t, Value<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
