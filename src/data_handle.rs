//! A raw byte buffer, either owned or borrowed, optionally segmented into value entries.
//!
//! Ownership replaces the "managed" and "clone by reference" flag pair: data set through
//! [`DataHandle::set_data`] is copied and owned by the handle, data set through
//! [`DataHandle::set_data_by_reference`] is borrowed for `'a` and never copied unless the
//! handle has to grow it. Growing a borrowed buffer (appending entry data) or writing into it
//! turns it into an owned copy first.

use crate::codepage::Codepage;
use crate::err::{Result, ValueError, invalid_argument, out_of_bounds};
use crate::value_entry::ValueEntry;

use log::{debug, trace};
use std::borrow::Cow;
use std::fmt;

/// Byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    BigEndian,
    LittleEndian,
    Native,
}

impl Endianness {
    /// Replaces `Native` with the byte order of the target.
    pub fn resolve(self) -> Endianness {
        match self {
            Endianness::Native if cfg!(target_endian = "big") => Endianness::BigEndian,
            Endianness::Native => Endianness::LittleEndian,
            other => other,
        }
    }
}

/// How the bytes of a data handle are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataEncoding {
    /// Opaque bytes (binary data).
    #[default]
    None,
    Endianness(Endianness),
    Codepage(Codepage),
}

impl DataEncoding {
    pub fn endianness(self) -> Option<Endianness> {
        match self {
            DataEncoding::Endianness(e) => Some(e.resolve()),
            _ => None,
        }
    }

    pub fn codepage(self) -> Option<Codepage> {
        match self {
            DataEncoding::Codepage(cp) => Some(cp),
            _ => None,
        }
    }
}

impl fmt::Display for DataEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataEncoding::None => f.write_str("none"),
            DataEncoding::Endianness(Endianness::BigEndian) => f.write_str("big-endian"),
            DataEncoding::Endianness(Endianness::LittleEndian) => f.write_str("little-endian"),
            DataEncoding::Endianness(Endianness::Native) => f.write_str("native-endian"),
            DataEncoding::Codepage(cp) => write!(f, "codepage {}", cp.name()),
        }
    }
}

/// Segments freshly set data into value entries.
///
/// Runs after every [`DataHandle::set_data`]; the returned entries are validated against
/// the data before anything is committed.
pub type EntriesReader = fn(&[u8], DataEncoding, u32) -> Result<Vec<ValueEntry>>;

#[derive(Debug, Default)]
pub struct DataHandle<'a> {
    data: Option<Cow<'a, [u8]>>,
    encoding: DataEncoding,
    data_flags: u32,
    /// `None` means a single implicit entry covering the whole buffer.
    value_entries: Option<Vec<ValueEntry>>,
    read_value_entries: Option<EntriesReader>,
}

impl<'a> DataHandle<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries_reader(read_value_entries: EntriesReader) -> Self {
        DataHandle {
            read_value_entries: Some(read_value_entries),
            ..Self::default()
        }
    }

    /// Drops the data and entries and resets every field, including the entries reader.
    pub fn clear(&mut self) {
        *self = DataHandle::default();
    }

    /// Drops the data and entries, keeps the encoding, flags and entries reader.
    pub fn clear_data(&mut self) {
        self.data = None;
        self.value_entries = None;
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn data_size(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }

    pub fn encoding(&self) -> DataEncoding {
        self.encoding
    }

    pub fn data_flags(&self) -> u32 {
        self.data_flags
    }

    pub fn set_data_flags(&mut self, data_flags: u32) {
        self.data_flags = data_flags;
    }

    /// Whether the data is borrowed rather than owned by the handle.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Some(Cow::Borrowed(_)))
    }

    /// Copies `data` into the handle, replacing any previous data and entries.
    ///
    /// Empty `data` removes the data.
    pub fn set_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<()> {
        self.replace_data(Cow::Owned(data.to_vec()), encoding)
    }

    /// Stores `data` without copying it. The caller's buffer must outlive the handle.
    pub fn set_data_by_reference(&mut self, data: &'a [u8], encoding: DataEncoding) -> Result<()> {
        self.replace_data(Cow::Borrowed(data), encoding)
    }

    /// Takes ownership of `data` without copying it.
    pub fn set_data_owned(&mut self, data: Vec<u8>, encoding: DataEncoding) -> Result<()> {
        self.replace_data(Cow::Owned(data), encoding)
    }

    fn replace_data(&mut self, data: Cow<'a, [u8]>, encoding: DataEncoding) -> Result<()> {
        if data.is_empty() {
            debug!("clearing data handle data");
            self.data = None;
            self.value_entries = None;
            self.encoding = encoding;
            return Ok(());
        }

        let value_entries = match self.read_value_entries {
            Some(read_value_entries) => {
                let entries = read_value_entries(&data, encoding, self.data_flags)?;
                for (index, entry) in entries.iter().enumerate() {
                    entry.validate(index, data.len())?;
                }
                Some(entries)
            }
            None => None,
        };

        trace!(
            "setting {} bytes of data ({}), {} entries",
            data.len(),
            encoding,
            value_entries.as_ref().map_or(1, Vec::len)
        );

        self.data = Some(data);
        self.encoding = encoding;
        self.value_entries = value_entries;

        Ok(())
    }

    /// Number of value entries. Data without explicit entries counts as one entry.
    pub fn number_of_value_entries(&self) -> usize {
        match (&self.value_entries, &self.data) {
            (Some(entries), _) => entries.len(),
            (None, Some(_)) => 1,
            (None, None) => 0,
        }
    }

    pub fn value_entries(&self) -> Vec<ValueEntry> {
        (0..self.number_of_value_entries())
            .filter_map(|index| self.value_entry(index).ok())
            .collect()
    }

    pub fn value_entry(&self, index: usize) -> Result<ValueEntry> {
        match &self.value_entries {
            Some(entries) => entries
                .get(index)
                .copied()
                .ok_or_else(|| out_of_bounds("value entry index", index, entries.len())),
            None if self.data.is_some() && index == 0 => Ok(ValueEntry::new(0, self.data_size())),
            None => Err(out_of_bounds(
                "value entry index",
                index,
                self.number_of_value_entries(),
            )),
        }
    }

    /// Replaces the entries array with an explicit copy of the implicit single entry.
    fn materialize_value_entries(&mut self) -> &mut Vec<ValueEntry> {
        let implicit = match &self.data {
            Some(data) => vec![ValueEntry::new(0, data.len())],
            None => Vec::new(),
        };
        self.value_entries.get_or_insert(implicit)
    }

    pub fn set_value_entry(&mut self, index: usize, offset: usize, size: usize) -> Result<()> {
        let data_size = self.data_size();
        if self.data.is_none() {
            return Err(ValueError::Missing {
                operation: crate::err::RuntimeOperation::Set,
                what: "value entry",
                missing: "data",
            });
        }
        let entry = ValueEntry::new(offset, size);
        entry.validate(index, data_size)?;

        let entries = self.materialize_value_entries();
        let number_of_entries = entries.len();
        let slot = entries
            .get_mut(index)
            .ok_or_else(|| out_of_bounds("value entry index", index, number_of_entries))?;
        *slot = entry;

        Ok(())
    }

    /// Appends an entry over already present data, returns its index.
    pub fn append_value_entry(&mut self, offset: usize, size: usize) -> Result<usize> {
        let data_size = self.data_size();
        if self.data.is_none() {
            return Err(ValueError::Missing {
                operation: crate::err::RuntimeOperation::Append,
                what: "value entry",
                missing: "data",
            });
        }
        let index = self.number_of_value_entries();
        let entry = ValueEntry::new(offset, size);
        entry.validate(index, data_size)?;

        let entries = self.materialize_value_entries();
        entries.push(entry);

        Ok(index)
    }

    /// The bytes of one entry.
    pub fn value_entry_data(&self, index: usize) -> Result<(&[u8], DataEncoding)> {
        let entry = self.value_entry(index)?;
        let data = self.data.as_deref().unwrap_or_default();
        let range = entry.validate(index, data.len())?;

        Ok((&data[range], self.encoding))
    }

    /// Overwrites the bytes of an existing entry in place.
    ///
    /// The entry keeps its size; `data` must be exactly that long. Writing entry 0 of a
    /// handle without data sets the data instead.
    pub fn set_value_entry_data(
        &mut self,
        index: usize,
        data: &[u8],
        encoding: DataEncoding,
    ) -> Result<()> {
        if self.data.is_none() {
            if index != 0 {
                return Err(out_of_bounds("value entry index", index, 1));
            }
            return self.set_data(data, encoding);
        }
        if encoding != self.encoding {
            return Err(ValueError::UnsupportedEncoding {
                what: "value entry data",
                encoding: encoding.to_string(),
            });
        }

        let entry = self.value_entry(index)?;
        if entry.size != data.len() {
            return Err(ValueError::EntrySizeMismatch {
                index,
                size: entry.size,
                requested: data.len(),
            });
        }
        let range = entry.validate(index, self.data_size())?;

        if let Some(buffer) = self.data.as_mut() {
            buffer.to_mut()[range].copy_from_slice(data);
        }

        Ok(())
    }

    /// Grows the buffer by `data` and appends an entry covering exactly the new bytes.
    ///
    /// The buffer is reallocated (and a borrowed buffer is copied), so no address into the
    /// previous buffer stays valid. Returns the index of the new entry.
    pub fn append_value_entry_data(&mut self, data: &[u8], encoding: DataEncoding) -> Result<usize> {
        if data.is_empty() {
            return Err(invalid_argument("data", "value entry data must not be empty"));
        }

        match self.data.as_mut() {
            None => {
                self.data = Some(Cow::Owned(data.to_vec()));
                self.encoding = encoding;
                self.value_entries = Some(vec![ValueEntry::new(0, data.len())]);
                Ok(0)
            }
            Some(_) if encoding != self.encoding => Err(ValueError::UnsupportedEncoding {
                what: "appended value entry data",
                encoding: encoding.to_string(),
            }),
            Some(_) => {
                let offset = self.data_size();
                self.materialize_value_entries();

                let buffer = self.data.get_or_insert_with(|| Cow::Owned(Vec::new()));
                buffer.to_mut().extend_from_slice(data);

                let entries = self.materialize_value_entries();
                entries.push(ValueEntry::new(offset, data.len()));
                trace!(
                    "appended entry {} at offset {} ({} bytes)",
                    entries.len() - 1,
                    offset,
                    data.len()
                );
                Ok(entries.len() - 1)
            }
        }
    }

    /// Converts a borrowing handle into one that owns its data.
    pub fn into_owned(self) -> DataHandle<'static> {
        DataHandle {
            data: self.data.map(|data| Cow::Owned(data.into_owned())),
            encoding: self.encoding,
            data_flags: self.data_flags,
            value_entries: self.value_entries,
            read_value_entries: self.read_value_entries,
        }
    }
}

/// Cloning always deep-copies the data, even when the original borrows it.
impl Clone for DataHandle<'_> {
    fn clone(&self) -> Self {
        DataHandle {
            data: self.data.as_ref().map(|data| Cow::Owned(data.to_vec())),
            encoding: self.encoding,
            data_flags: self.data_flags,
            value_entries: self.value_entries.clone(),
            read_value_entries: self.read_value_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorDomain;
    use pretty_assertions::assert_eq;

    const LE: DataEncoding = DataEncoding::Endianness(Endianness::LittleEndian);

    fn assert_entries_fit(handle: &DataHandle<'_>) {
        for (index, entry) in handle.value_entries().iter().enumerate() {
            assert!(
                entry.fits(handle.data_size()),
                "entry {} {:?} exceeds {}",
                index,
                entry,
                handle.data_size()
            );
        }
    }

    #[test]
    fn test_append_grows_buffer_and_entries() {
        let mut handle = DataHandle::new();

        assert_eq!(handle.append_value_entry_data(b"AA", DataEncoding::None).unwrap(), 0);
        assert_entries_fit(&handle);
        assert_eq!(handle.append_value_entry_data(b"BBB", DataEncoding::None).unwrap(), 1);
        assert_entries_fit(&handle);

        assert_eq!(handle.data_size(), 5);
        assert_eq!(
            handle.value_entries(),
            vec![ValueEntry::new(0, 2), ValueEntry::new(2, 3)]
        );
        assert_eq!(handle.value_entry_data(1).unwrap().0, b"BBB");
    }

    #[test]
    fn test_implicit_entry_covers_whole_buffer() {
        let mut handle = DataHandle::new();
        assert_eq!(handle.number_of_value_entries(), 0);

        handle.set_data(b"\x01\x02\x03\x04", LE).unwrap();
        assert_eq!(handle.number_of_value_entries(), 1);
        assert_eq!(handle.value_entry(0).unwrap(), ValueEntry::new(0, 4));
        assert!(handle.value_entry(1).is_err());
    }

    #[test]
    fn test_first_explicit_entry_call_materializes_entries() {
        let mut handle = DataHandle::new();
        handle.set_data(b"abcdef", DataEncoding::None).unwrap();

        assert_eq!(handle.append_value_entry(2, 4).unwrap(), 1);
        assert_eq!(
            handle.value_entries(),
            vec![ValueEntry::new(0, 6), ValueEntry::new(2, 4)]
        );

        handle.set_value_entry(0, 0, 2).unwrap();
        assert_eq!(handle.value_entry_data(0).unwrap().0, b"ab");
        assert_entries_fit(&handle);
    }

    #[test]
    fn test_entries_are_bounds_checked() {
        let mut handle = DataHandle::new();
        handle.set_data(b"abc", DataEncoding::None).unwrap();

        let err = handle.append_value_entry(2, 2).unwrap_err();
        assert_eq!(err.domain(), ErrorDomain::Arguments);
        let err = handle.set_value_entry(0, usize::MAX, 2).unwrap_err();
        assert_eq!(err.domain(), ErrorDomain::Arguments);
        assert_entries_fit(&handle);

        let mut empty = DataHandle::new();
        let err = empty.append_value_entry(0, 0).unwrap_err();
        assert_eq!(err.domain(), ErrorDomain::Runtime);
    }

    #[test]
    fn test_entry_size_is_fixed() {
        let mut handle = DataHandle::new();
        handle.append_value_entry_data(b"AA", DataEncoding::None).unwrap();
        handle.append_value_entry_data(b"BBB", DataEncoding::None).unwrap();

        handle
            .set_value_entry_data(1, b"CCC", DataEncoding::None)
            .unwrap();
        assert_eq!(handle.data(), Some(&b"AACCC"[..]));

        let err = handle
            .set_value_entry_data(1, b"DDDD", DataEncoding::None)
            .unwrap_err();
        assert!(matches!(err, ValueError::EntrySizeMismatch { size: 3, requested: 4, .. }));
        assert_eq!(handle.data(), Some(&b"AACCC"[..]));
    }

    #[test]
    fn test_by_reference_is_not_copied_until_written() {
        let buffer = b"0123456789".to_vec();
        let mut handle = DataHandle::new();
        handle
            .set_data_by_reference(&buffer, DataEncoding::None)
            .unwrap();
        assert!(handle.is_borrowed());
        assert_eq!(handle.data().unwrap().as_ptr(), buffer.as_ptr());

        handle.append_value_entry_data(b"ab", DataEncoding::None).unwrap();
        assert!(!handle.is_borrowed());
        assert_eq!(handle.data(), Some(&b"0123456789ab"[..]));
        assert_eq!(
            handle.value_entries(),
            vec![ValueEntry::new(0, 10), ValueEntry::new(10, 2)]
        );
        assert_eq!(buffer, b"0123456789");
    }

    #[test]
    fn test_append_rejects_mismatched_encoding() {
        let mut handle = DataHandle::new();
        handle.append_value_entry_data(b"\x01\x00", LE).unwrap();
        let err = handle
            .append_value_entry_data(b"\x02\x00", DataEncoding::None)
            .unwrap_err();
        assert_eq!(err.domain(), ErrorDomain::Arguments);
        assert_eq!(handle.data_size(), 2);
    }

    #[test]
    fn test_set_data_replaces_entries_and_empty_data_clears() {
        let mut handle = DataHandle::new();
        handle.append_value_entry_data(b"AA", DataEncoding::None).unwrap();
        handle.append_value_entry_data(b"BB", DataEncoding::None).unwrap();

        handle.set_data(b"xyz", DataEncoding::None).unwrap();
        assert_eq!(handle.value_entries(), vec![ValueEntry::new(0, 3)]);

        handle.set_data(&[], DataEncoding::None).unwrap();
        assert!(!handle.has_data());
        assert_eq!(handle.number_of_value_entries(), 0);
    }

    fn split_on_commas(data: &[u8], _: DataEncoding, _: u32) -> Result<Vec<ValueEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0;
        for part in data.split(|&b| b == b',') {
            entries.push(ValueEntry::new(offset, part.len()));
            offset += part.len() + 1;
        }
        Ok(entries)
    }

    fn broken_reader(data: &[u8], _: DataEncoding, _: u32) -> Result<Vec<ValueEntry>> {
        Ok(vec![ValueEntry::new(0, data.len() + 1)])
    }

    #[test]
    fn test_entries_reader_segments_data() {
        let mut handle = DataHandle::with_entries_reader(split_on_commas);
        handle.set_data(b"a,bb,ccc", DataEncoding::None).unwrap();

        assert_eq!(handle.number_of_value_entries(), 3);
        assert_eq!(handle.value_entry_data(2).unwrap().0, b"ccc");
        assert_entries_fit(&handle);
    }

    #[test]
    fn test_failing_entries_reader_leaves_handle_untouched() {
        let mut handle = DataHandle::with_entries_reader(broken_reader);
        assert!(handle.set_data(b"abc", DataEncoding::None).is_err());
        assert!(!handle.has_data());
    }

    #[test]
    fn test_clone_is_deep_and_clear_resets() {
        let buffer = b"borrowed".to_vec();
        let mut handle = DataHandle::new();
        handle.set_data_flags(0x10);
        handle
            .set_data_by_reference(&buffer, DataEncoding::None)
            .unwrap();

        let cloned = handle.clone();
        assert!(!cloned.is_borrowed());
        assert_eq!(cloned.data(), handle.data());
        assert_eq!(cloned.data_flags(), 0x10);

        handle.clear();
        assert!(!handle.has_data());
        assert_eq!(handle.data_flags(), 0);
        assert_eq!(handle.encoding(), DataEncoding::None);
    }
}
