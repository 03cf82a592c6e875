use crate::err::{Result, ValueError};
use std::ops::Range;

/// An `(offset, size)` slice of a data handle's buffer.
///
/// Each entry describes one occurrence of a (possibly repeated) field. An entry is only
/// meaningful relative to the buffer it was validated against: `offset + size` never
/// exceeds that buffer's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValueEntry {
    pub offset: usize,
    pub size: usize,
}

impl ValueEntry {
    pub fn new(offset: usize, size: usize) -> Self {
        ValueEntry { offset, size }
    }

    /// One past the last byte, `None` on overflow.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.size)
    }

    pub fn fits(&self, data_size: usize) -> bool {
        self.end().is_some_and(|end| end <= data_size)
    }

    /// The bytes the entry covers, `None` on overflow.
    pub fn range(&self) -> Option<Range<usize>> {
        self.end().map(|end| self.offset..end)
    }

    /// The range of the entry when it fits in `data_size` bytes.
    pub(crate) fn validate(&self, index: usize, data_size: usize) -> Result<Range<usize>> {
        match self.range() {
            Some(range) if range.end <= data_size => Ok(range),
            _ => Err(ValueError::EntryOutOfRange {
                index,
                offset: self.offset,
                size: self.size,
                data_size,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_bounds() {
        assert!(ValueEntry::new(2, 3).fits(5));
        assert!(!ValueEntry::new(2, 4).fits(5));
        assert!(!ValueEntry::new(usize::MAX, 1).fits(usize::MAX));
        assert_eq!(ValueEntry::new(2, 3).range(), Some(2..5));
    }

    #[test]
    fn test_range_of_unvalidated_entry_does_not_overflow() {
        let entry = ValueEntry::new(usize::MAX, 2);
        assert_eq!(entry.range(), None);
        assert!(entry.validate(0, usize::MAX).is_err());
        assert_eq!(ValueEntry::new(1, 2).validate(0, 3).unwrap(), 1..3);
    }

    #[test]
    fn test_validate_reports_the_offending_entry() {
        let err = ValueEntry::new(4, 4).validate(1, 6).unwrap_err();
        assert_eq!(
            err.to_string(),
            "value entry 1 (offset 4, size 4) exceeds data size 6"
        );
    }
}
