//! Conversions of on-disk timestamp representations into civil date-times.
//!
//! Every function returns the civil date-time the raw value describes. Whether that is UTC
//! or local time is up to the representation, see [`crate::instance::date_time`].

use crate::err::{Result, ValueError};

use jiff::civil::{Date, DateTime, Time};
use jiff::{Timestamp, tz::Offset};

const WINDOWS_TO_UNIX_SECS: i64 = 11_644_473_600;
/// Seconds between 1899-12-30 (day 0 of a floatingtime) and the Unix epoch.
const FLOATINGTIME_TO_UNIX_SECS: i64 = 2_209_161_600;
/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i64 = 2_440_588;

#[inline]
fn invalid(what: &'static str) -> ValueError {
    ValueError::Conversion {
        what,
        reason: "value is not a valid date and time".to_string(),
    }
}

fn utc(timestamp: Timestamp) -> DateTime {
    Offset::UTC.to_datetime(timestamp)
}

#[inline]
pub(crate) fn filetime_to_datetime(filetime: u64) -> Result<DateTime> {
    let secs = (filetime / 10_000_000) as i64 - WINDOWS_TO_UNIX_SECS;
    let nanos = ((filetime % 10_000_000) * 100) as i32;
    Timestamp::new(secs, nanos)
        .map(utc)
        .map_err(|_| invalid("filetime"))
}

pub(crate) fn systime_from_bytes(bytes: &[u8; 16]) -> Result<DateTime> {
    let field = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
    let year = field(0);
    let month = field(2);
    let _day_of_week = field(4);
    let day = field(6);
    let hour = field(8);
    let minute = field(10);
    let second = field(12);
    let milliseconds = field(14);

    // The entire value is unset. By convention, use the "1601-01-01T00:00:00.0000000Z" timestamp.
    if [year, month, day, hour, minute, second, milliseconds]
        .iter()
        .all(|&f| f == 0)
    {
        return filetime_to_datetime(0);
    }

    let narrow = |value: u16| i8::try_from(value).map_err(|_| invalid("systemtime"));
    let year = i16::try_from(year).map_err(|_| invalid("systemtime"))?;
    if milliseconds > 999 {
        return Err(invalid("systemtime"));
    }

    DateTime::new(
        year,
        narrow(month)?,
        narrow(day)?,
        narrow(hour)?,
        narrow(minute)?,
        narrow(second)?,
        i32::from(milliseconds) * 1_000_000,
    )
    .map_err(|_| invalid("systemtime"))
}

/// FAT date and time words: day, month and year since 1980 in the date, two-second
/// resolution in the time. Local time.
pub(crate) fn fat_date_time(date: u16, time: u16) -> Result<DateTime> {
    let day = (date & 0x1f) as i8;
    let month = ((date >> 5) & 0x0f) as i8;
    let year = 1980 + (date >> 9) as i16;

    let seconds = ((time & 0x1f) * 2) as i8;
    let minutes = ((time >> 5) & 0x3f) as i8;
    let hours = (time >> 11) as i8;

    let date = Date::new(year, month, day).map_err(|_| invalid("fat date time"))?;
    let time = Time::new(hours, minutes, seconds, 0).map_err(|_| invalid("fat date time"))?;
    Ok(date.to_datetime(time))
}

/// OLE automation date: fractional days since 1899-12-30.
pub(crate) fn floatingtime_to_datetime(days: f64) -> Result<DateTime> {
    if !days.is_finite() {
        return Err(invalid("floatingtime"));
    }
    let secs = days * 86_400.0;
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as i32).min(999_999_999);
    if whole.abs() > i64::MAX as f64 / 2.0 {
        return Err(invalid("floatingtime"));
    }

    Timestamp::new(whole as i64 - FLOATINGTIME_TO_UNIX_SECS, nanos)
        .map(utc)
        .map_err(|_| invalid("floatingtime"))
}

/// Lotus Notes TIMEDATE: Julian day number in the low 24 bits of the upper half, hundredths
/// of a second since midnight UTC in the lower half.
pub(crate) fn nsf_timedate_to_datetime(timedate: u64) -> Result<DateTime> {
    let julian_day = ((timedate >> 32) & 0x00ff_ffff) as i64;
    let ticks = (timedate & 0xffff_ffff) as i64;
    if ticks >= 8_640_000 {
        return Err(invalid("nsf timedate"));
    }

    let secs = (julian_day - UNIX_EPOCH_JULIAN_DAY) * 86_400 + ticks / 100;
    let nanos = ((ticks % 100) * 10_000_000) as i32;
    Timestamp::new(secs, nanos)
        .map(utc)
        .map_err(|_| invalid("nsf timedate"))
}

pub(crate) fn posix_time_to_datetime(secs: i64) -> Result<DateTime> {
    Timestamp::new(secs, 0)
        .map(utc)
        .map_err(|_| invalid("posix time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filetime() {
        assert_eq!(
            filetime_to_datetime(0x01d3_e306_10c9_0a8e).unwrap(),
            date(2018, 5, 3).at(17, 42, 11, 479_617_400)
        );
        assert_eq!(filetime_to_datetime(0).unwrap(), date(1601, 1, 1).at(0, 0, 0, 0));
    }

    #[test]
    fn test_systime() {
        let bytes: [u8; 16] = [
            0xe2, 0x07, 0x05, 0x00, 0x04, 0x00, 0x03, 0x00, 0x11, 0x00, 0x2a, 0x00, 0x0b, 0x00,
            0xdf, 0x01,
        ];
        assert_eq!(
            systime_from_bytes(&bytes).unwrap(),
            date(2018, 5, 3).at(17, 42, 11, 479_000_000)
        );
        assert_eq!(systime_from_bytes(&[0; 16]).unwrap(), date(1601, 1, 1).at(0, 0, 0, 0));
    }

    #[test]
    fn test_fat_date_time() {
        // 2018-05-03 17:42:10
        let date_word = ((2018 - 1980) << 9) | (5 << 5) | 3;
        let time_word = (17 << 11) | (42 << 5) | 5;
        assert_eq!(
            fat_date_time(date_word, time_word).unwrap(),
            date(2018, 5, 3).at(17, 42, 10, 0)
        );
        assert!(fat_date_time(0, 0).is_err());
    }

    #[test]
    fn test_floatingtime_and_nsf_and_posix() {
        assert_eq!(
            floatingtime_to_datetime(25569.5).unwrap(),
            date(1970, 1, 1).at(12, 0, 0, 0)
        );
        assert_eq!(
            nsf_timedate_to_datetime((2_440_589_u64 << 32) | 150).unwrap(),
            date(1970, 1, 2).at(0, 0, 1, 500_000_000)
        );
        assert_eq!(
            posix_time_to_datetime(-1).unwrap(),
            date(1969, 12, 31).at(23, 59, 59, 0)
        );
        assert!(floatingtime_to_datetime(f64::NAN).is_err());
    }
}
