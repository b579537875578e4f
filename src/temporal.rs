// ⏰ Temporal helpers - fixed timestamp format + age arithmetic
//
// Time must be explicit: queries never read the wall clock themselves,
// they receive a reference instant (directly or through a Clock).

use crate::error::{EhrError, Result};
use chrono::{Datelike, Local, NaiveDateTime};

/// The only accepted timestamp layout: `YYYY-MM-DD HH:MM:SS.ffffff`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Layout used when writing timestamps back out (always 6 fractional digits)
pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const EXPECTED: &str = "YYYY-MM-DD HH:MM:SS.ffffff";

// ============================================================================
// PARSING
// ============================================================================

/// Parse a timestamp in the fixed format.
///
/// The fractional part is mandatory and holds 1 to 6 digits. There is no
/// fallback format.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let malformed = || EhrError::Format {
        expected: EXPECTED,
        value: raw.to_string(),
        location: None,
    };

    // chrono accepts unpadded fields, padding and signs, so the shape is checked first
    if !has_fixed_layout(raw) {
        return Err(malformed());
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|_| malformed())
}

/// `YYYY-MM-DD HH:MM:SS.` then 1 to 6 fraction digits, byte for byte
fn has_fixed_layout(raw: &str) -> bool {
    const SEPARATORS: [(usize, u8); 6] = [(4, b'-'), (7, b'-'), (10, b' '), (13, b':'), (16, b':'), (19, b'.')];

    let bytes = raw.as_bytes();
    if bytes.len() < 21 || bytes.len() > 26 {
        return false;
    }

    bytes.iter().enumerate().all(|(i, &b)| {
        match SEPARATORS.iter().find(|(offset, _)| *offset == i) {
            Some(&(_, separator)) => b == separator,
            None => b.is_ascii_digit(),
        }
    })
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_OUTPUT_FORMAT).to_string()
}

/// Serde adapter writing `NaiveDateTime` in the fixed format
pub(crate) mod serde_timestamp {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }
}

// ============================================================================
// AGE ARITHMETIC
// ============================================================================

/// Whole years from `birth` to `reference`.
///
/// Calendar-year difference, minus one if the birthday has not yet
/// occurred in the reference year. Time of day is ignored.
pub fn years_between(birth: &NaiveDateTime, reference: &NaiveDateTime) -> i32 {
    let years = reference.year() - birth.year();
    if (reference.month(), reference.day()) < (birth.month(), birth.day()) {
        years - 1
    } else {
        years
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now" for age queries
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a single instant (tests, reproducible reports)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn parse(raw: &str) -> Result<Self> {
        parse_timestamp(raw).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_parse_timestamp_components() {
        let parsed = ts("1947-12-28 02:45:40.547");

        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (1947, 12, 28));
        assert_eq!((parsed.hour(), parsed.minute(), parsed.second()), (2, 45, 40));
        assert_eq!(parsed.nanosecond(), 547_000_000);
    }

    #[test]
    fn test_parse_then_format_round_trips() {
        for raw in [
            "1947-12-28 02:45:40.547",
            "1968-10-07 14:41:30.843000",
            "2000-02-29 23:59:59.000001",
            "1976-08-02 02:31:35.3",
        ] {
            let parsed = ts(raw);
            let formatted = format_timestamp(&parsed);
            assert_eq!(ts(&formatted), parsed, "round trip failed for {}", raw);
        }

        assert_eq!(format_timestamp(&ts("1976-08-02 02:31:35.373")), "1976-08-02 02:31:35.373000");
    }

    #[test]
    fn test_parse_timestamp_rejects_other_layouts() {
        for raw in [
            "1947-12-28",
            "1947-12-28 02:45:40",
            "1947-12-28 02:45:40.",
            "1947-12-28 02:45:40.1234567",
            "1947-12-28T02:45:40.547",
            "12/28/1947 02:45:40.547",
            "1947-13-28 02:45:40.547",
            "1947-12-28 02:45:40.5a7",
            "1947-1-2 2:4:4.5",
            " 1947-12-28 02:45:40.547",
            "1947-12-28  02:45:40.547",
            "+1947-12-28 02:45:40.547",
            "1947-12-28 02:45:40.547 ",
            "",
        ] {
            let err = parse_timestamp(raw).unwrap_err();
            assert!(
                matches!(err, EhrError::Format { ref value, .. } if value == raw),
                "expected format error for {:?}, got {:?}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_years_between_birthday_passed() {
        let birth = ts("1947-12-28 02:45:40.547");
        let reference = ts("2024-01-01 00:00:00.0");
        assert_eq!(years_between(&birth, &reference), 76);
    }

    #[test]
    fn test_years_between_birthday_not_reached() {
        let birth = ts("1952-01-18 19:51:12.917");
        let reference = ts("2024-01-01 00:00:00.0");
        assert_eq!(years_between(&birth, &reference), 71);
    }

    #[test]
    fn test_years_between_on_birthday_ignores_time_of_day() {
        let birth = ts("1980-06-15 23:00:00.0");
        let reference = ts("2020-06-15 01:00:00.0");
        assert_eq!(years_between(&birth, &reference), 40);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::parse("2024-01-01 00:00:00.000000").unwrap();
        assert_eq!(clock.now(), ts("2024-01-01 00:00:00.0"));
        assert!(FixedClock::parse("2024-01-01").is_err());
    }
}
