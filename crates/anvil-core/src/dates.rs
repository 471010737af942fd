//! # Date Ranges
//!
//! Report periods and the `dd/MM/yyyy` formatting used on receipts.
//!
//! Ranges are half-open `[start, end)` in UTC, built from calendar days in
//! a given time zone. The shop means "today" in local time, so the
//! convenience constructors use [`chrono::Local`]; the `*_in` variants take
//! an explicit zone for tests.

use chrono::{
    DateTime, Datelike, Days, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open span of time, `start <= t < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range. Fails if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: "end is before start".to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    /// The whole calendar day `date` in zone `tz`.
    pub fn day_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        DateRange {
            start: start_of_day_in(date, tz),
            end: start_of_day_in(next, tz),
        }
    }

    /// Calendar days `from` through `to`, both inclusive.
    pub fn days_in<Tz: TimeZone>(
        from: NaiveDate,
        to: NaiveDate,
        tz: &Tz,
    ) -> Result<Self, ValidationError> {
        if to < from {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("{} is before {}", to, from),
            });
        }
        Ok(DateRange {
            start: DateRange::day_in(from, tz).start,
            end: DateRange::day_in(to, tz).end,
        })
    }

    /// Monday through Sunday of the week containing `date`.
    pub fn week_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let offset = u64::from(date.weekday().num_days_from_monday());
        let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
        let next_monday = monday.checked_add_days(Days::new(7)).unwrap_or(monday);
        DateRange {
            start: start_of_day_in(monday, tz),
            end: start_of_day_in(next_monday, tz),
        }
    }

    /// The calendar month containing `date`.
    pub fn month_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .unwrap_or(first);
        DateRange {
            start: start_of_day_in(first, tz),
            end: start_of_day_in(next_first, tz),
        }
    }

    /// Today in the shop's local time.
    pub fn today() -> Self {
        DateRange::day_in(Local::now().date_naive(), &Local)
    }

    pub fn this_week() -> Self {
        DateRange::week_in(Local::now().date_naive(), &Local)
    }

    pub fn this_month() -> Self {
        DateRange::month_in(Local::now().date_naive(), &Local)
    }

    /// Local calendar days `from` through `to`.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        DateRange::days_in(from, to, &Local)
    }

    /// Everything ever recorded.
    ///
    /// Bounded to four-digit years so the stored RFC 3339 text still
    /// compares in time order.
    pub fn all_time() -> Self {
        DateRange {
            start: start_of_day_in(NaiveDate::default(), &Utc),
            end: start_of_day_in(NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default(), &Utc),
        }
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// "01/03/2024 - 31/03/2024" in local time.
    pub fn label(&self) -> String {
        if *self == DateRange::all_time() {
            return "All time".to_string();
        }
        let last = self.end - chrono::Duration::milliseconds(1);
        format!("{} - {}", format_date(self.start), format_date(last))
    }
}

/// First instant of `date` in `tz`, as UTC.
///
/// Midnight can fall in a DST gap in some zones; the earliest valid
/// instant is used, or UTC midnight if the zone has no mapping at all.
fn start_of_day_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight: NaiveDateTime = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// `dd/MM/yyyy` in zone `tz`.
pub fn format_date_in<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format("%d/%m/%Y").to_string()
}

/// `dd/MM/yyyy HH:mm` in zone `tz`.
pub fn format_date_time_in<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format("%d/%m/%Y %H:%M").to_string()
}

/// `dd/MM/yyyy` in local time.
pub fn format_date(at: DateTime<Utc>) -> String {
    format_date_in(at, &Local)
}

/// `dd/MM/yyyy HH:mm` in local time.
pub fn format_date_time(at: DateTime<Utc>) -> String {
    format_date_time_in(at, &Local)
}

/// Parses `dd/MM/yyyy` or ISO `yyyy-mm-dd`.
pub fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("'{}' is not dd/mm/yyyy or yyyy-mm-dd", text),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_range_is_half_open() {
        let range = DateRange::day_in(ymd(2024, 3, 15), &Utc);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap()));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn test_day_range_respects_zone() {
        // IST is UTC+05:30, so the local day starts at 18:30 UTC the evening before.
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let range = DateRange::day_in(ymd(2024, 3, 15), &ist);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 14, 18, 30, 0).unwrap());
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-03-14 is a Thursday.
        let range = DateRange::week_in(ymd(2024, 3, 14), &Utc);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_handles_december() {
        let range = DateRange::month_in(ymd(2024, 12, 25), &Utc);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_days_in_is_inclusive() {
        let range = DateRange::days_in(ymd(2024, 3, 1), ymd(2024, 3, 31), &Utc).unwrap();
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap()));
        assert!(DateRange::days_in(ymd(2024, 3, 2), ymd(2024, 3, 1), &Utc).is_err());
    }

    #[test]
    fn test_new_rejects_reversed() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(DateRange::new(a, b).is_err());
        assert!(DateRange::new(b, a).is_ok());
    }

    #[test]
    fn test_format_and_parse() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap();
        assert_eq!(format_date_in(at, &Utc), "05/03/2024");
        assert_eq!(format_date_time_in(at, &Utc), "05/03/2024 09:07");

        assert_eq!(parse_date("05/03/2024").unwrap(), ymd(2024, 3, 5));
        assert_eq!(parse_date("2024-03-05").unwrap(), ymd(2024, 3, 5));
        assert!(parse_date("March 5").is_err());
    }
}
