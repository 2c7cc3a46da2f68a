use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Date layout used by the published banana CSV.
pub const SOURCE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Parse a `DD/MM/YYYY` field from the source file.
pub fn parse_source_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), SOURCE_DATE_FORMAT).ok()
}

/// Lenient parse used when coercing text columns and query strings:
/// the source layout, ISO dates, and ISO datetimes (time is dropped).
pub fn parse_any_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    parse_source_date(s)
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// Arrow `Date32` value (days since the Unix epoch).
pub fn to_date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

pub fn from_date32(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
}
