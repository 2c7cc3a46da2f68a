// src/dates.rs

use chrono::{Datelike, Days, NaiveDate, Weekday};
use thiserror::Error;

/// Accepted weekday names, counted from Sunday like the publishing calendar.
const WEEKDAY_NAMES: [(&str, Weekday); 7] = [
    ("sunday", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeekdayError {
    #[error("unknown weekday name {0:?}, expected one of sunday..saturday")]
    Unknown(String),
    #[error("no {weekday} exists before {reference}")]
    OutOfRange {
        reference: NaiveDate,
        weekday: Weekday,
    },
}

/// Case-insensitive exact match against the seven full English day names.
pub fn parse_weekday(name: &str) -> Result<Weekday, WeekdayError> {
    let lower = name.to_lowercase();
    WEEKDAY_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == lower)
        .map(|(_, day)| *day)
        .ok_or_else(|| WeekdayError::Unknown(name.to_string()))
}

/// Most recent `weekday_name` strictly before `reference`.
///
/// When `reference` already falls on that weekday the result is a full week
/// earlier, so the answer is always 1–7 days back.
pub fn most_recent_weekday(
    reference: NaiveDate,
    weekday_name: &str,
) -> Result<NaiveDate, WeekdayError> {
    let target = parse_weekday(weekday_name)?;
    let today = reference.weekday().num_days_from_sunday();
    let wanted = target.num_days_from_sunday();

    let back = match (7 + today - wanted) % 7 {
        0 => 7,
        n => n,
    };

    reference
        .checked_sub_days(Days::new(u64::from(back)))
        .ok_or(WeekdayError::OutOfRange {
            reference,
            weekday: target,
        })
}

/// Government file name for the dataset published on `date`.
///
/// The naming is `bananas-{day}{mon}{yy}.csv` with an unpadded day, which
/// no single strftime pattern produces.
pub fn format_file_name(date: NaiveDate) -> String {
    let month = date.format("%b").to_string().to_lowercase();
    format!("bananas-{}{}{}.csv", date.day(), month, date.format("%y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_most_recent_weekday_known_dates() {
        let cases = [
            (d(2022, 1, 13), "monday", d(2022, 1, 10)),
            (d(2022, 1, 13), "tuesday", d(2022, 1, 11)),
            (d(2022, 1, 13), "wednesday", d(2022, 1, 12)),
            (d(2022, 1, 13), "thursday", d(2022, 1, 6)),
            (d(2022, 1, 13), "friday", d(2022, 1, 7)),
            (d(2022, 1, 13), "saturday", d(2022, 1, 8)),
            (d(2022, 1, 13), "sunday", d(2022, 1, 9)),
            (d(2022, 1, 10), "monday", d(2022, 1, 3)),
        ];
        for (reference, name, expected) in cases {
            assert_eq!(
                most_recent_weekday(reference, name).unwrap(),
                expected,
                "{} before {}",
                name,
                reference
            );
        }
    }

    #[test]
    fn test_most_recent_weekday_always_one_to_seven_days_back() {
        let start = d(2021, 12, 20);
        for offset in 0..28u64 {
            let reference = start.checked_add_days(Days::new(offset)).unwrap();
            for (name, weekday) in WEEKDAY_NAMES {
                let got = most_recent_weekday(reference, name).unwrap();
                let gap = (reference - got).num_days();
                assert!((1..=7).contains(&gap), "{name} from {reference}: gap {gap}");
                assert_eq!(got.weekday(), weekday);
            }
        }
    }

    #[test]
    fn test_weekday_name_is_case_insensitive() {
        assert_eq!(
            most_recent_weekday(d(2022, 1, 13), "MONDAY").unwrap(),
            d(2022, 1, 10)
        );
        assert_eq!(parse_weekday("Friday").unwrap(), Weekday::Fri);
    }

    #[test]
    fn test_rejects_near_miss_weekday_names() {
        for name in [
            "montag", "toosday", "wed", "thersday", "fritag", "samedi", "sun day", "", " monday",
        ] {
            assert_eq!(
                most_recent_weekday(d(2022, 1, 13), name),
                Err(WeekdayError::Unknown(name.to_string())),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_file_name() {
        assert_eq!(format_file_name(d(2022, 1, 13)), "bananas-13jan22.csv");
        assert_eq!(format_file_name(d(2022, 1, 1)), "bananas-1jan22.csv");
        assert_eq!(format_file_name(d(2021, 11, 1)), "bananas-1nov21.csv");
    }

    #[test]
    fn test_format_file_name_unique_within_year() {
        let mut seen = HashSet::new();
        let mut day = d(2022, 1, 1);
        while day.year() == 2022 {
            assert!(seen.insert(format_file_name(day)), "duplicate for {day}");
            day = day.succ_opt().unwrap();
        }
        assert_eq!(seen.len(), 365);
    }
}
