use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ABBREVIATED_MONTH_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3}-\d{2,4}$").expect("valid regex"));
static SERIAL_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d*)?$").expect("valid regex"));
static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

/// Day zero of spreadsheet date serials. One day earlier than 1900-01-01 minus one, which
/// absorbs the 1900 leap-year bug so modern serials line up with their calendar dates.
pub fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

// Parsed dates are only accepted when they land in the range of a nanosecond timestamp,
// matching what spreadsheet-derived tooling can represent.
fn earliest_timestamp_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1677, 9, 22).expect("valid date")
}

fn latest_timestamp_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2262, 4, 11).expect("valid date")
}

fn within_timestamp_range(date: &NaiveDate) -> bool {
    (earliest_timestamp_date()..=latest_timestamp_date()).contains(date)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

// Formats without a day component; parsed by pinning the day to 1.
const MONTH_YEAR_FORMATS: &[&str] = &[
    "%b %Y", "%B %Y", "%b-%Y", "%B-%Y", "%b %y", "%Y-%m", "%Y/%m", "%m/%Y", "%m-%Y",
];

/// How far the numeric-serial rule is trusted when reading month labels.
///
/// `Unbounded` accepts any digit string that maps to a representable date, which also
/// turns small integers such as `12` into dates in January 1900. `Bounded` restricts the
/// serial to an inclusive range of day counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SerialPolicy {
    #[default]
    Unbounded,
    Bounded { min: f64, max: f64 },
}

impl SerialPolicy {
    fn admits(&self, serial: f64) -> bool {
        match self {
            SerialPolicy::Unbounded => true,
            SerialPolicy::Bounded { min, max } => serial >= *min && serial <= *max,
        }
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Decides whether a header label names a calendar month.
pub fn is_month_label(label: &str, policy: &SerialPolicy) -> bool {
    let trimmed = label.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("none")
    {
        return false;
    }

    ABBREVIATED_MONTH_LABEL.is_match(trimmed)
        || parse_generic_date(trimmed).is_some()
        || parse_excel_serial(trimmed, policy).is_some()
}

/// Converts a month-column label into the first day of that month.
///
/// Tries `Apr-21` / `Apr-2021` first, then a spreadsheet serial, then the generic date
/// formats. Returns `None` when nothing matches.
pub fn parse_month_label(label: &str, policy: &SerialPolicy) -> Option<NaiveDate> {
    let trimmed = label.trim();
    parse_abbreviated_month(trimmed)
        .or_else(|| parse_excel_serial(trimmed, policy))
        .or_else(|| parse_generic_date(trimmed))
        .map(first_of_month)
}

/// `Mon-YY` or `Mon-YYYY`. Two-digit years pivot the POSIX way: 69-99 are 19xx, 00-68
/// are 20xx.
fn parse_abbreviated_month(label: &str) -> Option<NaiveDate> {
    let (month, year) = label.split_once('-')?;
    if month.len() != 3
        || !month.chars().all(|ch| ch.is_ascii_alphabetic())
        || year.is_empty()
        || !year.chars().all(|ch| ch.is_ascii_digit())
    {
        return None;
    }

    let digits = year.len();
    let year: i32 = year.parse().ok()?;
    let year = match digits {
        2 if year >= 69 => 1900 + year,
        2 => 2000 + year,
        _ => year,
    };
    NaiveDate::parse_from_str(&format!("01-{month}-{year:04}"), "%d-%b-%Y")
        .ok()
        .filter(within_timestamp_range)
}

/// Interprets a digit string as a day count from the spreadsheet epoch (1899-12-30).
/// Fractional days are truncated.
pub fn parse_excel_serial(label: &str, policy: &SerialPolicy) -> Option<NaiveDate> {
    let trimmed = label.trim();
    if !SERIAL_LABEL.is_match(trimmed) {
        return None;
    }
    let serial: f64 = trimmed.parse().ok()?;
    if !serial.is_finite() || !policy.admits(serial) {
        return None;
    }

    let days = serial.trunc();
    if days > i64::MAX as f64 {
        return None;
    }
    excel_epoch()
        .checked_add_signed(chrono::Duration::try_days(days as i64)?)
        .filter(within_timestamp_range)
}

/// Best-effort date parsing over the layouts commonly found in exported spreadsheets.
/// Ambiguous slash dates are read month-first. A layout whose result falls outside the
/// timestamp range (signed or two-digit `%Y` years) does not count as a match.
pub fn parse_generic_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(date) = DATETIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(trimmed, fmt)
            .ok()
            .map(|datetime| datetime.date())
            .filter(within_timestamp_range)
    }) {
        return Some(date);
    }

    if let Some(date) = DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(trimmed, fmt)
            .ok()
            .filter(within_timestamp_range)
    }) {
        return Some(date);
    }

    if let Some(date) = MONTH_YEAR_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(&format!("01 {trimmed}"), &format!("%d {fmt}"))
            .ok()
            .filter(within_timestamp_range)
    }) {
        return Some(date);
    }

    if YEAR_ONLY.is_match(trimmed) {
        let year: i32 = trimmed.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).filter(within_timestamp_range);
    }

    None
}

/// Reads a date-valued data cell such as the store start date: generic layouts first,
/// then a spreadsheet serial.
pub fn parse_date_cell(raw: Option<&str>) -> Option<NaiveDate> {
    let trimmed = raw?.trim();
    parse_generic_date(trimmed).or_else(|| parse_excel_serial(trimmed, &SerialPolicy::Unbounded))
}
