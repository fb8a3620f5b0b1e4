//! Field extraction for a single notification segment.
//!
//! Amounts:
//!   1. `Summa: -1234,56 UZS` (explicit label, optional comma before code)
//!   2. any `-1234.56, USD` elsewhere in the text
//!
//! Dates, first structural match wins:
//!   10-Jun-2024 08:15 | 01.06.2024 14:30 | 01-06-2024 14:30
//!   01.06.24 14:30    | 01/06/24 14:30   | 01.06 14:30 (current year)

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use tally_core::{ParsedNotification, NOTIFICATION_CURRENCIES};

use super::classify::classify;

/// `-1234,56 UZS`, with an optional comma before the currency code.
fn amount_pattern(label: &str) -> String {
    format!(
        r"(?i){label}(-?\d+(?:[.,]\d+)?)\s*,?\s*({})\b",
        NOTIFICATION_CURRENCIES.join("|")
    )
}

static LABELLED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&amount_pattern(r"summa:?\s*")).expect("labelled amount regex")
});

static BARE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&amount_pattern("")).expect("bare amount regex"));

/// A date shape plus the handler that turns its captures into a datetime.
struct DatePattern {
    regex: Regex,
    resolve: fn(&Captures<'_>, i32) -> Option<NaiveDateTime>,
}

static DATE_PATTERNS: LazyLock<Vec<DatePattern>> = LazyLock::new(|| {
    vec![
        date_pattern(r"(\d{2})-([A-Za-z]{3})-(\d{4})\s+(\d{2}):(\d{2})", month_name_date),
        date_pattern(r"(\d{2})\.(\d{2})\.(\d{4})\s+(\d{2}):(\d{2})", full_year_date),
        date_pattern(r"(\d{2})-(\d{2})-(\d{4})\s+(\d{2}):(\d{2})", full_year_date),
        date_pattern(r"(\d{2})\.(\d{2})\.(\d{2})\s+(\d{2}):(\d{2})", short_year_date),
        date_pattern(r"(\d{2})/(\d{2})/(\d{2})\s+(\d{2}):(\d{2})", short_year_date),
        date_pattern(r"(\d{2})\.(\d{2})\s+(\d{2}):(\d{2})", yearless_date),
    ]
});

fn date_pattern(
    re: &str,
    resolve: fn(&Captures<'_>, i32) -> Option<NaiveDateTime>,
) -> DatePattern {
    DatePattern {
        regex: Regex::new(re).expect("date regex"),
        resolve,
    }
}

/// Extract all fields from one notification segment.
///
/// `current_year` fills in dates written without a year.
pub fn extract_notification(segment: &str, current_year: i32) -> ParsedNotification {
    let text = segment.trim();
    let mut out = ParsedNotification {
        timestamp: extract_timestamp(text, current_year),
        ..Default::default()
    };

    if let Some((amount, currency)) = extract_amount(text) {
        out.amount = Some(amount);
        out.detected_currency = Some(currency);
        out.operation = classify(text, amount);
    }

    out
}

/// Signed amount and upper-case currency code.
pub fn extract_amount(text: &str) -> Option<(f64, String)> {
    let caps = LABELLED_AMOUNT
        .captures(text)
        .or_else(|| BARE_AMOUNT.captures(text))?;
    let amount: f64 = caps[1].replace(',', ".").parse().ok()?;
    Some((amount, caps[2].to_uppercase()))
}

/// First date pattern that both matches and forms a valid calendar date.
pub fn extract_timestamp(text: &str, current_year: i32) -> Option<NaiveDateTime> {
    DATE_PATTERNS.iter().find_map(|p| {
        let caps = p.regex.captures(text)?;
        (p.resolve)(&caps, current_year)
    })
}

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_ascii_uppercase().as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    Some(month)
}

/// Two-digit years follow the POSIX `%y` pivot: 69-99 is 19xx, 00-68 is 20xx.
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy >= 69 { 1900 + yy } else { 2000 + yy }
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn build(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

// DD-MMM-YYYY HH:MM
fn month_name_date(caps: &Captures<'_>, _current_year: i32) -> Option<NaiveDateTime> {
    let month = month_from_abbrev(caps.get(2)?.as_str())?;
    build(num(caps, 3)?, month, num(caps, 1)?, num(caps, 4)?, num(caps, 5)?)
}

// DD.MM.YYYY HH:MM and DD-MM-YYYY HH:MM
fn full_year_date(caps: &Captures<'_>, _current_year: i32) -> Option<NaiveDateTime> {
    build(num(caps, 3)?, num(caps, 2)?, num(caps, 1)?, num(caps, 4)?, num(caps, 5)?)
}

// DD.MM.YY HH:MM and DD/MM/YY HH:MM
fn short_year_date(caps: &Captures<'_>, _current_year: i32) -> Option<NaiveDateTime> {
    let year = expand_two_digit_year(num(caps, 3)?);
    build(year, num(caps, 2)?, num(caps, 1)?, num(caps, 4)?, num(caps, 5)?)
}

// DD.MM HH:MM
fn yearless_date(caps: &Captures<'_>, current_year: i32) -> Option<NaiveDateTime> {
    build(current_year, num(caps, 2)?, num(caps, 1)?, num(caps, 3)?, num(caps, 4)?)
}
