//! Bank SMS notification parser.
//!
//! raw text -> split -> extract + classify per segment -> dedup
//!
//! Pure and synchronous: no I/O, no logging, no shared state.

pub mod classify;
pub mod dedup;
pub mod extract;
pub mod split;

use chrono::NaiveDate;
use tally_core::ParsedNotification;

use crate::error::ParseError;

pub use classify::classify;
pub use dedup::{dedup_records, RecordKey};
pub use extract::extract_notification;
pub use split::split_notifications;

/// Parse a pasted batch of bank notifications.
///
/// Returns complete (dated, with amount), de-duplicated records in the order
/// they first appear. `current_year` resolves dates written without a year.
pub fn parse_notifications(
    raw_text: &str,
    current_year: i32,
) -> Result<Vec<ParsedNotification>, ParseError> {
    if NaiveDate::from_ymd_opt(current_year, 1, 1).is_none() {
        return Err(ParseError::YearOutOfRange(current_year));
    }

    let records = split_notifications(raw_text)
        .into_iter()
        .map(|segment| extract_notification(segment, current_year))
        .collect();

    Ok(dedup_records(records))
}
