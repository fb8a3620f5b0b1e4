//! tally-ingest: bank SMS notification parsing.
//!
//! Splits pasted text into individual notifications, extracts amount,
//! currency, timestamp and direction from each, and drops duplicates.

pub mod error;
pub mod notifications;

pub use error::ParseError;
pub use notifications::parse_notifications;
