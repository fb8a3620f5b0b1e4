//! Drop incomplete records and collapse repeats of the same transaction.

use chrono::NaiveDateTime;
use std::collections::HashSet;

use tally_core::{Operation, ParsedNotification};

/// Identity of a transaction: when, how much, which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    timestamp: NaiveDateTime,
    amount_bits: u64,
    operation: Operation,
}

impl RecordKey {
    /// `None` when the record lacks a timestamp or amount.
    pub fn of(record: &ParsedNotification) -> Option<Self> {
        // -0.0 and 0.0 are the same amount
        let amount = record.amount? + 0.0;
        Some(Self {
            timestamp: record.timestamp?,
            amount_bits: amount.to_bits(),
            operation: record.operation,
        })
    }
}

/// Keep complete records only, first occurrence of each key, in input order.
pub fn dedup_records(records: Vec<ParsedNotification>) -> Vec<ParsedNotification> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| RecordKey::of(r).is_some_and(|key| seen.insert(key)))
        .collect()
}
