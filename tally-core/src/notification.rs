//! Parsed bank notification types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transaction as inferred from the notification text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "expense")]
    Expense,
    #[serde(rename = "unknown")]
    #[default]
    Unknown,
}

impl Operation {
    /// Label written into the ledger's category column for imported rows.
    /// Unknown operations leave the category blank.
    pub fn ledger_category(&self) -> &'static str {
        match self {
            Operation::Income => "ДОХОД",
            Operation::Expense => "РАСХОД",
            Operation::Unknown => "",
        }
    }

    /// Classify by sign alone: positive is income, negative is expense.
    pub fn from_sign(amount: f64) -> Self {
        if amount > 0.0 {
            Operation::Income
        } else if amount < 0.0 {
            Operation::Expense
        } else {
            Operation::Unknown
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Income => "income",
            Operation::Expense => "expense",
            Operation::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One bank notification after field extraction.
///
/// Built once per notification segment and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParsedNotification {
    /// Local wall-clock time of the transaction, if a date pattern matched
    pub timestamp: Option<NaiveDateTime>,
    /// Signed amount as written in the notification
    pub amount: Option<f64>,
    /// Upper-case ISO code found next to the amount
    pub detected_currency: Option<String>,
    /// Only meaningful when `amount` is present
    pub operation: Operation,
}

impl ParsedNotification {
    /// Both a date and an amount were recognized.
    pub fn is_complete(&self) -> bool {
        self.timestamp.is_some() && self.amount.is_some()
    }

    pub fn abs_amount(&self) -> Option<f64> {
        self.amount.map(f64::abs)
    }
}
