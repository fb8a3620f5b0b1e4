//! Rows of the `fact` worksheet.
//!
//! Column layout (A..H):
//!   Date | Category | Subcategory | Amount | Balance | Comment | Currency | Source

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::notification::ParsedNotification;

/// Category name that the balance formula counts as inflow.
pub const INCOME_CATEGORY: &str = "💰 ДОХОДЫ";

/// Date format used in the ledger's first column.
pub const LEDGER_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub category: String,
    pub subcategory: String,
    /// Always non-negative for imported rows; direction lives in `category`
    pub amount: f64,
    pub balance_formula: String,
    pub comment: String,
    pub currency: String,
    pub source: String,
}

/// Where a batch of rows is going and what the user selected.
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext<'a> {
    pub source: &'a str,
    /// Currency derived from `source`
    pub currency: &'a str,
    /// Rows already on the sheet, header included
    pub existing_rows: usize,
}

impl LedgerRow {
    pub fn date_cell(&self) -> String {
        self.date.format(LEDGER_DATE_FORMAT).to_string()
    }

    /// Row for a manually entered amount.
    pub fn manual(
        date: NaiveDate,
        category: &str,
        subcategory: &str,
        amount: f64,
        comment: &str,
        ctx: &RowContext<'_>,
    ) -> Self {
        Self {
            date,
            category: category.to_uppercase(),
            subcategory: subcategory.to_string(),
            amount,
            balance_formula: balance_formula(ctx.existing_rows + 1),
            comment: comment.to_string(),
            currency: ctx.currency.to_string(),
            source: ctx.source.to_string(),
        }
    }

    /// Rows for a batch of imported notifications.
    ///
    /// `pasted_text` is the message the notifications came from; its first
    /// `excerpt_chars` characters go into every row's comment. Records
    /// without a date or amount are skipped.
    pub fn from_notifications(
        records: &[ParsedNotification],
        pasted_text: &str,
        excerpt_chars: usize,
        ctx: &RowContext<'_>,
    ) -> Vec<Self> {
        let excerpt: String = pasted_text.chars().take(excerpt_chars).collect();

        records
            .iter()
            .filter_map(|rec| Some((rec.timestamp?, rec.abs_amount()?, rec)))
            .enumerate()
            .map(|(i, (ts, amount, rec))| Self {
                date: ts.date(),
                category: rec.operation.ledger_category().to_string(),
                subcategory: String::new(),
                amount,
                balance_formula: balance_formula(ctx.existing_rows + 1 + i),
                comment: format!(
                    "SMS: {} {}...",
                    rec.detected_currency.as_deref().unwrap_or(""),
                    excerpt
                ),
                currency: ctx.currency.to_string(),
                source: ctx.source.to_string(),
            })
            .collect()
    }
}

/// Running balance for the row's (currency, source) pair at sheet row `row`.
pub fn balance_formula(row: usize) -> String {
    let sumifs = |criterion: String| {
        format!(
            "СУММЕСЛИМН($D$2:D{row}; $H$2:H{row}; $H{row}; $G$2:G{row}; $G{row}; $B$2:B{row}; \"{criterion}\")"
        )
    };
    format!(
        "={} - {}",
        sumifs(INCOME_CATEGORY.to_string()),
        sumifs(format!("<>{INCOME_CATEGORY}"))
    )
}
