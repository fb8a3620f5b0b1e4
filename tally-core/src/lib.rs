//! tally-core: shared types for the Tally expense-tracking bot

pub mod catalog;
pub mod currency;
pub mod entry;
pub mod ledger_row;
pub mod notification;

pub use catalog::Catalog;
pub use currency::{currency_from_source, FALLBACK_CURRENCY, NOTIFICATION_CURRENCIES};
pub use entry::{EntryError, ManualEntry};
pub use ledger_row::{balance_formula, LedgerRow, RowContext, INCOME_CATEGORY};
pub use notification::{Operation, ParsedNotification};
