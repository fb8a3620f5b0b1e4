//! tally-ledger: the spreadsheet ledger behind the bot.
//!
//! `Ledger` is the storage boundary. `SheetsLedger` talks to Google Sheets,
//! `MemoryLedger` keeps everything in memory, and `Reconnecting` adds the
//! re-authenticate-and-retry-once policy on top of either.

pub mod error;
pub mod memory;
pub mod retry;
pub mod sheets;
pub mod store;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use retry::Reconnecting;
pub use sheets::{Credentials, SheetsLedger, SheetsSettings};
pub use store::Ledger;
