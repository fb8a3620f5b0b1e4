use tally_core::{Catalog, LedgerRow};

use crate::error::LedgerError;

/// Storage boundary for the expense ledger.
///
/// Implementations are used from a single task, so the futures carry no
/// `Send` bound.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Read the category/source catalog from the system sheet.
    async fn load_catalog(&mut self) -> Result<Catalog, LedgerError>;

    /// Number of rows currently on the fact sheet, header included.
    async fn row_count(&mut self) -> Result<usize, LedgerError>;

    /// Append rows after the last filled row of the fact sheet.
    async fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<(), LedgerError>;

    /// Drop the current session, authenticate again and reopen the spreadsheet.
    async fn reconnect(&mut self) -> Result<(), LedgerError>;
}
