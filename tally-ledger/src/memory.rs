//! In-memory ledger for dry runs and tests.

use std::collections::VecDeque;

use tally_core::{Catalog, LedgerRow};

use crate::error::LedgerError;
use crate::store::Ledger;

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    system_rows: Vec<Vec<String>>,
    rows: Vec<LedgerRow>,
    /// Failures handed out, one per call, before calls succeed again
    failures: VecDeque<LedgerError>,
    reconnect_failure: Option<LedgerError>,
    reconnects: usize,
}

impl MemoryLedger {
    /// `system_rows` mirrors the system sheet, header row first.
    pub fn new(system_rows: Vec<Vec<String>>) -> Self {
        Self {
            system_rows,
            ..Default::default()
        }
    }

    /// Make the next `times` calls fail with `err`.
    pub fn fail_next(&mut self, times: usize, err: LedgerError) {
        self.failures.extend(std::iter::repeat_n(err, times));
    }

    /// Make the next reconnect attempt fail.
    pub fn fail_reconnect(&mut self, err: LedgerError) {
        self.reconnect_failure = Some(err);
    }

    pub fn set_system_rows(&mut self, rows: Vec<Vec<String>>) {
        self.system_rows = rows;
    }

    /// Rows appended so far, excluding the header.
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn reconnects(&self) -> usize {
        self.reconnects
    }

    fn check(&mut self) -> Result<(), LedgerError> {
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Ledger for MemoryLedger {
    async fn load_catalog(&mut self) -> Result<Catalog, LedgerError> {
        self.check()?;
        Ok(Catalog::from_rows(&self.system_rows))
    }

    async fn row_count(&mut self) -> Result<usize, LedgerError> {
        self.check()?;
        Ok(self.rows.len() + 1)
    }

    async fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        self.check()?;
        self.rows.extend_from_slice(rows);
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), LedgerError> {
        self.reconnects += 1;
        match self.reconnect_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
