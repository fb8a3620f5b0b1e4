//! Retry-with-reauthentication around any ledger.

use tally_core::{Catalog, LedgerRow};
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::store::Ledger;

/// Wraps a ledger so each call survives one dropped connection.
///
/// On a transient failure the inner ledger is reconnected and the call is
/// repeated exactly once. Any other failure, or a second failure, is returned.
#[derive(Debug)]
pub struct Reconnecting<L> {
    inner: L,
}

impl<L: Ledger> Reconnecting<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut L {
        &mut self.inner
    }

    async fn recover(&mut self, op: &str, err: &LedgerError) -> Result<(), LedgerError> {
        warn!(op, error = %err, "ledger call failed, reconnecting");
        self.inner.reconnect().await?;
        info!(op, "ledger reconnected, retrying");
        Ok(())
    }
}

impl<L: Ledger> Ledger for Reconnecting<L> {
    async fn load_catalog(&mut self) -> Result<Catalog, LedgerError> {
        match self.inner.load_catalog().await {
            Err(e) if e.is_transient() => {
                self.recover("load_catalog", &e).await?;
                self.inner.load_catalog().await
            }
            other => other,
        }
    }

    async fn row_count(&mut self) -> Result<usize, LedgerError> {
        match self.inner.row_count().await {
            Err(e) if e.is_transient() => {
                self.recover("row_count", &e).await?;
                self.inner.row_count().await
            }
            other => other,
        }
    }

    async fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        match self.inner.append_rows(rows).await {
            Err(e) if e.is_transient() => {
                self.recover("append_rows", &e).await?;
                self.inner.append_rows(rows).await
            }
            other => other,
        }
    }

    async fn reconnect(&mut self) -> Result<(), LedgerError> {
        self.inner.reconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;

    fn system_rows() -> Vec<Vec<String>> {
        vec![
            vec!["cat".into(), "sub".into()],
            vec!["Еда".into(), "Кафе".into(), "".into(), "".into(), "".into(), "Humo UZS".into()],
        ]
    }

    #[tokio::test]
    async fn test_single_transient_failure_is_retried() {
        let mut ledger = MemoryLedger::new(system_rows());
        ledger.fail_next(1, LedgerError::Transport("connection reset".into()));
        let mut ledger = Reconnecting::new(ledger);

        let catalog = ledger.load_catalog().await.unwrap();
        assert_eq!(catalog.categories, vec!["Еда"]);
        assert_eq!(ledger.inner().reconnects(), 1);
    }

    #[tokio::test]
    async fn test_second_failure_is_returned() {
        let mut ledger = MemoryLedger::new(system_rows());
        ledger.fail_next(2, LedgerError::Transport("down".into()));
        let mut ledger = Reconnecting::new(ledger);

        let err = ledger.row_count().await.unwrap_err();
        assert_eq!(err, LedgerError::Transport("down".into()));
        assert_eq!(ledger.inner().reconnects(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let mut ledger = MemoryLedger::new(system_rows());
        ledger.fail_next(1, LedgerError::Rejected("bad range".into()));
        let mut ledger = Reconnecting::new(ledger);

        assert!(ledger.append_rows(&[]).await.is_err());
        assert_eq!(ledger.inner().reconnects(), 0);
    }

    #[tokio::test]
    async fn test_failed_reconnect_is_returned() {
        let mut ledger = MemoryLedger::new(system_rows());
        ledger.fail_next(1, LedgerError::NotConnected);
        ledger.fail_reconnect(LedgerError::Auth("key revoked".into()));
        let mut ledger = Reconnecting::new(ledger);

        let err = ledger.row_count().await.unwrap_err();
        assert_eq!(err, LedgerError::Auth("key revoked".into()));
    }

    #[tokio::test]
    async fn test_failure_injected_after_wrapping() {
        let mut ledger = Reconnecting::new(MemoryLedger::new(system_rows()));
        assert_eq!(ledger.row_count().await, Ok(1));

        ledger
            .inner_mut()
            .fail_next(1, LedgerError::Transport("timeout".into()));
        assert_eq!(ledger.row_count().await, Ok(1));
        assert_eq!(ledger.inner().reconnects(), 1);
    }
}
