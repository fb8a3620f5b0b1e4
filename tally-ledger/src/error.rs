use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger is not connected")]
    NotConnected,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// Failures that a fresh connection may cure.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::NotConnected | LedgerError::Transport(_))
    }
}
