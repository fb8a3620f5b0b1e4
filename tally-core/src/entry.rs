//! Manual "amount comment" entries typed into the chat.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntryError {
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub amount: f64,
    pub comment: String,
}

impl ManualEntry {
    /// Parse `"<amount> <comment>"`. The comment may be empty and keeps
    /// everything after the first space verbatim.
    pub fn parse(text: &str) -> Result<Self, EntryError> {
        let (amount_str, comment) = text.split_once(' ').unwrap_or((text, ""));
        let amount: f64 = amount_str
            .replace(',', ".")
            .parse()
            .map_err(|_| EntryError::InvalidAmount(amount_str.to_string()))?;
        if !amount.is_finite() {
            return Err(EntryError::InvalidAmount(amount_str.to_string()));
        }
        Ok(Self {
            amount,
            comment: comment.to_string(),
        })
    }
}
