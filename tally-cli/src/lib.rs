//! tally-cli: Telegram front end and offline tools for the Tally ledger.

pub mod bot;
pub mod config;
pub mod keyboard;
pub mod session;
pub mod state;
pub mod telegram;
