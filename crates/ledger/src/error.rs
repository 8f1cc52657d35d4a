//! Ledger errors

use thiserror::Error;

/// Errors that can occur while building ledger entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger amount must be positive: {0}")]
    InvalidAmount(String),

    #[error("Ledger entry requires an account")]
    MissingAccount,

    #[error("Ledger entry requires a description")]
    MissingDescription,

    #[error("Unknown ledger kind: {0}")]
    UnknownKind(String),
}
