//! TaskPay Ledger - append-only record of balance-affecting events
//!
//! The ledger is the source of truth for account balances. The cached
//! `balance` on an account is a projection of these entries.
//!
//! # Key Types
//! - `LedgerKind`: what the entry records, and which way it moves money
//! - `LedgerEntryDraft`: a validated entry not yet persisted
//! - `LedgerEntry`: an immutable committed entry
//! - `EntryFilter` / `Viewer`: listing filters and the two-tier visibility model

pub mod balance;
pub mod entry;
pub mod error;
pub mod filter;

pub use balance::{fold_balance, signed_delta};
pub use entry::{EntryStatus, LedgerEntry, LedgerEntryDraft, LedgerKind};
pub use error::LedgerError;
pub use filter::{EntryFilter, Viewer};
