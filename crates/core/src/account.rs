//! Account - a registered worker or admin, with role, review status and badge

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Who an account acts as
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Admin review status of an account
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered, awaiting admin review
    Pending,
    /// Allowed to work and withdraw
    Approved,
    /// Turned down; may be reconsidered
    Rejected,
    /// Locked out by an admin
    Banned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Account status cannot change from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: AccountStatus,
    pub to: AccountStatus,
}

impl AccountStatus {
    /// Check an admin-driven status change.
    ///
    /// Allowed: pending→approved, pending→rejected, rejected→approved,
    /// approved|rejected→banned. Leaving `Banned` goes through
    /// [`AccountStatus::unban_target`], not this table.
    pub fn check_transition(self, to: AccountStatus) -> Result<(), StatusTransitionError> {
        use AccountStatus::*;
        let allowed = matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Rejected, Approved)
                | (Approved, Banned) | (Rejected, Banned)
        );
        if allowed {
            Ok(())
        } else {
            Err(StatusTransitionError { from: self, to })
        }
    }

    /// Status restored when a ban is lifted.
    ///
    /// `previous` is the status recorded at ban time; anything unknown
    /// falls back to `Approved`.
    pub fn unban_target(previous: Option<AccountStatus>) -> AccountStatus {
        match previous {
            Some(AccountStatus::Rejected) => AccountStatus::Rejected,
            _ => AccountStatus::Approved,
        }
    }

    pub fn is_banned(&self) -> bool {
        matches!(self, AccountStatus::Banned)
    }
}

/// Display badge awarded by admins
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    #[default]
    None,
    Member,
    Premium,
    Vip,
}

/// A registered account.
///
/// `balance` is a cached projection of the account's ledger entries; it is
/// rewritten in the same transaction as every ledger append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub balance: Decimal,
    pub status: AccountStatus,
    /// Status recorded when the account was banned, restored on unban
    pub status_before_ban: Option<AccountStatus>,
    pub badge: Badge,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly registered account: pending review, zero balance, no badge
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
            role,
            balance: Decimal::ZERO,
            status: AccountStatus::Pending,
            status_before_ban: None,
            badge: Badge::None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
