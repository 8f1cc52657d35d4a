//! Ledger entries
//!
//! An entry is written once and never edited. The only mutable bits are the
//! owner's `hidden_by_user` flag and a hold's `status` (pending → completed
//! once its withdrawal is decided); neither changes the balance.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use taskpay_core::Amount;

/// What a ledger entry records
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Manual admin credit
    Credit,
    /// Manual admin debit
    Debit,
    /// Reward for an approved task or manual submission
    TaskReward,
    /// Settlement record written when a withdrawal is approved.
    /// The money already left with the hold, so this is balance-neutral.
    Withdrawal,
    /// Hold taken when a withdrawal is requested
    WithdrawalPending,
    /// Hold returned when a withdrawal is rejected
    Refund,
}

impl LedgerKind {
    /// Effect on the balance: +1 money in, -1 money out, 0 neutral.
    ///
    /// `Withdrawal` only settles an existing `WithdrawalPending` hold.
    pub fn sign(&self) -> i8 {
        match self {
            LedgerKind::Credit | LedgerKind::TaskReward | LedgerKind::Refund => 1,
            LedgerKind::Debit | LedgerKind::WithdrawalPending => -1,
            LedgerKind::Withdrawal => 0,
        }
    }

    pub fn affects_balance(&self) -> bool {
        self.sign() != 0
    }

    pub fn is_credit(&self) -> bool {
        self.sign() > 0
    }
}

/// Settlement state of an entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
}

/// A committed, immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub account_id: String,
    pub kind: LedgerKind,
    pub amount: Amount,
    pub description: String,
    pub related_submission_id: Option<String>,
    pub status: EntryStatus,
    pub hidden_by_user: bool,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed contribution of this entry to the account balance
    pub fn signed_amount(&self) -> Decimal {
        crate::balance::signed_delta(self.kind, self.amount)
    }
}

/// An entry that has passed validation but is not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntryDraft {
    pub account_id: String,
    pub kind: LedgerKind,
    pub amount: Amount,
    pub description: String,
    pub related_submission_id: Option<String>,
    pub status: EntryStatus,
}

impl LedgerEntryDraft {
    /// Build a completed draft.
    ///
    /// Fails if the amount is not strictly positive or a required field is blank.
    pub fn new(
        account_id: impl Into<String>,
        kind: LedgerKind,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let account_id = account_id.into();
        if account_id.trim().is_empty() {
            return Err(LedgerError::MissingAccount);
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(LedgerError::MissingDescription);
        }
        let amount =
            Amount::positive(amount).map_err(|e| LedgerError::InvalidAmount(e.to_string()))?;

        Ok(Self {
            account_id,
            kind,
            amount,
            description,
            related_submission_id: None,
            status: EntryStatus::Completed,
        })
    }

    /// Link the draft to the submission that produced it
    pub fn for_submission(mut self, submission_id: impl Into<String>) -> Self {
        self.related_submission_id = Some(submission_id.into());
        self
    }

    /// Mark the draft as a pending hold
    pub fn pending(mut self) -> Self {
        self.status = EntryStatus::Pending;
        self
    }

    /// Turn the draft into a committed entry with the given id and timestamp
    pub fn commit(self, id: impl Into<String>, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: id.into(),
            account_id: self.account_id,
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            related_submission_id: self.related_submission_id,
            status: self.status,
            hidden_by_user: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_kind_signs() {
        assert_eq!(LedgerKind::Credit.sign(), 1);
        assert_eq!(LedgerKind::TaskReward.sign(), 1);
        assert_eq!(LedgerKind::Refund.sign(), 1);
        assert_eq!(LedgerKind::Debit.sign(), -1);
        assert_eq!(LedgerKind::WithdrawalPending.sign(), -1);
        assert_eq!(LedgerKind::Withdrawal.sign(), 0);
    }

    #[test]
    fn test_only_settlement_is_neutral() {
        assert!(!LedgerKind::Withdrawal.affects_balance());
        assert!(LedgerKind::WithdrawalPending.affects_balance());
        assert!(LedgerKind::Refund.affects_balance());
        assert!(!LedgerKind::Withdrawal.is_credit());
    }

    #[test]
    fn test_kind_string_forms() {
        assert_eq!(LedgerKind::WithdrawalPending.as_ref(), "withdrawal_pending");
        assert_eq!(LedgerKind::from_str("task_reward").unwrap(), LedgerKind::TaskReward);
        assert_eq!(
            serde_json::to_string(&LedgerKind::Refund).unwrap(),
            "\"refund\""
        );
    }

    #[test]
    fn test_draft_rejects_non_positive() {
        assert!(matches!(
            LedgerEntryDraft::new("ACC-1", LedgerKind::Credit, dec!(0), "zero"),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            LedgerEntryDraft::new("ACC-1", LedgerKind::Credit, dec!(-5), "neg"),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_draft_requires_account_and_description() {
        assert_eq!(
            LedgerEntryDraft::new(" ", LedgerKind::Credit, dec!(1), "x"),
            Err(LedgerError::MissingAccount)
        );
        assert_eq!(
            LedgerEntryDraft::new("ACC-1", LedgerKind::Credit, dec!(1), ""),
            Err(LedgerError::MissingDescription)
        );
    }

    #[test]
    fn test_draft_commit() {
        let now = Utc::now();
        let entry = LedgerEntryDraft::new("ACC-1", LedgerKind::WithdrawalPending, dec!(150), "hold")
            .unwrap()
            .pending()
            .for_submission("SUB-1")
            .commit("LED-1", now);

        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.related_submission_id.as_deref(), Some("SUB-1"));
        assert!(!entry.hidden_by_user);
        assert_eq!(entry.signed_amount(), dec!(-150));
    }
}
