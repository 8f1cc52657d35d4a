//! Notification - a message to one account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::amount::Amount;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    // === To the submitting user ===
    TaskApproved,
    TaskRejected,
    WithdrawalApproved,
    WithdrawalRejected,
    BalanceAdjusted,
    AccountStatus,
    BadgeChanged,

    // === To admins ===
    NewSubmission,
    NewWithdrawal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub account_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub amount: Option<Amount>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        amount: Option<Amount>,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            amount,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_strings() {
        assert_eq!(NotificationKind::WithdrawalRejected.as_ref(), "withdrawal_rejected");
        assert_eq!(
            NotificationKind::from_str("new_submission").unwrap(),
            NotificationKind::NewSubmission
        );
    }

    #[test]
    fn test_new_is_unread() {
        let n = Notification::new("NTF-1", "ACC-1", NotificationKind::TaskApproved, "t", "m", None);
        assert!(!n.read);
    }
}
