//! Submission - a user request that waits for an admin decision
//!
//! One type covers the three things a user can put up for review: proof for
//! a catalog task, an ad-hoc manual work claim, and a withdrawal request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::amount::Amount;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Task,
    Manual,
    Withdrawal,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Approved and rejected submissions never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

/// Kind-specific content of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SubmissionPayload {
    Task {
        task_id: String,
        #[serde(default)]
        proof_text: Option<String>,
        #[serde(default)]
        proof_url: Option<String>,
        /// Hosted image URLs
        #[serde(default)]
        images: Vec<String>,
    },
    Manual {
        platform: String,
        description: String,
        #[serde(default)]
        images: Vec<String>,
    },
    Withdrawal {
        /// Payout channel, e.g. "Bkash"
        method: String,
        /// Destination number or account details
        details: String,
        /// The `withdrawal_pending` ledger entry holding the funds
        #[serde(default)]
        hold_entry_id: Option<String>,
    },
}

impl SubmissionPayload {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            SubmissionPayload::Task { .. } => SubmissionKind::Task,
            SubmissionPayload::Manual { .. } => SubmissionKind::Manual,
            SubmissionPayload::Withdrawal { .. } => SubmissionKind::Withdrawal,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            SubmissionPayload::Task { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub fn hold_entry_id(&self) -> Option<&str> {
        match self {
            SubmissionPayload::Withdrawal { hold_entry_id, .. } => hold_entry_id.as_deref(),
            _ => None,
        }
    }

    /// Short human label used in ledger descriptions and notifications
    pub fn label(&self) -> String {
        match self {
            SubmissionPayload::Task { task_id, .. } => format!("task {}", task_id),
            SubmissionPayload::Manual { platform, .. } => format!("manual work on {}", platform),
            SubmissionPayload::Withdrawal { method, .. } => format!("withdrawal via {}", method),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub account_id: String,
    pub kind: SubmissionKind,
    pub payload: SubmissionPayload,
    /// Reward for task/manual, requested sum for withdrawal
    pub amount: Amount,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    /// Hidden from the owner's history; admins still see it
    pub user_hidden: bool,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_and_accessors() {
        let payload = SubmissionPayload::Withdrawal {
            method: "Bkash".to_string(),
            details: "01700000000".to_string(),
            hold_entry_id: Some("LED-1".to_string()),
        };
        assert_eq!(payload.kind(), SubmissionKind::Withdrawal);
        assert_eq!(payload.hold_entry_id(), Some("LED-1"));
        assert_eq!(payload.task_id(), None);
        assert_eq!(payload.label(), "withdrawal via Bkash");
    }

    #[test]
    fn test_payload_json_is_tagged() {
        let payload = SubmissionPayload::Task {
            task_id: "TSK-1".to_string(),
            proof_text: Some("done".to_string()),
            proof_url: None,
            images: vec![],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"task\""));

        let parsed: SubmissionPayload =
            serde_json::from_str(r#"{"kind":"manual","platform":"YouTube","description":"subscribed"}"#)
                .unwrap();
        assert_eq!(parsed.kind(), SubmissionKind::Manual);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
    }
}
