//! Review action processor
//!
//! The one place admin decisions are executed. Each action is a single
//! transaction: the conditional status update, the ledger effect and the
//! owner's notification commit together or not at all. The conditional
//! update (`WHERE status = 'pending'`) is what makes a second approval a
//! `Conflict` instead of a second credit.

use crate::accounts::require_admin;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{append_entry, entry_events};
use crate::notify::NotificationDispatcher;
use sqlx::SqliteConnection;
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::{Notification, NotificationKind, Submission, SubmissionKind, SubmissionStatus};
use taskpay_ledger::{EntryStatus, LedgerEntry, LedgerEntryDraft, LedgerKind};
use taskpay_store::codec::now;
use taskpay_store::{Database, LedgerRepo, SubmissionRepo, TaskRepo};
use tracing::{info, warn};

/// What a review action changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// The submission after the action (as it was, for deletes)
    pub submission: Submission,
    /// Ledger entry written by the action, if money moved
    pub ledger_entry: Option<LedgerEntry>,
    /// Notification sent to the submission's owner
    pub notification: Option<Notification>,
}

#[derive(Clone)]
pub struct ReviewProcessor {
    db: Database,
    bus: ChangeBus,
    notifier: NotificationDispatcher,
}

impl ReviewProcessor {
    pub fn new(db: Database, bus: ChangeBus, notifier: NotificationDispatcher) -> Self {
        Self { db, bus, notifier }
    }

    /// Approve a pending submission.
    ///
    /// Task and manual work is credited as a `task_reward`. A withdrawal was
    /// paid for by its hold at creation; approval settles the hold and
    /// records a balance-neutral `withdrawal` entry.
    pub async fn approve(&self, submission_id: &str, reviewer_id: &str) -> WorkflowResult<ReviewOutcome> {
        self.decide(submission_id, reviewer_id, SubmissionStatus::Approved, None)
            .await
    }

    /// Reject a pending submission.
    ///
    /// Task and manual work has no ledger effect. A withdrawal's hold is
    /// refunded.
    pub async fn reject(
        &self,
        submission_id: &str,
        reviewer_id: &str,
        reason: Option<String>,
    ) -> WorkflowResult<ReviewOutcome> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.decide(submission_id, reviewer_id, SubmissionStatus::Rejected, reason)
            .await
    }

    async fn decide(
        &self,
        submission_id: &str,
        reviewer_id: &str,
        status: SubmissionStatus,
        note: Option<String>,
    ) -> WorkflowResult<ReviewOutcome> {
        require_admin(&self.db, reviewer_id).await?;

        let mut tx = self.db.begin().await?;
        let won = SubmissionRepo::review(&mut tx, submission_id, status, reviewer_id, note.as_deref(), &now())
            .await?;
        // Missing rows surface as NotFound here
        let submission = SubmissionRepo::get(&mut tx, submission_id).await?;
        if !won {
            warn!(
                submission_id,
                reviewer_id,
                current = %submission.status,
                attempted = %status,
                "Review refused; submission already reviewed"
            );
            return Err(WorkflowError::conflict("already reviewed"));
        }

        let mut events = vec![ChangeEvent::updated(
            Collection::Submissions,
            submission_id,
            Some(&submission.account_id),
        )];
        let (ledger_entry, notification) = match status {
            SubmissionStatus::Approved => Self::apply_approval(&mut tx, &submission).await?,
            _ => Self::apply_rejection(&mut tx, &submission, note.as_deref()).await?,
        };
        tx.commit().await?;

        info!(
            submission_id,
            reviewer_id,
            account_id = %submission.account_id,
            kind = %submission.kind,
            amount = %submission.amount,
            status = %status,
            "Submission reviewed"
        );
        if let Some(entry) = &ledger_entry {
            events.extend(entry_events(entry));
        }
        self.bus.publish_all(events);
        self.notifier.deliver(std::slice::from_ref(&notification)).await;

        Ok(ReviewOutcome {
            submission,
            ledger_entry,
            notification: Some(notification),
        })
    }

    async fn apply_approval(
        conn: &mut SqliteConnection,
        submission: &Submission,
    ) -> WorkflowResult<(Option<LedgerEntry>, Notification)> {
        let label = submission.payload.label();
        let amount = submission.amount;

        let (draft, kind, title, message) = match submission.kind {
            SubmissionKind::Task | SubmissionKind::Manual => (
                LedgerEntryDraft::new(
                    &submission.account_id,
                    LedgerKind::TaskReward,
                    amount.value(),
                    format!("Reward for {}", label),
                )?,
                NotificationKind::TaskApproved,
                "Submission approved",
                format!("Your {} was approved. {} has been added to your balance.", label, amount),
            ),
            SubmissionKind::Withdrawal => {
                Self::settle_hold(conn, submission).await?;
                (
                    LedgerEntryDraft::new(
                        &submission.account_id,
                        LedgerKind::Withdrawal,
                        amount.value(),
                        format!("Paid out {}", label),
                    )?,
                    NotificationKind::WithdrawalApproved,
                    "Withdrawal approved",
                    format!("Your {} of {} has been approved and sent.", label, amount),
                )
            }
        };

        let (entry, _) = append_entry(conn, draft.for_submission(&submission.id)).await?;
        let notification = NotificationDispatcher::record(
            conn,
            &submission.account_id,
            kind,
            title,
            &message,
            Some(amount),
        )
        .await?;
        Ok((Some(entry), notification))
    }

    async fn apply_rejection(
        conn: &mut SqliteConnection,
        submission: &Submission,
        reason: Option<&str>,
    ) -> WorkflowResult<(Option<LedgerEntry>, Notification)> {
        let label = submission.payload.label();
        let amount = submission.amount;
        let reason = reason.map(|r| format!(" Reason: {}.", r)).unwrap_or_default();

        match submission.kind {
            SubmissionKind::Task | SubmissionKind::Manual => {
                let notification = NotificationDispatcher::record(
                    conn,
                    &submission.account_id,
                    NotificationKind::TaskRejected,
                    "Submission rejected",
                    &format!("Your {} was rejected.{} You can submit it again.", label, reason),
                    None,
                )
                .await?;
                Ok((None, notification))
            }
            SubmissionKind::Withdrawal => {
                Self::settle_hold(conn, submission).await?;
                let draft = LedgerEntryDraft::new(
                    &submission.account_id,
                    LedgerKind::Refund,
                    amount.value(),
                    format!("Refund for rejected {}", label),
                )?
                .for_submission(&submission.id);
                let (entry, _) = append_entry(conn, draft).await?;

                let notification = NotificationDispatcher::record(
                    conn,
                    &submission.account_id,
                    NotificationKind::WithdrawalRejected,
                    "Withdrawal rejected",
                    &format!(
                        "Your {} was rejected.{} {} has been refunded to your balance.",
                        label, reason, amount
                    ),
                    Some(amount),
                )
                .await?;
                Ok((Some(entry), notification))
            }
        }
    }

    /// Mark a withdrawal's hold entry completed
    async fn settle_hold(conn: &mut SqliteConnection, submission: &Submission) -> WorkflowResult<()> {
        match submission.payload.hold_entry_id() {
            Some(hold_id) => {
                if !LedgerRepo::set_status(conn, hold_id, EntryStatus::Completed).await? {
                    warn!(submission_id = %submission.id, hold_id, "Hold entry already settled");
                }
                Ok(())
            }
            None => {
                warn!(submission_id = %submission.id, "Withdrawal has no hold entry");
                Ok(())
            }
        }
    }

    /// Hard delete of the submission row. Ledger entries it produced stay.
    ///
    /// A pending withdrawal still holds the user's money, so it must be
    /// approved or rejected first.
    pub async fn delete(&self, submission_id: &str, reviewer_id: &str) -> WorkflowResult<ReviewOutcome> {
        require_admin(&self.db, reviewer_id).await?;

        let mut tx = self.db.begin().await?;
        let submission = SubmissionRepo::delete(&mut tx, submission_id).await?;
        if submission.kind == SubmissionKind::Withdrawal && submission.is_pending() {
            warn!(submission_id, reviewer_id, "Refusing to delete a pending withdrawal");
            return Err(WorkflowError::conflict(
                "pending withdrawal must be reviewed before it can be deleted",
            ));
        }

        let mut events = vec![ChangeEvent::deleted(
            Collection::Submissions,
            submission_id,
            Some(&submission.account_id),
        )];
        if !submission.user_hidden {
            if let Some(task_id) = submission.payload.task_id() {
                if TaskRepo::release_slot(&mut tx, task_id).await? {
                    events.push(ChangeEvent::updated(Collection::Tasks, task_id, None));
                }
            }
        }
        tx.commit().await?;

        info!(submission_id, reviewer_id, account_id = %submission.account_id, "Submission deleted");
        self.bus.publish_all(events);
        Ok(ReviewOutcome {
            submission,
            ledger_entry: None,
            notification: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DisabledPush;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use taskpay_core::{Account, Amount, Role, SubmissionPayload};
    use taskpay_store::{AccountRepo, StoreConfig};

    async fn setup() -> (Database, ReviewProcessor) {
        let db = Database::connect(&StoreConfig::in_memory()).await.unwrap();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            AccountRepo::insert(&mut conn, &Account::new("ADM-1", "Admin", "a@example.com", Role::Admin))
                .await
                .unwrap();
            AccountRepo::insert(&mut conn, &Account::new("ACC-1", "Rahim", "r@example.com", Role::User))
                .await
                .unwrap();
        }
        let bus = ChangeBus::new();
        let notifier = NotificationDispatcher::new(db.clone(), bus.clone(), Arc::new(DisabledPush), false);
        (db.clone(), ReviewProcessor::new(db, bus, notifier))
    }

    async fn insert_manual(db: &Database, id: &str) {
        let submission = Submission {
            id: id.to_string(),
            account_id: "ACC-1".to_string(),
            kind: SubmissionKind::Manual,
            payload: SubmissionPayload::Manual {
                platform: "TikTok".to_string(),
                description: "Followed".to_string(),
                images: vec![],
            },
            amount: Amount::new(dec!(40)).unwrap(),
            status: SubmissionStatus::Pending,
            created_at: now(),
            reviewed_at: None,
            reviewed_by: None,
            review_note: None,
            user_hidden: false,
        };
        let mut conn = db.pool().acquire().await.unwrap();
        SubmissionRepo::insert(&mut conn, &submission).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_credits_once() {
        let (db, processor) = setup().await;
        insert_manual(&db, "SUB-1").await;

        let outcome = processor.approve("SUB-1", "ADM-1").await.unwrap();
        assert_eq!(outcome.submission.status, SubmissionStatus::Approved);
        assert_eq!(outcome.submission.reviewed_by.as_deref(), Some("ADM-1"));
        let entry = outcome.ledger_entry.unwrap();
        assert_eq!(entry.kind, LedgerKind::TaskReward);
        assert_eq!(entry.related_submission_id.as_deref(), Some("SUB-1"));
        assert_eq!(outcome.notification.unwrap().kind, NotificationKind::TaskApproved);

        let again = processor.approve("SUB-1", "ADM-1").await.unwrap_err();
        assert!(matches!(again, WorkflowError::Conflict(ref m) if m == "already reviewed"));
        let reject = processor.reject("SUB-1", "ADM-1", None).await.unwrap_err();
        assert!(reject.is_conflict());

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(LedgerRepo::sum_balance(&mut conn, "ACC-1").await.unwrap(), dec!(40));
    }

    #[tokio::test]
    async fn test_reject_with_reason_has_no_ledger_effect() {
        let (db, processor) = setup().await;
        insert_manual(&db, "SUB-1").await;

        let outcome = processor
            .reject("SUB-1", "ADM-1", Some("blurry screenshot".to_string()))
            .await
            .unwrap();
        assert!(outcome.ledger_entry.is_none());
        assert_eq!(outcome.submission.review_note.as_deref(), Some("blurry screenshot"));
        let message = outcome.notification.unwrap().message;
        assert!(message.contains("blurry screenshot"));
        assert!(message.contains("submit it again"));
    }

    #[tokio::test]
    async fn test_non_admin_and_missing() {
        let (db, processor) = setup().await;
        insert_manual(&db, "SUB-1").await;

        let err = processor.approve("SUB-1", "ACC-1").await.unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));

        assert!(processor.approve("SUB-404", "ADM-1").await.unwrap_err().is_not_found());
        assert!(processor.delete("SUB-404", "ADM-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_keeps_ledger() {
        let (db, processor) = setup().await;
        insert_manual(&db, "SUB-1").await;
        processor.approve("SUB-1", "ADM-1").await.unwrap();

        let outcome = processor.delete("SUB-1", "ADM-1").await.unwrap();
        assert_eq!(outcome.submission.id, "SUB-1");

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(SubmissionRepo::get(&mut conn, "SUB-1").await.unwrap_err().is_not_found());
        assert_eq!(LedgerRepo::list_for_account(&mut conn, "ACC-1").await.unwrap().len(), 1);
    }
}
