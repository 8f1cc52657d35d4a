//! Submission workflow
//!
//! Users put work or withdrawal requests up for review. Creation does all
//! its checks and writes in one transaction: the task slot is taken with a
//! conditional increment, and a withdrawal's hold is appended to the ledger
//! together with the submission that references it.

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{append_entry, entry_events};
use crate::notify::NotificationDispatcher;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::{
    new_id, Amount, NotificationKind, Submission, SubmissionKind, SubmissionPayload,
    SubmissionStatus,
};
use taskpay_ledger::{LedgerEntryDraft, LedgerKind};
use taskpay_store::codec::now;
use taskpay_store::{AccountRepo, Database, LedgerRepo, SubmissionQuery, SubmissionRepo, TaskRepo};
use tracing::{debug, info, warn};

/// User input for a new submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewSubmission {
    Task {
        task_id: String,
        #[serde(default)]
        proof_text: Option<String>,
        #[serde(default)]
        proof_url: Option<String>,
        #[serde(default)]
        images: Vec<String>,
    },
    Manual {
        platform: String,
        description: String,
        amount: Decimal,
        #[serde(default)]
        images: Vec<String>,
    },
    Withdrawal {
        amount: Decimal,
        method: String,
        details: String,
    },
}

/// Listing filter; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub kind: Option<SubmissionKind>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
}

impl SubmissionFilter {
    pub fn status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(mut self, kind: SubmissionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn query(&self, account_id: Option<&str>, include_hidden: bool) -> SubmissionQuery {
        SubmissionQuery {
            account_id: account_id.map(str::to_string),
            status: self.status,
            kind: self.kind,
            from: self.from,
            to: self.to,
            include_hidden,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn clean_images(images: &[String], max: usize) -> WorkflowResult<Vec<String>> {
    let images: Vec<String> = images
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();
    if images.len() > max {
        return Err(WorkflowError::validation(format!(
            "at most {} proof images allowed, got {}",
            max,
            images.len()
        )));
    }
    Ok(images)
}

#[derive(Clone)]
pub struct SubmissionService {
    db: Database,
    bus: ChangeBus,
    notifier: NotificationDispatcher,
    config: Arc<WorkflowConfig>,
}

impl SubmissionService {
    pub fn new(
        db: Database,
        bus: ChangeBus,
        notifier: NotificationDispatcher,
        config: Arc<WorkflowConfig>,
    ) -> Self {
        Self {
            db,
            bus,
            notifier,
            config,
        }
    }

    /// Create a pending submission for `account_id`
    pub async fn create(
        &self,
        account_id: &str,
        new_submission: NewSubmission,
    ) -> WorkflowResult<Submission> {
        let result = self.create_inner(account_id, new_submission).await;
        let (submission, mut events) = match result {
            Ok(created) => created,
            Err(e) => {
                warn!(account_id, error = %e, "Submission refused");
                return Err(e);
            }
        };

        info!(
            submission_id = %submission.id,
            account_id,
            kind = %submission.kind,
            amount = %submission.amount,
            "Submission created"
        );
        events.push(ChangeEvent::created(
            Collection::Submissions,
            &submission.id,
            Some(account_id),
        ));
        self.bus.publish_all(events);

        if self.config.notify_admins_on_submission {
            self.notify_admins(&submission).await;
        }
        Ok(submission)
    }

    async fn create_inner(
        &self,
        account_id: &str,
        new_submission: NewSubmission,
    ) -> WorkflowResult<(Submission, Vec<ChangeEvent>)> {
        let max_images = self.config.max_proof_images;
        let mut events = Vec::new();

        let mut tx = self.db.begin().await?;
        AccountRepo::touch(&mut tx, account_id).await?;
        let account = AccountRepo::get(&mut tx, account_id).await?;
        if account.status.is_banned() {
            return Err(WorkflowError::permission_denied(format!(
                "account {} is banned",
                account_id
            )));
        }

        let id = new_id("SUB");
        let (payload, amount) = match new_submission {
            NewSubmission::Task {
                task_id,
                proof_text,
                proof_url,
                images,
            } => {
                let proof_text = non_blank(proof_text.as_deref());
                let proof_url = non_blank(proof_url.as_deref());
                if proof_text.is_none() && proof_url.is_none() {
                    return Err(WorkflowError::validation("proof text or proof URL is required"));
                }
                let images = clean_images(&images, max_images)?;

                let task = TaskRepo::get(&mut tx, &task_id).await?;
                if !task.is_published {
                    return Err(WorkflowError::validation(format!(
                        "task {} is not published",
                        task_id
                    )));
                }
                if SubmissionRepo::has_active_for_task(&mut tx, account_id, &task_id).await? {
                    return Err(WorkflowError::conflict("already submitted"));
                }
                if !TaskRepo::take_slot(&mut tx, &task_id).await? {
                    return Err(WorkflowError::conflict("task full"));
                }
                events.push(ChangeEvent::updated(Collection::Tasks, &task_id, None));

                let payload = SubmissionPayload::Task {
                    task_id,
                    proof_text,
                    proof_url,
                    images,
                };
                (payload, task.reward)
            }
            NewSubmission::Manual {
                platform,
                description,
                amount,
                images,
            } => {
                let platform = platform.trim().to_string();
                let description = description.trim().to_string();
                if platform.is_empty() {
                    return Err(WorkflowError::validation("platform is required"));
                }
                if description.is_empty() {
                    return Err(WorkflowError::validation("description is required"));
                }
                let amount = Amount::positive(amount)?;
                let images = clean_images(&images, max_images)?;

                let payload = SubmissionPayload::Manual {
                    platform,
                    description,
                    images,
                };
                (payload, amount)
            }
            NewSubmission::Withdrawal {
                amount,
                method,
                details,
            } => {
                let amount = Amount::positive(amount)?;
                if amount.value() < self.config.minimum_withdrawal {
                    return Err(WorkflowError::validation(format!(
                        "minimum withdrawal is {}",
                        self.config.minimum_withdrawal
                    )));
                }
                let method = self
                    .config
                    .payout_method(&method)
                    .ok_or_else(|| {
                        WorkflowError::validation(format!("unsupported payout method {}", method))
                    })?
                    .to_string();
                let details = details.trim().to_string();
                if details.is_empty() {
                    return Err(WorkflowError::validation("payout details are required"));
                }

                let balance = LedgerRepo::sum_balance(&mut tx, account_id).await?;
                if amount.value() > balance {
                    return Err(WorkflowError::validation(format!(
                        "amount {} exceeds balance {}",
                        amount, balance
                    )));
                }

                let hold = LedgerEntryDraft::new(
                    account_id,
                    LedgerKind::WithdrawalPending,
                    amount.value(),
                    format!("Withdrawal request via {}", method),
                )?
                .for_submission(&id)
                .pending();
                let (hold, _) = append_entry(&mut tx, hold).await?;
                events.extend(entry_events(&hold));

                let payload = SubmissionPayload::Withdrawal {
                    method,
                    details,
                    hold_entry_id: Some(hold.id),
                };
                (payload, amount)
            }
        };

        let submission = Submission {
            id,
            account_id: account_id.to_string(),
            kind: payload.kind(),
            payload,
            amount,
            status: SubmissionStatus::Pending,
            created_at: now(),
            reviewed_at: None,
            reviewed_by: None,
            review_note: None,
            user_hidden: false,
        };
        SubmissionRepo::insert(&mut tx, &submission).await?;
        tx.commit().await?;

        Ok((submission, events))
    }

    async fn notify_admins(&self, submission: &Submission) {
        let (kind, title) = match submission.kind {
            SubmissionKind::Withdrawal => (NotificationKind::NewWithdrawal, "New withdrawal request"),
            _ => (NotificationKind::NewSubmission, "New submission"),
        };
        let message = format!(
            "{} submitted {} for {}",
            submission.account_id,
            submission.payload.label(),
            submission.amount
        );
        if let Err(e) = self
            .notifier
            .notify_all_admins(kind, title, &message, Some(submission.amount))
            .await
        {
            warn!(submission_id = %submission.id, error = %e, "Admin notification failed");
        }
    }

    pub async fn get(&self, submission_id: &str) -> WorkflowResult<Submission> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(SubmissionRepo::get(&mut conn, submission_id).await?)
    }

    /// The owner's view: hidden submissions are left out
    pub async fn list_for_account(
        &self,
        account_id: &str,
        filter: &SubmissionFilter,
    ) -> WorkflowResult<Vec<Submission>> {
        self.list(filter.query(Some(account_id), false)).await
    }

    /// Admin queue of pending submissions
    pub async fn list_pending(&self, filter: &SubmissionFilter) -> WorkflowResult<Vec<Submission>> {
        let filter = filter.clone().status(SubmissionStatus::Pending);
        self.list(filter.query(None, true)).await
    }

    /// Admin view of every submission, hidden ones included
    pub async fn list_all(&self, filter: &SubmissionFilter) -> WorkflowResult<Vec<Submission>> {
        self.list(filter.query(None, true)).await
    }

    async fn list(&self, query: SubmissionQuery) -> WorkflowResult<Vec<Submission>> {
        let mut conn = self.db.pool().acquire().await?;
        let submissions = SubmissionRepo::list(&mut conn, &query).await?;
        debug!(?query, count = submissions.len(), "Listed submissions");
        Ok(submissions)
    }

    /// Remove a submission from its owner's history.
    ///
    /// Someone else's submission is `NotFound`. Hiding twice is a no-op. A
    /// hidden task submission gives its worker slot back.
    pub async fn soft_hide(&self, submission_id: &str, account_id: &str) -> WorkflowResult<Submission> {
        let mut tx = self.db.begin().await?;
        let changed = SubmissionRepo::hide(&mut tx, submission_id, account_id).await?;
        let submission = SubmissionRepo::get(&mut tx, submission_id).await?;
        if submission.account_id != account_id {
            return Err(WorkflowError::not_found("Submission", submission_id));
        }
        if !changed {
            return Ok(submission);
        }

        let mut events = vec![ChangeEvent::updated(
            Collection::Submissions,
            submission_id,
            Some(account_id),
        )];
        if let Some(task_id) = submission.payload.task_id() {
            if TaskRepo::release_slot(&mut tx, task_id).await? {
                events.push(ChangeEvent::updated(Collection::Tasks, task_id, None));
            }
        }
        tx.commit().await?;

        info!(submission_id, account_id, "Submission hidden by owner");
        self.bus.publish_all(events);
        Ok(submission)
    }
}
