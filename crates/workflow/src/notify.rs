//! Notification dispatcher
//!
//! Writes notification records and then tries a push. The record is the
//! primary effect; push delivery is best effort and its failure is only
//! logged.

use crate::error::{WorkflowError, WorkflowResult};
use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::sync::Arc;
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::{new_id, Amount, Notification, NotificationKind};
use taskpay_store::codec::now;
use taskpay_store::{AccountRepo, Database, NotificationRepo};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
#[error("Push delivery failed: {0}")]
pub struct PushError(pub String);

/// Secondary delivery channel (mobile push, browser push, ...)
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn send_push(&self, account_id: &str, title: &str, body: &str) -> Result<(), PushError>;
}

/// Logs pushes instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LoggingPush;

#[async_trait]
impl PushChannel for LoggingPush {
    async fn send_push(&self, account_id: &str, title: &str, body: &str) -> Result<(), PushError> {
        info!(account_id, title, body, "Push");
        Ok(())
    }
}

/// Drops every push
#[derive(Debug, Default, Clone)]
pub struct DisabledPush;

#[async_trait]
impl PushChannel for DisabledPush {
    async fn send_push(&self, _account_id: &str, _title: &str, _body: &str) -> Result<(), PushError> {
        Ok(())
    }
}

/// Writes notifications and fans them out
#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Database,
    bus: ChangeBus,
    push: Arc<dyn PushChannel>,
    push_enabled: bool,
}

impl NotificationDispatcher {
    pub fn new(db: Database, bus: ChangeBus, push: Arc<dyn PushChannel>, push_enabled: bool) -> Self {
        Self {
            db,
            bus,
            push,
            push_enabled,
        }
    }

    /// Insert one notification on `conn`. Used inside review and account
    /// transactions so the record commits or rolls back with the action.
    pub(crate) async fn record(
        conn: &mut SqliteConnection,
        account_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        amount: Option<Amount>,
    ) -> WorkflowResult<Notification> {
        let mut notification =
            Notification::new(new_id("NTF"), account_id, kind, title, message, amount);
        notification.created_at = now();
        NotificationRepo::insert(conn, &notification).await?;
        Ok(notification)
    }

    /// Post-commit fan-out: change events, then best-effort push
    pub(crate) async fn deliver(&self, notifications: &[Notification]) {
        for notification in notifications {
            self.bus.publish(ChangeEvent::created(
                Collection::Notifications,
                &notification.id,
                Some(&notification.account_id),
            ));

            if !self.push_enabled {
                continue;
            }
            if let Err(e) = self
                .push
                .send_push(&notification.account_id, &notification.title, &notification.message)
                .await
            {
                warn!(
                    notification_id = %notification.id,
                    account_id = %notification.account_id,
                    error = %e,
                    "Push delivery failed; notification kept"
                );
            }
        }
    }

    /// Write one notification for `account_id`
    pub async fn notify_account(
        &self,
        account_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
        amount: Option<Amount>,
    ) -> WorkflowResult<Notification> {
        let notification = {
            let mut conn = self.db.pool().acquire().await?;
            if AccountRepo::find(&mut conn, account_id).await?.is_none() {
                return Err(WorkflowError::not_found("Account", account_id));
            }
            Self::record(&mut conn, account_id, kind, title, message, amount).await?
        };

        info!(account_id, kind = %kind, notification_id = %notification.id, "Notification written");
        self.deliver(std::slice::from_ref(&notification)).await;
        Ok(notification)
    }

    /// Write one notification per admin account
    pub async fn notify_all_admins(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        amount: Option<Amount>,
    ) -> WorkflowResult<Vec<Notification>> {
        let mut tx = self.db.begin().await?;
        let admin_ids = AccountRepo::admin_ids(&mut tx).await?;

        let mut notifications = Vec::with_capacity(admin_ids.len());
        for admin_id in &admin_ids {
            notifications.push(Self::record(&mut tx, admin_id, kind, title, message, amount).await?);
        }
        tx.commit().await?;

        info!(kind = %kind, admins = notifications.len(), "Admins notified");
        self.deliver(&notifications).await;
        Ok(notifications)
    }

    pub async fn list_for_account(
        &self,
        account_id: &str,
        unread_only: bool,
    ) -> WorkflowResult<Vec<Notification>> {
        let mut conn = self.db.pool().acquire().await?;
        let notifications =
            NotificationRepo::list_for_account(&mut conn, account_id, unread_only).await?;
        debug!(account_id, unread_only, count = notifications.len(), "Listed notifications");
        Ok(notifications)
    }

    pub async fn unread_count(&self, account_id: &str) -> WorkflowResult<u64> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(NotificationRepo::unread_count(&mut conn, account_id).await?)
    }

    /// Owner only; someone else's notification is `NotFound`
    pub async fn mark_read(&self, notification_id: &str, account_id: &str) -> WorkflowResult<()> {
        let mut conn = self.db.pool().acquire().await?;
        NotificationRepo::mark_read(&mut conn, notification_id, account_id).await?;
        drop(conn);

        self.bus.publish(ChangeEvent::updated(
            Collection::Notifications,
            notification_id,
            Some(account_id),
        ));
        Ok(())
    }

    pub async fn mark_all_read(&self, account_id: &str) -> WorkflowResult<u64> {
        let mut conn = self.db.pool().acquire().await?;
        let updated = NotificationRepo::mark_all_read(&mut conn, account_id).await?;
        drop(conn);

        debug!(account_id, updated, "Marked notifications read");
        Ok(updated)
    }

    /// Owner only; someone else's notification is `NotFound`
    pub async fn delete_one(&self, notification_id: &str, account_id: &str) -> WorkflowResult<()> {
        let mut conn = self.db.pool().acquire().await?;
        NotificationRepo::delete_one(&mut conn, notification_id, account_id).await?;
        drop(conn);

        self.bus.publish(ChangeEvent::deleted(
            Collection::Notifications,
            notification_id,
            Some(account_id),
        ));
        Ok(())
    }

    pub async fn delete_all(&self, account_id: &str) -> WorkflowResult<u64> {
        let mut conn = self.db.pool().acquire().await?;
        let deleted = NotificationRepo::delete_all(&mut conn, account_id).await?;
        drop(conn);

        info!(account_id, deleted, "Cleared notifications");
        Ok(deleted)
    }
}
