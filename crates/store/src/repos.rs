//! Repository implementations for SQLite
//!
//! Every function takes `&mut SqliteConnection` so callers decide the
//! transaction boundary: pass `&mut *tx` inside a unit of work, or a pooled
//! connection for plain reads.

use crate::codec::{fmt_ts, now};
use crate::error::{StoreError, StoreResult};
use crate::schema::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use taskpay_core::{
    Account, AccountStatus, Badge, Notification, Role, Submission, SubmissionKind,
    SubmissionStatus, Task,
};
use taskpay_ledger::{fold_balance, EntryStatus, LedgerEntry};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the accounts table
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new account; a duplicate email is `AlreadyExists`
    pub async fn insert(conn: &mut SqliteConnection, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, display_name, email, role, balance, status, status_before_ban, badge, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(account.role.as_ref())
        .bind(account.balance.to_string())
        .bind(account.status.as_ref())
        .bind(account.status_before_ban.map(|s| s.as_ref().to_string()))
        .bind(account.badge.as_ref())
        .bind(fmt_ts(&account.created_at))
        .bind(fmt_ts(&account.updated_at))
        .execute(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::already_exists("Account", &account.email)
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> StoreResult<Account> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Account", id))
    }

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(conn)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    /// All accounts, optionally narrowed to one role, oldest first
    pub async fn list(conn: &mut SqliteConnection, role: Option<Role>) -> StoreResult<Vec<Account>> {
        let rows = match role {
            Some(role) => {
                sqlx::query_as::<_, AccountRow>(
                    "SELECT * FROM accounts WHERE role = ? ORDER BY created_at, id",
                )
                .bind(role.as_ref())
                .fetch_all(conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY created_at, id")
                    .fetch_all(conn)
                    .await?
            }
        };
        convert_all(rows)
    }

    pub async fn admin_ids(conn: &mut SqliteConnection) -> StoreResult<Vec<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE role = ? ORDER BY created_at, id")
                .bind(Role::Admin.as_ref())
                .fetch_all(conn)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    pub async fn ids(conn: &mut SqliteConnection) -> StoreResult<Vec<String>> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM accounts ORDER BY id")
            .fetch_all(conn)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Bump `updated_at`. Used as the first statement of a write transaction
    /// so SQLite takes the write lock before anything is read.
    pub async fn touch(conn: &mut SqliteConnection, id: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET updated_at = ? WHERE id = ?")
            .bind(fmt_ts(&now()))
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Account", id));
        }
        Ok(())
    }

    pub async fn set_balance(
        conn: &mut SqliteConnection,
        id: &str,
        balance: Decimal,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET balance = ?, updated_at = ? WHERE id = ?")
            .bind(balance.to_string())
            .bind(fmt_ts(&now()))
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Account", id));
        }
        Ok(())
    }

    /// Cached balance as stored, without folding the ledger
    pub async fn cached_balance(conn: &mut SqliteConnection, id: &str) -> StoreResult<Decimal> {
        let row: Option<(String,)> = sqlx::query_as("SELECT balance FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        match row {
            Some((balance,)) => crate::codec::parse_decimal(&balance),
            None => Err(StoreError::not_found("Account", id)),
        }
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: AccountStatus,
        status_before_ban: Option<AccountStatus>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET status = ?, status_before_ban = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_ref())
        .bind(status_before_ban.map(|s| s.as_ref().to_string()))
        .bind(fmt_ts(&now()))
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Account", id));
        }
        Ok(())
    }

    pub async fn set_badge(conn: &mut SqliteConnection, id: &str, badge: Badge) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET badge = ?, updated_at = ? WHERE id = ?")
            .bind(badge.as_ref())
            .bind(fmt_ts(&now()))
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Account", id));
        }
        Ok(())
    }
}

// ============================================================================
// Task Repository
// ============================================================================

/// Repository for the tasks catalog
pub struct TaskRepo;

impl TaskRepo {
    pub async fn insert(conn: &mut SqliteConnection, task: &Task) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, title, description, reward, worker_limit, submitted_count, is_published, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.reward.value().to_string())
        .bind(i64::from(task.worker_limit))
        .bind(i64::from(task.submitted_count))
        .bind(task.is_published)
        .bind(fmt_ts(&task.created_at))
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> StoreResult<Task> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| StoreError::not_found("Task", id))
            .and_then(Task::try_from)
    }

    /// Newest first
    pub async fn list(conn: &mut SqliteConnection, published_only: bool) -> StoreResult<Vec<Task>> {
        let sql = if published_only {
            "SELECT * FROM tasks WHERE is_published = 1 ORDER BY created_at DESC, id"
        } else {
            "SELECT * FROM tasks ORDER BY created_at DESC, id"
        };
        let rows = sqlx::query_as::<_, TaskRow>(sql).fetch_all(conn).await?;
        convert_all(rows)
    }

    pub async fn set_published(
        conn: &mut SqliteConnection,
        id: &str,
        published: bool,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE tasks SET is_published = ? WHERE id = ?")
            .bind(published)
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Task", id));
        }
        Ok(())
    }

    /// Take one worker slot. Check and increment happen in a single
    /// statement; `false` means the task is full or unpublished.
    pub async fn take_slot(conn: &mut SqliteConnection, id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET submitted_count = submitted_count + 1
            WHERE id = ? AND is_published = 1 AND submitted_count < worker_limit
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Give a slot back; never goes below zero
    pub async fn release_slot(conn: &mut SqliteConnection, id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET submitted_count = submitted_count - 1 WHERE id = ? AND submitted_count > 0",
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Submission Repository
// ============================================================================

/// Query over the submissions table
#[derive(Debug, Clone, Default)]
pub struct SubmissionQuery {
    pub account_id: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub kind: Option<SubmissionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Include rows the owner hid (admin views)
    pub include_hidden: bool,
}

/// Repository for the submissions table
pub struct SubmissionRepo;

impl SubmissionRepo {
    pub async fn insert(conn: &mut SqliteConnection, submission: &Submission) -> StoreResult<()> {
        let payload = serde_json::to_string(&submission.payload)?;
        sqlx::query(
            r#"
            INSERT INTO submissions
                (id, account_id, kind, task_id, payload, amount, status, created_at,
                 reviewed_at, reviewed_by, review_note, user_hidden)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&submission.id)
        .bind(&submission.account_id)
        .bind(submission.kind.as_ref())
        .bind(submission.payload.task_id())
        .bind(payload)
        .bind(submission.amount.value().to_string())
        .bind(submission.status.as_ref())
        .bind(fmt_ts(&submission.created_at))
        .bind(submission.reviewed_at.as_ref().map(fmt_ts))
        .bind(&submission.reviewed_by)
        .bind(&submission.review_note)
        .bind(submission.user_hidden)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> StoreResult<Submission> {
        sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| StoreError::not_found("Submission", id))
            .and_then(Submission::try_from)
    }

    /// Newest first
    pub async fn list(
        conn: &mut SqliteConnection,
        query: &SubmissionQuery,
    ) -> StoreResult<Vec<Submission>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM submissions WHERE 1 = 1");

        if let Some(account_id) = &query.account_id {
            qb.push(" AND account_id = ").push_bind(account_id.clone());
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status.as_ref().to_string());
        }
        if let Some(kind) = query.kind {
            qb.push(" AND kind = ").push_bind(kind.as_ref().to_string());
        }
        if let Some(from) = &query.from {
            qb.push(" AND created_at >= ").push_bind(fmt_ts(from));
        }
        if let Some(to) = &query.to {
            qb.push(" AND created_at <= ").push_bind(fmt_ts(to));
        }
        if !query.include_hidden {
            qb.push(" AND user_hidden = 0");
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb.build_query_as::<SubmissionRow>().fetch_all(conn).await?;
        convert_all(rows)
    }

    /// Move a pending submission to a terminal status.
    ///
    /// Returns `false` when the row is no longer pending, so two reviewers
    /// racing on the same submission cannot both win.
    pub async fn review(
        conn: &mut SqliteConnection,
        id: &str,
        status: SubmissionStatus,
        reviewer_id: &str,
        note: Option<&str>,
        at: &DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = ?, reviewed_at = ?, reviewed_by = ?, review_note = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(fmt_ts(at))
        .bind(reviewer_id)
        .bind(note)
        .bind(id)
        .bind(SubmissionStatus::Pending.as_ref())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Owner-scoped hide; `false` when nothing changed (already hidden,
    /// missing, or owned by someone else)
    pub async fn hide(conn: &mut SqliteConnection, id: &str, account_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE submissions SET user_hidden = 1 WHERE id = ? AND account_id = ? AND user_hidden = 0",
        )
        .bind(id)
        .bind(account_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Hard delete, handing back the removed row
    pub async fn delete(conn: &mut SqliteConnection, id: &str) -> StoreResult<Submission> {
        sqlx::query_as::<_, SubmissionRow>("DELETE FROM submissions WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| StoreError::not_found("Submission", id))
            .and_then(Submission::try_from)
    }

    /// Whether the account already holds a pending or approved submission
    /// for this task
    pub async fn has_active_for_task(
        conn: &mut SqliteConnection,
        account_id: &str,
        task_id: &str,
    ) -> StoreResult<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM submissions
            WHERE account_id = ? AND task_id = ? AND status IN (?, ?)
            "#,
        )
        .bind(account_id)
        .bind(task_id)
        .bind(SubmissionStatus::Pending.as_ref())
        .bind(SubmissionStatus::Approved.as_ref())
        .fetch_one(conn)
        .await?;
        Ok(count > 0)
    }
}

// ============================================================================
// Ledger Repository
// ============================================================================

/// Repository for the append-only ledger
pub struct LedgerRepo;

impl LedgerRepo {
    pub async fn insert(conn: &mut SqliteConnection, entry: &LedgerEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, account_id, kind, amount, description, related_submission_id, status, hidden_by_user, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(entry.kind.as_ref())
        .bind(entry.amount.value().to_string())
        .bind(&entry.description)
        .bind(&entry.related_submission_id)
        .bind(entry.status.as_ref())
        .bind(entry.hidden_by_user)
        .bind(fmt_ts(&entry.created_at))
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn get(conn: &mut SqliteConnection, id: &str) -> StoreResult<LedgerEntry> {
        sqlx::query_as::<_, LedgerRow>("SELECT * FROM ledger_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| StoreError::not_found("LedgerEntry", id))
            .and_then(LedgerEntry::try_from)
    }

    /// Every entry of one account, newest first, hidden rows included
    pub async fn list_for_account(
        conn: &mut SqliteConnection,
        account_id: &str,
    ) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT * FROM ledger_entries WHERE account_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(conn)
        .await?;
        convert_all(rows)
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT * FROM ledger_entries ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(conn)
        .await?;
        convert_all(rows)
    }

    /// Authoritative balance: signed fold over every entry of the account
    pub async fn sum_balance(conn: &mut SqliteConnection, account_id: &str) -> StoreResult<Decimal> {
        let entries = Self::list_for_account(conn, account_id).await?;
        Ok(fold_balance(&entries))
    }

    /// Flip a hold entry's status; `false` when it was already in `status`
    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: EntryStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE ledger_entries SET status = ? WHERE id = ? AND status <> ?")
            .bind(status.as_ref())
            .bind(id)
            .bind(status.as_ref())
            .execute(conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Owner-scoped hide; `NotFound` unless the entry belongs to `account_id`
    pub async fn hide(conn: &mut SqliteConnection, id: &str, account_id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE ledger_entries SET hidden_by_user = 1 WHERE id = ? AND account_id = ?",
        )
        .bind(id)
        .bind(account_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("LedgerEntry", id));
        }
        Ok(())
    }
}

// ============================================================================
// Notification Repository
// ============================================================================

/// Repository for per-account notifications
pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn insert(conn: &mut SqliteConnection, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, account_id, kind, title, message, amount, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.account_id)
        .bind(notification.kind.as_ref())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.amount.map(|a| a.value().to_string()))
        .bind(notification.read)
        .bind(fmt_ts(&notification.created_at))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Newest first
    pub async fn list_for_account(
        conn: &mut SqliteConnection,
        account_id: &str,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE account_id = ? AND read = 0 ORDER BY created_at DESC, id DESC"
        } else {
            "SELECT * FROM notifications WHERE account_id = ? ORDER BY created_at DESC, id DESC"
        };
        let rows = sqlx::query_as::<_, NotificationRow>(sql)
            .bind(account_id)
            .fetch_all(conn)
            .await?;
        convert_all(rows)
    }

    pub async fn unread_count(conn: &mut SqliteConnection, account_id: &str) -> StoreResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE account_id = ? AND read = 0")
                .bind(account_id)
                .fetch_one(conn)
                .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn mark_read(
        conn: &mut SqliteConnection,
        id: &str,
        account_id: &str,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND account_id = ?")
                .bind(id)
                .bind(account_id)
                .execute(conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Notification", id));
        }
        Ok(())
    }

    pub async fn mark_all_read(conn: &mut SqliteConnection, account_id: &str) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE account_id = ? AND read = 0")
                .bind(account_id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_one(
        conn: &mut SqliteConnection,
        id: &str,
        account_id: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Notification", id));
        }
        Ok(())
    }

    pub async fn delete_all(conn: &mut SqliteConnection, account_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE account_id = ?")
            .bind(account_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::db::Database;
    use rust_decimal_macros::dec;
    use taskpay_core::{Amount, NotificationKind, SubmissionPayload};
    use taskpay_ledger::{LedgerEntryDraft, LedgerKind};

    async fn setup() -> Database {
        Database::connect(&StoreConfig::in_memory()).await.unwrap()
    }

    fn account(id: &str, email: &str, role: Role) -> Account {
        Account::new(id, id, email, role)
    }

    fn task(id: &str, limit: u32) -> Task {
        Task {
            id: id.to_string(),
            title: "Follow page".to_string(),
            description: "Follow and screenshot".to_string(),
            reward: Amount::new(dec!(25)).unwrap(),
            worker_limit: limit,
            submitted_count: 0,
            is_published: true,
            created_at: now(),
        }
    }

    fn task_submission(id: &str, account_id: &str, task_id: &str) -> Submission {
        Submission {
            id: id.to_string(),
            account_id: account_id.to_string(),
            kind: SubmissionKind::Task,
            payload: SubmissionPayload::Task {
                task_id: task_id.to_string(),
                proof_text: Some("done".to_string()),
                proof_url: None,
                images: vec![],
            },
            amount: Amount::new(dec!(25)).unwrap(),
            status: SubmissionStatus::Pending,
            created_at: now(),
            reviewed_at: None,
            reviewed_by: None,
            review_note: None,
            user_hidden: false,
        }
    }

    #[tokio::test]
    async fn test_account_insert_and_get() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        AccountRepo::insert(&mut conn, &account("ACC-1", "a@example.com", Role::User))
            .await
            .unwrap();
        let loaded = AccountRepo::get(&mut conn, "ACC-1").await.unwrap();
        assert_eq!(loaded.email, "a@example.com");
        assert_eq!(loaded.status, AccountStatus::Pending);
        assert_eq!(loaded.balance, Decimal::ZERO);

        let dup = AccountRepo::insert(&mut conn, &account("ACC-2", "a@example.com", Role::User)).await;
        assert!(matches!(dup, Err(StoreError::AlreadyExists { .. })));

        let missing = AccountRepo::get(&mut conn, "ACC-404").await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_admin_ids_only_lists_admins() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::insert(&mut conn, &account("ACC-1", "u@example.com", Role::User)).await.unwrap();
        AccountRepo::insert(&mut conn, &account("ADM-1", "a@example.com", Role::Admin)).await.unwrap();

        assert_eq!(AccountRepo::admin_ids(&mut conn).await.unwrap(), vec!["ADM-1"]);
        assert_eq!(AccountRepo::list(&mut conn, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_take_slot_stops_at_limit() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        TaskRepo::insert(&mut conn, &task("TSK-1", 2)).await.unwrap();

        assert!(TaskRepo::take_slot(&mut conn, "TSK-1").await.unwrap());
        assert!(TaskRepo::take_slot(&mut conn, "TSK-1").await.unwrap());
        assert!(!TaskRepo::take_slot(&mut conn, "TSK-1").await.unwrap());
        assert_eq!(TaskRepo::get(&mut conn, "TSK-1").await.unwrap().submitted_count, 2);

        assert!(TaskRepo::release_slot(&mut conn, "TSK-1").await.unwrap());
        assert!(TaskRepo::take_slot(&mut conn, "TSK-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unpublished_task_has_no_slots() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        TaskRepo::insert(&mut conn, &task("TSK-1", 5)).await.unwrap();
        TaskRepo::set_published(&mut conn, "TSK-1", false).await.unwrap();

        assert!(!TaskRepo::take_slot(&mut conn, "TSK-1").await.unwrap());
        assert!(TaskRepo::list(&mut conn, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_only_once() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::insert(&mut conn, &account("ACC-1", "u@example.com", Role::User)).await.unwrap();
        SubmissionRepo::insert(&mut conn, &task_submission("SUB-1", "ACC-1", "TSK-1"))
            .await
            .unwrap();

        let at = now();
        assert!(SubmissionRepo::review(&mut conn, "SUB-1", SubmissionStatus::Approved, "ADM-1", None, &at)
            .await
            .unwrap());
        assert!(!SubmissionRepo::review(&mut conn, "SUB-1", SubmissionStatus::Rejected, "ADM-2", Some("late"), &at)
            .await
            .unwrap());

        let loaded = SubmissionRepo::get(&mut conn, "SUB-1").await.unwrap();
        assert_eq!(loaded.status, SubmissionStatus::Approved);
        assert_eq!(loaded.reviewed_by.as_deref(), Some("ADM-1"));
        assert_eq!(loaded.reviewed_at, Some(at));
    }

    #[tokio::test]
    async fn test_hidden_submissions_need_include_hidden() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::insert(&mut conn, &account("ACC-1", "u@example.com", Role::User)).await.unwrap();
        SubmissionRepo::insert(&mut conn, &task_submission("SUB-1", "ACC-1", "TSK-1")).await.unwrap();
        SubmissionRepo::insert(&mut conn, &task_submission("SUB-2", "ACC-1", "TSK-2")).await.unwrap();

        assert!(!SubmissionRepo::hide(&mut conn, "SUB-1", "ACC-2").await.unwrap());
        assert!(SubmissionRepo::hide(&mut conn, "SUB-1", "ACC-1").await.unwrap());
        assert!(!SubmissionRepo::hide(&mut conn, "SUB-1", "ACC-1").await.unwrap());

        let owner = SubmissionQuery {
            account_id: Some("ACC-1".to_string()),
            ..Default::default()
        };
        let listed = SubmissionRepo::list(&mut conn, &owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "SUB-2");

        let admin = SubmissionQuery {
            include_hidden: true,
            ..owner
        };
        assert_eq!(SubmissionRepo::list(&mut conn, &admin).await.unwrap().len(), 2);

        assert!(SubmissionRepo::has_active_for_task(&mut conn, "ACC-1", "TSK-1").await.unwrap());
        assert!(!SubmissionRepo::has_active_for_task(&mut conn, "ACC-1", "TSK-3").await.unwrap());

        let deleted = SubmissionRepo::delete(&mut conn, "SUB-1").await.unwrap();
        assert!(deleted.user_hidden);
        assert!(SubmissionRepo::delete(&mut conn, "SUB-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ledger_sum_and_hold_status() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::insert(&mut conn, &account("ACC-1", "u@example.com", Role::User)).await.unwrap();

        let credit = LedgerEntryDraft::new("ACC-1", LedgerKind::Credit, dec!(200), "bonus")
            .unwrap()
            .commit("LED-1", now());
        let hold = LedgerEntryDraft::new("ACC-1", LedgerKind::WithdrawalPending, dec!(150), "hold")
            .unwrap()
            .pending()
            .commit("LED-2", now());
        LedgerRepo::insert(&mut conn, &credit).await.unwrap();
        LedgerRepo::insert(&mut conn, &hold).await.unwrap();

        assert_eq!(LedgerRepo::sum_balance(&mut conn, "ACC-1").await.unwrap(), dec!(50));

        assert!(LedgerRepo::set_status(&mut conn, "LED-2", EntryStatus::Completed).await.unwrap());
        assert!(!LedgerRepo::set_status(&mut conn, "LED-2", EntryStatus::Completed).await.unwrap());
        assert_eq!(
            LedgerRepo::get(&mut conn, "LED-2").await.unwrap().status,
            EntryStatus::Completed
        );

        let err = LedgerRepo::hide(&mut conn, "LED-1", "ACC-2").await.unwrap_err();
        assert!(err.is_not_found());
        LedgerRepo::hide(&mut conn, "LED-1", "ACC-1").await.unwrap();
        assert!(LedgerRepo::get(&mut conn, "LED-1").await.unwrap().hidden_by_user);
    }

    #[tokio::test]
    async fn test_notifications_are_owner_scoped() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::insert(&mut conn, &account("ACC-1", "u@example.com", Role::User)).await.unwrap();

        for id in ["NTF-1", "NTF-2"] {
            let n = Notification::new(id, "ACC-1", NotificationKind::TaskApproved, "Approved", "ok", None);
            NotificationRepo::insert(&mut conn, &n).await.unwrap();
        }
        assert_eq!(NotificationRepo::unread_count(&mut conn, "ACC-1").await.unwrap(), 2);

        let err = NotificationRepo::mark_read(&mut conn, "NTF-1", "ACC-2").await.unwrap_err();
        assert!(err.is_not_found());

        NotificationRepo::mark_read(&mut conn, "NTF-1", "ACC-1").await.unwrap();
        let unread = NotificationRepo::list_for_account(&mut conn, "ACC-1", true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "NTF-2");

        assert_eq!(NotificationRepo::delete_all(&mut conn, "ACC-1").await.unwrap(), 2);
        assert_eq!(NotificationRepo::unread_count(&mut conn, "ACC-1").await.unwrap(), 0);
    }
}
