//! Database schema definitions
//!
//! DDL for every collection plus row types for sqlx mapping. Rows keep the
//! raw column encodings; `TryFrom` turns them into domain records.

use crate::codec::{parse_amount, parse_decimal, parse_enum, parse_opt_ts, parse_ts};
use crate::error::{StoreError, StoreResult};
use taskpay_core::{Account, Notification, Submission, SubmissionPayload, Task};
use taskpay_ledger::LedgerEntry;

/// Table and index DDL, applied in order on startup
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL,
        status_before_ban TEXT,
        badge TEXT NOT NULL DEFAULT 'none',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_accounts_role ON accounts(role)",
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        reward TEXT NOT NULL,
        worker_limit INTEGER NOT NULL CHECK (worker_limit > 0),
        submitted_count INTEGER NOT NULL DEFAULT 0 CHECK (submitted_count >= 0),
        is_published INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS submissions (
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL REFERENCES accounts(id),
        kind TEXT NOT NULL,
        task_id TEXT,
        payload TEXT NOT NULL,
        amount TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        reviewed_at TEXT,
        reviewed_by TEXT,
        review_note TEXT,
        user_hidden INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_submissions_account ON submissions(account_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_submissions_task ON submissions(task_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL REFERENCES accounts(id),
        kind TEXT NOT NULL,
        amount TEXT NOT NULL,
        description TEXT NOT NULL,
        related_submission_id TEXT,
        status TEXT NOT NULL,
        hidden_by_user INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ledger_account ON ledger_entries(account_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL REFERENCES accounts(id),
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        amount TEXT,
        read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notifications_account ON notifications(account_id, created_at)",
];

/// Row type for the `accounts` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub balance: String,
    pub status: String,
    pub status_before_ban: Option<String>,
    pub badge: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Row type for the `tasks` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: String,
    pub worker_limit: i64,
    pub submitted_count: i64,
    pub is_published: bool,
    pub created_at: String,
}

/// Row type for the `submissions` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub task_id: Option<String>,
    pub payload: String,
    pub amount: String,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    pub user_hidden: bool,
}

/// Row type for the `ledger_entries` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount: String,
    pub description: String,
    pub related_submission_id: Option<String>,
    pub status: String,
    pub hidden_by_user: bool,
    pub created_at: String,
}

/// Row type for the `notifications` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub amount: Option<String>,
    pub read: bool,
    pub created_at: String,
}

// === Conversion implementations ===

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> StoreResult<Self> {
        Ok(Account {
            role: parse_enum("role", &row.role)?,
            balance: parse_decimal(&row.balance)?,
            status: parse_enum("status", &row.status)?,
            status_before_ban: row
                .status_before_ban
                .as_deref()
                .map(|s| parse_enum("status_before_ban", s))
                .transpose()?,
            badge: parse_enum("badge", &row.badge)?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
            id: row.id,
            display_name: row.display_name,
            email: row.email,
        })
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> StoreResult<Self> {
        Ok(Task {
            reward: parse_amount(&row.reward)?,
            worker_limit: u32::try_from(row.worker_limit)
                .map_err(|_| StoreError::invalid_enum("worker_limit", &row.worker_limit.to_string()))?,
            submitted_count: u32::try_from(row.submitted_count).map_err(|_| {
                StoreError::invalid_enum("submitted_count", &row.submitted_count.to_string())
            })?,
            is_published: row.is_published,
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            title: row.title,
            description: row.description,
        })
    }
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> StoreResult<Self> {
        let payload: SubmissionPayload = serde_json::from_str(&row.payload)?;
        Ok(Submission {
            kind: parse_enum("kind", &row.kind)?,
            payload,
            amount: parse_amount(&row.amount)?,
            status: parse_enum("status", &row.status)?,
            created_at: parse_ts(&row.created_at)?,
            reviewed_at: parse_opt_ts(row.reviewed_at.as_deref())?,
            reviewed_by: row.reviewed_by,
            review_note: row.review_note,
            user_hidden: row.user_hidden,
            id: row.id,
            account_id: row.account_id,
        })
    }
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> StoreResult<Self> {
        Ok(LedgerEntry {
            kind: parse_enum("kind", &row.kind)?,
            amount: parse_amount(&row.amount)?,
            status: parse_enum("status", &row.status)?,
            hidden_by_user: row.hidden_by_user,
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            account_id: row.account_id,
            description: row.description,
            related_submission_id: row.related_submission_id,
        })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> StoreResult<Self> {
        Ok(Notification {
            kind: parse_enum("kind", &row.kind)?,
            amount: row.amount.as_deref().map(parse_amount).transpose()?,
            read: row.read,
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            account_id: row.account_id,
            title: row.title,
            message: row.message,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
