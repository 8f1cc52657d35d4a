//! CLI commands
//!
//! Each command acts as the signed-in account (`--as`) and prints a short
//! summary. The value behind the summary is returned for callers that want it.

use anyhow::bail;
use rust_decimal::Decimal;
use taskpay_core::{Account, AccountStatus, Badge, Notification, Role, Submission, Task};
use taskpay_ledger::{EntryFilter, LedgerEntry, Viewer};
use taskpay_workflow::{NewSubmission, NewTask, ReviewOutcome, SubmissionFilter};

use crate::context::AppContext;

/// Create the store and, optionally, the first admin account
pub async fn init(
    ctx: &AppContext,
    admin: Option<(&str, &str)>,
) -> Result<Option<Account>, anyhow::Error> {
    println!("✅ Store ready at {}", ctx.db_path().display());

    let Some((name, email)) = admin else {
        return Ok(None);
    };
    if !ctx.accounts().list(Some(Role::Admin)).await?.is_empty() {
        bail!("An admin account already exists");
    }
    let account = ctx.accounts().register(name, email, Role::Admin).await?;
    println!("✅ Admin {} created ({})", account.display_name, account.id);
    Ok(Some(account))
}

pub async fn register(ctx: &AppContext, name: &str, email: &str) -> Result<Account, anyhow::Error> {
    let account = ctx.accounts().register(name, email, Role::User).await?;
    println!(
        "✅ Registered {} <{}> as {} (status: {})",
        account.display_name, account.email, account.id, account.status
    );
    Ok(account)
}

pub async fn show_account(ctx: &AppContext, account_id: Option<&str>) -> Result<Account, anyhow::Error> {
    let account = match account_id {
        Some(id) => ctx.accounts().get(id).await?,
        None => ctx.actor().await?,
    };
    println!("{} <{}>", account.display_name, account.email);
    println!("  id:      {}", account.id);
    println!("  role:    {}", account.role);
    println!("  status:  {}", account.status);
    println!("  badge:   {}", account.badge);
    println!("  balance: {:.2}", account.balance);
    Ok(account)
}

pub async fn list_accounts(ctx: &AppContext, role: Option<Role>) -> Result<Vec<Account>, anyhow::Error> {
    let accounts = ctx.accounts().list(role).await?;
    for a in &accounts {
        println!(
            "{}  {:<20} {:<8} {:<9} {:>10.2}",
            a.id, a.display_name, a.role, a.status, a.balance
        );
    }
    Ok(accounts)
}

pub async fn set_status(
    ctx: &AppContext,
    account_id: &str,
    status: AccountStatus,
) -> Result<Account, anyhow::Error> {
    let admin = ctx.actor().await?;
    let account = ctx.accounts().set_status(&admin.id, account_id, status).await?;
    println!("✅ {} is now {}", account.id, account.status);
    Ok(account)
}

pub async fn ban(ctx: &AppContext, account_id: &str) -> Result<Account, anyhow::Error> {
    let admin = ctx.actor().await?;
    let account = ctx.accounts().ban(&admin.id, account_id).await?;
    println!("✅ Banned {}", account.id);
    Ok(account)
}

pub async fn unban(ctx: &AppContext, account_id: &str) -> Result<Account, anyhow::Error> {
    let admin = ctx.actor().await?;
    let account = ctx.accounts().unban(&admin.id, account_id).await?;
    println!("✅ Unbanned {} (status: {})", account.id, account.status);
    Ok(account)
}

pub async fn set_badge(ctx: &AppContext, account_id: &str, badge: Badge) -> Result<Account, anyhow::Error> {
    let admin = ctx.actor().await?;
    let account = ctx.accounts().set_badge(&admin.id, account_id, badge).await?;
    println!("✅ {} badge: {}", account.id, account.badge);
    Ok(account)
}

pub async fn create_task(ctx: &AppContext, new_task: NewTask) -> Result<Task, anyhow::Error> {
    let admin = ctx.actor().await?;
    let task = ctx.services.tasks.create_task(&admin.id, new_task).await?;
    println!(
        "✅ Task {} \"{}\" reward {} for {} workers{}",
        task.id,
        task.title,
        task.reward,
        task.worker_limit,
        if task.is_published { " (published)" } else { "" }
    );
    Ok(task)
}

pub async fn publish_task(ctx: &AppContext, task_id: &str, publish: bool) -> Result<Task, anyhow::Error> {
    let admin = ctx.actor().await?;
    let task = if publish {
        ctx.services.tasks.publish(&admin.id, task_id).await?
    } else {
        ctx.services.tasks.unpublish(&admin.id, task_id).await?
    };
    println!(
        "✅ Task {} {}",
        task.id,
        if task.is_published { "published" } else { "unpublished" }
    );
    Ok(task)
}

pub async fn list_tasks(ctx: &AppContext, all: bool) -> Result<Vec<Task>, anyhow::Error> {
    let tasks = ctx.services.tasks.list(!all).await?;
    if tasks.is_empty() {
        println!("No tasks");
    }
    for t in &tasks {
        println!(
            "{}  {:<30} {:>8} {:>3}/{:<3}{}",
            t.id,
            t.title,
            t.reward,
            t.submitted_count,
            t.worker_limit,
            if t.is_published { "" } else { "  draft" }
        );
    }
    Ok(tasks)
}

/// Task proof, manual claim or withdrawal, as the signed-in account
pub async fn submit(ctx: &AppContext, new_submission: NewSubmission) -> Result<Submission, anyhow::Error> {
    let actor = ctx.actor().await?;
    let submission = ctx.services.submissions.create(&actor.id, new_submission).await?;
    println!(
        "✅ Submitted {} {} for {} (status: {})",
        submission.kind,
        submission.id,
        submission.amount,
        submission.status
    );
    Ok(submission)
}

pub async fn approve(ctx: &AppContext, submission_id: &str) -> Result<ReviewOutcome, anyhow::Error> {
    let admin = ctx.actor().await?;
    let outcome = ctx.services.reviews.approve(submission_id, &admin.id).await?;
    print_outcome("Approved", &outcome);
    Ok(outcome)
}

pub async fn reject(
    ctx: &AppContext,
    submission_id: &str,
    reason: Option<String>,
) -> Result<ReviewOutcome, anyhow::Error> {
    let admin = ctx.actor().await?;
    let outcome = ctx.services.reviews.reject(submission_id, &admin.id, reason).await?;
    print_outcome("Rejected", &outcome);
    Ok(outcome)
}

pub async fn delete_submission(ctx: &AppContext, submission_id: &str) -> Result<ReviewOutcome, anyhow::Error> {
    let admin = ctx.actor().await?;
    let outcome = ctx.services.reviews.delete(submission_id, &admin.id).await?;
    println!("✅ Deleted submission {}", outcome.submission.id);
    Ok(outcome)
}

fn print_outcome(verb: &str, outcome: &ReviewOutcome) {
    println!(
        "✅ {} {} {} ({})",
        verb, outcome.submission.kind, outcome.submission.id, outcome.submission.amount
    );
    if let Some(entry) = &outcome.ledger_entry {
        println!("   ledger: {} {} {}", entry.id, entry.kind, entry.signed_amount());
    }
}

pub async fn adjust(
    ctx: &AppContext,
    account_id: &str,
    signed_amount: Decimal,
    description: &str,
) -> Result<LedgerEntry, anyhow::Error> {
    let admin = ctx.actor().await?;
    let entry = ctx
        .services
        .balances
        .adjust_balance(&admin.id, account_id, signed_amount, description)
        .await?;
    println!(
        "✅ {} {} on {} ({})",
        entry.kind,
        entry.amount,
        account_id,
        entry.description
    );
    Ok(entry)
}

/// Cached balance, checked against the ledger
pub async fn balance(ctx: &AppContext, account_id: Option<&str>) -> Result<Decimal, anyhow::Error> {
    let account_id = match account_id {
        Some(id) => id.to_string(),
        None => ctx.actor().await?.id,
    };
    let balance = ctx.services.balances.get_balance(&account_id).await?;
    let consistent = ctx.services.balances.verify(&account_id).await?;

    println!("Balance for {}: {:.2}", account_id, balance);
    if !consistent {
        println!("⚠️  Cached balance differs from the ledger; run `taskpay rebuild`");
    }
    Ok(balance)
}

/// Ledger history. Admins may pass `all` or another account.
pub async fn ledger(
    ctx: &AppContext,
    account_id: Option<&str>,
    all: bool,
    filter: EntryFilter,
) -> Result<Vec<LedgerEntry>, anyhow::Error> {
    let actor = ctx.actor().await?;
    let viewer = if actor.is_admin() { Viewer::Admin } else { Viewer::Owner };

    let entries = if all {
        if !actor.is_admin() {
            bail!("Only admins can list every account's ledger");
        }
        ctx.services.ledger.list_all(&filter).await?
    } else {
        let account_id = account_id.unwrap_or(&actor.id);
        if account_id != actor.id && !actor.is_admin() {
            bail!("You can only view your own ledger");
        }
        ctx.services.ledger.list_for_account(account_id, &filter, viewer).await?
    };

    if entries.is_empty() {
        println!("No ledger entries");
    }
    for e in &entries {
        println!(
            "{}  {} {:<18} {:>10} {:<9} {}{}",
            e.id,
            e.created_at.format("%Y-%m-%d %H:%M"),
            e.kind,
            e.signed_amount(),
            e.status,
            e.description,
            if e.hidden_by_user { "  (hidden by user)" } else { "" }
        );
    }
    Ok(entries)
}

pub async fn hide_ledger_entry(ctx: &AppContext, entry_id: &str) -> Result<(), anyhow::Error> {
    let actor = ctx.actor().await?;
    ctx.services.ledger.hide_for_owner(entry_id, &actor.id).await?;
    println!("✅ Hid ledger entry {}", entry_id);
    Ok(())
}

/// Own submissions, or (admins, with `all`/`pending`) everyone's
pub async fn submissions(
    ctx: &AppContext,
    all: bool,
    pending: bool,
    filter: SubmissionFilter,
) -> Result<Vec<Submission>, anyhow::Error> {
    let actor = ctx.actor().await?;
    let rows = match (all || pending, actor.is_admin()) {
        (true, false) => bail!("Only admins can list other accounts' submissions"),
        (true, true) if pending => ctx.services.submissions.list_pending(&filter).await?,
        (true, true) => ctx.services.submissions.list_all(&filter).await?,
        (false, _) => ctx.services.submissions.list_for_account(&actor.id, &filter).await?,
    };

    if rows.is_empty() {
        println!("No submissions");
    }
    for s in &rows {
        println!(
            "{}  {:<10} {:<8} {:>10} {}  {}{}",
            s.id,
            s.kind,
            s.status,
            s.amount,
            s.created_at.format("%Y-%m-%d %H:%M"),
            s.payload.label(),
            if s.user_hidden { "  (hidden by user)" } else { "" }
        );
    }
    Ok(rows)
}

pub async fn hide_submission(ctx: &AppContext, submission_id: &str) -> Result<Submission, anyhow::Error> {
    let actor = ctx.actor().await?;
    let submission = ctx.services.submissions.soft_hide(submission_id, &actor.id).await?;
    println!("✅ Hid submission {}", submission.id);
    Ok(submission)
}

pub async fn notifications(ctx: &AppContext, unread_only: bool) -> Result<Vec<Notification>, anyhow::Error> {
    let actor = ctx.actor().await?;
    let items = ctx
        .services
        .notifications
        .list_for_account(&actor.id, unread_only)
        .await?;
    let unread = ctx.services.notifications.unread_count(&actor.id).await?;

    println!("{} notifications, {} unread", items.len(), unread);
    for n in &items {
        println!(
            "{} {}  {}: {}",
            if n.read { " " } else { "*" },
            n.id,
            n.title,
            n.message
        );
    }
    Ok(items)
}

pub async fn mark_read(ctx: &AppContext, notification_id: Option<&str>) -> Result<u64, anyhow::Error> {
    let actor = ctx.actor().await?;
    let updated = match notification_id {
        Some(id) => {
            ctx.services.notifications.mark_read(id, &actor.id).await?;
            1
        }
        None => ctx.services.notifications.mark_all_read(&actor.id).await?,
    };
    println!("✅ Marked {} read", updated);
    Ok(updated)
}

pub async fn clear_notifications(ctx: &AppContext, notification_id: Option<&str>) -> Result<u64, anyhow::Error> {
    let actor = ctx.actor().await?;
    let deleted = match notification_id {
        Some(id) => {
            ctx.services.notifications.delete_one(id, &actor.id).await?;
            1
        }
        None => ctx.services.notifications.delete_all(&actor.id).await?,
    };
    println!("✅ Deleted {} notifications", deleted);
    Ok(deleted)
}

/// Recompute cached balances from the ledger
pub async fn rebuild(ctx: &AppContext) -> Result<usize, anyhow::Error> {
    let admin = ctx.actor().await?;
    if !admin.is_admin() {
        bail!("Only admins can rebuild balances");
    }
    let drifted = ctx.services.ledger.rebuild_balances().await?;
    println!("✅ Rebuilt balances ({} corrected)", drifted);
    Ok(drifted)
}
