//! Ledger service
//!
//! The ledger is the source of truth for money. Every append recomputes the
//! account's cached balance from the full ledger inside the same
//! transaction, so the cache can never be observed out of step.

use crate::error::{WorkflowError, WorkflowResult};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::new_id;
use taskpay_ledger::{EntryFilter, LedgerEntry, LedgerEntryDraft, Viewer};
use taskpay_store::codec::now;
use taskpay_store::{AccountRepo, Database, LedgerRepo, StoreError};
use tracing::{debug, info, warn};

/// Append `draft` and refresh the cached balance on `conn`.
///
/// Starts with a write on the account row, which both proves the account
/// exists and takes SQLite's write lock before any read.
pub(crate) async fn append_entry(
    conn: &mut SqliteConnection,
    draft: LedgerEntryDraft,
) -> WorkflowResult<(LedgerEntry, Decimal)> {
    match AccountRepo::touch(&mut *conn, &draft.account_id).await {
        Ok(()) => {}
        Err(StoreError::NotFound { .. }) => {
            return Err(WorkflowError::validation(format!(
                "unknown account {}",
                draft.account_id
            )))
        }
        Err(e) => return Err(e.into()),
    }

    let entry = draft.commit(new_id("LED"), now());
    LedgerRepo::insert(&mut *conn, &entry).await?;

    let balance = LedgerRepo::sum_balance(&mut *conn, &entry.account_id).await?;
    AccountRepo::set_balance(&mut *conn, &entry.account_id, balance).await?;

    debug!(
        entry_id = %entry.id,
        account_id = %entry.account_id,
        kind = %entry.kind,
        amount = %entry.amount,
        balance = %balance,
        "Ledger entry appended"
    );
    Ok((entry, balance))
}

/// Change events for a committed entry
pub(crate) fn entry_events(entry: &LedgerEntry) -> [ChangeEvent; 2] {
    [
        ChangeEvent::created(Collection::LedgerEntries, &entry.id, Some(&entry.account_id)),
        ChangeEvent::updated(Collection::Accounts, &entry.account_id, Some(&entry.account_id)),
    ]
}

/// Append-only ledger access
#[derive(Clone)]
pub struct LedgerService {
    db: Database,
    bus: ChangeBus,
}

impl LedgerService {
    pub fn new(db: Database, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    /// Append one entry in its own transaction.
    ///
    /// Fails with `Validation` for an unknown account; the draft itself
    /// already guarantees a positive amount.
    pub async fn append(&self, draft: LedgerEntryDraft) -> WorkflowResult<LedgerEntry> {
        let mut tx = self.db.begin().await?;
        let (entry, balance) = append_entry(&mut tx, draft).await?;
        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            account_id = %entry.account_id,
            kind = %entry.kind,
            amount = %entry.amount,
            balance = %balance,
            "Ledger entry committed"
        );
        self.bus.publish_all(entry_events(&entry));
        Ok(entry)
    }

    /// History of one account, newest first
    pub async fn list_for_account(
        &self,
        account_id: &str,
        filter: &EntryFilter,
        viewer: Viewer,
    ) -> WorkflowResult<Vec<LedgerEntry>> {
        let mut conn = self.db.pool().acquire().await?;
        if AccountRepo::find(&mut conn, account_id).await?.is_none() {
            return Err(WorkflowError::not_found("Account", account_id));
        }
        let entries: Vec<LedgerEntry> = LedgerRepo::list_for_account(&mut conn, account_id)
            .await?
            .into_iter()
            .filter(|e| filter.matches(e, viewer))
            .collect();

        debug!(account_id, ?viewer, count = entries.len(), "Listed ledger entries");
        Ok(entries)
    }

    /// Admin view across every account
    pub async fn list_all(&self, filter: &EntryFilter) -> WorkflowResult<Vec<LedgerEntry>> {
        let mut conn = self.db.pool().acquire().await?;
        let entries: Vec<LedgerEntry> = LedgerRepo::list_all(&mut conn)
            .await?
            .into_iter()
            .filter(|e| filter.matches(e, Viewer::Admin))
            .collect();
        debug!(count = entries.len(), "Listed all ledger entries");
        Ok(entries)
    }

    pub async fn get(&self, entry_id: &str) -> WorkflowResult<LedgerEntry> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(LedgerRepo::get(&mut conn, entry_id).await?)
    }

    /// Authoritative balance: the signed fold of the ledger
    pub async fn sum_balance(&self, account_id: &str) -> WorkflowResult<Decimal> {
        let mut conn = self.db.pool().acquire().await?;
        if AccountRepo::find(&mut conn, account_id).await?.is_none() {
            return Err(WorkflowError::not_found("Account", account_id));
        }
        Ok(LedgerRepo::sum_balance(&mut conn, account_id).await?)
    }

    /// Hide an entry from its owner's history. Admins still see it.
    pub async fn hide_for_owner(&self, entry_id: &str, account_id: &str) -> WorkflowResult<()> {
        let mut conn = self.db.pool().acquire().await?;
        LedgerRepo::hide(&mut conn, entry_id, account_id).await?;
        drop(conn);

        info!(entry_id, account_id, "Ledger entry hidden by owner");
        self.bus.publish(ChangeEvent::updated(
            Collection::LedgerEntries,
            entry_id,
            Some(account_id),
        ));
        Ok(())
    }

    /// Recompute every cached balance from the ledger.
    ///
    /// Returns how many accounts had drifted.
    pub async fn rebuild_balances(&self) -> WorkflowResult<usize> {
        let mut tx = self.db.begin().await?;
        let mut drifted = Vec::new();

        for account_id in AccountRepo::ids(&mut tx).await? {
            let ledger = LedgerRepo::sum_balance(&mut tx, &account_id).await?;
            let cached = AccountRepo::cached_balance(&mut tx, &account_id).await?;
            if ledger != cached {
                warn!(account_id = %account_id, %cached, %ledger, "Cached balance drifted; rewriting");
                AccountRepo::set_balance(&mut tx, &account_id, ledger).await?;
                drifted.push(account_id);
            }
        }
        tx.commit().await?;

        info!(drifted = drifted.len(), "Balances rebuilt from ledger");
        for account_id in &drifted {
            self.bus.publish(ChangeEvent::updated(
                Collection::Accounts,
                account_id,
                Some(account_id),
            ));
        }
        Ok(drifted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use taskpay_core::{Account, Role};
    use taskpay_ledger::LedgerKind;
    use taskpay_store::StoreConfig;

    async fn setup() -> (Database, LedgerService) {
        let db = Database::connect(&StoreConfig::in_memory()).await.unwrap();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            AccountRepo::insert(&mut conn, &Account::new("ACC-1", "Rahim", "r@example.com", Role::User))
                .await
                .unwrap();
        }
        let service = LedgerService::new(db.clone(), ChangeBus::new());
        (db, service)
    }

    fn draft(kind: LedgerKind, amount: Decimal, description: &str) -> LedgerEntryDraft {
        LedgerEntryDraft::new("ACC-1", kind, amount, description).unwrap()
    }

    async fn cached(db: &Database) -> Decimal {
        let mut conn = db.pool().acquire().await.unwrap();
        AccountRepo::cached_balance(&mut conn, "ACC-1").await.unwrap()
    }

    #[tokio::test]
    async fn test_append_keeps_cache_equal_to_ledger() {
        let (db, service) = setup().await;
        service.append(draft(LedgerKind::Credit, dec!(500), "Signup bonus")).await.unwrap();
        service.append(draft(LedgerKind::Debit, dec!(120.50), "Correction")).await.unwrap();
        service.append(draft(LedgerKind::Withdrawal, dec!(50), "Settled")).await.unwrap();

        assert_eq!(service.sum_balance("ACC-1").await.unwrap(), dec!(379.50));
        assert_eq!(cached(&db).await, dec!(379.50));
    }

    #[tokio::test]
    async fn test_append_unknown_account_is_validation() {
        let (_db, service) = setup().await;
        let draft = LedgerEntryDraft::new("ACC-404", LedgerKind::Credit, dec!(1), "x").unwrap();
        let err = service.append(draft).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_owner_hide_and_admin_view() {
        let (_db, service) = setup().await;
        let bonus = service.append(draft(LedgerKind::Credit, dec!(10), "Bonus")).await.unwrap();
        service.append(draft(LedgerKind::Credit, dec!(20), "Task reward")).await.unwrap();

        assert!(service.hide_for_owner(&bonus.id, "ACC-2").await.unwrap_err().is_not_found());
        service.hide_for_owner(&bonus.id, "ACC-1").await.unwrap();

        let filter = EntryFilter::new();
        let owner = service.list_for_account("ACC-1", &filter, Viewer::Owner).await.unwrap();
        assert_eq!(owner.len(), 1);

        let admin = service.list_for_account("ACC-1", &filter, Viewer::Admin).await.unwrap();
        assert_eq!(admin.len(), 2);
        assert!(admin.iter().any(|e| e.id == bonus.id && e.hidden_by_user));

        // Hiding never changes the balance
        assert_eq!(service.sum_balance("ACC-1").await.unwrap(), dec!(30));
    }

    #[tokio::test]
    async fn test_search_and_date_filters() {
        let (_db, service) = setup().await;
        service.append(draft(LedgerKind::Credit, dec!(10), "Bonus for March")).await.unwrap();
        service.append(draft(LedgerKind::TaskReward, dec!(20), "Reward for task TSK-1")).await.unwrap();

        let found = service
            .list_for_account("ACC-1", &EntryFilter::new().search("BONUS"), Viewer::Owner)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let future = EntryFilter::new().from(now() + Duration::days(1));
        assert!(service.list_all(&future).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_repairs_drift() {
        let (db, service) = setup().await;
        service.append(draft(LedgerKind::Credit, dec!(75), "Bonus")).await.unwrap();
        assert_eq!(service.rebuild_balances().await.unwrap(), 0);

        {
            let mut conn = db.pool().acquire().await.unwrap();
            AccountRepo::set_balance(&mut conn, "ACC-1", dec!(9999)).await.unwrap();
        }
        assert_eq!(service.rebuild_balances().await.unwrap(), 1);
        assert_eq!(cached(&db).await, dec!(75));
    }
}
