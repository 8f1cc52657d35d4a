//! Account balance projection
//!
//! Reads the cached balance and applies admin adjustments. Adjustments are
//! ordinary ledger appends, so the projection stays rebuildable.

use crate::accounts::require_admin;
use crate::error::{WorkflowError, WorkflowResult};
use crate::ledger::{append_entry, entry_events};
use crate::notify::NotificationDispatcher;
use rust_decimal::Decimal;
use taskpay_bus::ChangeBus;
use taskpay_core::{Amount, NotificationKind};
use taskpay_ledger::{LedgerEntry, LedgerEntryDraft, LedgerKind};
use taskpay_store::{AccountRepo, Database, LedgerRepo};
use tracing::{info, warn};

#[derive(Clone)]
pub struct BalanceService {
    db: Database,
    bus: ChangeBus,
    notifier: NotificationDispatcher,
}

impl BalanceService {
    pub fn new(db: Database, bus: ChangeBus, notifier: NotificationDispatcher) -> Self {
        Self { db, bus, notifier }
    }

    /// Admin credit (positive) or debit (negative).
    ///
    /// A debit larger than the balance is clamped so the balance lands on
    /// zero. Zero, or a debit against an empty balance, is `Validation`.
    pub async fn adjust_balance(
        &self,
        admin_id: &str,
        account_id: &str,
        signed_amount: Decimal,
        description: &str,
    ) -> WorkflowResult<LedgerEntry> {
        require_admin(&self.db, admin_id).await?;
        if signed_amount.is_zero() {
            return Err(WorkflowError::validation("adjustment amount must not be zero"));
        }
        let requested = Amount::positive(signed_amount.abs())?;

        let mut tx = self.db.begin().await?;
        AccountRepo::touch(&mut tx, account_id).await?;

        let (kind, amount, default_description) = if signed_amount.is_sign_positive() {
            (LedgerKind::Credit, requested, "Admin credit")
        } else {
            let current = LedgerRepo::sum_balance(&mut tx, account_id).await?;
            let available = Amount::new(current.max(Decimal::ZERO))?;
            if available.is_zero() {
                warn!(account_id, requested = %requested, "Debit refused on empty balance");
                return Err(WorkflowError::validation("balance is zero; nothing to debit"));
            }
            let clamped = requested.min(available);
            if clamped != requested {
                warn!(account_id, requested = %requested, debited = %clamped, "Debit clamped to balance");
            }
            (LedgerKind::Debit, clamped, "Admin debit")
        };

        let description = match description.trim() {
            "" => default_description.to_string(),
            text => text.to_string(),
        };
        let draft = LedgerEntryDraft::new(account_id, kind, amount.value(), &description)?;
        let (entry, balance) = append_entry(&mut tx, draft).await?;

        let message = if kind.is_credit() {
            format!("{} was added to your balance: {}", amount, description)
        } else {
            format!("{} was deducted from your balance: {}", amount, description)
        };
        let notification = NotificationDispatcher::record(
            &mut tx,
            account_id,
            NotificationKind::BalanceAdjusted,
            "Balance updated",
            &message,
            Some(amount),
        )
        .await?;
        tx.commit().await?;

        info!(
            account_id,
            admin_id,
            kind = %kind,
            amount = %amount,
            balance = %balance,
            "Balance adjusted"
        );
        self.bus.publish_all(entry_events(&entry));
        self.notifier.deliver(std::slice::from_ref(&notification)).await;
        Ok(entry)
    }

    /// Cached balance; kept equal to the ledger sum by every append
    pub async fn get_balance(&self, account_id: &str) -> WorkflowResult<Decimal> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(AccountRepo::cached_balance(&mut conn, account_id).await?)
    }

    /// Whether the cached balance matches the ledger
    pub async fn verify(&self, account_id: &str) -> WorkflowResult<bool> {
        let mut conn = self.db.pool().acquire().await?;
        let cached = AccountRepo::cached_balance(&mut conn, account_id).await?;
        let ledger = LedgerRepo::sum_balance(&mut conn, account_id).await?;
        if cached != ledger {
            warn!(account_id, %cached, %ledger, "Balance cache out of step with ledger");
        }
        Ok(cached == ledger)
    }
}
