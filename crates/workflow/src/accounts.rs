//! Account administration
//!
//! Registration, review status, bans and badges. Identity itself comes from
//! outside through [`IdentityProvider`].

use crate::error::{WorkflowError, WorkflowResult};
use crate::notify::NotificationDispatcher;
use taskpay_bus::{ChangeBus, ChangeEvent, Collection};
use taskpay_core::{new_id, Account, AccountStatus, Badge, NotificationKind, Role};
use taskpay_store::codec::now;
use taskpay_store::{AccountRepo, Database};
use tracing::{debug, info, warn};

/// Source of the signed-in account id
pub trait IdentityProvider: Send + Sync {
    fn current_account_id(&self) -> Option<String>;
}

/// Fixed identity, for the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn signed_in(account_id: impl Into<String>) -> Self {
        Self(Some(account_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_account_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Load `actor_id` and make sure it is an admin.
///
/// Runs on its own pooled connection, released before the caller opens a
/// transaction.
pub(crate) async fn require_admin(db: &Database, actor_id: &str) -> WorkflowResult<Account> {
    let mut conn = db.pool().acquire().await?;
    match AccountRepo::find(&mut conn, actor_id).await? {
        Some(account) if account.is_admin() => Ok(account),
        Some(_) => {
            warn!(actor_id, "Non-admin attempted an admin action");
            Err(WorkflowError::permission_denied(format!(
                "{} is not an admin",
                actor_id
            )))
        }
        None => Err(WorkflowError::permission_denied(format!(
            "unknown actor {}",
            actor_id
        ))),
    }
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    bus: ChangeBus,
    notifier: NotificationDispatcher,
}

impl AccountService {
    pub fn new(db: Database, bus: ChangeBus, notifier: NotificationDispatcher) -> Self {
        Self { db, bus, notifier }
    }

    /// Create a pending account with zero balance
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        role: Role,
    ) -> WorkflowResult<Account> {
        let display_name = display_name.trim();
        let email = email.trim().to_lowercase();
        if display_name.is_empty() {
            return Err(WorkflowError::validation("display name is required"));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(WorkflowError::validation(format!("invalid email {}", email)));
        }

        let mut account = Account::new(new_id("ACC"), display_name, &email, role);
        account.created_at = now();
        account.updated_at = account.created_at;

        let mut conn = self.db.pool().acquire().await?;
        if AccountRepo::find_by_email(&mut conn, &email).await?.is_some() {
            return Err(WorkflowError::conflict(format!("email already registered: {}", email)));
        }
        AccountRepo::insert(&mut conn, &account).await?;
        drop(conn);

        info!(account_id = %account.id, role = %role, "Account registered");
        self.bus.publish(ChangeEvent::created(
            Collection::Accounts,
            &account.id,
            Some(&account.id),
        ));
        Ok(account)
    }

    pub async fn get(&self, account_id: &str) -> WorkflowResult<Account> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(AccountRepo::get(&mut conn, account_id).await?)
    }

    pub async fn list(&self, role: Option<Role>) -> WorkflowResult<Vec<Account>> {
        let mut conn = self.db.pool().acquire().await?;
        let accounts = AccountRepo::list(&mut conn, role).await?;
        debug!(?role, count = accounts.len(), "Listed accounts");
        Ok(accounts)
    }

    /// The signed-in account
    pub async fn current_account(&self, identity: &dyn IdentityProvider) -> WorkflowResult<Account> {
        let account_id = identity
            .current_account_id()
            .ok_or_else(|| WorkflowError::permission_denied("not signed in"))?;
        self.get(&account_id).await
    }

    /// Move an account along the review status table.
    ///
    /// `Banned` goes through [`Self::ban`]; leaving `Banned` only through
    /// [`Self::unban`].
    pub async fn set_status(
        &self,
        admin_id: &str,
        account_id: &str,
        status: AccountStatus,
    ) -> WorkflowResult<Account> {
        if status == AccountStatus::Banned {
            return self.ban(admin_id, account_id).await;
        }
        require_admin(&self.db, admin_id).await?;

        self.change_status(account_id, |current| {
            if current.is_banned() {
                return Err(WorkflowError::conflict("account is banned; unban it first"));
            }
            current.check_transition(status)?;
            Ok((status, None))
        })
        .await
    }

    /// Lock an approved or rejected account, remembering where it was
    pub async fn ban(&self, admin_id: &str, account_id: &str) -> WorkflowResult<Account> {
        require_admin(&self.db, admin_id).await?;
        if admin_id == account_id {
            return Err(WorkflowError::validation("admins cannot ban themselves"));
        }

        self.change_status(account_id, |current| {
            current.check_transition(AccountStatus::Banned)?;
            Ok((AccountStatus::Banned, Some(current)))
        })
        .await
    }

    /// Lift a ban, restoring the status held before it
    pub async fn unban(&self, admin_id: &str, account_id: &str) -> WorkflowResult<Account> {
        require_admin(&self.db, admin_id).await?;

        let mut tx = self.db.begin().await?;
        AccountRepo::touch(&mut tx, account_id).await?;
        let account = AccountRepo::get(&mut tx, account_id).await?;
        if !account.status.is_banned() {
            return Err(WorkflowError::conflict(format!(
                "account {} is not banned",
                account_id
            )));
        }
        let target = AccountStatus::unban_target(account.status_before_ban);
        AccountRepo::set_status(&mut tx, account_id, target, None).await?;
        let notification = NotificationDispatcher::record(
            &mut tx,
            account_id,
            NotificationKind::AccountStatus,
            "Account restored",
            &format!("Your account ban was lifted. Status: {}.", target),
            None,
        )
        .await?;
        let account = AccountRepo::get(&mut tx, account_id).await?;
        tx.commit().await?;

        info!(account_id, admin_id, status = %target, "Account unbanned");
        self.after_status_change(&account, notification).await;
        Ok(account)
    }

    async fn change_status<F>(&self, account_id: &str, decide: F) -> WorkflowResult<Account>
    where
        F: FnOnce(AccountStatus) -> WorkflowResult<(AccountStatus, Option<AccountStatus>)>,
    {
        let mut tx = self.db.begin().await?;
        AccountRepo::touch(&mut tx, account_id).await?;
        let current = AccountRepo::get(&mut tx, account_id).await?.status;

        let (next, before_ban) = match decide(current) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(account_id, from = %current, error = %e, "Status change refused");
                return Err(e);
            }
        };
        AccountRepo::set_status(&mut tx, account_id, next, before_ban).await?;

        let (title, message) = match next {
            AccountStatus::Approved => ("Account approved", "Your account has been approved. You can start working now.".to_string()),
            AccountStatus::Rejected => ("Account rejected", "Your account was not approved.".to_string()),
            AccountStatus::Banned => ("Account banned", "Your account has been banned by an admin.".to_string()),
            AccountStatus::Pending => ("Account pending", "Your account is awaiting review.".to_string()),
        };
        let notification = NotificationDispatcher::record(
            &mut tx,
            account_id,
            NotificationKind::AccountStatus,
            title,
            &message,
            None,
        )
        .await?;
        let account = AccountRepo::get(&mut tx, account_id).await?;
        tx.commit().await?;

        info!(account_id, from = %current, to = %next, "Account status changed");
        self.after_status_change(&account, notification).await;
        Ok(account)
    }

    async fn after_status_change(&self, account: &Account, notification: taskpay_core::Notification) {
        self.bus.publish(ChangeEvent::updated(
            Collection::Accounts,
            &account.id,
            Some(&account.id),
        ));
        self.notifier.deliver(std::slice::from_ref(&notification)).await;
    }

    pub async fn set_badge(
        &self,
        admin_id: &str,
        account_id: &str,
        badge: Badge,
    ) -> WorkflowResult<Account> {
        require_admin(&self.db, admin_id).await?;

        let mut tx = self.db.begin().await?;
        AccountRepo::set_badge(&mut tx, account_id, badge).await?;
        let message = match badge {
            Badge::None => "Your badge was removed.".to_string(),
            badge => format!("You were awarded the {} badge.", badge),
        };
        let notification = NotificationDispatcher::record(
            &mut tx,
            account_id,
            NotificationKind::BadgeChanged,
            "Badge updated",
            &message,
            None,
        )
        .await?;
        let account = AccountRepo::get(&mut tx, account_id).await?;
        tx.commit().await?;

        info!(account_id, admin_id, badge = %badge, "Badge changed");
        self.after_status_change(&account, notification).await;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DisabledPush;
    use std::sync::Arc;
    use taskpay_store::StoreConfig;

    async fn setup() -> (AccountService, NotificationDispatcher, Account) {
        let db = Database::connect(&StoreConfig::in_memory()).await.unwrap();
        let bus = ChangeBus::new();
        let notifier = NotificationDispatcher::new(db.clone(), bus.clone(), Arc::new(DisabledPush), false);
        let service = AccountService::new(db, bus, notifier.clone());
        let admin = service.register("Admin", "admin@example.com", Role::Admin).await.unwrap();
        (service, notifier, admin)
    }

    #[tokio::test]
    async fn test_register_defaults_and_duplicates() {
        let (service, _, _) = setup().await;
        let account = service.register(" Karim ", "Karim@Example.com", Role::User).await.unwrap();
        assert_eq!(account.display_name, "Karim");
        assert_eq!(account.email, "karim@example.com");
        assert_eq!(account.status, AccountStatus::Pending);
        assert_eq!(account.badge, Badge::None);

        let dup = service.register("Other", "KARIM@example.com", Role::User).await.unwrap_err();
        assert!(dup.is_conflict());

        let bad = service.register("x", "not-an-email", Role::User).await.unwrap_err();
        assert!(matches!(bad, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_table() {
        let (service, notifier, admin) = setup().await;
        let user = service.register("U", "u@example.com", Role::User).await.unwrap();

        let rejected = service.set_status(&admin.id, &user.id, AccountStatus::Rejected).await.unwrap();
        assert_eq!(rejected.status, AccountStatus::Rejected);

        // Reconsideration
        let approved = service.set_status(&admin.id, &user.id, AccountStatus::Approved).await.unwrap();
        assert_eq!(approved.status, AccountStatus::Approved);

        // No way back to pending
        let err = service.set_status(&admin.id, &user.id, AccountStatus::Pending).await.unwrap_err();
        assert!(err.is_conflict());

        assert_eq!(notifier.unread_count(&user.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ban_toggle_restores_previous_status() {
        let (service, _, admin) = setup().await;
        let user = service.register("U", "u@example.com", Role::User).await.unwrap();

        // Pending accounts cannot be banned
        assert!(service.ban(&admin.id, &user.id).await.unwrap_err().is_conflict());

        service.set_status(&admin.id, &user.id, AccountStatus::Rejected).await.unwrap();
        let banned = service.set_status(&admin.id, &user.id, AccountStatus::Banned).await.unwrap();
        assert_eq!(banned.status, AccountStatus::Banned);
        assert_eq!(banned.status_before_ban, Some(AccountStatus::Rejected));

        let err = service.set_status(&admin.id, &user.id, AccountStatus::Approved).await.unwrap_err();
        assert!(err.is_conflict());

        let restored = service.unban(&admin.id, &user.id).await.unwrap();
        assert_eq!(restored.status, AccountStatus::Rejected);
        assert_eq!(restored.status_before_ban, None);

        assert!(service.unban(&admin.id, &user.id).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_only_admins_administer() {
        let (service, _, _) = setup().await;
        let user = service.register("U", "u@example.com", Role::User).await.unwrap();
        let other = service.register("V", "v@example.com", Role::User).await.unwrap();

        let err = service.set_badge(&user.id, &other.id, Badge::Vip).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_badge_and_current_account() {
        let (service, notifier, admin) = setup().await;
        let user = service.register("U", "u@example.com", Role::User).await.unwrap();

        let updated = service.set_badge(&admin.id, &user.id, Badge::Premium).await.unwrap();
        assert_eq!(updated.badge, Badge::Premium);
        let notes = notifier.list_for_account(&user.id, true).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::BadgeChanged);

        let me = service.current_account(&StaticIdentity::signed_in(&user.id)).await.unwrap();
        assert_eq!(me.id, user.id);
        let err = service.current_account(&StaticIdentity::anonymous()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
    }
}
