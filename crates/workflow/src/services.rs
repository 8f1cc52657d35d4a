//! Service bundle wired over one database and one change bus

use crate::accounts::AccountService;
use crate::balance::BalanceService;
use crate::config::WorkflowConfig;
use crate::error::WorkflowResult;
use crate::ledger::LedgerService;
use crate::notify::{DisabledPush, NotificationDispatcher, PushChannel};
use crate::review::ReviewProcessor;
use crate::submission::SubmissionService;
use crate::tasks::TaskService;
use std::sync::Arc;
use taskpay_bus::ChangeBus;
use taskpay_store::{Database, StoreConfig};

/// Every workflow service, sharing a store, bus and config
#[derive(Clone)]
pub struct Services {
    pub db: Database,
    pub bus: ChangeBus,
    pub config: Arc<WorkflowConfig>,
    pub accounts: AccountService,
    pub tasks: TaskService,
    pub ledger: LedgerService,
    pub balances: BalanceService,
    pub submissions: SubmissionService,
    pub reviews: ReviewProcessor,
    pub notifications: NotificationDispatcher,
}

impl Services {
    pub fn new(
        db: Database,
        bus: ChangeBus,
        config: WorkflowConfig,
        push: Arc<dyn PushChannel>,
    ) -> Self {
        let config = Arc::new(config);
        let notifications =
            NotificationDispatcher::new(db.clone(), bus.clone(), push, config.push_enabled);

        Self {
            accounts: AccountService::new(db.clone(), bus.clone(), notifications.clone()),
            tasks: TaskService::new(db.clone(), bus.clone()),
            ledger: LedgerService::new(db.clone(), bus.clone()),
            balances: BalanceService::new(db.clone(), bus.clone(), notifications.clone()),
            submissions: SubmissionService::new(
                db.clone(),
                bus.clone(),
                notifications.clone(),
                config.clone(),
            ),
            reviews: ReviewProcessor::new(db.clone(), bus.clone(), notifications.clone()),
            notifications,
            db,
            bus,
            config,
        }
    }

    /// Fresh in-memory store with push disabled
    pub async fn in_memory(config: WorkflowConfig) -> WorkflowResult<Self> {
        let db = Database::connect(&StoreConfig::in_memory()).await?;
        Ok(Self::new(db, ChangeBus::new(), config, Arc::new(DisabledPush)))
    }
}
