//! Application context - wires store, bus, config and services together

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskpay_bus::ChangeBus;
use taskpay_core::Account;
use taskpay_store::{Database, StoreConfig};
use taskpay_workflow::{
    AccountService, IdentityProvider, LoggingPush, Services, StaticIdentity, WorkflowConfig,
};
use tracing::{debug, info};

/// Env var naming a config file, overriding `<data>/config.json`
pub const CONFIG_ENV: &str = "TASKPAY_CONFIG";

/// Everything one CLI invocation needs
pub struct AppContext {
    pub services: Services,
    identity: StaticIdentity,
    data_path: PathBuf,
    db_path: PathBuf,
}

impl AppContext {
    /// Open (or create) the data directory and its database
    pub async fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_path)
            .with_context(|| format!("creating data directory {}", data_path.display()))?;

        let config = load_config(&data_path)?;
        let db_path = data_path.join("taskpay.db");
        let db = Database::connect(&StoreConfig::at_path(&db_path)).await?;

        info!(data = %data_path.display(), "Context ready");
        Ok(Self {
            services: Services::new(db, ChangeBus::new(), config, Arc::new(LoggingPush)),
            identity: StaticIdentity::anonymous(),
            data_path,
            db_path,
        })
    }

    /// Act as `account_id` for the rest of this invocation
    pub fn sign_in(&mut self, account_id: impl Into<String>) {
        self.identity = StaticIdentity::signed_in(account_id);
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        &self.identity
    }

    /// The signed-in account; `PermissionDenied` when nobody is
    pub async fn actor(&self) -> Result<Account, anyhow::Error> {
        Ok(self.accounts().current_account(&self.identity).await?)
    }

    pub fn accounts(&self) -> &AccountService {
        &self.services.accounts
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub async fn close(self) {
        self.services.db.close().await;
    }
}

fn load_config(data_path: &Path) -> Result<WorkflowConfig, anyhow::Error> {
    let path = match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => data_path.join("config.json"),
    };

    if path.exists() {
        let config = WorkflowConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?;
        info!(path = %path.display(), "Loaded workflow config");
        Ok(config)
    } else {
        debug!(path = %path.display(), "No config file; using defaults");
        Ok(WorkflowConfig::default())
    }
}
