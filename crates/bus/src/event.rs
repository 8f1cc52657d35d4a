//! Change events for pub/sub distribution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Store collection a change happened in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Accounts,
    Tasks,
    Submissions,
    LedgerEntries,
    Notifications,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

/// A committed change to one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub op: ChangeOp,
    /// Id of the changed document
    pub id: String,
    /// Account the document belongs to, when it has an owner
    pub account_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        collection: Collection,
        op: ChangeOp,
        id: impl Into<String>,
        account_id: Option<&str>,
    ) -> Self {
        Self {
            collection,
            op,
            id: id.into(),
            account_id: account_id.map(str::to_string),
            at: Utc::now(),
        }
    }

    pub fn created(collection: Collection, id: impl Into<String>, account_id: Option<&str>) -> Self {
        Self::new(collection, ChangeOp::Created, id, account_id)
    }

    pub fn updated(collection: Collection, id: impl Into<String>, account_id: Option<&str>) -> Self {
        Self::new(collection, ChangeOp::Updated, id, account_id)
    }

    pub fn deleted(collection: Collection, id: impl Into<String>, account_id: Option<&str>) -> Self {
        Self::new(collection, ChangeOp::Deleted, id, account_id)
    }
}

/// Which events a subscriber wants. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    pub collection: Option<Collection>,
    pub account_id: Option<String>,
}

impl ChangeFilter {
    /// Match every event
    pub fn all() -> Self {
        Self::default()
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if self.collection.is_some_and(|c| c != event.collection) {
            return false;
        }
        match &self.account_id {
            Some(account_id) => event.account_id.as_deref() == Some(account_id.as_str()),
            None => true,
        }
    }
}
