//! Task - admin-authored catalog entry that workers submit proof against

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Paid on approval of each submission
    pub reward: Amount,
    /// Maximum number of live (non-hidden) submissions
    pub worker_limit: u32,
    /// Live submissions currently holding a slot
    pub submitted_count: u32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn slots_left(&self) -> u32 {
        self.worker_limit.saturating_sub(self.submitted_count)
    }

    pub fn is_full(&self) -> bool {
        self.submitted_count >= self.worker_limit
    }
}
