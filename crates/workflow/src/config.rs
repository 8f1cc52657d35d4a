//! Workflow configuration
//!
//! Defaults match the production site; a JSON file may override any subset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Business rules for submissions and notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Smallest withdrawal a user may request
    #[serde(default = "default_minimum_withdrawal")]
    pub minimum_withdrawal: Decimal,

    /// Accepted payout channels (matched case-insensitively)
    #[serde(default = "default_payout_methods")]
    pub payout_methods: Vec<String>,

    /// Upper bound on proof images per submission
    #[serde(default = "default_max_proof_images")]
    pub max_proof_images: usize,

    /// Fan out a notification to every admin when a user submits
    #[serde(default = "default_true")]
    pub notify_admins_on_submission: bool,

    /// Attempt push delivery after writing a notification
    #[serde(default = "default_true")]
    pub push_enabled: bool,
}

fn default_minimum_withdrawal() -> Decimal {
    Decimal::new(100, 0)
}

fn default_payout_methods() -> Vec<String> {
    ["Bkash", "Nagad", "Rocket", "Bank"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_max_proof_images() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            minimum_withdrawal: default_minimum_withdrawal(),
            payout_methods: default_payout_methods(),
            max_proof_images: default_max_proof_images(),
            notify_admins_on_submission: true,
            push_enabled: true,
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// The configured spelling of a payout method, if it is accepted
    pub fn payout_method(&self, method: &str) -> Option<&str> {
        let method = method.trim();
        self.payout_methods
            .iter()
            .find(|m| m.eq_ignore_ascii_case(method))
            .map(String::as_str)
    }
}
