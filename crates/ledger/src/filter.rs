//! Listing filters for ledger history

use crate::entry::LedgerEntry;
use chrono::{DateTime, Utc};

/// Who is looking at a history listing.
///
/// Owners never see rows they hid; admins see everything, with the
/// `hidden_by_user` flag left on the row so it can be marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Owner,
    Admin,
}

/// Date range and free-text filter over ledger entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring of `description`
    pub search: Option<String>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    /// Check a single entry against the filter and viewer
    pub fn matches(&self, entry: &LedgerEntry, viewer: Viewer) -> bool {
        if viewer == Viewer::Owner && entry.hidden_by_user {
            return false;
        }
        if self.from.is_some_and(|from| entry.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry.created_at > to) {
            return false;
        }
        match &self.search {
            Some(text) => entry
                .description
                .to_lowercase()
                .contains(&text.trim().to_lowercase()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LedgerEntryDraft, LedgerKind};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn entry(description: &str, hidden: bool) -> LedgerEntry {
        let mut e = LedgerEntryDraft::new("ACC-1", LedgerKind::Credit, dec!(10), description)
            .unwrap()
            .commit("LED-1", Utc::now());
        e.hidden_by_user = hidden;
        e
    }

    #[test]
    fn test_owner_does_not_see_hidden() {
        let e = entry("Bonus", true);
        assert!(!EntryFilter::new().matches(&e, Viewer::Owner));
        assert!(EntryFilter::new().matches(&e, Viewer::Admin));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let e = entry("Task reward: Follow page", false);
        assert!(EntryFilter::new().search("FOLLOW").matches(&e, Viewer::Owner));
        assert!(!EntryFilter::new().search("refund").matches(&e, Viewer::Owner));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert_eq!(EntryFilter::new().search("   ").search, None);
    }

    #[test]
    fn test_date_range() {
        let e = entry("x", false);
        let before = e.created_at - Duration::hours(1);
        let after = e.created_at + Duration::hours(1);
        assert!(EntryFilter::new().from(before).to(after).matches(&e, Viewer::Owner));
        assert!(!EntryFilter::new().from(after).matches(&e, Viewer::Owner));
        assert!(!EntryFilter::new().to(before).matches(&e, Viewer::Owner));
    }
}
