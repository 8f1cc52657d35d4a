//! TaskPay Core - Domain types
//!
//! This crate contains the fundamental types used across TaskPay:
//! - `Amount`: Non-negative, cent-precision decimal for balances and rewards
//! - `Account`, `Role`, `AccountStatus`, `Badge`: who works and who reviews
//! - `Task`: admin-authored catalog entry with a worker limit
//! - `Submission`: task / manual / withdrawal request under review
//! - `Notification`: message to a single account

pub mod account;
pub mod amount;
pub mod id;
pub mod notification;
pub mod submission;
pub mod task;

pub use account::{Account, AccountStatus, Badge, Role, StatusTransitionError};
pub use amount::{Amount, AmountError};
pub use id::new_id;
pub use notification::{Notification, NotificationKind};
pub use submission::{Submission, SubmissionKind, SubmissionPayload, SubmissionStatus};
pub use task::Task;
