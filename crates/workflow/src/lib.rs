//! # TaskPay Workflow
//!
//! Balance ledger and review workflow for a micro-task site.
//!
//! ## Flow
//! - A user creates a [`Submission`](taskpay_core::Submission) (task proof,
//!   manual claim, or withdrawal request) through [`SubmissionService`]
//! - An admin approves or rejects it through [`ReviewProcessor`]; status
//!   change, ledger entry and notification commit as one transaction
//! - [`NotificationDispatcher`] records the outcome for the owner and tries
//!   a push
//!
//! ## Money
//! - The ledger is the source of truth; `Account::balance` is a cache
//!   rewritten with every append ([`LedgerService::rebuild_balances`]
//!   repairs drift)
//! - Withdrawals are held (debited) at request time, refunded on rejection

mod accounts;
mod balance;
mod config;
mod error;
mod ledger;
mod notify;
mod review;
mod services;
mod submission;
mod tasks;

pub use accounts::{AccountService, IdentityProvider, StaticIdentity};
pub use balance::BalanceService;
pub use config::WorkflowConfig;
pub use error::{WorkflowError, WorkflowResult};
pub use ledger::LedgerService;
pub use notify::{DisabledPush, LoggingPush, NotificationDispatcher, PushChannel, PushError};
pub use review::{ReviewOutcome, ReviewProcessor};
pub use services::Services;
pub use submission::{NewSubmission, SubmissionFilter, SubmissionService};
pub use tasks::{NewTask, TaskService};
