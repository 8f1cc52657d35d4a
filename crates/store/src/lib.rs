//! # TaskPay Store
//!
//! SQLite document store for TaskPay, accessed through sqlx.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Database                           │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐  │
//! │  │ SqlitePool  │    │   schema    │    │    Repos     │  │
//! │  │ (tx scope)  │    │ (rows, DDL) │    │  (queries)   │  │
//! │  └─────────────┘    └─────────────┘    └──────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taskpay_store::{Database, StoreConfig, SubmissionRepo};
//!
//! let db = Database::connect(&StoreConfig::in_memory()).await?;
//!
//! let mut tx = db.begin().await?;
//! let won = SubmissionRepo::review(&mut *tx, "SUB-1", SubmissionStatus::Approved, "ADM-1", None, &now()).await?;
//! tx.commit().await?;
//! ```

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod repos;
pub mod schema;

pub use config::StoreConfig;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use repos::{
    AccountRepo, LedgerRepo, NotificationRepo, SubmissionQuery, SubmissionRepo, TaskRepo,
};
pub use schema::{AccountRow, LedgerRow, NotificationRow, SubmissionRow, TaskRow};
