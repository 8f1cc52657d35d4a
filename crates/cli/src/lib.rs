//! TaskPay CLI - context wiring and command handlers
//!
//! This crate provides the `taskpay` binary and the commands behind it.

pub mod commands;
pub mod context;

pub use context::AppContext;
