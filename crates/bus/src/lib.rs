//! TaskPay Change Bus - In-process change feed
//!
//! Every committed write publishes a [`ChangeEvent`]. Listings that want to
//! stay live subscribe with a [`ChangeFilter`] and re-query on each event.
//!
//! - Async pub/sub over a tokio broadcast channel
//! - Filtered streams per collection and account
//! - [`ChangeSubscriber`] trait for background handlers
//! - No retention: the store is the source of truth, the bus only signals

pub mod channel;
pub mod error;
pub mod event;
pub mod subscriber;

pub use channel::{ChangeBus, ChangeStream};
pub use error::BusError;
pub use event::{ChangeEvent, ChangeFilter, ChangeOp, Collection};
pub use subscriber::ChangeSubscriber;
