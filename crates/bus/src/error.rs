//! Change bus errors

use thiserror::Error;

/// Errors that can occur on the change bus
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Subscriber '{name}' failed: {reason}")]
    SubscriberFailed { name: String, reason: String },

    #[error("Channel closed")]
    ChannelClosed,
}
