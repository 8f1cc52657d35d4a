//! Change subscriber trait for background handlers

use crate::error::BusError;
use crate::event::ChangeEvent;
use async_trait::async_trait;

/// A handler fed by [`crate::ChangeBus::spawn_subscriber`].
///
/// Events are signals, not payloads: handlers re-read the store if they need
/// the document. A failing handler is logged and keeps receiving events.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    /// Subscriber name (for logging)
    fn name(&self) -> &str;

    async fn handle(&self, event: &ChangeEvent) -> Result<(), BusError>;
}
