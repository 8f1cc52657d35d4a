//! In-process change bus
//!
//! Publishing never blocks and never fails: with no subscribers the event is
//! dropped. A subscriber that falls more than the buffer behind skips what
//! it missed and carries on.

use crate::error::BusError;
use crate::event::{ChangeEvent, ChangeFilter};
use crate::subscriber::ChangeSubscriber;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const DEFAULT_BUFFER: usize = 256;

/// Broadcasts committed changes to filtered subscribers
#[derive(Debug, Clone)]
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change to every current subscriber
    pub fn publish(&self, event: ChangeEvent) {
        let collection = event.collection;
        let op = event.op;
        match self.sender.send(event) {
            Ok(subscribers) => {
                debug!(%collection, %op, subscribers, "Change published");
            }
            Err(_) => {
                debug!(%collection, %op, "Change published but no subscribers listening");
            }
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Stream of future events matching `filter`
    pub fn subscribe(&self, filter: ChangeFilter) -> ChangeStream {
        ChangeStream {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Run `subscriber` on a background task until the bus is dropped
    pub fn spawn_subscriber(
        &self,
        filter: ChangeFilter,
        subscriber: Arc<dyn ChangeSubscriber>,
    ) -> JoinHandle<()> {
        let mut stream = self.subscribe(filter);
        tokio::spawn(async move {
            while let Ok(event) = stream.next().await {
                if let Err(e) = subscriber.handle(&event).await {
                    warn!(subscriber = subscriber.name(), error = %e, "Subscriber failed");
                }
            }
            debug!(subscriber = subscriber.name(), "Subscriber stopped");
        })
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A filtered view of the bus
pub struct ChangeStream {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl ChangeStream {
    /// Wait for the next matching event.
    ///
    /// Returns `ChannelClosed` once every `ChangeBus` handle is dropped.
    pub async fn next(&mut self) -> Result<ChangeEvent, BusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change stream lagged; skipping missed events");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::ChannelClosed),
            }
        }
    }

    /// Next matching event if one is already buffered
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change stream lagged; skipping missed events");
                }
                Err(_) => return None,
            }
        }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }
}
