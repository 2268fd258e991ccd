//! Typed event bus handing finished results to consumer code.
//!
//! The core publishes here after it has fully processed an inbound delivery:
//! a received file is persisted before its event appears, a context or queue
//! item is complete when published. Consumers subscribe and react; they never
//! poll the shared storage speculatively.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::channel::Payload;

/// A file receipt that has been persisted into shared storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFile {
    /// Destination the file was persisted to
    pub path: PathBuf,
    /// Category extracted from the sender's metadata
    pub category: String,
    /// The full metadata mapping the sender attached
    pub metadata: Payload,
    /// When the receipt was persisted
    pub received_at: DateTime<Utc>,
}

/// Events published by the session core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A file was received and persisted
    IncomingFile(IncomingFile),
    /// A new context blob arrived (latest value wins)
    ContextReceived {
        /// The replacing context
        context: Payload,
    },
    /// A queued payload arrived, in sender FIFO order
    QueueItemReceived {
        /// The delivered payload
        item: Payload,
    },
}

/// Process-wide publish point for session results.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a bus with the given broadcast capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to session events.
    ///
    /// Slow subscribers lag rather than block the publisher.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("session event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_subscribe_round_trip() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        let mut item = Payload::new();
        item.insert("id".to_string(), json!(7));
        bus.publish(SessionEvent::QueueItemReceived { item });

        match rx.recv().await.expect("event") {
            SessionEvent::QueueItemReceived { item } => {
                assert_eq!(item.get("id"), Some(&json!(7)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(SessionEvent::ContextReceived {
            context: Payload::new(),
        });
    }
}
