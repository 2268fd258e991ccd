//! Queue transfer: ordered, reliable, store-and-forward payloads.
//!
//! Queued items survive disconnection and are delivered strictly in send
//! order, even when the peer is offline at send time. Delivery may complete
//! long after the call returns, including after a sender-side restart.

use std::sync::Arc;

use crate::channel::{Channel, Payload, TransferHandle, TransferId};
use crate::gate::AvailabilityGate;
use crate::session::{register_completion, CompletionRegistry};

/// Sender side of the queued payload primitive.
#[derive(Clone)]
pub struct QueueTransfer {
    channel: Option<Arc<dyn Channel>>,
    gate: AvailabilityGate,
    completions: CompletionRegistry,
}

impl QueueTransfer {
    pub(crate) fn new(
        channel: Option<Arc<dyn Channel>>,
        gate: AvailabilityGate,
        completions: CompletionRegistry,
    ) -> Self {
        Self {
            channel,
            gate,
            completions,
        }
    }

    /// Queue `item` for ordered delivery to the peer.
    ///
    /// Returns `None` when the channel is not usable. The returned handle
    /// may be dropped without observing completion; the transfer proceeds
    /// regardless.
    #[must_use]
    pub fn enqueue(&self, item: Payload) -> Option<TransferHandle> {
        if !self.gate.is_usable() {
            tracing::debug!("queue transfer skipped: channel not usable");
            return None;
        }
        let channel = self.channel.as_ref()?;
        // Register before sending: completion may arrive immediately.
        let id = TransferId::new();
        let handle = register_completion(&self.completions, id);
        channel.queue_payload(id, item);
        tracing::debug!("queued payload transfer {id}");
        Some(handle)
    }
}
