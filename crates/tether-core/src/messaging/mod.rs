//! Interactive messaging: live-only request/reply.
//!
//! This is the one primitive with no store-and-forward fallback: a send
//! while the peer is not live does nothing at all — no queue, no callback,
//! no error — since channel availability is expected to fluctuate normally
//! and live features simply degrade.
//!
//! Every message that does go out resolves exactly once, to either the
//! peer's reply or a failure. On the receiving side a [`RequestHandler`]
//! produces the reply; a message no handler accepts is answered with an
//! explicit failure so the sender's pending reply always resolves.

use std::sync::Arc;

use crate::channel::{Channel, MessageBody, Payload, PendingReply};
use crate::error::Result;
use crate::gate::AvailabilityGate;

/// Receiving side of the interactive primitive.
///
/// The handler runs on the session's inbound pump; it must produce its reply
/// (or failure) before returning. Returning an error fails the request
/// explicitly rather than leaving the sender waiting.
pub trait RequestHandler: Send + Sync {
    /// Handle one inbound message and produce the reply body.
    fn handle(&self, body: MessageBody) -> Result<MessageBody>;
}

/// Sender side of the interactive primitive.
#[derive(Clone)]
pub struct InteractiveChannel {
    channel: Option<Arc<dyn Channel>>,
    gate: AvailabilityGate,
}

impl InteractiveChannel {
    pub(crate) fn new(channel: Option<Arc<dyn Channel>>, gate: AvailabilityGate) -> Self {
        Self { channel, gate }
    }

    /// Send a keyed message to the live peer.
    ///
    /// Returns `None` — with nothing sent and no callback ever fired — when
    /// the peer is not live.
    #[must_use]
    pub fn send(&self, message: Payload) -> Option<PendingReply> {
        self.dispatch(MessageBody::Map(message))
    }

    /// Send an opaque binary message to the live peer.
    ///
    /// Same contract as [`InteractiveChannel::send`].
    #[must_use]
    pub fn send_raw(&self, data: Vec<u8>) -> Option<PendingReply> {
        self.dispatch(MessageBody::Raw(data))
    }

    fn dispatch(&self, body: MessageBody) -> Option<PendingReply> {
        if !self.gate.is_live() {
            tracing::debug!("interactive send skipped: peer not live");
            return None;
        }
        let channel = self.channel.as_ref()?;
        Some(channel.send_request(body))
    }
}
