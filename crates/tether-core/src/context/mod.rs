//! Context sync: latest-value-wins state propagation.
//!
//! A context push replaces the peer's whole current state. If several pushes
//! race before delivery, only the newest survives — intermediate values may
//! be coalesced or dropped by the transport, and that is accepted rather
//! than worked around.

use std::sync::Arc;

use crate::channel::{Channel, Payload};
use crate::error::Result;
use crate::gate::AvailabilityGate;

/// Sender side of the context sync primitive.
#[derive(Clone)]
pub struct ContextSync {
    channel: Option<Arc<dyn Channel>>,
    gate: AvailabilityGate,
}

impl ContextSync {
    pub(crate) fn new(channel: Option<Arc<dyn Channel>>, gate: AvailabilityGate) -> Self {
        Self { channel, gate }
    }

    /// Replace the peer's current context with `context`.
    ///
    /// A silent no-op while the channel is not usable. A transport rejection
    /// (for example a push before activation completes) is returned to the
    /// caller, who decides whether to treat it as fatal.
    ///
    /// # Errors
    ///
    /// Returns the transport's rejection, if any.
    pub fn publish(&self, context: Payload) -> Result<()> {
        if !self.gate.is_usable() {
            tracing::debug!("context push skipped: channel not usable");
            return Ok(());
        }
        let Some(channel) = self.channel.as_ref() else {
            return Ok(());
        };
        channel.update_context(context)
    }
}
