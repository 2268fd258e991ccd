//! Availability gate: can the channel be used, and is the peer live?
//!
//! Every transport operation consults the gate before touching the channel.
//! Both predicates are pure queries evaluated fresh on each call — pairing
//! and reachability change at any time outside the core's control, so no
//! availability state is ever cached.

use std::sync::Arc;

use crate::channel::{ActivationState, Channel};
use crate::config::EndpointRole;

/// Computes channel availability on demand.
#[derive(Clone)]
pub struct AvailabilityGate {
    channel: Option<Arc<dyn Channel>>,
    role: EndpointRole,
}

impl AvailabilityGate {
    /// Create a gate over the process's channel handle.
    #[must_use]
    pub fn new(channel: Option<Arc<dyn Channel>>, role: EndpointRole) -> Self {
        Self { channel, role }
    }

    /// True iff a usable channel currently exists.
    ///
    /// The primary endpoint requires the peer to be paired and the companion
    /// application installed; the companion endpoint requires completed
    /// activation.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };
        let status = channel.status();
        match self.role {
            EndpointRole::Primary => status.paired && status.companion_installed,
            EndpointRole::Companion => status.activation == ActivationState::Activated,
        }
    }

    /// True iff the channel is usable and the peer is currently reachable
    /// for synchronous messaging.
    #[must_use]
    pub fn is_live(&self) -> bool {
        if !self.is_usable() {
            return false;
        }
        // is_usable already established the handle exists
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.status().reachable)
    }
}
