//! The underlying transport seam between paired endpoints.
//!
//! A [`Channel`] is the single bidirectional connection object a process
//! holds to its paired peer. The session manager owns exactly one handle for
//! the process lifetime and never recreates it; on platforms without channel
//! support there is no handle at all and every transport degrades to a no-op.
//!
//! Platform transports implement [`Channel`]; the in-memory [`loopback`]
//! implementation pairs two endpoints inside one process and serves as the
//! reference transport.
//!
//! ## Delivery contracts
//!
//! | Primitive | Ordering | Availability |
//! |-----------|----------|--------------|
//! | [`Channel::update_context`] | latest value wins | usable |
//! | [`Channel::queue_payload`] | strict FIFO, survives offline peers | usable |
//! | [`Channel::send_file`] | none | usable |
//! | [`Channel::send_request`] | none | live only |

pub mod loopback;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A keyed payload: string keys mapped to arbitrary serializable values.
pub type Payload = HashMap<String, serde_json::Value>;

/// Activation progress of a channel endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Activation has not been requested
    NotActivated,
    /// Activation is in flight
    Activating,
    /// The endpoint is activated
    Activated,
}

/// A point-in-time snapshot of channel facts.
///
/// Availability is never cached: pairing and reachability change outside the
/// core's control, so callers re-read the status on every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Activation progress of this endpoint
    pub activation: ActivationState,
    /// Whether the peer device is paired
    pub paired: bool,
    /// Whether the companion application is installed on the peer
    pub companion_installed: bool,
    /// Whether the peer process is currently reachable for live messaging
    pub reachable: bool,
}

/// Opaque identifier correlating a send with its eventual completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Allocate a fresh transfer id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Body of an interactive message: a keyed mapping or raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Keyed payload body
    Map(Payload),
    /// Opaque binary body
    Raw(Vec<u8>),
}

/// One-shot reply side of an interactive message.
///
/// Consuming methods guarantee the exactly-once, exactly-one-of-{reply,
/// failure} contract: a responder can only ever be used once.
pub struct Responder {
    tx: oneshot::Sender<Result<MessageBody>>,
}

impl Responder {
    /// Answer the request.
    pub fn reply(self, body: MessageBody) {
        let _ = self.tx.send(Ok(body));
    }

    /// Fail the request.
    pub fn fail(self, error: Error) {
        let _ = self.tx.send(Err(error));
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").finish_non_exhaustive()
    }
}

/// Pending outcome of an interactive send.
///
/// Resolves exactly once, to either the peer's reply or a failure. The core
/// imposes no timeout of its own; callers needing bounded waits wrap this in
/// their own timeout.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<MessageBody>>,
}

impl PendingReply {
    /// Wait for the reply or failure.
    pub async fn await_reply(self) -> Result<MessageBody> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ReplyDropped),
        }
    }
}

/// Create a linked responder/reply pair for one interactive message.
#[must_use]
pub fn reply_channel() -> (Responder, PendingReply) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx }, PendingReply { rx })
}

/// Sender-side handle for a queued or file transfer.
///
/// Dropping the handle without awaiting [`TransferHandle::finished`] is
/// explicitly supported: the sender may choose not to observe completion.
#[derive(Debug)]
pub struct TransferHandle {
    id: TransferId,
    completion: oneshot::Receiver<Option<String>>,
}

impl TransferHandle {
    pub(crate) fn new(id: TransferId, completion: oneshot::Receiver<Option<String>>) -> Self {
        Self { id, completion }
    }

    /// The transfer's id.
    #[must_use]
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Wait for the transfer's terminal outcome.
    ///
    /// Delivery may complete long after the send call returned; this future
    /// resolves whenever the transport reports the outcome.
    pub async fn finished(self) -> Result<()> {
        match self.completion.await {
            Ok(None) => Ok(()),
            Ok(Some(reason)) => Err(Error::TransferFailed(reason)),
            Err(_) => Err(Error::ChannelClosed),
        }
    }
}

/// Inbound event delivered by a channel to its event sink.
///
/// All events arrive from background execution contexts managed by the
/// transport, concurrently with application-issued sends.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Activation finished, successfully or not
    ActivationCompleted {
        /// Resulting activation state
        state: ActivationState,
        /// Failure detail, if activation did not complete
        error: Option<String>,
    },
    /// The channel is transitioning away from the current peer
    BecameInactive,
    /// All callbacks for the previous peer have been delivered
    Deactivated,
    /// A new context blob arrived (latest value wins)
    ContextReceived(Payload),
    /// A queued payload arrived, in sender FIFO order
    QueueItemReceived(Payload),
    /// A file arrived and was spooled to a temporary location.
    ///
    /// The temporary file is only valid for the duration of the receipt
    /// handling; persistence must happen before the sink moves on.
    FileReceived {
        /// Spooled location of the received bytes
        temp_path: PathBuf,
        /// Metadata attached by the sender
        metadata: Payload,
    },
    /// An interactive message arrived and expects exactly one reply
    RequestReceived {
        /// The message body
        body: MessageBody,
        /// Reply slot, consumed exactly once
        responder: Responder,
    },
    /// A queued or file transfer reached its terminal outcome
    TransferFinished {
        /// The transfer this outcome belongs to
        id: TransferId,
        /// Failure detail, if delivery failed
        error: Option<String>,
    },
}

/// The underlying bidirectional connection between two paired endpoints.
///
/// Implementations never block in the send primitives; outcomes are reported
/// through [`ChannelEvent`]s on the event stream.
pub trait Channel: Send + Sync {
    /// Read the current channel facts. Evaluated fresh on every call.
    fn status(&self) -> ChannelStatus;

    /// Begin activation. Completion is reported via
    /// [`ChannelEvent::ActivationCompleted`]; failures are never retried by
    /// the channel itself.
    fn activate(&self);

    /// Replace the peer's current context with `payload`.
    ///
    /// Only the most recent value is guaranteed to survive if multiple
    /// updates race before delivery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActivated`] when activation has not completed, or
    /// a transport rejection.
    fn update_context(&self, payload: Payload) -> Result<()>;

    /// Queue `payload` for ordered store-and-forward delivery, correlated
    /// with the caller-allocated `id`.
    ///
    /// Never fails synchronously; delivery may complete long after this call
    /// returns, including after a sender-side restart. The terminal outcome
    /// arrives as [`ChannelEvent::TransferFinished`] carrying the same `id`.
    fn queue_payload(&self, id: TransferId, payload: Payload);

    /// Schedule a binary file transfer with attached metadata, correlated
    /// with the caller-allocated `id`.
    ///
    /// Never fails synchronously; read or delivery failures surface through
    /// [`ChannelEvent::TransferFinished`].
    fn send_file(&self, id: TransferId, source: &Path, metadata: Payload);

    /// Send an interactive message to the peer.
    ///
    /// The returned [`PendingReply`] resolves exactly once; if the peer is
    /// not reachable it resolves to [`Error::PeerUnreachable`].
    fn send_request(&self, body: MessageBody) -> PendingReply;

    /// Take the inbound event stream.
    ///
    /// The stream can be taken exactly once; the session manager claims it in
    /// `start()`. Subsequent calls return `None`.
    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChannelEvent>>;
}
