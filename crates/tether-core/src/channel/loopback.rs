//! In-memory channel pairing two endpoints inside one process.
//!
//! The loopback channel is the reference [`Channel`] implementation and the
//! substrate for integration tests: it honors the same delivery contracts as
//! a platform transport (FIFO store-and-forward for queued payloads,
//! latest-value-wins context coalescing, live-only request/reply) while
//! exposing toggles for the facts a platform would own — pairing, companion
//! installation, and whether the peer process is running.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{
    reply_channel, ActivationState, Channel, ChannelEvent, ChannelStatus, MessageBody, Payload,
    PendingReply, TransferId,
};
use crate::error::{Error, Result};

/// A delivery parked while the receiving endpoint is offline.
enum Pending {
    Queue {
        id: TransferId,
        item: Payload,
        sender: mpsc::UnboundedSender<ChannelEvent>,
    },
    File {
        id: TransferId,
        source: PathBuf,
        metadata: Payload,
        sender: mpsc::UnboundedSender<ChannelEvent>,
    },
}

struct EndpointState {
    activation: ActivationState,
    paired: bool,
    companion_installed: bool,
    online: bool,
    events: mpsc::UnboundedSender<ChannelEvent>,
    inbox: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    /// Deliveries waiting for this endpoint to come online, in send order.
    pending: VecDeque<Pending>,
    /// Coalesced context: only the newest value survives an offline period.
    pending_context: Option<Payload>,
}

impl EndpointState {
    fn new() -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        Self {
            activation: ActivationState::NotActivated,
            paired: true,
            companion_installed: true,
            online: true,
            events,
            inbox: Some(inbox),
            pending: VecDeque::new(),
            pending_context: None,
        }
    }
}

/// One endpoint of an in-memory channel pair.
pub struct LoopbackChannel {
    local: Arc<Mutex<EndpointState>>,
    remote: Arc<Mutex<EndpointState>>,
    spool: PathBuf,
    label: &'static str,
}

impl LoopbackChannel {
    /// Create a linked pair of endpoints.
    ///
    /// `spool_dir` must be a writable directory shared by both endpoints;
    /// received files are materialized there before delivery.
    #[must_use]
    pub fn pair(spool_dir: &Path) -> (Arc<Self>, Arc<Self>) {
        let primary_state = Arc::new(Mutex::new(EndpointState::new()));
        let companion_state = Arc::new(Mutex::new(EndpointState::new()));

        let primary = Arc::new(Self {
            local: Arc::clone(&primary_state),
            remote: Arc::clone(&companion_state),
            spool: spool_dir.to_path_buf(),
            label: "primary",
        });
        let companion = Arc::new(Self {
            local: companion_state,
            remote: primary_state,
            spool: spool_dir.to_path_buf(),
            label: "companion",
        });
        (primary, companion)
    }

    /// Simulate the peer process starting or stopping on this endpoint.
    ///
    /// Coming online drains every parked delivery in send order, then the
    /// newest coalesced context value.
    pub fn set_online(&self, online: bool) {
        let drained = {
            let mut local = self.local.lock().unwrap();
            local.online = online;
            if online {
                Some((
                    std::mem::take(&mut local.pending),
                    local.pending_context.take(),
                    local.events.clone(),
                ))
            } else {
                None
            }
        };

        let Some((pending, context, events)) = drained else {
            return;
        };
        tracing::debug!(
            "{} endpoint online; draining {} parked deliveries",
            self.label,
            pending.len()
        );
        for entry in pending {
            match entry {
                Pending::Queue { id, item, sender } => {
                    let _ = events.send(ChannelEvent::QueueItemReceived(item));
                    let _ = sender.send(ChannelEvent::TransferFinished { id, error: None });
                }
                Pending::File {
                    id,
                    source,
                    metadata,
                    sender,
                } => self.deliver_file(id, &source, metadata, &events, &sender),
            }
        }
        if let Some(context) = context {
            let _ = events.send(ChannelEvent::ContextReceived(context));
        }
    }

    /// Simulate a pairing change on this endpoint.
    ///
    /// Breaking the pairing emits the became-inactive / deactivated
    /// lifecycle events, mirroring a platform switching peers.
    pub fn set_paired(&self, paired: bool) {
        let local = &mut *self.local.lock().unwrap();
        local.paired = paired;
        if !paired {
            let _ = local.events.send(ChannelEvent::BecameInactive);
            let _ = local.events.send(ChannelEvent::Deactivated);
        }
    }

    /// Simulate installing or removing the companion application.
    pub fn set_companion_installed(&self, installed: bool) {
        self.local.lock().unwrap().companion_installed = installed;
    }

    /// Materialize the file into the spool and deliver it, reporting the
    /// outcome to the sender either way.
    fn deliver_file(
        &self,
        id: TransferId,
        source: &Path,
        metadata: Payload,
        receiver: &mpsc::UnboundedSender<ChannelEvent>,
        sender: &mpsc::UnboundedSender<ChannelEvent>,
    ) {
        match self.spool_file(id, source) {
            Ok(temp_path) => {
                let _ = receiver.send(ChannelEvent::FileReceived {
                    temp_path,
                    metadata,
                });
                let _ = sender.send(ChannelEvent::TransferFinished { id, error: None });
            }
            Err(err) => {
                tracing::warn!("file transfer {id} failed on {}: {err}", self.label);
                let _ = sender.send(ChannelEvent::TransferFinished {
                    id,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    fn spool_file(&self, id: TransferId, source: &Path) -> io::Result<PathBuf> {
        let temp_path = self.spool.join(format!("incoming_{id}"));
        fs::copy(source, &temp_path)?;
        Ok(temp_path)
    }
}

impl Channel for LoopbackChannel {
    fn status(&self) -> ChannelStatus {
        let reachable = self.remote.lock().unwrap().online;
        let local = self.local.lock().unwrap();
        ChannelStatus {
            activation: local.activation,
            paired: local.paired,
            companion_installed: local.companion_installed,
            reachable,
        }
    }

    fn activate(&self) {
        let mut local = self.local.lock().unwrap();
        local.activation = ActivationState::Activated;
        let _ = local.events.send(ChannelEvent::ActivationCompleted {
            state: ActivationState::Activated,
            error: None,
        });
        tracing::debug!("{} endpoint activated", self.label);
    }

    fn update_context(&self, payload: Payload) -> Result<()> {
        if self.local.lock().unwrap().activation != ActivationState::Activated {
            return Err(Error::NotActivated);
        }

        let mut remote = self.remote.lock().unwrap();
        if remote.online {
            remote
                .events
                .send(ChannelEvent::ContextReceived(payload))
                .map_err(|_| Error::ChannelClosed)?;
        } else {
            // Latest value wins: an unsent context is replaced, not queued.
            remote.pending_context = Some(payload);
        }
        Ok(())
    }

    fn queue_payload(&self, id: TransferId, payload: Payload) {
        let sender = self.local.lock().unwrap().events.clone();
        let mut remote = self.remote.lock().unwrap();
        if remote.online {
            let _ = remote.events.send(ChannelEvent::QueueItemReceived(payload));
            let _ = sender.send(ChannelEvent::TransferFinished { id, error: None });
        } else {
            remote.pending.push_back(Pending::Queue {
                id,
                item: payload,
                sender,
            });
        }
    }

    fn send_file(&self, id: TransferId, source: &Path, metadata: Payload) {
        let sender = self.local.lock().unwrap().events.clone();
        let mut remote = self.remote.lock().unwrap();
        if remote.online {
            let receiver = remote.events.clone();
            drop(remote);
            self.deliver_file(id, source, metadata, &receiver, &sender);
        } else {
            remote.pending.push_back(Pending::File {
                id,
                source: source.to_path_buf(),
                metadata,
                sender,
            });
        }
    }

    fn send_request(&self, body: MessageBody) -> PendingReply {
        let (responder, reply) = reply_channel();
        let remote = self.remote.lock().unwrap();
        if !remote.online {
            drop(remote);
            responder.fail(Error::PeerUnreachable);
            return reply;
        }
        if let Err(mpsc::error::SendError(event)) = remote
            .events
            .send(ChannelEvent::RequestReceived { body, responder })
        {
            if let ChannelEvent::RequestReceived { responder, .. } = event {
                responder.fail(Error::ChannelClosed);
            }
        }
        reply
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ChannelEvent>> {
        self.local.lock().unwrap().inbox.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(key: &str, value: serde_json::Value) -> Payload {
        let mut map = Payload::new();
        map.insert(key.to_string(), value);
        map
    }

    #[tokio::test]
    async fn test_queue_delivers_in_order_while_online() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, companion) = LoopbackChannel::pair(spool.path());
        let mut inbox = companion.take_events().expect("inbox");

        primary.queue_payload(TransferId::new(), payload("id", json!(1)));
        primary.queue_payload(TransferId::new(), payload("id", json!(2)));

        for expected in 1..=2 {
            match inbox.recv().await.expect("event") {
                ChannelEvent::QueueItemReceived(item) => {
                    assert_eq!(item.get("id"), Some(&json!(expected)));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_offline_queue_buffers_until_online() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, companion) = LoopbackChannel::pair(spool.path());
        let mut inbox = companion.take_events().expect("inbox");

        companion.set_online(false);
        primary.queue_payload(TransferId::new(), payload("id", json!(1)));
        primary.queue_payload(TransferId::new(), payload("id", json!(2)));
        assert!(inbox.try_recv().is_err());

        companion.set_online(true);
        for expected in 1..=2 {
            match inbox.recv().await.expect("event") {
                ChannelEvent::QueueItemReceived(item) => {
                    assert_eq!(item.get("id"), Some(&json!(expected)));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_context_coalesces_to_latest_while_offline() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, companion) = LoopbackChannel::pair(spool.path());
        let mut inbox = companion.take_events().expect("inbox");

        primary.activate();
        companion.set_online(false);
        for n in 1..=5 {
            primary
                .update_context(payload("rev", json!(n)))
                .expect("context accepted");
        }

        companion.set_online(true);
        match inbox.recv().await.expect("event") {
            ChannelEvent::ContextReceived(context) => {
                assert_eq!(context.get("rev"), Some(&json!(5)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(inbox.try_recv().is_err(), "intermediate values coalesced");
    }

    #[tokio::test]
    async fn test_context_rejected_before_activation() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, _companion) = LoopbackChannel::pair(spool.path());

        let result = primary.update_context(payload("rev", json!(1)));
        assert!(matches!(result, Err(Error::NotActivated)));
    }

    #[tokio::test]
    async fn test_file_transfer_reports_missing_source() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, _companion) = LoopbackChannel::pair(spool.path());
        let mut sender_inbox = primary.take_events().expect("inbox");

        let id = TransferId::new();
        primary.send_file(id, Path::new("/nonexistent/file.bin"), Payload::new());
        match sender_inbox.recv().await.expect("event") {
            ChannelEvent::TransferFinished {
                id: finished,
                error,
            } => {
                assert_eq!(finished, id);
                assert!(error.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_fails_fast_when_peer_offline() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, companion) = LoopbackChannel::pair(spool.path());

        companion.set_online(false);
        let reply = primary.send_request(MessageBody::Raw(vec![0x01]));
        assert!(matches!(
            reply.await_reply().await,
            Err(Error::PeerUnreachable)
        ));
    }

    #[tokio::test]
    async fn test_events_stream_taken_once() {
        let spool = tempfile::tempdir().expect("spool dir");
        let (primary, _companion) = LoopbackChannel::pair(spool.path());

        assert!(primary.take_events().is_some());
        assert!(primary.take_events().is_none());
    }
}
