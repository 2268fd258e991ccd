//! The session manager: one channel handle, four transports, one pump.
//!
//! A process constructs exactly one [`SessionManager`] at startup and calls
//! [`SessionManager::start`] once. The manager owns the channel handle for
//! the process lifetime, claims its event stream, and fans inbound events
//! out: lifecycle outcomes are logged, context and queue deliveries are
//! republished on the event bus, file receipts are persisted first, and
//! interactive requests are answered by the registered handler — or failed
//! explicitly so the sender never stalls.
//!
//! Outbound traffic enters through the transport accessors ([`context`],
//! [`queue`], [`files`], [`messaging`]) and is gated by the
//! [`AvailabilityGate`] before touching the channel; absence of a channel
//! degrades every operation to a no-op rather than an error.
//!
//! [`context`]: SessionManager::context
//! [`queue`]: SessionManager::queue
//! [`files`]: SessionManager::files
//! [`messaging`]: SessionManager::messaging

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{mpsc, oneshot};

use crate::bus::{EventBus, SessionEvent};
use crate::channel::{
    Channel, ChannelEvent, MessageBody, Payload, Responder, TransferHandle, TransferId,
};
use crate::config::SessionConfig;
use crate::context::ContextSync;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::gate::AvailabilityGate;
use crate::messaging::{InteractiveChannel, RequestHandler};
use crate::queue::QueueTransfer;
use crate::transfer::{self, FileTransfer};

/// Correlates in-flight transfer ids with their sender-side completion slots.
pub(crate) type CompletionRegistry =
    Arc<Mutex<HashMap<TransferId, oneshot::Sender<Option<String>>>>>;

/// Register a completion slot for `id` and hand back the sender's handle.
pub(crate) fn register_completion(
    registry: &CompletionRegistry,
    id: TransferId,
) -> TransferHandle {
    let (tx, rx) = oneshot::channel();
    registry.lock().unwrap().insert(id, tx);
    TransferHandle::new(id, rx)
}

/// Owns the channel and multiplexes the four transport primitives over it.
pub struct SessionManager {
    channel: Option<Arc<dyn Channel>>,
    gate: AvailabilityGate,
    bus: EventBus,
    dispatcher: Arc<dyn Dispatcher>,
    config: SessionConfig,
    completions: CompletionRegistry,
    handler: Arc<RwLock<Option<Arc<dyn RequestHandler>>>>,
}

impl SessionManager {
    /// Create the manager over the process's channel handle.
    ///
    /// `channel` is `None` on platforms without channel support; the manager
    /// still constructs and every operation degrades to a no-op.
    #[must_use]
    pub fn new(
        channel: Option<Arc<dyn Channel>>,
        config: SessionConfig,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let gate = AvailabilityGate::new(channel.clone(), config.general.role);
        let bus = EventBus::new(config.bus.capacity);
        Self {
            channel,
            gate,
            bus,
            dispatcher,
            config,
            completions: Arc::default(),
            handler: Arc::default(),
        }
    }

    /// Claim the channel's event stream, spawn the inbound pump, and begin
    /// activation.
    ///
    /// Intended to be called exactly once at process start, from within a
    /// tokio runtime. A repeated call finds the event stream already claimed,
    /// logs a warning, and changes nothing.
    pub fn start(&self) {
        let Some(channel) = self.channel.as_ref() else {
            tracing::warn!("channel unsupported on this platform; session left inactive");
            return;
        };
        let Some(events) = channel.take_events() else {
            tracing::warn!("session already started; ignoring repeated start");
            return;
        };

        let pump = Pump {
            bus: self.bus.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            config: self.config.clone(),
            completions: Arc::clone(&self.completions),
            handler: Arc::clone(&self.handler),
        };
        tokio::spawn(pump.run(events));

        channel.activate();
        tracing::info!(
            "session started for device '{}'",
            self.config.general.device_name
        );
    }

    /// The event bus finished results are published on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The availability gate over this session's channel.
    #[must_use]
    pub fn gate(&self) -> &AvailabilityGate {
        &self.gate
    }

    /// Register the handler answering inbound interactive messages.
    ///
    /// Replaces any previous handler. While no handler is registered,
    /// inbound messages are failed with an explicit unhandled error.
    pub fn set_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        *self.handler.write().unwrap() = Some(handler);
    }

    /// The context sync transport.
    #[must_use]
    pub fn context(&self) -> ContextSync {
        ContextSync::new(self.channel.clone(), self.gate.clone())
    }

    /// The queued payload transport.
    #[must_use]
    pub fn queue(&self) -> QueueTransfer {
        QueueTransfer::new(
            self.channel.clone(),
            self.gate.clone(),
            Arc::clone(&self.completions),
        )
    }

    /// The file transfer transport.
    #[must_use]
    pub fn files(&self) -> FileTransfer {
        FileTransfer::new(
            self.channel.clone(),
            self.gate.clone(),
            Arc::clone(&self.completions),
        )
    }

    /// The interactive messaging transport.
    #[must_use]
    pub fn messaging(&self) -> InteractiveChannel {
        InteractiveChannel::new(self.channel.clone(), self.gate.clone())
    }
}

/// The inbound half of the session: consumes channel events until the
/// channel drops its sender.
struct Pump {
    bus: EventBus,
    dispatcher: Arc<dyn Dispatcher>,
    config: SessionConfig,
    completions: CompletionRegistry,
    handler: Arc<RwLock<Option<Arc<dyn RequestHandler>>>>,
}

impl Pump {
    async fn run(self, mut events: mpsc::UnboundedReceiver<ChannelEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::debug!("channel event stream ended");
    }

    fn handle(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::ActivationCompleted { state, error } => match error {
                Some(error) => {
                    tracing::warn!("channel activation completed with state {state:?}: {error}");
                }
                None => tracing::info!("channel activation completed: {state:?}"),
            },
            ChannelEvent::BecameInactive => tracing::info!("channel became inactive"),
            ChannelEvent::Deactivated => {
                tracing::info!("channel deactivated; reactivation is left to the application");
            }
            ChannelEvent::ContextReceived(context) => {
                self.publish(SessionEvent::ContextReceived { context });
            }
            ChannelEvent::QueueItemReceived(item) => {
                self.publish(SessionEvent::QueueItemReceived { item });
            }
            ChannelEvent::FileReceived {
                temp_path,
                metadata,
            } => self.handle_file(temp_path, metadata),
            ChannelEvent::RequestReceived { body, responder } => {
                self.handle_request(body, responder);
            }
            ChannelEvent::TransferFinished { id, error } => {
                match &error {
                    Some(reason) => tracing::warn!("transfer {id} failed: {reason}"),
                    None => tracing::debug!("transfer {id} delivered"),
                }
                let waiter = self.completions.lock().unwrap().remove(&id);
                if let Some(tx) = waiter {
                    let _ = tx.send(error);
                }
            }
        }
    }

    /// Persist the receipt while the temporary file is still valid, then
    /// hand the finished result to consumers.
    fn handle_file(&self, temp_path: PathBuf, metadata: Payload) {
        let shared_dir = match transfer::shared_storage_dir(&self.config) {
            Ok(dir) => dir,
            Err(err) => {
                tracing::error!("cannot resolve shared storage directory: {err}");
                return;
            }
        };
        match transfer::receive(&shared_dir, &temp_path, metadata) {
            Ok(Some(incoming)) => self.publish(SessionEvent::IncomingFile(incoming)),
            Ok(None) => tracing::debug!("file receipt ignored: no usable category in metadata"),
            Err(err) => tracing::error!("failed to persist received file: {err}"),
        }
    }

    fn handle_request(&self, body: MessageBody, responder: Responder) {
        let handler = self.handler.read().unwrap().clone();
        match handler {
            Some(handler) => match handler.handle(body) {
                Ok(reply) => responder.reply(reply),
                Err(err) => {
                    tracing::warn!("request handler failed: {err}");
                    responder.fail(err);
                }
            },
            None => responder.fail(Error::Unhandled),
        }
    }

    /// All consumer-visible notifications hop through the owner execution
    /// context before publication.
    fn publish(&self, event: SessionEvent) {
        let bus = self.bus.clone();
        self.dispatcher
            .dispatch(Box::new(move || bus.publish(event)));
    }
}
