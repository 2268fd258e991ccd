//! # Tether Core Library
//!
//! `tether-core` provides the session layer for Tether, connecting two paired
//! application endpoints (a primary device and its companion) over a single
//! validated channel.
//!
//! ## Features
//!
//! - **Context sync**: latest-value-wins propagation of whole-state blobs
//! - **Queue transfer**: ordered, reliable, store-and-forward payloads
//! - **File transfer**: binary payloads with metadata, persisted into shared
//!   storage on receipt
//! - **Interactive messaging**: live-only request/reply with map or raw bodies
//!
//! ## Modules
//!
//! - [`bus`] - Typed event bus handing finished results to consumers
//! - [`channel`] - The underlying transport seam and the loopback channel
//! - [`config`] - Configuration management
//! - [`context`] - Context sync transport
//! - [`dispatch`] - Owner-execution-context marshaling
//! - [`error`] - Unified error type
//! - [`gate`] - Availability gate (`is_usable` / `is_live`)
//! - [`messaging`] - Interactive request/reply transport
//! - [`queue`] - Queued payload transport
//! - [`session`] - The session manager
//! - [`transfer`] - File transfer and receiver-side persistence
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_core::channel::loopback::LoopbackChannel;
//! use tether_core::config::SessionConfig;
//! use tether_core::dispatch::RuntimeDispatcher;
//! use tether_core::session::SessionManager;
//!
//! let (channel, _peer) = LoopbackChannel::pair(spool_dir);
//! let manager = SessionManager::new(
//!     Some(channel),
//!     SessionConfig::load()?,
//!     Arc::new(RuntimeDispatcher::current()),
//! );
//! manager.start();
//!
//! let mut events = manager.bus().subscribe();
//! manager.queue().enqueue(payload);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod bus;
pub mod channel;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod messaging;
pub mod queue;
pub mod session;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Metadata key naming the category of a transferred file
pub const METADATA_CATEGORY_KEY: &str = "feed";

/// Filename prefix for persisted file receipts
pub const FEED_FILE_PREFIX: &str = "feed_";

/// Filename extension for persisted file receipts
pub const FEED_FILE_EXTENSION: &str = "json";

/// Default event bus capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
