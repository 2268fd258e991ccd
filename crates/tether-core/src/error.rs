//! Error types for Tether.
//!
//! This module provides a unified error type for all Tether operations,
//! with specific error variants for different failure modes.
//!
//! Operations attempted while the channel is not usable are not errors at
//! all: they degrade to silent no-ops, since channel availability is expected
//! to fluctuate normally.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Tether operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Tether.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel has not completed activation
    #[error("channel has not completed activation")]
    NotActivated,

    /// The transport declined a send
    #[error("transport rejected the send: {0}")]
    SendRejected(String),

    /// Peer process is not reachable for live messaging
    #[error("peer is not reachable")]
    PeerUnreachable,

    /// No handler accepted an interactive message
    #[error("message was not handled by the peer")]
    Unhandled,

    /// The peer dropped the reply without answering
    #[error("reply was dropped without being sent")]
    ReplyDropped,

    /// The channel endpoint has gone away
    #[error("channel closed")]
    ChannelClosed,

    /// A queued or file transfer failed after the send was accepted
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A received file could not be persisted to shared storage
    #[error("failed to persist received file to '{path}'")]
    Persist {
        /// Destination path that could not be written
        path: String,
        /// Underlying filesystem error
        #[source]
        source: io::Error,
    },

    /// Payload serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns whether this error reports a failed delivery, as opposed to a
    /// synchronous rejection of the call itself.
    #[must_use]
    pub const fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            Self::PeerUnreachable
                | Self::ReplyDropped
                | Self::ChannelClosed
                | Self::TransferFailed(_)
        )
    }
}
