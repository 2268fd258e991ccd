//! Common test utilities for Tether integration tests.
//!
//! This module provides shared functionality for integration tests: a pair
//! of started session managers wired over a loopback channel.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tether_core::bus::SessionEvent;
use tether_core::channel::loopback::LoopbackChannel;
use tether_core::channel::Payload;
use tether_core::config::{EndpointRole, GeneralConfig, SessionConfig, StorageConfig};
use tether_core::dispatch::InlineDispatcher;
use tether_core::session::SessionManager;
use tokio::sync::broadcast;

/// How long a test waits for an expected event before giving up.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Two started session managers linked by a loopback channel, plus the
/// temporary directories backing them.
pub struct PairedSessions {
    pub primary: SessionManager,
    pub companion: SessionManager,
    pub primary_channel: Arc<LoopbackChannel>,
    pub companion_channel: Arc<LoopbackChannel>,
    pub primary_storage: PathBuf,
    pub companion_storage: PathBuf,
    _dirs: Vec<TempDir>,
}

/// Build and start a paired primary/companion session over loopback.
pub fn paired_sessions() -> PairedSessions {
    let spool = create_temp_dir();
    let primary_storage = create_temp_dir();
    let companion_storage = create_temp_dir();

    let (primary_channel, companion_channel) = LoopbackChannel::pair(spool.path());

    let primary_config = SessionConfig {
        general: GeneralConfig {
            device_name: "test-primary".to_string(),
            role: EndpointRole::Primary,
        },
        storage: StorageConfig {
            shared_dir: Some(primary_storage.path().to_path_buf()),
        },
        ..SessionConfig::default()
    };
    let companion_config = SessionConfig {
        general: GeneralConfig {
            device_name: "test-companion".to_string(),
            role: EndpointRole::Companion,
        },
        storage: StorageConfig {
            shared_dir: Some(companion_storage.path().to_path_buf()),
        },
        ..SessionConfig::default()
    };

    let primary = SessionManager::new(
        Some(primary_channel.clone()),
        primary_config,
        Arc::new(InlineDispatcher),
    );
    let companion = SessionManager::new(
        Some(companion_channel.clone()),
        companion_config,
        Arc::new(InlineDispatcher),
    );

    primary.start();
    companion.start();

    PairedSessions {
        primary,
        companion,
        primary_channel,
        companion_channel,
        primary_storage: primary_storage.path().to_path_buf(),
        companion_storage: companion_storage.path().to_path_buf(),
        _dirs: vec![spool, primary_storage, companion_storage],
    }
}

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &std::path::Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Build a single-key payload.
pub fn payload(key: &str, value: serde_json::Value) -> Payload {
    let mut map = Payload::new();
    map.insert(key.to_string(), value);
    map
}

/// Receive the next session event or panic after the test timeout.
pub async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event bus closed")
}

/// Assert that no session event arrives within a short window.
pub async fn expect_no_event(rx: &mut broadcast::Receiver<SessionEvent>) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected session event: {outcome:?}");
}
