//! File transfer: binary payload delivery with receiver-side persistence.
//!
//! Sending schedules a background transfer of a local file plus optional
//! metadata. On receipt the core persists the spooled temporary file into a
//! shared storage directory — the temporary file is only valid for the
//! duration of the receipt handling, so persistence completes (or fails)
//! before the receipt is acknowledged — and republishes the result as an
//! [`IncomingFile`] event.
//!
//! ## Shared storage layout
//!
//! One file per category at `<shared-dir>/feed_<category>.json`, overwritten
//! on each new receipt for that category. Readers react to the incoming-file
//! event; they never poll the directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use directories::ProjectDirs;

use crate::bus::IncomingFile;
use crate::channel::{Channel, Payload, TransferHandle, TransferId};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::gate::AvailabilityGate;
use crate::session::{register_completion, CompletionRegistry};

/// Sender side of the file transfer primitive.
#[derive(Clone)]
pub struct FileTransfer {
    channel: Option<Arc<dyn Channel>>,
    gate: AvailabilityGate,
    completions: CompletionRegistry,
}

impl FileTransfer {
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

    /// Schedule a binary transfer of `source` with optional metadata.
    ///
    /// Returns `None` when the channel is not usable. Terminal failures are
    /// reported through the handle and logged; the core never retries.
    #[must_use]
    pub fn send(&self, source: &Path, metadata: Option<Payload>) -> Option<TransferHandle> {
        if !self.gate.is_usable() {
            tracing::debug!("file transfer skipped: channel not usable");
            return None;
        }
        let channel = self.channel.as_ref()?;
        // Register before sending: completion may arrive immediately.
        let id = TransferId::new();
        let handle = register_completion(&self.completions, id);
        channel.send_file(id, source, metadata.unwrap_or_default());
        tracing::debug!("scheduled file transfer {id} for '{}'", source.display());
        Some(handle)
    }
}

/// Resolve (and create if needed) the shared storage directory both
/// endpoints' processes can independently address.
///
/// # Errors
///
/// Returns an error if no platform data directory exists and none is
/// configured, or if the directory cannot be created.
pub fn shared_storage_dir(config: &SessionConfig) -> Result<PathBuf> {
    let dir = match &config.storage.shared_dir {
        Some(dir) => dir.clone(),
        None => ProjectDirs::from("rs", "Tether", "tether")
            .ok_or_else(|| Error::Config("platform data directory unavailable".to_string()))?
            .data_dir()
            .join("shared"),
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Process one file receipt: extract the category, persist the temporary
/// file into shared storage, and build the event to publish.
///
/// Returns `Ok(None)` when the receipt carries no usable category — it is
/// silently ignored, with no persistence and no event.
pub(crate) fn receive(
    shared_dir: &Path,
    temp_path: &Path,
    metadata: Payload,
) -> Result<Option<IncomingFile>> {
    let category = match metadata
        .get(crate::METADATA_CATEGORY_KEY)
        .and_then(serde_json::Value::as_str)
    {
        Some(category) => category.to_owned(),
        None => return Ok(None),
    };
    if !valid_category(&category) {
        tracing::warn!("file receipt ignored: invalid category '{category}'");
        return Ok(None);
    }

    let dest = shared_dir.join(format!(
        "{}{category}.{}",
        crate::FEED_FILE_PREFIX,
        crate::FEED_FILE_EXTENSION
    ));
    persist(temp_path, &dest).map_err(|source| Error::Persist {
        path: dest.display().to_string(),
        source,
    })?;
    tracing::info!("persisted '{category}' receipt to '{}'", dest.display());

    Ok(Some(IncomingFile {
        path: dest,
        category,
        metadata,
        received_at: Utc::now(),
    }))
}

/// Move the temporary file over the destination, creating or replacing it.
///
/// Replacement is a single atomic rename; when the temporary file lives on a
/// different filesystem the bytes are staged next to the destination first
/// and then renamed over it, so readers never observe a partial file.
fn persist(temp_path: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(temp_path, dest).is_ok() {
        return Ok(());
    }

    // The rename can fail when the spool lives on another filesystem, or on
    // Windows where renaming over an existing file is refused.
    let staged = dest.with_extension("staged");
    fs::copy(temp_path, &staged)?;
    if fs::rename(&staged, dest).is_err() {
        fs::remove_file(dest)?;
        fs::rename(&staged, dest)?;
    }
    let _ = fs::remove_file(temp_path);
    Ok(())
}

/// Category names become file names; restrict them accordingly.
fn valid_category(category: &str) -> bool {
    !category.is_empty()
        && category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
