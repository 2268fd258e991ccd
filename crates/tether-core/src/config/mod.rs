//! Configuration management for Tether.
//!
//! This module handles loading, saving, and managing Tether configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/tether/config.toml` |
//! | macOS | `~/Library/Application Support/rs.Tether.tether/config.toml` |
//! | Windows | `%APPDATA%\Tether\tether\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::config::SessionConfig;
//!
//! let config = SessionConfig::load()?;
//! println!("Device name: {}", config.general.device_name);
//! ```

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which side of the pairing this process runs on.
///
/// The primary endpoint tracks pairing and companion-app installation; the
/// companion endpoint only needs its channel activated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// The device that tracks pairing state
    #[default]
    Primary,
    /// The paired companion device
    Companion,
}

/// Main configuration struct for a Tether session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Shared storage settings
    pub storage: StorageConfig,
    /// Event bus settings
    pub bus: BusConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Display name for this endpoint
    pub device_name: String,
    /// Which side of the pairing this endpoint is
    pub role: EndpointRole,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            device_name: hostname::get().map_or_else(
                |_| "Tether Device".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
            role: EndpointRole::default(),
        }
    }
}

/// Shared storage configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory both endpoints' processes can address for received files.
    /// Defaults to the platform data directory when unset.
    pub shared_dir: Option<PathBuf>,
}

/// Event bus configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Broadcast capacity before slow subscribers start lagging
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: crate::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Get the path to the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("rs", "Tether", "tether")
            .ok_or_else(|| Error::Config("platform config directory unavailable".to_string()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load the configuration from disk, falling back to defaults when no
    /// file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save the configuration to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(&path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.general.role, EndpointRole::Primary);
        assert!(config.storage.shared_dir.is_none());
        assert_eq!(config.bus.capacity, crate::DEFAULT_EVENT_CAPACITY);
        assert!(!config.general.device_name.is_empty());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SessionConfig {
            general: GeneralConfig {
                role: EndpointRole::Companion,
                ..GeneralConfig::default()
            },
            storage: StorageConfig {
                shared_dir: Some(PathBuf::from("/tmp/tether-shared")),
            },
            bus: BusConfig { capacity: 8 },
        };

        let raw = toml::to_string_pretty(&config).expect("serialize");
        let parsed: SessionConfig = toml::from_str(&raw).expect("parse");

        assert_eq!(parsed.general.role, EndpointRole::Companion);
        assert_eq!(
            parsed.storage.shared_dir,
            Some(PathBuf::from("/tmp/tether-shared"))
        );
        assert_eq!(parsed.bus.capacity, 8);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: SessionConfig = toml::from_str("[general]\nrole = \"companion\"\n")
            .expect("parse");
        assert_eq!(parsed.general.role, EndpointRole::Companion);
        assert_eq!(parsed.bus.capacity, crate::DEFAULT_EVENT_CAPACITY);
    }
}
