//! # Sync Configuration
//!
//! Configuration for the synchronization engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                           │
//! │                                                                     │
//! │  1. Explicit path passed by the embedding application               │
//! │                                                                     │
//! │  2. TOML config file in the platform config dir                     │
//! │     ~/.config/fieldbase/sync.toml (Linux)                           │
//! │     ~/Library/Application Support/org.fieldbase.app/sync.toml (mac) │
//! │                                                                     │
//! │  3. Default values (lowest priority)                                │
//! │     30 s fetch timeout, 1 h sync interval                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Field Terminal 7"
//!
//! [server]
//! base_url = "http://content.example.org/"
//! feed_path = "feed"
//! submit_path = "submit"
//!
//! [sync]
//! fetch_timeout_ms = 30000
//! interval_ms = 3600000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use fieldbase_core::{FeedKind, OutboxEntry};

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of this device, sent with every outbox submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Field Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// Where the content feed and submission endpoints live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the content server. Resolved by the embedding
    /// application's settings screen; empty means sync cannot start.
    #[serde(default)]
    pub base_url: String,

    /// Path of the feed endpoint under the base URL.
    #[serde(default = "default_feed_path")]
    pub feed_path: String,

    /// Path of the submission endpoint under the base URL.
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
}

fn default_feed_path() -> String {
    "feed".to_string()
}

fn default_submit_path() -> String {
    "submit".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            base_url: String::new(),
            feed_path: default_feed_path(),
            submit_path: default_submit_path(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Timing knobs for episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Connect/read timeout for a single fetch (milliseconds).
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Interval between recurring background episodes (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_interval_ms() -> u64 {
    3_600_000
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

// =============================================================================
// Sync Config
// =============================================================================

/// Complete sync engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Server endpoints.
    #[serde(default)]
    pub server: ServerSettings,

    /// Episode timing.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Returns the default config file path inside the platform config
    /// directory, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "fieldbase", "fieldbase")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Loads configuration from the given path, falling back to defaults
    /// when the file is missing or no path can be determined.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let path = match path.or_else(Self::default_path) {
            Some(p) => p,
            None => {
                warn!("No config directory available, using defaults");
                return SyncConfig::default();
            }
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded sync config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed sync config, using defaults");
                    SyncConfig::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No sync config file, using defaults");
                SyncConfig::default()
            }
        }
    }

    /// Saves configuration to the given path, creating parent directories
    /// as needed.
    pub fn save(&self, path: &PathBuf) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// Validates the configuration before an episode may use it.
    pub fn validate(&self) -> SyncResult<()> {
        if self.server.base_url.is_empty() {
            return Err(SyncError::InvalidConfig(
                "Server base URL not configured".into(),
            ));
        }

        Url::parse(&self.server.base_url)?;

        if self.sync.fetch_timeout_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "fetch_timeout_ms must be positive".into(),
            ));
        }

        if self.sync.interval_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_ms must be positive".into(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    /// Builds the feed URL for a content kind, including the locally held
    /// version token so the server can answer with an increment.
    pub fn feed_url(&self, kind: FeedKind, since: Option<&str>) -> SyncResult<Url> {
        let mut url = self.join(&self.server.feed_path)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("kind", kind.as_str());
            if let Some(version) = since {
                pairs.append_pair("since", version);
            }
        }

        Ok(url)
    }

    /// Builds the submission URL for one outbox entry.
    pub fn submit_url(&self, entry: &OutboxEntry) -> SyncResult<Url> {
        let mut url = self.join(&self.server.submit_path)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("keyword", &entry.keyword);
            pairs.append_pair("subject", &entry.subject_id);
            pairs.append_pair("time", &entry.submitted_at.to_rfc3339());
            pairs.append_pair("device", &self.device.id);
            if let Some(location) = &entry.location {
                pairs.append_pair("location", location);
            }
            if let Some(category) = &entry.category {
                pairs.append_pair("category", category);
            }
            pairs.append_pair("log", if entry.is_log_entry() { "true" } else { "false" });
        }

        Ok(url)
    }

    fn join(&self, path: &str) -> SyncResult<Url> {
        let base = Url::parse(&self.server.base_url)?;
        base.join(path).map_err(Into::into)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
