//! # Sync Error Types
//!
//! Error taxonomy for synchronization episodes.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Sync Error Categories                          │
//! │                                                                     │
//! │  ┌────────────────┐  ┌────────────────┐  ┌──────────────────────┐  │
//! │  │ Configuration  │  │   Transport    │  │       Feed           │  │
//! │  │                │  │                │  │                      │  │
//! │  │ InvalidConfig  │  │ FetchFailed    │  │ IncompletePayload    │  │
//! │  │ InvalidUrl     │  │                │  │ MissingVersion       │  │
//! │  │ ConfigLoad/    │  │                │  │ Decode               │  │
//! │  │ ConfigSave     │  │                │  │                      │  │
//! │  └────────────────┘  └────────────────┘  └──────────────────────┘  │
//! │                                                                     │
//! │  Transport and feed errors are both recoverable: the episode        │
//! │  reports them to its observers and releases the lock; the next      │
//! │  timer tick or user refresh is the retry path.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible episode failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid server URL.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The fetcher returned nothing (timeout, refused connection,
    /// non-2xx status). The transport layer never raises beyond this.
    #[error("Feed fetch failed for {url}")]
    FetchFailed { url: String },

    // =========================================================================
    // Feed Errors
    // =========================================================================
    /// The payload is missing its end sentinel (truncated download).
    #[error("Feed payload incomplete: missing end sentinel")]
    IncompletePayload,

    /// The feed carried no usable version token; the pass cannot be
    /// recorded as applied even if some records were.
    #[error("Feed carried no version token")]
    MissingVersion,

    /// A record or the surrounding document could not be decoded.
    #[error("Feed decode error: {0}")]
    Decode(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal coordinator error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<fieldbase_db::DbError> for SyncError {
    fn from(err: fieldbase_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<quick_xml::Error> for SyncError {
    fn from(err: quick_xml::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later episode (timer- or user-driven) can
    /// reasonably succeed without intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::FetchFailed { .. }
                | SyncError::IncompletePayload
                | SyncError::MissingVersion
                | SyncError::Decode(_)
                | SyncError::Database(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
