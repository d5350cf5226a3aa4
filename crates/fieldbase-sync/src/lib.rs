//! # fieldbase-sync: Synchronization Engine for FieldBase
//!
//! This crate keeps an offline field-data device in step with its content
//! server: it periodically downloads the versioned content feed into the
//! local store, uploads queued search logs and unsent searches, and lets
//! any number of UI surfaces observe the episode in flight.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Synchronization Engine                          │
//! │                                                                     │
//! │  ┌──────────────────────────────────────────────────────────────┐   │
//! │  │               SyncCoordinator (Orchestrator)                 │   │
//! │  │                                                              │   │
//! │  │  • SyncLock: at most one episode per process                 │   │
//! │  │  • request_sync / on_resume / complete_sync entry points     │   │
//! │  │  • recurring timer (default hourly)                          │   │
//! │  │  • broadcasts notifications to attached observers            │   │
//! │  └──────────────────────────┬───────────────────────────────────┘   │
//! │                             │                                       │
//! │        ┌────────────────────┼─────────────────────┐                 │
//! │        ▼                    ▼                     ▼                 │
//! │  ┌──────────────┐  ┌────────────────┐  ┌────────────────────────┐   │
//! │  │ HttpFetcher  │  │ FeedReconciler │  │  Outbox flush          │   │
//! │  │              │  │                │  │                        │   │
//! │  │ one GET,     │  │ JSON/XML       │  │ oldest-first upload    │   │
//! │  │ 30 s timeout │  │ decoders,      │  │ of logs + unsent       │   │
//! │  │ nil on error │  │ generational   │  │ searches               │   │
//! │  │              │  │ cleanup        │  │                        │   │
//! │  └──────────────┘  └────────────────┘  └────────────────────────┘   │
//! │                                                                     │
//! │  DEPENDENCIES:                                                      │
//! │  • fieldbase-core: pure types (ContentRecord, OutboxEntry, …)       │
//! │  • fieldbase-db: content/outbox/property repositories               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`coordinator`] - `SyncCoordinator`, `SyncLock`, episode execution
//! - [`reconciler`] - applies decoded feeds to the content store
//! - [`decoder`] - `FeedDecoder` strategy with JSON and legacy XML decoders
//! - [`fetcher`] - `FeedTransport` trait and the reqwest-based fetcher
//! - [`notify`] - observer trait and notification kinds
//! - [`config`] - sync configuration (TOML + defaults)
//! - [`error`] - sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fieldbase_db::{Database, DbConfig};
//! use fieldbase_sync::{HttpFetcher, SyncConfig, SyncCoordinator};
//!
//! let config = SyncConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new("./fieldbase.db")).await?;
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//!
//! let coordinator = SyncCoordinator::new(config, db, fetcher);
//! coordinator.ensure_timer_scheduled();
//!
//! // From a UI refresh handler:
//! coordinator.request_sync(my_observer);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod notify;
pub mod reconciler;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DeviceConfig, ServerSettings, SyncConfig, SyncSettings};
pub use coordinator::{EpisodeTrigger, SyncCoordinator, SyncLock};
pub use decoder::{
    decoder_for, payload_is_complete, FeedDecoder, FeedEvent, FeedFormat, JsonFeedDecoder,
    XmlFeedDecoder,
};
pub use error::{SyncError, SyncResult};
pub use fetcher::{FeedTransport, HttpFetcher};
pub use notify::{NoOpObserver, ObserverSet, SyncNotification, SyncObserver};
pub use reconciler::{FeedReconciler, ReconcileOutcome};
