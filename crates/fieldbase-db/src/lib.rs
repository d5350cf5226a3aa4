//! # fieldbase-db: Storage Layer for FieldBase
//!
//! SQLite-backed Content Store and Outbox Store, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       FieldBase Storage Flow                        │
//! │                                                                     │
//! │  Sync episode (reconciler / outbox flush)      Search screens (UI)  │
//! │       │                                              │              │
//! │       ▼                                              ▼              │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                  fieldbase-db (THIS CRATE)                  │   │
//! │  │                                                             │   │
//! │  │  ┌──────────────┐  ┌────────────────┐  ┌────────────────┐  │   │
//! │  │  │   Database   │  │  Repositories  │  │   Migrations   │  │   │
//! │  │  │  (pool.rs)   │  │ content/outbox │  │   (embedded)   │  │   │
//! │  │  │              │  │ properties     │  │                │  │   │
//! │  │  │  SqlitePool  │◄─│ id_pool        │  │ 001_initial_…  │  │   │
//! │  │  └──────────────┘  └────────────────┘  └────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! │                                                                     │
//! │  Writers are serialized by the sync lock one level up; WAL lets     │
//! │  readers see a consistent (possibly slightly stale) view during a   │
//! │  reconciliation pass.                                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::content::ContentRepository;
pub use repository::id_pool::IdPoolRepository;
pub use repository::outbox::OutboxRepository;
pub use repository::properties::PropertyRepository;
