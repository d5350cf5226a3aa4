//! # Repository Implementations
//!
//! One repository per table family:
//!
//! - [`content`] - menus + content records (the Content Store)
//! - [`outbox`] - queued search logs and unsent searches (the Outbox Store)
//! - [`properties`] - versioned string properties (feed version tokens)
//! - [`id_pool`] - pre-downloaded subject ids for offline registration
//!
//! Repositories are thin, cloneable wrappers over the shared pool; all
//! write paths used by the reconciler run only while the sync lock is held.

pub mod content;
pub mod id_pool;
pub mod outbox;
pub mod properties;
