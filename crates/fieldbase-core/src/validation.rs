//! # Record Validation
//!
//! Validation applied to feed records before they are written to the
//! content store. A record that fails here is logged and skipped by the
//! reconciler; it never aborts a pass.

use crate::error::CoreError;
use crate::types::{ContentRecord, MenuRecord};

/// Validates a content record received from a feed.
///
/// ## Rules
/// - `id` must be non-empty (it is the replace-by-id key)
/// - `order` must be non-negative
/// - every keyword segment must be non-empty
pub fn validate_record(record: &ContentRecord) -> Result<(), CoreError> {
    if record.id.trim().is_empty() {
        return Err(CoreError::InvalidRecord("empty id".into()));
    }

    if record.order < 0 {
        return Err(CoreError::InvalidRecord(format!(
            "negative order {} for id '{}'",
            record.order, record.id
        )));
    }

    if record.keywords.iter().any(|s| s.trim().is_empty()) {
        return Err(CoreError::InvalidRecord(format!(
            "blank keyword segment for id '{}'",
            record.id
        )));
    }

    Ok(())
}

/// Validates a menu record received from a feed.
pub fn validate_menu(menu: &MenuRecord) -> Result<(), CoreError> {
    if menu.id.trim().is_empty() {
        return Err(CoreError::InvalidMenu("empty id".into()));
    }

    Ok(())
}
