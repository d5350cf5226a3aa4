//! # Feed Reconciler
//!
//! Applies a decoded content feed to the Content Store.
//!
//! ## Pass Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Idle ──► Reading ──► (Applying)* ──► Finalizing ──► Success/Error  │
//! │                                                                     │
//! │  Reading     consume Version / Total header events                  │
//! │  Applying    one store write per record, progress tick after each   │
//! │  Finalizing  generational cleanup, then persist the version token   │
//! │                                                                     │
//! │  A record-level decode error ends Applying early; the pass          │
//! │  finalizes with whatever was applied (best-effort salvage of        │
//! │  truncated feeds). Only a missing version token fails the pass.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Generational Cleanup
//! Servers send the *current* set of top-level menus without explicit
//! deletes for retired ones. After a pass that carried at least one menu
//! record, every locally known menu id not seen in the pass is deleted
//! together with its content rows. Pure-delta feeds (no menu records)
//! skip cleanup entirely.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::decoder::{FeedDecoder, FeedEvent};
use crate::error::{SyncError, SyncResult};
use crate::notify::{ObserverSet, SyncNotification};
use fieldbase_core::{validate_menu, validate_record, FeedKind};
use fieldbase_db::Database;

// =============================================================================
// Outcome
// =============================================================================

/// Counts reported by a completed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The version token persisted for this pass.
    pub version: String,
    /// Record total declared by the feed header.
    pub total: u32,
    /// Records actually applied (adds + deletes + menus).
    pub processed: u32,
    /// Content records upserted.
    pub added: u32,
    /// Content records removed, including generational cleanup.
    pub deleted: u32,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Applies feed events to the store. One instance per feed kind; writes
/// happen only while the coordinator holds the sync lock.
pub struct FeedReconciler {
    db: Database,
    kind: FeedKind,
}

impl FeedReconciler {
    /// Creates a reconciler for the given feed kind.
    pub fn new(db: Database, kind: FeedKind) -> Self {
        FeedReconciler { db, kind }
    }

    /// Consumes the decoder and applies its events.
    ///
    /// Store failures on individual records are logged and skipped; they
    /// never abort the pass. The pass fails only when no usable version
    /// token was captured.
    pub async fn apply(
        &self,
        decoder: &mut (dyn FeedDecoder + Send),
        observers: &ObserverSet,
    ) -> SyncResult<ReconcileOutcome> {
        let content = self.db.content();

        let mut version: Option<String> = None;
        let mut total: u32 = 0;
        let mut processed: u32 = 0;
        let mut added: u32 = 0;
        let mut deleted: u32 = 0;
        let mut seen_menus: HashSet<String> = HashSet::new();
        let mut menu_records_seen = false;

        loop {
            match decoder.next_event() {
                Ok(FeedEvent::Version(v)) => {
                    debug!(kind = %self.kind, version = %v, "Feed version token");
                    version = Some(v);
                }

                Ok(FeedEvent::Total(t)) => {
                    total = t;
                    observers.broadcast(SyncNotification::ParseProgressTotal(t));
                }

                Ok(FeedEvent::Menu(menu)) => {
                    if let Err(e) = validate_menu(&menu) {
                        warn!(error = %e, "Skipping invalid menu record");
                        continue;
                    }

                    match content.upsert_menu(&menu).await {
                        Ok(()) => {
                            menu_records_seen = true;
                            seen_menus.insert(menu.id.clone());
                            processed += 1;
                            observers.broadcast(SyncNotification::ParseProgressTick(processed));
                        }
                        Err(e) => warn!(id = %menu.id, error = %e, "Skipping menu, store write failed"),
                    }
                }

                Ok(FeedEvent::Add(record)) => {
                    if let Err(e) = validate_record(&record) {
                        warn!(error = %e, "Skipping invalid content record");
                        continue;
                    }

                    match content.upsert_record(&record).await {
                        Ok(()) => {
                            added += 1;
                            processed += 1;
                            if !record.menu_id.is_empty() {
                                // Items vouch for their menus so a partial
                                // feed never deletes a group it just
                                // populated.
                                seen_menus.insert(record.menu_id.clone());
                            }
                            observers.broadcast(SyncNotification::ParseProgressTick(processed));
                        }
                        Err(e) => warn!(id = %record.id, error = %e, "Skipping record, store write failed"),
                    }
                }

                Ok(FeedEvent::Delete(id)) => {
                    match content.delete_record(&id).await {
                        Ok(true) => deleted += 1,
                        Ok(false) => debug!(id = %id, "Delete for unknown id ignored"),
                        Err(e) => {
                            warn!(id = %id, error = %e, "Skipping delete, store write failed");
                            continue;
                        }
                    }
                    processed += 1;
                    observers.broadcast(SyncNotification::ParseProgressTick(processed));
                }

                Ok(FeedEvent::End) => break,

                Err(e) => {
                    // Truncated or malformed tail: salvage what was applied.
                    warn!(error = %e, "Record decode failed, treating as end of stream");
                    break;
                }
            }
        }

        let version = match version {
            Some(v) if !v.is_empty() => v,
            _ => {
                warn!(kind = %self.kind, "Feed pass captured no version token, failing pass");
                return Err(SyncError::MissingVersion);
            }
        };

        // Generational cleanup runs last, and only for passes that
        // carried the current menu set.
        if menu_records_seen {
            for known in content.list_menu_ids().await? {
                if !seen_menus.contains(&known) {
                    let removed = content.delete_menu(&known).await?;
                    deleted += removed as u32;
                    info!(menu = %known, removed, "Generational cleanup removed stale menu");
                }
            }
        }

        self.db
            .properties()
            .set_feed_version(self.kind, &version)
            .await?;

        info!(
            kind = %self.kind,
            version = %version,
            total,
            processed,
            added,
            deleted,
            "Feed pass complete"
        );

        Ok(ReconcileOutcome {
            version,
            total,
            processed,
            added,
            deleted,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
