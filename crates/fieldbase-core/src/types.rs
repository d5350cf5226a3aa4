//! # Domain Types
//!
//! Core domain types used throughout FieldBase.
//!
//! ## Identity
//! Content ids come from the server feed and are stable across feed
//! versions; replace-by-id is the reconciliation primitive. Outbox ids are
//! UUID v4 generated locally, so offline devices never collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Feed Kind
// =============================================================================

/// The content feeds the synchronizer knows about.
///
/// Each kind owns one version token in the properties table; the token
/// advances only after a feed pass completes without fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Searchable advisory content (menus + keyword-chained records).
    Keywords,
    /// Content images metadata.
    Images,
    /// Country calling-code table.
    CountryCode,
    /// Cached subject (interviewee) roster.
    SubjectCache,
}

impl FeedKind {
    /// Stable wire name, also used as the feed URL query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Keywords => "keywords",
            FeedKind::Images => "images",
            FeedKind::CountryCode => "country_code",
            FeedKind::SubjectCache => "subject_cache",
        }
    }

    /// Key under which this feed's version token is persisted.
    pub fn property_key(&self) -> String {
        format!("feed.version.{}", self.as_str())
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Menu Record
// =============================================================================

/// A top-level content group.
///
/// Menus are the unit of generational cleanup: a menu absent from a full
/// feed pass is dropped together with its content rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    /// Stable group identifier (e.g., "animals").
    pub id: String,

    /// Display label shown at the root of the search tree.
    pub label: String,
}

// =============================================================================
// Content Record
// =============================================================================

/// One leaf unit of cached content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Stable identifier, unique within the content table.
    pub id: String,

    /// Owning menu (top-level group) id.
    pub menu_id: String,

    /// Display rank within its keyword chain.
    pub order: i64,

    /// Content category (e.g., "Animals", "Crops").
    pub category: String,

    /// Attribution string shown with the content.
    pub attribution: String,

    /// Server-supplied last-updated marker, passed through verbatim.
    pub last_updated: String,

    /// Ordered keyword segments forming the compound lookup key.
    pub keywords: Vec<String>,

    /// Content body text.
    pub body: String,
}

impl ContentRecord {
    /// Returns the keyword segments joined into the single-space-separated
    /// chain used as the stored lookup key.
    pub fn keyword_chain(&self) -> String {
        self.keywords.join(" ")
    }

    /// Splits a stored keyword chain back into ordered segments.
    pub fn split_chain(chain: &str) -> Vec<String> {
        chain.split_whitespace().map(str::to_string).collect()
    }
}

// =============================================================================
// Outbox
// =============================================================================

/// Discriminates the two queued record shapes in the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxKind {
    /// Usage-log entry: recorded for every completed search, deleted once
    /// the server acknowledges it.
    Log,
    /// Search submission that never reached the server; resent until it
    /// succeeds, then kept with the returned content and marked complete.
    Search,
}

impl OutboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::Log => "log",
            OutboxKind::Search => "search",
        }
    }
}

impl std::str::FromStr for OutboxKind {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(OutboxKind::Log),
            "search" => Ok(OutboxKind::Search),
            other => Err(crate::error::CoreError::UnknownOutboxKind(
                other.to_string(),
            )),
        }
    }
}

impl std::fmt::Display for OutboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in the outbox queue.
///
/// Created when a search completes (log) or fails to reach the server
/// (search); retried on every synchronization episode, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Storage-assigned identifier (UUID v4), immutable.
    pub id: String,

    /// Log entry or unsent search.
    pub kind: OutboxKind,

    /// The searched keyword chain.
    pub keyword: String,

    /// Interviewee/subject identifier the search was performed for.
    pub subject_id: String,

    /// When the search was originally submitted on-device.
    pub submitted_at: DateTime<Utc>,

    /// Device location at submission time, if known.
    pub location: Option<String>,

    /// Content category (log entries only).
    pub category: Option<String>,

    /// Result body; filled in when a previously unsent search finally
    /// reaches the server.
    pub body: Option<String>,

    /// Whether a search submission has been acknowledged and completed.
    pub completed: bool,

    /// Insertion timestamp; both outbox listings order by this, oldest
    /// first, which the coordinator relies on for FIFO retry fairness.
    pub created_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// True for usage-log entries (deleted on acknowledgement rather than
    /// completed in place).
    pub fn is_log_entry(&self) -> bool {
        self.kind == OutboxKind::Log
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_kind_property_keys_are_distinct() {
        let kinds = [
            FeedKind::Keywords,
            FeedKind::Images,
            FeedKind::CountryCode,
            FeedKind::SubjectCache,
        ];
        let mut keys: Vec<String> = kinds.iter().map(|k| k.property_key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), kinds.len());
    }

    #[test]
    fn test_keyword_chain_roundtrip() {
        let record = ContentRecord {
            id: "1".into(),
            menu_id: "animals".into(),
            order: 1,
            category: "Animals".into(),
            attribution: "ag-dept".into(),
            last_updated: "2026-05-01".into(),
            keywords: vec!["Animals".into(), "Cattle".into(), "Diseases".into()],
            body: "Cattle".into(),
        };

        let chain = record.keyword_chain();
        assert_eq!(chain, "Animals Cattle Diseases");
        assert_eq!(ContentRecord::split_chain(&chain), record.keywords);
    }

    #[test]
    fn test_outbox_kind_parse() {
        assert_eq!("log".parse::<OutboxKind>().unwrap(), OutboxKind::Log);
        assert_eq!("search".parse::<OutboxKind>().unwrap(), OutboxKind::Search);
        assert!("bogus".parse::<OutboxKind>().is_err());
    }
}
