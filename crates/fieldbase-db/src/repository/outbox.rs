//! # Outbox Repository
//!
//! The Outbox Store: a persistent FIFO queue of locally generated data
//! waiting for a synchronization episode to upload it.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  SEARCH SCREEN (out of scope)                                       │
//! │       │                                                             │
//! │       ├── search completed   → insert_log(…)                        │
//! │       └── submission failed  → insert_search(…)                     │
//! │                                                                     │
//! │  SYNC EPISODE (fieldbase-sync)                                      │
//! │       │                                                             │
//! │       ├── list_log_entries()          oldest first                  │
//! │       │     server ack → delete_entry(id)                           │
//! │       │     failure    → left in place, retried next episode        │
//! │       │                                                             │
//! │       └── list_incomplete_searches()  oldest first                  │
//! │             server ack → complete_entry(id, body)                   │
//! │             failure    → left in place, retried next episode        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use fieldbase_core::{OutboxEntry, OutboxKind};

/// Repository for outbox operations.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Queues a usage-log entry for a completed search.
    pub async fn insert_log(
        &self,
        keyword: &str,
        subject_id: &str,
        location: Option<&str>,
        category: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> DbResult<OutboxEntry> {
        self.insert(
            OutboxKind::Log,
            keyword,
            subject_id,
            location,
            category,
            submitted_at,
        )
        .await
    }

    /// Queues an unsent search submission for resend.
    pub async fn insert_search(
        &self,
        keyword: &str,
        subject_id: &str,
        location: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> DbResult<OutboxEntry> {
        self.insert(
            OutboxKind::Search,
            keyword,
            subject_id,
            location,
            None,
            submitted_at,
        )
        .await
    }

    async fn insert(
        &self,
        kind: OutboxKind,
        keyword: &str,
        subject_id: &str,
        location: Option<&str>,
        category: Option<&str>,
        submitted_at: DateTime<Utc>,
    ) -> DbResult<OutboxEntry> {
        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            kind,
            keyword: keyword.to_string(),
            subject_id: subject_id.to_string(),
            submitted_at,
            location: location.map(str::to_string),
            category: category.map(str::to_string),
            body: None,
            completed: false,
            created_at: Utc::now(),
        };

        debug!(id = %entry.id, kind = %entry.kind, keyword = %entry.keyword, "Queuing outbox entry");

        sqlx::query(
            r#"
            INSERT INTO outbox (
                id, kind, keyword, subject_id, submitted_at,
                location, category, body, completed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.kind.as_str())
        .bind(&entry.keyword)
        .bind(&entry.subject_id)
        .bind(entry.submitted_at)
        .bind(&entry.location)
        .bind(&entry.category)
        .bind(&entry.body)
        .bind(entry.completed)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists queued usage-log entries, oldest first.
    pub async fn list_log_entries(&self) -> DbResult<Vec<OutboxEntry>> {
        self.list(OutboxKind::Log).await
    }

    /// Lists unsent (not yet completed) search submissions, oldest first.
    pub async fn list_incomplete_searches(&self) -> DbResult<Vec<OutboxEntry>> {
        self.list(OutboxKind::Search).await
    }

    async fn list(&self, kind: OutboxKind) -> DbResult<Vec<OutboxEntry>> {
        // rowid breaks ties between entries created within the same
        // timestamp granularity, preserving insertion order.
        let rows = sqlx::query(
            r#"
            SELECT id, kind, keyword, subject_id, submitted_at,
                   location, category, body, completed, created_at
            FROM outbox
            WHERE kind = ?1 AND completed = 0
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Deletes an entry once the server has acknowledged it.
    pub async fn delete_entry(&self, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM outbox WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Stores the server's result body on a search entry and marks it
    /// complete, keeping it available to the history screens.
    pub async fn complete_entry(&self, id: &str, body: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE outbox SET
                body = ?2,
                completed = 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts entries still waiting for upload.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox WHERE completed = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Maps an outbox row back into the domain type.
fn entry_from_row(row: &SqliteRow) -> DbResult<OutboxEntry> {
    let kind: String = row.try_get("kind")?;

    Ok(OutboxEntry {
        id: row.try_get("id")?,
        kind: kind.parse()?,
        keyword: row.try_get("keyword")?,
        subject_id: row.try_get("subject_id")?,
        submitted_at: row.try_get("submitted_at")?,
        location: row.try_get("location")?,
        category: row.try_get("category")?,
        body: row.try_get("body")?,
        completed: row.try_get("completed")?,
        created_at: row.try_get("created_at")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
