//! # Content Repository
//!
//! The Content Store: cached menus and content records, written only by
//! the reconciler during a lock-holding episode, read freely by the
//! offline search screens.
//!
//! ## Replace Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  upsert_record(id = X)                                              │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  INSERT OR REPLACE INTO content_records …                           │
//! │                                                                     │
//! │  An existing row with the same id is fully overwritten - never      │
//! │  merged field-by-field. The feed is the source of truth for every   │
//! │  column of a record it mentions.                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use fieldbase_core::{ContentRecord, MenuRecord};

/// Repository for menus and content records.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: SqlitePool,
}

impl ContentRepository {
    /// Creates a new ContentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ContentRepository { pool }
    }

    // =========================================================================
    // Content records
    // =========================================================================

    /// Upserts a content record keyed by id (whole-row replace).
    pub async fn upsert_record(&self, record: &ContentRecord) -> DbResult<()> {
        debug!(id = %record.id, menu = %record.menu_id, "Upserting content record");

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO content_records (
                id, menu_id, display_order, category,
                attribution, last_updated, keywords, body
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(&record.menu_id)
        .bind(record.order)
        .bind(&record.category)
        .bind(&record.attribution)
        .bind(&record.last_updated)
        .bind(record.keyword_chain())
        .bind(&record.body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a content record by id.
    ///
    /// Returns whether a row was actually removed; deleting a non-existent
    /// id is a silent no-op for callers.
    pub async fn delete_record(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM content_records WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetches a content record by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ContentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, menu_id, display_order, category,
                   attribution, last_updated, keywords, body
            FROM content_records
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    /// Counts cached content records. Zero means the store is
    /// uninitialized and a first sync must run before search works.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Finds content whose keyword chain starts with the given prefix,
    /// ordered by display rank. This is the lookup the search screens
    /// walk one segment at a time.
    pub async fn find_by_keywords(&self, prefix: &str, limit: u32) -> DbResult<Vec<ContentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, menu_id, display_order, category,
                   attribution, last_updated, keywords, body
            FROM content_records
            WHERE keywords LIKE ?1 || '%'
            ORDER BY display_order ASC, keywords ASC
            LIMIT ?2
            "#,
        )
        .bind(prefix)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    // =========================================================================
    // Menus
    // =========================================================================

    /// Upserts a top-level menu.
    pub async fn upsert_menu(&self, menu: &MenuRecord) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO menus (id, label, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&menu.id)
        .bind(&menu.label)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists the ids of all locally known menus.
    pub async fn list_menu_ids(&self) -> DbResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM menus ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }

    /// Deletes a menu together with its dependent content rows.
    ///
    /// Returns the number of content rows removed. This is the primitive
    /// behind generational cleanup: menus the server stopped mentioning
    /// disappear along with everything under them.
    pub async fn delete_menu(&self, menu_id: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let records = sqlx::query("DELETE FROM content_records WHERE menu_id = ?1")
            .bind(menu_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM menus WHERE id = ?1")
            .bind(menu_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(menu = %menu_id, records, "Deleted menu and dependents");

        Ok(records)
    }
}

/// Maps a content_records row back into the domain type.
fn record_from_row(row: &SqliteRow) -> DbResult<ContentRecord> {
    let chain: String = row.try_get("keywords")?;

    Ok(ContentRecord {
        id: row.try_get("id")?,
        menu_id: row.try_get("menu_id")?,
        order: row.try_get("display_order")?,
        category: row.try_get("category")?,
        attribution: row.try_get("attribution")?,
        last_updated: row.try_get("last_updated")?,
        keywords: ContentRecord::split_chain(&chain),
        body: row.try_get("body")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
