//! # Property Repository
//!
//! Small string key-value area holding the versioned properties: one feed
//! version token per [`FeedKind`]. A token only advances after a feed pass
//! completes without fatal error; the reconciler persists it as its final
//! step.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use fieldbase_core::FeedKind;

/// Repository for versioned string properties.
#[derive(Debug, Clone)]
pub struct PropertyRepository {
    pool: SqlitePool,
}

impl PropertyRepository {
    /// Creates a new PropertyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PropertyRepository { pool }
    }

    /// Fetches a raw property value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM properties WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<String, _>("value").map_err(Into::into))
            .transpose()
    }

    /// Sets a raw property value (insert or overwrite).
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key, value, "Setting property");

        sqlx::query("INSERT OR REPLACE INTO properties (key, value) VALUES (?1, ?2)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns the persisted version token for a feed kind, if any.
    pub async fn feed_version(&self, kind: FeedKind) -> DbResult<Option<String>> {
        self.get(&kind.property_key()).await
    }

    /// Advances the version token for a feed kind.
    pub async fn set_feed_version(&self, kind: FeedKind, version: &str) -> DbResult<()> {
        self.set(&kind.property_key(), version).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_feed_version_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.properties();

        assert!(repo.feed_version(FeedKind::Keywords).await.unwrap().is_none());

        repo.set_feed_version(FeedKind::Keywords, "7").await.unwrap();
        assert_eq!(
            repo.feed_version(FeedKind::Keywords).await.unwrap().as_deref(),
            Some("7")
        );

        repo.set_feed_version(FeedKind::Keywords, "8").await.unwrap();
        assert_eq!(
            repo.feed_version(FeedKind::Keywords).await.unwrap().as_deref(),
            Some("8")
        );

        // Other kinds are unaffected.
        assert!(repo.feed_version(FeedKind::Images).await.unwrap().is_none());
    }
}
