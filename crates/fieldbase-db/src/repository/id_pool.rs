//! # Subject Id Pool Repository
//!
//! Pool of server-allocated subject ids downloaded in bulk so that field
//! agents can register new subjects while offline. The registration
//! screens draw ids with [`IdPoolRepository::take_next`]; the pool is
//! refilled out of band and is never touched by the feed reconciler.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for the available-id pool.
#[derive(Debug, Clone)]
pub struct IdPoolRepository {
    pool: SqlitePool,
}

impl IdPoolRepository {
    /// Creates a new IdPoolRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IdPoolRepository { pool }
    }

    /// Inserts a batch of freshly downloaded ids. Already-known ids are
    /// ignored.
    pub async fn insert_ids(&self, ids: &[String]) -> DbResult<u64> {
        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await?;

        for id in ids {
            let result = sqlx::query("INSERT OR IGNORE INTO id_pool (id, taken) VALUES (?1, 0)")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(requested = ids.len(), inserted, "Refilled subject id pool");

        Ok(inserted)
    }

    /// Takes the next available id, marking it used.
    pub async fn take_next(&self) -> DbResult<Option<String>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id FROM id_pool WHERE taken = 0 ORDER BY rowid ASC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let id = match row {
            Some(r) => r.try_get::<String, _>("id")?,
            None => {
                tx.commit().await?;
                return Ok(None);
            }
        };

        sqlx::query("UPDATE id_pool SET taken = 1 WHERE id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(id))
    }

    /// Counts ids still available for registration.
    pub async fn count_available(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM id_pool WHERE taken = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
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
    async fn test_take_next_consumes_in_insertion_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.id_pool();

        repo.insert_ids(&["A100".into(), "A101".into()]).await.unwrap();
        assert_eq!(repo.count_available().await.unwrap(), 2);

        assert_eq!(repo.take_next().await.unwrap().as_deref(), Some("A100"));
        assert_eq!(repo.take_next().await.unwrap().as_deref(), Some("A101"));
        assert_eq!(repo.take_next().await.unwrap(), None);
        assert_eq!(repo.count_available().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refill_ignores_known_ids() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.id_pool();

        repo.insert_ids(&["A100".into()]).await.unwrap();
        let inserted = repo.insert_ids(&["A100".into(), "A101".into()]).await.unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(repo.count_available().await.unwrap(), 2);
    }
}
