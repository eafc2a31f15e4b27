//! # Unit of Work
//!
//! One SQLite write transaction pinned to one pooled connection.
//!
//! ```text
//! begin()  ── acquire connection ── BEGIN IMMEDIATE
//!    │
//!    ├── conn() ... writes ...
//!    │
//!    ├── commit()   ── COMMIT   ── connection back to pool
//!    ├── rollback() ── ROLLBACK ── connection back to pool
//!    └── dropped    ── connection closed (SQLite discards the transaction)
//! ```
//!
//! `BEGIN IMMEDIATE` takes SQLite's write lock up front, so a unit of work
//! never fails halfway through because another writer upgraded first. Callers
//! that also hold stock row locks must acquire those first.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// An open write transaction.
#[derive(Debug)]
pub struct UnitOfWork {
    conn: PoolConnection<Sqlite>,
    finished: bool,
}

impl UnitOfWork {
    /// Acquires a connection and starts an immediate transaction.
    ///
    /// ## Errors
    /// - `DbError::PoolExhausted` if no connection frees up in time
    /// - `DbError::Busy` if another writer holds the database past the busy timeout
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;

        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        debug!("Unit of work started");

        Ok(UnitOfWork {
            conn,
            finished: false,
        })
    }

    /// The connection the transaction runs on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Commits the transaction.
    ///
    /// If COMMIT itself fails the connection is discarded on drop, which
    /// rolls the transaction back.
    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| match DbError::from(e) {
                busy @ DbError::Busy(_) => busy,
                other => DbError::TransactionFailed(other.to_string()),
            })?;

        self.finished = true;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Rolls the transaction back.
    pub async fn rollback(mut self) -> DbResult<()> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.finished = true;
        debug!("Unit of work rolled back");
        Ok(())
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Unit of work dropped while open, discarding connection");
            self.conn.close_on_drop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn count_store_items(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM store_items")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn insert_flour(uow: &mut UnitOfWork) {
        sqlx::query("INSERT INTO store_items (name, quantity_on_hand) VALUES ('Flour', 10)")
            .execute(uow.conn())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        insert_flour(&mut uow).await;
        uow.commit().await.unwrap();

        assert_eq!(count_store_items(db.pool()).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = UnitOfWork::begin(db.pool()).await.unwrap();
        insert_flour(&mut uow).await;
        uow.rollback().await.unwrap();

        assert_eq!(count_store_items(db.pool()).await, 0);
    }
}
