//! Unit-of-work handle
//!
//! The caller-owned transactional context a repository operates within. A
//! repository issues statements through the handle and completes each
//! operation's flush boundary before returning, but never commits:
//! `commit` and `rollback` consume the handle and belong to whoever opened
//! it, which outlives any single repository call.
//!
//! Concurrent callers sharing one handle serialize on its internal lock;
//! callers with separate handles rely on the engine's isolation
//! guarantees.

use sqlx::pool::PoolConnection;
use sqlx::{Postgres, Row};
use tokio::sync::{Mutex, MutexGuard};

use crudkit_core::RepositoryError;

use crate::error::wrap_sqlx_error;
use crate::pool::DatabasePool;

/// An open transaction on a pooled PostgreSQL connection
pub struct UnitOfWork {
    conn: Mutex<PoolConnection<Postgres>>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Acquires a connection and opens a transaction
    pub async fn begin(pool: &DatabasePool) -> Result<Self, RepositoryError> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        Ok(UnitOfWork { conn: Mutex::new(conn) })
    }

    /// Commits the transaction
    ///
    /// The handle stays usable; statements issued afterwards run outside
    /// the committed transaction until the caller opens another one.
    pub async fn commit(&self) -> Result<(), RepositoryError> {
        let mut conn = self.conn.lock().await;
        sqlx::query("COMMIT")
            .execute(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        Ok(())
    }

    /// Rolls the transaction back
    pub async fn rollback(&self) -> Result<(), RepositoryError> {
        let mut conn = self.conn.lock().await;
        sqlx::query("ROLLBACK")
            .execute(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        Ok(())
    }

    /// Performs a health check on the connection
    ///
    /// # Returns
    ///
    /// `true` if the engine answers a trivial statement.
    pub async fn ping(&self) -> Result<bool, RepositoryError> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query("SELECT 1 AS alive")
            .fetch_one(&mut **conn)
            .await
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        let alive: i32 = row
            .try_get("alive")
            .map_err(|error| wrap_sqlx_error("transaction", error))?;
        Ok(alive == 1)
    }

    /// Exclusive access to the underlying connection
    pub(crate) async fn lock(&self) -> MutexGuard<'_, PoolConnection<Postgres>> {
        self.conn.lock().await
    }
}
