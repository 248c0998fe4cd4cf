//! Eagerly-locked SQLite write transactions.
//!
//! `BEGIN IMMEDIATE` takes the database write lock up front, so the
//! read-check-write sequence of an operation can never interleave with
//! another writer. A concurrent operation on the same holding waits (up to
//! the busy timeout) and then reads the post-commit state.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;

use crate::error::{StoreError, map_sqlx_error};

/// An open `BEGIN IMMEDIATE` transaction on a pooled connection.
///
/// Dropping the guard without [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) (cancellation, deadline, panic) closes the
/// connection instead of returning it to the pool; SQLite discards the open
/// transaction when the connection goes away.
pub struct ImmediateTx {
    conn: PoolConnection<Sqlite>,
    open: bool,
}

impl ImmediateTx {
    pub async fn begin(pool: &SqlitePool) -> Result<Self, StoreError> {
        let conn = pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;

        // Armed before BEGIN is sent: if this future is dropped mid-statement
        // the connection is closed rather than pooled in an unknown state.
        let mut tx = Self { conn, open: true };
        if let Err(e) = sqlx::query("BEGIN IMMEDIATE").execute(&mut *tx.conn).await {
            tx.open = false;
            return Err(map_sqlx_error("begin_immediate", e));
        }
        Ok(tx)
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn commit(mut self) -> Result<(), StoreError> {
        sqlx::query("COMMIT")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        self.open = false;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), StoreError> {
        sqlx::query("ROLLBACK")
            .execute(&mut *self.conn)
            .await
            .map_err(|e| map_sqlx_error("rollback", e))?;
        self.open = false;
        Ok(())
    }

    /// Commit on success, roll back on failure.
    ///
    /// After a deadline expiry the statement that was cut off may still be
    /// in flight, so the guard is dropped (closing the connection) instead of
    /// issuing `ROLLBACK` behind it.
    pub async fn finish<T>(self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(StoreError::DeadlineExceeded) => Err(StoreError::DeadlineExceeded),
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "rollback failed; connection will be discarded");
                }
                Err(err)
            }
        }
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if self.open {
            self.conn.close_on_drop();
        }
    }
}
