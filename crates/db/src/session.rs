//! Scoped unit of work around a single transaction.

use sqlx::{Sqlite, Transaction};

use crate::{Connection, Pool};

/// One unit of work: begin, do the work, then [`Session::finish`].
///
/// A session dropped without finishing rolls back.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    /// Acquire a connection from the pool and open a transaction on it.
    pub async fn begin(pool: &Pool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    /// Connection to run queries against inside this unit of work.
    pub fn conn(&mut self) -> &mut Connection {
        &mut self.tx
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and hand the
    /// result back. A failed commit replaces the success value.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<sqlx::Error>,
    {
        match result {
            Ok(value) => {
                self.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.tx.rollback().await {
                    tracing::warn!(target: "catalog-db", error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
