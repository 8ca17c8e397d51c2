//! Database crate for the catalog: pool factory, migrations and sessions.
//!
//! Everything here is storage plumbing. Modules own their schema (as
//! [`Migration`]s) and their queries; this crate only knows how to open a
//! pool, apply pending migrations and scope a unit of work.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod migrate;
pub mod session;

pub use migrate::{run_migrations, Migration};
pub use session::Session;

/// Connection pool shared by every request.
pub type Pool = sqlx::SqlitePool;

/// Connection type handed to store functions.
pub type Connection = sqlx::SqliteConnection;

/// Open a pooled connection to the database at `url`.
///
/// File-backed databases get their parent directory and file created when
/// missing.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Pool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{url}'"))?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(parent) = options
        .get_filename()
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create database directory {}", parent.display())
        })?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database '{url}'"))?;

    tracing::info!(target: "catalog-db", %url, max_connections, "database pool ready");
    Ok(pool)
}

/// Open a single-connection in-memory database.
///
/// The connection is never recycled, so the data lives as long as the pool.
pub async fn connect_in_memory() -> anyhow::Result<Pool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("invalid in-memory database url")?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("failed to open in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_answers_queries() {
        let pool = connect_in_memory().await.unwrap();
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn file_database_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("books.db");
        let url = format!("sqlite://{}", path.display());

        let pool = connect(&url, 2).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }
}
