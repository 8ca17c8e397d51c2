//! Forward-only schema migrations contributed by modules.

use anyhow::Context;
use chrono::Utc;

use crate::Pool;

const CREATE_LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        PRIMARY KEY (module, id)
    )
"#;

/// Migration definition for modules
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Apply every migration that has not been recorded yet.
///
/// Migrations run in the order given, each in its own transaction together
/// with its ledger entry. Returns how many were applied.
pub async fn run_migrations(
    pool: &Pool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(CREATE_LEDGER)
        .execute(pool)
        .await
        .context("failed to create migration ledger")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let recorded: Option<(String,)> =
            sqlx::query_as("SELECT id FROM _migrations WHERE module = ? AND id = ?")
                .bind(module.as_str())
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read ledger for module '{module}'"))?;

        if recorded.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;
        sqlx::query("INSERT INTO _migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module.as_str())
            .bind(migration.id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
