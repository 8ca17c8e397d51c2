//! Book catalog application.
//!
//! Wires the `books` module into the module registry and runs the bootstrap
//! sequence shared by the `catalog-app` binary and the `catalog` CLI.

pub mod modules;

use std::future::Future;

use anyhow::Context;
use tokio::sync::watch;

use catalog_db::Pool;
use catalog_kernel::settings::Settings;
use catalog_kernel::{InitCtx, ModuleRegistry};

/// Which front-ends [`Catalog::serve`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontends {
    /// REST and tool servers side by side
    Both,
    /// REST server only
    Api,
    /// Tool server only
    Mcp,
}

/// A connected catalog: settings, pool and the initialized module registry.
pub struct Catalog {
    settings: Settings,
    pool: Pool,
    registry: ModuleRegistry,
}

impl Catalog {
    /// Connect the pool, register the application modules and initialize them.
    pub async fn connect(settings: Settings) -> anyhow::Result<Self> {
        let pool = catalog_db::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("failed to connect to database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry);

        let catalog = Self {
            settings,
            pool,
            registry,
        };
        catalog
            .registry
            .init_modules(&catalog.ctx())
            .await
            .context("failed to initialize modules")?;

        Ok(catalog)
    }

    pub fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.pool,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending module migrations. Returns how many were applied.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = catalog_db::run_migrations(&self.pool, &migrations)
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, total = migrations.len(), "migrations complete");
        Ok(applied)
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        self.registry
            .start_modules(&self.ctx())
            .await
            .context("failed to start modules")
    }

    /// Run the selected servers until `shutdown` resolves.
    pub async fn serve<F>(&self, frontends: Frontends, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            let _ = tx.send(true);
        });
        let stopped = |mut rx: watch::Receiver<bool>| async move {
            let _ = rx.wait_for(|stop| *stop).await;
        };

        let ctx = self.ctx();
        match frontends {
            Frontends::Both => {
                tokio::try_join!(
                    catalog_http::start_server(&self.registry, &ctx, stopped(rx.clone())),
                    catalog_mcp::start_server(&self.registry, &ctx, stopped(rx)),
                )?;
            }
            Frontends::Api => {
                catalog_http::start_server(&self.registry, &ctx, stopped(rx)).await?;
            }
            Frontends::Mcp => {
                catalog_mcp::start_server(&self.registry, &ctx, stopped(rx)).await?;
            }
        }

        Ok(())
    }

    /// Stop modules in reverse registration order, then close the pool.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry
            .stop_modules()
            .await
            .context("failed to stop modules")?;
        self.pool.close().await;
        tracing::info!("catalog stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}

/// Full bootstrap: connect, migrate, start, serve until Ctrl-C, shut down.
pub async fn run(settings: Settings, frontends: Frontends) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        ?frontends,
        "catalog bootstrap starting"
    );

    let catalog = Catalog::connect(settings).await?;
    catalog.migrate().await?;
    catalog.start().await?;

    let served = catalog.serve(frontends, shutdown_signal()).await;
    catalog.shutdown().await?;
    served
}
