//! HTTP server facade for the catalog with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::json;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

use catalog_kernel::{InitCtx, ModuleRegistry};

pub mod error;
pub mod router;

use router::RouterBuilder;

/// The served application router
pub type App = Router;

/// Start the HTTP server with the given module registry
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    ctx: &InitCtx<'_>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = &ctx.settings.server;
    tracing::info!("starting HTTP server on {}:{}", server.host, server.port);

    let app = build_app(registry, ctx).context("failed to build HTTP router")?;

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", server.host, server.port))
        .await
        .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        server.host,
        server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the served application with all module routes mounted.
///
/// Swagger UI is routed first. Everything else goes through trailing-slash
/// trimming, so `/api/books/` and `/api/books` reach the same handler.
pub fn build_app(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> anyhow::Result<App> {
    let openapi_spec = router::merged_openapi(registry);
    let api = build_router(registry, ctx, openapi_spec.clone())?;

    // Layers wrap only what is already routed, so they go last.
    let app = RouterBuilder::new()
        .with_swagger_ui(openapi_spec)
        .with_fallback(NormalizePathLayer::trim_trailing_slash().layer(api))
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(ctx.settings.server.request_timeout_ms)
        .build();

    Ok(app)
}

/// Index, health check, module routes and the raw OpenAPI document
fn build_router(
    registry: &ModuleRegistry,
    ctx: &InitCtx<'_>,
    openapi_spec: serde_json::Value,
) -> anyhow::Result<Router> {
    let mut router_builder = RouterBuilder::new()
        .route("/", get(index))
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes(ctx));
    }

    Ok(router_builder.with_openapi_document(openapi_spec).build())
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({"message": "Book catalog", "docs": "/swagger-ui"}))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
