//! Tool-invocation server for catalog modules.
//!
//! Speaks JSON-RPC 2.0 over HTTP POST (streamable-HTTP style with plain JSON
//! responses): `initialize`, `ping`, `tools/list` and `tools/call`. Which
//! tools are served is decided once at startup by [`ToolCatalog`].

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use catalog_kernel::settings::McpSettings;
use catalog_kernel::{InitCtx, ModuleRegistry, ToolError};

pub mod catalog;
pub mod protocol;

pub use catalog::ToolCatalog;
use protocol::*;
use rmcp::model::{ErrorCode, ErrorData};

/// Shared state for the JSON-RPC endpoint.
pub struct McpServer {
    catalog: ToolCatalog,
    name: String,
    version: String,
}

impl McpServer {
    pub fn new(catalog: ToolCatalog, settings: &McpSettings) -> Self {
        Self {
            catalog,
            name: settings.name.clone(),
            version: settings.version.clone(),
        }
    }

    /// Collect tool sets from the registry and gate them by the capability table.
    pub fn from_registry(registry: &ModuleRegistry, ctx: &InitCtx<'_>) -> Self {
        let sets = registry.collect_tools(ctx);
        let catalog = ToolCatalog::build(&sets, &ctx.settings.mcp);
        Self::new(catalog, &ctx.settings.mcp)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one raw request body. `None` means nothing should be sent back.
    pub async fn handle(&self, body: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(body) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    None,
                    rpc_error(ErrorCode::PARSE_ERROR, format!("Parse error: {e}")),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id,
                rpc_error(ErrorCode::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
            ));
        }

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(initialize_result(&self.name, &self.version)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list(self.catalog.listing())),
            "tools/call" => self.handle_tools_call(request.params).await,
            method => Err(rpc_error(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::failure(request.id, error),
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, ErrorData> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| rpc_error(ErrorCode::INVALID_PARAMS, format!("Invalid params: {e}")))?;

        let arguments = params
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));
        let call = self.catalog.call(&params.name, arguments).ok_or_else(|| {
            rpc_error(
                ErrorCode::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            )
        })?;

        tracing::info!(tool = %params.name, "tool call");

        let result = match call.await {
            Ok(value) => {
                let text = serde_json::to_string(&value).map_err(|e| {
                    rpc_error(ErrorCode::INTERNAL_ERROR, format!("Serialization error: {e}"))
                })?;
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(ToolError::Rejected(message)) => {
                tracing::debug!(tool = %params.name, %message, "tool call rejected");
                CallToolResult::error(vec![Content::text(message)])
            }
            Err(ToolError::InvalidArguments(message)) => {
                return Err(rpc_error(
                    ErrorCode::INVALID_PARAMS,
                    format!("Invalid arguments: {message}"),
                ));
            }
            Err(ToolError::Internal(e)) => {
                tracing::error!(tool = %params.name, error = ?e, "tool call failed");
                return Err(rpc_error(
                    ErrorCode::INTERNAL_ERROR,
                    format!("Tool execution error: {e}"),
                ));
            }
        };

        serde_json::to_value(result)
            .map_err(|e| rpc_error(ErrorCode::INTERNAL_ERROR, format!("Internal error: {e}")))
    }
}

async fn message_handler(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Router exposing the JSON-RPC endpoint at `path`.
pub fn router(server: Arc<McpServer>, path: &str) -> Router {
    Router::new()
        .route(path, post(message_handler))
        .with_state(server)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the tool server with the tools offered by registered modules
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    ctx: &InitCtx<'_>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let settings = &ctx.settings.mcp;
    let server = McpServer::from_registry(registry, ctx);

    tracing::info!(
        name = %settings.name,
        version = %settings.version,
        "starting tool server"
    );
    if server.catalog().is_empty() {
        tracing::warn!("no tools enabled");
    } else {
        tracing::info!(tools = %server.catalog().names().join(", "), "tools enabled");
    }

    let app = router(Arc::new(server), &settings.path);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", settings.host, settings.port))
        .await
        .context("failed to bind tool server address")?;

    tracing::info!(
        "tool server listening on http://{}:{}{}",
        settings.host,
        settings.port,
        settings.path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("tool server failed")?;

    tracing::info!("tool server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use catalog_kernel::settings::ToolEndpoint;
    use catalog_kernel::{ToolDefinition, ToolFuture, ToolSet};
    use tower::ServiceExt;

    struct ShelfTools;

    impl ToolSet for ShelfTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            ["shelf_echo", "shelf_refuse", "shelf_hidden"]
                .into_iter()
                .map(|name| ToolDefinition {
                    name,
                    input_schema: json!({"type": "object"}),
                })
                .collect()
        }

        fn call(&self, name: &str, args: Value) -> Option<ToolFuture> {
            match name {
                "shelf_echo" => Some(Box::pin(async move {
                    if args.get("word").is_none() {
                        return Err(ToolError::InvalidArguments("missing field `word`".into()));
                    }
                    Ok(args)
                })),
                "shelf_refuse" => Some(Box::pin(async {
                    Err(ToolError::Rejected("shelf is closed".to_string()))
                })),
                "shelf_hidden" => Some(Box::pin(async { Ok(json!("hidden")) })),
                _ => None,
            }
        }
    }

    fn server() -> McpServer {
        let settings = McpSettings {
            name: "shelf-server".to_string(),
            endpoints: ["shelf_echo", "shelf_refuse"]
                .into_iter()
                .map(|name| ToolEndpoint {
                    name: name.to_string(),
                    enabled: true,
                    description: format!("{name} tool"),
                })
                .collect(),
            ..McpSettings::default()
        };
        let sets: Vec<(&'static str, Arc<dyn ToolSet>)> = vec![("shelf", Arc::new(ShelfTools))];
        McpServer::new(ToolCatalog::build(&sets, &settings), &settings)
    }

    async fn call(server: &McpServer, body: Value) -> JsonRpcResponse {
        server.handle(&body.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "shelf-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_hides_disabled_tools() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;

        let result = response.result.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["shelf_echo", "shelf_refuse"]);
        assert_eq!(result["tools"][0]["description"], "shelf_echo tool");
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn tools_call_wraps_result_as_text() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "shelf_echo", "arguments": {"word": "hi"}}
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({"word": "hi"}));
    }

    #[tokio::test]
    async fn rejected_call_is_error_result() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {"name": "shelf_refuse"}
            }),
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "shelf is closed");
    }

    #[tokio::test]
    async fn protocol_errors_use_json_rpc_codes() {
        let server = server();

        let bad_args = call(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                "params": {"name": "shelf_echo", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(bad_args.error.unwrap().code, ErrorCode::INVALID_PARAMS);

        let hidden = call(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 6, "method": "tools/call",
                "params": {"name": "shelf_hidden"}
            }),
        )
        .await;
        assert_eq!(hidden.error.unwrap().code, ErrorCode::INVALID_PARAMS);

        let scalar_args = call(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 8, "method": "tools/call",
                "params": {"name": "shelf_echo", "arguments": "hi"}
            }),
        )
        .await;
        assert_eq!(scalar_args.error.unwrap().code, ErrorCode::INVALID_PARAMS);

        let unknown = call(&server, json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"})).await;
        assert_eq!(unknown.error.unwrap().code, ErrorCode::METHOD_NOT_FOUND);

        let garbage = server.handle("{not json").await.unwrap();
        assert_eq!(garbage.error.unwrap().code, ErrorCode::PARSE_ERROR);
    }

    #[tokio::test]
    async fn notifications_are_accepted_without_body() {
        let app = router(Arc::new(server()), "/mcp");
        let request = axum::http::Request::post("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn ping_over_http() {
        let app = router(Arc::new(server()), "/mcp");
        let request = axum::http::Request::post("/mcp")
            .body(Body::from(
                json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["id"], "p");
        assert_eq!(body["result"], json!({}));
    }
}
