//! JSON-RPC 2.0 envelope around the MCP payloads from `rmcp::model`.

use rmcp::model::{ErrorCode, ErrorData, JsonObject, ProtocolVersion, ServerCapabilities};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use rmcp::model::{CallToolResult, Content, Tool};

/// Protocol revision answered to `initialize`.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V_2024_11_05;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Requests without an id expect no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: ErrorData) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Error object with no `data` member.
pub fn rpc_error(code: ErrorCode, message: impl Into<String>) -> ErrorData {
    ErrorData::new(code, message.into(), None)
}

/// `params` of a `tools/call` request.
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<JsonObject>,
}

/// Result of `initialize`: protocol revision, tool capability and server identity.
pub fn initialize_result(name: &str, version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": ServerCapabilities::builder().enable_tools().build(),
        "serverInfo": { "name": name, "version": version }
    })
}

/// Result of `tools/list`.
pub fn tools_list<'a>(tools: impl Iterator<Item = &'a Tool>) -> Value {
    json!({ "tools": tools.collect::<Vec<_>>() })
}
