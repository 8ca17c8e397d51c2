//! Tool set trait shared by modules and the tool server.
//!
//! A module that exposes remotely invocable operations implements
//! [`ToolSet`]. The tool server owns the wire protocol and decides, from the
//! capability table in settings, which of the declared tools are registered.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

/// Boxed future returned by a tool invocation.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>;

/// Static part of a tool declaration. Descriptions come from configuration.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    /// JSON Schema for the `arguments` object.
    pub input_schema: Value,
}

/// Failure of a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the declared schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The operation ran and refused the request (bad input, missing record).
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Trait for declaring and dispatching tools.
pub trait ToolSet: Send + Sync {
    /// Every tool this set can serve, enabled or not.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Dispatches a tool call by name.
    ///
    /// Returns `None` if the tool is not recognized by this set.
    fn call(&self, name: &str, args: Value) -> Option<ToolFuture>;

    /// Check if a tool exists by name.
    fn has_tool(&self, name: &str) -> bool {
        self.definitions().iter().any(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTools;

    impl ToolSet for EchoTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "echo",
                input_schema: json!({"type": "object"}),
            }]
        }

        fn call(&self, name: &str, args: Value) -> Option<ToolFuture> {
            match name {
                "echo" => Some(Box::pin(async move { Ok(args) })),
                _ => None,
            }
        }
    }

    #[test]
    fn has_tool_consults_definitions() {
        assert!(EchoTools.has_tool("echo"));
        assert!(!EchoTools.has_tool("missing"));
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let out = EchoTools.call("echo", json!({"a": 1})).unwrap().await.unwrap();
        assert_eq!(out, json!({"a": 1}));
        assert!(EchoTools.call("missing", Value::Null).is_none());
    }
}
