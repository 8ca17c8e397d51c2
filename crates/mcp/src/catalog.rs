//! Capability-gated tool catalog.
//!
//! Built once at startup from the tool sets modules offer and the
//! `mcp.endpoints` table in settings. Only enabled tools are registered;
//! everything else is invisible to callers.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::Value;

use catalog_kernel::settings::McpSettings;
use catalog_kernel::{ToolFuture, ToolSet};

struct RegisteredTool {
    tool: Tool,
    set: Arc<dyn ToolSet>,
}

/// Name → enabled tool lookup.
pub struct ToolCatalog {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolCatalog {
    /// Register every declared tool whose capability row is enabled.
    pub fn build(sets: &[(&'static str, Arc<dyn ToolSet>)], settings: &McpSettings) -> Self {
        let mut tools = BTreeMap::new();

        for (module, set) in sets {
            for definition in set.definitions() {
                if !settings.is_tool_enabled(definition.name) {
                    tracing::debug!(module = *module, tool = definition.name, "tool disabled");
                    continue;
                }
                if tools.contains_key(definition.name) {
                    tracing::warn!(module = *module, tool = definition.name, "duplicate tool name ignored");
                    continue;
                }
                let input_schema: JsonObject = match definition.input_schema {
                    Value::Object(schema) => schema,
                    _ => JsonObject::new(),
                };
                let tool = Tool::new(
                    definition.name,
                    settings.tool_description(definition.name).to_string(),
                    Arc::new(input_schema),
                );
                tools.insert(
                    definition.name.to_string(),
                    RegisteredTool {
                        tool,
                        set: set.clone(),
                    },
                );
            }
        }

        Self { tools }
    }

    /// Enabled tool names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Wire descriptions of every enabled tool, in name order.
    pub fn listing(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values().map(|registered| &registered.tool)
    }

    /// Dispatch to the owning tool set; `None` for unknown or disabled names.
    pub fn call(&self, name: &str, args: Value) -> Option<ToolFuture> {
        self.tools.get(name).and_then(|tool| tool.set.call(name, args))
    }
}
