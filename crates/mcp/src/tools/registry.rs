// MCP tool trait, registry and schema helpers

use crate::protocol::{CallToolResult, ToolAnnotations, ToolSchema};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult>;

    /// Get the tool's tier
    fn tier(&self) -> ToolTier {
        ToolTier::ReadOnly
    }
}

/// Effect a tool has on the managed devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolTier {
    /// Queries only
    ReadOnly,
    /// Changes device state (power actions)
    DeviceControl,
}

impl ToolTier {
    pub fn annotations(&self) -> ToolAnnotations {
        match self {
            Self::ReadOnly => ToolAnnotations {
                read_only_hint: true,
                destructive_hint: false,
                open_world_hint: true,
            },
            Self::DeviceControl => ToolAnnotations {
                read_only_hint: false,
                destructive_hint: true,
                open_world_hint: true,
            },
        }
    }
}

/// Tool registry for managing available tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        if self.tools.insert(schema.name.clone(), tool).is_some() {
            tracing::warn!(tool = %schema.name, "Replaced previously registered tool");
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool schemas, ordered by name, with tier annotations
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|tool| {
                let mut schema = tool.schema();
                schema.annotations.get_or_insert(tool.tier().annotations());
                schema
            })
            .collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: serde_json::Value, required: Vec<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "description": description
    })
}

pub fn json_schema_boolean(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "boolean",
        "description": description
    })
}

pub fn json_schema_enum(values: &[i64], description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "enum": values,
        "description": description
    })
}
