//! Name-to-handler lookup table.

use crate::tools::{
    ContainerLogsTool, DeleteFileTool, ExecuteCommandTool, FetchComposeFileTool, FindFilesTool,
    InspectContainerTool, ListContainersTool, ListDirectoryTool, ReadFileTool,
    RestartContainerTool, ReplaceTextTool, SearchTextTool, StartContainerTool, StopContainerTool,
    Tool, ToolContext, ToolOutput, WriteFileTool,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Registry of callable tools, ordered by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing every built-in tool.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(ExecuteCommandTool);
        registry.register(ListContainersTool);
        registry.register(InspectContainerTool);
        registry.register(StartContainerTool);
        registry.register(StopContainerTool);
        registry.register(RestartContainerTool);
        registry.register(ContainerLogsTool);
        registry.register(ReadFileTool);
        registry.register(WriteFileTool);
        registry.register(ReplaceTextTool);
        registry.register(ListDirectoryTool);
        registry.register(SearchTextTool);
        registry.register(FindFilesTool);
        registry.register(DeleteFileTool);
        registry.register(FetchComposeFileTool);
        registry
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        if self.tools.insert(tool.name(), Arc::new(tool)).is_some() {
            warn!("Replaced previously registered tool");
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Whether a tool with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Iterate over the registered tools in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool descriptors in MCP `tools/list` shape.
    pub fn descriptors(&self) -> Vec<Value> {
        self.iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    /// Call a tool by name. Returns `None` only when the tool does not exist;
    /// every handler failure is folded into an error [`ToolOutput`].
    pub async fn call(&self, ctx: &ToolContext, name: &str, args: Value) -> Option<ToolOutput> {
        let tool = self.get(name)?;
        let start = Instant::now();
        debug!("Calling tool {} with {}", name, args);

        let output = match tool.call(ctx, args).await {
            Ok(text) => ToolOutput::success(ctx.truncate(text)),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                ToolOutput::error(ctx.truncate(e.to_string()))
            }
        };

        info!(
            tool = name,
            is_error = output.is_error,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool call finished"
        );
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tools_registered() {
        let registry = ToolRegistry::with_default_tools();
        let names: Vec<&str> = registry.iter().map(|t| t.name()).collect();

        for expected in [
            "execute-command",
            "list-containers",
            "inspect-container",
            "start-container",
            "stop-container",
            "restart-container",
            "container-logs",
            "read-file",
            "write-file",
            "replace-text",
            "list-directory",
            "search-text",
            "find-files",
            "delete-file",
            "fetch-compose-file",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(registry.len(), 15);
    }

    #[test]
    fn test_descriptors_have_object_schemas() {
        let registry = ToolRegistry::with_default_tools();
        for descriptor in registry.descriptors() {
            assert!(descriptor["name"].is_string());
            assert!(!descriptor["description"].as_str().unwrap().is_empty());
            assert_eq!(descriptor["inputSchema"]["type"], "object");
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("read-file"));
    }
}
