//! Capability registry: the set of tools the model may invoke.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use tools::{Tool, ToolError, ToolSpec};
use tracing::debug;

/// Holds the invocable tools, keyed by unique name.
///
/// Filled once at startup and read-only afterwards. The registry does no
/// schema validation; each tool checks its own arguments.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of tools, failing on the first duplicate.
    pub fn with_tools(tools: impl IntoIterator<Item = Box<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }
        debug!(tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Find a tool by exact name.
    pub fn lookup(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Run a tool with the given argument payload.
    pub fn invoke(&self, name: &str, arguments: Value) -> std::result::Result<String, ToolError> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments)
    }

    /// Specifications of every tool, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// `- name: description` lines, in registration order.
    pub fn descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}
