use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::tool::DynTool;

/// Name-keyed collection of the tools the model may choose from.
///
/// Filled once at startup and shared read-only afterwards. Registering a name
/// twice replaces the earlier tool but keeps its original position in
/// [`ToolRegistry::list_names`].
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, DynTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Creates a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers a tool under its own name.
    pub fn register(&mut self, tool: DynTool) {
        let name = tool.name().to_string();
        self.register_as(name, tool);
    }

    /// Registers a tool under an explicit name, replacing any previous entry.
    pub fn register_as(&mut self, name: impl Into<String>, tool: DynTool) {
        let name = name.into();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Tool registered twice, keeping the latest");
        } else {
            self.order.push(name);
        }
    }

    /// Gets a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&DynTool> {
        self.tools.get(name)
    }

    /// Returns registered names in registration order.
    pub fn list_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Iterates over `(name, tool)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynTool)> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).map(|tool| (name.as_str(), tool)))
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}
