//! Tool registry: every tool the session knows about, active or not.

use crate::error::RegistryError;
use crate::manager::SessionContext;
use crate::traits::Tool;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a session-bound tool from the current session context.
pub type ToolFactory = Arc<dyn Fn(&SessionContext) -> Arc<dyn Tool> + Send + Sync>;

/// How a registered tool is obtained at resolution time.
#[derive(Clone)]
pub enum ToolEntry {
    /// A shared instance, handed out as-is.
    Ready(Arc<dyn Tool>),
    /// Called on every resolution; results are never cached.
    Factory(ToolFactory),
}

impl ToolEntry {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&SessionContext) -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    /// Produce the tool instance for `ctx`.
    pub fn instantiate(&self, ctx: &SessionContext) -> Arc<dyn Tool> {
        match self {
            Self::Ready(tool) => Arc::clone(tool),
            Self::Factory(build) => build(ctx),
        }
    }
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(tool) => f.debug_tuple("Ready").field(&tool.name()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Name → entry map that remembers registration order.
///
/// Entries are only ever added.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `name`.
    ///
    /// With `overwrite == false` an existing name is rejected.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        entry: ToolEntry,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            if !overwrite {
                return Err(RegistryError::DuplicateName(name));
            }
        } else {
            self.order.push(name.clone());
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Get the entry registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&ToolEntry, RegistryError> {
        self.entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Check if a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
