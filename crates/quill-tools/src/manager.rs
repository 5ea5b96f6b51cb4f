//! Active tool set and dispatch.
//!
//! [`ToolManager`] owns the registry and the ordered list of active tool
//! names. It is a cheap-clone handle: the agent, the REPL and the
//! session-bound tools (Enabler, Empower) all hold the same one.

use crate::error::RegistryError;
use crate::registry::{ToolEntry, ToolRegistry};
use crate::traits::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Operator confirmation required before a runtime-defined tool is loaded.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Show `source` for the tool `tool_name` and return whether the
    /// operator explicitly agreed.
    async fn approve(&self, tool_name: &str, source: &str) -> bool;
}

/// Gate that declines every request. Used where no operator is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl ApprovalGate for DenyAll {
    async fn approve(&self, tool_name: &str, _source: &str) -> bool {
        tracing::info!(tool = tool_name, "no operator available; declining tool definition");
        false
    }
}

/// Everything a session-bound tool factory may need.
#[derive(Clone)]
pub struct SessionContext {
    pub tools: ToolManager,
    pub approval: Arc<dyn ApprovalGate>,
    pub working_dir: PathBuf,
}

impl SessionContext {
    pub fn new(tools: ToolManager, approval: Arc<dyn ApprovalGate>, working_dir: PathBuf) -> Self {
        Self {
            tools,
            approval,
            working_dir,
        }
    }

    /// Execution context handed to `Tool::execute`.
    pub fn tool_context(&self) -> ToolContext {
        ToolContext {
            working_dir: self.working_dir.clone(),
        }
    }
}

/// Outcome of [`ToolManager::register_dynamic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicRegistration {
    /// Registered and enabled.
    Added,
    /// A tool with that name is already active; nothing changed.
    AlreadyActive,
}

#[derive(Default)]
struct Inner {
    registry: ToolRegistry,
    active: Vec<String>,
    revision: u64,
}

impl Inner {
    fn activate(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.registry.contains(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        if self.active.iter().any(|n| n == name) {
            return Err(RegistryError::AlreadyActive(name.to_string()));
        }
        self.active.push(name.to_string());
        self.revision += 1;
        Ok(())
    }
}

/// Shared handle over the tool registry and the active set.
#[derive(Clone, Default)]
pub struct ToolManager {
    inner: Arc<Mutex<Inner>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic, so a poisoned lock still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a tool without replacing an existing one.
    pub fn register(&self, name: impl Into<String>, entry: ToolEntry) -> Result<(), RegistryError> {
        self.register_with(name, entry, false)
    }

    /// Register a tool, optionally replacing an entry with the same name.
    pub fn register_with(
        &self,
        name: impl Into<String>,
        entry: ToolEntry,
        overwrite: bool,
    ) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        inner.registry.register(name, entry, overwrite)?;
        inner.revision += 1;
        Ok(())
    }

    /// Register a shared tool instance under its own name.
    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        self.register(name, ToolEntry::Ready(tool))
    }

    /// Add `name` to the active set, reporting why it could not be added.
    pub fn activate(&self, name: &str) -> Result<(), RegistryError> {
        let result = self.lock().activate(name);
        if let Err(RegistryError::AlreadyActive(_)) = &result {
            tracing::warn!(tool = name, "tool is already active");
        }
        result
    }

    /// Add `name` to the active set.
    ///
    /// Returns false, leaving the state unchanged, when the name is unknown
    /// or already active.
    pub fn enable(&self, name: &str) -> bool {
        match self.activate(name) {
            Ok(()) => {
                tracing::debug!(tool = name, "tool enabled");
                true
            }
            Err(RegistryError::AlreadyActive(_)) => false,
            Err(err) => {
                tracing::debug!(tool = name, error = %err, "cannot enable tool");
                false
            }
        }
    }

    /// Remove `name` from the active set. Returns false if it was not active.
    pub fn disable(&self, name: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.active.len();
        inner.active.retain(|n| n != name);
        let removed = inner.active.len() != before;
        if removed {
            inner.revision += 1;
        }
        removed
    }

    /// Deactivate every tool. Registrations are kept.
    pub fn disable_all(&self) {
        let mut inner = self.lock();
        if !inner.active.is_empty() {
            inner.active.clear();
            inner.revision += 1;
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().registry.contains(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.lock().active.iter().any(|n| n == name)
    }

    /// Active names in enable order.
    pub fn active_names(&self) -> Vec<String> {
        self.lock().active.clone()
    }

    /// Registered names that are not currently active, in registration order.
    pub fn inactive_names(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .registry
            .names()
            .into_iter()
            .filter(|name| !inner.active.contains(name))
            .collect()
    }

    /// Every registered name with its active flag, in registration order.
    pub fn status(&self) -> Vec<(String, bool)> {
        let inner = self.lock();
        inner
            .registry
            .names()
            .into_iter()
            .map(|name| {
                let active = inner.active.contains(&name);
                (name, active)
            })
            .collect()
    }

    /// Counter bumped on every registry or active-set change.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Get a clone of the entry registered under `name`.
    pub fn entry(&self, name: &str) -> Result<ToolEntry, RegistryError> {
        self.lock().registry.lookup(name).cloned()
    }

    /// Instantiate the active tools, in active-set order.
    ///
    /// Factories run after the lock is released, so they are free to query
    /// the manager themselves.
    pub fn resolve(&self, ctx: &SessionContext) -> Vec<Arc<dyn Tool>> {
        let entries: Vec<(String, ToolEntry)> = {
            let inner = self.lock();
            inner
                .active
                .iter()
                .filter_map(|name| match inner.registry.lookup(name) {
                    Ok(entry) => Some((name.clone(), entry.clone())),
                    Err(err) => {
                        tracing::warn!(tool = %name, error = %err, "active tool has no registry entry");
                        None
                    }
                })
                .collect()
        };

        entries
            .into_iter()
            .map(|(_, entry)| entry.instantiate(ctx))
            .collect()
    }

    /// Register a tool defined at runtime and enable it in one step.
    ///
    /// An active tool with the same name is left untouched; a registered but
    /// inactive one is a duplicate-name error.
    pub fn register_dynamic(
        &self,
        name: &str,
        tool: Arc<dyn Tool>,
    ) -> Result<DynamicRegistration, RegistryError> {
        let mut inner = self.lock();
        if inner.active.iter().any(|n| n == name) {
            return Ok(DynamicRegistration::AlreadyActive);
        }
        inner
            .registry
            .register(name, ToolEntry::Ready(tool), false)?;
        inner.activate(name)?;
        Ok(DynamicRegistration::Added)
    }
}

/// Execute `name` from an already resolved tool list.
///
/// Any error becomes an `{"error": ...}` result.
pub async fn dispatch(
    resolved: &[Arc<dyn Tool>],
    name: &str,
    args: Value,
    ctx: &ToolContext,
) -> ToolResult {
    let Some(tool) = resolved.iter().find(|t| t.name() == name) else {
        tracing::warn!(tool = name, "call to inactive tool");
        return ToolResult::error(format!("Tool '{name}' is not active"));
    };

    match tool.execute(args, ctx).await {
        Ok(result) => result,
        Err(err) => {
            tracing::debug!(tool = name, error = %err, "tool execution failed");
            ToolResult::error(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Named(String);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            &self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
            if args.get("fail").is_some() {
                return Err(ToolError::ExecutionError("boom".to_string()));
            }
            Ok(ToolResult::success(self.0.clone()))
        }
    }

    fn named(name: &str) -> Arc<dyn Tool> {
        Arc::new(Named(name.to_string()))
    }

    fn manager_with(names: &[&str]) -> ToolManager {
        let manager = ToolManager::new();
        for name in names {
            manager.register_tool(named(name)).unwrap();
        }
        manager
    }

    fn session(manager: &ToolManager) -> SessionContext {
        SessionContext::new(manager.clone(), Arc::new(DenyAll), PathBuf::from("."))
    }

    #[test]
    fn test_enable_unknown_and_duplicate() {
        let manager = manager_with(&["A", "B"]);
        assert!(!manager.enable("Missing"));
        assert!(manager.active_names().is_empty());

        assert!(manager.enable("A"));
        let revision = manager.revision();
        assert!(!manager.enable("A"));
        assert_eq!(manager.active_names(), vec!["A"]);
        assert_eq!(manager.revision(), revision);
    }

    #[test]
    fn test_activate_reports_reason() {
        let manager = manager_with(&["A"]);
        assert_eq!(
            manager.activate("X"),
            Err(RegistryError::NotFound("X".to_string()))
        );
        manager.activate("A").unwrap();
        assert_eq!(
            manager.activate("A"),
            Err(RegistryError::AlreadyActive("A".to_string()))
        );
    }

    #[test]
    fn test_resolve_follows_enable_order() {
        let manager = manager_with(&["A", "B", "C"]);
        manager.enable("C");
        manager.enable("A");

        let ctx = session(&manager);
        let names: Vec<String> = manager
            .resolve(&ctx)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["C", "A"]);
    }

    #[test]
    fn test_disable_and_disable_all() {
        let manager = manager_with(&["A", "B"]);
        manager.enable("A");
        manager.enable("B");

        assert!(manager.disable("A"));
        assert!(!manager.disable("A"));
        assert_eq!(manager.active_names(), vec!["B"]);

        manager.disable_all();
        assert!(manager.active_names().is_empty());
        assert!(manager.is_registered("A"));
        assert!(manager.is_registered("B"));
    }

    #[test]
    fn test_resolve_is_repeatable_and_empty_after_disable_all() {
        let manager = ToolManager::new();
        crate::builtin::register_builtins(&manager).unwrap();
        for name in crate::builtin::BUILTIN_TOOLS {
            assert!(manager.enable(name));
        }

        let ctx = session(&manager);
        let names = |tools: Vec<Arc<dyn Tool>>| -> Vec<String> {
            tools.iter().map(|t| t.name().to_string()).collect()
        };
        let first = names(manager.resolve(&ctx));
        let second = names(manager.resolve(&ctx));
        assert_eq!(first, crate::builtin::BUILTIN_TOOLS);
        assert_eq!(first, second);

        manager.disable_all();
        assert!(manager.resolve(&ctx).is_empty());
    }

    #[test]
    fn test_status_marks_active_tools() {
        let manager = manager_with(&["A", "B", "C"]);
        manager.enable("B");
        assert_eq!(
            manager.status(),
            vec![
                ("A".to_string(), false),
                ("B".to_string(), true),
                ("C".to_string(), false),
            ]
        );
        assert_eq!(manager.inactive_names(), vec!["A", "C"]);
    }

    #[test]
    fn test_factory_invoked_on_every_resolution() {
        let manager = ToolManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        manager
            .register(
                "Bound",
                ToolEntry::factory(move |ctx: &SessionContext| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Factories may query the manager while resolving.
                    let active = ctx.tools.active_names().len();
                    named(&format!("Bound{active}"))
                }),
            )
            .unwrap();
        manager.enable("Bound");

        let ctx = session(&manager);
        manager.resolve(&ctx);
        let tools = manager.resolve(&ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(tools[0].name(), "Bound1");
    }

    #[test]
    fn test_register_dynamic() {
        let manager = manager_with(&["A"]);
        manager.enable("A");

        assert_eq!(
            manager.register_dynamic("A", named("A")),
            Ok(DynamicRegistration::AlreadyActive)
        );

        manager.register_tool(named("Idle")).unwrap();
        assert_eq!(
            manager.register_dynamic("Idle", named("Idle")),
            Err(RegistryError::DuplicateName("Idle".to_string()))
        );
        assert!(!manager.is_active("Idle"));

        let revision = manager.revision();
        assert_eq!(
            manager.register_dynamic("Fresh", named("Fresh")),
            Ok(DynamicRegistration::Added)
        );
        assert_eq!(manager.active_names(), vec!["A", "Fresh"]);
        assert!(manager.revision() > revision);
    }

    #[tokio::test]
    async fn test_dispatch_inactive_and_errors() {
        let resolved = vec![named("A")];
        let ctx = ToolContext::default();

        let ok = dispatch(&resolved, "A", serde_json::json!({}), &ctx).await;
        assert_eq!(ok, ToolResult::success("A"));

        let missing = dispatch(&resolved, "B", serde_json::json!({}), &ctx).await;
        assert_eq!(missing.content["error"], "Tool 'B' is not active");

        let failed = dispatch(&resolved, "A", serde_json::json!({"fail": true}), &ctx).await;
        assert!(failed.is_error);
        assert_eq!(failed.content["error"], "Execution error: boom");
    }
}
