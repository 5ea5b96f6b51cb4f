//! Built-in tool implementations.

pub mod edit_file;
pub mod empower;
pub mod enabler;
pub mod list_files;
pub mod plan;
pub mod read_file;
pub mod run_shell_command;

use crate::dynamic::WasmToolLoader;
use crate::error::RegistryError;
use crate::manager::{SessionContext, ToolManager};
use crate::registry::ToolEntry;
use std::sync::Arc;

/// Every built-in tool, in registration order.
pub const BUILTIN_TOOLS: &[&str] = &[
    "ReadFile",
    "ListFiles",
    "EditFile",
    "RunShellCommand",
    "SavePlan",
    "WritePlan",
    "Empower",
    "Enabler",
];

/// Tools active in the read-mostly planner profile.
pub const PLANNER_TOOLS: &[&str] = &["ReadFile", "ListFiles", "WritePlan", "Enabler"];

/// Register all built-in tools. None of them is enabled.
///
/// Empower is skipped, with a warning, if the wasm engine cannot be created.
pub fn register_builtins(manager: &ToolManager) -> Result<(), RegistryError> {
    manager.register_tool(Arc::new(read_file::ReadFile))?;
    manager.register_tool(Arc::new(list_files::ListFiles))?;
    manager.register_tool(Arc::new(edit_file::EditFile))?;
    manager.register_tool(Arc::new(run_shell_command::RunShellCommand))?;
    manager.register_tool(Arc::new(plan::PlanWriter::save_plan()))?;
    manager.register_tool(Arc::new(plan::PlanWriter::write_plan()))?;

    match WasmToolLoader::new() {
        Ok(loader) => manager.register(
            "Empower",
            ToolEntry::factory(move |ctx: &SessionContext| {
                Arc::new(empower::Empower::for_session(ctx, loader.clone()))
            }),
        )?,
        Err(err) => tracing::warn!(error = %err, "dynamic tools unavailable"),
    }

    manager.register(
        "Enabler",
        ToolEntry::factory(|ctx: &SessionContext| Arc::new(enabler::Enabler::new(ctx))),
    )?;
    Ok(())
}
