//! quill-tools: the tool registry, the active tool set and the built-in tools.
//!
//! Tools are looked up by name in a [`ToolRegistry`]; the [`ToolManager`]
//! tracks which of them are offered to the model and resolves them into
//! instances before every request. New tools can be registered while a
//! session runs, either from an MCP server or, after operator approval,
//! from WebAssembly text submitted by the model itself (see [`dynamic`]).

pub mod builtin;
pub mod dynamic;
mod error;
mod manager;
mod mcp;
mod paths;
pub mod registry;
pub mod traits;

pub use builtin::{register_builtins, BUILTIN_TOOLS, PLANNER_TOOLS};
pub use dynamic::{LoadError, WasmTool, WasmToolLoader};
pub use error::{RegistryError, ToolError};
pub use manager::{dispatch, ApprovalGate, DenyAll, DynamicRegistration, SessionContext, ToolManager};
pub use mcp::{load_mcp_tools, register_mcp_tools};
pub use registry::{ToolEntry, ToolFactory, ToolRegistry};
pub use traits::{Tool, ToolContext, ToolResult};
