//! Tools defined at runtime from WebAssembly text.
//!
//! A tool module implements a small ABI:
//! - `memory` export for linear memory access.
//! - `alloc(size: i32) -> i32` used to reserve memory for the arguments.
//! - `describe() -> i32` returning a pointer to a NUL-terminated JSON object
//!   `{"name", "description", "parameters"}`.
//! - `execute(ptr: i32, len: i32) -> i32` receiving the JSON arguments and
//!   returning a pointer to a NUL-terminated UTF-8 result.
//!
//! No host functions are linked, so a module can only compute on its input.
//! Every call gets a fresh `Store`.

use crate::error::ToolError;
use crate::traits::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use wasmtime::{Config, Engine, Instance, Linker, Memory, Module, Store};

const MAX_OUTPUT_BYTES: usize = 1024 * 1024;
const FUEL_PER_CALL: u64 = 500_000_000;

/// Why a tool definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid module syntax: {0}")]
    SyntaxInvalid(String),

    #[error("Failed to define tool: {0}")]
    DefinitionFailed(String),

    #[error("Tool {0} not found after evaluation")]
    NotFoundAfterEval(String),

    #[error("{name} does not satisfy the tool contract: {reason}")]
    ContractViolation { name: String, reason: String },
}

/// Compiles tool sources into [`WasmTool`]s sharing one engine.
#[derive(Clone)]
pub struct WasmToolLoader {
    engine: Engine,
}

impl WasmToolLoader {
    pub fn new() -> Result<Self, LoadError> {
        let mut config = Config::new();
        config.async_support(true);
        config.consume_fuel(true);
        let engine =
            Engine::new(&config).map_err(|e| LoadError::DefinitionFailed(format!("{e:#}")))?;
        Ok(Self { engine })
    }

    /// Parse, compile, instantiate and contract-check `source`.
    ///
    /// The module must describe itself as `declared_name`.
    pub async fn load(&self, source: &str, declared_name: &str) -> Result<WasmTool, LoadError> {
        let bytes = wat::parse_str(source).map_err(|e| {
            let message = e.to_string();
            LoadError::SyntaxInvalid(message.lines().next().unwrap_or_default().to_string())
        })?;

        let module = Module::from_binary(&self.engine, &bytes)
            .map_err(|e| LoadError::DefinitionFailed(format!("{e:#}")))?;
        let (mut store, instance) = instantiate(&self.engine, &module)
            .await
            .map_err(|e| LoadError::DefinitionFailed(format!("{e:#}")))?;

        let contract = |reason: &str| LoadError::ContractViolation {
            name: declared_name.to_string(),
            reason: reason.to_string(),
        };

        let describe = instance
            .get_typed_func::<(), i32>(&mut store, "describe")
            .map_err(|_| LoadError::NotFoundAfterEval(declared_name.to_string()))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| contract("missing exported `memory`"))?;

        let ptr = describe
            .call_async(&mut store, ())
            .await
            .map_err(|e| LoadError::DefinitionFailed(format!("describe trapped: {e:#}")))?;
        let raw = read_nul_terminated(&store, &memory, ptr)
            .map_err(|reason| contract(&format!("describe output: {reason}")))?;
        let described: Value = serde_json::from_str(&raw)
            .map_err(|e| contract(&format!("describe must return a JSON object: {e}")))?;

        if described.get("name").and_then(Value::as_str) != Some(declared_name) {
            return Err(LoadError::NotFoundAfterEval(declared_name.to_string()));
        }

        if instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .is_err()
        {
            return Err(contract("`alloc` must be exported as (i32) -> i32"));
        }
        if instance
            .get_typed_func::<(i32, i32), i32>(&mut store, "execute")
            .is_err()
        {
            return Err(contract("`execute` must be exported as (i32, i32) -> i32"));
        }

        let description = described
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| contract("`description` must be a non-empty string"))?
            .to_string();
        let parameters = described
            .get("parameters")
            .filter(|p| p.is_object())
            .cloned()
            .ok_or_else(|| contract("`parameters` must be a JSON schema object"))?;
        if let Err(err) = jsonschema::validator_for(&parameters) {
            return Err(contract(&format!("`parameters` is not a valid JSON schema: {err}")));
        }

        tracing::info!(tool = declared_name, "dynamic tool passed contract checks");
        Ok(WasmTool {
            name: declared_name.to_string(),
            description,
            parameters,
            engine: self.engine.clone(),
            module,
        })
    }
}

/// A tool backed by a compiled WebAssembly module.
pub struct WasmTool {
    name: String,
    description: String,
    parameters: Value,
    engine: Engine,
    module: Module,
}

impl WasmTool {
    async fn call(&self, input: &str) -> Result<String, String> {
        let (mut store, instance) = instantiate(&self.engine, &self.module)
            .await
            .map_err(|e| format!("failed to instantiate: {e:#}"))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or("missing exported memory")?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .map_err(|e| e.to_string())?;
        let execute = instance
            .get_typed_func::<(i32, i32), i32>(&mut store, "execute")
            .map_err(|e| e.to_string())?;

        let input_bytes = input.as_bytes();
        let input_len =
            i32::try_from(input_bytes.len()).map_err(|_| "input exceeds 32-bit limit")?;
        let input_ptr = alloc
            .call_async(&mut store, input_len)
            .await
            .map_err(|e| format!("alloc trapped: {e:#}"))?;
        let offset = usize::try_from(input_ptr).map_err(|_| "alloc returned a negative pointer")?;
        memory
            .write(&mut store, offset, input_bytes)
            .map_err(|e| format!("failed to copy arguments: {e}"))?;

        let output_ptr = execute
            .call_async(&mut store, (input_ptr, input_len))
            .await
            .map_err(|e| format!("execution trapped: {e:#}"))?;
        read_nul_terminated(&store, &memory, output_ptr)
    }
}

#[async_trait]
impl Tool for WasmTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let output = self
            .call(&args.to_string())
            .await
            .map_err(|e| ToolError::ExecutionError(format!("{}: {e}", self.name)))?;

        // JSON output is passed through as structured content.
        Ok(match serde_json::from_str::<Value>(&output) {
            Ok(value) => ToolResult::success(value),
            Err(_) => ToolResult::success(output),
        })
    }
}

async fn instantiate(engine: &Engine, module: &Module) -> wasmtime::Result<(Store<()>, Instance)> {
    let linker: Linker<()> = Linker::new(engine);
    let mut store = Store::new(engine, ());
    store.set_fuel(FUEL_PER_CALL)?;
    let instance = linker.instantiate_async(&mut store, module).await?;
    Ok((store, instance))
}

fn read_nul_terminated(store: &Store<()>, memory: &Memory, ptr: i32) -> Result<String, String> {
    let start = usize::try_from(ptr).map_err(|_| format!("negative pointer {ptr}"))?;
    let data = memory.data(store);
    if start >= data.len() {
        return Err(format!("pointer {start} is outside module memory"));
    }

    let upper = data.len().min(start + MAX_OUTPUT_BYTES + 1);
    let end = data[start..upper]
        .iter()
        .position(|b| *b == 0)
        .map(|n| start + n)
        .ok_or_else(|| format!("output exceeded {MAX_OUTPUT_BYTES} bytes or lacked a terminator"))?;

    String::from_utf8(data[start..end].to_vec()).map_err(|_| "output is not UTF-8".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Module that describes itself as `{NAME}` and echoes its arguments.
    const ECHO_TEMPLATE: &str = r#"
(module
  (memory (export "memory") 1)
  (data (i32.const 0) "{\"name\":\"{NAME}\",\"description\":\"Echo the arguments back\",\"parameters\":{\"type\":\"object\",\"properties\":{\"text\":{\"type\":\"string\"}}}}\00")
  (global $heap (mut i32) (i32.const 1024))
  (func $alloc (export "alloc") (param $size i32) (result i32)
    (local $old i32)
    (local.set $old (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (i32.add (local.get $size) (i32.const 1))))
    (local.get $old))
  (func (export "describe") (result i32) (i32.const 0))
  (func (export "execute") (param $ptr i32) (param $len i32) (result i32)
    (i32.store8 (i32.add (local.get $ptr) (local.get $len)) (i32.const 0))
    (local.get $ptr)))
"#;

    pub(crate) fn echo_module(name: &str) -> String {
        ECHO_TEMPLATE.replace("{NAME}", name)
    }

    fn loader() -> WasmToolLoader {
        WasmToolLoader::new().unwrap()
    }

    #[tokio::test]
    async fn test_load_and_execute_echo() {
        let tool = loader().load(&echo_module("Echo"), "Echo").await.unwrap();
        assert_eq!(tool.name(), "Echo");
        assert_eq!(tool.description(), "Echo the arguments back");
        assert_eq!(tool.parameters_schema()["properties"]["text"]["type"], "string");

        let result = tool
            .execute(serde_json::json!({"text": "hi"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(result.content, serde_json::json!({"text": "hi"}));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_each_call_gets_fresh_state() {
        let tool = loader().load(&echo_module("Echo"), "Echo").await.unwrap();
        for text in ["one", "two"] {
            let result = tool
                .execute(serde_json::json!({"text": text}), &ToolContext::default())
                .await
                .unwrap();
            assert_eq!(result.content["text"], text);
        }
    }

    #[tokio::test]
    async fn test_syntax_error_keeps_first_line() {
        let err = loader().load("(module (func", "Broken").await.err().unwrap();
        match err {
            LoadError::SyntaxInvalid(message) => {
                assert!(!message.is_empty());
                assert!(!message.contains('\n'));
            }
            other => panic!("expected SyntaxInvalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trapping_start_function_fails_definition() {
        let source = r#"(module (func $boom unreachable) (start $boom))"#;
        let err = loader().load(source, "Boom").await.err().unwrap();
        assert!(matches!(err, LoadError::DefinitionFailed(_)));
    }

    #[tokio::test]
    async fn test_host_imports_are_not_available() {
        let source = r#"(module (import "env" "system" (func (param i32))))"#;
        let err = loader().load(source, "Shell").await.err().unwrap();
        assert!(matches!(err, LoadError::DefinitionFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_describe_or_wrong_name() {
        let err = loader().load("(module)", "Nothing").await.err().unwrap();
        assert_eq!(err, LoadError::NotFoundAfterEval("Nothing".to_string()));

        let err = loader().load(&echo_module("Echo"), "Other").await.err().unwrap();
        assert_eq!(err, LoadError::NotFoundAfterEval("Other".to_string()));
    }

    #[tokio::test]
    async fn test_missing_execute_is_contract_violation() {
        let source = echo_module("Echo").replace("(export \"execute\")", "");
        let err = loader().load(&source, "Echo").await.err().unwrap();
        assert!(matches!(err, LoadError::ContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_parameter_schema_is_contract_violation() {
        let source = echo_module("Echo").replace(
            r#"{\"type\":\"object\",\"properties\""#,
            r#"{\"type\":42,\"properties\""#,
        );
        let err = loader().load(&source, "Echo").await.err().unwrap();
        assert!(matches!(err, LoadError::ContractViolation { .. }));
    }

    #[tokio::test]
    async fn test_trap_during_execute_is_tool_error() {
        let source = echo_module("Echo").replace(
            "(i32.store8 (i32.add (local.get $ptr) (local.get $len)) (i32.const 0))",
            "unreachable",
        );
        let tool = loader().load(&source, "Echo").await.unwrap();
        let err = tool
            .execute(serde_json::json!({}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("trapped"));
    }
}
