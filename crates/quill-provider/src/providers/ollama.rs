//! Local Ollama backend through its OpenAI-compatible endpoint.

use crate::providers::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
use crate::types::ModelInfo;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen3:14b";

/// Create an Ollama provider.
///
/// Local models are free, so no pricing is attached, and any pulled model
/// name is accepted.
pub fn new_ollama_provider(base_url: impl Into<String>) -> OpenAiCompatProvider {
    let config = OpenAiCompatConfig {
        base_url: base_url.into(),
        api_key: String::new(),
        provider_name: "ollama".to_string(),
        default_model: DEFAULT_OLLAMA_MODEL.to_string(),
        models: vec![ModelInfo {
            id: DEFAULT_OLLAMA_MODEL.to_string(),
            name: "Qwen3 14B".to_string(),
            context_window: 40_960,
            max_output_tokens: 8_192,
            supports_tools: true,
            pricing: None,
        }],
        accept_any_model: true,
    };

    OpenAiCompatProvider::new(config)
}
