//! quill-provider: chat backend abstraction and the OpenAI-compatible transport.

mod error;
pub mod providers;
pub mod traits;
pub mod types;

pub use error::ProviderError;
pub use providers::ollama::{new_ollama_provider, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL};
pub use providers::openai::new_openai_provider;
pub use providers::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use providers::openrouter::new_openrouter_provider;
pub use traits::Provider;
pub use types::{
    ModelInfo, ModelPricing, ProviderContent, ProviderMessage, Request, StopReason, StreamEvent,
    ToolDefinition, Usage,
};
