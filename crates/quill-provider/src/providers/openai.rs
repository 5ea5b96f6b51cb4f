//! OpenAI provider built on the OpenAI-compatible transport.

use crate::providers::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
use crate::types::{ModelInfo, ModelPricing};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn model(id: &str, name: &str, context_window: usize, input: f64, output: f64) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        context_window,
        max_output_tokens: 16_384,
        supports_tools: true,
        pricing: Some(ModelPricing {
            input_per_million: input,
            output_per_million: output,
        }),
    }
}

/// Create a new OpenAI provider.
///
/// The key usually comes from `OPENAI_API_KEY`.
pub fn new_openai_provider(api_key: String) -> OpenAiCompatProvider {
    let config = OpenAiCompatConfig {
        base_url: OPENAI_BASE_URL.to_string(),
        api_key,
        provider_name: "openai".to_string(),
        default_model: "gpt-4o".to_string(),
        models: vec![
            model("gpt-4o", "GPT-4o", 128_000, 2.50, 10.00),
            model("gpt-4o-mini", "GPT-4o mini", 128_000, 0.15, 0.60),
            model("gpt-4.1", "GPT-4.1", 1_047_576, 2.00, 8.00),
            model("gpt-4.1-mini", "GPT-4.1 mini", 1_047_576, 0.40, 1.60),
        ],
        accept_any_model: false,
    };

    OpenAiCompatProvider::new(config)
}
