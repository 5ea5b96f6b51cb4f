//! OpenRouter provider.

use crate::providers::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
use crate::types::{ModelInfo, ModelPricing};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Create an OpenRouter provider.
///
/// OpenRouter fronts hundreds of models, so unlisted ids are accepted; they
/// just have no pricing.
pub fn new_openrouter_provider(api_key: String) -> OpenAiCompatProvider {
    let config = OpenAiCompatConfig {
        base_url: OPENROUTER_BASE_URL.to_string(),
        api_key,
        provider_name: "openrouter".to_string(),
        default_model: "openai/gpt-4o-mini".to_string(),
        models: vec![
            ModelInfo {
                id: "openai/gpt-4o-mini".to_string(),
                name: "GPT-4o mini".to_string(),
                context_window: 128_000,
                max_output_tokens: 16_384,
                supports_tools: true,
                pricing: Some(ModelPricing {
                    input_per_million: 0.15,
                    output_per_million: 0.60,
                }),
            },
            ModelInfo {
                id: "anthropic/claude-3.5-sonnet".to_string(),
                name: "Claude 3.5 Sonnet".to_string(),
                context_window: 200_000,
                max_output_tokens: 8_192,
                supports_tools: true,
                pricing: Some(ModelPricing {
                    input_per_million: 3.00,
                    output_per_million: 15.00,
                }),
            },
        ],
        accept_any_model: true,
    };

    OpenAiCompatProvider::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Provider;

    #[test]
    fn test_openrouter_defaults() {
        let p = new_openrouter_provider("key".to_string());
        assert_eq!(p.name(), "openrouter");
        assert_eq!(p.base_url(), "https://openrouter.ai/api/v1");
        assert!(p.current_model_info().is_some());
    }

    #[test]
    fn test_openrouter_unlisted_model_has_no_pricing() {
        let mut p = new_openrouter_provider("key".to_string());
        p.set_model("meta-llama/llama-3.1-70b-instruct").unwrap();
        assert!(p.current_model_info().is_none());
    }
}
