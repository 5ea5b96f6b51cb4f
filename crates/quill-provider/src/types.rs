//! Common types used by the provider trait and implementations.

use serde::{Deserialize, Serialize};

/// A message in provider-native format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Message role (user, assistant, tool).
    pub role: String,
    /// Content blocks.
    pub content: Vec<ProviderContent>,
}

/// Content block in provider-native format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderContent {
    /// Plain text.
    #[serde(rename = "text")]
    Text { text: String },

    /// Tool invocation.
    #[serde(rename = "tool_call")]
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },

    /// Tool result.
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
}

/// Tool definition for the provider API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Request to a provider.
#[derive(Debug, Clone)]
pub struct Request {
    /// Conversation messages.
    pub messages: Vec<ProviderMessage>,
    /// Available tools.
    pub tools: Vec<ToolDefinition>,
    /// System prompt.
    pub system: Option<String>,
    /// Maximum tokens in the response.
    pub max_tokens: Option<usize>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Normal end of response.
    EndTurn,
    /// Model wants to use a tool.
    ToolUse,
    /// Max tokens reached.
    MaxTokens,
}

/// Events emitted during streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A chunk of text output.
    TextDelta { delta: String },
    /// Start of a tool call.
    ToolCallStart { id: String, name: String },
    /// Incremental arguments for a tool call.
    ToolCallDelta { id: String, delta: String },
    /// End of a tool call.
    ToolCallEnd { id: String },
    /// Token usage for the whole request.
    Usage { input: u64, output: u64 },
    /// The model finished; usage may still follow.
    Done { reason: StopReason },
}

/// Price of a model in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    /// Cost of `usage` as `(input, output)` in USD.
    pub fn cost(&self, usage: Usage) -> (f64, f64) {
        (
            usage.input_tokens as f64 * self.input_per_million / 1_000_000.0,
            usage.output_tokens as f64 * self.output_per_million / 1_000_000.0,
        )
    }
}

/// Information about a model supported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "gpt-4o").
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Maximum context window in tokens.
    pub context_window: usize,
    /// Maximum output tokens.
    pub max_output_tokens: usize,
    /// Whether the model supports tool use.
    pub supports_tools: bool,
    /// Price per million tokens, when known.
    pub pricing: Option<ModelPricing>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_cost() {
        let pricing = ModelPricing {
            input_per_million: 2.5,
            output_per_million: 10.0,
        };
        let (input, output) = pricing.cost(Usage {
            input_tokens: 1_000,
            output_tokens: 500,
        });
        assert!((input - 0.0025).abs() < 1e-12);
        assert!((output - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage {
            input_tokens: 12,
            output_tokens: 30,
        };
        assert_eq!(usage.total(), 42);
    }
}
