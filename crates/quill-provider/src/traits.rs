//! Provider trait definition.

use crate::error::ProviderError;
use crate::types::{ModelInfo, Request, StreamEvent};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Trait for chat backend implementations.
///
/// Providers handle communication with a chat-completion API and normalize
/// its streamed output into [`StreamEvent`]s.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Models this provider knows about (with pricing where available).
    fn models(&self) -> Vec<ModelInfo>;

    /// Currently selected model identifier.
    fn current_model(&self) -> &str;

    /// Switch to a different model.
    fn set_model(&mut self, model: &str) -> Result<(), ProviderError>;

    /// Metadata for the current model, if it is a known one.
    fn current_model_info(&self) -> Option<ModelInfo> {
        let current = self.current_model();
        self.models().into_iter().find(|m| m.id == current)
    }

    /// Send a streaming request to the provider.
    ///
    /// Returns a stream of `StreamEvent`s as the model generates its response.
    async fn stream(
        &self,
        request: Request,
    ) -> Result<BoxStream<'_, Result<StreamEvent, ProviderError>>, ProviderError>;
}

// Compile-time check: Provider must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Provider) {}
};
