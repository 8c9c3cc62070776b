mod mock;
mod openai;

use async_trait::async_trait;

pub use mock::MockModelProvider;
pub use openai::{OpenAiProvider, OpenAiSettings};

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// `None` uses the provider's configured sampling settings.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the assistant's answer. Failures the caller should surface to
    /// users are reported as [`crate::error::ProviderError`] inside the
    /// `anyhow::Error`.
    async fn complete(&self, request: ModelRequest) -> anyhow::Result<String>;
}
