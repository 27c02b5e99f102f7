pub mod mock;
pub mod openai;

use crate::llm::LlmClient;
use anyhow::Result;
use std::sync::Arc;
use vesper_core::config::LlmConfig;

/// Build the client named by `config.provider`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(openai::OpenAiClient::new(
            &config.model,
            config.base_url.as_deref(),
        )?)),
        "mock" => Ok(Arc::new(mock::MockProvider::new(&config.model))),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}
