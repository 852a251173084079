//! Adapter from any `edgequake_llm` provider to [`CompletionClient`].
//!
//! Lets a search run against OpenAI, Anthropic, Mistral, Ollama, … with the
//! same instruction and context block the Gemini client sends. Provider
//! errors only expose their rendered message, so they are classified with
//! [`classify_message`].

use crate::completion::{classify_message, CompletionClient, CompletionRequest};
use crate::error::{DocuSearchError, QueryError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
    model: String,
}

impl ProviderClient {
    /// Wrap an already-configured provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            model: model.into(),
        }
    }

    /// Instantiate a named provider (`"openai"`, `"anthropic"`, `"ollama"`, …).
    ///
    /// The provider reads its own credential from the environment
    /// (`OPENAI_API_KEY`, …).
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, DocuSearchError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            DocuSearchError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name, model))
    }
}

fn build_options(request: &CompletionRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        ..Default::default()
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.prompt.as_str()),
        ];
        let options = build_options(request);

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    self.name,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("{} completion failed: {}", self.name, err_msg);
                Err(classify_message(&err_msg))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}
