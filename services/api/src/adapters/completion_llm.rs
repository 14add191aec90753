//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the fix-generating LLM.
//! It implements the `CompletionService` port from the `core` crate against any
//! OpenAI-compatible chat completions endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use site_audit_core::ports::{CompletionService, GenerationError};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client from an API key and an optional base URL.
    pub fn from_settings(api_key: &str, base_url: Option<&str>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = base_url {
            config = config.with_api_base(base);
        }
        Self::new(Client::with_config(config), model)
    }
}

/// Request-building failures are bugs on our side, not the service's.
fn build_error(e: OpenAIError) -> GenerationError {
    GenerationError::Unparsable(format!("could not build request: {}", e))
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(build_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(build_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(build_error)?;

        // Any API failure counts as the service being unreachable.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| GenerationError::Unreachable(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        match response.choices.into_iter().next() {
            Some(choice) => choice.message.content.ok_or_else(|| {
                GenerationError::Unparsable(
                    "Fix generation LLM response contained no text content.".to_string(),
                )
            }),
            None => Err(GenerationError::Unparsable(
                "Fix generation LLM returned no choices in its response.".to_string(),
            )),
        }
    }
}
