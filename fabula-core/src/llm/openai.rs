//! OpenAI-compatible chat completions client implementing [`LlmClient`].
//!
//! Works against the real OpenAI API or any OpenAI-compatible endpoint (set via
//! `OPENAI_API_BASE`); this is how a tenant's self-hosted or third-party model
//! provider is plugged in without a second client implementation.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use super::{LlmClient, LlmError, LlmResponse, LlmUsage, Message, Role};

/// Chat completions client backed by `async-openai`.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl ChatOpenAI {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Points the client at a custom base URL (self-hosted vLLM, Azure, ...).
    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_base(api_base);
        self.client = Client::with_config(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request_messages(
        messages: &[Message],
    ) -> Result<Vec<async_openai::types::ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string())),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string())),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(m.content.clone())
                    .build()
                    .map(Into::into)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string())),
            })
            .collect()
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let request_messages = Self::build_request_messages(messages)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(request_messages)
            .build()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs_f64()))?
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".into()))?;
        let content = choice.message.content.unwrap_or_default();
        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<fabula_protocol::ProtocolEvent>>,
    ) -> Result<LlmResponse, LlmError> {
        let request_messages = Self::build_request_messages(messages)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(request_messages)
            .stream(true)
            .build()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let mut content = String::new();
        let mut usage = None;

        loop {
            let next = tokio::time::timeout(self.timeout, stream.next()).await;
            let Ok(Some(chunk)) = next else {
                match next {
                    Err(_) => return Err(LlmError::Timeout(self.timeout.as_secs_f64())),
                    Ok(None) => break,
                    _ => unreachable!(),
                }
            };
            let chunk = chunk.map_err(|e| LlmError::Unavailable(e.to_string()))?;
            if let Some(u) = chunk.usage {
                usage = Some(LlmUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
            }
            if let Some(choice) = chunk.choices.into_iter().next() {
                if let Some(delta) = choice.delta.content {
                    if !delta.is_empty() {
                        content.push_str(&delta);
                        if let Some(tx) = &chunk_tx {
                            let _ = tx
                                .send(fabula_protocol::ProtocolEvent::chunk(delta))
                                .await;
                        }
                    }
                }
            }
        }

        Ok(LlmResponse { content, usage })
    }
}
