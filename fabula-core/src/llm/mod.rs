//! LLM client abstraction (C2).
//!
//! Orchestrators depend on a callable that takes a composed prompt (system + user
//! turns) and returns assistant text, optionally streaming token deltas as they
//! arrive. `MockLlm` is used in tests; `ChatOpenAI` talks to an OpenAI-compatible
//! chat completions endpoint via `async-openai`.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// One turn in a chat-style prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Errors from an `LlmClient` call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm provider unreachable: {0}")]
    Unavailable(String),
    #[error("llm call timed out after {0:.1}s")]
    Timeout(f64),
    #[error("llm returned invalid response: {0}")]
    InvalidResponse(String),
    #[error("llm rate limited: {0}")]
    RateLimited(String),
}

/// Token usage for one LLM call, when the provider reports it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM completion.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<LlmUsage>,
}

/// Governs whether `generate_with_tools` offers tools to the model at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolChoice {
    /// Offer the tool catalog; the model decides whether to call one.
    Auto,
    /// Offer the tool catalog and keep dispatching until a round produces no
    /// further call or `max_rounds` is exhausted.
    Required,
    /// Skip the catalog entirely and fall back to a plain `invoke`.
    None,
}

/// Outcome of a (possibly multi-round) tool-augmented generation.
#[derive(Clone, Debug, Default)]
pub struct ToolGenerationResult {
    pub content: String,
    pub tool_calls_made: u32,
}

/// One assistant-proposed tool call, parsed out of a completion's content.
#[derive(Debug, Clone)]
struct ParsedToolCall {
    name: String,
    arguments: serde_json::Value,
}

/// Looks for a trailing `{"tool_call": {"name": ..., "arguments": {...}}}` object
/// in `content` and parses it. Tolerates markdown code fences around the JSON,
/// matching the fence-stripping convention the analysis ingestor (C9) already uses
/// when pulling a JSON object out of free-form model output.
fn parse_tool_call(content: &str) -> Option<ParsedToolCall> {
    let stripped = crate::retry::strip_json_fences(content.trim());
    let value: serde_json::Value = serde_json::from_str(stripped.trim()).ok()?;
    let call = value.get("tool_call")?;
    let name = call.get("name")?.as_str()?.to_string();
    let arguments = call.get("arguments").cloned().unwrap_or(serde_json::json!({}));
    Some(ParsedToolCall { name, arguments })
}

/// Renders a tool catalog and the calling convention into a system-turn block so the
/// model knows what it can invoke and how to ask for it.
fn render_tool_catalog(specs: &[crate::tool_source::ToolSpec]) -> String {
    let mut out = String::from(
        "You may call a tool by replying with exactly one JSON object of the form \
         {\"tool_call\": {\"name\": \"<tool>\", \"arguments\": {...}}} and nothing else. \
         Reply with plain prose once you have what you need. Available tools:\n",
    );
    for spec in specs {
        out.push_str(&format!(
            "- {}: {}\n",
            spec.name,
            spec.description.as_deref().unwrap_or("(no description)")
        ));
    }
    out
}

/// LLM client: given a composed prompt, returns assistant text.
///
/// Orchestrators call this once per generation step (a chapter draft, an outline
/// continuation, a wizard stage). `invoke_stream` additionally emits token deltas
/// as `fabula_protocol::ProtocolEvent::Chunk` on `chunk_tx` so the SSE emitter (C5)
/// can forward prose to the client as it is produced.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn: read messages, return assistant content and usage.
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, LlmError>;

    /// Streaming variant. Default implementation calls `invoke` and emits the
    /// full content as a single chunk; `ChatOpenAI` overrides this to forward
    /// real token deltas.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<fabula_protocol::ProtocolEvent>>,
    ) -> Result<LlmResponse, LlmError> {
        let response = self.invoke(messages).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(fabula_protocol::ProtocolEvent::chunk(response.content.clone()))
                    .await;
            }
        }
        Ok(response)
    }

    /// Tool-augmented generation (§4.2): offers `tools`'s catalog to the model and
    /// dispatches any requested calls through it, up to `max_rounds` times, before
    /// returning the final prose. The adapter never touches a tenant store directly;
    /// `tools` is the only side channel a call can take. Default implementation
    /// drives this over plain `invoke` calls using a JSON calling convention, so any
    /// `LlmClient` gets working tool dispatch without overriding this method.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &dyn crate::tool_source::ToolSource,
        max_rounds: u32,
        tool_choice: ToolChoice,
    ) -> Result<ToolGenerationResult, LlmError> {
        if tool_choice == ToolChoice::None || max_rounds == 0 {
            let response = self.invoke(&[Message::user(prompt)]).await?;
            return Ok(ToolGenerationResult {
                content: response.content,
                tool_calls_made: 0,
            });
        }

        let specs = tools.list_tools().await.unwrap_or_default();
        if specs.is_empty() {
            let response = self.invoke(&[Message::user(prompt)]).await?;
            return Ok(ToolGenerationResult {
                content: response.content,
                tool_calls_made: 0,
            });
        }

        let mut transcript = vec![Message::system(render_tool_catalog(&specs)), Message::user(prompt)];
        let mut tool_calls_made = 0;

        for _ in 0..max_rounds {
            let response = self.invoke(&transcript).await?;
            match parse_tool_call(&response.content) {
                Some(call) => {
                    transcript.push(Message::assistant(response.content.clone()));
                    let result = tools.call_tool(&call.name, call.arguments).await;
                    let observation = match result {
                        Ok(content) => content.text,
                        Err(e) => format!("tool call failed: {e}"),
                    };
                    transcript.push(Message::user(format!("Tool result:\n{observation}")));
                    tool_calls_made += 1;
                }
                None => {
                    return Ok(ToolGenerationResult {
                        content: response.content,
                        tool_calls_made,
                    });
                }
            }
        }

        let response = self.invoke(&transcript).await?;
        Ok(ToolGenerationResult {
            content: response.content,
            tool_calls_made,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: self.content.clone(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn default_invoke_stream_sends_single_chunk_when_enabled() {
        let llm = StubLlm {
            content: "hello".to_string(),
        };
        let (tx, mut rx) = mpsc::channel(2);
        let resp = llm.invoke_stream(&[], Some(tx)).await.unwrap();
        assert_eq!(resp.content, "hello");
        let event = rx.recv().await.expect("one chunk");
        match event {
            fabula_protocol::ProtocolEvent::Chunk { content } => assert_eq!(content, "hello"),
            _ => panic!("expected Chunk"),
        }
    }

    #[tokio::test]
    async fn default_invoke_stream_skips_chunk_for_empty_content() {
        let llm = StubLlm {
            content: String::new(),
        };
        let (tx, mut rx) = mpsc::channel(2);
        let resp = llm.invoke_stream(&[], Some(tx)).await.unwrap();
        assert!(resp.content.is_empty());
        assert!(rx.try_recv().is_err());
    }

    struct OneTool;

    #[async_trait]
    impl crate::tool_source::ToolSource for OneTool {
        async fn list_tools(&self) -> Result<Vec<crate::tool_source::ToolSpec>, crate::tool_source::ToolSourceError> {
            Ok(vec![crate::tool_source::ToolSpec {
                name: "lookup".into(),
                description: Some("looks something up".into()),
                input_schema: serde_json::json!({}),
            }])
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: serde_json::Value,
        ) -> Result<crate::tool_source::ToolCallContent, crate::tool_source::ToolSourceError> {
            assert_eq!(name, "lookup");
            Ok(crate::tool_source::ToolCallContent {
                text: format!("result for {arguments}"),
            })
        }
    }

    #[tokio::test]
    async fn generate_with_tools_dispatches_one_round_then_returns_final_content() {
        let llm = MockLlm::scripted(vec![
            r#"{"tool_call": {"name": "lookup", "arguments": {"q": "castle"}}}"#.to_string(),
            "the castle has three towers".to_string(),
        ]);
        let result = llm
            .generate_with_tools("describe the castle", &OneTool, 4, ToolChoice::Auto)
            .await
            .unwrap();
        assert_eq!(result.tool_calls_made, 1);
        assert_eq!(result.content, "the castle has three towers");
    }

    #[tokio::test]
    async fn generate_with_tools_skips_catalog_when_choice_is_none() {
        let llm = MockLlm::fixed("plain answer");
        let result = llm
            .generate_with_tools("anything", &OneTool, 4, ToolChoice::None)
            .await
            .unwrap();
        assert_eq!(result.tool_calls_made, 0);
        assert_eq!(result.content, "plain answer");
    }

    struct NoTools;

    #[async_trait]
    impl crate::tool_source::ToolSource for NoTools {
        async fn list_tools(&self) -> Result<Vec<crate::tool_source::ToolSpec>, crate::tool_source::ToolSourceError> {
            Ok(vec![])
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> Result<crate::tool_source::ToolCallContent, crate::tool_source::ToolSourceError> {
            Err(crate::tool_source::ToolSourceError::UnknownTool(name.to_string()))
        }
    }

    #[tokio::test]
    async fn generate_with_tools_falls_back_when_no_tools_available() {
        let llm = MockLlm::fixed("no tools needed");
        let result = llm
            .generate_with_tools("anything", &NoTools, 4, ToolChoice::Auto)
            .await
            .unwrap();
        assert_eq!(result.tool_calls_made, 0);
        assert_eq!(result.content, "no tools needed");
    }

    #[test]
    fn parse_tool_call_extracts_name_and_arguments() {
        let call = parse_tool_call(r#"```json
{"tool_call": {"name": "lookup", "arguments": {"q": "castle"}}}
```"#)
        .unwrap();
        assert_eq!(call.name, "lookup");
        assert_eq!(call.arguments, serde_json::json!({"q": "castle"}));
    }

    #[test]
    fn parse_tool_call_none_for_plain_prose() {
        assert!(parse_tool_call("just some prose, no calls here").is_none());
    }
}
