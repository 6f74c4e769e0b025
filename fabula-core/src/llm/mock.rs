//! Fixed/scripted LLM client for tests and the `fabula-cli` dry-run path.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LlmClient, LlmError, LlmResponse, Message};

/// Returns a fixed response, or cycles through a scripted sequence of responses.
///
/// Used by orchestrator tests in place of a real OpenAI call; each orchestrator
/// test scenario scripts the exact turns it expects (see spec end-to-end scenarios).
pub struct MockLlm {
    responses: Mutex<Vec<String>>,
    default_response: String,
}

impl MockLlm {
    /// A mock that always returns the same content.
    pub fn fixed(content: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default_response: content.into(),
        }
    }

    /// A mock that returns each scripted response in order, then repeats the last one.
    pub fn scripted(responses: Vec<String>) -> Self {
        let default_response = responses.last().cloned().unwrap_or_default();
        Self {
            responses: Mutex::new(responses),
            default_response,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, LlmError> {
        let mut queue = self.responses.lock().await;
        let content = if queue.is_empty() {
            self.default_response.clone()
        } else {
            queue.remove(0)
        };
        Ok(LlmResponse {
            content,
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_always_returns_same_content() {
        let llm = MockLlm::fixed("chapter text");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "chapter text");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "chapter text");
    }

    #[tokio::test]
    async fn scripted_returns_in_order_then_repeats_last() {
        let llm = MockLlm::scripted(vec!["first".into(), "second".into()]);
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "first");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "second");
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "second");
    }
}
