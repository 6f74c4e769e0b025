//! LLM config block for run config summary.
//!
//! Implements [`ConfigSection`](super::ConfigSection). Never includes an API key.

use super::ConfigSection;

/// LLM configuration summary: provider, model, base URL and call timeout.
pub struct LlmConfigSummary {
    /// `"openai"`, `"mock"`, or the name of an OpenAI-compatible provider.
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: f64,
}

impl ConfigSection for LlmConfigSummary {
    fn section_name(&self) -> &str {
        "LLM config"
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("provider", self.provider.clone()),
            ("model", self.model.clone()),
            ("api_base", self.api_base.clone()),
            ("timeout_secs", self.timeout_secs.to_string()),
        ]
    }
}
