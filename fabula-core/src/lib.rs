//! # fabula-core
//!
//! Orchestration engine for a multi-tenant AI-assisted long-form fiction backend.
//! Each tenant owns an isolated SQLite partition (projects, outlines, chapters,
//! relationships, memory fragments) and a set of registered MCP tool plugins;
//! orchestrators compose prompts, call an LLM, validate and persist the result,
//! and stream progress to the client as an ordered SSE event sequence.
//!
//! ## Components
//!
//! - [`tenant`]: [`tenant::TenantRegistry`] — per-tenant storage handle and
//!   write-serialization lock, created on first use and cached (C1).
//! - [`llm`]: [`llm::LlmClient`] trait, [`llm::MockLlm`], [`llm::ChatOpenAI`] — uniform
//!   access to blocking and streaming completion (C2).
//! - [`memory`]: [`memory::MemoryStore`] trait, [`memory::InMemoryMemoryStore`],
//!   [`memory::SqliteMemoryStore`] — fragment storage and semantic/lexical search,
//!   with an optional [`memory::Embedder`] (C3).
//! - [`tools`] / [`tool_source`]: [`tools::ToolRegistry`], MCP-backed
//!   [`tool_source::McpToolSource`] — per-tenant tool plugin dispatch (C4).
//! - [`stream`]: [`stream::EventEmitter`] — ordered SSE event production (C5).
//! - [`retry`]: batch partitioning, per-batch validation and retry escalation (C6).
//! - [`prompt`]: [`prompt::PromptComposer`] — versioned prompt templates (C7).
//! - [`orchestrators`]: chapter generation, outline continuation, the project wizard,
//!   and chapter analysis (C8).
//! - [`analysis`]: derives [`model::MemoryFragment`]s from a [`model::ChapterAnalysis`] (C9).
//! - [`model`]: the data model shared by storage, prompts, and HTTP/SSE payloads.
//! - [`cache`]: [`cache::Cache`] trait, [`cache::InMemoryCache`] — generic TTL cache,
//!   used for tool descriptor caching.
//! - [`config`]: [`config::RunConfigSummary`], [`config::build_config_summary`] — printed
//!   to stderr on startup so operators can see resolved config without secrets.
//! - [`error`]: [`error::OrchestratorError`] — the error type HTTP handlers and the
//!   SSE emitter match on.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod model;
pub mod orchestrators;
pub mod prompt;
pub mod retry;
pub mod stream;
pub mod tenant;
pub mod tool_source;
pub mod tools;

pub use cache::{Cache, CacheError, InMemoryCache};
pub use config::{
    build_config_summary, ConfigSection, EmbeddingConfigSummary, LlmConfigSummary,
    MemoryConfigSummary, RunConfigSummary, RunConfigSummarySource, ToolConfigSummary,
};
pub use error::OrchestratorError;
pub use llm::{ChatOpenAI, LlmClient, LlmError, LlmResponse, LlmUsage, Message, MockLlm, Role};
pub use memory::{Embedder, InMemoryMemoryStore, MemoryStore, OpenAIEmbedder, SqliteMemoryStore, StoreError};
pub use orchestrators::OrchestratorContext;
pub use prompt::PromptComposer;
pub use stream::EventEmitter;
pub use tenant::{RegistryError, TenantHandle, TenantRegistry, TenantStore};
pub use tool_source::{McpToolSource, ToolCallContent, ToolCallContext, ToolSource, ToolSourceError, ToolSpec};
pub use tools::{register_mcp_tools, McpToolAdapter, Tool, ToolRegistry};

/// When running `cargo test -p fabula-core`, initializes tracing from `RUST_LOG` so
/// unit tests across `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
