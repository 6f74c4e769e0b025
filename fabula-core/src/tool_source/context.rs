//! Context passed into a tool call for the current generation run.
//!
//! A tool plugin invoked mid-orchestration (e.g. a "check lore consistency" MCP tool)
//! may want to know which tenant/project it is operating against, and may want to
//! narrate progress back to the SSE stream; both are carried here rather than
//! threaded through every call site.

use fabula_protocol::event::ProgressLevel;
use fabula_protocol::ProtocolEvent;

/// Per-call context available to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    /// Tenant the current run belongs to.
    pub tenant_id: Option<String>,
    /// Project the current run belongs to.
    pub project_id: Option<String>,
    /// Optional sender for progress narration; tools may emit a `Progress` event
    /// while a long-running call is in flight. Best-effort: a full channel drops
    /// the event rather than blocking the tool call.
    pub progress: Option<tokio::sync::mpsc::Sender<ProtocolEvent>>,
}

impl ToolCallContext {
    pub fn new(tenant_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            project_id: Some(project_id.into()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: tokio::sync::mpsc::Sender<ProtocolEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Emits a progress event if a sender is attached. Non-blocking; drops on a full channel.
    pub fn emit_progress(&self, message: impl Into<String>, percent: u8) {
        if let Some(tx) = &self.progress {
            let _ = tx.try_send(ProtocolEvent::progress(message, percent, ProgressLevel::Info));
        }
    }
}
