//! C5 SSE Event Emitter: the one place orchestrators push into the outward protocol.
//!
//! An orchestrator never serializes SSE lines itself; it holds an [`EventEmitter`] and
//! calls `progress`/`chunk`/`result`/`error`. The server wraps each sent [`ProtocolEvent`]
//! in an [`fabula_protocol::Envelope`] (session id, event id) before writing the wire
//! format, so this module only deals with the event payload.

use std::time::Duration;

use fabula_protocol::event::ProgressLevel;
use fabula_protocol::ProtocolEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default keep-alive cadence when a stream has gone quiet (spec default: 15s).
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Thin wrapper over a [`ProtocolEvent`] sender. Cloning shares the same channel, so
/// an orchestrator can hand clones to concurrent subtasks (tool calls, LLM streaming)
/// without fanning out separate channels.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<ProtocolEvent>,
}

impl EventEmitter {
    pub fn new(tx: mpsc::Sender<ProtocolEvent>) -> Self {
        Self { tx }
    }

    pub async fn progress(&self, message: impl Into<String>, percent: u8) {
        let _ = self
            .tx
            .send(ProtocolEvent::progress(message, percent, ProgressLevel::Info))
            .await;
    }

    pub async fn progress_at(&self, message: impl Into<String>, percent: u8, level: ProgressLevel) {
        let _ = self.tx.send(ProtocolEvent::progress(message, percent, level)).await;
    }

    pub async fn chunk(&self, content: impl Into<String>) {
        let _ = self.tx.send(ProtocolEvent::chunk(content)).await;
    }

    pub async fn result(&self, payload: serde_json::Value) {
        let _ = self.tx.send(ProtocolEvent::Result { payload }).await;
    }

    pub async fn error(&self, message: impl Into<String>, code: Option<String>) {
        let _ = self.tx.send(ProtocolEvent::error(message, code)).await;
    }

    pub async fn done(&self) {
        let _ = self.tx.send(ProtocolEvent::Done {}).await;
    }

    pub async fn heartbeat(&self) {
        let _ = self.tx.send(ProtocolEvent::Heartbeat {}).await;
    }

    /// Raw sender for components (e.g. [`crate::llm::LlmClient::invoke_stream`]) that
    /// build their own `ProtocolEvent` values directly.
    pub fn sender(&self) -> mpsc::Sender<ProtocolEvent> {
        self.tx.clone()
    }

    /// Spawns a background task sending a heartbeat every `period` until the receiver
    /// is dropped. The orchestrator should abort the returned handle once the stream
    /// reaches a terminal event.
    pub fn spawn_heartbeat(&self, period: Duration) -> JoinHandle<()> {
        let emitter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if emitter.tx.send(ProtocolEvent::Heartbeat {}).await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progress_and_done_reach_the_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let emitter = EventEmitter::new(tx);
        emitter.progress("drafting chapter 3", 40).await;
        emitter.done().await;

        assert!(matches!(rx.recv().await, Some(ProtocolEvent::Progress { percent: 40, .. })));
        assert!(matches!(rx.recv().await, Some(ProtocolEvent::Done {})));
    }

    #[tokio::test]
    async fn heartbeat_stops_once_receiver_drops() {
        let (tx, mut rx) = mpsc::channel(8);
        let emitter = EventEmitter::new(tx);
        let handle = emitter.spawn_heartbeat(Duration::from_millis(5));
        assert!(matches!(rx.recv().await, Some(ProtocolEvent::Heartbeat {})));
        drop(rx);
        let _ = tokio::time::timeout(Duration::from_millis(200), handle).await;
    }
}
