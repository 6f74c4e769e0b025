//! Turns one orchestrator run into an Axum SSE response.
//!
//! Grounded on `run::delivery::handle_run_stream`'s shape (forward a channel of events,
//! then await the producing task and translate its outcome into a final response) but
//! adapted from one WebSocket `ServerResponse` per event to one `text/event-stream`
//! line per [`ProtocolEvent`], envelope-stamped via [`fabula_protocol::EnvelopeState`].

use std::convert::Infallible;
use std::future::Future;

use axum::response::sse::{Event, Sse};
use fabula_core::error::OrchestratorError;
use fabula_core::stream::{EventEmitter, DEFAULT_HEARTBEAT_INTERVAL};
use fabula_protocol::{to_json, EnvelopeState, ProtocolEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::error_code;

const OUT_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Spawns `task` with a fresh [`EventEmitter`] and streams everything it emits (plus a
/// synthesized terminal `error`/`done` pair if it returns `Err` without emitting its own)
/// back to the client as SSE. `session_id` seeds the envelope's sequence counter.
pub fn stream_orchestrator<F, Fut>(
    session_id: String,
    task: F,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>
where
    F: FnOnce(EventEmitter) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value, OrchestratorError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<ProtocolEvent>(EVENT_CHANNEL_CAPACITY);
    let emitter = EventEmitter::new(tx);
    let run_handle = tokio::spawn(task(emitter));

    let (out_tx, out_rx) = mpsc::channel::<Event>(OUT_CHANNEL_CAPACITY);
    tokio::spawn(forward(rx, run_handle, session_id, out_tx));

    Sse::new(ReceiverStream::new(out_rx).map(Ok))
}

async fn forward(
    mut rx: mpsc::Receiver<ProtocolEvent>,
    run_handle: tokio::task::JoinHandle<Result<Value, OrchestratorError>>,
    session_id: String,
    out_tx: mpsc::Sender<Event>,
) {
    let mut state = EnvelopeState::new(session_id);
    loop {
        match tokio::time::timeout(DEFAULT_HEARTBEAT_INTERVAL, rx.recv()).await {
            Ok(Some(event)) => {
                if send(&out_tx, &event, &mut state).await.is_err() {
                    run_handle.abort();
                    return;
                }
            }
            Ok(None) => break,
            Err(_elapsed) => {
                if send(&out_tx, &ProtocolEvent::Heartbeat {}, &mut state).await.is_err() {
                    run_handle.abort();
                    return;
                }
            }
        }
    }

    match run_handle.await {
        Ok(Ok(_)) => {
            // The orchestrator already emitted its own `result` and `done`.
        }
        Ok(Err(e)) => {
            let code = error_code(&e).to_string();
            let _ = send(&out_tx, &ProtocolEvent::error(e.to_string(), Some(code)), &mut state).await;
            let _ = send(&out_tx, &ProtocolEvent::Done {}, &mut state).await;
        }
        Err(join_err) => {
            let _ = send(
                &out_tx,
                &ProtocolEvent::error(format!("internal: {join_err}"), None),
                &mut state,
            )
            .await;
        }
    }
}

async fn send(
    out_tx: &mpsc::Sender<Event>,
    event: &ProtocolEvent,
    state: &mut EnvelopeState,
) -> Result<(), mpsc::error::SendError<Event>> {
    let value = match to_json(event, state) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("failed to serialize protocol event: {}", e);
            return Ok(());
        }
    };
    out_tx.send(Event::default().data(value.to_string())).await
}
