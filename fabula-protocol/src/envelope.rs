//! Envelope (session_id, event_id) applied to every emitted event.
//!
//! `EnvelopeState` tracks a monotonically increasing sequence number per stream so a
//! client reconnecting mid-run (best-effort; spec explicitly does not guarantee
//! exactly-once delivery across reconnection) can at least detect gaps.

use crate::event::ProtocolEvent;
use serde_json::Value;

/// Envelope fields attached to each event line.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Session id; constant within one orchestrator run.
    pub session_id: Option<String>,
    /// Per-event sequence number; monotonically increasing within a stream.
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.session_id {
            obj.entry("session_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id")
                .or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}

/// Envelope state for one orchestrator run: session id and next event sequence number.
pub struct EnvelopeState {
    pub session_id: String,
    pub next_event_id: u64,
}

impl EnvelopeState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            next_event_id: 1,
        }
    }

    /// Injects envelope into the event value and advances the sequence counter.
    pub fn inject_into(&mut self, value: &mut Value) {
        let env = Envelope::new()
            .with_session_id(&self.session_id)
            .with_event_id(self.next_event_id);
        self.next_event_id += 1;
        env.inject_into(value);
    }
}

/// Converts a protocol event to JSON and injects the envelope using the given state.
pub fn to_json(
    event: &ProtocolEvent,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ProgressLevel, ProtocolEvent};

    #[test]
    fn envelope_inject() {
        let mut obj = serde_json::json!({"type":"chunk","content":"hi"});
        let env = Envelope::new().with_session_id("sess-1").with_event_id(1);
        env.inject_into(&mut obj);
        assert_eq!(obj["session_id"], "sess-1");
        assert_eq!(obj["event_id"], 1);
        assert_eq!(obj["type"], "chunk");
    }

    #[test]
    fn to_json_injects_envelope_and_advances_sequence() {
        let ev = ProtocolEvent::progress("starting", 0, ProgressLevel::Info);
        let mut state = EnvelopeState::new("run-123".to_string());
        let first = to_json(&ev, &mut state).unwrap();
        assert_eq!(first["session_id"], "run-123");
        assert_eq!(first["event_id"], 1);

        let second = to_json(&ev, &mut state).unwrap();
        assert_eq!(second["event_id"], 2);
    }
}
