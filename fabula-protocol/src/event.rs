//! Protocol-level event types: the six event kinds an orchestrator may emit (spec §4.5).
//!
//! `result` is emitted at most once per stream and always precedes `done`; `error` is
//! terminal and, per the ordering contract, no further events follow it except an
//! optional trailing `done`.

use serde::Serialize;
use serde_json::Value;

/// Severity attached to a `progress` event; mirrors the three levels a client distinguishes
/// visually (informational, degraded-but-continuing, and milestone success).
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    Info,
    Warning,
    Success,
}

/// One event in the client-visible SSE stream.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Human-readable progress narration with a 0-100 percent completion estimate.
    Progress {
        message: String,
        percent: u8,
        level: ProgressLevel,
    },
    /// Raw text delta from the LLM (chapter prose, one token-stream chunk at a time).
    Chunk { content: String },
    /// Keep-alive, issued every N chunks or every T seconds of silence.
    Heartbeat {},
    /// Exactly one per stream; the final structured outcome.
    Result { payload: Value },
    /// Terminal. No further events except an optional trailing `done`.
    Error {
        message: String,
        code: Option<String>,
    },
    /// Terminal marker; always the last line of a stream that did not error mid-flight.
    Done {},
}

impl ProtocolEvent {
    pub fn progress(message: impl Into<String>, percent: u8, level: ProgressLevel) -> Self {
        Self::Progress {
            message: message.into(),
            percent,
            level,
        }
    }

    pub fn chunk(content: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Used by emitters to assert the ordering contract in tests: `error`/`done` end a
    /// stream, nothing else does.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serializes_with_tagged_type() {
        let ev = ProtocolEvent::progress("generating", 42, ProgressLevel::Info);
        let v = ev.to_value().unwrap();
        assert_eq!(v["type"], "progress");
        assert_eq!(v["percent"], 42);
        assert_eq!(v["level"], "info");
    }

    #[test]
    fn error_and_done_are_terminal() {
        assert!(ProtocolEvent::error("boom", None).is_terminal());
        assert!(ProtocolEvent::Done {}.is_terminal());
        assert!(!ProtocolEvent::chunk("x").is_terminal());
    }
}
