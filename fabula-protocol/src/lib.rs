//! SSE stream event protocol: type + payload + envelope.
//!
//! Defines the wire shape of a single stream event and envelope injection. This crate
//! has no dependency on `fabula-core`; the orchestration engine bridges its internal
//! progress/result notifications into `ProtocolEvent` and calls `to_json` before writing
//! an `event: message\ndata: <json>\n\n` line to the SSE sink.

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::ProtocolEvent;
