//! Per-line event decoding shared by the buffered normalizer and the stream
//! consumer.
//!
//! Upstream producers emit heterogeneous shapes (plain chunks, agent framework
//! events, message deltas). Every field lookup goes through an ordered list of
//! accessors so both reduction paths read the same fields in the same order.

use super::logging::emit_decode_noise;
use serde_json::Value;

/// Sentinel some producers send as the last `data:` line.
pub const DONE_SENTINEL: &str = "[DONE]";

const SSE_DATA_PREFIX: &str = "data:";

/// Reads one candidate text field out of a decoded JSON value.
///
/// Only JSON strings count as present; `null`, missing keys and other value
/// types are treated as absent.
pub type FieldAccessor = fn(&Value) -> Option<&str>;

fn output(value: &Value) -> Option<&str> {
    value.get("output").and_then(Value::as_str)
}

fn nested_output(value: &Value) -> Option<&str> {
    value
        .get("output")
        .and_then(|inner| inner.get("output"))
        .and_then(Value::as_str)
}

fn text(value: &Value) -> Option<&str> {
    value.get("text").and_then(Value::as_str)
}

fn content(value: &Value) -> Option<&str> {
    value.get("content").and_then(Value::as_str)
}

fn message(value: &Value) -> Option<&str> {
    value.get("message").and_then(Value::as_str)
}

fn response(value: &Value) -> Option<&str> {
    value.get("response").and_then(Value::as_str)
}

/// Field preference for a whole-body JSON reply.
pub const REPLY_FIELDS: &[FieldAccessor] = &[output, text, message, response];

const END_FIELDS: &[FieldAccessor] = &[output, text];
const CHUNK_FIELDS: &[FieldAccessor] = &[output, text];
const MESSAGE_DELTA_FIELDS: &[FieldAccessor] = &[content];
const AGENT_FINISH_FIELDS: &[FieldAccessor] = &[output, nested_output, text];
const FALLBACK_FIELDS: &[FieldAccessor] = &[output, text, content, message];

/// First field the accessors find, empty strings included.
pub fn first_present<'a>(value: &'a Value, accessors: &[FieldAccessor]) -> Option<&'a str> {
    accessors.iter().find_map(|accessor| accessor(value))
}

/// First field the accessors find that is not an empty string.
pub fn first_non_empty<'a>(value: &'a Value, accessors: &[FieldAccessor]) -> Option<&'a str> {
    accessors
        .iter()
        .filter_map(|accessor| accessor(value))
        .find(|candidate| !candidate.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Chunk,
    End,
    AgentFinish,
    MessageDelta,
    Unknown,
}

impl EventKind {
    fn from_type_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("end") => Self::End,
            Some("chunk") => Self::Chunk,
            Some("AgentFinish") => Self::AgentFinish,
            Some("AIMessageChunk") => Self::MessageDelta,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub text: Option<String>,
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        self.kind == EventKind::End
    }
}

/// Classify a decoded JSON value and pull out its text fragment.
///
/// For `end` events an empty string is treated as absent so the reducer falls
/// back to what it has accumulated.
pub fn decode_event(value: &Value) -> Event {
    let kind = EventKind::from_type_tag(value.get("type").and_then(Value::as_str));
    let text = match kind {
        EventKind::End => first_non_empty(value, END_FIELDS),
        EventKind::Chunk => first_present(value, CHUNK_FIELDS),
        EventKind::MessageDelta => first_present(value, MESSAGE_DELTA_FIELDS),
        EventKind::AgentFinish => first_present(value, AGENT_FINISH_FIELDS),
        EventKind::Unknown => first_present(value, FALLBACK_FIELDS),
    };

    Event {
        kind,
        text: text.map(str::to_owned),
    }
}

/// Decode a single NDJSON or SSE line.
///
/// Returns `None` for blank lines, the `[DONE]` sentinel and anything that is
/// not valid JSON.
pub fn decode_line(line: &str) -> Option<Event> {
    let trimmed = line.trim();
    let payload = match trimmed.strip_prefix(SSE_DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => trimmed,
    };

    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(decode_event(&value)),
        Err(error) => {
            emit_decode_noise(payload, &error);
            None
        }
    }
}

/// Outcome of feeding one event into a [`Reducer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The accumulator grew by this fragment.
    Appended(String),
    /// The event carried no text, or the response already terminated.
    Ignored,
    /// An `end` event fixed the final text.
    Terminated,
}

/// Accumulator plus terminal state for one response.
#[derive(Debug, Default, Clone)]
pub struct Reducer {
    accumulated: String,
    final_text: Option<String>,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: Event) -> Step {
        if self.final_text.is_some() {
            return Step::Ignored;
        }

        if event.is_terminal() {
            let text = event.text.unwrap_or_else(|| self.accumulated.clone());
            self.final_text = Some(text);
            return Step::Terminated;
        }

        match event.text {
            Some(fragment) if !fragment.is_empty() => {
                self.accumulated.push_str(&fragment);
                Step::Appended(fragment)
            }
            _ => Step::Ignored,
        }
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn is_terminated(&self) -> bool {
        self.final_text.is_some()
    }

    /// Final text if an `end` event arrived, otherwise the accumulator.
    pub fn best_text(&self) -> &str {
        self.final_text.as_deref().unwrap_or(&self.accumulated)
    }

    pub fn finish(self) -> String {
        self.final_text.unwrap_or(self.accumulated)
    }
}
