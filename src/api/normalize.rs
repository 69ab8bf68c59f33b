use super::decode::{decode_line, first_present, Reducer, Step, REPLY_FIELDS};
use serde_json::Value;

/// Reduce a fully buffered upstream body to the text shown for the turn.
///
/// A body that parses as one JSON document goes through [`reply_text`].
/// Anything else is treated as NDJSON or SSE and decoded line by line.
pub fn normalize_body(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return reply_text(&value);
    }

    let mut reducer = Reducer::new();
    for line in raw.split('\n') {
        let Some(event) = decode_line(line) else {
            continue;
        };
        if reducer.apply(event) == Step::Terminated {
            break;
        }
    }

    reducer.finish()
}

/// Text of a single JSON reply: `output`, `text`, `message`, `response`, in
/// that order. An empty string in a higher-preference field still wins here.
pub fn reply_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) => first_present(value, REPLY_FIELDS)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
