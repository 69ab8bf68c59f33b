use crate::util::parse_bool_str;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;

pub const DEBUG_PAYLOAD_ENV: &str = "COACH_DEBUG_PAYLOAD";
const API_LOG_PATH_ENV: &str = "COACH_API_LOG_PATH";

/// Longest slice of an undecodable line kept in trace output.
const NOISE_PREVIEW_CHARS: usize = 120;

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .as_deref()
        .and_then(parse_bool_str)
        .unwrap_or(false)
}

/// Record an outbound webhook payload, either into `COACH_API_LOG_PATH` or as
/// a debug-level trace event.
pub fn emit_debug_payload<T: Serialize>(request_url: &str, payload: &T) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());

    if let Some(path) = resolve_log_path() {
        let message = format!(
            "COACH_RELAY DEBUG payload_request url={request_url}\npayload:\n{formatted_payload}\n"
        );
        match append_log_file(&path, &message) {
            Ok(()) => return,
            Err(error) => tracing::warn!(%path, %error, "cannot append to api log file"),
        }
    }

    tracing::debug!(url = %request_url, payload = %formatted_payload, "webhook payload");
}

/// Lines that fail JSON parsing are expected in streaming protocols; they are
/// only visible at trace level.
pub fn emit_decode_noise(line: &str, parse_error: &serde_json::Error) {
    let preview: String = line.chars().take(NOISE_PREVIEW_CHARS).collect();
    tracing::trace!(error = %parse_error, line = %preview, "skipping undecodable line");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(API_LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
