use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock for tests that mutate `COACH_*` / `N8N_*` environment variables.
/// Use `.blocking_lock()` in sync tests and `.lock().await` in async tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// One server-sent-event line carrying `json`.
pub fn sse_line(json: &str) -> String {
    format!("data: {json}\n")
}

/// Newline-delimited body built from bare JSON lines.
pub fn ndjson(lines: &[&str]) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}
