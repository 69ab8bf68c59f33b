use reqwest::Url;
use std::net::IpAddr;

const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Reads an on/off style flag; `None` for anything unrecognised.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Loopback or unspecified host: `localhost`, `127.x`, `::1`, `0.0.0.0`.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };

    let Some(host) = parsed.host_str() else {
        return false;
    };
    match host.trim_matches(['[', ']']).parse::<IpAddr>() {
        Ok(addr) => addr.is_loopback() || addr.is_unspecified(),
        Err(_) => host.eq_ignore_ascii_case("localhost"),
    }
}

pub fn is_http_url(url: &str) -> bool {
    let trimmed = url.trim();
    (trimmed.starts_with("http://") || trimmed.starts_with("https://")) && Url::parse(trimmed).is_ok()
}

/// True when a `Content-Type` header value announces an event stream.
pub fn is_event_stream(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains(EVENT_STREAM_MIME)
}
