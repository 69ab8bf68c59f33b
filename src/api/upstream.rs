use super::logging::emit_debug_payload;
use crate::config::Config;
use crate::error::RelayError;
use crate::types::{ChatRequest, WebhookPayload};
use crate::util::{is_event_stream, is_local_endpoint_url};
use bytes::Bytes;
use futures::Stream;
use reqwest::header::CONTENT_TYPE;
use std::pin::Pin;

pub type UpstreamByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// What the webhook answered with, before any reduction.
pub enum UpstreamResponse {
    /// `text/event-stream`: handed through to the caller untouched.
    EventStream(UpstreamByteStream),
    /// Anything else, read in full.
    Buffered { content_type: String, body: String },
}

/// Forwards chat messages to the configured workflow webhook.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    webhook_url: Option<String>,
    debug_payload: bool,
}

impl WebhookClient {
    pub fn new(config: &Config) -> Self {
        Self::with_url(config.webhook_url.clone(), config.debug_payload)
    }

    pub fn with_url(webhook_url: Option<String>, debug_payload: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
            debug_payload,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub async fn forward(&self, request: &ChatRequest) -> Result<UpstreamResponse, RelayError> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .ok_or(RelayError::Configuration)?;
        let payload = WebhookPayload::send_message(&request.session_id, &request.message);

        if self.debug_payload {
            emit_debug_payload(webhook_url, &payload);
        }

        let response = self
            .http
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_webhook_error(error, webhook_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if is_event_stream(&content_type) {
            tracing::debug!(%content_type, "passing webhook event stream through");
            return Ok(UpstreamResponse::EventStream(Box::pin(response.bytes_stream())));
        }

        let body = response
            .text()
            .await
            .map_err(|error| map_webhook_error(error, webhook_url))?;

        Ok(UpstreamResponse::Buffered { content_type, body })
    }
}

fn map_webhook_error(error: reqwest::Error, webhook_url: &str) -> RelayError {
    if error.is_connect() && is_local_endpoint_url(webhook_url) {
        return RelayError::unreachable(format!(
            "cannot reach local webhook '{webhook_url}': {error}. Start the workflow server or update the webhook URL."
        ));
    }
    if error.is_connect() {
        return RelayError::unreachable(format!("cannot reach webhook '{webhook_url}': {error}"));
    }
    if error.is_timeout() {
        return RelayError::unreachable(format!("webhook '{webhook_url}' timed out: {error}"));
    }
    RelayError::unreachable(format!("webhook request to '{webhook_url}' failed: {error}"))
}
