use super::state::AppState;
use crate::api::normalize::normalize_body;
use crate::api::upstream::{UpstreamByteStream, UpstreamResponse};
use crate::error::RelayResult;
use crate::types::{ChatReply, ChatRequest};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// `POST /api/chat`: forward one message and return either the upstream event
/// stream or a reduced `{ "output": ... }` reply.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> RelayResult<Response> {
    debug!(session_id = %request.session_id, message_len = request.message.len(), "relaying chat message");

    match state.webhook.forward(&request).await? {
        UpstreamResponse::EventStream(stream) => Ok(event_stream_response(stream)),
        UpstreamResponse::Buffered { content_type, body } => {
            let output = normalize_body(&body);
            debug!(
                %content_type,
                body_len = body.len(),
                output_len = output.len(),
                "reduced buffered webhook reply"
            );
            Ok(Json(ChatReply { output }).into_response())
        }
    }
}

/// Pass the webhook's bytes through unchanged, with headers that keep
/// proxies from buffering or caching them.
fn event_stream_response(stream: UpstreamByteStream) -> Response {
    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    response
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
