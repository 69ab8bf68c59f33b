use super::normalize::reply_text;
use crate::config::Config;
use crate::error::TurnError;
use crate::types::ChatRequest;
use crate::util::{is_event_stream, is_local_endpoint_url};
use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TurnError>> + Send>>;

/// The relay's answer to one chat request.
pub enum RelayResponse {
    /// The upstream streamed; bytes still need assembling.
    EventStream(ByteStream),
    /// A structured reply, already reduced to text.
    Reply(String),
}

#[cfg(test)]
pub trait MockRelayProducer: Send + Sync {
    fn respond(
        &self,
        request: &ChatRequest,
    ) -> futures::future::BoxFuture<'static, Result<RelayResponse, TurnError>>;
}

/// Caller-side client of the relay's `/api/chat` endpoint.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    chat_url: String,
    #[cfg(test)]
    mock_producer: Option<Arc<dyn MockRelayProducer>>,
}

impl RelayClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            chat_url: config.relay_chat_url(),
            #[cfg(test)]
            mock_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockRelayProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            chat_url: "http://localhost:3000/api/chat".to_string(),
            mock_producer: Some(mock_producer),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub async fn send(&self, request: &ChatRequest) -> Result<RelayResponse, TurnError> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_producer {
                return producer.respond(request).await;
            }
        }

        let response = self
            .http
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(|error| map_relay_request_error(error, &self.chat_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TurnError::Status(status.as_u16()));
        }

        let streaming = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_event_stream);

        if streaming {
            let chat_url = self.chat_url.clone();
            let stream = response
                .bytes_stream()
                .map(move |item| item.map_err(|error| map_relay_request_error(error, &chat_url)));
            return Ok(RelayResponse::EventStream(Box::pin(stream)));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|error| TurnError::InvalidReply(error.to_string()))?;
        Ok(RelayResponse::Reply(reply_text(&value)))
    }
}

fn map_relay_request_error(error: reqwest::Error, chat_url: &str) -> TurnError {
    if error.is_connect() && is_local_endpoint_url(chat_url) {
        return TurnError::Transport(format!(
            "cannot reach local relay '{chat_url}': {error}. Start it with `coach serve` or update COACH_RELAY_URL."
        ));
    }
    if error.is_connect() {
        return TurnError::Transport(format!("cannot reach relay '{chat_url}': {error}"));
    }
    if let Some(status) = error.status() {
        return TurnError::Status(status.as_u16());
    }
    TurnError::Transport(format!("relay request to '{chat_url}' failed: {error}"))
}
