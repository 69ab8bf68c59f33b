//! Error types for the relay and for a caller-side chat turn.

use crate::types::ErrorReply;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Failures the relay reports to its caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Webhook URL not configured")]
    Configuration,

    #[error("Could not reach the coaching service")]
    UpstreamUnreachable { detail: String },

    #[error("Upstream error: {0}")]
    UpstreamStatus(u16),
}

impl RelayError {
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::UpstreamUnreachable {
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::UpstreamUnreachable { .. } => "UPSTREAM_UNREACHABLE",
            Self::UpstreamStatus(_) => "UPSTREAM_STATUS",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        match &self {
            Self::Configuration => {
                error!(error_code = code, "relay has no webhook URL configured");
            }
            Self::UpstreamUnreachable { detail } => {
                error!(error_code = code, detail = %detail, "webhook unreachable");
            }
            Self::UpstreamStatus(upstream) => {
                warn!(error_code = code, upstream_status = upstream, "webhook returned error status");
            }
        }

        let body = ErrorReply {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Failures of one caller-side chat turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("relay request failed: {0}")]
    Transport(String),

    #[error("relay reply could not be decoded: {0}")]
    InvalidReply(String),

    #[error("no reply within {0:?}")]
    TimedOut(Duration),

    #[error("turn cancelled")]
    Cancelled,
}

impl TurnError {
    /// Text shown in place of the assistant reply when nothing was received.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TimedOut(_) => "The coach took too long to respond. Please try again.",
            Self::Cancelled => "Request cancelled.",
            _ => "Something went wrong. Please try again.",
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::TimedOut(_) | Self::Cancelled)
    }
}

/// Result type for relay handlers.
pub type RelayResult<T> = Result<T, RelayError>;
