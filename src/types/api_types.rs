use serde::{Deserialize, Serialize};

/// Action discriminator the webhook expects on every chat message.
pub const SEND_MESSAGE_ACTION: &str = "sendMessage";

/// Inbound body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: String,
}

/// Outbound body sent to the workflow webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub action: String,
    pub session_id: String,
    pub chat_input: String,
}

impl WebhookPayload {
    pub fn send_message(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: SEND_MESSAGE_ACTION.to_string(),
            session_id: session_id.into(),
            chat_input: message.into(),
        }
    }
}

/// Structured reply returned by the relay when the upstream did not stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the visible conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payload_uses_camel_case_keys() {
        let payload = WebhookPayload::send_message("s-1", "hello");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["action"], "sendMessage");
        assert_eq!(value["sessionId"], "s-1");
        assert_eq!(value["chatInput"], "hello");
    }

    #[test]
    fn test_chat_request_accepts_missing_session_id() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(request.message, "hi");
        assert!(request.session_id.is_empty());
    }
}
