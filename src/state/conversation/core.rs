use super::{ConversationManager, TurnOutcome};
use crate::api::{RelayClient, RelayResponse};
use crate::error::TurnError;
use crate::gamification::{apply_message_sent, apply_reply_received};
use crate::state::stream_update::ConversationStreamUpdate;
use crate::state::turn::{emit_stream_update, StreamAssembler, TurnPhase};
use crate::types::{ChatMessage, ChatRequest, Role};
use anyhow::{bail, Result};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

impl ConversationManager {
    /// Run one chat turn.
    ///
    /// The configured timeout bounds the wait for the relay's response
    /// headers; a stream that has started may run past it. `cancel` covers the
    /// whole turn. On either abort, text already published stays as the reply;
    /// the turn only counts as failed when nothing had arrived.
    pub async fn send_message(
        &mut self,
        content: String,
        stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let message = content.trim().to_string();
        if message.is_empty() {
            bail!("message is empty");
        }

        self.messages.push(ChatMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: message.clone(),
            error: false,
        });
        let assistant_index = self.messages.len();
        self.messages.push(ChatMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            error: false,
        });

        self.session_messages += 1;
        let sent = apply_message_sent(&self.game, self.session_messages);
        self.commit_game(sent, stream_delta_tx);

        let request = ChatRequest {
            message,
            session_id: self.session_id.clone(),
        };
        let client = self.client();
        let turn_timeout = self.turn_timeout;
        let mut assembler = StreamAssembler::new();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            result = run_turn(&client, &request, turn_timeout, &mut assembler, stream_delta_tx) => result,
        };

        let outcome = match result {
            Ok(text) => {
                debug!(reply_len = text.len(), "turn completed");
                self.messages[assistant_index].content = text.clone();
                let received = apply_reply_received(&self.game, &text);
                self.commit_game(received, stream_delta_tx);
                TurnOutcome::Completed { text }
            }
            Err(error) => {
                let partial = assembler.text().to_string();
                if partial.is_empty() {
                    warn!(%error, "turn failed before any reply text");
                    let message = error.user_message().to_string();
                    let entry = &mut self.messages[assistant_index];
                    entry.content = message.clone();
                    entry.error = true;
                    emit_stream_update(stream_delta_tx, ConversationStreamUpdate::Failed { message });
                    TurnOutcome::Failed { error }
                } else {
                    warn!(%error, kept = partial.len(), "turn interrupted, keeping partial reply");
                    self.messages[assistant_index].content = partial.clone();
                    TurnOutcome::Interrupted {
                        text: partial,
                        error,
                    }
                }
            }
        };

        assembler.reset();
        Ok(outcome)
    }
}

async fn run_turn(
    client: &RelayClient,
    request: &ChatRequest,
    turn_timeout: Duration,
    assembler: &mut StreamAssembler,
    stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
) -> Result<String, TurnError> {
    let response = tokio::time::timeout(turn_timeout, client.send(request))
        .await
        .map_err(|_| TurnError::TimedOut(turn_timeout))??;

    match response {
        RelayResponse::EventStream(mut stream) => {
            assembler.begin();
            while let Some(chunk_result) = stream.next().await {
                let chunk = chunk_result?;
                if assembler.push_bytes(&chunk, stream_delta_tx) == TurnPhase::Terminated {
                    break;
                }
            }
            Ok(assembler.close(stream_delta_tx))
        }
        RelayResponse::Reply(text) => {
            emit_stream_update(
                stream_delta_tx,
                ConversationStreamUpdate::Final { text: text.clone() },
            );
            Ok(text)
        }
    }
}
