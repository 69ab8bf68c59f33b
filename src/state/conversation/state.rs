use crate::api::RelayClient;
use crate::error::TurnError;
use crate::gamification::{
    apply_day_rollover, apply_session_start, GameEvent, GameState, GameStore, Transition,
};
use crate::state::stream_update::ConversationStreamUpdate;
use crate::state::turn::emit_stream_update;
use crate::types::ChatMessage;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How one chat turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    Completed { text: String },
    /// Aborted or broken after some text arrived; that text is kept as the reply.
    Interrupted { text: String, error: TurnError },
    /// Nothing arrived before the failure.
    Failed { error: TurnError },
}

impl TurnOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { text } | Self::Interrupted { text, .. } => Some(text),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct ConversationManager {
    pub(super) client: Arc<RelayClient>,
    pub(super) session_id: String,
    pub(super) messages: Vec<ChatMessage>,
    pub(super) game: GameState,
    pub(super) store: Box<dyn GameStore>,
    pub(super) session_messages: u32,
    pub(super) turn_timeout: Duration,
}

impl ConversationManager {
    pub fn new(client: RelayClient, store: Box<dyn GameStore>, turn_timeout: Duration) -> Self {
        let game = store.load();
        Self {
            client: Arc::new(client),
            session_id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            game,
            store,
            session_messages: 0,
            turn_timeout,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn session_messages(&self) -> u32 {
        self.session_messages
    }

    pub fn client(&self) -> Arc<RelayClient> {
        Arc::clone(&self.client)
    }

    /// Roll the streak forward to `today` and count a new session.
    pub fn start_session(&mut self, today: NaiveDate) -> Vec<GameEvent> {
        let rollover = apply_day_rollover(&self.game, today);
        self.game = apply_session_start(&rollover.state);
        self.persist_game();
        rollover.events
    }

    pub(super) fn commit_game(
        &mut self,
        transition: Transition,
        stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
    ) {
        self.game = transition.state;
        for event in transition.events {
            emit_stream_update(stream_delta_tx, ConversationStreamUpdate::Game(event));
        }
        self.persist_game();
    }

    fn persist_game(&self) {
        if let Err(error) = self.store.save(&self.game) {
            tracing::warn!(error = %format!("{error:#}"), "cannot persist game state");
        }
    }
}
