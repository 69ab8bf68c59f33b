use crate::gamification::GameEvent;

/// Progress published to the UI layer while a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationStreamUpdate {
    /// The accumulator grew: `delta` is the new fragment, `text` the whole
    /// partial reply so far.
    Delta { delta: String, text: String },
    /// Text the turn settled on. May differ from the last `Delta` when an
    /// `end` event carried its own output.
    Final { text: String },
    /// The turn failed before any text arrived; `message` replaces the reply.
    Failed { message: String },
    Game(GameEvent),
}
