mod conversation;
mod stream_update;
pub mod turn;

pub use conversation::{ConversationManager, TurnOutcome};
pub use stream_update::ConversationStreamUpdate;
pub use turn::{StreamAssembler, TurnPhase};
