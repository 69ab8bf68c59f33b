mod core;
mod state;

#[cfg(test)]
mod tests;

pub use state::{ConversationManager, TurnOutcome};
