//! Incremental assembly of a streamed reply.
//!
//! `Idle -> Streaming -> (Terminated | ClosedWithoutTerminal) -> Idle`

use super::stream_update::ConversationStreamUpdate;
use crate::api::decode::{Event, Reducer, Step};
use crate::api::stream::StreamParser;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Streaming,
    Terminated,
    ClosedWithoutTerminal,
}

pub struct StreamAssembler {
    phase: TurnPhase,
    parser: StreamParser,
    reducer: Reducer,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Idle,
            parser: StreamParser::new(),
            reducer: Reducer::new(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Start a fresh response, discarding anything left from the previous one.
    pub fn begin(&mut self) {
        self.parser.reset();
        self.reducer = Reducer::new();
        self.phase = TurnPhase::Streaming;
    }

    /// Back to `Idle`, handing out the final text of the finished response.
    pub fn reset(&mut self) -> String {
        let reducer = std::mem::take(&mut self.reducer);
        self.parser.reset();
        self.phase = TurnPhase::Idle;
        reducer.finish()
    }

    /// Best text known so far: the terminal text once set, else the accumulator.
    pub fn text(&self) -> &str {
        self.reducer.best_text()
    }

    /// Feed one raw write. Only complete lines are decoded; a partial trailing
    /// line waits for the next write.
    pub fn push_bytes(
        &mut self,
        chunk: &[u8],
        stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
    ) -> TurnPhase {
        if self.phase != TurnPhase::Streaming {
            return self.phase;
        }

        for event in self.parser.process(chunk) {
            self.apply(event, stream_delta_tx);
            if self.phase == TurnPhase::Terminated {
                break;
            }
        }

        self.phase
    }

    /// The byte stream ended. Flushes a trailing unterminated line, settles the
    /// final text and publishes it.
    pub fn close(
        &mut self,
        stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
    ) -> String {
        if self.phase == TurnPhase::Streaming {
            if let Some(event) = self.parser.flush() {
                self.apply(event, stream_delta_tx);
            }
        }

        if self.phase == TurnPhase::Streaming {
            self.phase = TurnPhase::ClosedWithoutTerminal;
            emit_stream_update(
                stream_delta_tx,
                ConversationStreamUpdate::Final {
                    text: self.reducer.best_text().to_string(),
                },
            );
        }

        self.reducer.best_text().to_string()
    }

    fn apply(
        &mut self,
        event: Event,
        stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
    ) {
        match self.reducer.apply(event) {
            Step::Appended(delta) => emit_stream_update(
                stream_delta_tx,
                ConversationStreamUpdate::Delta {
                    delta,
                    text: self.reducer.accumulated().to_string(),
                },
            ),
            Step::Terminated => {
                self.phase = TurnPhase::Terminated;
                emit_stream_update(
                    stream_delta_tx,
                    ConversationStreamUpdate::Final {
                        text: self.reducer.best_text().to_string(),
                    },
                );
            }
            Step::Ignored => {}
        }
    }
}

pub(crate) fn emit_stream_update(
    stream_delta_tx: Option<&mpsc::UnboundedSender<ConversationStreamUpdate>>,
    update: ConversationStreamUpdate,
) {
    if let Some(tx) = stream_delta_tx {
        let _ = tx.send(update);
    }
}
