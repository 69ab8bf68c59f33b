use crate::api::client::{MockRelayProducer, RelayResponse};
use crate::error::TurnError;
use crate::types::ChatRequest;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted relay answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Event stream delivered as these raw writes, then closed.
    Stream(Vec<String>),
    /// Event stream that delivers these writes and then never closes.
    StreamThenStall(Vec<String>),
    /// Event stream that delivers these writes and then fails mid-transfer.
    StreamThenError(Vec<String>),
    /// Structured reply text.
    Reply(String),
    /// Event stream whose writes each arrive after `gap`.
    Paced { writes: Vec<String>, gap: Duration },
    /// Non-success relay status.
    Status(u16),
    /// Relay that never answers.
    Stall,
}

#[derive(Clone)]
pub struct MockRelay {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockRelay {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn byte_chunks(writes: Vec<String>) -> Vec<Result<Bytes, TurnError>> {
    writes.into_iter().map(|s| Ok(Bytes::from(s))).collect()
}

impl MockRelayProducer for MockRelay {
    fn respond(&self, request: &ChatRequest) -> BoxFuture<'static, Result<RelayResponse, TurnError>> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies_guard = self.replies.lock().unwrap();
        if replies_guard.is_empty() {
            return futures::future::ready(Err(TurnError::Transport(
                "MockRelay: no more replies configured".to_string(),
            )))
            .boxed();
        }

        let reply = replies_guard.remove(0);
        let response = match reply {
            MockReply::Stream(writes) => Ok(RelayResponse::EventStream(Box::pin(stream::iter(
                byte_chunks(writes),
            )))),
            MockReply::StreamThenStall(writes) => Ok(RelayResponse::EventStream(Box::pin(
                stream::iter(byte_chunks(writes)).chain(stream::pending()),
            ))),
            MockReply::StreamThenError(writes) => {
                let failure = stream::once(async {
                    Err(TurnError::Transport("connection reset".to_string()))
                });
                Ok(RelayResponse::EventStream(Box::pin(
                    stream::iter(byte_chunks(writes)).chain(failure),
                )))
            }
            MockReply::Paced { writes, gap } => {
                let paced = stream::iter(writes).then(move |write| async move {
                    tokio::time::sleep(gap).await;
                    Ok(Bytes::from(write))
                });
                Ok(RelayResponse::EventStream(Box::pin(paced)))
            }
            MockReply::Reply(text) => Ok(RelayResponse::Reply(text)),
            MockReply::Status(code) => Err(TurnError::Status(code)),
            MockReply::Stall => return futures::future::pending().boxed(),
        };

        futures::future::ready(response).boxed()
    }
}
