use super::*;
use crate::api::mock_client::{MockRelay, MockReply};
use crate::api::RelayClient;
use crate::error::TurnError;
use crate::gamification::{GameEvent, GameState, MemoryStore};
use crate::state::ConversationStreamUpdate;
use crate::test_support::sse_line;
use crate::types::Role;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SHORT_TIMEOUT: Duration = Duration::from_millis(80);

fn make_conversation(replies: Vec<MockReply>, timeout: Duration) -> (ConversationManager, MockRelay) {
    let relay = MockRelay::new(replies);
    let client = RelayClient::new_mock(Arc::new(relay.clone()));
    let manager = ConversationManager::new(client, Box::new(MemoryStore::new()), timeout);
    (manager, relay)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ConversationStreamUpdate>) -> Vec<ConversationStreamUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn deltas(updates: &[ConversationStreamUpdate]) -> Vec<String> {
    updates
        .iter()
        .filter_map(|update| match update {
            ConversationStreamUpdate::Delta { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_streamed_turn_publishes_progress_and_settles() {
    let first = sse_line(r#"{"type":"chunk","output":"Hello, "}"#);
    let (head, tail) = first.split_at(12);
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::Stream(vec![
            head.to_string(),
            tail.to_string(),
            sse_line(r#"{"type":"chunk","output":"world"}"#),
            "data: [DONE]\n".to_string(),
        ])],
        Duration::from_secs(5),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = manager
        .send_message("  build muscle  ".to_string(), Some(&tx), &CancellationToken::new())
        .await
        .expect("turn runs");

    assert_eq!(outcome.text(), Some("Hello, world"));
    let updates = drain(&mut rx);
    assert_eq!(deltas(&updates), vec!["Hello, ", "Hello, world"]);
    assert!(updates.contains(&ConversationStreamUpdate::Final {
        text: "Hello, world".to_string()
    }));

    let messages = manager.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "build muscle");
    assert_eq!(messages[1].content, "Hello, world");
    assert!(!messages[1].error);
}

#[tokio::test]
async fn test_structured_reply_completes_turn_and_awards_badges() {
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::Reply("Your plan is on its way!".to_string())],
        Duration::from_secs(5),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = manager
        .send_message("email me".to_string(), Some(&tx), &CancellationToken::new())
        .await
        .expect("turn runs");

    assert_eq!(outcome.text(), Some("Your plan is on its way!"));
    let game = manager.game();
    assert_eq!(game.xp, 10);
    assert!(game.has_badge("first_rep"));
    assert!(game.has_badge("goal_setter"));
    assert!(game.has_badge("inbox"));

    let updates = drain(&mut rx);
    assert!(updates.contains(&ConversationStreamUpdate::Game(GameEvent::BadgeUnlocked {
        id: "inbox"
    })));
}

#[tokio::test]
async fn test_empty_end_after_chunks_keeps_streamed_text() {
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::Stream(vec![
            sse_line(r#"{"type":"chunk","output":"partial"}"#),
            sse_line(r#"{"type":"end","output":""}"#),
        ])],
        Duration::from_secs(5),
    );

    let outcome = manager
        .send_message("hi".to_string(), None, &CancellationToken::new())
        .await
        .expect("turn runs");

    assert_eq!(outcome.text(), Some("partial"));
}

#[tokio::test]
async fn test_relay_status_error_marks_turn_failed() {
    let (mut manager, _relay) =
        make_conversation(vec![MockReply::Status(502)], Duration::from_secs(5));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = manager
        .send_message("hi".to_string(), Some(&tx), &CancellationToken::new())
        .await
        .expect("turn runs");

    match &outcome {
        TurnOutcome::Failed {
            error: TurnError::Status(502),
        } => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    let reply = &manager.messages()[1];
    assert!(reply.error);
    assert_eq!(reply.content, "Something went wrong. Please try again.");
    assert!(!manager.game().has_badge("goal_setter"));
    assert!(drain(&mut rx).contains(&ConversationStreamUpdate::Failed {
        message: "Something went wrong. Please try again.".to_string()
    }));
}

#[tokio::test]
async fn test_timeout_without_output_reports_took_too_long() {
    let (mut manager, _relay) = make_conversation(vec![MockReply::Stall], SHORT_TIMEOUT);

    let outcome = manager
        .send_message("hi".to_string(), None, &CancellationToken::new())
        .await
        .expect("turn runs");

    assert!(matches!(
        outcome,
        TurnOutcome::Failed {
            error: TurnError::TimedOut(_)
        }
    ));
    let reply = &manager.messages()[1];
    assert!(reply.error);
    assert_eq!(
        reply.content,
        "The coach took too long to respond. Please try again."
    );
}

#[tokio::test]
async fn test_stream_may_outlast_timeout_once_started() {
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::Paced {
            writes: vec![
                sse_line(r#"{"type":"chunk","output":"Warm "}"#),
                sse_line(r#"{"type":"chunk","output":"up "}"#),
                sse_line(r#"{"type":"chunk","output":"first. Plan sent to your inbox."}"#),
            ],
            gap: Duration::from_millis(50),
        }],
        SHORT_TIMEOUT,
    );

    let outcome = manager
        .send_message("hi".to_string(), None, &CancellationToken::new())
        .await
        .expect("turn runs");

    match &outcome {
        TurnOutcome::Completed { text } => {
            assert_eq!(text, "Warm up first. Plan sent to your inbox.")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(manager.game().has_badge("goal_setter"));
    assert!(manager.game().has_badge("inbox"));
}

#[tokio::test]
async fn test_cancel_after_partial_output_keeps_partial_text() {
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::StreamThenStall(vec![sse_line(
            r#"{"type":"chunk","output":"Warm up first."}"#,
        )])],
        SHORT_TIMEOUT,
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let outcome = manager
        .send_message("hi".to_string(), None, &cancel)
        .await
        .expect("turn runs");

    match &outcome {
        TurnOutcome::Interrupted {
            text,
            error: TurnError::Cancelled,
        } => assert_eq!(text, "Warm up first."),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let reply = &manager.messages()[1];
    assert!(!reply.error);
    assert_eq!(reply.content, "Warm up first.");
    assert!(!manager.game().has_badge("goal_setter"));
}

#[tokio::test]
async fn test_transport_failure_mid_stream_keeps_partial_text() {
    let (mut manager, _relay) = make_conversation(
        vec![MockReply::StreamThenError(vec![sse_line(
            r#"{"type":"AIMessageChunk","content":"Squats"}"#,
        )])],
        Duration::from_secs(5),
    );

    let outcome = manager
        .send_message("hi".to_string(), None, &CancellationToken::new())
        .await
        .expect("turn runs");

    assert_eq!(outcome.text(), Some("Squats"));
    assert!(!outcome.is_failed());
}

#[tokio::test]
async fn test_cancelled_turn_without_output_fails() {
    let (mut manager, _relay) = make_conversation(vec![MockReply::Stall], Duration::from_secs(5));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = manager
        .send_message("hi".to_string(), None, &cancel)
        .await
        .expect("turn runs");

    assert!(matches!(
        outcome,
        TurnOutcome::Failed {
            error: TurnError::Cancelled
        }
    ));
}

#[tokio::test]
async fn test_session_id_is_stable_across_turns() {
    let (mut manager, relay) = make_conversation(
        vec![
            MockReply::Reply("one".to_string()),
            MockReply::Reply("two".to_string()),
        ],
        Duration::from_secs(5),
    );
    let cancel = CancellationToken::new();

    manager.send_message("a".to_string(), None, &cancel).await.expect("first");
    manager.send_message("b".to_string(), None, &cancel).await.expect("second");

    let requests = relay.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].session_id, manager.session_id());
    assert_eq!(requests[1].session_id, manager.session_id());
    assert_eq!(requests[1].message, "b");
    assert_eq!(manager.session_messages(), 2);
    assert_eq!(manager.game().xp, 20);
}

#[tokio::test]
async fn test_blank_message_is_rejected_without_side_effects() {
    let (mut manager, relay) = make_conversation(vec![], Duration::from_secs(5));

    let result = manager
        .send_message("   ".to_string(), None, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(manager.messages().is_empty());
    assert!(relay.requests().is_empty());
    assert_eq!(manager.game(), &GameState::default());
}

#[test]
fn test_start_session_rolls_streak_and_counts_session() {
    let store = MemoryStore::with_state(GameState {
        streak: crate::gamification::Streak {
            last: "2026-05-09".to_string(),
            count: 2,
        },
        ..GameState::default()
    });
    let client = RelayClient::new_mock(Arc::new(MockRelay::new(vec![])));
    let mut manager = ConversationManager::new(client, Box::new(store), Duration::from_secs(5));

    let today = NaiveDate::from_ymd_opt(2026, 5, 10).expect("valid date");
    let events = manager.start_session(today);

    assert_eq!(manager.game().streak.count, 3);
    assert_eq!(manager.game().sessions, 1);
    assert!(events.contains(&GameEvent::BadgeUnlocked { id: "comeback" }));
}
