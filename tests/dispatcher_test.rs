//! Dispatcher integration tests
//! Run with: cargo test --test dispatcher_test

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use baby_bot::application::errors::{BotError, StorageError};
use baby_bot::application::messaging::replies;
use baby_bot::application::messaging::{Dispatcher, ValueParser};
use baby_bot::application::services::CommandService;
use baby_bot::domain::entities::{Measurement, Update, User};
use baby_bot::domain::traits::{Bot, BotInfo, Store};
use baby_bot::infrastructure::storage::MemoryStore;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

type Outbox = Arc<Mutex<Vec<(i64, String)>>>;

/// Replays a fixed list of updates, then reports the stream as closed
struct ScriptedBot {
    updates: VecDeque<Update>,
    sent: Outbox,
}

impl ScriptedBot {
    fn new(updates: Vec<Update>) -> (Self, Outbox) {
        let sent = Outbox::default();
        let bot = Self {
            updates: updates.into(),
            sent: Arc::clone(&sent),
        };
        (bot, sent)
    }
}

#[async_trait]
impl Bot for ScriptedBot {
    async fn next_update(&mut self) -> Option<Update> {
        self.updates.pop_front()
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: 1,
            name: "test".to_string(),
            username: "test_bot".to_string(),
        }
    }
}

/// Never delivers anything
struct IdleBot;

#[async_trait]
impl Bot for IdleBot {
    async fn next_update(&mut self) -> Option<Update> {
        std::future::pending().await
    }

    async fn send_message(&self, _chat_id: i64, _text: &str) -> Result<(), BotError> {
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: 2,
            name: "idle".to_string(),
            username: "idle_bot".to_string(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    GetLastUnavailable,
    GetLastStalls,
    PutUnavailable,
}

/// Memory store with one injected failure
struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
}

#[async_trait]
impl Store for FaultyStore {
    async fn put(&self, measurement: &Measurement) -> Result<(), StorageError> {
        if self.fault == Fault::PutUnavailable {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        self.inner.put(measurement).await
    }

    async fn get_last(&self, user_id: i64) -> Result<i64, StorageError> {
        match self.fault {
            Fault::GetLastUnavailable => Err(StorageError::Unavailable("connection refused".to_string())),
            Fault::GetLastStalls => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                self.inner.get_last(user_id).await
            }
            Fault::PutUnavailable => self.inner.get_last(user_id).await,
        }
    }

    async fn add_user(&self, user: &User) -> Result<(), StorageError> {
        self.inner.add_user(user).await
    }
}

fn anna() -> User {
    User::new(42, "Anna").with_username("anna")
}

fn text(user: &User, text: &str) -> Update {
    Update::message(user.id, Some(user.clone()), text)
}

async fn run_script(store: Arc<dyn Store>, updates: Vec<Update>) -> Vec<(i64, String)> {
    ensure_init();
    let (bot, sent) = ScriptedBot::new(updates);
    let mut dispatcher = Dispatcher::new(CommandService::with_defaults(), ValueParser::new(), store, bot)
        .with_store_timeout(Duration::from_millis(200));
    dispatcher.run(CancellationToken::new()).await;
    let sent = sent.lock().unwrap().clone();
    sent
}

#[tokio::test]
async fn test_first_reading_uses_zero_baseline() {
    let store = MemoryStore::new();
    let sent = run_script(Arc::new(store.clone()), vec![text(&anna(), "3001")]).await;

    assert_eq!(sent, vec![(42, replies::delta(0, 3001))]);
    assert!(sent[0].1.contains("Previous: 0 g."));
    assert!(sent[0].1.contains("Difference: 3001 g."));
    assert!(sent[0].1.ends_with(replies::UP));

    let stored = store.measurements(42).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, 3001);
    assert_eq!(stored[0].user_id, 42);
}

#[tokio::test]
async fn test_readings_report_delta_against_previous() {
    let store = MemoryStore::new();
    let user = anna();
    let sent = run_script(
        Arc::new(store.clone()),
        vec![text(&user, "3001"), text(&user, "4.058"), text(&user, "5,140")],
    )
    .await;

    assert_eq!(
        sent,
        vec![
            (42, replies::delta(0, 3001)),
            (42, replies::delta(3001, 4058)),
            (42, replies::delta(4058, 5140)),
        ]
    );
    assert!(sent[1].1.contains("Difference: 1057 g."));

    let values: Vec<i64> = store.measurements(42).await.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![3001, 4058, 5140]);
    assert_eq!(store.get_last(42).await.unwrap(), 5140);
}

#[tokio::test]
async fn test_weight_loss_uses_down_indicator() {
    let user = anna();
    let sent = run_script(
        Arc::new(MemoryStore::new()),
        vec![text(&user, "4.058"), text(&user, "4000")],
    )
    .await;

    assert!(sent[1].1.contains("Difference: -58 g."));
    assert!(sent[1].1.ends_with(replies::DOWN));
}

#[tokio::test]
async fn test_invalid_value_gets_corrective_reply_and_no_write() {
    let store = MemoryStore::new();
    let sent = run_script(Arc::new(store.clone()), vec![text(&anna(), "abc")]).await;

    assert_eq!(sent, vec![(42, replies::INVALID_VALUE.to_string())]);
    assert_eq!(store.measurement_count().await, 0);
}

#[tokio::test]
async fn test_users_have_independent_baselines() {
    let store = MemoryStore::new();
    let boris = User::new(7, "Boris");
    let sent = run_script(
        Arc::new(store.clone()),
        vec![text(&anna(), "3001"), text(&boris, "2500"), text(&anna(), "3100")],
    )
    .await;

    assert_eq!(sent[1], (7, replies::delta(0, 2500)));
    assert_eq!(sent[2], (42, replies::delta(3001, 3100)));
}

#[tokio::test]
async fn test_unavailable_baseline_degrades_to_zero_and_still_stores() {
    let inner = MemoryStore::new();
    inner.put(&Measurement::new(42, 3001)).await.unwrap();
    let store = FaultyStore {
        inner: inner.clone(),
        fault: Fault::GetLastUnavailable,
    };

    let sent = run_script(Arc::new(store), vec![text(&anna(), "3200")]).await;

    assert_eq!(sent, vec![(42, replies::delta(0, 3200))]);
    assert_eq!(inner.measurements(42).await.len(), 2);
}

#[tokio::test]
async fn test_stalled_store_call_times_out() {
    let inner = MemoryStore::new();
    let store = FaultyStore {
        inner: inner.clone(),
        fault: Fault::GetLastStalls,
    };

    let sent = tokio::time::timeout(
        Duration::from_secs(5),
        run_script(Arc::new(store), vec![text(&anna(), "3001")]),
    )
    .await
    .expect("dispatcher should not wait for a stalled store");

    assert_eq!(sent, vec![(42, replies::delta(0, 3001))]);
    assert_eq!(inner.measurement_count().await, 1);
}

#[tokio::test]
async fn test_failed_put_still_replies() {
    let inner = MemoryStore::new();
    let store = FaultyStore {
        inner: inner.clone(),
        fault: Fault::PutUnavailable,
    };

    let sent = run_script(Arc::new(store), vec![text(&anna(), "3001"), text(&anna(), "3050")]).await;

    assert_eq!(
        sent,
        vec![(42, replies::delta(0, 3001)), (42, replies::delta(0, 3050))]
    );
    assert_eq!(inner.measurement_count().await, 0);
}

#[tokio::test]
async fn test_unknown_command_is_silent_and_loop_continues() {
    let store = MemoryStore::new();
    let sent = run_script(
        Arc::new(store.clone()),
        vec![text(&anna(), "/unknown"), text(&anna(), "3001")],
    )
    .await;

    assert_eq!(sent, vec![(42, replies::delta(0, 3001))]);
    assert_eq!(store.measurement_count().await, 1);
}

#[tokio::test]
async fn test_help_is_recognized_without_reply() {
    let sent = run_script(Arc::new(MemoryStore::new()), vec![text(&anna(), "/help")]).await;
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_start_replies_and_registers_user() {
    let store = MemoryStore::new();
    let user = anna().with_language_code("ru");
    let sent = run_script(Arc::new(store.clone()), vec![text(&user, "/start")]).await;

    assert_eq!(sent, vec![(42, replies::START.to_string())]);
    assert_eq!(store.user(42).await, Some(user));
}

#[tokio::test]
async fn test_start_with_bot_suffix_and_arguments() {
    let store = MemoryStore::new();
    let sent = run_script(Arc::new(store.clone()), vec![text(&anna(), "/start@test_bot hello")]).await;

    assert_eq!(sent, vec![(42, replies::START.to_string())]);
    assert!(store.user(42).await.is_some());
}

#[tokio::test]
async fn test_start_without_sender_replies_but_skips_registration() {
    let store = MemoryStore::new();
    let sent = run_script(Arc::new(store.clone()), vec![Update::message(100, None, "/start")]).await;

    assert_eq!(sent, vec![(100, replies::START.to_string())]);
    assert!(store.user(0).await.is_none());
}

#[tokio::test]
async fn test_start_reregistration_replaces_user() {
    let store = MemoryStore::new();
    let renamed = User::new(42, "Anya").with_username("anya");
    run_script(
        Arc::new(store.clone()),
        vec![text(&anna(), "/start"), text(&renamed, "/start")],
    )
    .await;

    assert_eq!(store.user(42).await, Some(renamed));
}

#[tokio::test]
async fn test_callback_commands_are_routed() {
    let store = MemoryStore::new();
    let sent = run_script(
        Arc::new(store.clone()),
        vec![Update::callback(42, Some(anna()), "/start")],
    )
    .await;

    assert_eq!(sent, vec![(42, replies::START.to_string())]);
    assert!(store.user(42).await.is_some());
}

#[tokio::test]
async fn test_non_command_callbacks_and_empty_messages_are_ignored() {
    let store = MemoryStore::new();
    let sent = run_script(
        Arc::new(store.clone()),
        vec![
            Update::callback(42, Some(anna()), "3001"),
            text(&anna(), ""),
        ],
    )
    .await;

    assert!(sent.is_empty());
    assert_eq!(store.measurement_count().await, 0);
}

#[tokio::test]
async fn test_unknown_sender_is_recorded_as_user_zero() {
    let store = MemoryStore::new();
    let sent = run_script(Arc::new(store.clone()), vec![Update::message(-100, None, "3001")]).await;

    assert_eq!(sent, vec![(-100, replies::delta(0, 3001))]);
    assert_eq!(store.measurements(0).await.len(), 1);
}

#[tokio::test]
async fn test_run_returns_when_cancelled() {
    ensure_init();
    let cancel = CancellationToken::new();
    let mut dispatcher = Dispatcher::new(
        CommandService::with_defaults(),
        ValueParser::new(),
        Arc::new(MemoryStore::new()),
        IdleBot,
    );

    let token = cancel.clone();
    let run = tokio::spawn(async move { dispatcher.run(token).await });
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should stop after cancellation")
        .unwrap();
}
