//! Recording messenger and fixtures shared by the relay tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use super::{Relay, RelayTables};
use crate::{
    config::Config,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Content, IncomingMessage, OutgoingMessage},
    },
    store::StateStore,
    Result,
};

pub const ADMIN: i64 = 1000;

#[derive(Clone, Debug)]
pub enum Failure {
    Blocked,
    Other(String),
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    attempts: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    forwards: Mutex<Vec<(ChatId, MessageRef, MessageRef)>>,
    failures: Mutex<HashMap<ChatId, Failure>>,
}

impl FakeMessenger {
    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        if *guard == 0 {
            *guard = 100;
        }
        let id = *guard;
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    pub fn fail(&self, chat_id: i64, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .insert(ChatId(chat_id), failure);
    }

    /// Every send attempt, failed ones included.
    pub fn attempts(&self) -> Vec<(ChatId, OutgoingMessage)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_to(&self, chat_id: ChatId) -> Vec<OutgoingMessage> {
        self.attempts()
            .into_iter()
            .filter(|(c, _)| *c == chat_id)
            .map(|(_, m)| m)
            .collect()
    }

    /// Plain/HTML texts sent to the admin chat.
    pub fn admin_texts(&self) -> Vec<String> {
        self.attempts_to(ChatId(ADMIN))
            .into_iter()
            .filter_map(|m| m.content.as_text().map(str::to_string))
            .collect()
    }

    /// `(destination, source, resulting copy)` per forward.
    pub fn forwards(&self) -> Vec<(ChatId, MessageRef, MessageRef)> {
        self.forwards.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send(&self, chat_id: ChatId, msg: &OutgoingMessage) -> Result<MessageRef> {
        assert!(
            msg.content.is_supported(),
            "unsupported content reached the port"
        );
        self.attempts.lock().unwrap().push((chat_id, msg.clone()));
        match self.failures.lock().unwrap().get(&chat_id) {
            Some(Failure::Blocked) => {
                return Err(Error::RecipientUnavailable(
                    "Forbidden: bot was blocked by the user".to_string(),
                ))
            }
            Some(Failure::Other(text)) => return Err(Error::External(text.clone())),
            None => {}
        }
        Ok(self.alloc(chat_id))
    }

    async fn forward(&self, to: ChatId, from: MessageRef) -> Result<MessageRef> {
        if let Some(Failure::Other(text)) = self.failures.lock().unwrap().get(&to) {
            return Err(Error::External(text.clone()));
        }
        let copy = self.alloc(to);
        self.forwards.lock().unwrap().push((to, from, copy));
        Ok(copy)
    }
}

pub struct Fixture {
    pub relay: Relay,
    pub messenger: Arc<FakeMessenger>,
    pub dir: PathBuf,
    cfg: Config,
}

impl Fixture {
    /// Another relay over the same messenger and files, with preset tables.
    pub fn relay_with(&self, tables: RelayTables) -> Relay {
        Relay::new(
            &self.cfg,
            self.messenger.clone(),
            StateStore::from_config(&self.cfg),
            tables,
        )
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

static FIXTURE_SEQ: AtomicUsize = AtomicUsize::new(0);

pub fn fixture() -> Fixture {
    let n = FIXTURE_SEQ.fetch_add(1, Ordering::SeqCst);
    let dir = PathBuf::from(format!("/tmp/relay-test-{}-{n}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let vars: HashMap<&str, String> = HashMap::from([
        ("BOT_TOKEN", "123:test".to_string()),
        ("ADMIN_CHAT_ID", ADMIN.to_string()),
        ("RELAY_STATE_DIR", dir.to_string_lossy().to_string()),
        ("DONATE_UPI", "relay@upi".to_string()),
    ]);
    let cfg = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();

    let messenger = Arc::new(FakeMessenger::default());
    let store = StateStore::from_config(&cfg);
    let relay = Relay::new(
        &cfg,
        messenger.clone(),
        store,
        RelayTables::empty(cfg.link_capacity),
    );

    Fixture {
        relay,
        messenger,
        dir,
        cfg,
    }
}

pub fn incoming(
    chat_id: i64,
    message_id: i32,
    reply_to: Option<i32>,
    content: Content,
) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId(chat_id),
        message_id: MessageId(message_id),
        reply_to: reply_to.map(MessageId),
        content,
    }
}

pub fn text_from(chat_id: i64, message_id: i32, text: &str) -> IncomingMessage {
    incoming(chat_id, message_id, None, Content::text(text))
}
