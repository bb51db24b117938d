//! The relay: dispatches each inbound message to a command handler, the
//! user->admin forward path, or the admin->user routing path.
//!
//! Updates are handled one at a time (the adapter runs a single dispatch
//! worker). The tables sit behind a mutex that is never held across a send.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::Mutex;
use tracing::info;

use crate::{
    config::Config,
    domain::ChatId,
    links::LinkTable,
    messaging::{
        port::MessagingPort,
        types::{IncomingMessage, OutgoingMessage},
    },
    store::StateStore,
    Result,
};

mod broadcast;
mod commands;
mod router;
#[cfg(test)]
mod testing;

pub use commands::{parse_command, Command};

pub const ADMIN_PANEL_ACTIVE: &str = "✅ Admin panel active.";
pub const WELCOME: &str = "👋 Welcome! Send me anything — I’ll forward it to the admin.";
pub const NOT_AUTHORIZED: &str = "🚫 You’re not authorized.";
pub const BROADCAST_PROMPT: &str = "📢 Send your broadcast message now.";
pub const BROADCAST_UNSUPPORTED: &str =
    "⚠️ This message type can't be broadcast. Broadcast cancelled.";
pub const NO_ACTIVE_USER: &str =
    "⚠️ No active user selected. Reply to a user's message first to start chatting.";
pub const RECIPIENT_UNAVAILABLE: &str = "⚠️ User has blocked the bot or is unavailable.";

/// Process-wide relay state.
#[derive(Clone, Debug)]
pub struct RelayTables {
    /// Every non-admin chat that ever wrote to the bot. Never shrinks.
    pub users: HashSet<ChatId>,
    pub links: LinkTable,
    /// Fallback destination for admin messages that are not replies.
    pub active_user: Option<ChatId>,
    /// Next admin message is broadcast content.
    pub broadcast_waiting: bool,
}

impl RelayTables {
    pub fn empty(link_capacity: usize) -> Self {
        Self {
            users: HashSet::new(),
            links: LinkTable::new(link_capacity),
            active_user: None,
            broadcast_waiting: false,
        }
    }

    /// Hydrate from the persisted snapshots. The broadcast flag is never persisted.
    pub fn load(store: &StateStore, link_capacity: usize) -> Self {
        Self {
            users: store.load_users(),
            links: store.load_links(link_capacity),
            active_user: store.load_active_user(),
            broadcast_waiting: false,
        }
    }
}

pub struct Relay {
    admin: ChatId,
    donate_upi: Option<String>,
    donate_url: Option<String>,
    messenger: Arc<dyn MessagingPort>,
    store: StateStore,
    tables: Mutex<RelayTables>,
}

impl Relay {
    pub fn new(
        cfg: &Config,
        messenger: Arc<dyn MessagingPort>,
        store: StateStore,
        tables: RelayTables,
    ) -> Self {
        Self {
            admin: cfg.admin_chat_id,
            donate_upi: cfg.donate_upi.clone(),
            donate_url: cfg.donate_url.clone(),
            messenger,
            store,
            tables: Mutex::new(tables),
        }
    }

    /// Build the relay with state hydrated from the configured files.
    pub fn from_config(cfg: &Config, messenger: Arc<dyn MessagingPort>) -> Self {
        let store = StateStore::from_config(cfg);
        let tables = RelayTables::load(&store, cfg.link_capacity);
        info!(
            admin = %cfg.admin_chat_id,
            users = tables.users.len(),
            links = tables.links.len(),
            active_user = ?tables.active_user.map(|c| c.0),
            "relay state loaded"
        );
        Self::new(cfg, messenger, store, tables)
    }

    pub fn is_admin(&self, chat_id: ChatId) -> bool {
        chat_id == self.admin
    }

    /// Wait for every scheduled state write to reach disk.
    pub async fn flush_state(&self) {
        self.store.flush().await;
    }

    /// Copy of the current tables.
    pub async fn snapshot(&self) -> RelayTables {
        self.tables.lock().await.clone()
    }

    /// Entry point for one inbound message.
    ///
    /// Known commands win over relaying for every sender. Errors returned here
    /// are transport failures outside the admin->user send (which reports to
    /// the admin instead); the caller logs them.
    pub async fn handle(&self, msg: IncomingMessage) -> Result<()> {
        if let Some(cmd) = msg.content.as_text().and_then(parse_command) {
            return self.handle_command(cmd, &msg).await;
        }

        if self.is_admin(msg.chat_id) {
            self.handle_admin_message(&msg).await
        } else {
            self.handle_user_message(&msg).await
        }
    }

    async fn reply(&self, chat_id: ChatId, msg: OutgoingMessage) -> Result<()> {
        self.messenger.send(chat_id, &msg).await?;
        Ok(())
    }

    async fn notify_admin(&self, text: impl Into<String>) -> Result<()> {
        self.reply(self.admin, OutgoingMessage::plain(text)).await
    }

    /// Add a user to the registry and persist it.
    async fn register_user(&self, chat_id: ChatId) {
        let mut tables = self.tables.lock().await;
        if tables.users.insert(chat_id) {
            info!(user = %chat_id, "new user registered");
        }
        self.store.save_users(&tables.users);
    }
}
