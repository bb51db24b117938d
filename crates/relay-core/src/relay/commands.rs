use tracing::{info, warn};

use super::{Relay, ADMIN_PANEL_ACTIVE, BROADCAST_PROMPT, NOT_AUTHORIZED, WELCOME};
use crate::{
    formatting::donate_html,
    messaging::types::{IncomingMessage, OutgoingMessage},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Donate,
    Broadcast,
}

/// Parse a known bot command. Telegram may send `/cmd@botname arg1 ...`;
/// arguments are ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next()?.to_lowercase();

    match name.as_str() {
        "start" => Some(Command::Start),
        "donate" => Some(Command::Donate),
        "broadcast" => Some(Command::Broadcast),
        _ => None,
    }
}

impl Relay {
    pub(super) async fn handle_command(&self, cmd: Command, msg: &IncomingMessage) -> Result<()> {
        match cmd {
            Command::Start => self.cmd_start(msg).await,
            Command::Donate => self.cmd_donate(msg).await,
            Command::Broadcast => self.cmd_broadcast(msg).await,
        }
    }

    async fn cmd_start(&self, msg: &IncomingMessage) -> Result<()> {
        if self.is_admin(msg.chat_id) {
            return self.notify_admin(ADMIN_PANEL_ACTIVE).await;
        }
        self.register_user(msg.chat_id).await;
        self.reply(msg.chat_id, OutgoingMessage::plain(WELCOME))
            .await
    }

    async fn cmd_donate(&self, msg: &IncomingMessage) -> Result<()> {
        let html = donate_html(self.donate_upi.as_deref(), self.donate_url.as_deref());
        let reply = OutgoingMessage::html(html).without_link_preview();
        self.reply(msg.chat_id, reply).await
    }

    async fn cmd_broadcast(&self, msg: &IncomingMessage) -> Result<()> {
        if !self.is_admin(msg.chat_id) {
            warn!(chat = %msg.chat_id, "non-admin tried /broadcast");
            return self
                .reply(msg.chat_id, OutgoingMessage::plain(NOT_AUTHORIZED))
                .await;
        }
        self.tables.lock().await.broadcast_waiting = true;
        info!("broadcast armed");
        self.notify_admin(BROADCAST_PROMPT).await
    }
}
