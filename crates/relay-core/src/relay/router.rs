use tracing::{debug, info};

use super::{Relay, NO_ACTIVE_USER, RECIPIENT_UNAVAILABLE};
use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    links::LinkRecord,
    messaging::types::{Content, IncomingMessage, OutgoingMessage},
    Result,
};

impl Relay {
    /// User -> admin: forward verbatim and remember where the copy came from.
    ///
    /// A failed forward is returned to the caller.
    pub(super) async fn handle_user_message(&self, msg: &IncomingMessage) -> Result<()> {
        self.register_user(msg.chat_id).await;

        let source = MessageRef {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
        };
        let copy = self.messenger.forward(self.admin, source).await?;

        let mut tables = self.tables.lock().await;
        let evicted = tables.links.insert(
            copy.message_id,
            LinkRecord {
                user_id: msg.chat_id,
                user_msg_id: msg.message_id,
            },
        );
        self.store.save_links(&tables.links);

        info!(
            user = %msg.chat_id,
            message = %msg.message_id,
            forwarded = %copy.message_id,
            "forwarded to admin"
        );
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted old message links");
        }
        Ok(())
    }

    /// Admin -> user: broadcast if armed, else reply routing, else the active user.
    pub(super) async fn handle_admin_message(&self, msg: &IncomingMessage) -> Result<()> {
        if self.tables.lock().await.broadcast_waiting {
            let outcome = self.run_broadcast(msg).await;
            self.tables.lock().await.broadcast_waiting = false;
            return outcome;
        }

        let target = {
            let mut tables = self.tables.lock().await;
            let linked = msg.reply_to.and_then(|id| tables.links.get(id).copied());
            match linked {
                Some(link) => {
                    tables.active_user = Some(link.user_id);
                    self.store.save_active_user(tables.active_user);
                    Some((link.user_id, Some(link.user_msg_id)))
                }
                None => tables.active_user.map(|user| (user, None)),
            }
        };

        let Some((user, reply_to)) = target else {
            return self.notify_admin(NO_ACTIVE_USER).await;
        };
        self.deliver_to_user(user, &msg.content, reply_to).await
    }

    /// Copy the admin's content to a user.
    ///
    /// Send failures are reported back to the admin; only a failure to reach
    /// the admin is returned.
    async fn deliver_to_user(
        &self,
        user: ChatId,
        content: &Content,
        reply_to: Option<MessageId>,
    ) -> Result<()> {
        if !content.is_supported() {
            debug!(user = %user, "dropping unsupported admin message");
            return Ok(());
        }

        let outgoing = OutgoingMessage::new(content.clone()).reply_to(reply_to);
        match self.messenger.send(user, &outgoing).await {
            Ok(_) => {
                info!(
                    user = %user,
                    kind = content.kind(),
                    threaded = reply_to.is_some(),
                    "delivered admin message"
                );
                Ok(())
            }
            Err(Error::RecipientUnavailable(detail)) => {
                info!(user = %user, "recipient unavailable: {detail}");
                self.notify_admin(RECIPIENT_UNAVAILABLE).await
            }
            Err(e) => {
                info!(user = %user, "send failed: {e}");
                let report = format!("❌ Failed to send: {}", failure_detail(&e));
                self.notify_admin(report).await
            }
        }
    }
}

/// Error text shown to the admin, without the internal category prefix.
fn failure_detail(e: &Error) -> String {
    match e {
        Error::External(detail) | Error::RecipientUnavailable(detail) => detail.clone(),
        other => other.to_string(),
    }
}
