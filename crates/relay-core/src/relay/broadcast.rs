use tracing::{debug, info};

use super::{Relay, BROADCAST_UNSUPPORTED};
use crate::{
    domain::ChatId,
    formatting::{announcement_html, broadcast_report, ANNOUNCEMENT_CAPTION},
    messaging::types::{Content, IncomingMessage, OutgoingMessage},
    Result,
};

/// What every user receives for a given admin message, if it can be broadcast.
fn announcement(content: &Content) -> Option<OutgoingMessage> {
    match content {
        Content::Text { text } => Some(OutgoingMessage::html(announcement_html(text))),
        Content::Sticker { .. } => Some(OutgoingMessage::new(content.clone())),
        Content::Unsupported => None,
        media => Some(OutgoingMessage::new(
            media.with_caption(Some(ANNOUNCEMENT_CAPTION.to_string())),
        )),
    }
}

impl Relay {
    /// Send the admin's message to every registered user and report the tally.
    ///
    /// Per-recipient failures are only counted, whatever their cause.
    pub(super) async fn run_broadcast(&self, msg: &IncomingMessage) -> Result<()> {
        // Unsupported content cancels the broadcast with a notice instead of
        // reporting every user as reached without sending anything.
        let Some(outgoing) = announcement(&msg.content) else {
            return self.notify_admin(BROADCAST_UNSUPPORTED).await;
        };

        let recipients: Vec<ChatId> = self.tables.lock().await.users.iter().copied().collect();

        let mut sent = 0usize;
        let mut failed = 0usize;
        for user in recipients {
            match self.messenger.send(user, &outgoing).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    failed += 1;
                    debug!(user = %user, "broadcast send failed: {e}");
                }
            }
        }

        info!(
            sent,
            failed,
            kind = msg.content.kind(),
            "broadcast finished"
        );
        self.notify_admin(broadcast_report(sent, failed)).await
    }
}
