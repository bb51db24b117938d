use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::OutgoingMessage,
    Result,
};

/// Outbound side of the messenger.
///
/// Implementations return [`crate::Error::RecipientUnavailable`] when the
/// destination cannot be reached (blocked bot, deleted account, ...), and
/// [`crate::Error::External`] for every other transport failure.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a new message. `Content::Unsupported` is never passed in.
    async fn send(&self, chat_id: ChatId, msg: &OutgoingMessage) -> Result<MessageRef>;

    /// Platform-level forward that keeps the "forwarded from" header.
    async fn forward(&self, to: ChatId, from: MessageRef) -> Result<MessageRef>;
}
