use crate::domain::{ChatId, MessageId};

/// Payload of a message, decided once when the update is ingested.
///
/// Adapters pick the first matching kind in the order text, photo, video,
/// document, voice, sticker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Text {
        text: String,
    },
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Video {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        caption: Option<String>,
    },
    Voice {
        file_id: String,
        caption: Option<String>,
    },
    Sticker {
        file_id: String,
    },
    /// Anything the relay does not copy (locations, polls, contacts, ...).
    Unsupported,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
            Self::Document { .. } => "document",
            Self::Voice { .. } => "voice",
            Self::Sticker { .. } => "sticker",
            Self::Unsupported => "unsupported",
        }
    }

    /// Same media with its caption replaced. Text and stickers are returned unchanged.
    pub fn with_caption(&self, caption: Option<String>) -> Self {
        match self {
            Self::Photo { file_id, .. } => Self::Photo {
                file_id: file_id.clone(),
                caption,
            },
            Self::Video { file_id, .. } => Self::Video {
                file_id: file_id.clone(),
                caption,
            },
            Self::Document { file_id, .. } => Self::Document {
                file_id: file_id.clone(),
                caption,
            },
            Self::Voice { file_id, .. } => Self::Voice {
                file_id: file_id.clone(),
                caption,
            },
            other => other.clone(),
        }
    }
}

/// One inbound message as delivered by the transport.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Id of the message this one replies to, in the same chat.
    pub reply_to: Option<MessageId>,
    pub content: Content,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: Content,
    pub reply_to: Option<MessageId>,
    pub format: TextFormat,
    pub disable_link_preview: bool,
}

impl OutgoingMessage {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            reply_to: None,
            format: TextFormat::Plain,
            disable_link_preview: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(Content::text(text))
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self {
            format: TextFormat::Html,
            ..Self::new(Content::text(html))
        }
    }

    pub fn reply_to(mut self, message_id: Option<MessageId>) -> Self {
        self.reply_to = message_id;
        self
    }

    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}
