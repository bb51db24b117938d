//! Telegram adapter (teloxide).
//!
//! This crate implements the `relay-core` MessagingPort over Telegram Bot API
//! and feeds incoming updates into the relay.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use relay_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{Content, OutgoingMessage, TextFormat},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(map_err(other)),
                },
            }
        }
    }
}

/// Applies the optional caption and reply target shared by the media requests.
macro_rules! media_request {
    ($req:expr, $caption:expr, $reply_to:expr) => {{
        let mut req = $req;
        if let Some(caption) = $caption {
            req = req.caption(caption);
        }
        if let Some(id) = $reply_to {
            req = req.reply_to_message_id(TelegramMessenger::tg_msg_id(id));
        }
        req
    }};
}

type TgChatId = teloxide::types::ChatId;

impl TelegramMessenger {
    fn text_request(
        &self,
        chat: TgChatId,
        text: &str,
        msg: &OutgoingMessage,
    ) -> <Bot as Requester>::SendMessage {
        let mut req = self.bot.send_message(chat, text);
        if let Some(mode) = parse_mode(msg.format) {
            req = req.parse_mode(mode);
        }
        if msg.disable_link_preview {
            req = req.disable_web_page_preview(true);
        }
        if let Some(id) = msg.reply_to {
            req = req.reply_to_message_id(Self::tg_msg_id(id));
        }
        req
    }

    fn photo_request(
        &self,
        chat: TgChatId,
        file_id: &str,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> <Bot as Requester>::SendPhoto {
        media_request!(
            self.bot.send_photo(chat, InputFile::file_id(file_id)),
            caption,
            reply_to
        )
    }

    fn video_request(
        &self,
        chat: TgChatId,
        file_id: &str,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> <Bot as Requester>::SendVideo {
        media_request!(
            self.bot.send_video(chat, InputFile::file_id(file_id)),
            caption,
            reply_to
        )
    }

    fn document_request(
        &self,
        chat: TgChatId,
        file_id: &str,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> <Bot as Requester>::SendDocument {
        media_request!(
            self.bot.send_document(chat, InputFile::file_id(file_id)),
            caption,
            reply_to
        )
    }

    fn voice_request(
        &self,
        chat: TgChatId,
        file_id: &str,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> <Bot as Requester>::SendVoice {
        media_request!(
            self.bot.send_voice(chat, InputFile::file_id(file_id)),
            caption,
            reply_to
        )
    }

    fn sticker_request(
        &self,
        chat: TgChatId,
        file_id: &str,
        reply_to: Option<MessageId>,
    ) -> <Bot as Requester>::SendSticker {
        let mut req = self.bot.send_sticker(chat, InputFile::file_id(file_id));
        if let Some(id) = reply_to {
            // sendSticker takes the bare integer id.
            req = req.reply_to_message_id(id.0);
        }
        req
    }
}

/// Forbidden-class API errors mean the recipient cannot be reached at all.
pub fn map_err(e: RequestError) -> Error {
    match &e {
        RequestError::Api(api) if is_unreachable(api) => Error::RecipientUnavailable(e.to_string()),
        _ => Error::External(e.to_string()),
    }
}

fn is_unreachable(e: &ApiError) -> bool {
    match e {
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::UserDeactivated
        | ApiError::CantInitiateConversation
        | ApiError::CantTalkWithBots => true,
        ApiError::Unknown(text) => text.starts_with("Forbidden"),
        _ => false,
    }
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Html => Some(ParseMode::Html),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send(&self, chat_id: ChatId, msg: &OutgoingMessage) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let reply_to = msg.reply_to;

        let sent = match &msg.content {
            Content::Text { text } => {
                let req = || self.text_request(chat, text, msg);
                self.with_retry(req).await?
            }
            Content::Photo { file_id, caption } => {
                let req = || self.photo_request(chat, file_id, caption.as_deref(), reply_to);
                self.with_retry(req).await?
            }
            Content::Video { file_id, caption } => {
                let req = || self.video_request(chat, file_id, caption.as_deref(), reply_to);
                self.with_retry(req).await?
            }
            Content::Document { file_id, caption } => {
                let req = || self.document_request(chat, file_id, caption.as_deref(), reply_to);
                self.with_retry(req).await?
            }
            Content::Voice { file_id, caption } => {
                let req = || self.voice_request(chat, file_id, caption.as_deref(), reply_to);
                self.with_retry(req).await?
            }
            Content::Sticker { file_id } => {
                let req = || self.sticker_request(chat, file_id, reply_to);
                self.with_retry(req).await?
            }
            Content::Unsupported => {
                return Err(Error::External("unsupported content".to_string()));
            }
        };

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.id.0),
        })
    }

    async fn forward(&self, to: ChatId, from: MessageRef) -> Result<MessageRef> {
        let copy = self
            .with_retry(|| {
                self.bot.forward_message(
                    Self::tg_chat(to),
                    Self::tg_chat(from.chat_id),
                    Self::tg_msg_id(from.message_id),
                )
            })
            .await?;

        Ok(MessageRef {
            chat_id: to,
            message_id: MessageId(copy.id.0),
        })
    }
}
