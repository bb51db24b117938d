use teloxide::types::Message;

use relay_core::{
    domain::{ChatId, MessageId},
    messaging::types::{Content, IncomingMessage},
};

pub fn incoming_from(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        reply_to: msg.reply_to_message().map(|m| MessageId(m.id.0)),
        content: content_of(msg),
    }
}

/// Pick the payload: text, photo (largest size), video, document, voice, sticker.
pub fn content_of(msg: &Message) -> Content {
    let caption = || msg.caption().map(str::to_string);

    if let Some(text) = msg.text() {
        return Content::Text {
            text: text.to_string(),
        };
    }
    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        return Content::Photo {
            file_id: best.file.id.clone(),
            caption: caption(),
        };
    }
    if let Some(video) = msg.video() {
        return Content::Video {
            file_id: video.file.id.clone(),
            caption: caption(),
        };
    }
    if let Some(doc) = msg.document() {
        return Content::Document {
            file_id: doc.file.id.clone(),
            caption: caption(),
        };
    }
    if let Some(voice) = msg.voice() {
        return Content::Voice {
            file_id: voice.file.id.clone(),
            caption: caption(),
        };
    }
    if let Some(sticker) = msg.sticker() {
        return Content::Sticker {
            file_id: sticker.file.id.clone(),
        };
    }
    Content::Unsupported
}
