//! Telegram update handlers.
//!
//! Every message is converted once into the core's inbound model and handed
//! to the relay, which decides between commands, forwarding and routing.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::error;

use crate::router::AppState;

mod incoming;

pub use incoming::{content_of, incoming_from};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let event = incoming_from(&msg);
    let kind = event.content.kind();

    // Failures never reach the dispatcher; the next update is handled normally.
    if let Err(e) = state.relay.handle(event).await {
        error!(chat = msg.chat.id.0, kind, "failed to handle message: {e}");
    }

    Ok(())
}
