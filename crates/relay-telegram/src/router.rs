use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*,
    update_listeners::webhooks,
};
use tracing::{debug, info, warn};

use relay_core::{config::Config, messaging::port::MessagingPort, relay::Relay};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Run the bot until the listener stops (long polling, or webhook when configured).
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    cfg.ensure_state_dir()?;

    let bot = Bot::new(cfg.telegram_bot_token.clone());
    match bot.get_me().await {
        Ok(me) => info!("relay started: @{}", me.username()),
        Err(e) => warn!("getMe failed, continuing: {e}"),
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let relay = Arc::new(Relay::from_config(&cfg, messenger));
    let state = Arc::new(AppState {
        relay: relay.clone(),
    });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    // One key for every update: all updates go through a single worker in
    // arrival order, so relay state is only ever touched by one handler.
    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .distribution_function(|_: &Update| Some(()))
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("relay handler"))
        .build();

    match &cfg.webhook {
        Some(hook) => {
            let url = webhook_url(&hook.url, &cfg.telegram_bot_token)?;
            info!(address = %hook.address, "receiving updates via webhook");
            let listener = webhooks::axum(bot, webhooks::Options::new(hook.address, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("webhook listener"),
                )
                .await;
        }
        None => {
            info!("receiving updates via long polling");
            dispatcher.dispatch().await;
        }
    }

    relay.flush_state().await;
    info!("relay stopped");
    Ok(())
}

/// `<base>/<token>`: the token doubles as the secret webhook path.
fn webhook_url(base: &str, token: &str) -> anyhow::Result<reqwest::Url> {
    let raw = format!("{}/{token}", base.trim_end_matches('/'));
    reqwest::Url::parse(&raw).map_err(|e| anyhow::anyhow!("invalid RELAY_WEBHOOK_URL {base}: {e}"))
}
