use std::sync::Arc;

use relay_core::config::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), relay_core::Error> {
    relay_core::logging::init("relay")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        admin = %cfg.admin_chat_id,
        state_dir = %cfg.state_dir.display(),
        webhook = cfg.webhook.is_some(),
        "configuration loaded"
    );

    relay_telegram::router::run(cfg)
        .await
        .map_err(|e| relay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
