use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_LINK_CAPACITY: usize = 500;
const DEFAULT_WEBHOOK_ADDR: &str = "0.0.0.0:8080";

/// Typed configuration for the relay bot.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_chat_id: ChatId,

    // State files
    pub state_dir: PathBuf,
    pub users_file: PathBuf,
    pub links_file: PathBuf,
    pub active_user_file: PathBuf,
    pub link_capacity: usize,

    /// Webhook mode when set, long polling otherwise.
    pub webhook: Option<WebhookConfig>,

    // /donate
    pub donate_upi: Option<String>,
    pub donate_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Public base URL; the bot token is appended as the secret path.
    pub url: String,
    pub address: SocketAddr,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = var("BOT_TOKEN")
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("BOT_TOKEN environment variable is required".to_string())
            })?;

        let admin_raw = var("ADMIN_CHAT_ID").ok_or_else(|| {
            Error::Config("ADMIN_CHAT_ID environment variable is required".to_string())
        })?;
        let admin_chat_id = parse_admin(&admin_raw)?;

        let state_dir = var("RELAY_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let link_capacity = match var("RELAY_LINK_CAPACITY") {
            Some(raw) => parse_capacity(&raw)?,
            None => DEFAULT_LINK_CAPACITY,
        };

        let webhook = match var("RELAY_WEBHOOK_URL") {
            Some(url) => {
                let raw_addr =
                    var("RELAY_WEBHOOK_ADDR").unwrap_or_else(|| DEFAULT_WEBHOOK_ADDR.to_string());
                let address = raw_addr.trim().parse::<SocketAddr>().map_err(|e| {
                    Error::Config(format!("RELAY_WEBHOOK_ADDR is invalid ({raw_addr}): {e}"))
                })?;
                Some(WebhookConfig {
                    url: url.trim().trim_end_matches('/').to_string(),
                    address,
                })
            }
            None => None,
        };

        Ok(Self {
            telegram_bot_token,
            admin_chat_id,
            users_file: state_dir.join("users.json"),
            links_file: state_dir.join("message_links.json"),
            active_user_file: state_dir.join("active_user.json"),
            state_dir,
            link_capacity,
            webhook,
            donate_upi: var("DONATE_UPI"),
            donate_url: var("DONATE_URL"),
        })
    }

    /// Make sure the state directory exists before the first write.
    pub fn ensure_state_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }
}

fn parse_admin(raw: &str) -> Result<ChatId> {
    match raw.trim().parse::<i64>() {
        Ok(id) => Ok(ChatId(id)),
        Err(_) => Err(Error::Config(format!("invalid ADMIN_CHAT_ID: {raw}"))),
    }
}

fn parse_capacity(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::Config(format!(
            "RELAY_LINK_CAPACITY must be a positive integer, got {raw}"
        ))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
