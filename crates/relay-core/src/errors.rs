/// Core error type for the relay.
///
/// Adapter crates map their transport errors into this type so the relay can
/// tell an unreachable recipient apart from any other failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The recipient blocked the bot, deactivated their account, or never
    /// started a conversation with it.
    #[error("recipient unavailable: {0}")]
    RecipientUnavailable(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
