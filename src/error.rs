use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write subscriber file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize subscribers: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Anything that makes a provider call unusable. Every variant ends in a fallback.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response is missing {0}")]
    MissingField(&'static str),
    #[error("provider reported an error: {0}")]
    Api(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient can no longer be reached (blocked the bot, chat deleted, ...).
    #[error("recipient is unreachable: {0}")]
    RecipientGone(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl DeliveryError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::RecipientGone(_))
    }
}
