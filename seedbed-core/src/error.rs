use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Could not set up frontier store: {0}")]
    Setup(String),

    #[error("Not a valid URL: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redirect chain has {hops} hops, limit is {max}")]
    RedirectLimit { hops: usize, max: usize },

    #[error("Corrupt record for key {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SeedError {
    pub(crate) fn invalid_url(url: &str, reason: impl ToString) -> Self {
        SeedError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
