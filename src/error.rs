use thiserror::Error;

/// Reasons a price fetch produced no usable record.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed answered with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("feed reported an unsuccessful response")]
    Unsuccessful,

    #[error("feed returned no price observations")]
    EmptyFeed,

    #[error("malformed feed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
