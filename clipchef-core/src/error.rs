use thiserror::Error;

use crate::ai::AiError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Response larger than {max} bytes")]
    TooLarge { max: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Content understanding failed: {0}")]
    Understanding(#[from] AiError),

    #[error("Content understanding timed out after {0}s")]
    TimedOut(u64),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Media too large to analyze: {size} bytes (max {max})")]
    MediaTooLarge { size: u64, max: u64 },

    #[error("Failed to read downloaded media: {0}")]
    Io(#[from] std::io::Error),
}
