//! Error types for the bundle scanner

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bundle scanner
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(String),

    #[error("Invalid token address: {0}")]
    InvalidTokenAddress(String),

    // Upstream errors
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Pagination stopped after {pages} pages for {address}")]
    PaginationExhausted { address: String, pages: u32 },

    // Decoding errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // Fixture replay errors
    #[error("Fixture error: {0}")]
    Fixture(String),

}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Rpc(_) | Error::Timeout(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error must abort a run before any stage executes
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MissingApiKey(_) | Error::InvalidTokenAddress(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Http(format!("timed out: {}", e))
        } else if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}
