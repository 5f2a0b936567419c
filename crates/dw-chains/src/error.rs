use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("HTTP request failed: {url}, status: {status:?}, error: {error}")]
    HttpRequest { url: String, status: Option<u16>, error: String },

    #[error("network timeout after {timeout_secs}s: {context}")]
    NetworkTimeout { timeout_secs: u64, context: String },

    #[error("network connection error: {0}")]
    NetworkConnection(String),

    #[error("rate limit exceeded, retry after: {retry_after:?}s")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("remote rejected submission: {endpoint}, status: {status}, message: {message}")]
    Remote { endpoint: String, status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("key handle could not be resolved: {0}")]
    UnknownKeyHandle(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("unsupported bridge route: {from} -> {to}")]
    UnsupportedRoute { from: String, to: String },

    #[error("deadline exceeded waiting for settlement: {0}")]
    DeadlineExceeded(String),
}

impl ChainError {
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self {
            Self::NetworkConnection(_) | Self::HttpRequest { .. } => Level::WARN,
            Self::RateLimitExceeded { .. } | Self::NetworkTimeout { .. } => Level::WARN,
            Self::Remote { status, .. } if *status >= 500 => Level::WARN,
            Self::Remote { .. } => Level::ERROR,
            Self::InvalidResponse(_) | Self::DeadlineExceeded(_) => Level::WARN,
            Self::UnknownKeyHandle(_) | Self::BadSignature | Self::UnsupportedRoute { .. } => {
                Level::ERROR
            }
        }
    }

    /// Consulted by the executor's dispatch-and-retry loop before each
    /// exponential-backoff attempt (spec.md §4.6).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkTimeout { .. }
            | Self::NetworkConnection(_)
            | Self::RateLimitExceeded { .. }
            | Self::HttpRequest { .. }
            | Self::DeadlineExceeded(_) => true,
            Self::Remote { status, .. } => *status >= 500,
            Self::InvalidResponse(_)
            | Self::UnknownKeyHandle(_)
            | Self::BadSignature
            | Self::UnsupportedRoute { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        let status = err.status().map(|s| s.as_u16());

        if err.is_timeout() {
            Self::NetworkTimeout { timeout_secs: 30, context: url }
        } else if err.is_connect() {
            Self::NetworkConnection(format!("failed to connect to {url}: {err}"))
        } else {
            Self::HttpRequest { url, status, error: err.to_string() }
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
