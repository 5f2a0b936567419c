//! Error types for the repository

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl RepoError {
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self {
            Self::Connection(_) | Self::Migration(_) => Level::ERROR,
            Self::Config(_) | Self::InvalidConfig { .. } => Level::ERROR,
            Self::Query(_) => Level::ERROR,
            Self::NotFound(_) => Level::WARN,
            Self::Invariant(_) => Level::ERROR,
        }
    }

    /// Adapter/chain-client callers treat this as retryable; a compare-and-
    /// swap race or a transient pool exhaustion is worth retrying, a
    /// missing row or a broken migration is not (spec.md §7).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Query(sqlx::Error::PoolTimedOut) | Self::Query(sqlx::Error::PoolClosed) => true,
            Self::Query(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
