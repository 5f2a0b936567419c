use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("document not tracked: {0}")]
    UnknownDocument(String),

    #[error("adapter transport error: {0}")]
    Transport(String),

    #[error("row index drift: table {table} no longer has row {row_index}")]
    RowDrift { table: String, row_index: usize },
}

impl AdapterError {
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self {
            Self::UnknownDocument(_) => Level::WARN,
            Self::Transport(_) => Level::ERROR,
            Self::RowDrift { .. } => Level::WARN,
        }
    }

    /// The engine treats any adapter failure as retryable and never
    /// corrupts state on such a failure (spec.md §4.4) — index drift and
    /// transport hiccups both resolve by re-reading on the next poll tick.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
