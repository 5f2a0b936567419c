use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Repo(#[from] dw_repo::RepoError),

    #[error(transparent)]
    Adapter(#[from] dw_adapter::AdapterError),

    #[error(transparent)]
    Chain(#[from] dw_chains::ChainError),

    #[error("grammar error: {0}")]
    Grammar(String),

    #[error("policy denied: {0}")]
    PolicyDenied(String),

    #[error("no live state channel session bound to this document")]
    NoStateChannelSession,

    #[error("session key expired for signer {0}")]
    SessionKeyExpired(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unrecoverable error: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self {
            Self::Repo(e) => e.log_level(),
            Self::Adapter(e) => e.log_level(),
            Self::Chain(e) => e.log_level(),
            Self::Grammar(_) | Self::PolicyDenied(_) => Level::WARN,
            Self::NoStateChannelSession | Self::SessionKeyExpired(_) => Level::ERROR,
            Self::Config(_) | Self::Fatal(_) => Level::ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Repo(e) => e.is_retryable(),
            Self::Adapter(e) => e.is_retryable(),
            Self::Chain(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
