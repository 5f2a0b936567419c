//! Error types for the command grammar

use thiserror::Error;

/// Parse errors are stable, human-readable strings — callers persist them
/// verbatim into `Command.parseError` (spec.md §4.2), so variants that wrap
/// free text keep that text short and deterministic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid integer: {0}")]
    InvalidInteger(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("SCHEDULE cannot nest a SCHEDULE command")]
    NestedSchedule,

    #[error("PAYOUT_SPLIT percentages must sum to 100")]
    SplitNotFull,

    #[error("BRIDGE source and destination chains must differ")]
    SameChain,

    #[error("REBALANCE source and destination chains must differ")]
    SameChainRebalance,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
}

pub type Result<T> = std::result::Result<T, GrammarError>;
