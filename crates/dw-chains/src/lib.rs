//! Chain client interfaces and `reqwest`-backed implementations
//! (spec.md §4.5).

pub mod bridge_router;
pub mod clients;
pub mod error;
pub mod http;
pub mod nameresolver;
pub mod retry;
pub mod types;

pub use bridge_router::BridgeRouter;
pub use clients::{
    CustodialStableClient, EvmClient, NameResolver, OrderBookClient, StateChannelClient, SuiClient,
};
pub use error::{ChainError, Result};
pub use nameresolver::{CachingNameResolver, HttpNameResolver};
pub use retry::{retry_request, RetryConfig};
pub use types::*;
