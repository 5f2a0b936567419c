//! Approval endpoints (spec.md §4.9, component C9): the minimal HTTP
//! surface signer wallets use to join a document's signer set and to
//! record approve/reject decisions on pending commands.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use error::{ApiError, Result};
pub use server::{Server, ServerConfig};
pub use state::AppState;
