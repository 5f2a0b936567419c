//! API routes.

pub mod decision;
pub mod finish_join;
pub mod health;
pub mod start_join;

use axum::{routing::{get, post}, Router};
use std::sync::Arc;

use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/start-join", post(start_join::start_join))
        .route("/finish-join", post(finish_join::finish_join))
        .route("/decision", post(decision::decision))
        .with_state(state)
}
