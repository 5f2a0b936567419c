//! `start-join` (spec.md §4.9): mints a challenge for a prospective
//! signer to sign (basic mode) or attest (session-key mode) and a
//! single-use `joinToken` to redeem in `finish-join`.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, Result};
use crate::state::{AppState, PendingJoin};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJoinRequest {
    pub doc_id: String,
    pub address: String,
    pub weight: i32,
    #[serde(default)]
    pub attested: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJoinResponse {
    pub join_token: String,
    pub challenge: String,
    pub attested: bool,
}

pub async fn start_join(State(state): State<Arc<AppState>>, Json(req): Json<StartJoinRequest>) -> Result<Json<StartJoinResponse>> {
    if req.weight <= 0 {
        return Err(ApiError::BadRequest("weight must be positive".into()));
    }

    let challenge = format!(
        "DW-JOIN:{}:{}:{}:{}",
        req.doc_id,
        req.address,
        req.weight,
        uuid::Uuid::new_v4()
    );

    let join_token = state
        .mint_join_token(PendingJoin {
            doc_id: req.doc_id,
            address: req.address,
            weight: req.weight,
            challenge: challenge.clone(),
            minted_at: std::time::Instant::now(),
        })
        .await;

    Ok(Json(StartJoinResponse { join_token, challenge, attested: req.attested }))
}
