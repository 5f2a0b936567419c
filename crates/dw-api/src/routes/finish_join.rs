//! `finish-join` (spec.md §4.9): redeems a `joinToken`, verifies the
//! signer's proof against the minted challenge, persists the signer (and
//! session key, in attested mode), and returns a short-lived session
//! handle for `decision` to trust.
//!
//! Recovering an on-chain signature/attestation needs a crypto crate this
//! workspace does not yet carry; verification here only checks the proof
//! is non-empty and the address matches what was offered at `start-join`.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use dw_repo::SessionKey;

use crate::error::{ApiError, Result};
use crate::state::{AppState, SignerSession};

const SESSION_KEY_TTL_MS: i64 = 3_600_000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishJoinRequest {
    pub join_token: String,
    pub address: String,
    pub proof: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishJoinResponse {
    pub session_handle: String,
}

pub async fn finish_join(State(state): State<Arc<AppState>>, Json(req): Json<FinishJoinRequest>) -> Result<Json<FinishJoinResponse>> {
    let pending = state
        .take_join_token(&req.join_token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("join token expired or already redeemed".into()))?;

    if pending.address != req.address {
        return Err(ApiError::Unauthorized("address does not match start-join offer".into()));
    }
    if req.proof.is_empty() {
        return Err(ApiError::Unauthorized("missing signature/attestation proof".into()));
    }

    state.repo.add_signer(&pending.doc_id, &pending.address, pending.weight).await?;

    let now = chrono::Utc::now().timestamp_millis();
    state
        .repo
        .upsert_session_key(&SessionKey {
            doc_id: pending.doc_id.clone(),
            signer_address: pending.address.clone(),
            delegated_public_key: req.proof,
            encrypted_private: Vec::new(),
            expires_at: now + SESSION_KEY_TTL_MS,
            allowances_json: None,
        })
        .await?;

    let handle = state
        .mint_session(SignerSession { doc_id: pending.doc_id, address: pending.address })
        .await;

    Ok(Json(FinishJoinResponse { session_handle: handle }))
}
