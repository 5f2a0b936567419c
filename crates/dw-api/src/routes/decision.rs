//! `decision` (spec.md §4.9): records an authenticated signer's
//! approve/reject decision and reports whether quorum was just met.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use dw_repo::ApprovalDecision;

use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub doc_id: String,
    pub cmd_id: String,
    pub decision: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub promoted: bool,
    pub new_status: &'static str,
}

pub async fn decision(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(req): Json<DecisionRequest>) -> Result<Json<DecisionResponse>> {
    let handle = headers
        .get("x-session-handle")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing session handle".into()))?;

    let session = state
        .signer_session(handle)
        .await
        .ok_or_else(|| ApiError::Unauthorized("unknown or expired session handle".into()))?;

    if session.doc_id != req.doc_id {
        return Err(ApiError::Unauthorized("session is not bound to this document".into()));
    }

    let decision = ApprovalDecision::parse(&req.decision).ok_or_else(|| ApiError::BadRequest(format!("invalid decision: {}", req.decision)))?;

    let now = chrono::Utc::now().timestamp_millis();
    let outcome = dw_engine::record_approval_and_maybe_promote(&state.repo, &req.doc_id, &req.cmd_id, &session.address, decision, now).await?;

    if let Ok(tables) = state.adapter.load_tables(&req.doc_id).await {
        if let Some(row_index) = tables.commands.iter().position(|row| row.id == req.cmd_id) {
            let update = dw_adapter::CommandRowUpdate {
                status: Some(outcome.new_status.as_str().to_string()),
                ..Default::default()
            };
            let _ = state.adapter.update_command_row(&req.doc_id, row_index, update).await;
        }
    }

    Ok(Json(DecisionResponse { promoted: outcome.promoted, new_status: outcome.new_status.as_str() }))
}
