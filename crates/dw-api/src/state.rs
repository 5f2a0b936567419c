//! Shared application state handed to every handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dw_adapter::DocumentAdapter;
use dw_repo::Repo;
use tokio::sync::Mutex;

/// A single-use join token minted by `start-join` and redeemed by
/// `finish-join` (spec.md §4.9). Kept in-process, not persisted: a
/// restart simply forces signers mid-join to start over.
pub struct PendingJoin {
    pub doc_id: String,
    pub address: String,
    pub weight: i32,
    pub challenge: String,
    pub minted_at: Instant,
}

const JOIN_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Cookie-like session handle returned by `finish-join` and consumed by
/// `decision` to identify the authenticated signer.
#[derive(Clone)]
pub struct SignerSession {
    pub doc_id: String,
    pub address: String,
}

pub struct AppState {
    pub repo: Arc<Repo>,
    pub adapter: Arc<dyn DocumentAdapter>,
    pub public_base_url: String,
    pub(crate) pending_joins: Mutex<HashMap<String, PendingJoin>>,
    pub(crate) signer_sessions: Mutex<HashMap<String, SignerSession>>,
}

impl AppState {
    pub fn new(repo: Arc<Repo>, adapter: Arc<dyn DocumentAdapter>, public_base_url: String) -> Self {
        Self {
            repo,
            adapter,
            public_base_url,
            pending_joins: Mutex::new(HashMap::new()),
            signer_sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn mint_join_token(&self, pending: PendingJoin) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut joins = self.pending_joins.lock().await;
        joins.retain(|_, p| p.minted_at.elapsed() < JOIN_TOKEN_TTL);
        joins.insert(token.clone(), pending);
        token
    }

    pub async fn take_join_token(&self, token: &str) -> Option<PendingJoin> {
        let mut joins = self.pending_joins.lock().await;
        match joins.remove(token) {
            Some(pending) if pending.minted_at.elapsed() < JOIN_TOKEN_TTL => Some(pending),
            _ => None,
        }
    }

    pub async fn mint_session(&self, session: SignerSession) -> String {
        let handle = uuid::Uuid::new_v4().to_string();
        self.signer_sessions.lock().await.insert(handle.clone(), session);
        handle
    }

    pub async fn signer_session(&self, handle: &str) -> Option<SignerSession> {
        self.signer_sessions.lock().await.get(handle).cloned()
    }
}
