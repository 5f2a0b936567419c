//! Approval recording and quorum promotion (spec.md §4.1, §4.6, §4.9).
//! Thin wrapper over `Repo::record_approval` + `Repo::promote_if_quorum`
//! so the HTTP `decision` handler and any future caller share one path.

use dw_repo::{ApprovalDecision, PromoteOutcome, Repo};

use crate::error::Result;

/// Records a signer's decision on a pending command and, if quorum is
/// now met (or definitively missed), promotes the command. Idempotent:
/// re-submitting the same `(docId,cmdId,signer)` triple is a no-op on
/// the approval row (enforced by the unique constraint the insert
/// targets with `on conflict ... do nothing`) but still re-evaluates
/// quorum, so a duplicate POST after a crash is harmless.
pub async fn record_approval_and_maybe_promote(
    repo: &Repo,
    doc_id: &str,
    cmd_id: &str,
    signer_address: &str,
    decision: ApprovalDecision,
    now: i64,
) -> Result<PromoteOutcome> {
    repo.record_approval(doc_id, cmd_id, signer_address, decision, now).await?;
    let outcome = repo.promote_if_quorum(doc_id, cmd_id, now).await?;
    Ok(outcome)
}
