//! Command intake: the parse → policy → persist pipeline shared by the
//! `poll` loop (§4.8) and the scheduler's synthesised commands (§4.7).

use dw_policy::{EvalContext, Policy};
use dw_repo::{CommandRow, CommandStatus, Repo};
use tracing::{info, warn};

use crate::error::Result;

pub struct IntakeOutcome {
    pub status: CommandStatus,
    pub approval_url: Option<String>,
}

/// Parses `raw`, evaluates it against `policy`, persists the resulting
/// command row, and advances it to `PENDING_APPROVAL` (or `REJECTED`,
/// or immediately `APPROVED` when `requireApproval=false`) per spec.md
/// §4.6: "Promotion RAW→PENDING_APPROVAL happens only after the policy
/// check passes AND an approvalUrl has been minted."
pub async fn intake_command(
    repo: &Repo,
    policy: &Policy,
    doc_id: &str,
    cmd_id: &str,
    raw: &str,
    now: i64,
    public_base_url: &str,
    daily_spend_usd: rust_decimal::Decimal,
    schedule_id: Option<&str>,
) -> Result<IntakeOutcome> {
    let parsed = dw_grammar::parse(raw);

    let (status, parsed_value, parse_error) = match &parsed {
        Ok(cmd) => {
            let ctx = EvalContext { daily_spend_usd };
            let verdict = dw_policy::evaluate(policy, cmd, &ctx);
            if !verdict.allow {
                warn!(cmd_id, doc_id, reason = %verdict.reason, "command denied by policy");
                let row = CommandRow {
                    cmd_id: cmd_id.to_string(),
                    doc_id: doc_id.to_string(),
                    raw_text: raw.to_string(),
                    parsed_value: serde_json::to_value(cmd).ok(),
                    parse_error: None,
                    status: CommandStatus::Rejected,
                    approval_url: None,
                    result_text: None,
                    error_text: Some(verdict.reason),
                    created_at: now,
                    updated_at: now,
                    schedule_id: schedule_id.map(str::to_string),
                };
                repo.insert_command(&row).await?;
                return Ok(IntakeOutcome { status: CommandStatus::Rejected, approval_url: None });
            }
            (CommandStatus::Raw, serde_json::to_value(cmd).ok(), None)
        }
        Err(e) => (CommandStatus::Invalid, None, Some(e.to_string())),
    };

    let row = CommandRow {
        cmd_id: cmd_id.to_string(),
        doc_id: doc_id.to_string(),
        raw_text: raw.to_string(),
        parsed_value,
        parse_error,
        status,
        approval_url: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
        schedule_id: schedule_id.map(str::to_string),
    };
    repo.insert_command(&row).await?;

    if status == CommandStatus::Invalid {
        return Ok(IntakeOutcome { status: CommandStatus::Invalid, approval_url: None });
    }

    let approval_url = format!("{}/approve/{}/{}", public_base_url.trim_end_matches('/'), doc_id, cmd_id);
    repo.set_command_approval_url(cmd_id, &approval_url).await?;

    let next_status = if policy.require_approval == Some(false) {
        repo.set_command_status(cmd_id, CommandStatus::Approved, now).await?;
        CommandStatus::Approved
    } else {
        repo.set_command_status(cmd_id, CommandStatus::PendingApproval, now).await?;
        CommandStatus::PendingApproval
    };

    info!(cmd_id, doc_id, status = next_status.as_str(), "command intake complete");
    Ok(IntakeOutcome { status: next_status, approval_url: Some(approval_url) })
}
