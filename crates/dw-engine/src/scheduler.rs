//! Scheduler tick (spec.md §4.7, component C7).
//!
//! Reserves every due schedule row and materialises a fresh command with
//! a new `cmdId`, run through the same intake pipeline (parse → policy →
//! quorum) as any other append — a scheduled command is not privileged.

use dw_adapter::DocumentAdapter;
use dw_repo::Repo;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::Result;
use crate::intake;
use crate::policy_resolve::effective_policy;

pub async fn tick(
    repo: &Repo,
    adapter: &dyn DocumentAdapter,
    now: i64,
    public_base_url: &str,
    limit: i64,
    next_cmd_id: impl Fn() -> String,
) -> Result<usize> {
    let due = repo.reserve_due_schedules(now, limit).await?;
    let mut materialised = 0;

    for schedule in due {
        let cmd_id = next_cmd_id();
        let policy = effective_policy(adapter, &schedule.doc_id).await?;
        let daily_spend = repo.daily_spend_usd(&schedule.doc_id, now - 86_400_000).await.unwrap_or(Decimal::ZERO);

        match intake::intake_command(
            repo,
            &policy,
            &schedule.doc_id,
            &cmd_id,
            &schedule.inner_command,
            now,
            public_base_url,
            daily_spend,
            Some(&schedule.schedule_id),
        )
        .await
        {
            Ok(outcome) => {
                adapter
                    .append_command_row(
                        &schedule.doc_id,
                        &cmd_id,
                        &schedule.inner_command,
                        outcome.status.as_str(),
                        outcome.approval_url.as_deref(),
                        None,
                        None,
                    )
                    .await?;
                info!(schedule_id = %schedule.schedule_id, cmd_id, status = outcome.status.as_str(), "schedule fired");
                materialised += 1;
            }
            Err(e) => warn!(schedule_id = %schedule.schedule_id, error = %e, "schedule materialisation failed"),
        }
    }

    Ok(materialised)
}
