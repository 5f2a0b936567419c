//! Postgres-backed repository (spec.md §3, §4.1 — component C1).
//!
//! Pool setup and migration plumbing follow `indexer::db::connection::Database`;
//! the compound approval/quorum operations are new and use `SELECT ... FOR
//! UPDATE` inside a single transaction for the serializability spec.md §4.1
//! requires ("atomically inserts... and returns the new running weighted
//! tally").

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{error, info};

use crate::config::RepoConfig;
use crate::error::{RepoError, Result};
use crate::models::{
    ApprovalDecision, ApprovalTally, CommandApproval, CommandRow, CommandStatus, CustodialWallet,
    Document, PromoteOutcome, Schedule, ScheduleStatus, SessionKey, Signer, StateChannelSession,
    Timestamp, Trade,
};

#[derive(Clone)]
pub struct Repo {
    pool: PgPool,
}

impl Repo {
    pub async fn new(config: &RepoConfig) -> Result<Self> {
        info!("Connecting to database: {}", config.database_url);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(std::time::Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                RepoError::Connection(format!("Failed to connect to {}: {}", config.database_url, e))
            })?;

        info!("Database connection established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        let migration_0001 = include_str!("../migrations/0001_init.sql");
        let migration_0002 = include_str!("../migrations/0002_performance_indexes.sql");

        info!("Running migration 0001_init.sql");
        sqlx::query(migration_0001).execute(&self.pool).await.map_err(|e| {
            error!("Migration 0001 failed: {}", e);
            RepoError::Migration(format!("Failed to run 0001_init.sql: {e}"))
        })?;

        info!("Running migration 0002_performance_indexes.sql");
        sqlx::query(migration_0002).execute(&self.pool).await.map_err(|e| {
            error!("Migration 0002 failed: {}", e);
            RepoError::Migration(format!("Failed to run 0002_performance_indexes.sql: {e}"))
        })?;

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ---- documents --------------------------------------------------

    pub async fn create_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            "insert into documents (doc_id, display_name, created_at, bound_policy_name) \
             values ($1, $2, $3, $4) on conflict (doc_id) do nothing",
        )
        .bind(&doc.doc_id)
        .bind(&doc.display_name)
        .bind(doc.created_at)
        .bind(&doc.bound_policy_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_document(&self, doc_id: &str) -> Result<Document> {
        let row = sqlx::query(
            "select doc_id, display_name, created_at, bound_policy_name from documents where doc_id = $1",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("document {doc_id}")))?;

        Ok(Document {
            doc_id: row.get("doc_id"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
            bound_policy_name: row.get("bound_policy_name"),
        })
    }

    pub async fn bind_policy(&self, doc_id: &str, policy_name: &str) -> Result<()> {
        sqlx::query("update documents set bound_policy_name = $2 where doc_id = $1")
            .bind(doc_id)
            .bind(policy_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- signers & quorum --------------------------------------------

    pub async fn add_signer(&self, doc_id: &str, address: &str, weight: i32) -> Result<()> {
        sqlx::query(
            "insert into signers (doc_id, address, weight) values ($1, $2, $3) \
             on conflict (doc_id, address) do update set weight = excluded.weight",
        )
        .bind(doc_id)
        .bind(address)
        .bind(weight)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_signers(&self, doc_id: &str) -> Result<Vec<Signer>> {
        let rows = sqlx::query("select doc_id, address, weight from signers where doc_id = $1")
            .bind(doc_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Signer {
                doc_id: row.get("doc_id"),
                address: row.get("address"),
                weight: row.get("weight"),
            })
            .collect())
    }

    pub async fn set_quorum(&self, doc_id: &str, quorum: i32) -> Result<()> {
        sqlx::query(
            "insert into quorum_settings (doc_id, quorum) values ($1, $2) \
             on conflict (doc_id) do update set quorum = excluded.quorum",
        )
        .bind(doc_id)
        .bind(quorum)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_quorum(&self, doc_id: &str) -> Result<i32> {
        let row = sqlx::query("select quorum from quorum_settings where doc_id = $1")
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("quorum setting for {doc_id}")))?;
        Ok(row.get("quorum"))
    }

    // ---- commands ------------------------------------------------------

    pub async fn insert_command(&self, cmd: &CommandRow) -> Result<()> {
        sqlx::query(
            "insert into commands \
             (cmd_id, doc_id, raw_text, parsed_value, parse_error, status, approval_url, \
              result_text, error_text, created_at, updated_at, schedule_id) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&cmd.cmd_id)
        .bind(&cmd.doc_id)
        .bind(&cmd.raw_text)
        .bind(&cmd.parsed_value)
        .bind(&cmd.parse_error)
        .bind(cmd.status.as_str())
        .bind(&cmd.approval_url)
        .bind(&cmd.result_text)
        .bind(&cmd.error_text)
        .bind(cmd.created_at)
        .bind(cmd.updated_at)
        .bind(&cmd.schedule_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_command(&self, cmd_id: &str) -> Result<CommandRow> {
        let row = sqlx::query(
            "select cmd_id, doc_id, raw_text, parsed_value, parse_error, status, approval_url, \
             result_text, error_text, created_at, updated_at, schedule_id \
             from commands where cmd_id = $1",
        )
        .bind(cmd_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("command {cmd_id}")))?;

        row_to_command(row)
    }

    pub async fn list_commands_by_doc(&self, doc_id: &str) -> Result<Vec<CommandRow>> {
        let rows = sqlx::query(
            "select cmd_id, doc_id, raw_text, parsed_value, parse_error, status, approval_url, \
             result_text, error_text, created_at, updated_at, schedule_id \
             from commands where doc_id = $1 order by created_at",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_command).collect()
    }

    pub async fn list_commands_by_status(&self, status: CommandStatus) -> Result<Vec<CommandRow>> {
        let rows = sqlx::query(
            "select cmd_id, doc_id, raw_text, parsed_value, parse_error, status, approval_url, \
             result_text, error_text, created_at, updated_at, schedule_id \
             from commands where status = $1 order by created_at",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_command).collect()
    }

    pub async fn set_command_status(
        &self,
        cmd_id: &str,
        status: CommandStatus,
        now: Timestamp,
    ) -> Result<()> {
        sqlx::query("update commands set status = $2, updated_at = $3 where cmd_id = $1")
            .bind(cmd_id)
            .bind(status.as_str())
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_command_result(
        &self,
        cmd_id: &str,
        status: CommandStatus,
        result_text: Option<&str>,
        error_text: Option<&str>,
        now: Timestamp,
    ) -> Result<()> {
        sqlx::query(
            "update commands set status = $2, result_text = $3, error_text = $4, updated_at = $5 \
             where cmd_id = $1",
        )
        .bind(cmd_id)
        .bind(status.as_str())
        .bind(result_text)
        .bind(error_text)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_command_approval_url(&self, cmd_id: &str, url: &str) -> Result<()> {
        sqlx::query("update commands set approval_url = $2 where cmd_id = $1")
            .bind(cmd_id)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Compare-and-swap used to move a single reserved command from
    /// `APPROVED` into `EXECUTING` without a second executor tick racing
    /// onto the same row (spec.md §4.6).
    pub async fn cas_command_status(
        &self,
        cmd_id: &str,
        expected: CommandStatus,
        new: CommandStatus,
        now: Timestamp,
    ) -> Result<bool> {
        let result = sqlx::query(
            "update commands set status = $2, updated_at = $3 \
             where cmd_id = $1 and status = $4",
        )
        .bind(cmd_id)
        .bind(new.as_str())
        .bind(now)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Atomically inserts (or, on duplicate `(docId,cmdId,signer)`, leaves
    /// untouched) an approval row and returns the running weighted tally
    /// across all recorded approvals for the command (spec.md §4.1).
    pub async fn record_approval(
        &self,
        doc_id: &str,
        cmd_id: &str,
        signer_address: &str,
        decision: ApprovalDecision,
        now: Timestamp,
    ) -> Result<ApprovalTally> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "select cmd_id from commands where cmd_id = $1 and doc_id = $2 for update",
        )
        .bind(cmd_id)
        .bind(doc_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("command {cmd_id}")))?;

        sqlx::query(
            "insert into command_approvals (doc_id, cmd_id, signer_address, decision, created_at) \
             values ($1, $2, $3, $4, $5) \
             on conflict (doc_id, cmd_id, signer_address) do nothing",
        )
        .bind(doc_id)
        .bind(cmd_id)
        .bind(signer_address)
        .bind(decision.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let tally = tally_within(&mut tx, doc_id, cmd_id).await?;

        tx.commit().await?;
        Ok(tally)
    }

    /// Atomically re-checks status and tallies against the bound quorum and
    /// signer weights, and promotes `PENDING_APPROVAL` to `APPROVED` or
    /// `REJECTED` as appropriate (spec.md §4.1, §4.6).
    pub async fn promote_if_quorum(&self, doc_id: &str, cmd_id: &str, now: Timestamp) -> Result<PromoteOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("select status from commands where cmd_id = $1 and doc_id = $2 for update")
            .bind(cmd_id)
            .bind(doc_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("command {cmd_id}")))?;

        let current = CommandStatus::parse(row.get("status"))
            .ok_or_else(|| RepoError::Invariant(format!("unrecognised command status for {cmd_id}")))?;

        if current != CommandStatus::PendingApproval {
            tx.commit().await?;
            return Ok(PromoteOutcome { promoted: false, new_status: current });
        }

        let quorum_row = sqlx::query("select quorum from quorum_settings where doc_id = $1")
            .bind(doc_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("quorum setting for {doc_id}")))?;
        let quorum: i64 = quorum_row.get::<i32, _>("quorum") as i64;

        let total_weight: i64 = sqlx::query("select coalesce(sum(weight), 0) as total from signers where doc_id = $1")
            .bind(doc_id)
            .fetch_one(&mut *tx)
            .await?
            .get::<i64, _>("total");

        let tally = tally_within(&mut tx, doc_id, cmd_id).await?;

        let new_status = if tally.approve_weight >= quorum {
            CommandStatus::Approved
        } else if tally.reject_weight > total_weight - quorum {
            CommandStatus::Rejected
        } else {
            tx.commit().await?;
            return Ok(PromoteOutcome { promoted: false, new_status: current });
        };

        sqlx::query("update commands set status = $2, updated_at = $3 where cmd_id = $1")
            .bind(cmd_id)
            .bind(new_status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if new_status == CommandStatus::Rejected {
            sqlx::query("delete from command_approvals where doc_id = $1 and cmd_id = $2")
                .bind(doc_id)
                .bind(cmd_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(PromoteOutcome { promoted: true, new_status })
    }

    pub async fn list_approvals(&self, doc_id: &str, cmd_id: &str) -> Result<Vec<CommandApproval>> {
        let rows = sqlx::query(
            "select doc_id, cmd_id, signer_address, decision, created_at \
             from command_approvals where doc_id = $1 and cmd_id = $2",
        )
        .bind(doc_id)
        .bind(cmd_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let decision = ApprovalDecision::parse(row.get("decision"))
                    .ok_or_else(|| RepoError::Invariant("unrecognised approval decision".to_string()))?;
                Ok(CommandApproval {
                    doc_id: row.get("doc_id"),
                    cmd_id: row.get("cmd_id"),
                    signer_address: row.get("signer_address"),
                    decision,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    // ---- schedules -------------------------------------------------

    pub async fn insert_schedule(&self, schedule: &Schedule) -> Result<()> {
        sqlx::query(
            "insert into schedules \
             (schedule_id, doc_id, inner_command, interval_hours, next_run_at, total_runs, status, last_run_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&schedule.schedule_id)
        .bind(&schedule.doc_id)
        .bind(&schedule.inner_command)
        .bind(schedule.interval_hours)
        .bind(schedule.next_run_at)
        .bind(schedule.total_runs)
        .bind(schedule.status.as_str())
        .bind(schedule.last_run_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reserves due schedules by advancing `next_run_at` in the same
    /// statement the row is selected with, so two scheduler ticks never
    /// fire the same row twice (spec.md §4.7).
    pub async fn reserve_due_schedules(&self, now: Timestamp, limit: i64) -> Result<Vec<Schedule>> {
        let rows = sqlx::query(
            "update schedules set next_run_at = next_run_at + (interval_hours * 3_600_000), \
             total_runs = total_runs + 1, last_run_at = $1 \
             where schedule_id in ( \
                 select schedule_id from schedules \
                 where status = 'ACTIVE' and next_run_at <= $1 \
                 order by next_run_at \
                 limit $2 \
                 for update skip locked \
             ) \
             returning schedule_id, doc_id, inner_command, interval_hours, next_run_at, total_runs, status, last_run_at",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status = ScheduleStatus::parse(row.get("status"))
                    .ok_or_else(|| RepoError::Invariant("unrecognised schedule status".to_string()))?;
                Ok(Schedule {
                    schedule_id: row.get("schedule_id"),
                    doc_id: row.get("doc_id"),
                    inner_command: row.get("inner_command"),
                    interval_hours: row.get("interval_hours"),
                    next_run_at: row.get("next_run_at"),
                    total_runs: row.get("total_runs"),
                    status,
                    last_run_at: row.get("last_run_at"),
                })
            })
            .collect()
    }

    pub async fn cancel_schedule(&self, schedule_id: &str) -> Result<()> {
        sqlx::query("update schedules set status = $2 where schedule_id = $1")
            .bind(schedule_id)
            .bind(ScheduleStatus::Cancelled.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- state channel sessions & session keys -------------------------

    pub async fn upsert_session(&self, session: &StateChannelSession) -> Result<()> {
        let signers = serde_json::to_value(&session.last_signers)
            .map_err(|e| RepoError::Invariant(format!("signers not serialisable: {e}")))?;

        sqlx::query(
            "insert into state_channel_sessions (doc_id, session_id, version, status, last_signers) \
             values ($1, $2, $3, $4, $5) \
             on conflict (doc_id) do update set \
                session_id = excluded.session_id, version = excluded.version, \
                status = excluded.status, last_signers = excluded.last_signers",
        )
        .bind(&session.doc_id)
        .bind(&session.session_id)
        .bind(session.version)
        .bind(&session.status)
        .bind(signers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_session(&self, doc_id: &str) -> Result<StateChannelSession> {
        let row = sqlx::query(
            "select doc_id, session_id, version, status, last_signers from state_channel_sessions where doc_id = $1",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("state channel session for {doc_id}")))?;

        let signers_json: serde_json::Value = row.get("last_signers");
        let last_signers: Vec<String> = serde_json::from_value(signers_json)
            .map_err(|e| RepoError::Invariant(format!("corrupt last_signers: {e}")))?;

        Ok(StateChannelSession {
            doc_id: row.get("doc_id"),
            session_id: row.get("session_id"),
            version: row.get("version"),
            status: row.get("status"),
            last_signers,
        })
    }

    pub async fn upsert_session_key(&self, key: &SessionKey) -> Result<()> {
        sqlx::query(
            "insert into session_keys \
             (doc_id, signer_address, delegated_public_key, encrypted_private, expires_at, allowances_json) \
             values ($1, $2, $3, $4, $5, $6) \
             on conflict (doc_id, signer_address) do update set \
                delegated_public_key = excluded.delegated_public_key, \
                encrypted_private = excluded.encrypted_private, \
                expires_at = excluded.expires_at, \
                allowances_json = excluded.allowances_json",
        )
        .bind(&key.doc_id)
        .bind(&key.signer_address)
        .bind(&key.delegated_public_key)
        .bind(&key.encrypted_private)
        .bind(key.expires_at)
        .bind(&key.allowances_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_session_key(&self, doc_id: &str, signer_address: &str) -> Result<SessionKey> {
        let row = sqlx::query(
            "select doc_id, signer_address, delegated_public_key, encrypted_private, expires_at, allowances_json \
             from session_keys where doc_id = $1 and signer_address = $2",
        )
        .bind(doc_id)
        .bind(signer_address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("session key for {doc_id}/{signer_address}")))?;

        Ok(SessionKey {
            doc_id: row.get("doc_id"),
            signer_address: row.get("signer_address"),
            delegated_public_key: row.get("delegated_public_key"),
            encrypted_private: row.get("encrypted_private"),
            expires_at: row.get("expires_at"),
            allowances_json: row.get("allowances_json"),
        })
    }

    // ---- custodial wallets & trades & counters -------------------------

    pub async fn upsert_custodial_wallet(&self, wallet: &CustodialWallet) -> Result<()> {
        sqlx::query(
            "insert into custodial_wallets (doc_id, provider_wallet_id, address) values ($1, $2, $3) \
             on conflict (doc_id) do update set \
                provider_wallet_id = excluded.provider_wallet_id, address = excluded.address",
        )
        .bind(&wallet.doc_id)
        .bind(&wallet.provider_wallet_id)
        .bind(&wallet.address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_trade(&self, trade: &Trade) -> Result<()> {
        sqlx::query(
            "insert into trades (doc_id, side, qty, price, notional, fee_usd, realised_pnl_usd, created_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&trade.doc_id)
        .bind(&trade.side)
        .bind(trade.qty)
        .bind(trade.price)
        .bind(trade.notional)
        .bind(trade.fee_usd)
        .bind(trade.realised_pnl_usd)
        .bind(trade.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn daily_spend_usd(&self, doc_id: &str, since: Timestamp) -> Result<Decimal> {
        let row = sqlx::query(
            "select coalesce(sum(notional), 0) as total from trades where doc_id = $1 and created_at >= $2",
        )
        .bind(doc_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("total"))
    }

    pub async fn increment_counter(&self, doc_id: &str, name: &str, by: i64) -> Result<i64> {
        let row = sqlx::query(
            "insert into counters (doc_id, name, value) values ($1, $2, $3) \
             on conflict (doc_id, name) do update set value = counters.value + excluded.value \
             returning value",
        )
        .bind(doc_id)
        .bind(name)
        .bind(by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("value"))
    }
}

async fn tally_within(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    doc_id: &str,
    cmd_id: &str,
) -> Result<ApprovalTally> {
    let rows = sqlx::query(
        "select ca.decision, s.weight from command_approvals ca \
         join signers s on s.doc_id = ca.doc_id and s.address = ca.signer_address \
         where ca.doc_id = $1 and ca.cmd_id = $2",
    )
    .bind(doc_id)
    .bind(cmd_id)
    .fetch_all(&mut **tx)
    .await?;

    let mut tally = ApprovalTally::default();
    for row in rows {
        let decision: &str = row.get("decision");
        let weight: i32 = row.get("weight");
        match ApprovalDecision::parse(decision) {
            Some(ApprovalDecision::Approve) => tally.approve_weight += weight as i64,
            Some(ApprovalDecision::Reject) => tally.reject_weight += weight as i64,
            None => return Err(RepoError::Invariant("unrecognised approval decision".to_string())),
        }
    }
    Ok(tally)
}

fn row_to_command(row: sqlx::postgres::PgRow) -> Result<CommandRow> {
    let status = CommandStatus::parse(row.get("status"))
        .ok_or_else(|| RepoError::Invariant("unrecognised command status".to_string()))?;

    Ok(CommandRow {
        cmd_id: row.get("cmd_id"),
        doc_id: row.get("doc_id"),
        raw_text: row.get("raw_text"),
        parsed_value: row.get("parsed_value"),
        parse_error: row.get("parse_error"),
        status,
        approval_url: row.get("approval_url"),
        result_text: row.get("result_text"),
        error_text: row.get("error_text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        schedule_id: row.get("schedule_id"),
    })
}
