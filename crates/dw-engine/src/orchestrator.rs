//! Tick orchestrator (spec.md §4.8, component C8): the set of named
//! loops that drive every other component. Modelled on
//! `SdexIndexer::start_polling`'s shape (log, sleep, retry forever) but
//! generalised to eight independently supervised loops instead of one,
//! with a shared shutdown signal and a per-loop consecutive-failure
//! counter.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dw_adapter::DocumentAdapter;
use dw_grammar::Command;
use dw_repo::{CommandStatus, Document, Repo, Timestamp};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::executor::Executor;
use crate::intake;
use crate::policy_resolve::effective_policy;
use crate::scheduler;

type TickFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Shared state every loop closure borrows from; built once in `dw-agent`'s
/// `main` and handed to `Orchestrator::spawn_all`.
pub struct Orchestrator {
    pub repo: Arc<Repo>,
    pub adapter: Arc<dyn DocumentAdapter>,
    pub executor: Arc<Executor>,
    pub public_base_url: String,
    pub discovery_period: Duration,
    pub poll_period: Duration,
    pub executor_period: Duration,
    pub balances_period: Duration,
    pub scheduler_period: Duration,
    pub chat_period: Duration,
    pub agent_propose_period: Duration,
    pub conditional_period: Duration,
    pub agent_autopropose: bool,
    cmd_seq: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        repo: Arc<Repo>,
        adapter: Arc<dyn DocumentAdapter>,
        executor: Arc<Executor>,
        public_base_url: String,
        config: &crate::config::AgentConfig,
    ) -> Self {
        Self {
            repo,
            adapter,
            executor,
            public_base_url,
            discovery_period: Duration::from_secs(config.discovery_period_secs),
            poll_period: Duration::from_secs(config.poll_period_secs),
            executor_period: Duration::from_secs(config.executor_period_secs),
            balances_period: Duration::from_secs(config.balances_period_secs),
            scheduler_period: Duration::from_secs(config.scheduler_period_secs),
            chat_period: Duration::from_secs(config.chat_period_secs),
            agent_propose_period: Duration::from_secs(config.agent_propose_period_secs),
            conditional_period: Duration::from_secs(config.conditional_period_secs),
            agent_autopropose: config.agent_autopropose,
            cmd_seq: AtomicU64::new(0),
        }
    }

    fn next_cmd_id(&self) -> String {
        let n = self.cmd_seq.fetch_add(1, Ordering::Relaxed);
        format!("cmd-{}-{n}", now_ts())
    }

    /// Spawns the eight named loops and returns their join handles. Send
    /// `true` on `shutdown` to have every loop finish its current
    /// iteration and exit.
    pub fn spawn_all(this: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<tokio::task::JoinHandle<()>> {
        let loops: Vec<(&'static str, Duration, Box<dyn Fn() -> TickFuture + Send + Sync>)> = vec![
            ("discovery", this.discovery_period, tick_fn(&this, Self::discovery_tick)),
            ("poll", this.poll_period, tick_fn(&this, Self::poll_tick)),
            ("executor", this.executor_period, tick_fn(&this, Self::executor_tick)),
            ("balances", this.balances_period, tick_fn(&this, Self::balances_tick)),
            ("scheduler", this.scheduler_period, tick_fn(&this, Self::scheduler_tick)),
            ("chat", this.chat_period, tick_fn(&this, Self::chat_tick)),
            ("agentProposal", this.agent_propose_period, tick_fn(&this, Self::agent_propose_tick)),
            ("conditional", this.conditional_period, tick_fn(&this, Self::conditional_tick)),
        ];

        loops
            .into_iter()
            .map(|(name, period, tick)| tokio::spawn(run_loop(name, period, shutdown.clone(), tick)))
            .collect()
    }

    async fn discovery_tick(self: Arc<Self>) -> Result<()> {
        let now = now_ts();
        for doc in self.adapter.list_tracked_documents().await? {
            self.repo
                .create_document(&Document {
                    doc_id: doc.doc_id,
                    display_name: doc.display_name,
                    created_at: now,
                    bound_policy_name: None,
                })
                .await?;
        }
        Ok(())
    }

    /// Reads each tracked document's Commands table and intakes any row
    /// whose `id` the repository has not seen yet (spec.md §4.8).
    async fn poll_tick(self: Arc<Self>) -> Result<()> {
        let now = now_ts();
        for doc in self.adapter.list_tracked_documents().await? {
            let tables = self.adapter.load_tables(&doc.doc_id).await?;
            let policy = effective_policy(self.adapter.as_ref(), &doc.doc_id).await?;

            for (idx, row) in tables.commands.iter().enumerate() {
                if self.repo.get_command(&row.id).await.is_ok() {
                    continue;
                }

                let daily_spend = self.repo.daily_spend_usd(&doc.doc_id, now - 86_400_000).await.unwrap_or(Decimal::ZERO);
                let outcome = intake::intake_command(
                    &self.repo,
                    &policy,
                    &doc.doc_id,
                    &row.id,
                    &row.command,
                    now,
                    &self.public_base_url,
                    daily_spend,
                    None,
                )
                .await?;

                let update = dw_adapter::CommandRowUpdate {
                    status: Some(outcome.status.as_str().to_string()),
                    approval_url: outcome.approval_url,
                    result: None,
                    error: None,
                };
                self.adapter.update_command_row(&doc.doc_id, idx, update).await?;
            }
        }
        Ok(())
    }

    async fn executor_tick(self: Arc<Self>) -> Result<()> {
        self.executor.tick(now_ts()).await?;
        Ok(())
    }

    /// Gathers per-chain balances and writes a USD portfolio snapshot
    /// back to each document's Balances table (spec.md §4.8).
    async fn balances_tick(self: Arc<Self>) -> Result<()> {
        let clients = self.executor.clients();
        for doc in self.adapter.list_tracked_documents().await? {
            let mut rows = Vec::new();

            if let Some(evm) = &clients.evm {
                if let Ok(balances) = evm.get_balances(&doc.doc_id).await {
                    rows.push(dw_adapter::BalanceRow { location: "evm".into(), asset: "native".into(), balance: balances.native });
                    rows.push(dw_adapter::BalanceRow { location: "evm".into(), asset: "stable".into(), balance: balances.stable });
                }
            }
            if let Some(sui) = &clients.sui {
                if let Ok(balances) = sui.get_balances(&doc.doc_id).await {
                    rows.push(dw_adapter::BalanceRow { location: "sui".into(), asset: "native".into(), balance: balances.native });
                    for (asset, amount) in balances.stable_coins {
                        rows.push(dw_adapter::BalanceRow { location: "sui".into(), asset, balance: amount });
                    }
                }
            }
            if let Some(custodial) = &clients.custodial {
                if let Ok(wallet) = custodial.ensure_wallet(&doc.doc_id).await {
                    rows.push(dw_adapter::BalanceRow { location: "custodial".into(), asset: wallet.address, balance: Decimal::ZERO });
                }
            }

            if !rows.is_empty() {
                self.adapter.write_balances_snapshot(&doc.doc_id, rows).await?;
            }
        }
        Ok(())
    }

    async fn scheduler_tick(self: Arc<Self>) -> Result<()> {
        scheduler::tick(&self.repo, self.adapter.as_ref(), now_ts(), &self.public_base_url, 50, || self.next_cmd_id()).await?;
        Ok(())
    }

    /// Reads the Chat table; every new user row gets a suggested command,
    /// and a `!execute`-prefixed row is appended as a real command
    /// (spec.md §4.8). Suggestion heuristics are intentionally simple:
    /// the user's text is parsed as-is and echoed back as the suggestion.
    async fn chat_tick(self: Arc<Self>) -> Result<()> {
        let now = now_ts();
        for doc in self.adapter.list_tracked_documents().await? {
            let tables = self.adapter.load_tables(&doc.doc_id).await?;
            for chat in tables.chat.iter().filter(|c| c.agent.is_none()) {
                if let Some(command_text) = chat.user.strip_prefix("!execute") {
                    let cmd_id = self.next_cmd_id();
                    let policy = effective_policy(self.adapter.as_ref(), &doc.doc_id).await?;
                    let daily_spend = self.repo.daily_spend_usd(&doc.doc_id, now - 86_400_000).await.unwrap_or(Decimal::ZERO);
                    let command_text = command_text.trim().to_string();
                    let outcome = intake::intake_command(
                        &self.repo,
                        &policy,
                        &doc.doc_id,
                        &cmd_id,
                        &command_text,
                        now,
                        &self.public_base_url,
                        daily_spend,
                        None,
                    )
                    .await?;
                    self.adapter
                        .append_command_row(
                            &doc.doc_id,
                            &cmd_id,
                            &command_text,
                            outcome.status.as_str(),
                            outcome.approval_url.as_deref(),
                            None,
                            None,
                        )
                        .await?;
                } else {
                    let ts = chrono::DateTime::from_timestamp_millis(now).map(|d| d.to_rfc3339()).unwrap_or_default();
                    let suggestion = format!("try: DW {}", chat.user.trim());
                    self.adapter.append_audit_row(&doc.doc_id, &ts, &suggestion).await?;
                }
            }
        }
        Ok(())
    }

    /// Runs the proposal heuristics per document if
    /// `AGENT_AUTOPROPOSE=true`; a no-op loop otherwise so the supervisor
    /// still ticks on schedule (spec.md §4.8).
    async fn agent_propose_tick(self: Arc<Self>) -> Result<()> {
        if !self.agent_autopropose {
            return Ok(());
        }
        let clients = self.executor.clients();
        let Some(orderbook) = &clients.orderbook else { return Ok(()) };

        for doc in self.adapter.list_tracked_documents().await? {
            let mid = match orderbook.mid_price("BASE/USDC").await {
                Ok(m) => m,
                Err(e) => {
                    warn!(doc_id = %doc.doc_id, error = %e, "proposal heuristic price poll failed");
                    continue;
                }
            };
            let spread = mid.ask - mid.bid;
            if spread > mid.mid / Decimal::from(20) {
                let ts = chrono::DateTime::from_timestamp_millis(now_ts()).map(|d| d.to_rfc3339()).unwrap_or_default();
                let note = format!("wide spread detected ({spread} around mid {}); consider holding off on market orders", mid.mid);
                self.adapter.append_audit_row(&doc.doc_id, &ts, &note).await?;
            }
        }
        Ok(())
    }

    /// Evaluates armed `STOP_LOSS` / `TAKE_PROFIT` rows against the live
    /// mid-price and synthesises a `MARKET_*` order once a trigger fires
    /// (spec.md §4.8). Armed rows are tracked as `EXECUTED` commands whose
    /// `resultText` begins with `armed ` (see `executor::dispatch`).
    async fn conditional_tick(self: Arc<Self>) -> Result<()> {
        let clients = self.executor.clients();
        let Some(orderbook) = &clients.orderbook else { return Ok(()) };
        let now = now_ts();
        let commands = self.repo.list_commands_by_status(CommandStatus::Executed).await?;

        for doc in self.adapter.list_tracked_documents().await? {
            for cmd in commands.iter().filter(|c| c.doc_id == doc.doc_id) {
                let Some(parsed) = &cmd.parsed_value else { continue };
                let Ok(command) = serde_json::from_value::<Command>(parsed.clone()) else { continue };

                let (asset, qty, trigger, is_stop_loss) = match command {
                    Command::StopLoss { asset, qty, trigger } => (asset, qty, trigger, true),
                    Command::TakeProfit { asset, qty, trigger } => (asset, qty, trigger, false),
                    _ => continue,
                };

                let pair = format!("{asset}/USDC");
                let mid = match orderbook.mid_price(&pair).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(cmd_id = %cmd.cmd_id, error = %e, "conditional price poll failed");
                        continue;
                    }
                };

                let fired = if is_stop_loss { mid.mid <= trigger } else { mid.mid >= trigger };
                if !fired {
                    continue;
                }

                // Both conditional kinds close a long position once their
                // trigger crosses, so both synthesise a market sell.
                let raw = format!("DW MARKET_SELL {asset} {qty}");
                let cmd_id = self.next_cmd_id();
                let policy = effective_policy(self.adapter.as_ref(), &doc.doc_id).await?;
                let daily_spend = self.repo.daily_spend_usd(&doc.doc_id, now - 86_400_000).await.unwrap_or(Decimal::ZERO);
                let outcome =
                    intake::intake_command(&self.repo, &policy, &doc.doc_id, &cmd_id, &raw, now, &self.public_base_url, daily_spend, None)
                        .await?;
                self.adapter
                    .append_command_row(&doc.doc_id, &cmd_id, &raw, outcome.status.as_str(), outcome.approval_url.as_deref(), None, None)
                    .await?;
                info!(cmd_id, trigger_cmd = %cmd.cmd_id, "conditional trigger fired");
            }
        }
        Ok(())
    }
}

fn now_ts() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

fn tick_fn<F, Fut>(this: &Arc<Orchestrator>, f: F) -> Box<dyn Fn() -> TickFuture + Send + Sync>
where
    F: Fn(Arc<Orchestrator>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let this = Arc::clone(this);
    Box::new(move || Box::pin(f(Arc::clone(&this))))
}

async fn run_loop(name: &'static str, period: Duration, mut shutdown: watch::Receiver<bool>, tick: Box<dyn Fn() -> TickFuture + Send + Sync>) {
    let mut consecutive_failures: u32 = 0;

    match tokio::time::timeout(Duration::from_secs(90), tick()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log_failure(name, &e, &mut consecutive_failures),
        Err(_) => warn!(loop_name = name, "initial tick exceeded the 90s startup deadline"),
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(loop_name = name, "loop shutting down after current iteration");
                    return;
                }
            }
            _ = tokio::time::sleep(period) => {
                match tick().await {
                    Ok(()) => consecutive_failures = 0,
                    Err(e) => log_failure(name, &e, &mut consecutive_failures),
                }
            }
        }
    }
}

fn log_failure(name: &str, e: &EngineError, consecutive: &mut u32) {
    *consecutive += 1;
    if *consecutive >= 3 {
        error!(loop_name = name, consecutive_failures = *consecutive, error = %e, "loop has failed repeatedly");
    } else {
        match e.log_level() {
            tracing::Level::ERROR => error!(loop_name = name, error = %e, "loop tick failed"),
            tracing::Level::WARN => warn!(loop_name = name, error = %e, "loop tick failed"),
            _ => info!(loop_name = name, error = %e, "loop tick failed"),
        }
    }
}
