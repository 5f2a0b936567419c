//! The declarative policy record and its pure evaluator.
//!
//! Grounded on `crates/routing`: one small struct, one pure function, no
//! I/O. `evaluate` is exhaustively unit-testable because it never touches
//! the network, the clock, or the repository.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dw_grammar::Command;

/// A deployment's policy record, normally fetched from a chain name
/// resolver's text record (spec.md §6, "Policy record"). Every field is
/// optional; absent means no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "requireApproval", skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,

    #[serde(rename = "maxNotionalUsdc", skip_serializing_if = "Option::is_none")]
    pub max_notional_usdc: Option<Decimal>,

    #[serde(rename = "maxSingleTxUsdc", skip_serializing_if = "Option::is_none")]
    pub max_single_tx_usdc: Option<Decimal>,

    #[serde(rename = "dailyLimitUsdc", skip_serializing_if = "Option::is_none")]
    pub daily_limit_usdc: Option<Decimal>,

    #[serde(rename = "allowedPairs", skip_serializing_if = "Option::is_none")]
    pub allowed_pairs: Option<Vec<String>>,

    #[serde(rename = "payoutAllowlist", skip_serializing_if = "Option::is_none")]
    pub payout_allowlist: Option<Vec<String>>,

    #[serde(rename = "denyCommands", skip_serializing_if = "Option::is_none")]
    pub deny_commands: Option<Vec<String>>,

    #[serde(rename = "schedulingAllowed", skip_serializing_if = "Option::is_none")]
    pub scheduling_allowed: Option<bool>,

    #[serde(
        rename = "maxScheduleIntervalHours",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_schedule_interval_hours: Option<u32>,

    #[serde(rename = "bridgeAllowed", skip_serializing_if = "Option::is_none")]
    pub bridge_allowed: Option<bool>,

    #[serde(rename = "allowedChains", skip_serializing_if = "Option::is_none")]
    pub allowed_chains: Option<Vec<String>>,
}

/// Context the evaluator needs beyond the policy and the command itself.
/// Deliberately narrow — the evaluator stays pure.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub daily_spend_usd: Decimal,
}

/// Outcome of evaluating one command against one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    pub allow: bool,
    pub reason: String,
}

impl EvalResult {
    fn allow() -> Self {
        Self {
            allow: true,
            reason: "allowed".to_string(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: reason.into(),
        }
    }
}

/// Evaluate `command` against `policy`. Pure: no I/O, deterministic,
/// side-effect-free.
pub fn evaluate(policy: &Policy, command: &Command, context: &EvalContext) -> EvalResult {
    if let Some(deny) = &policy.deny_commands {
        if deny.iter().any(|d| d == command.tag()) {
            return EvalResult::deny(format!("denyCommands: {} is denied", command.tag()));
        }
    }

    if let Some(notional) = notional_usdc(command) {
        if let Some(max) = policy.max_notional_usdc {
            if notional > max {
                return EvalResult::deny(format!(
                    "maxNotionalUsdc: notional {} exceeds limit {}",
                    notional, max
                ));
            }
        }
    }

    if let Some(pair) = traded_pair(command) {
        if let Some(allowed) = &policy.allowed_pairs {
            if !allowed.iter().any(|p| p == &pair) {
                return EvalResult::deny(format!("allowedPairs: {} is not allow-listed", pair));
            }
        }
    }

    if let Some(amount) = single_tx_amount(command) {
        if let Some(max) = policy.max_single_tx_usdc {
            if amount > max {
                return EvalResult::deny(format!(
                    "maxSingleTxUsdc: amount {} exceeds limit {}",
                    amount, max
                ));
            }
        }
        if let Some(daily) = policy.daily_limit_usdc {
            if context.daily_spend_usd + amount > daily {
                return EvalResult::deny(format!(
                    "dailyLimitUsdc: cumulative spend {} would exceed limit {}",
                    context.daily_spend_usd + amount,
                    daily
                ));
            }
        }
    }

    if let Command::Payout { to, .. } = command {
        if let Some(allowlist) = &policy.payout_allowlist {
            if !allowlist.iter().any(|a| a == to) {
                return EvalResult::deny(format!("payoutAllowlist: {} is not allow-listed", to));
            }
        }
    }
    if let Command::PayoutSplit { targets, .. } = command {
        if let Some(allowlist) = &policy.payout_allowlist {
            for target in targets {
                if !allowlist.iter().any(|a| a == &target.address) {
                    return EvalResult::deny(format!(
                        "payoutAllowlist: {} is not allow-listed",
                        target.address
                    ));
                }
            }
        }
    }

    if let Command::Schedule { interval_hours, .. } = command {
        if policy.scheduling_allowed == Some(false) {
            return EvalResult::deny("schedulingAllowed: scheduling is disabled".to_string());
        }
        if let Some(max_hours) = policy.max_schedule_interval_hours {
            if *interval_hours > max_hours {
                return EvalResult::deny(format!(
                    "maxScheduleIntervalHours: interval {}h exceeds limit {}h",
                    interval_hours, max_hours
                ));
            }
        }
    }

    if let Some((from, to)) = bridge_endpoints(command) {
        if policy.bridge_allowed == Some(false) {
            return EvalResult::deny("bridgeAllowed: bridging is disabled".to_string());
        }
        if let Some(allowed) = &policy.allowed_chains {
            if !allowed.iter().any(|c| c == from) || !allowed.iter().any(|c| c == to) {
                return EvalResult::deny(format!(
                    "allowedChains: {} or {} is not allow-listed",
                    from, to
                ));
            }
        }
    }

    EvalResult::allow()
}

fn notional_usdc(command: &Command) -> Option<Decimal> {
    match command {
        Command::LimitBuy { qty, price, .. } | Command::LimitSell { qty, price, .. } => {
            Some(*qty * *price)
        }
        Command::StopLoss { qty, trigger, .. } | Command::TakeProfit { qty, trigger, .. } => {
            Some(*qty * *trigger)
        }
        Command::MarketBuy { qty, .. } | Command::MarketSell { qty, .. } => Some(*qty),
        _ => None,
    }
}

fn traded_pair(command: &Command) -> Option<String> {
    match command {
        Command::LimitBuy { base, quote, .. } | Command::LimitSell { base, quote, .. } => {
            Some(format!("{}/{}", base, quote))
        }
        Command::MarketBuy { base, .. } | Command::MarketSell { base, .. } => {
            Some(format!("{}/USDC", base))
        }
        _ => None,
    }
}

fn single_tx_amount(command: &Command) -> Option<Decimal> {
    match command {
        Command::Payout { amount, .. }
        | Command::PayoutSplit { amount, .. }
        | Command::Bridge { amount, .. }
        | Command::YellowSend { amount, .. }
        | Command::Rebalance { amount, .. } => Some(*amount),
        _ => None,
    }
}

fn bridge_endpoints(command: &Command) -> Option<(&str, &str)> {
    match command {
        Command::Bridge { from_chain, to_chain, .. }
        | Command::Rebalance { from_chain, to_chain, .. } => {
            Some((from_chain.as_str(), to_chain.as_str()))
        }
        _ => None,
    }
}
