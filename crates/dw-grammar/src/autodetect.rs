//! Natural-language fallback parser.
//!
//! Lines that do not start with the `DW` prefix are matched against a fixed
//! set of patterns (spec.md §6). Unmatched text is an [`GrammarError::Unknown`]
//! the same way an unrecognised `DW` verb is — the command table is
//! discovered by appending a row, not by guessing intent.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::command::{validate_address, Command};
use crate::error::{GrammarError, Result};

pub fn parse(raw: &str) -> Result<Command> {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();

    if lower.starts_with("wc:") {
        return Ok(Command::Connect {
            uri: trimmed.to_string(),
        });
    }
    if lower == "setup" || lower == "/setup" {
        return Ok(Command::Setup);
    }
    if lower == "status" {
        return Ok(Command::Status);
    }
    if lower == "settle" {
        return Ok(Command::Settle);
    }
    if lower == "price" || lower == "prices" {
        return Ok(Command::Price);
    }
    if lower == "trades" || lower == "pnl" || lower == "p&l" {
        return Ok(Command::TradeHistory);
    }
    if lower == "sweep" || lower == "sweep yield" || lower == "collect" {
        return Ok(Command::SweepYield);
    }
    if lower == "treasury" || lower == "all balances" {
        return Ok(Command::Treasury);
    }

    if let Some(rest) = lower.strip_prefix("cancel schedule ") {
        let schedule_id = rest.split_whitespace().next().unwrap_or("").to_string();
        if schedule_id.is_empty() {
            return Err(GrammarError::MissingArgument(
                "cancel schedule <id>".to_string(),
            ));
        }
        return Ok(Command::CancelSchedule { schedule_id });
    }

    if let Some(cmd) = try_send(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_market_order(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_limit_order(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_bridge(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_rebalance(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_stop_loss(trimmed, &lower)? {
        return Ok(cmd);
    }
    if let Some(cmd) = try_take_profit(trimmed, &lower)? {
        return Ok(cmd);
    }

    Err(GrammarError::Unknown(trimmed.to_string()))
}

fn amount(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|_| GrammarError::InvalidAmount(s.to_string()))
}

/// `send N <asset> to <addr>` -> PAYOUT
fn try_send(original: &str, lower: &str) -> Result<Option<Command>> {
    if !lower.starts_with("send ") {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 5 || !t[3].eq_ignore_ascii_case("to") {
        return Err(GrammarError::MissingArgument(
            "expected: send <amount> <asset> to <addr>".to_string(),
        ));
    }
    let amt = amount(t[1])?;
    validate_address(t[4])?;
    Ok(Some(Command::Payout { amount: amt, to: t[4].to_string() }))
}

/// `buy/sell N <asset> at|@ P` -> LIMIT_BUY / LIMIT_SELL (quote asset
/// defaults to USDC, matching the agent's treasury unit of account).
fn try_limit_order(original: &str, lower: &str) -> Result<Option<Command>> {
    let buy = lower.starts_with("buy ");
    let sell = lower.starts_with("sell ");
    if !buy && !sell {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 5 || !(t[3].eq_ignore_ascii_case("at") || t[3] == "@") {
        return Err(GrammarError::MissingArgument(
            "expected: buy|sell <qty> <asset> at|@ <price>".to_string(),
        ));
    }
    let qty = amount(t[1])?;
    let price = amount(t[4])?;
    let base = t[2].to_uppercase();
    if buy {
        Ok(Some(Command::LimitBuy { base, qty, quote: "USDC".to_string(), price }))
    } else {
        Ok(Some(Command::LimitSell { base, qty, quote: "USDC".to_string(), price }))
    }
}

/// `market buy/sell N <asset>` -> MARKET_BUY / MARKET_SELL
fn try_market_order(original: &str, lower: &str) -> Result<Option<Command>> {
    if !lower.starts_with("market ") {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 4 {
        return Err(GrammarError::MissingArgument(
            "expected: market buy|sell <qty> <asset>".to_string(),
        ));
    }
    let qty = amount(t[2])?;
    let base = t[3].to_uppercase();
    match t[1].to_lowercase().as_str() {
        "buy" => Ok(Some(Command::MarketBuy { base, qty })),
        "sell" => Ok(Some(Command::MarketSell { base, qty })),
        _ => Err(GrammarError::Unknown(original.to_string())),
    }
}

/// `bridge N USDC from X to Y` -> BRIDGE
fn try_bridge(original: &str, lower: &str) -> Result<Option<Command>> {
    if !lower.starts_with("bridge ") {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 7
        || !t[2].eq_ignore_ascii_case("usdc")
        || !t[3].eq_ignore_ascii_case("from")
        || !t[5].eq_ignore_ascii_case("to")
    {
        return Err(GrammarError::MissingArgument(
            "expected: bridge <amount> USDC from <chain> to <chain>".to_string(),
        ));
    }
    let amt = amount(t[1])?;
    let from_chain = t[4].to_lowercase();
    let to_chain = t[6].to_lowercase();
    if from_chain == to_chain {
        return Err(GrammarError::SameChain);
    }
    Ok(Some(Command::Bridge { amount: amt, from_chain, to_chain }))
}

/// `rebalance N from X to Y` -> REBALANCE
fn try_rebalance(original: &str, lower: &str) -> Result<Option<Command>> {
    if !lower.starts_with("rebalance ") {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 6 || !t[2].eq_ignore_ascii_case("from") || !t[4].eq_ignore_ascii_case("to") {
        return Err(GrammarError::MissingArgument(
            "expected: rebalance <amount> from <chain> to <chain>".to_string(),
        ));
    }
    let amt = amount(t[1])?;
    let from_chain = t[3].to_lowercase();
    let to_chain = t[5].to_lowercase();
    if from_chain == to_chain {
        return Err(GrammarError::SameChainRebalance);
    }
    Ok(Some(Command::Rebalance { amount: amt, from_chain, to_chain }))
}

/// `stop loss <asset> <qty> at <trigger>` -> STOP_LOSS
fn try_stop_loss(original: &str, lower: &str) -> Result<Option<Command>> {
    if !lower.starts_with("stop loss ") {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    if t.len() != 6 || !(t[4].eq_ignore_ascii_case("at") || t[4] == "@") {
        return Err(GrammarError::MissingArgument(
            "expected: stop loss <asset> <qty> at <trigger>".to_string(),
        ));
    }
    let qty = amount(t[3])?;
    let trigger = amount(t[5])?;
    Ok(Some(Command::StopLoss { asset: t[2].to_uppercase(), qty, trigger }))
}

/// `tp|take profit <asset> <qty> @ <trigger>` -> TAKE_PROFIT
fn try_take_profit(original: &str, lower: &str) -> Result<Option<Command>> {
    let is_tp = lower.starts_with("tp ");
    let is_take_profit = lower.starts_with("take profit ");
    if !is_tp && !is_take_profit {
        return Ok(None);
    }
    let t: Vec<&str> = original.split_whitespace().collect();
    let skip = if is_tp { 1 } else { 2 };
    if t.len() != skip + 4
        || !(t[skip + 2] == "@" || t[skip + 2].eq_ignore_ascii_case("at"))
    {
        return Err(GrammarError::MissingArgument(
            "expected: tp|take profit <asset> <qty> @ <trigger>".to_string(),
        ));
    }
    let asset = t[skip].to_uppercase();
    let qty = amount(t[skip + 1])?;
    let trigger = amount(t[skip + 3])?;
    Ok(Some(Command::TakeProfit { asset, qty, trigger }))
}
