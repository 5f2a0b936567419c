//! The tagged command union and its pure parser.
//!
//! Grounded on the shape of `crates/routing`: a small, dependency-light
//! crate that does one pure computation and owns its own error type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{GrammarError, Result};

/// A single destination/percentage pair inside `PAYOUT_SPLIT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTarget {
    pub address: String,
    pub pct: u32,
}

/// The tagged union of every command this engine understands.
///
/// New variants must be added to [`Command::tag`] and to every executor
/// `match` — omitting one is a compile error there by design (spec.md §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Setup,
    Status,
    Quorum { n: u32 },
    SignerAdd { address: String, weight: u32 },
    SessionCreate,
    SessionStatus,
    SessionClose,
    YellowSend { amount: Decimal, asset: String, to: String },
    LimitBuy { base: String, qty: Decimal, quote: String, price: Decimal },
    LimitSell { base: String, qty: Decimal, quote: String, price: Decimal },
    MarketBuy { base: String, qty: Decimal },
    MarketSell { base: String, qty: Decimal },
    Cancel { order_id: String },
    Settle,
    Deposit { asset: String, qty: Decimal },
    Withdraw { asset: String, qty: Decimal },
    Price,
    TradeHistory,
    StopLoss { asset: String, qty: Decimal, trigger: Decimal },
    TakeProfit { asset: String, qty: Decimal, trigger: Decimal },
    Payout { amount: Decimal, to: String },
    PayoutSplit { amount: Decimal, targets: Vec<SplitTarget> },
    Bridge { amount: Decimal, from_chain: String, to_chain: String },
    Treasury,
    Rebalance { amount: Decimal, from_chain: String, to_chain: String },
    SweepYield,
    PolicyEns { name: String },
    Connect { uri: String },
    Tx { payload: serde_json::Value },
    Sign { payload: serde_json::Value },
    Schedule { interval_hours: u32, inner: Box<Command> },
    CancelSchedule { schedule_id: String },
    AutoRebalance { on: bool },
    Alert { asset: String, below: Decimal },
}

impl Command {
    /// Stable tag name, used by `denyCommands` in the policy evaluator and
    /// by the executor's dispatch match.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Setup => "SETUP",
            Command::Status => "STATUS",
            Command::Quorum { .. } => "QUORUM",
            Command::SignerAdd { .. } => "SIGNER_ADD",
            Command::SessionCreate => "SESSION_CREATE",
            Command::SessionStatus => "SESSION_STATUS",
            Command::SessionClose => "SESSION_CLOSE",
            Command::YellowSend { .. } => "YELLOW_SEND",
            Command::LimitBuy { .. } => "LIMIT_BUY",
            Command::LimitSell { .. } => "LIMIT_SELL",
            Command::MarketBuy { .. } => "MARKET_BUY",
            Command::MarketSell { .. } => "MARKET_SELL",
            Command::Cancel { .. } => "CANCEL",
            Command::Settle => "SETTLE",
            Command::Deposit { .. } => "DEPOSIT",
            Command::Withdraw { .. } => "WITHDRAW",
            Command::Price => "PRICE",
            Command::TradeHistory => "TRADE_HISTORY",
            Command::StopLoss { .. } => "STOP_LOSS",
            Command::TakeProfit { .. } => "TAKE_PROFIT",
            Command::Payout { .. } => "PAYOUT",
            Command::PayoutSplit { .. } => "PAYOUT_SPLIT",
            Command::Bridge { .. } => "BRIDGE",
            Command::Treasury => "TREASURY",
            Command::Rebalance { .. } => "REBALANCE",
            Command::SweepYield => "SWEEP_YIELD",
            Command::PolicyEns { .. } => "POLICY",
            Command::Connect { .. } => "CONNECT",
            Command::Tx { .. } => "TX",
            Command::Sign { .. } => "SIGN",
            Command::Schedule { .. } => "SCHEDULE",
            Command::CancelSchedule { .. } => "CANCEL_SCHEDULE",
            Command::AutoRebalance { .. } => "AUTO_REBALANCE",
            Command::Alert { .. } => "ALERT",
        }
    }
}

/// Parse a raw document line into a [`Command`].
///
/// A line is a command iff it starts with the literal prefix `DW`
/// (case-sensitive), token-separated. Everything else is handed to the
/// auto-detect fallback in [`crate::autodetect`].
pub fn parse(raw: &str) -> Result<Command> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GrammarError::Empty);
    }

    match strip_dw_prefix(trimmed) {
        Some(body) => parse_body(body.trim()),
        None => crate::autodetect::parse(trimmed),
    }
}

fn strip_dw_prefix(s: &str) -> Option<&str> {
    if s == "DW" {
        Some("")
    } else {
        s.strip_prefix("DW ")
    }
}

/// Parse the portion of a line after the `DW` prefix has been stripped.
/// Also used recursively for `SCHEDULE`'s inner command, which is written
/// without its own `DW` prefix.
pub(crate) fn parse_body(body: &str) -> Result<Command> {
    if body.is_empty() {
        return Err(GrammarError::Unknown(String::new()));
    }

    let mut split = body.splitn(2, char::is_whitespace);
    let verb = split.next().unwrap_or("");
    let rest = split.next().unwrap_or("").trim();

    match verb.to_uppercase().as_str() {
        "SETUP" | "/SETUP" => Ok(Command::Setup),
        "STATUS" => Ok(Command::Status),
        "QUORUM" => Ok(Command::Quorum { n: parse_u32(rest)? }),
        "SIGNER_ADD" => parse_signer_add(rest),
        "SESSION_CREATE" => Ok(Command::SessionCreate),
        "SESSION_STATUS" => Ok(Command::SessionStatus),
        "SESSION_CLOSE" => Ok(Command::SessionClose),
        "YELLOW_SEND" => parse_yellow_send(rest),
        "LIMIT_BUY" => parse_limit(rest, true),
        "LIMIT_SELL" => parse_limit(rest, false),
        "MARKET_BUY" => parse_market(rest, true),
        "MARKET_SELL" => parse_market(rest, false),
        "CANCEL" | "CANCEL_ORDER" => {
            let order_id = first_token(rest)?;
            Ok(Command::Cancel { order_id: order_id.to_string() })
        }
        "SETTLE" => Ok(Command::Settle),
        "DEPOSIT" => parse_asset_qty(rest).map(|(asset, qty)| Command::Deposit { asset, qty }),
        "WITHDRAW" => parse_asset_qty(rest).map(|(asset, qty)| Command::Withdraw { asset, qty }),
        "PRICE" => Ok(Command::Price),
        "TRADE_HISTORY" => Ok(Command::TradeHistory),
        "STOP_LOSS" => parse_trigger(rest).map(|(asset, qty, trigger)| Command::StopLoss {
            asset,
            qty,
            trigger,
        }),
        "TAKE_PROFIT" => parse_trigger(rest).map(|(asset, qty, trigger)| Command::TakeProfit {
            asset,
            qty,
            trigger,
        }),
        "PAYOUT" => parse_payout(rest),
        "PAYOUT_SPLIT" => parse_payout_split(rest),
        "BRIDGE" => parse_bridge(rest),
        "TREASURY" => Ok(Command::Treasury),
        "REBALANCE" => parse_rebalance(rest),
        "SWEEP_YIELD" => Ok(Command::SweepYield),
        "POLICY" => parse_policy_ens(rest),
        "CONNECT" => {
            let uri = first_token(rest)?;
            Ok(Command::Connect { uri: uri.to_string() })
        }
        "TX" => parse_json(rest).map(|payload| Command::Tx { payload }),
        "SIGN" => parse_json(rest).map(|payload| Command::Sign { payload }),
        "SCHEDULE" => parse_schedule(rest),
        "CANCEL_SCHEDULE" => {
            let schedule_id = first_token(rest)?;
            Ok(Command::CancelSchedule { schedule_id: schedule_id.to_string() })
        }
        "AUTO_REBALANCE" => parse_on_off(rest).map(|on| Command::AutoRebalance { on }),
        "ALERT" => parse_alert(rest),
        "ALERT_THRESHOLD" => parse_alert_threshold(rest),
        other => Err(GrammarError::Unknown(other.to_string())),
    }
}

fn tokens(rest: &str) -> Vec<&str> {
    rest.split_whitespace().collect()
}

fn first_token(rest: &str) -> Result<&str> {
    rest.split_whitespace()
        .next()
        .ok_or_else(|| GrammarError::MissingArgument("expected an argument".to_string()))
}

fn parse_u32(s: &str) -> Result<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| GrammarError::InvalidInteger(s.to_string()))
}

fn parse_amount(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).map_err(|_| GrammarError::InvalidAmount(s.to_string()))
}

/// Validate an address against the length/alphabet rules of the three
/// chain families this engine speaks: EVM (`0x` + 40 hex), Sui (`0x` + 64
/// hex), Stellar-style (`G` + 55 base32 chars, 56 total).
pub fn validate_address(addr: &str) -> Result<()> {
    let is_evm = addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit());
    let is_sui = addr.len() == 66
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit());
    let is_stellar = addr.len() == 56
        && addr.starts_with('G')
        && addr.chars().all(|c| c.is_ascii_alphanumeric());

    if is_evm || is_sui || is_stellar {
        Ok(())
    } else {
        Err(GrammarError::InvalidAddress(addr.to_string()))
    }
}

fn parse_signer_add(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 3 || !t[1].eq_ignore_ascii_case("WEIGHT") {
        return Err(GrammarError::MissingArgument(
            "expected: <addr> WEIGHT <n>".to_string(),
        ));
    }
    validate_address(t[0])?;
    let weight = parse_u32(t[2])?;
    if weight < 1 {
        return Err(GrammarError::InvalidInteger(t[2].to_string()));
    }
    Ok(Command::SignerAdd {
        address: t[0].to_string(),
        weight,
    })
}

fn parse_yellow_send(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 4 || !t[2].eq_ignore_ascii_case("TO") {
        return Err(GrammarError::MissingArgument(
            "expected: <amount> <asset> TO <addr>".to_string(),
        ));
    }
    let amount = parse_amount(t[0])?;
    validate_address(t[3])?;
    Ok(Command::YellowSend {
        amount,
        asset: t[1].to_uppercase(),
        to: t[3].to_string(),
    })
}

fn parse_limit(rest: &str, buy: bool) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 5 || t[3] != "@" {
        return Err(GrammarError::MissingArgument(
            "expected: <base> <qty> <quote> @ <price>".to_string(),
        ));
    }
    let qty = parse_amount(t[1])?;
    let price = parse_amount(t[4])?;
    let base = t[0].to_uppercase();
    let quote = t[2].to_uppercase();
    if buy {
        Ok(Command::LimitBuy { base, qty, quote, price })
    } else {
        Ok(Command::LimitSell { base, qty, quote, price })
    }
}

fn parse_market(rest: &str, buy: bool) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 2 {
        return Err(GrammarError::MissingArgument(
            "expected: <base> <qty>".to_string(),
        ));
    }
    let qty = parse_amount(t[1])?;
    let base = t[0].to_uppercase();
    if buy {
        Ok(Command::MarketBuy { base, qty })
    } else {
        Ok(Command::MarketSell { base, qty })
    }
}

fn parse_asset_qty(rest: &str) -> Result<(String, Decimal)> {
    let t = tokens(rest);
    if t.len() != 2 {
        return Err(GrammarError::MissingArgument(
            "expected: <asset> <qty>".to_string(),
        ));
    }
    Ok((t[0].to_uppercase(), parse_amount(t[1])?))
}

fn parse_trigger(rest: &str) -> Result<(String, Decimal, Decimal)> {
    let t = tokens(rest);
    if t.len() != 4 || t[2] != "@" {
        return Err(GrammarError::MissingArgument(
            "expected: <asset> <qty> @ <trigger>".to_string(),
        ));
    }
    let qty = parse_amount(t[1])?;
    let trigger = parse_amount(t[3])?;
    Ok((t[0].to_uppercase(), qty, trigger))
}

fn parse_payout(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 4 || !t[1].eq_ignore_ascii_case("USDC") || !t[2].eq_ignore_ascii_case("TO") {
        return Err(GrammarError::MissingArgument(
            "expected: <amount> USDC TO <addr>".to_string(),
        ));
    }
    let amount = parse_amount(t[0])?;
    validate_address(t[3])?;
    Ok(Command::Payout {
        amount,
        to: t[3].to_string(),
    })
}

fn parse_payout_split(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 4 || !t[1].eq_ignore_ascii_case("USDC") || !t[2].eq_ignore_ascii_case("TO") {
        return Err(GrammarError::MissingArgument(
            "expected: <amount> USDC TO <addr>:<pct>,<addr>:<pct>,...".to_string(),
        ));
    }
    let amount = parse_amount(t[0])?;

    let mut targets = Vec::new();
    let mut total = 0u32;
    for part in t[3].split(',') {
        let mut kv = part.splitn(2, ':');
        let addr = kv
            .next()
            .ok_or_else(|| GrammarError::MissingArgument("missing address:pct".to_string()))?;
        let pct_s = kv
            .next()
            .ok_or_else(|| GrammarError::MissingArgument("missing :pct".to_string()))?;
        validate_address(addr)?;
        let pct = parse_u32(pct_s)?;
        total += pct;
        targets.push(SplitTarget {
            address: addr.to_string(),
            pct,
        });
    }
    if total != 100 {
        return Err(GrammarError::SplitNotFull);
    }

    Ok(Command::PayoutSplit { amount, targets })
}

fn parse_bridge(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 6
        || !t[1].eq_ignore_ascii_case("USDC")
        || !t[2].eq_ignore_ascii_case("FROM")
        || !t[4].eq_ignore_ascii_case("TO")
    {
        return Err(GrammarError::MissingArgument(
            "expected: <amount> USDC FROM <chain> TO <chain>".to_string(),
        ));
    }
    let amount = parse_amount(t[0])?;
    let from_chain = t[3].to_lowercase();
    let to_chain = t[5].to_lowercase();
    if from_chain == to_chain {
        return Err(GrammarError::SameChain);
    }
    Ok(Command::Bridge {
        amount,
        from_chain,
        to_chain,
    })
}

fn parse_rebalance(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 5 || !t[1].eq_ignore_ascii_case("FROM") || !t[3].eq_ignore_ascii_case("TO") {
        return Err(GrammarError::MissingArgument(
            "expected: <amount> FROM <chain> TO <chain>".to_string(),
        ));
    }
    let amount = parse_amount(t[0])?;
    let from_chain = t[2].to_lowercase();
    let to_chain = t[4].to_lowercase();
    if from_chain == to_chain {
        return Err(GrammarError::SameChainRebalance);
    }
    Ok(Command::Rebalance {
        amount,
        from_chain,
        to_chain,
    })
}

fn parse_policy_ens(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 2 || !t[0].eq_ignore_ascii_case("ENS") {
        return Err(GrammarError::MissingArgument(
            "expected: ENS <name>".to_string(),
        ));
    }
    Ok(Command::PolicyEns {
        name: t[1].to_string(),
    })
}

fn parse_json(rest: &str) -> Result<serde_json::Value> {
    serde_json::from_str(rest).map_err(|e| GrammarError::InvalidJson(e.to_string()))
}

fn parse_schedule(rest: &str) -> Result<Command> {
    let rest = rest
        .strip_prefix("EVERY ")
        .ok_or_else(|| GrammarError::MissingArgument(
            "expected: EVERY <n>h: <inner-command>".to_string(),
        ))?;

    let idx = rest.find("h:").ok_or_else(|| {
        GrammarError::MissingArgument("expected: EVERY <n>h: <inner-command>".to_string())
    })?;
    let n_str = &rest[..idx];
    let inner_str = rest[idx + 2..].trim();

    let interval_hours = parse_u32(n_str)?;

    let inner_verb = inner_str.split_whitespace().next().unwrap_or("");
    if inner_verb.eq_ignore_ascii_case("SCHEDULE") {
        return Err(GrammarError::NestedSchedule);
    }

    let inner = parse_body(inner_str)?;
    Ok(Command::Schedule {
        interval_hours,
        inner: Box::new(inner),
    })
}

fn parse_on_off(rest: &str) -> Result<bool> {
    match rest.trim().to_uppercase().as_str() {
        "ON" => Ok(true),
        "OFF" => Ok(false),
        other => Err(GrammarError::MissingArgument(format!(
            "expected ON or OFF, got {}",
            other
        ))),
    }
}

fn parse_alert(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 3 || !t[1].eq_ignore_ascii_case("BELOW") {
        return Err(GrammarError::MissingArgument(
            "expected: <asset> BELOW <amount>".to_string(),
        ));
    }
    let below = parse_amount(t[2])?;
    Ok(Command::Alert {
        asset: t[0].to_uppercase(),
        below,
    })
}

fn parse_alert_threshold(rest: &str) -> Result<Command> {
    let t = tokens(rest);
    if t.len() != 2 {
        return Err(GrammarError::MissingArgument(
            "expected: <asset> <amount>".to_string(),
        ));
    }
    let below = parse_amount(t[1])?;
    Ok(Command::Alert {
        asset: t[0].to_uppercase(),
        below,
    })
}
