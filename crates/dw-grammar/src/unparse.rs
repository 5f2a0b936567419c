//! Canonical formatting of a [`Command`] back into a `DW`-prefixed line.
//!
//! Used by the round-trip property in spec.md §8:
//! `parse(unparse(parse(r).ok)) == parse(r).ok`.

use crate::command::Command;

pub fn unparse(cmd: &Command) -> String {
    format!("DW {}", unparse_body(cmd))
}

fn unparse_body(cmd: &Command) -> String {
    match cmd {
        Command::Setup => "SETUP".to_string(),
        Command::Status => "STATUS".to_string(),
        Command::Quorum { n } => format!("QUORUM {}", n),
        Command::SignerAdd { address, weight } => {
            format!("SIGNER_ADD {} WEIGHT {}", address, weight)
        }
        Command::SessionCreate => "SESSION_CREATE".to_string(),
        Command::SessionStatus => "SESSION_STATUS".to_string(),
        Command::SessionClose => "SESSION_CLOSE".to_string(),
        Command::YellowSend { amount, asset, to } => {
            format!("YELLOW_SEND {} {} TO {}", amount, asset, to)
        }
        Command::LimitBuy { base, qty, quote, price } => {
            format!("LIMIT_BUY {} {} {} @ {}", base, qty, quote, price)
        }
        Command::LimitSell { base, qty, quote, price } => {
            format!("LIMIT_SELL {} {} {} @ {}", base, qty, quote, price)
        }
        Command::MarketBuy { base, qty } => format!("MARKET_BUY {} {}", base, qty),
        Command::MarketSell { base, qty } => format!("MARKET_SELL {} {}", base, qty),
        Command::Cancel { order_id } => format!("CANCEL {}", order_id),
        Command::Settle => "SETTLE".to_string(),
        Command::Deposit { asset, qty } => format!("DEPOSIT {} {}", asset, qty),
        Command::Withdraw { asset, qty } => format!("WITHDRAW {} {}", asset, qty),
        Command::Price => "PRICE".to_string(),
        Command::TradeHistory => "TRADE_HISTORY".to_string(),
        Command::StopLoss { asset, qty, trigger } => {
            format!("STOP_LOSS {} {} @ {}", asset, qty, trigger)
        }
        Command::TakeProfit { asset, qty, trigger } => {
            format!("TAKE_PROFIT {} {} @ {}", asset, qty, trigger)
        }
        Command::Payout { amount, to } => format!("PAYOUT {} USDC TO {}", amount, to),
        Command::PayoutSplit { amount, targets } => {
            let list = targets
                .iter()
                .map(|t| format!("{}:{}", t.address, t.pct))
                .collect::<Vec<_>>()
                .join(",");
            format!("PAYOUT_SPLIT {} USDC TO {}", amount, list)
        }
        Command::Bridge { amount, from_chain, to_chain } => {
            format!("BRIDGE {} USDC FROM {} TO {}", amount, from_chain, to_chain)
        }
        Command::Treasury => "TREASURY".to_string(),
        Command::Rebalance { amount, from_chain, to_chain } => {
            format!("REBALANCE {} FROM {} TO {}", amount, from_chain, to_chain)
        }
        Command::SweepYield => "SWEEP_YIELD".to_string(),
        Command::PolicyEns { name } => format!("POLICY ENS {}", name),
        Command::Connect { uri } => format!("CONNECT {}", uri),
        Command::Tx { payload } => format!("TX {}", payload),
        Command::Sign { payload } => format!("SIGN {}", payload),
        Command::Schedule { interval_hours, inner } => {
            format!("SCHEDULE EVERY {}h: {}", interval_hours, unparse_body(inner))
        }
        Command::CancelSchedule { schedule_id } => format!("CANCEL_SCHEDULE {}", schedule_id),
        Command::AutoRebalance { on } => {
            format!("AUTO_REBALANCE {}", if *on { "ON" } else { "OFF" })
        }
        Command::Alert { asset, below } => format!("ALERT {} BELOW {}", asset, below),
    }
}
