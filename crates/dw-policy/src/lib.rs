//! DW policy evaluator
//!
//! A pure function `evaluate(policy, command, context) -> { allow, reason }`.
//! No I/O — see spec.md §4.3.

mod policy;

pub use policy::{evaluate, EvalContext, EvalResult, Policy};

#[cfg(test)]
mod tests {
    use super::*;
    use dw_grammar::Command;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn no_policy_allows_everything() {
        let policy = Policy::default();
        let ctx = EvalContext::default();
        let cmd = Command::Payout {
            amount: dec("1000"),
            to: "0x0000000000000000000000000000000000000001".to_string(),
        };
        assert!(evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn max_single_tx_denies_over_cap() {
        let policy = Policy {
            max_single_tx_usdc: Some(dec("5")),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Payout {
            amount: dec("10"),
            to: "0x0000000000000000000000000000000000000001".to_string(),
        };
        let result = evaluate(&policy, &cmd, &ctx);
        assert!(!result.allow);
        assert!(result.reason.contains("maxSingleTxUsdc"));
    }

    #[test]
    fn daily_limit_accumulates_with_context() {
        let policy = Policy {
            daily_limit_usdc: Some(dec("100")),
            ..Default::default()
        };
        let ctx = EvalContext {
            daily_spend_usd: dec("95"),
        };
        let cmd = Command::Payout {
            amount: dec("10"),
            to: "0x0000000000000000000000000000000000000001".to_string(),
        };
        let result = evaluate(&policy, &cmd, &ctx);
        assert!(!result.allow);
        assert!(result.reason.contains("dailyLimitUsdc"));
    }

    #[test]
    fn deny_commands_blocks_by_tag() {
        let policy = Policy {
            deny_commands: Some(vec!["BRIDGE".to_string()]),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Bridge {
            amount: dec("1"),
            from_chain: "arc".to_string(),
            to_chain: "evm".to_string(),
        };
        assert!(!evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn payout_allowlist_rejects_unknown_destination() {
        let policy = Policy {
            payout_allowlist: Some(vec!["0x0000000000000000000000000000000000000099".to_string()]),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Payout {
            amount: dec("1"),
            to: "0x0000000000000000000000000000000000000001".to_string(),
        };
        assert!(!evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn allowed_pairs_rejects_unlisted_pair() {
        let policy = Policy {
            allowed_pairs: Some(vec!["XLM/USDC".to_string()]),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::LimitBuy {
            base: "BTC".to_string(),
            qty: dec("1"),
            quote: "USDC".to_string(),
            price: dec("1"),
        };
        assert!(!evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn scheduling_allowed_false_blocks_schedule() {
        let policy = Policy {
            scheduling_allowed: Some(false),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Schedule {
            interval_hours: 1,
            inner: Box::new(Command::Settle),
        };
        assert!(!evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn bridge_allowed_false_blocks_bridge_and_rebalance() {
        let policy = Policy {
            bridge_allowed: Some(false),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let bridge = Command::Bridge {
            amount: dec("1"),
            from_chain: "arc".to_string(),
            to_chain: "evm".to_string(),
        };
        let rebalance = Command::Rebalance {
            amount: dec("1"),
            from_chain: "arc".to_string(),
            to_chain: "evm".to_string(),
        };
        assert!(!evaluate(&policy, &bridge, &ctx).allow);
        assert!(!evaluate(&policy, &rebalance, &ctx).allow);
    }

    #[test]
    fn allowed_chains_requires_both_endpoints() {
        let policy = Policy {
            allowed_chains: Some(vec!["arc".to_string(), "evm".to_string()]),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Bridge {
            amount: dec("1"),
            from_chain: "arc".to_string(),
            to_chain: "sui".to_string(),
        };
        assert!(!evaluate(&policy, &cmd, &ctx).allow);
    }

    #[test]
    fn tightening_a_limit_never_allows_a_previously_rejected_command() {
        // Monotonicity property from spec.md §8.
        let loose = Policy {
            max_single_tx_usdc: Some(dec("100")),
            ..Default::default()
        };
        let tight = Policy {
            max_single_tx_usdc: Some(dec("10")),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::Payout {
            amount: dec("50"),
            to: "0x0000000000000000000000000000000000000001".to_string(),
        };
        let loose_result = evaluate(&loose, &cmd, &ctx);
        let tight_result = evaluate(&tight, &cmd, &ctx);
        assert!(loose_result.allow);
        assert!(!tight_result.allow);
    }

    #[test]
    fn evaluate_is_pure_and_deterministic() {
        let policy = Policy {
            max_notional_usdc: Some(dec("1000")),
            ..Default::default()
        };
        let ctx = EvalContext::default();
        let cmd = Command::LimitBuy {
            base: "XLM".to_string(),
            qty: dec("100"),
            quote: "USDC".to_string(),
            price: dec("0.5"),
        };
        let r1 = evaluate(&policy, &cmd, &ctx);
        let r2 = evaluate(&policy, &cmd, &ctx);
        assert_eq!(r1, r2);
    }
}
