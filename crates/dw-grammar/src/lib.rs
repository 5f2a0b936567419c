//! DW command grammar
//!
//! A pure parser mapping a raw document line to a tagged [`Command`].
//! No I/O, no policy, no persistence — those live in `dw-policy` and
//! `dw-repo` respectively.

mod autodetect;
mod command;
mod error;
mod unparse;

pub use command::{validate_address, Command, SplitTarget};
pub use error::{GrammarError, Result};
pub use unparse::unparse;

/// Parse a raw document line into a [`Command`].
pub fn parse(raw: &str) -> Result<Command> {
    command::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn empty_line_is_invalid() {
        assert_eq!(parse(""), Err(GrammarError::Empty));
        assert_eq!(parse("   "), Err(GrammarError::Empty));
    }

    #[test]
    fn unknown_verb_is_pinned() {
        let err = parse("DW FOOBAR").unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: FOOBAR");
    }

    #[test]
    fn setup_variants() {
        assert_eq!(parse("DW SETUP").unwrap(), Command::Setup);
        assert_eq!(parse("DW /setup").unwrap(), Command::Setup);
        assert_eq!(parse("setup").unwrap(), Command::Setup);
        assert_eq!(parse("/setup").unwrap(), Command::Setup);
    }

    #[test]
    fn payout_happy_path() {
        let cmd = parse("DW PAYOUT 10 USDC TO 0x0000000000000000000000000000000000000001")
            .unwrap();
        assert_eq!(
            cmd,
            Command::Payout {
                amount: Decimal::from_str("10").unwrap(),
                to: "0x0000000000000000000000000000000000000001".to_string(),
            }
        );
    }

    #[test]
    fn payout_split_requires_100_percent() {
        let err = parse(
            "DW PAYOUT_SPLIT 100 USDC TO 0x0000000000000000000000000000000000000001:50,0x0000000000000000000000000000000000000002:49",
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::SplitNotFull);
    }

    #[test]
    fn bridge_same_chain_rejected() {
        let err = parse("DW BRIDGE 100 USDC FROM arc TO arc").unwrap_err();
        assert_eq!(err, GrammarError::SameChain);
    }

    #[test]
    fn schedule_cannot_nest() {
        let err = parse("DW SCHEDULE EVERY 1h: SCHEDULE EVERY 2h: LIMIT_BUY XLM 10 USDC @ 0.1")
            .unwrap_err();
        assert_eq!(err, GrammarError::NestedSchedule);
    }

    #[test]
    fn schedule_wraps_inner_command() {
        let cmd = parse(
            "DW SCHEDULE EVERY 1h: PAYOUT 1 USDC TO 0x0000000000000000000000000000000000000001",
        )
        .unwrap();
        match cmd {
            Command::Schedule { interval_hours, inner } => {
                assert_eq!(interval_hours, 1);
                assert_eq!(
                    *inner,
                    Command::Payout {
                        amount: Decimal::from_str("1").unwrap(),
                        to: "0x0000000000000000000000000000000000000001".to_string(),
                    }
                );
            }
            other => panic!("expected Schedule, got {:?}", other),
        }
    }

    #[test]
    fn auto_detect_send_maps_to_payout() {
        let cmd = parse("send 10 USDC to 0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(
            cmd,
            Command::Payout {
                amount: Decimal::from_str("10").unwrap(),
                to: "0x0000000000000000000000000000000000000001".to_string(),
            }
        );
    }

    #[test]
    fn auto_detect_buy_maps_to_limit_buy() {
        let cmd = parse("buy 10 XLM at 0.12").unwrap();
        assert_eq!(
            cmd,
            Command::LimitBuy {
                base: "XLM".to_string(),
                qty: Decimal::from_str("10").unwrap(),
                quote: "USDC".to_string(),
                price: Decimal::from_str("0.12").unwrap(),
            }
        );
    }

    #[test]
    fn auto_detect_wc_uri_maps_to_connect() {
        let cmd = parse("wc:abc123@2?relay-protocol=irn").unwrap();
        assert_eq!(
            cmd,
            Command::Connect {
                uri: "wc:abc123@2?relay-protocol=irn".to_string(),
            }
        );
    }

    #[test]
    fn round_trips_through_unparse() {
        let lines = [
            "DW PAYOUT 10 USDC TO 0x0000000000000000000000000000000000000001",
            "DW QUORUM 2",
            "DW LIMIT_BUY XLM 100 USDC @ 0.12",
            "DW BRIDGE 50 USDC FROM arc TO evm",
            "DW SCHEDULE EVERY 6h: PAYOUT 5 USDC TO 0x0000000000000000000000000000000000000002",
        ];
        for line in lines {
            let parsed = parse(line).unwrap();
            let printed = unparse(&parsed);
            let reparsed = parse(&printed).unwrap();
            assert_eq!(parsed, reparsed, "round-trip mismatch for {}", line);
        }
    }

    #[test]
    fn empty_dw_body_is_unknown() {
        let err = parse("DW").unwrap_err();
        assert!(matches!(err, GrammarError::Unknown(_)));
    }
}
