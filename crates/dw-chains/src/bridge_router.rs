//! Derived capability, not a transport of its own: enumerates the six
//! routes between the three chain families and picks the underlying
//! client (spec.md §4.5).

use rust_decimal::Decimal;

use crate::clients::CustodialStableClient;
use crate::error::{ChainError, Result};
use crate::types::{ChainFamily, PayoutResult};

pub struct BridgeRouter<C: CustodialStableClient> {
    custodial: C,
}

impl<C: CustodialStableClient> BridgeRouter<C> {
    pub fn new(custodial: C) -> Self {
        Self { custodial }
    }

    /// All bridge traffic currently settles through the custodial stable
    /// provider regardless of which two chain families are involved —
    /// the six EVM/Sui/custodial pairs share one underlying rail. Direct
    /// EVM<->Sui bridging without the custodial hop is not implemented.
    pub async fn bridge(
        &self,
        wallet_id: &str,
        from_chain: &str,
        to_chain: &str,
        to_address: &str,
        amount: Decimal,
    ) -> Result<PayoutResult> {
        let from_family = ChainFamily::of(from_chain)
            .ok_or_else(|| ChainError::UnsupportedRoute { from: from_chain.to_string(), to: to_chain.to_string() })?;
        let to_family = ChainFamily::of(to_chain)
            .ok_or_else(|| ChainError::UnsupportedRoute { from: from_chain.to_string(), to: to_chain.to_string() })?;

        if from_family == to_family {
            return Err(ChainError::UnsupportedRoute { from: from_chain.to_string(), to: to_chain.to_string() });
        }

        self.custodial.bridge(wallet_id, to_chain, to_address, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustodialWalletRef, PayoutState};
    use async_trait::async_trait;

    struct StubCustodial;

    #[async_trait]
    impl CustodialStableClient for StubCustodial {
        async fn ensure_wallet(&self, _doc_id: &str) -> Result<CustodialWalletRef> {
            unimplemented!()
        }

        async fn payout(&self, _wallet_id: &str, _to: &str, _amount: Decimal) -> Result<PayoutResult> {
            unimplemented!()
        }

        async fn bridge(&self, _wallet_id: &str, dest_chain_tag: &str, _to: &str, _amount: Decimal) -> Result<PayoutResult> {
            Ok(PayoutResult {
                provider_tx_id: format!("bridge-to-{dest_chain_tag}"),
                on_chain_ref: None,
                state: PayoutState::Pending,
            })
        }
    }

    #[tokio::test]
    async fn same_family_routes_are_rejected() {
        let router = BridgeRouter::new(StubCustodial);
        let err = router
            .bridge("w1", "ethereum", "arbitrum", "0xabc", Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedRoute { .. }));
    }

    #[tokio::test]
    async fn cross_family_routes_dispatch_through_custodial() {
        let router = BridgeRouter::new(StubCustodial);
        let result = router.bridge("w1", "ethereum", "sui", "0xabc", Decimal::ONE).await.unwrap();
        assert_eq!(result.provider_tx_id, "bridge-to-sui");
    }

    #[tokio::test]
    async fn unknown_chain_tags_are_rejected() {
        let router = BridgeRouter::new(StubCustodial);
        let err = router.bridge("w1", "ethereum", "narnia", "0xabc", Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, ChainError::UnsupportedRoute { .. }));
    }
}
