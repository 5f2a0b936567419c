//! One async trait per capability the engine dispatches onto (spec.md §4.5).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Allocation, Balances, CustodialWalletRef, KeyHandle, MidPrice, OpenOrder, OrderResult,
    PayoutResult, SendResult, SettlementRef, SuiBalances, TransactionRequest,
};
use rust_decimal::Decimal;

#[async_trait]
pub trait EvmClient: Send + Sync {
    async fn transfer_stable(&self, key: &KeyHandle, to: &str, amount: Decimal) -> Result<SendResult>;
    async fn get_balances(&self, address: &str) -> Result<Balances>;
    async fn send_transaction(&self, key: &KeyHandle, req: TransactionRequest) -> Result<SendResult>;
    async fn sign_message(&self, key: &KeyHandle, msg: &[u8]) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait SuiClient: Send + Sync {
    async fn transfer_coin(&self, key: &KeyHandle, to: &str, amount: Decimal) -> Result<SendResult>;
    async fn get_balances(&self, address: &str) -> Result<SuiBalances>;
}

#[async_trait]
pub trait OrderBookClient: Send + Sync {
    async fn place_limit(
        &self,
        key: &KeyHandle,
        pair: &str,
        side: crate::types::OrderSide,
        qty: Decimal,
        price: Decimal,
    ) -> Result<OrderResult>;

    async fn place_market(
        &self,
        key: &KeyHandle,
        pair: &str,
        side: crate::types::OrderSide,
        qty: Decimal,
    ) -> Result<OrderResult>;

    async fn cancel(&self, key: &KeyHandle, order_id: &str) -> Result<OrderResult>;
    async fn settle(&self, key: &KeyHandle) -> Result<OrderResult>;
    async fn deposit(&self, key: &KeyHandle, asset: &str, qty: Decimal) -> Result<OrderResult>;
    async fn withdraw(&self, key: &KeyHandle, asset: &str, qty: Decimal) -> Result<OrderResult>;
    async fn mid_price(&self, pair: &str) -> Result<MidPrice>;
    async fn open_orders(&self, address: &str, pair: &str) -> Result<Vec<OpenOrder>>;
}

#[async_trait]
pub trait CustodialStableClient: Send + Sync {
    async fn ensure_wallet(&self, doc_id: &str) -> Result<CustodialWalletRef>;
    async fn payout(&self, wallet_id: &str, to: &str, amount: Decimal) -> Result<PayoutResult>;
    async fn bridge(
        &self,
        wallet_id: &str,
        dest_chain_tag: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<PayoutResult>;
}

#[async_trait]
pub trait StateChannelClient: Send + Sync {
    async fn open_session(&self, signers: &[String], allocations: &[Allocation]) -> Result<String>;

    async fn submit_app_state(
        &self,
        session_id: &str,
        version: u64,
        intent: &str,
        payload: &[u8],
        quorum_sigs: &[Vec<u8>],
    ) -> Result<u64>;

    async fn send_off_chain(&self, session_id: &str, to: &str, amount: Decimal) -> Result<u64>;
    async fn close_session(&self, session_id: &str) -> Result<SettlementRef>;
    async fn auth_request(&self, session_id: &str, signer: &str) -> Result<Vec<u8>>;
    async fn auth_verify(&self, session_id: &str, signer: &str, signature: &[u8]) -> Result<bool>;
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_text_record(&self, name: &str, key: &str) -> Result<Option<String>>;
}

// Blanket impls so the engine can hold `Arc<dyn Trait>` and still pass the
// shared handle into generic helpers (e.g. `BridgeRouter<C: CustodialStableClient>`)
// without an extra wrapper type.

#[async_trait]
impl CustodialStableClient for std::sync::Arc<dyn CustodialStableClient> {
    async fn ensure_wallet(&self, doc_id: &str) -> Result<CustodialWalletRef> {
        (**self).ensure_wallet(doc_id).await
    }

    async fn payout(&self, wallet_id: &str, to: &str, amount: Decimal) -> Result<PayoutResult> {
        (**self).payout(wallet_id, to, amount).await
    }

    async fn bridge(&self, wallet_id: &str, dest_chain_tag: &str, to: &str, amount: Decimal) -> Result<PayoutResult> {
        (**self).bridge(wallet_id, dest_chain_tag, to, amount).await
    }
}
