use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque reference to a decrypted signing key, resolved by the caller
/// (typically `dw-engine::executor`) and never logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle(pub String);

impl KeyHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub native: Decimal,
    pub stable: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiBalances {
    pub native: Decimal,
    pub stable_coins: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub tx_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: String,
    pub data: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidPrice {
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub digest: String,
    pub order_id: Option<String>,
    pub manager_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodialWalletRef {
    pub wallet_id: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutState {
    Pending,
    Settled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutResult {
    pub provider_tx_id: String,
    pub on_chain_ref: Option<String>,
    pub state: PayoutState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub address: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRef {
    pub settlement_ref: String,
}

/// The three chain families §4.5's `BridgeRouter` enumerates routes across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainFamily {
    Evm,
    Sui,
    Custodial,
}

impl ChainFamily {
    pub fn of(chain_tag: &str) -> Option<Self> {
        match chain_tag {
            "ethereum" | "arbitrum" | "base" | "polygon" | "optimism" => Some(Self::Evm),
            "sui" => Some(Self::Sui),
            "custodial" | "circle" | "bridge-provider" => Some(Self::Custodial),
            _ => None,
        }
    }
}
