//! `reqwest`-backed chain client implementations. Each follows
//! `HorizonClient`'s shape: a thin REST wrapper, retried with
//! exponential backoff, returning the small domain types in `types.rs`
//! rather than leaking the wire format.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::clients::{CustodialStableClient, EvmClient, OrderBookClient, StateChannelClient, SuiClient};
use crate::error::{ChainError, Result};
use crate::retry::{retry_request, RetryConfig};
use crate::types::{
    Allocation, Balances, CustodialWalletRef, KeyHandle, MidPrice, OpenOrder, OrderResult,
    OrderSide, PayoutResult, PayoutState, SendResult, SettlementRef, SuiBalances,
    TransactionRequest,
};

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

async fn expect_status(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(ChainError::Remote { endpoint: endpoint.to_string(), status, message })
}

#[derive(Clone)]
pub struct HttpEvmClient {
    base_url: String,
    http: reqwest::Client,
    retry_config: RetryConfig,
}

impl HttpEvmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: http_client(), retry_config: RetryConfig::default() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxRefResponse {
    tx_ref: String,
}

#[derive(Deserialize)]
struct BalancesResponse {
    native: Decimal,
    stable: Decimal,
}

#[async_trait]
impl EvmClient for HttpEvmClient {
    async fn transfer_stable(&self, key: &KeyHandle, to: &str, amount: Decimal) -> Result<SendResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/evm/transfer-stable", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "keyHandle": key.0, "to": to, "amount": amount }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: TxRefResponse = resp.json().await?;
            Ok(SendResult { tx_ref: body.tx_ref })
        })
        .await
    }

    async fn get_balances(&self, address: &str) -> Result<Balances> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/evm/balances/{}", self.base_url, address);
            let resp = self.http.get(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: BalancesResponse = resp.json().await?;
            Ok(Balances { native: body.native, stable: body.stable })
        })
        .await
    }

    async fn send_transaction(&self, key: &KeyHandle, req: TransactionRequest) -> Result<SendResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/evm/send", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "keyHandle": key.0, "to": req.to, "data": req.data, "value": req.value }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: TxRefResponse = resp.json().await?;
            Ok(SendResult { tx_ref: body.tx_ref })
        })
        .await
    }

    async fn sign_message(&self, key: &KeyHandle, msg: &[u8]) -> Result<Vec<u8>> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/evm/sign", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "keyHandle": key.0, "message": hex::encode(msg) }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct SigResponse {
                signature: String,
            }
            let body: SigResponse = resp.json().await?;
            hex::decode(&body.signature).map_err(|e| ChainError::InvalidResponse(e.to_string()))
        })
        .await
    }
}

#[derive(Clone)]
pub struct HttpSuiClient {
    base_url: String,
    http: reqwest::Client,
    retry_config: RetryConfig,
}

impl HttpSuiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: http_client(), retry_config: RetryConfig::default() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuiBalancesResponse {
    native: Decimal,
    stable_coins: Vec<(String, Decimal)>,
}

#[async_trait]
impl SuiClient for HttpSuiClient {
    async fn transfer_coin(&self, key: &KeyHandle, to: &str, amount: Decimal) -> Result<SendResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/sui/transfer", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "keyHandle": key.0, "to": to, "amount": amount }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct DigestResponse {
                digest: String,
            }
            let body: DigestResponse = resp.json().await?;
            Ok(SendResult { tx_ref: body.digest })
        })
        .await
    }

    async fn get_balances(&self, address: &str) -> Result<SuiBalances> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/sui/balances/{}", self.base_url, address);
            let resp = self.http.get(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: SuiBalancesResponse = resp.json().await?;
            Ok(SuiBalances { native: body.native, stable_coins: body.stable_coins })
        })
        .await
    }
}

#[derive(Clone)]
pub struct HttpOrderBookClient {
    base_url: String,
    http: reqwest::Client,
    retry_config: RetryConfig,
}

impl HttpOrderBookClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: http_client(), retry_config: RetryConfig::default() }
    }

    async fn order_request(&self, endpoint_suffix: &str, body: serde_json::Value) -> Result<OrderResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/{}", self.base_url, endpoint_suffix);
            let resp = self.http.post(&endpoint).json(&body).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            #[serde(rename_all = "camelCase")]
            struct OrderResponse {
                digest: String,
                order_id: Option<String>,
                manager_id: String,
            }
            let body: OrderResponse = resp.json().await?;
            Ok(OrderResult { digest: body.digest, order_id: body.order_id, manager_id: body.manager_id })
        })
        .await
    }
}

#[async_trait]
impl OrderBookClient for HttpOrderBookClient {
    async fn place_limit(&self, key: &KeyHandle, pair: &str, side: OrderSide, qty: Decimal, price: Decimal) -> Result<OrderResult> {
        self.order_request(
            "orderbook/limit",
            serde_json::json!({ "keyHandle": key.0, "pair": pair, "side": side, "qty": qty, "price": price }),
        )
        .await
    }

    async fn place_market(&self, key: &KeyHandle, pair: &str, side: OrderSide, qty: Decimal) -> Result<OrderResult> {
        self.order_request(
            "orderbook/market",
            serde_json::json!({ "keyHandle": key.0, "pair": pair, "side": side, "qty": qty }),
        )
        .await
    }

    async fn cancel(&self, key: &KeyHandle, order_id: &str) -> Result<OrderResult> {
        self.order_request("orderbook/cancel", serde_json::json!({ "keyHandle": key.0, "orderId": order_id })).await
    }

    async fn settle(&self, key: &KeyHandle) -> Result<OrderResult> {
        self.order_request("orderbook/settle", serde_json::json!({ "keyHandle": key.0 })).await
    }

    async fn deposit(&self, key: &KeyHandle, asset: &str, qty: Decimal) -> Result<OrderResult> {
        self.order_request("orderbook/deposit", serde_json::json!({ "keyHandle": key.0, "asset": asset, "qty": qty })).await
    }

    async fn withdraw(&self, key: &KeyHandle, asset: &str, qty: Decimal) -> Result<OrderResult> {
        self.order_request("orderbook/withdraw", serde_json::json!({ "keyHandle": key.0, "asset": asset, "qty": qty })).await
    }

    async fn mid_price(&self, pair: &str) -> Result<MidPrice> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/orderbook/mid-price?pair={}", self.base_url, pair);
            let resp = self.http.get(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: MidPrice = resp.json().await?;
            Ok(body)
        })
        .await
    }

    async fn open_orders(&self, address: &str, pair: &str) -> Result<Vec<OpenOrder>> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/orderbook/open-orders?address={}&pair={}", self.base_url, address, pair);
            let resp = self.http.get(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: Vec<OpenOrder> = resp.json().await?;
            Ok(body)
        })
        .await
    }
}

#[derive(Clone)]
pub struct HttpCustodialStableClient {
    base_url: String,
    http: reqwest::Client,
    retry_config: RetryConfig,
}

impl HttpCustodialStableClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: http_client(), retry_config: RetryConfig::default() }
    }
}

#[async_trait]
impl CustodialStableClient for HttpCustodialStableClient {
    async fn ensure_wallet(&self, doc_id: &str) -> Result<CustodialWalletRef> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/custodial/wallets", self.base_url);
            let resp = self.http.post(&endpoint).json(&serde_json::json!({ "docId": doc_id })).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: CustodialWalletRef = resp.json().await?;
            Ok(body)
        })
        .await
    }

    async fn payout(&self, wallet_id: &str, to: &str, amount: Decimal) -> Result<PayoutResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/custodial/payout", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "walletId": wallet_id, "to": to, "amount": amount }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: PayoutResponse = resp.json().await?;
            Ok(body.into())
        })
        .await
    }

    async fn bridge(&self, wallet_id: &str, dest_chain_tag: &str, to: &str, amount: Decimal) -> Result<PayoutResult> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/custodial/bridge", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "walletId": wallet_id, "destChainTag": dest_chain_tag, "to": to, "amount": amount }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: PayoutResponse = resp.json().await?;
            Ok(body.into())
        })
        .await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayoutResponse {
    provider_tx_id: String,
    on_chain_ref: Option<String>,
    state: String,
}

impl From<PayoutResponse> for PayoutResult {
    fn from(resp: PayoutResponse) -> Self {
        let state = match resp.state.as_str() {
            "SETTLED" => PayoutState::Settled,
            "FAILED" => PayoutState::Failed,
            _ => PayoutState::Pending,
        };
        PayoutResult { provider_tx_id: resp.provider_tx_id, on_chain_ref: resp.on_chain_ref, state }
    }
}

#[derive(Clone)]
pub struct HttpStateChannelClient {
    base_url: String,
    http: reqwest::Client,
    retry_config: RetryConfig,
}

impl HttpStateChannelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: http_client(), retry_config: RetryConfig::default() }
    }
}

#[async_trait]
impl StateChannelClient for HttpStateChannelClient {
    async fn open_session(&self, signers: &[String], allocations: &[Allocation]) -> Result<String> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/open", self.base_url);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "signers": signers, "allocations": allocations }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct SessionResponse {
                session_id: String,
            }
            let body: SessionResponse = resp.json().await?;
            Ok(body.session_id)
        })
        .await
    }

    async fn submit_app_state(&self, session_id: &str, version: u64, intent: &str, payload: &[u8], quorum_sigs: &[Vec<u8>]) -> Result<u64> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/{}/state", self.base_url, session_id);
            let sigs: Vec<String> = quorum_sigs.iter().map(hex::encode).collect();
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({
                    "version": version,
                    "intent": intent,
                    "payload": hex::encode(payload),
                    "quorumSigs": sigs,
                }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct VersionResponse {
                version: u64,
            }
            let body: VersionResponse = resp.json().await?;
            Ok(body.version)
        })
        .await
    }

    async fn send_off_chain(&self, session_id: &str, to: &str, amount: Decimal) -> Result<u64> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/{}/send", self.base_url, session_id);
            let resp = self.http.post(&endpoint).json(&serde_json::json!({ "to": to, "amount": amount })).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct VersionResponse {
                version: u64,
            }
            let body: VersionResponse = resp.json().await?;
            Ok(body.version)
        })
        .await
    }

    async fn close_session(&self, session_id: &str) -> Result<SettlementRef> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/{}/close", self.base_url, session_id);
            let resp = self.http.post(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            let body: SettlementRef = resp.json().await?;
            Ok(body)
        })
        .await
    }

    async fn auth_request(&self, session_id: &str, signer: &str) -> Result<Vec<u8>> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/{}/auth-request?signer={}", self.base_url, session_id, signer);
            let resp = self.http.post(&endpoint).send().await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct ChallengeResponse {
                challenge: String,
            }
            let body: ChallengeResponse = resp.json().await?;
            hex::decode(&body.challenge).map_err(|e| ChainError::InvalidResponse(e.to_string()))
        })
        .await
    }

    async fn auth_verify(&self, session_id: &str, signer: &str, signature: &[u8]) -> Result<bool> {
        retry_request(&self.retry_config, || async {
            let endpoint = format!("{}/statechannel/{}/auth-verify", self.base_url, session_id);
            let resp = self
                .http
                .post(&endpoint)
                .json(&serde_json::json!({ "signer": signer, "signature": hex::encode(signature) }))
                .send()
                .await?;
            let resp = expect_status(resp, &endpoint).await?;
            #[derive(Deserialize)]
            struct VerifyResponse {
                verified: bool,
            }
            let body: VerifyResponse = resp.json().await?;
            Ok(body.verified)
        })
        .await
    }
}
