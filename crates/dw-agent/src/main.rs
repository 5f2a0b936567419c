//! Treasury agent binary: wires config, repository, adapter, chain
//! clients, the executor, the tick orchestrator, and the approval HTTP
//! server together and runs them concurrently. Shaped like
//! `stellarroute-indexer`'s `main` (load config -> connect -> migrate ->
//! construct -> run, `process::exit(1)` on any stage failing).

use std::process;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use dw_adapter::{DocumentAdapter, MemoryAdapter};
use dw_chains::http::{HttpCustodialStableClient, HttpEvmClient, HttpOrderBookClient, HttpStateChannelClient, HttpSuiClient};
use dw_chains::{CachingNameResolver, HttpNameResolver, NameResolver};
use dw_engine::{AgentConfig, ChainClients, Executor, Orchestrator};
use dw_repo::Repo;

#[tokio::main]
async fn main() {
    dw_engine::telemetry::init();
    info!("starting treasury agent");

    let config = match AgentConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let repo = match Repo::new(&config.repo_config()).await {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            error!("failed to connect to database: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = repo.migrate().await {
        error!("failed to run migrations: {}", e);
        process::exit(1);
    }

    let adapter: Arc<dyn DocumentAdapter> = Arc::new(MemoryAdapter::new());

    let clients = ChainClients {
        evm: config.evm_enabled.then(|| {
            let url = config.evm_rpc_url.clone().unwrap_or_default();
            Arc::new(HttpEvmClient::new(url)) as Arc<dyn dw_chains::EvmClient>
        }),
        sui: config.sui_enabled.then(|| {
            let url = config.sui_rpc_url.clone().unwrap_or_default();
            Arc::new(HttpSuiClient::new(url)) as Arc<dyn dw_chains::SuiClient>
        }),
        orderbook: config.orderbook_enabled.then(|| {
            let url = config.orderbook_url.clone().unwrap_or_default();
            Arc::new(HttpOrderBookClient::new(url)) as Arc<dyn dw_chains::OrderBookClient>
        }),
        custodial: config.custodial_enabled.then(|| {
            let url = config.custodial_url.clone().unwrap_or_default();
            Arc::new(HttpCustodialStableClient::new(url)) as Arc<dyn dw_chains::CustodialStableClient>
        }),
        state_channel: config.state_channel_enabled.then(|| {
            let url = config.state_channel_url.clone().unwrap_or_default();
            Arc::new(HttpStateChannelClient::new(url)) as Arc<dyn dw_chains::StateChannelClient>
        }),
        name_resolver: config.name_resolver_url.clone().map(|url| {
            Arc::new(CachingNameResolver::new(HttpNameResolver::new(url))) as Arc<dyn NameResolver>
        }),
    };

    let executor = Arc::new(Executor::new(Arc::clone(&repo), Arc::clone(&adapter), clients));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&repo),
        Arc::clone(&adapter),
        Arc::clone(&executor),
        config.public_base_url.clone(),
        &config,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handles = Orchestrator::spawn_all(Arc::clone(&orchestrator), shutdown_rx);

    let api_state = Arc::new(dw_api::AppState::new(Arc::clone(&repo), Arc::clone(&adapter), config.public_base_url.clone()));
    let server = dw_api::Server::new(
        dw_api::ServerConfig { host: config.api_host.clone(), port: config.api_port, enable_cors: true },
        api_state,
    );

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                error!("api server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in loop_handles {
        let _ = handle.await;
    }
}
