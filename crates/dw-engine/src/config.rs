//! Environment contract (spec.md §6): "a validated configuration object
//! with (at minimum): master encryption key; adapter credentials;
//! per-chain RPC endpoints and enable flags; polling intervals; public
//! base URL for minting approval URLs." Loaded the way `IndexerConfig`
//! loads from the environment.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Postgres connection string (env: `DATABASE_URL`).
    pub database_url: String,

    /// Symmetric key used to decrypt per-signer session keys and
    /// custodial wallet handles at call time; never persisted decrypted.
    pub master_encryption_key: String,

    /// Public base URL used to mint `approvalUrl` links (e.g.
    /// `https://agent.example.com`).
    pub public_base_url: String,

    #[serde(default)]
    pub evm_rpc_url: Option<String>,
    #[serde(default)]
    pub evm_enabled: bool,

    #[serde(default)]
    pub sui_rpc_url: Option<String>,
    #[serde(default)]
    pub sui_enabled: bool,

    #[serde(default)]
    pub orderbook_url: Option<String>,
    #[serde(default)]
    pub orderbook_enabled: bool,

    #[serde(default)]
    pub custodial_url: Option<String>,
    #[serde(default)]
    pub custodial_enabled: bool,

    #[serde(default)]
    pub state_channel_url: Option<String>,
    #[serde(default)]
    pub state_channel_enabled: bool,

    #[serde(default)]
    pub name_resolver_url: Option<String>,

    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_discovery_period_secs")]
    pub discovery_period_secs: u64,
    #[serde(default = "default_poll_period_secs")]
    pub poll_period_secs: u64,
    #[serde(default = "default_executor_period_secs")]
    pub executor_period_secs: u64,
    #[serde(default = "default_balances_period_secs")]
    pub balances_period_secs: u64,
    #[serde(default = "default_scheduler_period_secs")]
    pub scheduler_period_secs: u64,
    #[serde(default = "default_chat_period_secs")]
    pub chat_period_secs: u64,
    #[serde(default = "default_agent_propose_period_secs")]
    pub agent_propose_period_secs: u64,
    #[serde(default = "default_conditional_period_secs")]
    pub conditional_period_secs: u64,

    #[serde(default)]
    pub agent_autopropose: bool,
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_discovery_period_secs() -> u64 {
    60
}

fn default_poll_period_secs() -> u64 {
    15
}

fn default_executor_period_secs() -> u64 {
    5
}

fn default_balances_period_secs() -> u64 {
    60
}

fn default_scheduler_period_secs() -> u64 {
    30
}

fn default_chat_period_secs() -> u64 {
    15
}

fn default_agent_propose_period_secs() -> u64 {
    60
}

fn default_conditional_period_secs() -> u64 {
    30
}

impl AgentConfig {
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        cfg.try_deserialize()
    }

    pub fn repo_config(&self) -> dw_repo::RepoConfig {
        dw_repo::RepoConfig {
            database_url: self.database_url.clone(),
            max_connections: 10,
            min_connections: 2,
            connection_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}
