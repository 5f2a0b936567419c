//! Pool configuration, loaded from the environment the same way
//! `indexer::config::IndexerConfig` is (spec.md §6).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Postgres connection string (env: `DATABASE_URL`).
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_connection_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_max_lifetime_secs() -> u64 {
    1800
}

impl RepoConfig {
    pub fn load() -> std::result::Result<Self, ::config::ConfigError> {
        let cfg = ::config::Config::builder()
            .add_source(::config::Environment::default())
            .build()?;
        cfg.try_deserialize()
    }
}
