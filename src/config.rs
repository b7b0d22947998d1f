use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Create enum type and tables on startup if missing
    #[serde(default)]
    pub init_schema: bool,
    /// Insert the three sample accounts when the account table is empty
    #[serde(default)]
    pub seed_sample_data: bool,
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

/// Transfer engine settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Upper bound on waiting for a row lock before the transfer is
    /// aborted with a retryable conflict
    pub lock_timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`; `DATABASE_URL` overrides `postgres.url`
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.postgres.url = url;
        }
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", config_path))?;
        Ok(config)
    }

    /// PostgreSQL treats `lock_timeout = 0` as "wait forever"
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.transfer.lock_timeout_ms > 0,
            "transfer.lock_timeout_ms must be greater than zero"
        );
        Ok(())
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}
