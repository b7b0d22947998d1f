//! Simple Billing service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌────────────────┐    ┌────────────┐
//! │  Config  │───▶│ Postgres │───▶│ TransferEngine │───▶│  Gateway   │
//! │  (YAML)  │    │  (pool)  │    │ (lock-ordered) │    │  (axum)    │
//! └──────────┘    └──────────┘    └────────────────┘    └────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use simple_billing::account::Database;
use simple_billing::config::AppConfig;
use simple_billing::db::schema;
use simple_billing::exchange::ExchangeTable;
use simple_billing::gateway::{self, state::AppState};
use simple_billing::logging::init_logging;
use simple_billing::transfer::{PgAccountStore, TransferEngine};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }
    let _log_guard = init_logging(&config);

    tracing::info!("Starting Simple Billing in {} mode", env);

    let db = Database::connect(&config.postgres)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.postgres.init_schema {
        schema::create_tables(db.pool())
            .await
            .context("Failed to create schema")?;
    }
    if config.postgres.seed_sample_data {
        schema::seed_sample_data(db.pool())
            .await
            .context("Failed to seed sample accounts")?;
    }

    let store = Arc::new(PgAccountStore::new(
        db.pool().clone(),
        Duration::from_millis(config.transfer.lock_timeout_ms),
    ));
    let engine = TransferEngine::new(store, ExchangeTable::standard())
        .context("Exchange table failed validation")?;
    tracing::info!(
        lock_timeout_ms = config.transfer.lock_timeout_ms,
        "Transfer engine ready"
    );

    let db = Arc::new(db);
    let state = Arc::new(AppState::new(db.clone(), Arc::new(engine)));
    let result = gateway::run_server(&config.gateway, state).await;

    db.close().await;
    result
}
