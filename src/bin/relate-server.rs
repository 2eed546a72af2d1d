//! relate-server: the relationship API over an in-memory store
//!
//! Configuration comes from `RELATE_CONFIG` (YAML file) and `PORT`;
//! `RUST_LOG` overrides the configured log filter.

use anyhow::Result;
use relate::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        host = %config.host,
        port = config.port,
        cors = config.cors,
        "starting relate-server"
    );

    ServerBuilder::new()
        .with_store(InMemoryStore::new())
        .with_config(config)
        .serve()
        .await
}
