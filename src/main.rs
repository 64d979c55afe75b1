mod config;
mod core;
mod error;
mod models;
mod providers;
mod store;

use crate::config::Config;
use crate::core::runtime::Runtime;
use tracing::info;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let config = Config::from_env()?;
    let runtime = Runtime::new(config)?;

    info!("Bot started");
    runtime.run().await
}
