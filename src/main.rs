//! Brings the panel database to its baseline state and holds the connection
//! until the process is asked to stop.

use anyhow::Context;
use panel_store::{
  Argon2Hasher, Config, Storage,
  config::{NAME, VERSION},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  let config = Config::from_env().context("invalid configuration")?;

  // Initialize tracing
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      format!("{},sea_orm=warn", config.log_level.as_directive()).into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting {} v{}", NAME, VERSION);

  let (storage, report) = Storage::initialize(&config, &Argon2Hasher)
    .await
    .context("database bootstrap failed")?;

  if report.default_account_created {
    info!("Default account created; change its password after first login");
  }

  tokio::signal::ctrl_c().await.context("failed to listen for shutdown")?;

  info!("Shutting down");
  if let Err(err) = storage.shutdown().await {
    warn!("Failed to close database: {}", err);
  }
  Ok(())
}
