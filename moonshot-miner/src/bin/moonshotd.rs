//! Main entry point for the moonshot-miner daemon.

use moonshot_miner::{config::WorkerConfig, daemon::Daemon, tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing::init();

    let config = WorkerConfig::from_env()?;
    Daemon::new(config).run().await
}
