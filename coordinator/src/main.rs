use anyhow::Result;
use clap::Parser;
use coordinator::config::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coordinator=debug,axum=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Args::parse().into_config()?;
    coordinator::run(config).await
}
