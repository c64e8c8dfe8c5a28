use clap::Parser;
use json_products::server::shutdown_signal;
use json_products::{Server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    info!("Starting products server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let server = Server::bind(&config).await?;
    server.run(shutdown_signal()).await?;

    Ok(())
}
