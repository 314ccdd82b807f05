use anyhow::Result;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use trip_relay::config::Config;
use trip_relay::endpoint;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let bind: SocketAddr = config.server.bind.parse().map_err(|e| {
        anyhow::anyhow!("Invalid server bind {} (expected host:port): {e}", config.server.bind)
    })?;

    if std::env::var(&config.provider.api_key_env).is_err() {
        // Not fatal at startup: every request fails until the key is provided.
        tracing::warn!(
            "{} is not set; completion requests will fail",
            config.provider.api_key_env
        );
    }

    let router = endpoint::router(
        trip_relay::endpoint_from_config(&config),
        &config.server.path,
    );

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        path = %config.server.path,
        model = %config.provider.model,
        "Starting completion endpoint"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
