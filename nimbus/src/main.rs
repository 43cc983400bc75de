use nimbus::NimbusProvider;
use tfkit::server::{serve, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the go-plugin handshake, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("NIMBUS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let provider = NimbusProvider::new();
    serve(provider, ServerConfig::default()).await?;

    Ok(())
}
