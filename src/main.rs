use murmur::{config::Config, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("murmur=info,tower_http=info")),
        )
        .init();

    murmur::serve(&config, AppState::new()).await?;
    Ok(())
}
