//! Entry point: load config, wire dependencies, and run the server.

use std::sync::Arc;

use notif_gateway::config::Config;
use notif_gateway::repositories::RedisRepository;
use notif_gateway::{create_app, AppState, EventPublisher, OccupancyService, SignatureAuthenticator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let credentials = config
        .credential_store()
        .map_err(|e| anyhow::anyhow!("config: {}", e))?;
    tracing::info!(apps = credentials.len(), "credentials loaded");

    let repo = Arc::new(RedisRepository::connect(&config.redis_url).await?);
    let state = AppState {
        authenticator: SignatureAuthenticator::new(Arc::new(credentials), config.timestamp_grace),
        publisher: EventPublisher::new(repo.clone(), config.publish_timeout),
        occupancy: OccupancyService::new(repo),
        max_body_bytes: config.max_body_bytes,
    };

    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
