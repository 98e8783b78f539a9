use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use taskdeck::{
    config::Config,
    create_router,
    db::{self, PgTaskRepository},
    storage::StorageClient,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdeck=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Connect to database
    let pool = db::create_pool(&config.database).await?;
    db::ensure_schema(&pool).await?;

    // Storage connects lazily on first use
    let storage = StorageClient::from_config(&config.storage);

    let state = AppState {
        tasks: Arc::new(PgTaskRepository::new(pool)),
        storage,
        config: config.clone(),
    };

    let app = create_router(state);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HOST '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
