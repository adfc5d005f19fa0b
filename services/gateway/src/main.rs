use gateway::config::Config;
use gateway::router::create_router;
use gateway::state::AppState;
use matching_engine::{MatchingEngine, SnapshotLoop};
use persistence::JournalStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        auth = config.api_key.is_some(),
        snapshot_interval_secs = config.snapshot_interval_secs,
        "starting order matching gateway"
    );

    let store = Arc::new(JournalStore::open(&config.data_dir)?);
    let engine = Arc::new(MatchingEngine::new(store));

    let restored = engine.rebuild_from_store().await?;
    tracing::info!(orders = restored, "order books rebuilt from store");

    if config.snapshot_interval_secs > 0 {
        let snapshot_loop = SnapshotLoop::new(
            engine.clone(),
            Duration::from_secs(config.snapshot_interval_secs),
        );
        tokio::spawn(snapshot_loop.run());
    }

    let state = AppState::new(engine, config.api_key.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
