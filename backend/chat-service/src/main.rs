use std::sync::Arc;

use chat_service::{
    config, db, error,
    events::EventBus,
    logging, routes,
    state::AppState,
    websocket::{events::run_gateway, pubsub, RoomRegistry},
};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Schema drift is fatal at startup.
    db::run_migrations(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let registry = RoomRegistry::new();
    let events = EventBus::default();

    let state = AppState {
        db,
        registry: registry.clone(),
        redis: redis.clone(),
        events: events.clone(),
        config: cfg.clone(),
    };

    // Gateway: domain events -> socket pushes (local room + Redis publish).
    tokio::spawn(run_gateway(events, registry.clone(), redis.clone()));

    // Cross-instance fan-out listener.
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_psub_listener(redis, registry).await {
            tracing::error!(error = %e, "redis pubsub listener failed");
        }
    });

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
