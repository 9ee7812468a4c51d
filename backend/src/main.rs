use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shiptrace_backend::{
    app::build_router,
    config::Config,
    db::connection::create_pool,
    services::maintenance::{MaintenanceTask, SWEEP_INTERVAL},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shiptrace_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        session_idle_minutes = config.session_idle_minutes,
        reset_token_ttl_minutes = config.reset_token_ttl_minutes,
        csrf_enabled = config.csrf_enabled,
        production_mode = config.production_mode,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState::new(pool, config)?;

    // Background cleanup is owned by the entry point: started here,
    // stopped on shutdown.
    let maintenance = MaintenanceTask::start(state.clone(), SWEEP_INTERVAL);

    let app = build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.stop();

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
