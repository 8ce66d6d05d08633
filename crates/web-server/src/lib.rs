use axum::{
    routing::{get, post},
    Router,
};
use configuration::Config;
use manager::MultiAccountManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing;

pub mod error;
pub mod handlers;

/// The shared application state handed to every handler.
///
/// One instance per server process, passed explicitly through axum's
/// `State` extractor — concurrent requests share it through the lock,
/// and tests can build as many isolated instances as they like.
pub struct AppState {
    pub manager: RwLock<MultiAccountManager>,
}

/// The main function to configure and run the web server.
pub async fn run_server(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    let mut manager = MultiAccountManager::new(&config.settings);
    manager.register_many(config.accounts)?;

    let app_state = Arc::new(AppState {
        manager: RwLock::new(manager),
    });

    let app = router(app_state);

    tracing::info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router. Split from `run_server` so callers can
/// drive the API without binding a socket.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- DEFINE THE APPLICATION ROUTES ---
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/connect", post(handlers::connect))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/positions", get(handlers::get_positions))
        .route("/api/orders", get(handlers::get_orders))
        .route("/api/report", get(handlers::get_report))
        .route("/api/trade", post(handlers::place_trade))
        .with_state(state)
        .layer(cors)
        // This middleware logs information about every incoming request.
        .layer(TraceLayer::new_for_http())
}
