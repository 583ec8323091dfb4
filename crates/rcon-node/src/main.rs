//! # RCON Node
//!
//! HTTP service hosting the RCON delivery engine.

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod config;
mod state;

use config::NodeConfig;
use state::AppState;

/// Run the node until the listener fails.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("RCON node starting...");

    let addr: SocketAddr = config.listen;
    let state = AppState::from_config(&config);
    info!(
        "Loaded {} server(s) and {} command template(s)",
        config.servers.len(),
        config.commands.len()
    );

    let app = create_router(state);

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))

        // Delivery API
        .route(
            "/api/v1/deliveries",
            post(api::delivery::submit_delivery).get(api::delivery::list_deliveries),
        )
        .route("/api/v1/deliveries/:id", get(api::delivery::get_delivery))

        // One-off debug command
        .route("/api/v1/rcon/test", post(api::debug::test_command))

        // Catalog view
        .route("/api/v1/servers", get(api::catalog::list_servers))
        .route("/api/v1/commands", get(api::catalog::list_commands))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::load()?;
    run_server(config).await
}
