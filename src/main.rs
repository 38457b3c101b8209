use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod board;
mod config;
mod constants;
mod error;
mod indexer;
mod models;
mod services;
mod websocket;

use config::Config;
use constants::API_VERSION;
use services::onchain::{OnchainGateway, OnchainInvoker, OnchainReader};
use services::{ContractMirrorStore, GameStateStore, NoticeCenter, Reconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "web3chess_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Web3 Chess Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    if config.is_testnet() {
        tracing::info!("Running against a test network (chain id {})", config.chain_id);
    }

    // Contract access
    let reader = OnchainReader::from_config(&config)?;
    let invoker = OnchainInvoker::from_config(&config)?;
    if invoker.is_none() {
        tracing::warn!("No wallet configured; contract writes are disabled");
    }
    let gateway = Arc::new(OnchainGateway::new(reader.clone(), invoker));

    // Stores and reconciler
    let notices = NoticeCenter::new();
    let reconciler = Reconciler::new(
        gateway,
        GameStateStore::new(),
        ContractMirrorStore::new(),
        notices.clone(),
    );

    let app_state = api::AppState {
        reconciler: reconciler.clone(),
        notices,
        config: config.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(reconciler, reader));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Game state and moves
        .route("/api/v1/game/state", get(api::game::get_state))
        .route("/api/v1/game/move", post(api::game::submit_move))
        .route("/api/v1/game/reset", post(api::game::reset))
        .route("/api/v1/game/refresh", post(api::game::refresh))
        // Contract writes
        .route("/api/v1/game/create", post(api::game::create_game))
        .route("/api/v1/game/join", post(api::game::join_game))
        .route("/api/v1/game/withdraw", post(api::game::withdraw))
        .route("/api/v1/game/approve", post(api::game::approve))
        // WebSocket endpoints
        .route("/ws/notices", get(websocket::notices::handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
