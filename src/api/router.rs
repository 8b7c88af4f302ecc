use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    let api = Router::new()
        // Curation
        .route("/api/recommendations", post(handlers::recommendations::create))
        .route("/api/rebalance", post(handlers::rebalance::check))
        .route("/api/spreads", get(handlers::spreads::list))
        // Performance
        .route("/api/performance/:profile_id", get(handlers::performance::summary))
        .route("/api/performance/:profile_id/history", get(handlers::performance::history))
        // Traders
        .route("/api/traders/:trader_id/trades", post(handlers::traders::record_trade))
        .route("/api/traders/:trader_id/percentile", get(handlers::traders::percentile))
        .route("/api/leaderboard", get(handlers::traders::leaderboard));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
