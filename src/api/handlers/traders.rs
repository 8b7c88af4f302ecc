use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{LeaderboardEntry, SortBy, TraderStats};
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RecordTradeRequest {
    pub pnl: Decimal,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct PercentileResponse {
    pub trader_id: String,
    pub percentile: Decimal,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/traders/:trader_id/trades
pub async fn record_trade(
    State(state): State<AppState>,
    Path(trader_id): Path<String>,
    Json(req): Json<RecordTradeRequest>,
) -> Result<Json<ApiResponse<TraderStats>>, AppError> {
    let mut stats = state.engine.record_trade(&trader_id, req.pnl).await?;
    if let Some(name) = req.display_name.as_deref() {
        stats = state.engine.set_display_name(&trader_id, name).await?;
    }
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/leaderboard?sort_by=pnl&limit=10
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>, AppError> {
    let sort_by = match q.sort_by.as_deref() {
        Some(raw) => raw.parse::<SortBy>()?,
        None => SortBy::default(),
    };
    let entries = state.engine.get_leaderboard(sort_by, q.limit).await;
    Ok(Json(ApiResponse::ok(entries)))
}

/// GET /api/traders/:trader_id/percentile
pub async fn percentile(
    State(state): State<AppState>,
    Path(trader_id): Path<String>,
) -> Result<Json<ApiResponse<PercentileResponse>>, AppError> {
    let percentile = state
        .engine
        .get_trader_percentile(&trader_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("trader {trader_id} not tracked")))?;

    Ok(Json(ApiResponse::ok(PercentileResponse { trader_id, percentile })))
}
