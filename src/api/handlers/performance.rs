use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{PerformanceSnapshot, PerformanceSummary};
use crate::AppState;

use super::ApiResponse;

const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub window_days: Option<i64>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

/// GET /api/performance/:profile_id
pub async fn summary(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<PerformanceSummary>>, AppError> {
    let summary = state
        .engine
        .get_performance_summary(&profile_id, q.window_days)
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/performance/:profile_id/history
pub async fn history(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<PerformanceSnapshot>>>, AppError> {
    let rows = state
        .engine
        .get_historical_performance(&profile_id, q.days.unwrap_or(DEFAULT_HISTORY_DAYS))
        .await?;
    Ok(Json(ApiResponse::ok(rows)))
}
