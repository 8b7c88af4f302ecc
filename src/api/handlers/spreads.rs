use axum::extract::{Query, State};
use axum::Json;

use crate::models::{SpreadQuery, SpreadReport};
use crate::AppState;

use super::ApiResponse;

/// GET /api/spreads — advisory, so an upstream outage still answers 200
/// with the reason in `error`.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<SpreadQuery>,
) -> Json<ApiResponse<SpreadReport>> {
    let report = state.engine.detect_spreads(&query).await;
    let error = report.error.clone();
    Json(ApiResponse {
        success: true,
        data: Some(report),
        error,
    })
}
