use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Recommendation, RiskTolerance};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct RecommendRequest {
    pub amount: Decimal,
    pub risk_tolerance: String,
}

/// POST /api/recommendations
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<ApiResponse<Recommendation>>, AppError> {
    let tolerance: RiskTolerance = req.risk_tolerance.parse()?;
    let rec = state.engine.recommend(req.amount, tolerance).await?;
    Ok(Json(ApiResponse::ok(rec)))
}
