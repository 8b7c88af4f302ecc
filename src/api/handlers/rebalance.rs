use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{RebalanceAlert, Recommendation, RiskTolerance, Severity};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct RebalanceRequest {
    pub recommendation: Recommendation,
    /// Defaults to the tolerance the recommendation was built for.
    pub risk_tolerance: Option<String>,
}

#[derive(Serialize)]
pub struct RebalanceResponse {
    pub needs_action: bool,
    pub alerts: Vec<RebalanceAlert>,
}

/// POST /api/rebalance — check a standing recommendation for drift
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<RebalanceRequest>,
) -> Result<Json<ApiResponse<RebalanceResponse>>, AppError> {
    let tolerance = match req.risk_tolerance.as_deref() {
        Some(raw) => raw.parse::<RiskTolerance>()?,
        None => req.recommendation.risk_tolerance,
    };
    let alerts = state
        .engine
        .analyze_rebalance(&req.recommendation, tolerance)
        .await?;

    Ok(Json(ApiResponse::ok(RebalanceResponse {
        needs_action: alerts.iter().any(|a| a.severity >= Severity::Medium),
        alerts,
    })))
}
