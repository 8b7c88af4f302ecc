use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Pool, RiskLevel, RiskTolerance};

/// One line of a recommendation: how much of the capital goes where, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Pool state at the time the recommendation was built.
    pub pool: Pool,
    pub asset: String,
    /// 0-100.
    pub allocation_pct: Decimal,
    pub apy: Decimal,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub principle_ids: Vec<String>,
}

impl Allocation {
    pub fn pool_id(&self) -> &str {
        &self.pool.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub total_amount: Decimal,
    pub expected_apy: Decimal,
    pub expected_yield: Decimal,
    pub overall_risk: RiskLevel,
    /// 0-1, higher is more diversified.
    pub diversification_score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub risk_tolerance: RiskTolerance,
    pub allocations: Vec<Allocation>,
    pub summary: RecommendationSummary,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn total_allocation_pct(&self) -> Decimal {
        self.allocations.iter().map(|a| a.allocation_pct).sum()
    }
}
