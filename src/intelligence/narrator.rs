use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Recommendation, RiskLevel, RiskTolerance};

/// Deterministic facts handed to the narrator. The same facts drive the
/// template fallback, so output is structurally identical with or without a
/// narrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationFacts {
    pub risk_tolerance: RiskTolerance,
    pub pool_count: usize,
    pub total_amount: Decimal,
    pub expected_apy: Decimal,
    pub expected_yield: Decimal,
    pub overall_risk: RiskLevel,
    pub diversification_score: Decimal,
    pub top_project: String,
    pub top_symbol: String,
    pub top_chain: String,
    pub top_allocation_pct: Decimal,
    pub stablecoin_pct: Decimal,
    pub chains: Vec<String>,
}

impl NarrationFacts {
    pub fn from_recommendation(rec: &Recommendation) -> Self {
        let top = rec
            .allocations
            .iter()
            .max_by(|a, b| a.allocation_pct.cmp(&b.allocation_pct));

        let stablecoin_pct: Decimal = rec
            .allocations
            .iter()
            .filter(|a| a.pool.stablecoin)
            .map(|a| a.allocation_pct)
            .sum();

        let mut chains: Vec<String> = rec.allocations.iter().map(|a| a.pool.chain.clone()).collect();
        chains.sort();
        chains.dedup();

        Self {
            risk_tolerance: rec.risk_tolerance,
            pool_count: rec.allocations.len(),
            total_amount: rec.summary.total_amount,
            expected_apy: rec.summary.expected_apy,
            expected_yield: rec.summary.expected_yield,
            overall_risk: rec.summary.overall_risk,
            diversification_score: rec.summary.diversification_score,
            top_project: top.map(|a| a.pool.project.clone()).unwrap_or_default(),
            top_symbol: top.map(|a| a.pool.symbol.clone()).unwrap_or_default(),
            top_chain: top.map(|a| a.pool.chain.clone()).unwrap_or_default(),
            top_allocation_pct: top.map(|a| a.allocation_pct).unwrap_or_default(),
            stablecoin_pct: stablecoin_pct.round_dp(2),
            chains,
        }
    }

    /// Headline used when no narrator is configured or it fails.
    pub fn template(&self) -> String {
        format!(
            "A {} allocation across {} pools targets {}% APY (about {} per year on {}), \
             led by {} {} on {} at {}% of capital; overall risk is {}.",
            self.risk_tolerance,
            self.pool_count,
            self.expected_apy.round_dp(2),
            self.expected_yield.round_dp(2),
            self.total_amount.round_dp(2),
            self.top_project,
            self.top_symbol,
            self.top_chain,
            self.top_allocation_pct,
            self.overall_risk,
        )
    }
}

/// Turns facts into prose. Implementations may call out to a remote model.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, facts: &NarrationFacts) -> anyhow::Result<String>;
}

pub type SharedNarrator = Arc<dyn Narrator>;
