use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Chain label used when the two legs of a spread live on different chains.
pub const CROSS_CHAIN: &str = "cross_chain";

/// Summary of one leg of a spread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadLeg {
    pub pool_id: String,
    pub chain: String,
    pub project: String,
    pub apy: Decimal,
    pub tvl_usd: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadOpportunity {
    pub asset: String,
    pub chain: String,
    /// Higher-yielding leg.
    pub pool_a: SpreadLeg,
    pub pool_b: SpreadLeg,
    /// `pool_a.apy - pool_b.apy`, in percentage points.
    pub apy_spread: Decimal,
    /// 0-1.
    pub quality_score: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpreadQuery {
    pub chain: Option<String>,
    pub asset: Option<String>,
    /// Minimum absolute spread in percentage points (default 1.0).
    pub min_spread: Option<Decimal>,
    pub min_tvl: Option<Decimal>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpreadMetadata {
    pub assets_analyzed: usize,
    pub pools_compared: usize,
    pub spreads_found: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpreadReport {
    pub spreads: Vec<SpreadOpportunity>,
    pub top_opportunities: Vec<SpreadOpportunity>,
    pub metadata: SpreadMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpreadReport {
    /// Empty report carrying the reason spread detection could not run.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
