use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Envelope returned by the yields `/pools` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Vec<RawPool>,
}

/// Pool record as published upstream, before normalization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPool {
    #[serde(default, alias = "pool")]
    pub id: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "tvlUsd")]
    pub tvl_usd: Option<Decimal>,
    #[serde(default)]
    pub apy: Option<Decimal>,
    #[serde(default, alias = "apyBase")]
    pub apy_base: Option<Decimal>,
    #[serde(default, alias = "apyReward")]
    pub apy_reward: Option<Decimal>,
    #[serde(default)]
    pub stablecoin: Option<bool>,
    /// "yes" / "no".
    #[serde(default, alias = "ilRisk")]
    pub il_risk: Option<String>,
    /// "single" / "multi".
    #[serde(default)]
    pub exposure: Option<String>,
    /// Historical APY volatility.
    #[serde(default)]
    pub sigma: Option<Decimal>,
    #[serde(default, alias = "underlyingTokens")]
    pub underlying_tokens: Option<Vec<String>>,
}
