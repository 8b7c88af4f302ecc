use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Impermanent-loss exposure of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IlRisk {
    None,
    Low,
    Medium,
    High,
}

impl IlRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            IlRisk::None => "none",
            IlRisk::Low => "low",
            IlRisk::Medium => "medium",
            IlRisk::High => "high",
        }
    }
}

impl fmt::Display for IlRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived risk tier. Ordering follows riskiness: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Tier for a 0-100 risk score.
    pub fn from_score(score: Decimal) -> Self {
        if score < Decimal::from(35) {
            RiskLevel::Low
        } else if score < Decimal::from(65) {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized yield-bearing pool as seen at one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    pub tvl_usd: Decimal,
    /// Total APY in percent.
    pub apy: Decimal,
    pub apy_base: Decimal,
    pub apy_reward: Decimal,
    pub stablecoin: bool,
    pub il_risk: IlRisk,
    /// 0-100, lower is safer.
    pub risk_score: Decimal,
    pub risk_level: RiskLevel,
    /// 0-1, higher is riskier.
    pub liquidity_risk: Decimal,
    /// 0-1, higher means the APY has historically been steadier.
    pub apy_stability: Decimal,
    #[serde(default)]
    pub underlying_assets: BTreeSet<String>,
}

impl Pool {
    /// Grouping key used for same-asset comparisons.
    pub fn asset_key(&self) -> String {
        self.symbol.trim().to_uppercase()
    }

    /// Share of the APY paid out as incentive emissions (0-1).
    pub fn reward_share(&self) -> Decimal {
        if self.apy <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.apy_reward / self.apy).clamp(Decimal::ZERO, Decimal::ONE)
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} apy={}% tvl={} risk={}",
            self.chain, self.project, self.symbol, self.apy, self.tvl_usd, self.risk_level,
        )
    }
}

/// Filters accepted by every pool source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolFilter {
    pub chain: Option<String>,
    pub project: Option<String>,
    pub min_tvl: Option<Decimal>,
    #[serde(default)]
    pub stablecoin_only: bool,
}

impl PoolFilter {
    pub fn matches(&self, pool: &Pool) -> bool {
        if let Some(chain) = &self.chain {
            if !pool.chain.eq_ignore_ascii_case(chain) {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if !pool.project.eq_ignore_ascii_case(project) {
                return false;
            }
        }
        if let Some(min_tvl) = self.min_tvl {
            if pool.tvl_usd < min_tvl {
                return false;
            }
        }
        if self.stablecoin_only && !pool.stablecoin {
            return false;
        }
        true
    }
}
