use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ApyDrop,
    RiskUpgrade,
    PoolInactive,
    TvlDrop,
    ApySpike,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ApyDrop => "apy_drop",
            AlertKind::RiskUpgrade => "risk_upgrade",
            AlertKind::PoolInactive => "pool_inactive",
            AlertKind::TvlDrop => "tvl_drop",
            AlertKind::ApySpike => "apy_spike",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Ordering follows urgency: `Low < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    Hold,
    Reduce,
    Exit,
    Increase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceAlert {
    pub pool_id: String,
    pub kind: AlertKind,
    pub severity: Severity,
    /// `None` when the value has no meaning for the alert kind (e.g. a vanished pool).
    pub previous_value: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub suggested_action: SuggestedAction,
    pub allocation_pct: Decimal,
    pub note: String,
}
