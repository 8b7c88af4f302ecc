use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::models::RiskLevel;

/// Caller-selected risk profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    #[serde(alias = "balanced")]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub const ALL: [RiskTolerance; 3] = [
        RiskTolerance::Conservative,
        RiskTolerance::Moderate,
        RiskTolerance::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }

    /// Riskiest tier a pool may carry to be eligible under this profile.
    pub fn max_risk_level(&self) -> RiskLevel {
        match self {
            RiskTolerance::Conservative => RiskLevel::Low,
            RiskTolerance::Moderate => RiskLevel::Medium,
            RiskTolerance::Aggressive => RiskLevel::High,
        }
    }

    pub fn permits(&self, level: RiskLevel) -> bool {
        level <= self.max_risk_level()
    }
}

impl FromStr for RiskTolerance {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskTolerance::Conservative),
            "moderate" | "balanced" => Ok(RiskTolerance::Moderate),
            "aggressive" => Ok(RiskTolerance::Aggressive),
            other => Err(EngineError::Validation(format!(
                "unknown risk tolerance '{other}'"
            ))),
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balanced_alias() {
        assert_eq!("balanced".parse::<RiskTolerance>().unwrap(), RiskTolerance::Moderate);
        assert_eq!(" Aggressive ".parse::<RiskTolerance>().unwrap(), RiskTolerance::Aggressive);
    }

    #[test]
    fn test_parse_unknown_is_validation_error() {
        let err = "yolo".parse::<RiskTolerance>().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_permits_tiers() {
        assert!(RiskTolerance::Conservative.permits(RiskLevel::Low));
        assert!(!RiskTolerance::Conservative.permits(RiskLevel::Medium));
        assert!(RiskTolerance::Moderate.permits(RiskLevel::Medium));
        assert!(RiskTolerance::Aggressive.permits(RiskLevel::High));
    }
}
