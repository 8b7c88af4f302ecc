use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Prefix that keeps trader snapshot history apart from risk-profile history.
pub const TRADER_SNAPSHOT_PREFIX: &str = "trader:";

/// Snapshot history id for a trader, e.g. `trader:alice`.
pub fn trader_snapshot_id(trader_id: &str) -> String {
    format!("{TRADER_SNAPSHOT_PREFIX}{trader_id}")
}

/// Running totals for a single trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderStats {
    pub trader_id: String,
    pub display_name: String,
    pub total_pnl: Decimal,
    pub total_trades: i64,
    pub win_count: i64,
    pub loss_count: i64,
    /// Positive for a win streak, negative for a loss streak.
    pub current_streak: i64,
    pub updated_at: DateTime<Utc>,
}

impl TraderStats {
    pub fn new(trader_id: &str) -> Self {
        Self {
            trader_id: trader_id.to_string(),
            display_name: trader_id.to_string(),
            total_pnl: Decimal::ZERO,
            total_trades: 0,
            win_count: 0,
            loss_count: 0,
            current_streak: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.win_count) / Decimal::from(self.total_trades)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Pnl,
    WinRate,
    Trades,
    Streak,
}

impl FromStr for SortBy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pnl" => Ok(SortBy::Pnl),
            "win_rate" | "winrate" => Ok(SortBy::WinRate),
            "trades" => Ok(SortBy::Trades),
            "streak" => Ok(SortBy::Streak),
            other => Err(EngineError::Validation(format!("unknown sort key '{other}'"))),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Pnl => write!(f, "pnl"),
            SortBy::WinRate => write!(f, "win_rate"),
            SortBy::Trades => write!(f, "trades"),
            SortBy::Streak => write!(f, "streak"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub trader_id: String,
    pub display_name: String,
    pub total_pnl: Decimal,
    pub win_rate: Decimal,
    pub total_trades: i64,
    pub streak: i64,
    pub trend: Trend,
}
