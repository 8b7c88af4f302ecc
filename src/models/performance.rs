use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pool weight carried by a snapshot so realized returns can be computed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAllocation {
    pub pool_id: String,
    pub allocation_pct: Decimal,
}

/// Metrics captured for a profile on a given day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub expected_apy: Option<Decimal>,
    pub portfolio_value: Decimal,
    pub total_cost: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub open_positions: i64,
    pub closed_positions: i64,
    pub win_count: i64,
    pub loss_count: i64,
    #[serde(default)]
    pub allocations: Vec<SnapshotAllocation>,
}

/// One row of a profile's daily history. A profile is either a risk
/// tolerance key (recommendation tracking) or a trader id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub profile_id: String,
    pub date: NaiveDate,
    pub expected_apy: Option<Decimal>,
    /// Filled in by reconciliation once the maturation window has passed.
    pub actual_apy: Option<Decimal>,
    pub portfolio_value: Decimal,
    pub total_cost: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub open_positions: i64,
    pub closed_positions: i64,
    pub win_count: i64,
    pub loss_count: i64,
    #[serde(default)]
    pub allocations: Vec<SnapshotAllocation>,
    #[serde(default)]
    pub synthetic: bool,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PerformanceSnapshot {
    pub fn new(profile_id: &str, date: NaiveDate, metrics: SnapshotMetrics) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            date,
            expected_apy: metrics.expected_apy,
            actual_apy: None,
            portfolio_value: metrics.portfolio_value,
            total_cost: metrics.total_cost,
            unrealized_pnl: metrics.unrealized_pnl,
            realized_pnl: metrics.realized_pnl,
            open_positions: metrics.open_positions,
            closed_positions: metrics.closed_positions,
            win_count: metrics.win_count,
            loss_count: metrics.loss_count,
            allocations: metrics.allocations,
            synthetic: false,
            reconciled_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciled_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub profile_id: String,
    pub window_days: i64,
    pub average_expected: Option<Decimal>,
    pub average_realized: Option<Decimal>,
    /// Mean absolute deviation between expected and realized APY.
    pub tracking_error: Option<Decimal>,
    pub sample_count: usize,
    pub reconciled_count: usize,
}
