pub mod alert;
pub mod performance;
pub mod pool;
pub mod recommendation;
pub mod risk;
pub mod spread;
pub mod trader;

pub use alert::{AlertKind, RebalanceAlert, Severity, SuggestedAction};
pub use performance::{PerformanceSnapshot, PerformanceSummary, SnapshotAllocation, SnapshotMetrics};
pub use pool::{IlRisk, Pool, PoolFilter, RiskLevel};
pub use recommendation::{Allocation, Recommendation, RecommendationSummary};
pub use risk::RiskTolerance;
pub use spread::{SpreadLeg, SpreadMetadata, SpreadOpportunity, SpreadQuery, SpreadReport, CROSS_CHAIN};
pub use trader::{trader_snapshot_id, LeaderboardEntry, SortBy, TraderStats, Trend};
