use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use rust_decimal::Decimal;

use crate::catalog::SharedPoolSource;
use crate::config::EngineConfig;
use crate::db::Store;
use crate::errors::EngineError;
use crate::intelligence::{self, NarrationFacts, SharedNarrator};
use crate::metrics::{
    NARRATION_FALLBACKS, REBALANCE_ALERTS_TOTAL, RECOMMENDATIONS_FAILED, RECOMMENDATIONS_TOTAL,
    RECOMMEND_LATENCY, SNAPSHOTS_RECONCILED, SNAPSHOTS_WRITTEN, SPREADS_FOUND_TOTAL, TRACKED_TRADERS,
    TRADES_RECORDED,
};
use crate::models::{
    trader_snapshot_id, LeaderboardEntry, PerformanceSnapshot, PerformanceSummary, PoolFilter, RebalanceAlert,
    Recommendation, RiskTolerance, SnapshotAllocation, SnapshotMetrics, SortBy, SpreadQuery, SpreadReport,
    TraderStats,
};
use crate::tracking::{Leaderboard, PerformanceTracker, ReconcileReport};

const DEFAULT_NARRATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Entry point used by request handlers and background jobs.
///
/// Recommendation, rebalance and spread calls are stateless and only read
/// the pool source. Snapshot history and trader stats are owned by the
/// tracker and leaderboard.
pub struct CurationEngine {
    source: SharedPoolSource,
    narrator: Option<SharedNarrator>,
    narration_timeout: Duration,
    tracker: PerformanceTracker,
    leaderboard: Leaderboard,
    store: Arc<dyn Store>,
    config: EngineConfig,
    min_pool_tvl: Decimal,
}

impl CurationEngine {
    pub fn new(source: SharedPoolSource, store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            source,
            narrator: None,
            narration_timeout: DEFAULT_NARRATION_TIMEOUT,
            tracker: PerformanceTracker::new(store.clone(), config.maturation_days, config.summary_window_days),
            leaderboard: Leaderboard::new(store.clone(), config.trend_streak),
            store,
            config,
            min_pool_tvl: Decimal::ZERO,
        }
    }

    pub fn with_narrator(mut self, narrator: SharedNarrator, timeout: Duration) -> Self {
        self.narrator = Some(narrator);
        self.narration_timeout = timeout;
        self
    }

    /// Catalog-wide TVL floor applied before any profile gates.
    pub fn with_min_pool_tvl(mut self, min_pool_tvl: Decimal) -> Self {
        self.min_pool_tvl = min_pool_tvl;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Hydrate snapshot history and trader stats from the store.
    pub async fn load(&self) -> Result<(), EngineError> {
        self.tracker.load().await?;
        let traders = self.leaderboard.load().await?;
        gauge!(TRACKED_TRADERS).set(traders as f64);
        Ok(())
    }

    // -- Recommendations ----------------------------------------------------

    pub async fn recommend(&self, amount: Decimal, tolerance: RiskTolerance) -> Result<Recommendation, EngineError> {
        let start = Instant::now();
        let result = self.build_recommendation(amount, tolerance).await;
        histogram!(RECOMMEND_LATENCY).record(start.elapsed().as_secs_f64());

        let mut rec = match result {
            Ok(rec) => rec,
            Err(e) => {
                counter!(RECOMMENDATIONS_FAILED, "tolerance" => tolerance.as_str()).increment(1);
                tracing::warn!(tolerance = %tolerance, amount = %amount, error = %e, "Recommendation failed");
                return Err(e);
            }
        };

        self.narrate(&mut rec).await;
        counter!(RECOMMENDATIONS_TOTAL, "tolerance" => tolerance.as_str()).increment(1);
        tracing::info!(
            tolerance = %tolerance,
            amount = %amount,
            pools = rec.allocations.len(),
            expected_apy = %rec.summary.expected_apy,
            "Recommendation served"
        );
        Ok(rec)
    }

    async fn build_recommendation(
        &self,
        amount: Decimal,
        tolerance: RiskTolerance,
    ) -> Result<Recommendation, EngineError> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation(format!("amount must be positive, got {amount}")));
        }
        let filter = PoolFilter {
            min_tvl: Some(self.min_pool_tvl),
            ..Default::default()
        };
        let pools = self.source.fetch_pools(&filter).await?;
        intelligence::recommend(amount, tolerance, &pools, &self.config)
    }

    /// Replace the template headline with narrated prose when a narrator
    /// answers in time. Any failure keeps the template.
    async fn narrate(&self, rec: &mut Recommendation) {
        let Some(narrator) = &self.narrator else {
            return;
        };
        let facts = NarrationFacts::from_recommendation(rec);

        match tokio::time::timeout(self.narration_timeout, narrator.narrate(&facts)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                if let Some(headline) = rec.insights.first_mut() {
                    *headline = text.trim().to_string();
                }
            }
            Ok(Ok(_)) => {
                counter!(NARRATION_FALLBACKS).increment(1);
                tracing::warn!("Narrator returned empty text, keeping template");
            }
            Ok(Err(e)) => {
                counter!(NARRATION_FALLBACKS).increment(1);
                tracing::warn!(error = %e, "Narrator failed, keeping template");
            }
            Err(_) => {
                counter!(NARRATION_FALLBACKS).increment(1);
                tracing::warn!(timeout = ?self.narration_timeout, "Narrator timed out, keeping template");
            }
        }
    }

    // -- Drift and spreads --------------------------------------------------

    pub async fn analyze_rebalance(
        &self,
        recommendation: &Recommendation,
        tolerance: RiskTolerance,
    ) -> Result<Vec<RebalanceAlert>, EngineError> {
        // No TVL floor here: a drained pool must show up as a TVL drop.
        let current = self.source.fetch_pools(&PoolFilter::default()).await?;
        let alerts = intelligence::analyze(recommendation, tolerance, &current, &self.config.rebalance);
        for alert in &alerts {
            counter!(REBALANCE_ALERTS_TOTAL, "severity" => alert.severity.to_string()).increment(1);
        }
        Ok(alerts)
    }

    /// Never fails: an upstream outage yields an empty report with `error` set.
    pub async fn detect_spreads(&self, query: &SpreadQuery) -> SpreadReport {
        let filter = PoolFilter {
            chain: query.chain.clone(),
            min_tvl: query.min_tvl,
            ..Default::default()
        };
        match self.source.fetch_pools(&filter).await {
            Ok(pools) => {
                let report = intelligence::detect_spreads(&pools, query, self.config.default_min_spread);
                counter!(SPREADS_FOUND_TOTAL).increment(report.metadata.spreads_found as u64);
                report
            }
            Err(e) => {
                tracing::warn!(error = %e, "Spread detection skipped: pool data unavailable");
                SpreadReport::unavailable(e.to_string())
            }
        }
    }

    // -- Performance --------------------------------------------------------

    pub async fn get_performance_summary(
        &self,
        profile_id: &str,
        window_days: Option<i64>,
    ) -> Result<PerformanceSummary, EngineError> {
        self.tracker
            .summarize(profile_id, window_days, Utc::now().date_naive())
            .await
    }

    pub async fn get_historical_performance(
        &self,
        profile_id: &str,
        days: i64,
    ) -> Result<Vec<PerformanceSnapshot>, EngineError> {
        if days <= 0 {
            return Err(EngineError::validation("days must be positive"));
        }
        Ok(self.tracker.history(profile_id, days, Utc::now().date_naive()).await)
    }

    /// Take today's snapshot for every risk profile. A profile that cannot be
    /// recommended right now is logged and skipped.
    pub async fn snapshot_profiles(&self, amount: Decimal) -> Vec<PerformanceSnapshot> {
        let mut taken = Vec::new();
        for tolerance in RiskTolerance::ALL {
            let rec = match self.build_recommendation(amount, tolerance).await {
                Ok(rec) => rec,
                Err(e) => {
                    tracing::warn!(tolerance = %tolerance, error = %e, "Skipping profile snapshot");
                    continue;
                }
            };
            match self
                .tracker
                .snapshot_today(tolerance.as_str(), metrics_from_recommendation(&rec))
                .await
            {
                Ok(snap) => {
                    counter!(SNAPSHOTS_WRITTEN).increment(1);
                    taken.push(snap);
                }
                Err(e) => {
                    tracing::error!(tolerance = %tolerance, error = %e, "Failed to record profile snapshot");
                }
            }
        }
        taken
    }

    /// Record today's snapshot of a trader's running stats. Trader history is
    /// kept under `trader:{id}` so it never collides with a risk profile.
    pub async fn snapshot_trader(&self, trader_id: &str) -> Result<Option<PerformanceSnapshot>, EngineError> {
        let Some(stats) = self.leaderboard.stats(trader_id).await else {
            return Ok(None);
        };
        let snap = self
            .tracker
            .snapshot_today(&trader_snapshot_id(trader_id), metrics_from_trader(&stats))
            .await?;
        counter!(SNAPSHOTS_WRITTEN).increment(1);
        Ok(Some(snap))
    }

    /// Take today's snapshot for every tracked trader. A failure for one
    /// trader is logged and does not stop the rest.
    pub async fn snapshot_traders(&self) -> Vec<PerformanceSnapshot> {
        let mut taken = Vec::new();
        for trader_id in self.leaderboard.trader_ids().await {
            match self.snapshot_trader(&trader_id).await {
                Ok(Some(snap)) => taken.push(snap),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(trader_id = %trader_id, error = %e, "Failed to record trader snapshot");
                }
            }
        }
        taken
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let pools = self.source.fetch_pools(&PoolFilter::default()).await?;
        let report = self.tracker.reconcile(&pools, Utc::now().date_naive()).await;
        counter!(SNAPSHOTS_RECONCILED).increment(report.reconciled as u64);
        Ok(report)
    }

    /// Seed `days` of synthetic history for a profile from a fresh recommendation.
    pub async fn backfill_history(
        &self,
        tolerance: RiskTolerance,
        days: i64,
        amount: Decimal,
    ) -> Result<usize, EngineError> {
        let rec = self.build_recommendation(amount, tolerance).await?;
        self.tracker
            .backfill(
                tolerance.as_str(),
                days,
                &metrics_from_recommendation(&rec),
                Utc::now().date_naive(),
            )
            .await
    }

    // -- Leaderboard --------------------------------------------------------

    pub async fn record_trade(&self, trader_id: &str, pnl: Decimal) -> Result<TraderStats, EngineError> {
        let stats = self.leaderboard.record_trade(trader_id, pnl).await?;
        counter!(TRADES_RECORDED).increment(1);
        gauge!(TRACKED_TRADERS).set(self.leaderboard.tracked_count().await as f64);
        Ok(stats)
    }

    pub async fn set_display_name(&self, trader_id: &str, name: &str) -> Result<TraderStats, EngineError> {
        self.leaderboard.set_display_name(trader_id, name).await
    }

    pub async fn get_leaderboard(&self, sort_by: SortBy, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        self.leaderboard.rank(sort_by, limit).await
    }

    pub async fn get_trader_percentile(&self, trader_id: &str) -> Option<Decimal> {
        self.leaderboard.percentile(trader_id).await
    }

    pub async fn trader_stats(&self, trader_id: &str) -> Option<TraderStats> {
        self.leaderboard.stats(trader_id).await
    }

    /// Persist all in-memory state. Called on shutdown.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let snapshots = self.tracker.flush().await?;
        let traders = self.leaderboard.flush().await?;
        tracing::info!(snapshots = snapshots, traders = traders, "Engine state flushed");
        Ok(())
    }
}

fn metrics_from_recommendation(rec: &Recommendation) -> SnapshotMetrics {
    SnapshotMetrics {
        expected_apy: Some(rec.summary.expected_apy),
        portfolio_value: rec.summary.total_amount,
        total_cost: rec.summary.total_amount,
        unrealized_pnl: rec.summary.expected_yield,
        open_positions: rec.allocations.len() as i64,
        allocations: rec
            .allocations
            .iter()
            .map(|a| SnapshotAllocation {
                pool_id: a.pool_id().to_string(),
                allocation_pct: a.allocation_pct,
            })
            .collect(),
        ..Default::default()
    }
}

fn metrics_from_trader(stats: &TraderStats) -> SnapshotMetrics {
    SnapshotMetrics {
        realized_pnl: stats.total_pnl,
        closed_positions: stats.total_trades,
        win_count: stats.win_count,
        loss_count: stats.loss_count,
        ..Default::default()
    }
}
