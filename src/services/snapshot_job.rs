use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::time::{interval, Duration};

use crate::engine::CurationEngine;

/// Periodically snapshot every risk profile and every tracked trader.
/// Snapshots are idempotent per day, so running more often than daily only
/// retries rows that failed earlier.
pub async fn run_snapshot_job(engine: Arc<CurationEngine>, amount: Decimal, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;
        snapshot_tick(&engine, amount).await;
    }
}

/// One pass of the job. Returns `(profiles, traders)` snapshotted.
pub async fn snapshot_tick(engine: &CurationEngine, amount: Decimal) -> (usize, usize) {
    let profiles = engine.snapshot_profiles(amount).await.len();
    let traders = engine.snapshot_traders().await.len();
    tracing::debug!(profiles = profiles, traders = traders, "Snapshot job tick complete");
    (profiles, traders)
}
