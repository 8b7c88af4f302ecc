use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::engine::CurationEngine;

/// Periodically fill realized returns for matured snapshots.
pub async fn run_reconciler(engine: Arc<CurationEngine>, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        ticker.tick().await;

        match engine.reconcile().await {
            Ok(report) if report.failed > 0 => {
                tracing::warn!(failed = report.failed, "Reconciler: some snapshots will be retried");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Reconciler: pool data unavailable, skipping pass");
            }
        }
    }
}
