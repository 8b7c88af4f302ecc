use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const RECOMMENDATIONS_TOTAL: &str = "recommendations_total";
pub const RECOMMENDATIONS_FAILED: &str = "recommendations_failed";
pub const RECOMMEND_LATENCY: &str = "recommend_latency_seconds";
pub const NARRATION_FALLBACKS: &str = "narration_fallbacks_total";
pub const REBALANCE_ALERTS_TOTAL: &str = "rebalance_alerts_total";
pub const SPREADS_FOUND_TOTAL: &str = "spreads_found_total";
pub const SNAPSHOTS_WRITTEN: &str = "snapshots_written";
pub const SNAPSHOTS_RECONCILED: &str = "snapshots_reconciled";
pub const TRADES_RECORDED: &str = "trades_recorded";
pub const TRACKED_TRADERS: &str = "tracked_traders";

/// Install the Prometheus exporter as the global recorder.
/// The returned handle renders the scrape payload for `/metrics`.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register so series appear before the first event.
    for name in [
        RECOMMENDATIONS_TOTAL,
        RECOMMENDATIONS_FAILED,
        NARRATION_FALLBACKS,
        REBALANCE_ALERTS_TOTAL,
        SPREADS_FOUND_TOTAL,
        SNAPSHOTS_WRITTEN,
        SNAPSHOTS_RECONCILED,
        TRADES_RECORDED,
    ] {
        counter!(name).absolute(0);
    }
    gauge!(TRACKED_TRADERS).set(0.0);
    histogram!(RECOMMEND_LATENCY).record(0.0);

    Ok(handle)
}
