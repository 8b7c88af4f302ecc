use std::sync::Arc;

use yield_curator::api::router::create_router;
use yield_curator::catalog::LlamaYieldsClient;
use yield_curator::config::AppConfig;
use yield_curator::db::{MemoryStore, PgStore, Store};
use yield_curator::engine::CurationEngine;
use yield_curator::metrics::init_metrics;
use yield_curator::models::RiskTolerance;
use yield_curator::services::{reconciler, snapshot_job};
use yield_curator::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = init_metrics()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PgStore::connect(url).await?;
            tracing::info!("Database connected, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; state will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let source = Arc::new(LlamaYieldsClient::new(config.pool_source_url.clone()));
    let engine = Arc::new(
        CurationEngine::new(source, store, config.engine.clone()).with_min_pool_tvl(config.min_pool_tvl),
    );
    engine.load().await?;

    if config.backfill_days > 0 {
        for tolerance in RiskTolerance::ALL {
            match engine
                .backfill_history(tolerance, config.backfill_days, config.snapshot_amount)
                .await
            {
                Ok(created) => tracing::info!(tolerance = %tolerance, created = created, "Backfill done"),
                Err(e) => tracing::warn!(tolerance = %tolerance, error = %e, "Backfill skipped"),
            }
        }
    }

    // --- Background jobs ---
    let snap_engine = engine.clone();
    let amount = config.snapshot_amount;
    let snapshot_secs = config.snapshot_interval_secs;
    tokio::spawn(async move {
        snapshot_job::run_snapshot_job(snap_engine, amount, snapshot_secs).await;
    });
    tracing::info!(interval_secs = snapshot_secs, "Snapshot job spawned");

    let rec_engine = engine.clone();
    let reconcile_secs = config.reconcile_interval_secs;
    tokio::spawn(async move {
        reconciler::run_reconciler(rec_engine, reconcile_secs).await;
    });
    tracing::info!(interval_secs = reconcile_secs, "Reconciler spawned");

    let state = AppState {
        engine: engine.clone(),
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.flush().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
