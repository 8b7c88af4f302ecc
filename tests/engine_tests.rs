mod common;

use rust_decimal::Decimal;

use yield_curator::config::EngineConfig;
use yield_curator::errors::EngineError;
use yield_curator::models::{AlertKind, Pool, RiskLevel, RiskTolerance, Severity, SortBy, SpreadQuery};

fn amount() -> Decimal {
    Decimal::from(25_000)
}

#[tokio::test]
async fn test_allocations_sum_to_one_hundred_for_every_profile() {
    let (engine, _, _) = common::build_engine(common::catalog(), EngineConfig::default());

    for tolerance in RiskTolerance::ALL {
        let rec = engine.recommend(amount(), tolerance).await.unwrap();
        assert_eq!(rec.total_allocation_pct(), Decimal::ONE_HUNDRED, "{tolerance}");

        let cap = engine.config().profile(tolerance).max_allocation_pct;
        assert!(rec.allocations.iter().all(|a| a.allocation_pct <= cap), "{tolerance}");
        assert!(rec.allocations.len() >= engine.config().min_pools);
        assert!(rec.allocations.iter().all(|a| tolerance.permits(a.risk_level)));
    }
}

#[tokio::test]
async fn test_conservative_excludes_risky_pools() {
    let (engine, _, _) = common::build_engine(common::catalog(), EngineConfig::default());
    let rec = engine.recommend(amount(), RiskTolerance::Conservative).await.unwrap();
    assert!(rec
        .allocations
        .iter()
        .all(|a| a.pool_id() != "gmx-eth" && a.pool_id() != "degen-pepe"));
    assert_eq!(rec.summary.overall_risk, RiskLevel::Low);
}

#[tokio::test]
async fn test_too_few_candidates_is_reported() {
    let pools: Vec<Pool> = common::catalog().into_iter().skip(5).collect();
    let (engine, _, _) = common::build_engine(pools, EngineConfig::default());

    match engine.recommend(amount(), RiskTolerance::Conservative).await {
        Err(EngineError::InsufficientCandidates { found, required }) => {
            assert_eq!(found, 1);
            assert_eq!(required, 3);
        }
        other => panic!("expected InsufficientCandidates, got {other:?}"),
    }
}

#[tokio::test]
async fn test_diversification_drops_with_fewer_pools() {
    let mut narrow = EngineConfig::default();
    narrow.profile_mut(RiskTolerance::Moderate).max_pools = 3;

    let (wide_engine, _, _) = common::build_engine(common::catalog(), EngineConfig::default());
    let (narrow_engine, _, _) = common::build_engine(common::catalog(), narrow);

    let wide = wide_engine.recommend(amount(), RiskTolerance::Moderate).await.unwrap();
    let narrow = narrow_engine.recommend(amount(), RiskTolerance::Moderate).await.unwrap();

    assert!(wide.allocations.len() > narrow.allocations.len());
    assert!(narrow.summary.diversification_score <= wide.summary.diversification_score);
}

#[tokio::test]
async fn test_rebalance_after_catalog_drift() {
    let (engine, source, _) = common::build_engine(common::catalog(), EngineConfig::default());
    let rec = engine.recommend(amount(), RiskTolerance::Moderate).await.unwrap();
    assert!(engine
        .analyze_rebalance(&rec, RiskTolerance::Moderate)
        .await
        .unwrap()
        .is_empty());

    let target = rec.allocations[0].pool_id().to_string();
    let dropped = rec.allocations[1].pool_id().to_string();
    let drifted: Vec<Pool> = common::catalog()
        .into_iter()
        .filter(|p| p.id != dropped)
        .map(|mut p| {
            if p.id == target {
                p.apy = p.apy * Decimal::new(6, 1);
            }
            p
        })
        .collect();
    source.replace(drifted).await;

    let alerts = engine.analyze_rebalance(&rec, RiskTolerance::Moderate).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, AlertKind::PoolInactive);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert_eq!(alerts[0].pool_id, dropped);
    assert_eq!(alerts[1].kind, AlertKind::ApyDrop);
    assert_eq!(alerts[1].severity, Severity::High);
    assert_eq!(alerts[1].pool_id, target);
}

#[tokio::test]
async fn test_rebalance_fails_when_source_is_down() {
    let (engine, source, _) = common::build_engine(common::catalog(), EngineConfig::default());
    let rec = engine.recommend(amount(), RiskTolerance::Moderate).await.unwrap();
    source.set_outage(Some("gateway timeout".into())).await;

    let err = engine
        .analyze_rebalance(&rec, RiskTolerance::Moderate)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DataUnavailable(_)));
}

#[tokio::test]
async fn test_spread_detection_end_to_end() {
    let pools = vec![
        common::pool("u1", "USDC", "Ethereum", Decimal::from(4), 50_000_000, RiskLevel::Low),
        common::pool("u2", "USDC", "Ethereum", Decimal::from(7), 50_000_000, RiskLevel::Low),
        common::pool("u3", "USDC", "Ethereum", Decimal::new(42, 1), 50_000_000, RiskLevel::Low),
    ];
    let (engine, _, _) = common::build_engine(pools, EngineConfig::default());

    let report = engine
        .detect_spreads(&SpreadQuery {
            min_spread: Some(Decimal::ONE),
            ..Default::default()
        })
        .await;

    assert!(report.error.is_none());
    assert_eq!(report.metadata.spreads_found, 1);
    assert_eq!(report.spreads[0].apy_spread, Decimal::from(3));
    assert_eq!(report.spreads[0].pool_a.pool_id, "u2");
    assert_eq!(report.spreads[0].pool_b.pool_id, "u1");
}

#[tokio::test]
async fn test_backfill_then_reconcile() {
    let (engine, _, _) = common::build_engine(common::catalog(), EngineConfig::default());

    let created = engine
        .backfill_history(RiskTolerance::Moderate, 10, amount())
        .await
        .unwrap();
    assert_eq!(created, 10);

    // Rows 7 to 10 days old have matured; the rest wait.
    let report = engine.reconcile().await.unwrap();
    assert_eq!(report.reconciled, 4);
    assert_eq!(report.pending, 6);

    let summary = engine.get_performance_summary("moderate", None).await.unwrap();
    assert_eq!(summary.sample_count, 10);
    assert_eq!(summary.reconciled_count, 4);
    // Unchanged catalog: realized matches expected exactly.
    assert_eq!(summary.tracking_error, Some(Decimal::ZERO));

    let again = engine.reconcile().await.unwrap();
    assert_eq!(again.reconciled, 0);

    let history = engine.get_historical_performance("moderate", 5).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|s| s.synthetic));
}

#[tokio::test]
async fn test_snapshot_profiles_is_idempotent() {
    let (engine, source, store) = common::build_engine(common::catalog(), EngineConfig::default());
    let first = engine.snapshot_profiles(amount()).await;
    assert_eq!(first.len(), 3);

    // A different catalog later the same day does not overwrite.
    source.replace(common::catalog().into_iter().rev().collect()).await;
    let second = engine.snapshot_profiles(amount()).await;
    assert_eq!(first, second);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_leaderboard_properties() {
    let (engine, _, _) = common::build_engine(Vec::new(), EngineConfig::default());

    for pnl in [5, 5, -3, 2] {
        engine.record_trade("alice", Decimal::from(pnl)).await.unwrap();
    }
    let alice = engine.trader_stats("alice").await.unwrap();
    assert_eq!(alice.current_streak, 1);
    assert_eq!(alice.win_count, 3);
    assert_eq!(alice.total_trades, 4);

    engine.record_trade("bob", Decimal::from(3)).await.unwrap();
    engine.record_trade("carol", Decimal::from(-7)).await.unwrap();
    engine.record_trade("dave", Decimal::from(1)).await.unwrap();
    engine.record_trade("erin", Decimal::ZERO).await.unwrap();

    // Five traders; alice leads on PnL.
    let n = Decimal::from(5);
    assert_eq!(
        engine.get_trader_percentile("alice").await,
        Some(Decimal::ONE_HUNDRED * (n - Decimal::ONE) / n)
    );

    let board = engine.get_leaderboard(SortBy::Pnl, Some(2)).await;
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].trader_id, "alice");
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].trader_id, "bob");
}

#[tokio::test]
async fn test_state_survives_engine_restart() {
    let (engine, _, store) = common::build_engine(common::catalog(), EngineConfig::default());
    engine.record_trade("alice", Decimal::from(4)).await.unwrap();
    engine.snapshot_profiles(amount()).await;
    engine.flush().await.unwrap();

    let restarted = yield_curator::engine::CurationEngine::new(
        std::sync::Arc::new(yield_curator::catalog::StaticPoolSource::new(common::catalog())),
        std::sync::Arc::new(store),
        EngineConfig::default(),
    );
    restarted.load().await.unwrap();

    assert_eq!(
        restarted.trader_stats("alice").await.map(|s| s.total_pnl),
        Some(Decimal::from(4))
    );
    let summary = restarted.get_performance_summary("aggressive", None).await.unwrap();
    assert_eq!(summary.sample_count, 1);
}
