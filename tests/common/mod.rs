use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;

use yield_curator::api::router::create_router;
use yield_curator::catalog::normalize::liquidity_risk;
use yield_curator::catalog::StaticPoolSource;
use yield_curator::config::EngineConfig;
use yield_curator::db::MemoryStore;
use yield_curator::engine::CurationEngine;
use yield_curator::models::{IlRisk, Pool, RiskLevel};
use yield_curator::AppState;

/// A single-asset pool whose risk score sits inside `risk_level`.
#[allow(dead_code)]
pub fn pool(id: &str, symbol: &str, chain: &str, apy: Decimal, tvl: i64, risk_level: RiskLevel) -> Pool {
    let tvl_usd = Decimal::from(tvl);
    let risk_score = match risk_level {
        RiskLevel::Low => Decimal::from(15),
        RiskLevel::Medium => Decimal::from(45),
        RiskLevel::High => Decimal::from(75),
    };
    Pool {
        id: id.into(),
        chain: chain.into(),
        project: format!("{id}-protocol"),
        symbol: symbol.into(),
        tvl_usd,
        apy,
        apy_base: apy,
        apy_reward: Decimal::ZERO,
        stablecoin: symbol.contains("USD") || symbol == "DAI",
        il_risk: IlRisk::None,
        risk_score,
        risk_level,
        liquidity_risk: liquidity_risk(tvl_usd),
        apy_stability: Decimal::new(85, 2),
        underlying_assets: BTreeSet::from([symbol.to_uppercase()]),
    }
}

/// Eight pools: six low-risk stablecoin pools, one medium, one high.
#[allow(dead_code)]
pub fn catalog() -> Vec<Pool> {
    vec![
        pool("aave-usdc", "USDC", "Ethereum", Decimal::new(45, 1), 900_000_000, RiskLevel::Low),
        pool("comp-usdc", "USDC", "Ethereum", Decimal::new(52, 1), 400_000_000, RiskLevel::Low),
        pool("morpho-usdt", "USDT", "Ethereum", Decimal::new(61, 1), 250_000_000, RiskLevel::Low),
        pool("spark-dai", "DAI", "Ethereum", Decimal::new(55, 1), 600_000_000, RiskLevel::Low),
        pool("arb-usdc", "USDC", "Arbitrum", Decimal::new(68, 1), 120_000_000, RiskLevel::Low),
        pool("base-usdc", "USDC", "Base", Decimal::new(39, 1), 80_000_000, RiskLevel::Low),
        pool("gmx-eth", "ETH", "Arbitrum", Decimal::new(143, 1), 60_000_000, RiskLevel::Medium),
        pool("degen-pepe", "PEPE", "Base", Decimal::from(85), 2_000_000, RiskLevel::High),
    ]
}

/// Engine over a swappable in-memory catalog and store.
#[allow(dead_code)]
pub fn build_engine(pools: Vec<Pool>, config: EngineConfig) -> (Arc<CurationEngine>, StaticPoolSource, MemoryStore) {
    let source = StaticPoolSource::new(pools);
    let store = MemoryStore::new();
    let engine = CurationEngine::new(Arc::new(source.clone()), Arc::new(store.clone()), config);
    (Arc::new(engine), source, store)
}

#[allow(dead_code)]
pub fn build_test_app(pools: Vec<Pool>) -> (axum::Router, StaticPoolSource) {
    let (engine, source, _store) = build_engine(pools, EngineConfig::default());
    // A local recorder handle; installing a global one twice would fail.
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState { engine, metrics_handle };
    (create_router(state), source)
}

#[allow(dead_code)]
pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub fn dec(v: &serde_json::Value) -> Decimal {
    match v {
        serde_json::Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}
