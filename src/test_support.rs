//! Shared fixtures for unit tests.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::catalog::normalize::liquidity_risk;
use crate::models::{IlRisk, Pool, RiskLevel};

/// A single-asset pool on Ethereum whose risk score sits inside `risk_level`.
pub fn make_pool(id: &str, symbol: &str, apy: i64, tvl: i64, risk_level: RiskLevel) -> Pool {
    let tvl_usd = Decimal::from(tvl);
    let risk_score = match risk_level {
        RiskLevel::Low => Decimal::from(20),
        RiskLevel::Medium => Decimal::from(50),
        RiskLevel::High => Decimal::from(80),
    };
    Pool {
        id: id.to_string(),
        chain: "Ethereum".into(),
        project: format!("proj-{id}"),
        symbol: symbol.to_string(),
        tvl_usd,
        apy: Decimal::from(apy),
        apy_base: Decimal::from(apy),
        apy_reward: Decimal::ZERO,
        stablecoin: symbol.to_uppercase().contains("USD"),
        il_risk: IlRisk::None,
        risk_score,
        risk_level,
        liquidity_risk: liquidity_risk(tvl_usd),
        apy_stability: Decimal::new(9, 1),
        underlying_assets: BTreeSet::from([symbol.to_uppercase()]),
    }
}

/// `count` low-risk stablecoin pools with APYs 3, 4, 5, ... and deep TVL.
pub fn make_catalog(count: usize) -> Vec<Pool> {
    (0..count)
        .map(|i| {
            make_pool(
                &format!("pool-{i}"),
                "USDC",
                3 + i as i64,
                200_000_000 + (i as i64) * 10_000_000,
                RiskLevel::Low,
            )
        })
        .collect()
}
