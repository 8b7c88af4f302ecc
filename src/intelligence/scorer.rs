use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ProfileSettings};
use crate::models::{Pool, RiskTolerance};

/// Yield attractiveness saturates at this multiple of the median APY.
const YIELD_CAP_MULTIPLE: i64 = 2;

/// Normalized sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub yield_score: Decimal,
    pub safety: Decimal,
    pub stability: Decimal,
    pub liquidity: Decimal,
}

/// A candidate pool with its composite score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPool {
    pub pool: Pool,
    pub score: Decimal,
    pub breakdown: ScoreBreakdown,
}

/// Hard gates: risk tier within tolerance and TVL at or above the profile floor.
pub fn is_eligible(pool: &Pool, tolerance: RiskTolerance, settings: &ProfileSettings) -> bool {
    tolerance.permits(pool.risk_level) && pool.tvl_usd >= settings.min_tvl_usd
}

/// Score one pool against a tolerance, relative to the candidate set's
/// median APY. Ineligible pools score 0.
pub fn score(pool: &Pool, tolerance: RiskTolerance, median_apy: Decimal, config: &EngineConfig) -> Decimal {
    let settings = config.profile(tolerance);
    if !is_eligible(pool, tolerance, settings) {
        return Decimal::ZERO;
    }
    composite(&breakdown(pool, median_apy), settings)
}

pub fn breakdown(pool: &Pool, median_apy: Decimal) -> ScoreBreakdown {
    let yield_score = if median_apy <= Decimal::ZERO {
        if pool.apy > Decimal::ZERO {
            Decimal::ONE
        } else {
            Decimal::ZERO
        }
    } else {
        let cap = Decimal::from(YIELD_CAP_MULTIPLE);
        (pool.apy / median_apy).clamp(Decimal::ZERO, cap) / cap
    };

    ScoreBreakdown {
        yield_score,
        safety: unit(Decimal::ONE - pool.risk_score / Decimal::ONE_HUNDRED),
        stability: unit(pool.apy_stability),
        liquidity: unit(Decimal::ONE - pool.liquidity_risk),
    }
}

fn composite(b: &ScoreBreakdown, settings: &ProfileSettings) -> Decimal {
    let w = &settings.weights;
    let total = b.yield_score * w.yield_weight
        + b.safety * w.safety
        + b.stability * w.stability
        + b.liquidity * w.liquidity;
    unit(total).round_dp(6)
}

fn unit(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

/// Median of a set of values; zero for an empty set.
pub fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    } else {
        sorted[mid]
    }
}

/// Filter `pools` through the hard gates, score the survivors and rank them
/// by score descending, ties broken by deeper TVL.
pub fn score_candidates(pools: &[Pool], tolerance: RiskTolerance, config: &EngineConfig) -> Vec<ScoredPool> {
    let settings = config.profile(tolerance);
    let eligible: Vec<&Pool> = pools
        .iter()
        .filter(|p| is_eligible(p, tolerance, settings))
        .collect();

    let apys: Vec<Decimal> = eligible.iter().map(|p| p.apy).collect();
    let median_apy = median(&apys);

    let mut scored: Vec<ScoredPool> = eligible
        .into_iter()
        .map(|pool| {
            let breakdown = breakdown(pool, median_apy);
            ScoredPool {
                score: composite(&breakdown, settings),
                breakdown,
                pool: pool.clone(),
            }
        })
        .collect();

    scored.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => b.pool.tvl_usd.cmp(&a.pool.tvl_usd),
        other => other,
    });

    tracing::debug!(
        tolerance = %tolerance,
        candidates = pools.len(),
        eligible = scored.len(),
        median_apy = %median_apy,
        "Scored candidate pools"
    );

    scored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
