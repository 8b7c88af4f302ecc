use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;

use super::narrator::NarrationFacts;
use super::scorer::{score_candidates, ScoredPool};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::models::{Allocation, Pool, Recommendation, RecommendationSummary, RiskLevel, RiskTolerance};

/// Build a risk-tiered allocation of `amount` across `candidates`.
///
/// Fails with `Validation` for a non-positive amount and with
/// `InsufficientCandidates` when fewer than `config.min_pools` pools pass the
/// tolerance's gates.
pub fn recommend(
    amount: Decimal,
    tolerance: RiskTolerance,
    candidates: &[Pool],
    config: &EngineConfig,
) -> Result<Recommendation, EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }

    let scored = score_candidates(candidates, tolerance, config);
    if scored.len() < config.min_pools {
        return Err(EngineError::InsufficientCandidates {
            found: scored.len(),
            required: config.min_pools,
        });
    }

    let settings = config.profile(tolerance);
    let take = settings.max_pools.max(config.min_pools).min(scored.len());
    let selected: Vec<ScoredPool> = scored.into_iter().take(take).collect();

    let cap = effective_cap(settings.max_allocation_pct, selected.len());
    let scores: Vec<Decimal> = selected.iter().map(|s| s.score).collect();
    let pcts = water_fill(&scores, settings.max_allocation_pct, config.min_allocation_pct);

    let apys: Vec<Decimal> = selected.iter().map(|s| s.pool.apy).collect();
    let median_apy = super::scorer::median(&apys);

    let allocations: Vec<Allocation> = selected
        .iter()
        .zip(pcts.iter())
        .map(|(s, pct)| build_allocation(s, *pct, cap, median_apy))
        .collect();

    let expected_apy: Decimal = allocations
        .iter()
        .map(|a| a.allocation_pct / Decimal::ONE_HUNDRED * a.apy)
        .sum::<Decimal>()
        .round_dp(4);
    let expected_yield = (amount * expected_apy / Decimal::ONE_HUNDRED).round_dp(2);
    let diversification_score = diversification(&pcts);
    let overall_risk = weighted_majority_tier(&allocations);

    let summary = RecommendationSummary {
        total_amount: amount,
        expected_apy,
        expected_yield,
        overall_risk,
        diversification_score,
    };

    let warnings = build_warnings(&allocations, &summary, cap, settings.max_allocation_pct, config);

    let mut rec = Recommendation {
        risk_tolerance: tolerance,
        allocations,
        summary,
        insights: Vec::new(),
        warnings,
        generated_at: Utc::now(),
    };
    rec.insights = build_insights(&rec);

    tracing::debug!(
        tolerance = %tolerance,
        pools = rec.allocations.len(),
        expected_apy = %rec.summary.expected_apy,
        diversification = %rec.summary.diversification_score,
        warnings = rec.warnings.len(),
        "Recommendation built"
    );

    Ok(rec)
}

/// The configured cap, relaxed to an even split when `n` pools cannot absorb
/// 100% under it.
pub fn effective_cap(cap: Decimal, n: usize) -> Decimal {
    if n == 0 {
        return cap;
    }
    cap.max(Decimal::ONE_HUNDRED / Decimal::from(n as i64))
}

/// Split 100% proportionally to `weights`, clipping each share into
/// `[floor, cap]` and redistributing the excess among unclipped entries until
/// stable. Output is rounded to 2dp and sums to exactly 100.
pub fn water_fill(weights: &[Decimal], cap: Decimal, floor: Decimal) -> Vec<Decimal> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let even = Decimal::ONE_HUNDRED / Decimal::from(n as i64);
    let cap = cap.max(even);
    let floor = floor.min(even).max(Decimal::ZERO);

    let weights: Vec<Decimal> = if weights.iter().all(|w| *w <= Decimal::ZERO) {
        vec![Decimal::ONE; n]
    } else {
        weights.iter().map(|w| (*w).max(Decimal::ZERO)).collect()
    };

    let mut fixed: Vec<Option<Decimal>> = vec![None; n];
    loop {
        let free: Vec<usize> = (0..n).filter(|&i| fixed[i].is_none()).collect();
        if free.is_empty() {
            break;
        }

        let fixed_total: Decimal = fixed.iter().flatten().copied().sum();
        let remaining = (Decimal::ONE_HUNDRED - fixed_total).max(Decimal::ZERO);
        let free_weight: Decimal = free.iter().map(|&i| weights[i]).sum();
        let share = |i: usize| {
            if free_weight > Decimal::ZERO {
                remaining * weights[i] / free_weight
            } else {
                remaining / Decimal::from(free.len() as i64)
            }
        };

        let over: Vec<usize> = free.iter().copied().filter(|&i| share(i) > cap).collect();
        if !over.is_empty() {
            for i in over {
                fixed[i] = Some(cap);
            }
            continue;
        }

        let under: Vec<usize> = free.iter().copied().filter(|&i| share(i) < floor).collect();
        if !under.is_empty() {
            for i in under {
                fixed[i] = Some(floor);
            }
            continue;
        }

        for &i in &free {
            fixed[i] = Some(share(i));
        }
        break;
    }

    let mut pcts: Vec<Decimal> = fixed
        .into_iter()
        .map(|v| v.unwrap_or(Decimal::ZERO).round_dp(2))
        .collect();

    // Push the rounding residual onto the entry with the most room to absorb it.
    let residual = Decimal::ONE_HUNDRED - pcts.iter().copied().sum::<Decimal>();
    if !residual.is_zero() {
        let target = if residual > Decimal::ZERO {
            (0..n).max_by(|&a, &b| (cap - pcts[a]).cmp(&(cap - pcts[b])))
        } else {
            (0..n).max_by(|&a, &b| pcts[a].cmp(&pcts[b]))
        };
        if let Some(i) = target {
            pcts[i] += residual;
        }
    }

    pcts
}

/// `1 - HHI` over allocation fractions.
pub fn diversification(pcts: &[Decimal]) -> Decimal {
    let hhi: Decimal = pcts
        .iter()
        .map(|p| {
            let f = *p / Decimal::ONE_HUNDRED;
            f * f
        })
        .sum();
    (Decimal::ONE - hhi).clamp(Decimal::ZERO, Decimal::ONE).round_dp(4)
}

/// Tier carrying the most allocated weight; ties resolve to the riskier tier.
fn weighted_majority_tier(allocations: &[Allocation]) -> RiskLevel {
    let mut by_tier: BTreeMap<RiskLevel, Decimal> = BTreeMap::new();
    for a in allocations {
        *by_tier.entry(a.risk_level).or_insert(Decimal::ZERO) += a.allocation_pct;
    }

    let mut best = RiskLevel::Low;
    let mut best_weight = Decimal::MIN;
    for (tier, weight) in by_tier {
        if weight >= best_weight {
            best = tier;
            best_weight = weight;
        }
    }
    best
}

fn build_allocation(scored: &ScoredPool, pct: Decimal, cap: Decimal, median_apy: Decimal) -> Allocation {
    let pool = &scored.pool;
    let b = &scored.breakdown;

    let mut principle_ids = vec![
        "risk-tier-within-tolerance".to_string(),
        "tvl-above-floor".to_string(),
    ];
    if pool.apy >= median_apy {
        principle_ids.push("yield-above-median".into());
    }
    if b.stability >= Decimal::new(7, 1) {
        principle_ids.push("stable-yield".into());
    }
    if pool.liquidity_risk <= Decimal::new(25, 2) {
        principle_ids.push("deep-liquidity".into());
    }
    if pool.stablecoin {
        principle_ids.push("stablecoin-principal".into());
    }
    if pct >= cap {
        principle_ids.push("position-capped".into());
    }

    let reasoning = format!(
        "{} {} on {}: score {} (yield {}, safety {}, stability {}, liquidity {}), {}% APY, {} risk",
        pool.project,
        pool.symbol,
        pool.chain,
        scored.score.round_dp(3),
        b.yield_score.round_dp(2),
        b.safety.round_dp(2),
        b.stability.round_dp(2),
        b.liquidity.round_dp(2),
        pool.apy.round_dp(2),
        pool.risk_level,
    );

    Allocation {
        pool: pool.clone(),
        asset: pool.symbol.clone(),
        allocation_pct: pct,
        apy: pool.apy,
        risk_level: pool.risk_level,
        reasoning,
        principle_ids,
    }
}

fn build_warnings(
    allocations: &[Allocation],
    summary: &RecommendationSummary,
    cap: Decimal,
    configured_cap: Decimal,
    config: &EngineConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if cap > configured_cap {
        warnings.push(format!(
            "Only {} eligible pools: per-pool cap relaxed from {}% to {}%",
            allocations.len(),
            configured_cap,
            cap.round_dp(2),
        ));
    }

    for a in allocations {
        if a.allocation_pct >= cap {
            warnings.push(format!(
                "Concentration: {} {} holds {}% of capital, at the {}% per-pool cap",
                a.pool.project,
                a.pool.symbol,
                a.allocation_pct,
                cap.round_dp(2),
            ));
        }
    }

    for a in allocations {
        if a.pool.apy_stability < config.low_stability_threshold {
            warnings.push(format!(
                "{} {} has low APY stability ({}); yield may be emissions-driven rather than organic",
                a.pool.project,
                a.pool.symbol,
                a.pool.apy_stability.round_dp(2),
            ));
        }
    }

    if summary.diversification_score < config.min_diversification {
        warnings.push(format!(
            "Diversification score {} is below the {} minimum",
            summary.diversification_score, config.min_diversification,
        ));
    }

    warnings
}

fn build_insights(rec: &Recommendation) -> Vec<String> {
    let facts = NarrationFacts::from_recommendation(rec);
    let mut insights = vec![facts.template()];

    if facts.stablecoin_pct > Decimal::ZERO {
        insights.push(format!(
            "{}% of capital sits in stablecoin pools",
            facts.stablecoin_pct
        ));
    }

    if facts.chains.len() > 1 {
        insights.push(format!(
            "Exposure spans {} chains: {}",
            facts.chains.len(),
            facts.chains.join(", ")
        ));
    } else if let Some(chain) = facts.chains.first() {
        insights.push(format!("All positions are on {chain}"));
    }

    let reward_heavy = rec
        .allocations
        .iter()
        .filter(|a| a.pool.reward_share() > Decimal::new(5, 1))
        .count();
    if reward_heavy > 0 {
        insights.push(format!(
            "{reward_heavy} selected pools earn most of their APY from reward emissions"
        ));
    }

    insights
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
