use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;

use crate::catalog::normalize::liquidity_risk;
use crate::models::{Pool, SpreadLeg, SpreadMetadata, SpreadOpportunity, SpreadQuery, SpreadReport, CROSS_CHAIN};

/// Find same-asset APY spreads between pairs of eligible pools.
///
/// Every pair is evaluated against the minimum spread, then pairs are taken
/// widest first and each pool backs at most one reported opportunity. A
/// qualifying pair that shares a pool with a wider one is suppressed, so
/// APYs of 4, 7 and 4.2 report only 7 vs 4.
pub fn detect_spreads(pools: &[Pool], query: &SpreadQuery, default_min_spread: Decimal) -> SpreadReport {
    let min_spread = query.min_spread.unwrap_or(default_min_spread).abs();
    let asset_filter = query.asset.as_ref().map(|a| a.trim().to_uppercase());

    let eligible: Vec<&Pool> = pools
        .iter()
        .filter(|p| p.apy > Decimal::ZERO)
        .filter(|p| {
            query
                .chain
                .as_ref()
                .map(|c| p.chain.eq_ignore_ascii_case(c))
                .unwrap_or(true)
        })
        .filter(|p| query.min_tvl.map(|min| p.tvl_usd >= min).unwrap_or(true))
        .filter(|p| asset_filter.as_ref().map(|a| &p.asset_key() == a).unwrap_or(true))
        .collect();

    let mut groups: BTreeMap<String, Vec<&Pool>> = BTreeMap::new();
    for pool in &eligible {
        groups.entry(pool.asset_key()).or_default().push(pool);
    }

    let mut candidates = Vec::new();
    for (asset, group) in &groups {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                let (high, low) = if a.apy >= b.apy { (a, b) } else { (b, a) };
                let spread = high.apy - low.apy;
                if spread.abs() < min_spread {
                    continue;
                }
                candidates.push(SpreadOpportunity {
                    asset: asset.clone(),
                    chain: if high.chain.eq_ignore_ascii_case(&low.chain) {
                        high.chain.clone()
                    } else {
                        CROSS_CHAIN.to_string()
                    },
                    pool_a: leg(high),
                    pool_b: leg(low),
                    apy_spread: spread,
                    quality_score: quality(high, low),
                });
            }
        }
    }

    candidates.sort_by(|x, y| {
        y.apy_spread
            .abs()
            .cmp(&x.apy_spread.abs())
            .then_with(|| y.quality_score.cmp(&x.quality_score))
            .then_with(|| x.pool_a.pool_id.cmp(&y.pool_a.pool_id))
            .then_with(|| x.pool_b.pool_id.cmp(&y.pool_b.pool_id))
    });

    // A pool backs at most one opportunity; the widest spread claims it first.
    let mut claimed: HashSet<String> = HashSet::new();
    let spreads: Vec<SpreadOpportunity> = candidates
        .into_iter()
        .filter(|s| {
            if claimed.contains(&s.pool_a.pool_id) || claimed.contains(&s.pool_b.pool_id) {
                return false;
            }
            claimed.insert(s.pool_a.pool_id.clone());
            claimed.insert(s.pool_b.pool_id.clone());
            true
        })
        .collect();

    let top_opportunities = match query.limit {
        Some(limit) => spreads.iter().take(limit).cloned().collect(),
        None => spreads.clone(),
    };

    let metadata = SpreadMetadata {
        assets_analyzed: groups.len(),
        pools_compared: eligible.len(),
        spreads_found: spreads.len(),
    };

    tracing::debug!(
        assets = metadata.assets_analyzed,
        pools = metadata.pools_compared,
        spreads = metadata.spreads_found,
        "Spread detection complete"
    );

    SpreadReport {
        spreads,
        top_opportunities,
        metadata,
        error: None,
    }
}

fn leg(pool: &Pool) -> SpreadLeg {
    SpreadLeg {
        pool_id: pool.id.clone(),
        chain: pool.chain.clone(),
        project: pool.project.clone(),
        apy: pool.apy,
        tvl_usd: pool.tvl_usd,
    }
}

/// Mean of the shallower leg's liquidity score and the legs' average stability.
fn quality(a: &Pool, b: &Pool) -> Decimal {
    let liquidity = Decimal::ONE - liquidity_risk(a.tvl_usd.min(b.tvl_usd));
    let stability = (a.apy_stability + b.apy_stability) / Decimal::TWO;
    ((liquidity + stability) / Decimal::TWO)
        .clamp(Decimal::ZERO, Decimal::ONE)
        .round_dp(4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use crate::test_support::make_pool;

    fn usdc(id: &str, apy: Decimal) -> Pool {
        let mut p = make_pool(id, "USDC", 0, 50_000_000, RiskLevel::Low);
        p.apy = apy;
        p
    }

    #[test]
    fn test_single_spread_survives_min_filter() {
        let pools = vec![
            usdc("a", Decimal::from(4)),
            usdc("b", Decimal::from(7)),
            usdc("c", Decimal::new(42, 1)),
        ];
        let query = SpreadQuery {
            min_spread: Some(Decimal::ONE),
            ..Default::default()
        };
        let report = detect_spreads(&pools, &query, Decimal::ONE);

        assert_eq!(report.metadata.spreads_found, 1);
        assert_eq!(report.spreads.len(), 1);
        assert_eq!(report.spreads[0].apy_spread, Decimal::from(3));
        assert_eq!(report.spreads[0].pool_a.pool_id, "b");
        assert_eq!(report.spreads[0].pool_b.pool_id, "a");
    }

    #[test]
    fn test_sorted_by_magnitude_and_limited() {
        let pools = vec![
            usdc("a", Decimal::from(2)),
            usdc("b", Decimal::from(5)),
            usdc("c", Decimal::from(11)),
            usdc("d", Decimal::from(20)),
        ];
        let query = SpreadQuery {
            limit: Some(1),
            ..Default::default()
        };
        let report = detect_spreads(&pools, &query, Decimal::ONE);
        let spreads: Vec<Decimal> = report.spreads.iter().map(|s| s.apy_spread).collect();
        assert_eq!(spreads, vec![Decimal::from(18), Decimal::from(6)]);
        assert_eq!(report.top_opportunities.len(), 1);
        assert_eq!(report.top_opportunities[0].pool_a.pool_id, "d");
        assert_eq!(report.metadata.spreads_found, 2);
    }

    #[test]
    fn test_assets_are_not_mixed() {
        let mut dai = make_pool("d", "DAI", 20, 50_000_000, RiskLevel::Low);
        dai.chain = "Arbitrum".into();
        let pools = vec![usdc("a", Decimal::from(4)), dai];
        let report = detect_spreads(&pools, &SpreadQuery::default(), Decimal::ONE);
        assert!(report.spreads.is_empty());
        assert_eq!(report.metadata.assets_analyzed, 2);
        assert_eq!(report.metadata.pools_compared, 2);
    }

    #[test]
    fn test_cross_chain_label_and_chain_filter() {
        let mut arb = usdc("arb", Decimal::from(9));
        arb.chain = "Arbitrum".into();
        let pools = vec![usdc("eth", Decimal::from(4)), arb];

        let report = detect_spreads(&pools, &SpreadQuery::default(), Decimal::ONE);
        assert_eq!(report.spreads.len(), 1);
        assert_eq!(report.spreads[0].chain, CROSS_CHAIN);

        let query = SpreadQuery {
            chain: Some("ethereum".into()),
            ..Default::default()
        };
        let report = detect_spreads(&pools, &query, Decimal::ONE);
        assert!(report.spreads.is_empty());
        assert_eq!(report.metadata.pools_compared, 1);
    }

    #[test]
    fn test_quality_in_unit_range() {
        let pools = vec![usdc("a", Decimal::from(1)), usdc("b", Decimal::from(9))];
        let report = detect_spreads(&pools, &SpreadQuery::default(), Decimal::ONE);
        let q = report.spreads[0].quality_score;
        assert!(q > Decimal::ZERO && q <= Decimal::ONE);
    }
}
