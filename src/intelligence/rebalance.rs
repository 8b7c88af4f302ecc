use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::config::RebalanceThresholds;
use crate::models::{
    AlertKind, Allocation, Pool, RebalanceAlert, Recommendation, RiskTolerance, Severity, SuggestedAction,
};

/// Compare a standing recommendation against freshly fetched pool state.
///
/// Each triggered condition yields its own alert. Alerts are ordered by
/// severity, most urgent first, then by position size.
pub fn analyze(
    recommendation: &Recommendation,
    tolerance: RiskTolerance,
    current: &[Pool],
    thresholds: &RebalanceThresholds,
) -> Vec<RebalanceAlert> {
    let by_id: HashMap<&str, &Pool> = current.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut alerts: Vec<RebalanceAlert> = recommendation
        .allocations
        .iter()
        .flat_map(|allocation| {
            check_allocation(allocation, by_id.get(allocation.pool_id()).copied(), tolerance, thresholds)
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.allocation_pct.cmp(&a.allocation_pct))
    });

    if !alerts.is_empty() {
        tracing::info!(
            tolerance = %tolerance,
            alerts = alerts.len(),
            most_severe = %alerts[0].severity,
            "Rebalance drift detected"
        );
    }

    alerts
}

fn check_allocation(
    allocation: &Allocation,
    current: Option<&Pool>,
    tolerance: RiskTolerance,
    thresholds: &RebalanceThresholds,
) -> Vec<RebalanceAlert> {
    let pool_id = allocation.pool_id().to_string();
    let alert = |kind, severity, previous, current, action, note: String| RebalanceAlert {
        pool_id: pool_id.clone(),
        kind,
        severity,
        previous_value: previous,
        current_value: current,
        suggested_action: action,
        allocation_pct: allocation.allocation_pct,
        note,
    };

    let pool = match current {
        Some(p) if p.tvl_usd > Decimal::ZERO => p,
        Some(p) => {
            return vec![alert(
                AlertKind::PoolInactive,
                Severity::Critical,
                Some(allocation.pool.tvl_usd),
                Some(p.tvl_usd),
                SuggestedAction::Exit,
                format!("{} {} has no liquidity left", allocation.pool.project, allocation.asset),
            )];
        }
        None => {
            return vec![alert(
                AlertKind::PoolInactive,
                Severity::Critical,
                Some(allocation.pool.tvl_usd),
                None,
                SuggestedAction::Exit,
                format!("{} {} is no longer listed", allocation.pool.project, allocation.asset),
            )];
        }
    };

    let mut alerts = Vec::new();

    if let Some(drop) = relative_drop_pct(allocation.apy, pool.apy) {
        if drop >= thresholds.apy_drop_pct {
            let (severity, action) = if drop >= thresholds.apy_drop_high_pct {
                (Severity::High, SuggestedAction::Exit)
            } else {
                (Severity::Medium, SuggestedAction::Reduce)
            };
            alerts.push(alert(
                AlertKind::ApyDrop,
                severity,
                Some(allocation.apy),
                Some(pool.apy),
                action,
                format!("APY fell {}% since the recommendation", drop.round_dp(1)),
            ));
        }
    }

    if let Some(rise) = relative_rise_pct(allocation.apy, pool.apy) {
        if rise >= thresholds.apy_spike_pct {
            alerts.push(alert(
                AlertKind::ApySpike,
                Severity::Low,
                Some(allocation.apy),
                Some(pool.apy),
                SuggestedAction::Hold,
                format!(
                    "APY jumped {}%; sudden spikes are often unsustainable emissions",
                    rise.round_dp(1)
                ),
            ));
        }
    }

    if pool.risk_level > allocation.risk_level && !tolerance.permits(pool.risk_level) {
        alerts.push(alert(
            AlertKind::RiskUpgrade,
            Severity::High,
            Some(allocation.pool.risk_score),
            Some(pool.risk_score),
            SuggestedAction::Reduce,
            format!(
                "risk tier rose from {} to {}, above what a {} profile allows",
                allocation.risk_level, pool.risk_level, tolerance
            ),
        ));
    }

    if let Some(drop) = relative_drop_pct(allocation.pool.tvl_usd, pool.tvl_usd) {
        if drop >= thresholds.tvl_drop_pct {
            alerts.push(alert(
                AlertKind::TvlDrop,
                Severity::Medium,
                Some(allocation.pool.tvl_usd),
                Some(pool.tvl_usd),
                SuggestedAction::Reduce,
                format!("TVL fell {}%", drop.round_dp(1)),
            ));
        }
    }

    alerts
}

/// Percent decrease from `previous` to `current`; `None` without a positive baseline.
fn relative_drop_pct(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }
    Some((previous - current) / previous * Decimal::ONE_HUNDRED)
}

fn relative_rise_pct(previous: Decimal, current: Decimal) -> Option<Decimal> {
    relative_drop_pct(previous, current).map(|d| -d)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::intelligence::recommender::recommend;
    use crate::models::RiskLevel;
    use crate::test_support::make_pool;

    fn baseline() -> (Recommendation, Vec<Pool>) {
        let pools: Vec<Pool> = vec![
            make_pool("p", "USDC", 10, 500_000_000, RiskLevel::Low),
            make_pool("q", "USDT", 8, 400_000_000, RiskLevel::Low),
            make_pool("r", "DAI", 6, 300_000_000, RiskLevel::Low),
        ];
        let rec = recommend(
            Decimal::from(10_000),
            RiskTolerance::Moderate,
            &pools,
            &EngineConfig::default(),
        )
        .unwrap();
        (rec, pools)
    }

    fn thresholds() -> RebalanceThresholds {
        RebalanceThresholds::default()
    }

    fn with(pools: &[Pool], id: &str, f: impl Fn(&mut Pool)) -> Vec<Pool> {
        pools
            .iter()
            .cloned()
            .map(|mut p| {
                if p.id == id {
                    f(&mut p);
                }
                p
            })
            .collect()
    }

    #[test]
    fn test_no_drift_no_alerts() {
        let (rec, pools) = baseline();
        assert!(analyze(&rec, RiskTolerance::Moderate, &pools, &thresholds()).is_empty());
    }

    #[test]
    fn test_forty_percent_apy_drop_is_high() {
        let (rec, pools) = baseline();
        let current = with(&pools, "p", |p| p.apy = Decimal::from(6));
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::ApyDrop);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].previous_value, Some(Decimal::from(10)));
        assert_eq!(alerts[0].current_value, Some(Decimal::from(6)));
    }

    #[test]
    fn test_thirty_five_percent_apy_drop_is_medium() {
        let (rec, pools) = baseline();
        let current = with(&pools, "q", |p| p.apy = Decimal::new(52, 1));
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[0].suggested_action, SuggestedAction::Reduce);
    }

    #[test]
    fn test_small_apy_drop_ignored() {
        let (rec, pools) = baseline();
        let current = with(&pools, "p", |p| p.apy = Decimal::from(8));
        assert!(analyze(&rec, RiskTolerance::Moderate, &current, &thresholds()).is_empty());
    }

    #[test]
    fn test_removed_pool_is_critical() {
        let (rec, pools) = baseline();
        let current: Vec<Pool> = pools.into_iter().filter(|p| p.id != "r").collect();
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::PoolInactive);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].suggested_action, SuggestedAction::Exit);
    }

    #[test]
    fn test_apy_spike_is_low_hold() {
        let (rec, pools) = baseline();
        let current = with(&pools, "r", |p| p.apy = Decimal::from(12));
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::ApySpike);
        assert_eq!(alerts[0].severity, Severity::Low);
        assert_eq!(alerts[0].suggested_action, SuggestedAction::Hold);
    }

    #[test]
    fn test_risk_upgrade_beyond_tolerance() {
        let (rec, pools) = baseline();
        let current = with(&pools, "q", |p| {
            p.risk_level = RiskLevel::High;
            p.risk_score = Decimal::from(80);
        });
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::RiskUpgrade);
        assert_eq!(alerts[0].severity, Severity::High);

        // Medium is still within a moderate profile.
        let current = with(&pools, "q", |p| p.risk_level = RiskLevel::Medium);
        assert!(analyze(&rec, RiskTolerance::Moderate, &current, &thresholds()).is_empty());
    }

    #[test]
    fn test_multiple_conditions_are_separate_and_ordered() {
        let (rec, pools) = baseline();
        let current = with(&pools, "p", |p| {
            p.apy = Decimal::from(3);
            p.tvl_usd = Decimal::from(100_000_000);
        });
        let current: Vec<Pool> = current.into_iter().filter(|p| p.id != "r").collect();

        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![AlertKind::PoolInactive, AlertKind::ApyDrop, AlertKind::TvlDrop]
        );
    }

    #[test]
    fn test_same_severity_orders_by_position_size() {
        let (rec, pools) = baseline();
        let current = with(&pools, "p", |p| p.apy = Decimal::from(4));
        let current = with(&current, "r", |p| p.apy = Decimal::new(24, 1));
        let alerts = analyze(&rec, RiskTolerance::Moderate, &current, &thresholds());
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].allocation_pct >= alerts[1].allocation_pct);
    }
}
