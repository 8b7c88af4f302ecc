use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::models::RiskTolerance;

const DEFAULT_POOL_SOURCE_URL: &str = "https://yields.llama.fi";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL for the state store. Unset → in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    // Pool catalog
    pub pool_source_url: String,
    pub min_pool_tvl: Decimal,

    // Background jobs
    pub snapshot_interval_secs: u64,
    pub reconcile_interval_secs: u64,
    pub snapshot_amount: Decimal,
    pub backfill_days: i64,

    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            pool_source_url: env::var("POOL_SOURCE_URL")
                .unwrap_or_else(|_| DEFAULT_POOL_SOURCE_URL.into()),
            min_pool_tvl: env_or("MIN_POOL_TVL", Decimal::from(100_000)),

            snapshot_interval_secs: env_or("SNAPSHOT_INTERVAL_SECS", 3_600),
            reconcile_interval_secs: env_or("RECONCILE_INTERVAL_SECS", 6 * 3_600),
            snapshot_amount: env_or("SNAPSHOT_AMOUNT", Decimal::from(10_000)),
            backfill_days: env_or("BACKFILL_DAYS", 0),

            engine: EngineConfig::from_env(),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Engine tuning
// ---------------------------------------------------------------------------

/// Sub-score weights. Each set sums to 1.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub yield_weight: Decimal,
    pub safety: Decimal,
    pub stability: Decimal,
    pub liquidity: Decimal,
}

/// Per-tolerance allocation settings.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub max_pools: usize,
    /// Per-pool cap in percent.
    pub max_allocation_pct: Decimal,
    /// Pools below this TVL are excluded.
    pub min_tvl_usd: Decimal,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone)]
pub struct RebalanceThresholds {
    /// Relative APY drop (percent) that raises an alert.
    pub apy_drop_pct: Decimal,
    /// Relative APY drop (percent) at which the alert becomes high severity.
    pub apy_drop_high_pct: Decimal,
    pub apy_spike_pct: Decimal,
    pub tvl_drop_pct: Decimal,
}

impl Default for RebalanceThresholds {
    fn default() -> Self {
        Self {
            apy_drop_pct: Decimal::from(30),
            apy_drop_high_pct: Decimal::from(40),
            apy_spike_pct: Decimal::from(50),
            tvl_drop_pct: Decimal::from(40),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub conservative: ProfileSettings,
    pub moderate: ProfileSettings,
    pub aggressive: ProfileSettings,
    /// Fewer eligible pools than this fails the recommendation.
    pub min_pools: usize,
    /// Floor for any selected pool, in percent.
    pub min_allocation_pct: Decimal,
    /// Selected pools below this APY stability get a warning.
    pub low_stability_threshold: Decimal,
    pub min_diversification: Decimal,
    pub rebalance: RebalanceThresholds,
    pub default_min_spread: Decimal,
    /// Days after a snapshot before its realized return is reconciled.
    pub maturation_days: i64,
    pub summary_window_days: i64,
    /// Streak magnitude at which a trader trends up/down.
    pub trend_streak: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conservative: ProfileSettings {
                max_pools: 5,
                max_allocation_pct: Decimal::from(22),
                min_tvl_usd: Decimal::from(10_000_000),
                weights: ScoreWeights {
                    yield_weight: Decimal::new(15, 2),
                    safety: Decimal::new(40, 2),
                    stability: Decimal::new(30, 2),
                    liquidity: Decimal::new(15, 2),
                },
            },
            moderate: ProfileSettings {
                max_pools: 6,
                max_allocation_pct: Decimal::from(25),
                min_tvl_usd: Decimal::from(1_000_000),
                weights: ScoreWeights {
                    yield_weight: Decimal::new(35, 2),
                    safety: Decimal::new(25, 2),
                    stability: Decimal::new(20, 2),
                    liquidity: Decimal::new(20, 2),
                },
            },
            aggressive: ProfileSettings {
                max_pools: 8,
                max_allocation_pct: Decimal::from(35),
                min_tvl_usd: Decimal::from(250_000),
                weights: ScoreWeights {
                    yield_weight: Decimal::new(60, 2),
                    safety: Decimal::new(15, 2),
                    stability: Decimal::new(10, 2),
                    liquidity: Decimal::new(15, 2),
                },
            },
            min_pools: 3,
            min_allocation_pct: Decimal::from(5),
            low_stability_threshold: Decimal::new(4, 1),
            min_diversification: Decimal::new(5, 1),
            rebalance: RebalanceThresholds::default(),
            default_min_spread: Decimal::ONE,
            maturation_days: 7,
            summary_window_days: 30,
            trend_streak: 3,
        }
    }
}

impl EngineConfig {
    /// Defaults with the drift thresholds overridable from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rebalance = RebalanceThresholds {
            apy_drop_pct: env_or("REBALANCE_APY_DROP_PCT", defaults.rebalance.apy_drop_pct),
            apy_drop_high_pct: env_or(
                "REBALANCE_APY_DROP_HIGH_PCT",
                defaults.rebalance.apy_drop_high_pct,
            ),
            apy_spike_pct: env_or("REBALANCE_APY_SPIKE_PCT", defaults.rebalance.apy_spike_pct),
            tvl_drop_pct: env_or("REBALANCE_TVL_DROP_PCT", defaults.rebalance.tvl_drop_pct),
        };

        Self {
            min_pools: env_or("MIN_RECOMMENDATION_POOLS", defaults.min_pools),
            maturation_days: env_or("MATURATION_DAYS", defaults.maturation_days),
            rebalance,
            ..defaults
        }
    }

    pub fn profile(&self, tolerance: RiskTolerance) -> &ProfileSettings {
        match tolerance {
            RiskTolerance::Conservative => &self.conservative,
            RiskTolerance::Moderate => &self.moderate,
            RiskTolerance::Aggressive => &self.aggressive,
        }
    }

    pub fn profile_mut(&mut self, tolerance: RiskTolerance) -> &mut ProfileSettings {
        match tolerance {
            RiskTolerance::Conservative => &mut self.conservative,
            RiskTolerance::Moderate => &mut self.moderate,
            RiskTolerance::Aggressive => &mut self.aggressive,
        }
    }
}
