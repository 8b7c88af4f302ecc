use std::collections::BTreeSet;

use rust_decimal::Decimal;

use super::types::RawPool;
use crate::models::{IlRisk, Pool, RiskLevel};

/// Turn an upstream record into a `Pool`, deriving the risk fields.
///
/// Returns `None` for records without an id or with a negative TVL.
pub fn normalize(raw: RawPool) -> Option<Pool> {
    let id = raw.id.filter(|s| !s.trim().is_empty())?;
    let tvl_usd = raw.tvl_usd.unwrap_or(Decimal::ZERO);
    if tvl_usd < Decimal::ZERO {
        tracing::debug!(pool_id = %id, tvl = %tvl_usd, "Dropping pool with negative TVL");
        return None;
    }

    let apy_base = raw.apy_base.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
    let apy_reward = raw.apy_reward.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
    let apy = raw
        .apy
        .unwrap_or(apy_base + apy_reward)
        .max(Decimal::ZERO);
    let stablecoin = raw.stablecoin.unwrap_or(false);
    let symbol = raw.symbol.unwrap_or_default();

    let reward_share = if apy > Decimal::ZERO {
        (apy_reward / apy).min(Decimal::ONE)
    } else {
        Decimal::ZERO
    };

    let il_risk = derive_il_risk(
        raw.exposure.as_deref(),
        raw.il_risk.as_deref(),
        stablecoin,
        reward_share,
    );
    let risk_score = derive_risk_score(stablecoin, il_risk, tvl_usd, apy, reward_share);
    let apy_stability = derive_apy_stability(raw.sigma, apy_base, apy);

    let underlying_assets: BTreeSet<String> = symbol
        .split(['-', '/'])
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    Some(Pool {
        id,
        chain: raw.chain.unwrap_or_else(|| "unknown".into()),
        project: raw.project.unwrap_or_else(|| "unknown".into()),
        symbol,
        tvl_usd,
        apy,
        apy_base,
        apy_reward,
        stablecoin,
        il_risk,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        liquidity_risk: liquidity_risk(tvl_usd),
        apy_stability,
        underlying_assets,
    })
}

fn derive_il_risk(
    exposure: Option<&str>,
    il_flag: Option<&str>,
    stablecoin: bool,
    reward_share: Decimal,
) -> IlRisk {
    let multi = exposure.map(|e| e.eq_ignore_ascii_case("multi")).unwrap_or(false);
    if !multi {
        return IlRisk::None;
    }
    if stablecoin {
        return IlRisk::Low;
    }
    if reward_share > Decimal::new(5, 1) {
        return IlRisk::High;
    }
    match il_flag.map(|f| f.to_lowercase()) {
        Some(f) if f == "no" => IlRisk::Low,
        _ => IlRisk::Medium,
    }
}

/// 0-100 composite, lower is safer.
pub fn derive_risk_score(
    stablecoin: bool,
    il_risk: IlRisk,
    tvl_usd: Decimal,
    apy: Decimal,
    reward_share: Decimal,
) -> Decimal {
    let mut score = Decimal::from(10);

    if !stablecoin {
        score += Decimal::from(20);
    }

    score += match il_risk {
        IlRisk::None => Decimal::ZERO,
        IlRisk::Low => Decimal::from(5),
        IlRisk::Medium => Decimal::from(15),
        IlRisk::High => Decimal::from(25),
    };

    score += if tvl_usd < Decimal::from(1_000_000) {
        Decimal::from(25)
    } else if tvl_usd < Decimal::from(10_000_000) {
        Decimal::from(15)
    } else if tvl_usd < Decimal::from(100_000_000) {
        Decimal::from(5)
    } else {
        Decimal::ZERO
    };

    score += reward_share * Decimal::from(20);

    if apy > Decimal::from(50) {
        score += Decimal::from(10);
    }

    score.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED).round_dp(2)
}

/// 0-1 by TVL tier, higher is riskier.
pub fn liquidity_risk(tvl_usd: Decimal) -> Decimal {
    if tvl_usd >= Decimal::from(1_000_000_000u64) {
        Decimal::new(5, 2)
    } else if tvl_usd >= Decimal::from(100_000_000) {
        Decimal::new(10, 2)
    } else if tvl_usd >= Decimal::from(10_000_000) {
        Decimal::new(25, 2)
    } else if tvl_usd >= Decimal::from(1_000_000) {
        Decimal::new(50, 2)
    } else {
        Decimal::new(80, 2)
    }
}

fn derive_apy_stability(sigma: Option<Decimal>, apy_base: Decimal, apy: Decimal) -> Decimal {
    let stability = match sigma {
        Some(s) if s >= Decimal::ZERO => Decimal::ONE / (Decimal::ONE + s),
        _ if apy > Decimal::ZERO => apy_base / apy,
        _ => Decimal::ONE,
    };
    stability.clamp(Decimal::ZERO, Decimal::ONE).round_dp(4)
}
