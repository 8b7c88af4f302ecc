use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::{self, Store, SNAPSHOT_ENTITY};
use crate::errors::EngineError;
use crate::models::{PerformanceSnapshot, PerformanceSummary, Pool, SnapshotMetrics};

use super::validate_id;

type History = HashMap<String, BTreeMap<NaiveDate, PerformanceSnapshot>>;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub reconciled: usize,
    /// Rows not yet past their maturation window.
    pub pending: usize,
    pub failed: usize,
}

/// Daily snapshot history per profile.
///
/// All history lives behind one lock. The `(profile, date)` uniqueness check,
/// the store write and the in-memory insert happen while it is held, so
/// overlapping snapshot runs cannot create duplicates.
#[derive(Clone)]
pub struct PerformanceTracker {
    inner: Arc<Mutex<History>>,
    store: Arc<dyn Store>,
    maturation_days: i64,
    summary_window_days: i64,
}

fn snapshot_key(profile_id: &str, date: NaiveDate) -> String {
    format!("{profile_id}/{date}")
}

impl PerformanceTracker {
    pub fn new(store: Arc<dyn Store>, maturation_days: i64, summary_window_days: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            store,
            maturation_days,
            summary_window_days,
        }
    }

    /// Hydrate history from the store. Returns the number of snapshots loaded.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let rows: Vec<PerformanceSnapshot> = db::load_all(self.store.as_ref(), SNAPSHOT_ENTITY, "").await?;
        let mut inner = self.inner.lock().await;
        let count = rows.len();
        for snap in rows {
            inner
                .entry(snap.profile_id.clone())
                .or_default()
                .insert(snap.date, snap);
        }
        tracing::info!(snapshots = count, profiles = inner.len(), "Performance history loaded");
        Ok(count)
    }

    pub async fn snapshot_today(
        &self,
        profile_id: &str,
        metrics: SnapshotMetrics,
    ) -> Result<PerformanceSnapshot, EngineError> {
        self.snapshot_on(profile_id, Utc::now().date_naive(), metrics).await
    }

    /// Record `metrics` for `(profile_id, date)` unless a snapshot already
    /// exists, in which case the existing record is returned untouched.
    pub async fn snapshot_on(
        &self,
        profile_id: &str,
        date: NaiveDate,
        metrics: SnapshotMetrics,
    ) -> Result<PerformanceSnapshot, EngineError> {
        validate_id("profile", profile_id)?;
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.get(profile_id).and_then(|h| h.get(&date)) {
            tracing::debug!(profile_id = %profile_id, date = %date, "Snapshot already taken");
            return Ok(existing.clone());
        }

        let snap = PerformanceSnapshot::new(profile_id, date, metrics);
        let stored = self.insert_locked(&mut inner, snap).await?;
        tracing::info!(
            profile_id = %profile_id,
            date = %date,
            expected_apy = ?stored.expected_apy,
            "Performance snapshot recorded"
        );
        Ok(stored)
    }

    /// Write-through insert. Must be called with the history lock held.
    ///
    /// When another process already wrote the row, the stored copy wins.
    async fn insert_locked(
        &self,
        inner: &mut History,
        snap: PerformanceSnapshot,
    ) -> Result<PerformanceSnapshot, EngineError> {
        let key = snapshot_key(&snap.profile_id, snap.date);
        let value = serde_json::to_value(&snap).map_err(anyhow::Error::from)?;
        let stored = if self.store.insert_if_absent(SNAPSHOT_ENTITY, &key, value).await? {
            snap
        } else {
            match self.store.get(SNAPSHOT_ENTITY, &key).await? {
                Some(existing) => serde_json::from_value(existing).map_err(anyhow::Error::from)?,
                None => snap,
            }
        };
        inner
            .entry(stored.profile_id.clone())
            .or_default()
            .insert(stored.date, stored.clone());
        Ok(stored)
    }

    /// Seed `days` synthetic snapshots ending the day before `today`. Dates
    /// that already have a snapshot are left alone. Returns how many were created.
    pub async fn backfill(
        &self,
        profile_id: &str,
        days: i64,
        baseline: &SnapshotMetrics,
        today: NaiveDate,
    ) -> Result<usize, EngineError> {
        validate_id("profile", profile_id)?;
        if days < 0 {
            return Err(EngineError::validation("backfill days must not be negative"));
        }

        let mut inner = self.inner.lock().await;
        let mut created = 0;
        for offset in (1..=days).rev() {
            let date = today - Duration::days(offset);
            if inner.get(profile_id).is_some_and(|h| h.contains_key(&date)) {
                continue;
            }
            let mut snap = PerformanceSnapshot::new(profile_id, date, baseline.clone());
            snap.synthetic = true;
            self.insert_locked(&mut inner, snap).await?;
            created += 1;
        }

        tracing::info!(profile_id = %profile_id, days = days, created = created, "History backfilled");
        Ok(created)
    }

    /// Fill realized figures for every matured, unreconciled snapshot.
    ///
    /// A row's realized APY is its allocation-weighted APY across `pools`,
    /// with pools that have disappeared counting as zero. Rows that fail to
    /// persist are logged and left for the next pass.
    pub async fn reconcile(&self, pools: &[Pool], today: NaiveDate) -> ReconcileReport {
        let apy_by_id: HashMap<&str, Decimal> = pools.iter().map(|p| (p.id.as_str(), p.apy)).collect();
        let window = Decimal::from(self.maturation_days);
        let mut report = ReconcileReport::default();

        let mut inner = self.inner.lock().await;
        for history in inner.values_mut() {
            for snap in history.values_mut() {
                if snap.is_reconciled() || snap.allocations.is_empty() {
                    continue;
                }
                if (today - snap.date).num_days() < self.maturation_days {
                    report.pending += 1;
                    continue;
                }

                let actual: Decimal = snap
                    .allocations
                    .iter()
                    .map(|a| {
                        let apy = apy_by_id.get(a.pool_id.as_str()).copied().unwrap_or(Decimal::ZERO);
                        a.allocation_pct / Decimal::ONE_HUNDRED * apy
                    })
                    .sum();

                let mut updated = snap.clone();
                updated.actual_apy = Some(actual.round_dp(4));
                updated.realized_pnl = (snap.portfolio_value * actual / Decimal::ONE_HUNDRED * window
                    / Decimal::from(365))
                .round_dp(2);
                updated.reconciled_at = Some(Utc::now());

                let key = snapshot_key(&snap.profile_id, snap.date);
                match db::put(self.store.as_ref(), SNAPSHOT_ENTITY, &key, &updated).await {
                    Ok(()) => {
                        *snap = updated;
                        report.reconciled += 1;
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to persist reconciled snapshot");
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            reconciled = report.reconciled,
            pending = report.pending,
            failed = report.failed,
            "Reconciliation pass complete"
        );
        report
    }

    /// Aggregate the last `window_days` days (inclusive of `today`).
    pub async fn summarize(
        &self,
        profile_id: &str,
        window_days: Option<i64>,
        today: NaiveDate,
    ) -> Result<PerformanceSummary, EngineError> {
        let window_days = window_days.unwrap_or(self.summary_window_days);
        if window_days <= 0 {
            return Err(EngineError::validation("window_days must be positive"));
        }
        let rows = self.history(profile_id, window_days, today).await;

        let expected: Vec<Decimal> = rows.iter().filter_map(|s| s.expected_apy).collect();
        let realized: Vec<Decimal> = rows.iter().filter_map(|s| s.actual_apy).collect();
        let deviations: Vec<Decimal> = rows
            .iter()
            .filter_map(|s| Some((s.expected_apy? - s.actual_apy?).abs()))
            .collect();

        Ok(PerformanceSummary {
            profile_id: profile_id.to_string(),
            window_days,
            average_expected: mean(&expected),
            average_realized: mean(&realized),
            tracking_error: mean(&deviations),
            sample_count: rows.len(),
            reconciled_count: rows.iter().filter(|s| s.is_reconciled()).count(),
        })
    }

    /// Snapshots dated within the last `days` days up to `today`, oldest first.
    pub async fn history(&self, profile_id: &str, days: i64, today: NaiveDate) -> Vec<PerformanceSnapshot> {
        let start = today - Duration::days(days.max(1) - 1);
        let inner = self.inner.lock().await;
        inner
            .get(profile_id)
            .map(|h| h.range(start..=today).map(|(_, s)| s.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn latest(&self, profile_id: &str) -> Option<PerformanceSnapshot> {
        let inner = self.inner.lock().await;
        inner
            .get(profile_id)
            .and_then(|h| h.values().next_back().cloned())
    }

    pub async fn profiles(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut ids: Vec<String> = inner.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Re-write every snapshot to the store. Used on shutdown.
    pub async fn flush(&self) -> Result<usize, EngineError> {
        let inner = self.inner.lock().await;
        let mut written = 0;
        for snap in inner.values().flat_map(|h| h.values()) {
            db::put(self.store.as_ref(), SNAPSHOT_ENTITY, &snapshot_key(&snap.profile_id, snap.date), snap)
                .await?;
            written += 1;
        }
        Ok(written)
    }
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().copied().sum();
    Some((total / Decimal::from(values.len())).round_dp(4))
}
