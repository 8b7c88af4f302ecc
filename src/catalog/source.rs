use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::EngineError;
use crate::models::{Pool, PoolFilter};

/// Read-only access to the current pool catalog.
#[async_trait]
pub trait PoolSource: Send + Sync {
    /// Failures surface as `EngineError::DataUnavailable`.
    async fn fetch_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>, EngineError>;
}

pub type SharedPoolSource = Arc<dyn PoolSource>;

/// Fixed catalog held in memory. The contents can be swapped to simulate a
/// fresh fetch, or marked unavailable to simulate an upstream outage.
#[derive(Clone, Default)]
pub struct StaticPoolSource {
    inner: Arc<RwLock<StaticInner>>,
}

#[derive(Default)]
struct StaticInner {
    pools: Vec<Pool>,
    outage: Option<String>,
}

impl StaticPoolSource {
    pub fn new(pools: Vec<Pool>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StaticInner { pools, outage: None })),
        }
    }

    pub async fn replace(&self, pools: Vec<Pool>) {
        let mut inner = self.inner.write().await;
        inner.pools = pools;
    }

    /// `Some(reason)` makes every fetch fail until cleared with `None`.
    pub async fn set_outage(&self, reason: Option<String>) {
        let mut inner = self.inner.write().await;
        inner.outage = reason;
    }
}

#[async_trait]
impl PoolSource for StaticPoolSource {
    async fn fetch_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>, EngineError> {
        let inner = self.inner.read().await;
        if let Some(reason) = &inner.outage {
            return Err(EngineError::DataUnavailable(reason.clone()));
        }
        Ok(inner
            .pools
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }
}
